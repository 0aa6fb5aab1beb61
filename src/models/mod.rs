pub mod analysis;
pub mod dataset;
pub mod response;
pub mod schema;

pub use analysis::*;
pub use dataset::*;
pub use schema::*;
