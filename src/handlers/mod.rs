pub mod analysis;
pub mod datasets;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use std::fmt::Debug;

use crate::error::AnalysisError;
use crate::models::response::ErrorResponse;
use crate::services::CacheBackend;

pub use analysis::*;
pub use datasets::*;

/// Register every route. Generic over the cache backend so the same table
/// serves the in-memory and the Redis deployment.
pub fn configure<C>(cfg: &mut web::ServiceConfig)
where
    C: CacheBackend + Clone + Debug,
{
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(
            web::scope("/datasets")
                .service(web::resource("/upload").route(web::post().to(upload_dataset::<C>)))
                .service(web::resource("").route(web::get().to(list_datasets)))
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(get_dataset::<C>))
                        .route(web::put().to(replace_dataset::<C>))
                        .route(web::delete().to(delete_dataset::<C>)),
                )
                .service(web::resource("/{id}/preview").route(web::get().to(preview_dataset))),
        )
        .service(
            web::scope("/analysis")
                .service(web::resource("/query").route(web::post().to(query_dataset::<C>)))
                .service(web::resource("/suggestions/{id}").route(web::get().to(get_suggestions::<C>))),
        );
}

pub(crate) fn error_response(status_code: u16, error: impl Into<String>) -> HttpResponse {
    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorResponse {
        error: error.into(),
        status_code: status.as_u16(),
    })
}

pub(crate) fn analysis_error_response(e: &AnalysisError) -> HttpResponse {
    error_response(e.status_code(), e.to_string())
}

pub(crate) fn internal_error(e: anyhow::Error) -> HttpResponse {
    log::error!("❌ Internal error: {:#}", e);
    error_response(500, format!("Internal error: {}", e))
}

pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> HttpResponse {
    error_response(404, format!("{} {} not found", what, id))
}

#[cfg(test)]
pub(crate) mod test_support {
    use actix_web::web;

    use crate::config::Config;
    use crate::services::{AnalysisService, DatasetStore, MemoryCacheService};

    pub const BOUNDARY: &str = "----insight-test-boundary";

    pub struct AppState {
        pub store: web::Data<DatasetStore>,
        pub analysis: web::Data<AnalysisService<MemoryCacheService>>,
        pub config: web::Data<Config>,
    }

    pub fn state(config: Config) -> AppState {
        AppState {
            store: web::Data::new(DatasetStore::new()),
            analysis: web::Data::new(AnalysisService::from_config(&config, MemoryCacheService::new(), None)),
            config: web::Data::new(config),
        }
    }

    /// Multipart body carrying one `file` field.
    pub fn multipart_body(filename: &str, content: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content
        )
    }

    pub fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    pub const SALES_CSV: &str = "month,product,revenue\n\
        2024-01,A,100\n2024-01,B,200\n2024-02,C,150\n2024-02,A,120\n\
        2024-03,B,210\n2024-03,C,160\n2024-04,A,130\n2024-04,B,220\n";
}
