use actix_web::{web, Error, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use std::fmt::Debug;
use uuid::Uuid;

use crate::handlers::{analysis_error_response, error_response, internal_error, not_found};
use crate::models::response::{AnalysisRequest, SuggestionsResponse};
use crate::services::{AnalysisService, CacheBackend, DatasetStore};

/// Answer a natural-language question about a stored dataset
pub async fn query_dataset<C>(
    request: web::Json<AnalysisRequest>,
    store: web::Data<DatasetStore>,
    analysis: web::Data<AnalysisService<C>>,
) -> Result<HttpResponse, Error>
where
    C: CacheBackend + Clone + Debug,
{
    let AnalysisRequest { dataset_id, question } = request.into_inner();
    if question.trim().is_empty() {
        return Ok(error_response(400, "Question must not be empty"));
    }

    let dataset = match store.dataset(dataset_id) {
        Ok(Some((_, dataset))) => dataset,
        Ok(None) => return Ok(not_found("Dataset", dataset_id)),
        Err(e) => return Ok(internal_error(e)),
    };

    info!("❓ Question for dataset {}: {}", dataset_id, question);
    match analysis.resolve(&dataset, &question).await {
        Ok(answer) => Ok(HttpResponse::Ok().json(answer)),
        Err(e) => Ok(analysis_error_response(&e)),
    }
}

pub async fn get_suggestions<C>(
    path: web::Path<Uuid>,
    store: web::Data<DatasetStore>,
    analysis: web::Data<AnalysisService<C>>,
) -> Result<HttpResponse, Error>
where
    C: CacheBackend + Clone + Debug,
{
    let id = path.into_inner();
    let (record, dataset) = match store.dataset(id) {
        Ok(Some(found)) => found,
        Ok(None) => return Ok(not_found("Dataset", id)),
        Err(e) => return Ok(internal_error(e)),
    };

    match analysis.suggestions(&dataset).await {
        Ok(suggestions) => Ok(HttpResponse::Ok().json(SuggestionsResponse {
            dataset_id: id,
            dataset_name: record.name,
            suggestions,
        })),
        Err(e) => Ok(analysis_error_response(&e)),
    }
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}
