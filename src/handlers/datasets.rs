use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse};
use futures_util::StreamExt;
use log::{info, warn};
use polars::prelude::DataFrame;
use std::fmt::Debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::handlers::{analysis_error_response, error_response, internal_error, not_found};
use crate::models::response::{DatasetDetail, PreviewQuery, PreviewResponse, UploadResponse};
use crate::models::{Dataset, FileType};
use crate::services::loader::{load_dataset, preview_records};
use crate::services::{AnalysisService, CacheBackend, DatasetStore};

const DEFAULT_PREVIEW_ROWS: usize = 100;

struct UploadedFile {
    filename: String,
    file_type: FileType,
    content: Vec<u8>,
}

/// Read the `file` field of a multipart form, enforcing the size limit
/// while streaming. Rejections come back as ready-made responses.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<UploadedFile, HttpResponse> {
    let mut content = Vec::new();
    let mut filename = String::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| error_response(400, format!("Malformed multipart body: {}", e)))?;
        let content_disposition = field.content_disposition();

        if content_disposition.get_name() != Some("file") {
            continue;
        }
        if let Some(fname) = content_disposition.get_filename() {
            filename = fname.to_string();
        }

        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| error_response(400, format!("Failed to read upload: {}", e)))?;
            if content.len() + data.len() > limit {
                let e = AnalysisError::FileTooLarge { size: content.len() + data.len(), limit };
                warn!("⚠️ Rejected upload {}: {}", filename, e);
                return Err(analysis_error_response(&e));
            }
            content.extend_from_slice(&data);
        }
    }

    if content.is_empty() {
        return Err(error_response(400, "No file uploaded"));
    }

    let file_type = FileType::from_filename(&filename).ok_or_else(|| {
        analysis_error_response(&AnalysisError::UnsupportedFileType(format!(
            "'{}', expected .csv, .json, .xlsx or .xls",
            filename
        )))
    })?;

    Ok(UploadedFile { filename, file_type, content })
}

/// Parse off the async executor; polars parsing is CPU bound.
async fn parse_upload(file: UploadedFile) -> Result<(UploadedFile, DataFrame), Error> {
    let (file, parsed) = web::block(move || {
        let parsed = load_dataset(&file.content, file.file_type);
        (file, parsed)
    })
    .await?;

    match parsed {
        Ok(df) => Ok((file, df)),
        Err(e) => {
            warn!("⚠️ Could not load {}: {}", file.filename, e);
            Err(actix_web::error::InternalError::from_response(e.to_string(), analysis_error_response(&e)).into())
        }
    }
}

/// Upload a dataset, profile it and return its record plus column profiles
pub async fn upload_dataset<C>(
    payload: Multipart,
    store: web::Data<DatasetStore>,
    analysis: web::Data<AnalysisService<C>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error>
where
    C: CacheBackend + Clone + Debug,
{
    let file = match read_upload(payload, config.max_upload_bytes).await {
        Ok(file) => file,
        Err(response) => return Ok(response),
    };
    info!("📤 Received upload {} ({} bytes)", file.filename, file.content.len());

    let (file, frame) = parse_upload(file).await?;
    let summary = match analysis.summarize(&frame) {
        Ok(summary) => summary,
        Err(e) => return Ok(analysis_error_response(&e)),
    };
    let record = match store.insert(&file.filename, file.file_type, file.content.len(), frame.clone()) {
        Ok(record) => record,
        Err(e) => return Ok(internal_error(e)),
    };
    analysis
        .remember_profile(&Dataset::new(record.id, frame), &summary)
        .await;

    Ok(HttpResponse::Ok().json(UploadResponse {
        message: format!(
            "Uploaded {} with {} rows and {} columns",
            record.name, record.row_count, record.column_count
        ),
        dataset: record,
        columns: summary.columns,
    }))
}

/// Replace the content of an existing dataset and drop its cached analyses
pub async fn replace_dataset<C>(
    path: web::Path<Uuid>,
    payload: Multipart,
    store: web::Data<DatasetStore>,
    analysis: web::Data<AnalysisService<C>>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error>
where
    C: CacheBackend + Clone + Debug,
{
    let id = path.into_inner();
    match store.get(id) {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(not_found("Dataset", id)),
        Err(e) => return Ok(internal_error(e)),
    }

    let file = match read_upload(payload, config.max_upload_bytes).await {
        Ok(file) => file,
        Err(response) => return Ok(response),
    };
    let (file, frame) = parse_upload(file).await?;
    let summary = match analysis.summarize(&frame) {
        Ok(summary) => summary,
        Err(e) => return Ok(analysis_error_response(&e)),
    };

    let record = match store.replace(id, file.content.len(), frame.clone()) {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(not_found("Dataset", id)),
        Err(e) => return Ok(internal_error(e)),
    };
    analysis.invalidate(id).await;
    analysis
        .remember_profile(&Dataset::new(id, frame).at_revision(record.revision), &summary)
        .await;

    Ok(HttpResponse::Ok().json(UploadResponse {
        message: format!("Replaced content of {}", record.name),
        dataset: record,
        columns: summary.columns,
    }))
}

pub async fn list_datasets(store: web::Data<DatasetStore>) -> Result<HttpResponse, Error> {
    match store.list() {
        Ok(records) => Ok(HttpResponse::Ok().json(records)),
        Err(e) => Ok(internal_error(e)),
    }
}

pub async fn get_dataset<C>(
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

    match analysis.profile(&dataset).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(DatasetDetail { dataset: record, profile })),
        Err(e) => Ok(analysis_error_response(&e)),
    }
}

pub async fn preview_dataset(
    path: web::Path<Uuid>,
    query: web::Query<PreviewQuery>,
    store: web::Data<DatasetStore>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let dataset = match store.dataset(id) {
        Ok(Some((_, dataset))) => dataset,
        Ok(None) => return Ok(not_found("Dataset", id)),
        Err(e) => return Ok(internal_error(e)),
    };

    let limit = query.limit.unwrap_or(DEFAULT_PREVIEW_ROWS);
    match preview_records(&dataset.frame, limit) {
        Ok(data) => Ok(HttpResponse::Ok().json(PreviewResponse {
            total_rows: dataset.frame.height(),
            preview_rows: data.len(),
            columns: dataset
                .frame
                .get_column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            data,
        })),
        Err(e) => Ok(analysis_error_response(&e)),
    }
}

pub async fn delete_dataset<C>(
    path: web::Path<Uuid>,
    store: web::Data<DatasetStore>,
    analysis: web::Data<AnalysisService<C>>,
) -> Result<HttpResponse, Error>
where
    C: CacheBackend + Clone + Debug,
{
    let id = path.into_inner();
    match store.remove(id) {
        Ok(true) => {
            analysis.invalidate(id).await;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Dataset deleted",
                "dataset_id": id,
            })))
        }
        Ok(false) => Ok(not_found("Dataset", id)),
        Err(e) => Ok(internal_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure;
    use crate::handlers::test_support::{multipart_body, multipart_content_type, state, SALES_CSV};
    use crate::models::DatasetRecord;
    use crate::services::MemoryCacheService;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::Value;

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.store.clone())
                    .app_data($state.analysis.clone())
                    .app_data($state.config.clone())
                    .configure(configure::<MemoryCacheService>),
            )
            .await
        };
    }

    fn upload(uri: &str, filename: &str, content: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((header::CONTENT_TYPE, multipart_content_type()))
            .set_payload(multipart_body(filename, content))
    }

    #[actix_web::test]
    async fn test_upload_list_detail_preview_delete() {
        let state = state(Config::default());
        let app = app!(state);

        let resp = test::call_service(&app, upload("/datasets/upload", "sales.csv", SALES_CSV).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: UploadResponse = test::read_body_json(resp).await;
        assert_eq!(body.dataset.row_count, 8);
        assert_eq!(body.columns.len(), 3);
        let id = body.dataset.id;

        let req = test::TestRequest::get().uri("/datasets").to_request();
        let records: Vec<DatasetRecord> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(records.len(), 1);

        let req = test::TestRequest::get().uri(&format!("/datasets/{}", id)).to_request();
        let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;
        assert_eq!(detail.profile.row_count, 8);

        let req = test::TestRequest::get()
            .uri(&format!("/datasets/{}/preview?limit=3", id))
            .to_request();
        let preview: PreviewResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(preview.total_rows, 8);
        assert_eq!(preview.preview_rows, 3);
        assert_eq!(preview.columns, vec!["month", "product", "revenue"]);

        let req = test::TestRequest::delete().uri(&format!("/datasets/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri(&format!("/datasets/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_upload_rejections() {
        let state = state(Config {
            max_upload_bytes: 64,
            ..Config::default()
        });
        let app = app!(state);

        let resp = test::call_service(&app, upload("/datasets/upload", "notes.txt", "a,b\n1,2\n").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = test::call_service(&app, upload("/datasets/upload", "sales.csv", SALES_CSV).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status_code"], 422);

        let resp = test::call_service(&app, upload("/datasets/upload", "rows.json", "42").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_replace_refreshes_profile() {
        let state = state(Config::default());
        let app = app!(state);

        let resp = test::call_service(&app, upload("/datasets/upload", "sales.csv", SALES_CSV).to_request()).await;
        let body: UploadResponse = test::read_body_json(resp).await;
        let id = body.dataset.id;

        let req = upload(&format!("/datasets/{}", id), "sales.csv", "region,units\nn,1\ns,2\n")
            .method(actix_web::http::Method::PUT)
            .to_request();
        let replaced: UploadResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(replaced.dataset.row_count, 2);
        assert!(replaced.dataset.updated_at.is_some());

        let req = test::TestRequest::get().uri(&format!("/datasets/{}", id)).to_request();
        let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;
        assert_eq!(detail.profile.column_count, 2);
    }

    #[actix_web::test]
    async fn test_unprofilable_content_is_never_stored() {
        let state = state(Config::default());
        let app = app!(state);
        let nested = r#"[{"tags": [1, 2], "n": 1}, {"tags": [3], "n": 2}]"#;

        let resp = test::call_service(&app, upload("/datasets/upload", "nested.json", nested).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let req = test::TestRequest::get().uri("/datasets").to_request();
        let records: Vec<DatasetRecord> = test::call_and_read_body_json(&app, req).await;
        assert!(records.is_empty());

        let resp = test::call_service(&app, upload("/datasets/upload", "sales.csv", SALES_CSV).to_request()).await;
        let body: UploadResponse = test::read_body_json(resp).await;
        let id = body.dataset.id;

        let req = upload(&format!("/datasets/{}", id), "nested.json", nested)
            .method(actix_web::http::Method::PUT)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri(&format!("/datasets/{}", id)).to_request();
        let detail: DatasetDetail = test::call_and_read_body_json(&app, req).await;
        assert_eq!(detail.dataset.row_count, 8);
        assert_eq!(detail.dataset.revision, 0);
        assert_eq!(detail.profile.row_count, 8);
    }
}
