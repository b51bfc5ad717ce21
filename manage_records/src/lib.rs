use lambda_http::{Body, Error, Request, RequestExt, Response};
use record_store::error::ApiError;
use record_store::http;
use record_store::identity;
use record_store::model::now_timestamp;
use record_store::store::{RecordQuery, RecordStore};
use record_store::validate::{self, validate_payload};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

const DEFAULT_LIST_LIMIT: usize = 100;

pub async fn function_handler(
    store: &RecordStore,
    event: Request,
) -> Result<Response<Body>, Error> {
    debug!("request: {:?}, context: {:?}", event, event.request_context());
    if event.method().as_str() == "OPTIONS" {
        return Ok(http::preflight_response()?);
    }
    let owner = match identity::owner_id(&event) {
        Some(owner) => owner,
        None => return Ok(http::error_response(401, "Unauthorized")?),
    };
    let result = match event.method().as_str() {
        "GET" => list_records(store, &owner, &event).await,
        "POST" => create_record(store, &owner, &event).await,
        "PUT" => update_record(store, &owner, &event).await,
        "DELETE" => delete_record(store, &owner, &event).await,
        _ => return Ok(http::error_response(405, "Method not allowed")?),
    };
    match result {
        Ok(response) => Ok(response),
        Err(err) => {
            error!("{} {} failed: {}", event.method(), event.uri().path(), err);
            Ok(http::error_response(err.status_code(), &err.to_string())?)
        }
    }
}

async fn list_records(
    store: &RecordStore,
    owner: &str,
    event: &Request,
) -> Result<Response<Body>, ApiError> {
    let params = event.query_string_parameters();
    let query = RecordQuery {
        start_date: validate::optional_date(params.first("startDate"), "Start date")?,
        end_date: validate::optional_date(params.first("endDate"), "End date")?,
        project: params
            .first("project")
            .filter(|project| !project.is_empty())
            .map(String::from),
        limit: validate::limit_param(params.first("limit"), DEFAULT_LIST_LIMIT)?,
    };
    let records = store.query_records(owner, &query).await?;
    http::json_response(200, &json!({ "records": records }))
}

async fn create_record(
    store: &RecordStore,
    owner: &str,
    event: &Request,
) -> Result<Response<Body>, ApiError> {
    let body = parse_body(event)?;
    let valid = validate_payload(&body).map_err(ApiError::Validation)?;
    let now = now_timestamp();
    let record = valid.into_record(Uuid::new_v4().to_string(), now.to_owned(), now);
    store.put_record(owner, &record).await?;
    info!("created record {}", record.id);
    http::json_response(200, &record)
}

async fn update_record(
    store: &RecordStore,
    owner: &str,
    event: &Request,
) -> Result<Response<Body>, ApiError> {
    let id = record_id(event)?;
    let body = parse_body(event)?;
    let valid = validate_payload(&body).map_err(ApiError::Validation)?;
    let existing = store
        .find_record(owner, &id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let record = valid.into_record(existing.id, existing.created_at, now_timestamp());
    // The date is part of the sort key, so a date change moves the item.
    // Write the new key first, then sweep stale copies: a crash in between
    // leaves a duplicate, never a lost record, and rerunning converges.
    store.put_record(owner, &record).await?;
    store
        .delete_copies(owner, &record.id, Some(&record.record_key()))
        .await?;
    info!("updated record {}", record.id);
    http::json_response(200, &record)
}

async fn delete_record(
    store: &RecordStore,
    owner: &str,
    event: &Request,
) -> Result<Response<Body>, ApiError> {
    let id = record_id(event)?;
    store
        .find_record(owner, &id)
        .await?
        .ok_or(ApiError::NotFound)?;
    store.delete_copies(owner, &id, None).await?;
    info!("deleted record {id}");
    http::no_content_response()
}

fn record_id(event: &Request) -> Result<String, ApiError> {
    let path = event.uri().path();
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(segment) if !segment.is_empty() && segment != "time-records" => {
            Ok(segment.to_string())
        }
        _ => Err(ApiError::Validation(vec![
            "Record id is required".to_string(),
        ])),
    }
}

fn parse_body(event: &Request) -> Result<Value, ApiError> {
    let parsed: serde_json::Result<Value> = match event.body() {
        Body::Text(text) => serde_json::from_str(text),
        Body::Binary(bytes) => serde_json::from_slice(bytes),
        Body::Empty => {
            return Err(ApiError::Validation(vec![
                "Expected a request body".to_string(),
            ]))
        }
    };
    parsed.map_err(|err| ApiError::Validation(vec![format!("Malformed JSON body: {err}")]))
}
