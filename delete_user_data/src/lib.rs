use std::collections::HashMap;

use aws_sdk_dynamodb::model::AttributeValue;
use lambda_http::{Body, Error, Request, RequestExt, Response};
use record_store::error::ApiError;
use record_store::http;
use record_store::identity;
use record_store::store::RecordStore;
use serde_json::json;
use tracing::{debug, error, info};

/// Walks every record under the owner page by page, deleting each item
/// individually, until the store stops returning a continuation token.
/// A single delete failure aborts the walk; whatever was already deleted
/// stays deleted.
pub async fn delete_all_records(store: &RecordStore, owner: &str) -> Result<usize, ApiError> {
    let mut deleted = 0;
    let mut continuation: Option<HashMap<String, AttributeValue>> = None;
    loop {
        let page = store.page_of_records(owner, continuation.take()).await?;
        for record in &page.records {
            store.delete_key(owner, &record.record_key()).await?;
            deleted += 1;
        }
        match page.next {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }
    Ok(deleted)
}

pub async fn function_handler(
    store: &RecordStore,
    event: Request,
) -> Result<Response<Body>, Error> {
    debug!("request: {:?}, context: {:?}", event, event.request_context());
    if event.method().as_str() == "OPTIONS" {
        return Ok(http::preflight_response()?);
    }
    if event.method().as_str() != "POST" {
        return Ok(http::error_response(405, "Method not allowed")?);
    }
    let owner = match identity::owner_id(&event) {
        Some(owner) => owner,
        None => return Ok(http::error_response(401, "Unauthorized")?),
    };
    match delete_all_records(store, &owner).await {
        Ok(deleted) => {
            info!("bulk deletion removed {deleted} records");
            Ok(http::json_response(200, &json!({ "deletedCount": deleted }))?)
        }
        Err(err) => {
            error!("bulk deletion failed: {err}");
            Ok(http::error_response(err.status_code(), &err.to_string())?)
        }
    }
}
