use std::collections::BTreeSet;

use lambda_http::{Body, Error, Request, RequestExt, Response};
use record_store::error::ApiError;
use record_store::http;
use record_store::identity;
use record_store::model::TimeRecord;
use record_store::store::RecordStore;
use record_store::validate;
use serde_json::json;
use tracing::{debug, error};

pub const DEFAULT_TAG_LIMIT: usize = 50;

/// Union of the tag strings across all records, sorted lexicographically,
/// optionally filtered to tags containing `filter` (case-insensitive) and
/// truncated to `limit`.
pub fn collect_tags(records: &[TimeRecord], filter: Option<&str>, limit: usize) -> Vec<String> {
    let mut tags: BTreeSet<String> = BTreeSet::new();
    for record in records {
        for tag in &record.tags {
            tags.insert(tag.to_owned());
        }
    }
    let needle = filter.map(str::to_lowercase);
    tags.into_iter()
        .filter(|tag| match &needle {
            Some(needle) => tag.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .take(limit)
        .collect()
}

pub async fn function_handler(
    store: &RecordStore,
    event: Request,
) -> Result<Response<Body>, Error> {
    debug!("request: {:?}, context: {:?}", event, event.request_context());
    if event.method().as_str() == "OPTIONS" {
        return Ok(http::preflight_response()?);
    }
    if event.method().as_str() != "GET" {
        return Ok(http::error_response(405, "Method not allowed")?);
    }
    let owner = match identity::owner_id(&event) {
        Some(owner) => owner,
        None => return Ok(http::error_response(401, "Unauthorized")?),
    };
    match lookup_tags(store, &owner, &event).await {
        Ok(response) => Ok(response),
        Err(err) => {
            error!("tag lookup failed: {err}");
            Ok(http::error_response(err.status_code(), &err.to_string())?)
        }
    }
}

async fn lookup_tags(
    store: &RecordStore,
    owner: &str,
    event: &Request,
) -> Result<Response<Body>, ApiError> {
    let params = event.query_string_parameters();
    let limit = validate::limit_param(params.first("limit"), DEFAULT_TAG_LIMIT)?;
    let query = params
        .first("q")
        .filter(|q| !q.is_empty())
        .map(String::from);
    let records = store.collect_range(owner, None, None).await?;
    let tags = collect_tags(&records, query.as_deref(), limit);
    http::json_response(200, &json!({ "tags": tags }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tags: &[&str]) -> TimeRecord {
        TimeRecord {
            id: "id".to_string(),
            project: "A".to_string(),
            start_time: "2024-01-01T09:00:00Z".to_string(),
            end_time: "2024-01-01T10:00:00Z".to_string(),
            date: "2024-01-01".to_string(),
            duration: 60,
            comment: String::new(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            created_at: "2024-01-01T10:00:00.000Z".to_string(),
            updated_at: "2024-01-01T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn tags_are_deduplicated_and_sorted() {
        let records = vec![
            record(&["writing", "api"]),
            record(&["api", "deep-work"]),
        ];
        assert_eq!(
            collect_tags(&records, None, DEFAULT_TAG_LIMIT),
            vec!["api", "deep-work", "writing"]
        );
    }

    #[test]
    fn filter_is_case_insensitive() {
        let records = vec![record(&["Backend", "frontend", "meetings"])];
        assert_eq!(
            collect_tags(&records, Some("END"), DEFAULT_TAG_LIMIT),
            vec!["Backend", "frontend"]
        );
    }

    #[test]
    fn output_is_truncated_to_the_limit() {
        let records = vec![record(&["a", "b", "c", "d"])];
        assert_eq!(collect_tags(&records, None, 2), vec!["a", "b"]);
    }

    #[test]
    fn no_records_means_no_tags() {
        assert!(collect_tags(&[], Some("x"), DEFAULT_TAG_LIMIT).is_empty());
    }
}
