use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::Value;

use crate::error::ApiError;
use crate::model::TimeRecord;

/// A create/update payload that passed every check. Duration is recomputed
/// here and never taken from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecord {
    pub project: String,
    pub start_time: String,
    pub end_time: String,
    pub date: String,
    pub duration: i64,
    pub comment: String,
    pub tags: Vec<String>,
}

impl ValidRecord {
    pub fn into_record(self, id: String, created_at: String, updated_at: String) -> TimeRecord {
        TimeRecord {
            id,
            project: self.project,
            start_time: self.start_time,
            end_time: self.end_time,
            date: self.date,
            duration: self.duration,
            comment: self.comment,
            tags: self.tags,
            created_at,
            updated_at,
        }
    }
}

/// Checks every field and reports every violation, not just the first.
/// Validation runs over the raw JSON value; a derive-based parse would stop
/// at the first type mismatch.
pub fn validate_payload(body: &Value) -> Result<ValidRecord, Vec<String>> {
    let mut violations = Vec::new();

    let project = match body.get("project") {
        Some(Value::String(project)) if !project.trim().is_empty() => {
            Some(project.trim().to_string())
        }
        _ => {
            violations.push("Project is required".to_string());
            None
        }
    };

    let start = parse_timestamp(body.get("startTime"));
    if start.is_none() {
        violations.push("Start time must be a valid timestamp".to_string());
    }
    let end = parse_timestamp(body.get("endTime"));
    if end.is_none() {
        violations.push("End time must be a valid timestamp".to_string());
    }
    if let (Some((_, start)), Some((_, end))) = (&start, &end) {
        if end <= start {
            violations.push("End time must be after start time".to_string());
        }
    }

    let date = match body.get("date") {
        Some(Value::String(date)) if valid_date(date) => Some(date.to_owned()),
        _ => {
            violations.push("Date must be in YYYY-MM-DD format".to_string());
            None
        }
    };

    let comment = match body.get("comment") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(comment)) => comment.to_owned(),
        Some(_) => {
            violations.push("Comment must be a string".to_string());
            String::new()
        }
    };

    let tags = match body.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => {
            let mut tags = Vec::new();
            let mut malformed = false;
            for value in values {
                match value {
                    Value::String(tag) => {
                        let tag = tag.trim();
                        if !tag.is_empty() {
                            tags.push(tag.to_string());
                        }
                    }
                    _ => malformed = true,
                }
            }
            if malformed {
                violations.push("Tags must be a list of strings".to_string());
            }
            tags.sort();
            tags.dedup();
            tags
        }
        Some(_) => {
            violations.push("Tags must be a list of strings".to_string());
            Vec::new()
        }
    };

    if let (true, Some(project), Some((start_raw, start)), Some((end_raw, end)), Some(date)) =
        (violations.is_empty(), project, start, end, date)
    {
        Ok(ValidRecord {
            project,
            duration: rounded_minutes(start, end),
            start_time: start_raw,
            end_time: end_raw,
            date,
            comment,
            tags,
        })
    } else {
        Err(violations)
    }
}

pub fn valid_date(raw: &str) -> bool {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        // chrono accepts "2024-1-1"; the round-trip pins the zero-padded form.
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string() == raw,
        Err(_) => false,
    }
}

/// Validates an optional `YYYY-MM-DD` query parameter, treating the empty
/// string as absent.
pub fn optional_date(raw: Option<&str>, label: &str) -> Result<Option<String>, ApiError> {
    match raw {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) if valid_date(raw) => Ok(Some(raw.to_string())),
        Some(_) => Err(ApiError::Validation(vec![format!(
            "{label} must be in YYYY-MM-DD format"
        )])),
    }
}

/// Validates an optional positive `limit` query parameter.
pub fn limit_param(raw: Option<&str>, default: usize) -> Result<usize, ApiError> {
    match raw {
        None => Ok(default),
        Some(raw) if raw.is_empty() => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(limit) if limit > 0 => Ok(limit),
            _ => Err(ApiError::Validation(vec![
                "Limit must be a positive integer".to_string(),
            ])),
        },
    }
}

fn parse_timestamp(value: Option<&Value>) -> Option<(String, DateTime<FixedOffset>)> {
    match value {
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|parsed| (raw.to_owned(), parsed)),
        _ => None,
    }
}

fn rounded_minutes(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> i64 {
    let seconds = end.signed_duration_since(start).num_seconds();
    (seconds as f64 / 60.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_payload_computes_duration() {
        let valid = validate_payload(&json!({
            "project": "A",
            "startTime": "2024-01-01T09:00:00Z",
            "endTime": "2024-01-01T10:30:00Z",
            "date": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(valid.project, "A");
        assert_eq!(valid.duration, 90);
        assert_eq!(valid.comment, "");
        assert!(valid.tags.is_empty());
    }

    #[test]
    fn duration_rounds_to_nearest_minute() {
        let valid = validate_payload(&json!({
            "project": "A",
            "startTime": "2024-01-01T09:00:00Z",
            "endTime": "2024-01-01T09:01:30Z",
            "date": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(valid.duration, 2);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let violations = validate_payload(&json!({
            "project": "A",
            "startTime": "2024-01-01T10:00:00Z",
            "endTime": "2024-01-01T10:00:00Z",
            "date": "2024-01-01"
        }))
        .unwrap_err();
        assert!(violations.contains(&"End time must be after start time".to_string()));
    }

    #[test]
    fn every_violation_is_reported() {
        let violations = validate_payload(&json!({
            "project": "",
            "startTime": "yesterday",
            "endTime": "2024-01-01T10:00:00Z",
            "date": "01/01/2024",
            "comment": 7,
            "tags": "focus"
        }))
        .unwrap_err();
        assert_eq!(
            violations,
            vec![
                "Project is required".to_string(),
                "Start time must be a valid timestamp".to_string(),
                "Date must be in YYYY-MM-DD format".to_string(),
                "Comment must be a string".to_string(),
                "Tags must be a list of strings".to_string(),
            ]
        );
    }

    #[test]
    fn tags_are_deduplicated_and_sorted() {
        let valid = validate_payload(&json!({
            "project": "A",
            "startTime": "2024-01-01T09:00:00Z",
            "endTime": "2024-01-01T10:00:00Z",
            "date": "2024-01-01",
            "tags": ["focus", "deep-work", "focus", "  ", "api"]
        }))
        .unwrap();
        assert_eq!(valid.tags, vec!["api", "deep-work", "focus"]);
    }

    #[test]
    fn into_record_keeps_the_given_identity_and_stamps() {
        let valid = validate_payload(&json!({
            "project": "A",
            "startTime": "2024-01-02T09:00:00Z",
            "endTime": "2024-01-02T10:00:00Z",
            "date": "2024-01-02"
        }))
        .unwrap();
        let record = valid.into_record(
            "existing-id".to_string(),
            "2024-01-01T08:00:00.000Z".to_string(),
            "2024-01-02T10:05:00.000Z".to_string(),
        );
        assert_eq!(record.id, "existing-id");
        assert_eq!(record.created_at, "2024-01-01T08:00:00.000Z");
        assert_eq!(record.updated_at, "2024-01-02T10:05:00.000Z");
        assert_eq!(record.record_key(), "2024-01-02#existing-id");
    }

    #[test]
    fn date_requires_zero_padding() {
        assert!(valid_date("2024-01-01"));
        assert!(!valid_date("2024-1-1"));
        assert!(!valid_date("2024-13-01"));
        assert!(!valid_date("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn optional_date_rejects_malformed_values() {
        assert_eq!(optional_date(None, "Start date").unwrap(), None);
        assert_eq!(optional_date(Some(""), "Start date").unwrap(), None);
        assert_eq!(
            optional_date(Some("2024-02-03"), "Start date").unwrap(),
            Some("2024-02-03".to_string())
        );
        let err = optional_date(Some("02/03/2024"), "Start date").unwrap_err();
        assert_eq!(err.to_string(), "Start date must be in YYYY-MM-DD format");
    }

    #[test]
    fn limit_param_requires_a_positive_integer() {
        assert_eq!(limit_param(None, 100).unwrap(), 100);
        assert_eq!(limit_param(Some("25"), 100).unwrap(), 25);
        assert!(limit_param(Some("0"), 100).is_err());
        assert!(limit_param(Some("many"), 100).is_err());
    }
}
