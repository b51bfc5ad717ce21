use std::collections::{BTreeMap, HashMap};

use lambda_http::{Body, Error, Request, RequestExt, Response};
use record_store::error::ApiError;
use record_store::http;
use record_store::identity;
use record_store::model::TimeRecord;
use record_store::store::RecordStore;
use record_store::validate;
use serde::Serialize;
use tracing::{debug, error};

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStats {
    pub total_duration: i64,
    pub total_records: usize,
    pub total_days: usize,
    pub average_daily_time: i64,
    pub project_breakdown: Vec<ProjectDuration>,
    pub tag_breakdown: Vec<TagDuration>,
    pub daily_breakdown: Vec<DailyDuration>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDuration {
    pub project: String,
    pub duration: i64,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDuration {
    pub tag: String,
    pub duration: i64,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDuration {
    pub date: String,
    pub duration: i64,
}

/// Folds a user's records into totals and breakdowns. A record with N tags
/// contributes its full duration to each of the N tags.
pub fn fold_stats(records: &[TimeRecord]) -> TimeStats {
    let mut total_duration = 0;
    let mut by_project: HashMap<String, i64> = HashMap::new();
    let mut by_tag: HashMap<String, i64> = HashMap::new();
    let mut by_day: BTreeMap<String, i64> = BTreeMap::new();
    for record in records {
        total_duration += record.duration;
        *by_project.entry(record.project.to_owned()).or_insert(0) += record.duration;
        for tag in &record.tags {
            *by_tag.entry(tag.to_owned()).or_insert(0) += record.duration;
        }
        *by_day.entry(record.date.to_owned()).or_insert(0) += record.duration;
    }
    let total_days = by_day.len();
    let average_daily_time = if total_days == 0 {
        0
    } else {
        (total_duration as f64 / total_days as f64).round() as i64
    };
    let mut project_breakdown: Vec<ProjectDuration> = by_project
        .into_iter()
        .map(|(project, duration)| ProjectDuration { project, duration })
        .collect();
    project_breakdown
        .sort_by(|a, b| b.duration.cmp(&a.duration).then_with(|| a.project.cmp(&b.project)));
    let mut tag_breakdown: Vec<TagDuration> = by_tag
        .into_iter()
        .map(|(tag, duration)| TagDuration { tag, duration })
        .collect();
    tag_breakdown.sort_by(|a, b| b.duration.cmp(&a.duration).then_with(|| a.tag.cmp(&b.tag)));
    // BTreeMap iteration is already in ascending date order.
    let daily_breakdown = by_day
        .into_iter()
        .map(|(date, duration)| DailyDuration { date, duration })
        .collect();
    TimeStats {
        total_duration,
        total_records: records.len(),
        total_days,
        average_daily_time,
        project_breakdown,
        tag_breakdown,
        daily_breakdown,
    }
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
    match gather_stats(store, &owner, &event).await {
        Ok(response) => Ok(response),
        Err(err) => {
            error!("stats request failed: {err}");
            Ok(http::error_response(err.status_code(), &err.to_string())?)
        }
    }
}

async fn gather_stats(
    store: &RecordStore,
    owner: &str,
    event: &Request,
) -> Result<Response<Body>, ApiError> {
    let params = event.query_string_parameters();
    let start = validate::optional_date(params.first("startDate"), "Start date")?;
    let end = validate::optional_date(params.first("endDate"), "End date")?;
    let records = store
        .collect_range(owner, start.as_deref(), end.as_deref())
        .await?;
    http::json_response(200, &fold_stats(&records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, date: &str, duration: i64, tags: &[&str]) -> TimeRecord {
        TimeRecord {
            id: format!("{project}-{date}-{duration}"),
            project: project.to_string(),
            start_time: format!("{date}T09:00:00Z"),
            end_time: format!("{date}T10:00:00Z"),
            date: date.to_string(),
            duration,
            comment: String::new(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            created_at: format!("{date}T10:00:00.000Z"),
            updated_at: format!("{date}T10:00:00.000Z"),
        }
    }

    #[test]
    fn empty_input_yields_zero_totals() {
        let stats = fold_stats(&[]);
        assert_eq!(stats.total_duration, 0);
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.total_days, 0);
        assert_eq!(stats.average_daily_time, 0);
        assert!(stats.project_breakdown.is_empty());
        assert!(stats.tag_breakdown.is_empty());
        assert!(stats.daily_breakdown.is_empty());
    }

    #[test]
    fn same_day_records_share_one_day() {
        let records = vec![
            record("A", "2024-01-01", 60, &[]),
            record("B", "2024-01-01", 120, &[]),
        ];
        let stats = fold_stats(&records);
        assert_eq!(stats.total_duration, 180);
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.total_days, 1);
        assert_eq!(stats.average_daily_time, 180);
    }

    #[test]
    fn total_duration_is_the_sum_of_records() {
        let records = vec![
            record("A", "2024-01-01", 30, &[]),
            record("A", "2024-01-02", 45, &[]),
            record("B", "2024-01-03", 25, &[]),
        ];
        let stats = fold_stats(&records);
        assert_eq!(
            stats.total_duration,
            records.iter().map(|r| r.duration).sum::<i64>()
        );
        assert_eq!(stats.average_daily_time, 33); // 100 / 3 rounded
    }

    #[test]
    fn project_breakdown_sorts_by_duration_descending() {
        let records = vec![
            record("small", "2024-01-01", 10, &[]),
            record("big", "2024-01-01", 100, &[]),
            record("mid", "2024-01-02", 50, &[]),
        ];
        let projects: Vec<String> = fold_stats(&records)
            .project_breakdown
            .into_iter()
            .map(|p| p.project)
            .collect();
        assert_eq!(projects, vec!["big", "mid", "small"]);
    }

    #[test]
    fn each_tag_receives_the_full_duration() {
        let records = vec![record("A", "2024-01-01", 60, &["deep", "api"])];
        let stats = fold_stats(&records);
        assert_eq!(
            stats.tag_breakdown,
            vec![
                TagDuration { tag: "api".to_string(), duration: 60 },
                TagDuration { tag: "deep".to_string(), duration: 60 },
            ]
        );
    }

    #[test]
    fn daily_breakdown_is_ascending_by_date() {
        let records = vec![
            record("A", "2024-02-01", 10, &[]),
            record("A", "2024-01-05", 20, &[]),
            record("A", "2024-01-31", 30, &[]),
        ];
        let dates: Vec<String> = fold_stats(&records)
            .daily_breakdown
            .into_iter()
            .map(|d| d.date)
            .collect();
        assert_eq!(dates, vec!["2024-01-05", "2024-01-31", "2024-02-01"]);
    }
}
