use std::collections::HashMap;
use std::str::FromStr;

use aws_sdk_dynamodb::model::AttributeValue;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One logged time interval. `duration` is whole minutes, always recomputed
/// from the timestamps on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRecord {
    pub id: String,
    pub project: String,
    pub start_time: String,
    pub end_time: String,
    pub date: String,
    pub duration: i64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

// The date prefix is fixed-width and '#' sorts below every date digit, so
// lexicographic sort-key order is chronological.
pub fn record_key(date: &str, id: &str) -> String {
    format!("{date}#{id}")
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl TimeRecord {
    pub fn record_key(&self) -> String {
        record_key(&self.date, &self.id)
    }

    /// Sort key of the project index, denormalized onto every item so
    /// project-scoped queries stay consistent with the base table.
    pub fn project_date(&self) -> String {
        format!("{}#{}", self.project, self.date)
    }

    pub fn to_item(&self, owner: &str) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::from([
            (String::from("owner"), AttributeValue::S(owner.to_string())),
            (String::from("record_key"), AttributeValue::S(self.record_key())),
            (String::from("project_date"), AttributeValue::S(self.project_date())),
            (String::from("id"), AttributeValue::S(self.id.to_owned())),
            (String::from("project"), AttributeValue::S(self.project.to_owned())),
            (String::from("start_time"), AttributeValue::S(self.start_time.to_owned())),
            (String::from("end_time"), AttributeValue::S(self.end_time.to_owned())),
            (String::from("date"), AttributeValue::S(self.date.to_owned())),
            (String::from("duration"), AttributeValue::N(self.duration.to_string())),
            (String::from("created_at"), AttributeValue::S(self.created_at.to_owned())),
            (String::from("updated_at"), AttributeValue::S(self.updated_at.to_owned())),
        ]);
        // String sets cannot be empty and empty comments carry no information,
        // so both are stored as absent attributes.
        if !self.comment.is_empty() {
            item.insert(String::from("comment"), AttributeValue::S(self.comment.to_owned()));
        }
        if !self.tags.is_empty() {
            item.insert(String::from("tags"), AttributeValue::Ss(self.tags.to_vec()));
        }
        item
    }

    pub fn from_item(item: &HashMap<String, AttributeValue>) -> Option<TimeRecord> {
        let duration = match item.get("duration") {
            Some(AttributeValue::N(raw)) => i64::from_str(raw).ok()?,
            _ => return None,
        };
        let tags = match item.get("tags") {
            Some(AttributeValue::Ss(tags)) => {
                let mut tags = tags.to_vec();
                tags.sort();
                tags
            }
            _ => Vec::new(),
        };
        Some(TimeRecord {
            id: string_attr(item, "id")?,
            project: string_attr(item, "project")?,
            start_time: string_attr(item, "start_time")?,
            end_time: string_attr(item, "end_time")?,
            date: string_attr(item, "date")?,
            duration,
            comment: string_attr(item, "comment").unwrap_or_default(),
            tags,
            created_at: string_attr(item, "created_at")?,
            updated_at: string_attr(item, "updated_at")?,
        })
    }
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Some(value.to_owned()),
        _ => None,
    }
}
