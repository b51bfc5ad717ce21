use std::collections::HashMap;
use std::env;

use aws_config::meta::region::RegionProviderChain;
use aws_sdk_dynamodb as ddb;
use aws_sdk_dynamodb::client::fluent_builders::Query;
use aws_sdk_dynamodb::model::AttributeValue;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::error::ApiError;
use crate::model::TimeRecord;

pub const TABLE_NAME: &str = "TABLE_NAME";
pub const DYNAMODB_ENDPOINT: &str = "DYNAMODB_ENDPOINT";

const PROJECT_DATE_INDEX: &str = "project-date-index";
const BULK_PAGE_SIZE: i32 = 50;

/// DynamoDB access for one time-record table. Built once at startup and
/// borrowed by every invocation.
#[derive(Debug)]
pub struct RecordStore {
    client: ddb::Client,
    table_name: String,
}

/// List-query filters: inclusive date range, optional project, result cap.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub project: Option<String>,
    pub limit: usize,
}

/// One page of an owner's records plus the continuation token, if any.
pub struct RecordPage {
    pub records: Vec<TimeRecord>,
    pub next: Option<HashMap<String, AttributeValue>>,
}

impl RecordStore {
    pub fn new(client: ddb::Client, table_name: String) -> RecordStore {
        RecordStore { client, table_name }
    }

    pub async fn from_env() -> Result<RecordStore, lambda_http::Error> {
        let table_name = env::var(TABLE_NAME)?;
        let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
        let config = aws_config::from_env().region(region_provider).load().await;
        let ddb_config = match env::var(DYNAMODB_ENDPOINT) {
            Ok(endpoint) => ddb::config::Builder::from(&config).endpoint_url(endpoint).build(),
            _ => ddb::config::Builder::from(&config).build(),
        };
        Ok(RecordStore::new(ddb::Client::from_conf(ddb_config), table_name))
    }

    pub async fn put_record(&self, owner: &str, record: &TimeRecord) -> Result<(), ApiError> {
        debug!("putting record {} under {}", record.id, record.record_key());
        self.client
            .put_item()
            .table_name(self.table_name.to_owned())
            .set_item(Some(record.to_item(owner)))
            .send()
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    /// Locates a record by id. The sort key embeds the date, so this is a
    /// partition-scoped filtered query rather than a key get.
    pub async fn find_record(&self, owner: &str, id: &str) -> Result<Option<TimeRecord>, ApiError> {
        let mut pages = self.id_query(owner, id).into_paginator().send();
        while let Some(result) = pages.next().await {
            match result.map_err(ApiError::internal)?.items() {
                Some(items) => {
                    if let Some(record) = items.iter().filter_map(TimeRecord::from_item).next() {
                        return Ok(Some(record));
                    }
                }
                None => break,
            }
        }
        Ok(None)
    }

    /// Deletes every item carrying this record id except `keep_key`. The
    /// update path keeps its freshly written key so a date change never
    /// leaves the old copy behind; the delete path keeps nothing.
    pub async fn delete_copies(
        &self,
        owner: &str,
        id: &str,
        keep_key: Option<&str>,
    ) -> Result<usize, ApiError> {
        let mut stale_keys = Vec::new();
        let mut pages = self.id_query(owner, id).into_paginator().send();
        while let Some(result) = pages.next().await {
            match result.map_err(ApiError::internal)?.items() {
                Some(items) => {
                    for item in items {
                        if let Some(AttributeValue::S(key)) = item.get("record_key") {
                            if keep_key != Some(key.as_str()) {
                                stale_keys.push(key.to_owned());
                            }
                        }
                    }
                }
                None => break,
            }
        }
        for key in &stale_keys {
            self.delete_key(owner, key).await?;
        }
        Ok(stale_keys.len())
    }

    pub async fn delete_key(&self, owner: &str, record_key: &str) -> Result<(), ApiError> {
        self.client
            .delete_item()
            .table_name(self.table_name.to_owned())
            .key("owner", AttributeValue::S(owner.to_string()))
            .key("record_key", AttributeValue::S(record_key.to_string()))
            .send()
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    /// List query: newest first, stops as soon as the cap is reached.
    pub async fn query_records(
        &self,
        owner: &str,
        query: &RecordQuery,
    ) -> Result<Vec<TimeRecord>, ApiError> {
        let request = match &query.project {
            Some(project) => self.project_query(
                owner,
                project,
                query.start_date.as_deref(),
                query.end_date.as_deref(),
            ),
            None => self.range_query(owner, query.start_date.as_deref(), query.end_date.as_deref()),
        };
        let mut pages = request
            .scan_index_forward(false)
            .limit(i32::try_from(query.limit).unwrap_or(i32::MAX))
            .into_paginator()
            .send();
        let mut records = Vec::new();
        'pages: while let Some(result) = pages.next().await {
            match result.map_err(ApiError::internal)?.items() {
                Some(items) => {
                    for item in items {
                        if let Some(record) = TimeRecord::from_item(item) {
                            records.push(record);
                            if records.len() >= query.limit {
                                break 'pages;
                            }
                        }
                    }
                }
                None => break,
            }
        }
        Ok(records)
    }

    /// Every record in the (optional) date range, fully paginated. Feeds
    /// the statistics and tag handlers.
    pub async fn collect_range(
        &self,
        owner: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<TimeRecord>, ApiError> {
        let mut pages = self.range_query(owner, start, end).into_paginator().send();
        let mut records = Vec::new();
        while let Some(result) = pages.next().await {
            match result.map_err(ApiError::internal)?.items() {
                Some(items) => records.extend(items.iter().filter_map(TimeRecord::from_item)),
                None => break,
            }
        }
        Ok(records)
    }

    /// One page of the owner's records with explicit continuation-token
    /// threading, for the bulk deletion walker.
    pub async fn page_of_records(
        &self,
        owner: &str,
        exclusive_start: Option<HashMap<String, AttributeValue>>,
    ) -> Result<RecordPage, ApiError> {
        let result = self
            .client
            .query()
            .table_name(self.table_name.to_owned())
            .key_condition_expression("#owner = :owner")
            .expression_attribute_names("#owner", "owner")
            .expression_attribute_values(":owner", AttributeValue::S(owner.to_string()))
            .limit(BULK_PAGE_SIZE)
            .set_exclusive_start_key(exclusive_start)
            .send()
            .await
            .map_err(ApiError::internal)?;
        let records = match result.items() {
            Some(items) => items.iter().filter_map(TimeRecord::from_item).collect(),
            None => Vec::new(),
        };
        Ok(RecordPage {
            records,
            next: result.last_evaluated_key().cloned(),
        })
    }

    fn id_query(&self, owner: &str, id: &str) -> Query {
        self.client
            .query()
            .table_name(self.table_name.to_owned())
            .key_condition_expression("#owner = :owner")
            .filter_expression("#id = :id")
            .expression_attribute_names("#owner", "owner")
            .expression_attribute_names("#id", "id")
            .expression_attribute_values(":owner", AttributeValue::S(owner.to_string()))
            .expression_attribute_values(":id", AttributeValue::S(id.to_string()))
    }

    // Range bounds enclose the "{date}#{id}" sort keys: '#' opens the day
    // and '~' (0x7e) sorts above every uuid character.
    fn range_query(&self, owner: &str, start: Option<&str>, end: Option<&str>) -> Query {
        let request = self
            .client
            .query()
            .table_name(self.table_name.to_owned())
            .expression_attribute_names("#owner", "owner")
            .expression_attribute_values(":owner", AttributeValue::S(owner.to_string()));
        match (start, end) {
            (Some(start), Some(end)) => request
                .key_condition_expression("#owner = :owner AND #key BETWEEN :lo AND :hi")
                .expression_attribute_names("#key", "record_key")
                .expression_attribute_values(":lo", AttributeValue::S(format!("{start}#")))
                .expression_attribute_values(":hi", AttributeValue::S(format!("{end}#~"))),
            (Some(start), None) => request
                .key_condition_expression("#owner = :owner AND #key >= :lo")
                .expression_attribute_names("#key", "record_key")
                .expression_attribute_values(":lo", AttributeValue::S(format!("{start}#"))),
            (None, Some(end)) => request
                .key_condition_expression("#owner = :owner AND #key <= :hi")
                .expression_attribute_names("#key", "record_key")
                .expression_attribute_values(":hi", AttributeValue::S(format!("{end}#~"))),
            (None, None) => request.key_condition_expression("#owner = :owner"),
        }
    }

    fn project_query(
        &self,
        owner: &str,
        project: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Query {
        let request = self
            .client
            .query()
            .table_name(self.table_name.to_owned())
            .index_name(PROJECT_DATE_INDEX)
            .expression_attribute_names("#owner", "owner")
            .expression_attribute_names("#pd", "project_date")
            .expression_attribute_values(":owner", AttributeValue::S(owner.to_string()));
        match (start, end) {
            (None, None) => request
                .key_condition_expression("#owner = :owner AND begins_with(#pd, :prefix)")
                .expression_attribute_values(":prefix", AttributeValue::S(format!("{project}#"))),
            (start, end) => {
                let lo = match start {
                    Some(start) => format!("{project}#{start}"),
                    None => format!("{project}#"),
                };
                let hi = match end {
                    Some(end) => format!("{project}#{end}"),
                    None => format!("{project}#~"),
                };
                request
                    .key_condition_expression("#owner = :owner AND #pd BETWEEN :lo AND :hi")
                    .expression_attribute_values(":lo", AttributeValue::S(lo))
                    .expression_attribute_values(":hi", AttributeValue::S(hi))
            }
        }
    }
}
