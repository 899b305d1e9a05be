//! Pinboard export import: a JSON array of bookmark records.
//!
//! Every record is validated and every unique tag path resolved before the
//! first link row is written; the link and association inserts then run in
//! a single transaction.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde_json::Value;
use tracing::info;

use crate::db::Store;
use crate::db::repositories::link::associate;
use crate::entities::{links, tags, users};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinboardRecord {
    pub href: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub private: bool,
}

pub fn parse_pinboard(data: &[u8]) -> Result<Vec<PinboardRecord>> {
    let value: Value = serde_json::from_slice(data)
        .map_err(|_| Error::BadFileUpload("could not parse file as JSON".to_string()))?;

    let Value::Array(items) = value else {
        return Err(Error::BadFileUpload("expected a list".to_string()));
    };

    items.iter().map(parse_record).collect()
}

fn parse_record(item: &Value) -> Result<PinboardRecord> {
    let href = required_str(item, "href")?;
    let description = required_str(item, "description")?;
    let extended = required_str(item, "extended")?;
    let tags = required_str(item, "tags")?;
    let time = required_str(item, "time")?;
    let shared = required_str(item, "shared")?;

    let created = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%SZ")
        .map_err(|_| Error::BadFileUpload(format!("unparseable time '{time}'")))?
        .and_utc();

    Ok(PinboardRecord {
        href: href.to_string(),
        // Pinboard calls the title "description" and the notes "extended".
        name: description.to_string(),
        description: extended.to_string(),
        tags: tags.split_whitespace().map(String::from).collect(),
        created,
        private: shared == "no",
    })
}

fn required_str<'a>(item: &'a Value, key: &str) -> Result<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::BadFileUpload(format!("missing key {key}")))
}

/// Import a whole export for `user`. Returns the number of links created.
pub async fn import_pinboard(store: &Store, user: &users::Model, data: &[u8]) -> Result<usize> {
    let records = parse_pinboard(data)?;

    // Resolve each unique tag path once across the batch, ahead of the
    // link transaction.
    let mut tags_by_path: HashMap<String, tags::Model> = HashMap::new();
    for record in &records {
        for path in &record.tags {
            if !tags_by_path.contains_key(path) {
                let tag = store.resolve_tag(user.id, path).await?;
                tags_by_path.insert(path.clone(), tag);
            }
        }
    }

    let txn = store.conn.begin().await?;

    for record in &records {
        let link = links::ActiveModel {
            url: Set(record.href.clone()),
            name: Set(record.name.clone()),
            description: Set(record.description.clone()),
            created: Set(record.created),
            private: Set(record.private),
            user_id: Set(user.id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for path in &record.tags {
            if let Some(tag) = tags_by_path.get(path) {
                associate(&txn, link.id, tag).await?;
            }
        }
    }

    txn.commit().await?;

    info!(count = records.len(), user = %user.name, "pinboard import complete");
    Ok(records.len())
}
