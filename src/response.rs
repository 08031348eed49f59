//! Standard response envelope: `{ "data": ..., "meta": ... }`.

use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T> SuccessOne<T> {
    pub fn new(data: T) -> Self {
        SuccessOne { data, meta: None }
    }
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
    /// Collection URI that changes to these rows are reported on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_uri: Option<String>,
}
