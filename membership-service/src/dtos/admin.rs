use serde::{Deserialize, Serialize};
use validator::Validate;

/// DELETE `/admin/cache` body; no key means clear everything.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearRequest {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearance {
    pub cleared: usize,
}
