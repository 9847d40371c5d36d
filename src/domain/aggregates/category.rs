//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, description: Option<String>) -> Self {
        Self { id: Uuid::now_v7(), name: name.into(), description, created_at: Utc::now() }
    }
}
