//! Backend configuration endpoints

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiError, OutboundRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(deserialize_with = "super::backend_time::deserialize")]
    pub created_at: NaiveDateTime,
    #[serde(deserialize_with = "super::backend_time::deserialize")]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigCategory {
    pub category: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub configs: Vec<ConfigItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigCreate {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigUpdate {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Free-form system settings keyed by name
pub type SystemConfig = HashMap<String, serde_json::Value>;

impl ApiClient {
    pub async fn configs(&self, category: Option<&str>) -> Result<Vec<ConfigItem>, ApiError> {
        let request = OutboundRequest::get("/api/config/").param_opt("category", category);
        self.send(request).await
    }

    pub async fn config_categories(&self) -> Result<Vec<ConfigCategory>, ApiError> {
        self.send(OutboundRequest::get("/api/config/categories"))
            .await
    }

    pub async fn system_config(&self) -> Result<SystemConfig, ApiError> {
        self.send(OutboundRequest::get("/api/config/system"))
            .await
    }

    pub async fn update_system_config(&self, config: &SystemConfig) -> Result<(), ApiError> {
        self.execute(OutboundRequest::put("/api/config/system").json(config)?)
            .await
    }

    pub async fn create_config(&self, item: &ConfigCreate) -> Result<ConfigItem, ApiError> {
        self.send(OutboundRequest::post("/api/config/").json(item)?)
            .await
    }

    pub async fn update_config(&self, key: &str, update: &ConfigUpdate) -> Result<ConfigItem, ApiError> {
        self.send(OutboundRequest::put("/api/config").segment(key).json(update)?)
            .await
    }

    pub async fn delete_config(&self, key: &str) -> Result<(), ApiError> {
        self.execute(OutboundRequest::delete("/api/config").segment(key))
            .await
    }

    /// Seed the backend with its default configuration entries
    pub async fn init_default_configs(&self) -> Result<(), ApiError> {
        self.execute(OutboundRequest::post("/api/config/init")).await
    }

    pub async fn reload_configs(&self) -> Result<(), ApiError> {
        self.execute(OutboundRequest::post("/api/config/reload")).await
    }
}
