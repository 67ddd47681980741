//! Vehicle registry endpoints

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiError, OutboundRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub terminal_phone: String,
    pub vehicle_id: Option<String>,
    pub plate_number: Option<String>,
    pub vehicle_type: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    #[serde(deserialize_with = "super::backend_time::deserialize")]
    pub created_at: NaiveDateTime,
    #[serde(deserialize_with = "super::backend_time::deserialize")]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VehicleCreate {
    pub terminal_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VehicleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleList {
    pub vehicles: Vec<Vehicle>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleChange {
    pub id: i64,
    pub terminal_phone: String,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    #[serde(deserialize_with = "super::backend_time::deserialize")]
    pub change_time: NaiveDateTime,
}

/// Filters for [`ApiClient::list_vehicles`]
#[derive(Debug, Clone, Default)]
pub struct VehicleQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub terminal_phone: Option<String>,
    pub plate_number: Option<String>,
}

impl ApiClient {
    pub async fn list_vehicles(&self, query: &VehicleQuery) -> Result<VehicleList, ApiError> {
        let request = OutboundRequest::get("/api/vehicles/")
            .param_opt("page", query.page)
            .param_opt("size", query.size)
            .param_opt("terminal_phone", query.terminal_phone.as_deref())
            .param_opt("plate_number", query.plate_number.as_deref());
        self.send(request).await
    }

    pub async fn create_vehicle(&self, vehicle: &VehicleCreate) -> Result<Vehicle, ApiError> {
        self.send(OutboundRequest::post("/api/vehicles/").json(vehicle)?).await
    }

    pub async fn get_vehicle(&self, terminal_phone: &str) -> Result<Vehicle, ApiError> {
        self.send(OutboundRequest::get("/api/vehicles").segment(terminal_phone))
            .await
    }

    pub async fn update_vehicle(
        &self,
        terminal_phone: &str,
        update: &VehicleUpdate,
    ) -> Result<Vehicle, ApiError> {
        let request =
            OutboundRequest::put("/api/vehicles").segment(terminal_phone).json(update)?;
        self.send(request).await
    }

    pub async fn delete_vehicle(&self, terminal_phone: &str) -> Result<(), ApiError> {
        self.execute(OutboundRequest::delete("/api/vehicles").segment(terminal_phone))
            .await
    }

    pub async fn vehicle_changes(
        &self,
        terminal_phone: &str,
        limit: Option<u32>,
    ) -> Result<Vec<VehicleChange>, ApiError> {
        let request = OutboundRequest::get("/api/vehicles")
            .segment(terminal_phone)
            .segment("changes")
            .param_opt("limit", limit);
        self.send(request).await
    }

    pub async fn vehicle_stats(&self) -> Result<serde_json::Value, ApiError> {
        self.send(OutboundRequest::get("/api/vehicles/stats/summary"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::SessionStore;
    use crate::config::ClientConfig;
    use crate::events::EventBus;
    use crate::storage::MemoryStorage;

    use super::*;

    #[tokio::test]
    async fn list_vehicles_passes_filters_and_parses_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/vehicles/"))
            .and(query_param("page", "1"))
            .and(query_param("plate_number", "粤B12345"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "vehicles": [{
                    "id": 3,
                    "terminal_phone": "13800000000",
                    "vehicle_id": null,
                    "plate_number": "粤B12345",
                    "vehicle_type": "truck",
                    "manufacturer": null,
                    "model": null,
                    "color": "blue",
                    "created_at": "2024-05-01 10:00:00",
                    "updated_at": "2024-05-02T10:00:00.5"
                }],
                "total": 1,
                "page": 1,
                "size": 20
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        let config = ClientConfig::default().with_api_base_url(&server.uri());
        let client = ApiClient::new(&config, session, EventBus::new()).unwrap();

        let list = client
            .list_vehicles(&VehicleQuery {
                page: Some(1),
                plate_number: Some("粤B12345".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(list.total, 1);
        assert_eq!(list.vehicles[0].terminal_phone, "13800000000");
        assert_eq!(list.vehicles[0].color.as_deref(), Some("blue"));
    }
}
