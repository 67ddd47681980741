//! Link monitoring: terminal connections and proxy health.
//!
//! These endpoints wrap their payload in a `{code, message, data}` envelope.

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiError, OutboundRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
}

/// A terminal link into the proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub id: String,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    pub client_ip: String,
    pub client_port: u16,
    #[serde(default)]
    pub server_ip: Option<String>,
    #[serde(default)]
    pub server_port: Option<u16>,
    pub status: ConnectionStatus,
    #[serde(default)]
    pub connect_time: Option<String>,
    #[serde(default)]
    pub last_heartbeat: Option<String>,
    #[serde(default)]
    pub data_count: u64,
    #[serde(default)]
    pub error_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub active_connections: u64,
    pub total_connections: u64,
    pub received_bytes: i64,
    pub sent_bytes: i64,
    pub packets_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformancePeriod {
    Hour,
    Day,
    Week,
}

impl PerformancePeriod {
    fn as_str(self) -> &'static str {
        match self {
            PerformancePeriod::Hour => "hour",
            PerformancePeriod::Day => "day",
            PerformancePeriod::Week => "week",
        }
    }
}

impl ApiClient {
    pub async fn connections(&self) -> Result<Vec<ConnectionInfo>, ApiError> {
        self.send_enveloped(OutboundRequest::get("/api/monitor/connections"))
            .await
    }

    pub async fn disconnect_connection(&self, connection_id: &str) -> Result<(), ApiError> {
        let request = OutboundRequest::delete("/api/monitor/connections").segment(connection_id);
        self.send_enveloped::<Option<serde_json::Value>>(request)
            .await
            .map(|_| ())
    }

    pub async fn system_status(&self) -> Result<SystemStatus, ApiError> {
        self.send_enveloped(OutboundRequest::get("/api/monitor/system"))
            .await
    }

    pub async fn realtime_data(&self) -> Result<serde_json::Value, ApiError> {
        self.send_enveloped(OutboundRequest::get("/api/monitor/realtime"))
            .await
    }

    pub async fn performance_stats(
        &self,
        period: PerformancePeriod,
    ) -> Result<serde_json::Value, ApiError> {
        let request =
            OutboundRequest::get("/api/monitor/performance").param("period", period.as_str());
        self.send_enveloped(request).await
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

    fn client_for(server: &MockServer) -> ApiClient {
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStorage::new())));
        let config = ClientConfig::default().with_api_base_url(&server.uri());
        ApiClient::new(&config, session, EventBus::new()).unwrap()
    }

    #[tokio::test]
    async fn connections_are_unwrapped_from_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/monitor/connections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "message": "ok",
                "data": [{
                    "id": "c-1",
                    "vehicle_id": "13800000000",
                    "client_ip": "10.1.2.3",
                    "client_port": 40312,
                    "status": "connected",
                    "data_count": 42
                }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let connections = client.connections().await.unwrap();

        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].status, ConnectionStatus::Connected);
        assert_eq!(connections[0].data_count, 42);
        assert_eq!(connections[0].error_count, 0);
    }

    #[tokio::test]
    async fn disconnect_accepts_null_data() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/monitor/connections/c-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "message": "disconnected",
                "data": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).disconnect_connection("c-1").await.unwrap();
    }

    #[tokio::test]
    async fn performance_period_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/monitor/performance"))
            .and(query_param("period", "week"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 200,
                "message": "ok",
                "data": {"samples": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stats = client_for(&server)
            .performance_stats(PerformancePeriod::Week)
            .await
            .unwrap();

        assert_eq!(stats["samples"], serde_json::json!([]));
    }
}
