//! Location records, tracks and export

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, ApiError, OutboundRequest};
use crate::geo::{Fix, GeoPoint, TrackSummary};

/// A stored position report from a terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: i64,
    pub terminal_phone: String,
    #[serde(default)]
    pub msg_seq: i64,
    #[serde(default)]
    pub alarm_flag: i64,
    #[serde(default)]
    pub status: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: i64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub direction: i64,
    #[serde(deserialize_with = "super::backend_time::deserialize")]
    pub time: NaiveDateTime,
    #[serde(default)]
    pub mileage: i64,
    #[serde(default)]
    pub fuel_consumption: i64,
}

impl LocationRecord {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationPage {
    pub locations: Vec<LocationRecord>,
    pub total: u64,
    pub terminal_phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationStats {
    pub terminal_phone: String,
    pub total_records: u64,
    pub date_range: String,
    pub avg_speed: f64,
    pub max_speed: f64,
    pub total_mileage: i64,
    pub alarm_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(deserialize_with = "super::backend_time::deserialize")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub direction: Option<i64>,
}

impl TrackPoint {
    pub fn fix(&self) -> Fix {
        Fix {
            point: GeoPoint::new(self.latitude, self.longitude),
            time: self.timestamp,
            speed_kmh: self.speed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub terminal_phone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub track_points: Vec<TrackPoint>,
    pub total_points: usize,
}

impl Track {
    pub fn summary(&self) -> TrackSummary {
        let fixes: Vec<Fix> = self.track_points.iter().map(TrackPoint::fix).collect();
        TrackSummary::from_fixes(&fixes)
    }
}

/// Inclusive date range
#[derive(Debug, Clone)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Filters for the bulk export
#[derive(Debug, Clone, Default)]
pub struct ExportQuery {
    pub terminal_phone: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ApiClient {
    pub async fn locations(
        &self,
        terminal_phone: &str,
        range: &DateRange,
        limit: Option<u32>,
    ) -> Result<LocationPage, ApiError> {
        let request = OutboundRequest::get("/api/locations")
            .segment(terminal_phone)
            .param("start_date", range.start_date)
            .param("end_date", range.end_date)
            .param_opt("limit", limit);
        self.send(request).await
    }

    pub async fn latest_location(&self, terminal_phone: &str) -> Result<LocationRecord, ApiError> {
        let request = OutboundRequest::get("/api/locations")
            .segment(terminal_phone)
            .segment("latest");
        self.send(request).await
    }

    pub async fn location_stats(
        &self,
        terminal_phone: &str,
        range: &DateRange,
    ) -> Result<LocationStats, ApiError> {
        let request = OutboundRequest::get("/api/locations")
            .segment(terminal_phone)
            .segment("stats")
            .param("start_date", range.start_date)
            .param("end_date", range.end_date);
        self.send(request).await
    }

    pub async fn location_alarms(
        &self,
        terminal_phone: &str,
        range: &DateRange,
    ) -> Result<serde_json::Value, ApiError> {
        let request = OutboundRequest::get("/api/locations")
            .segment(terminal_phone)
            .segment("alarms")
            .param("start_date", range.start_date)
            .param("end_date", range.end_date);
        self.send(request).await
    }

    /// Track points in chronological order, at least `min_interval_secs` apart
    pub async fn track(
        &self,
        terminal_phone: &str,
        range: &DateRange,
        min_interval_secs: Option<u32>,
    ) -> Result<Track, ApiError> {
        let request = OutboundRequest::get("/api/locations")
            .segment(terminal_phone)
            .segment("track")
            .param("start_date", range.start_date)
            .param("end_date", range.end_date)
            .param_opt("min_interval", min_interval_secs);
        self.send(request).await
    }

    pub async fn location_overview(&self) -> Result<serde_json::Value, ApiError> {
        self.send(OutboundRequest::get("/api/locations/stats/overview"))
            .await
    }

    /// Raw export file as produced by the backend
    pub async fn export_locations(&self, query: &ExportQuery) -> Result<Vec<u8>, ApiError> {
        let request = OutboundRequest::get("/api/locations/export")
            .param_opt("terminal_phone", query.terminal_phone.as_deref())
            .param_opt("start_date", query.start_date)
            .param_opt("end_date", query.end_date);
        self.download(request).await
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

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[tokio::test]
    async fn track_is_fetched_and_summarized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/locations/13800000000/track"))
            .and(query_param("start_date", "2024-06-01"))
            .and(query_param("end_date", "2024-06-02"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "terminal_phone": "13800000000",
                "start_date": "2024-06-01",
                "end_date": "2024-06-02",
                "track_points": [
                    {"latitude": 0.0, "longitude": 0.0, "timestamp": "2024-06-01 08:00:00", "speed": 50, "direction": 90},
                    {"latitude": 0.0, "longitude": 1.0, "timestamp": "2024-06-01 09:00:00", "speed": 80, "direction": 90}
                ],
                "total_points": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let range = DateRange {
            start_date: june(1),
            end_date: june(2),
        };

        let track = client.track("13800000000", &range, None).await.unwrap();
        let summary = track.summary();

        assert_eq!(track.total_points, 2);
        assert_eq!(summary.points, 2);
        assert_eq!(summary.elapsed_secs, 3600);
        assert_eq!(summary.max_speed_kmh, 80.0);
        assert!((summary.distance_m - 111_195.0).abs() < 1_112.0);
    }

    #[tokio::test]
    async fn export_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/locations/export"))
            .and(query_param("terminal_phone", "13800000000"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x50, 0x4b, 0x03, 0x04]))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let bytes = client
            .export_locations(&ExportQuery {
                terminal_phone: Some("13800000000".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(bytes, vec![0x50, 0x4b, 0x03, 0x04]);
    }

    #[test]
    fn location_record_parses_backend_row() {
        let record: LocationRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "terminal_phone": "13800000000",
            "msg_seq": 12,
            "alarm_flag": 0,
            "status": 3,
            "latitude": 22.543,
            "longitude": 114.057,
            "altitude": 40,
            "speed": 62,
            "direction": 180,
            "time": "2024-06-01T08:00:00",
            "mileage": 1200,
            "fuel_consumption": 30,
            "alarm_event_id": 0,
            "created_at": "2024-06-01T08:00:01"
        }))
        .unwrap();

        assert_eq!(record.point(), GeoPoint::new(22.543, 114.057));
        assert_eq!(record.speed, 62.0);
    }
}
