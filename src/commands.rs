//! Console Commands Module
//!
//! Command handlers behind the CLI. Each prints its result on stdout and
//! relays UI events (notices, return-to-login) on stderr.

use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, info};

use crate::api::locations::{DateRange, ExportQuery};
use crate::api::vehicles::VehicleQuery;
use crate::events::{NoticeLevel, UiEvent};
use crate::format::{format_distance, format_duration, format_file_size, format_speed, format_timestamp};
use crate::AppState;

/// Print any UI events raised while a command ran
pub fn relay_events(rx: &mut Receiver<UiEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            UiEvent::Notice(notice) => {
                let tag = match notice.level {
                    NoticeLevel::Info => "info",
                    NoticeLevel::Warning => "warning",
                    NoticeLevel::Error => "error",
                };
                eprintln!("[{}] {}", tag, notice.message);
            }
            UiEvent::NavigateToLogin { path } => {
                debug!("Login requested at {}", path);
                eprintln!("Run `jt808-console login` to sign in again.");
            }
        }
    }
}

pub async fn login(state: &AppState, username: &str, password: &str) -> anyhow::Result<()> {
    info!("Logging in as {}", username);

    let user = state.api.login(username, password).await?;

    println!("Logged in as {} ({})", user.username, user.role);
    Ok(())
}

pub fn logout(state: &AppState) {
    info!("Logging out");
    state.api.logout();
    println!("Logged out");
}

pub async fn whoami(state: &AppState, refresh: bool) -> anyhow::Result<()> {
    if refresh && state.session.is_authenticated() {
        state.api.refresh_current_user().await?;
    }

    match state.session.user() {
        Some(user) => {
            println!("{} (id {}, role {})", user.username, user.id, user.role);
            if let Some(email) = &user.email {
                println!("email: {}", email);
            }
            if let Some(last_login) = &user.last_login {
                println!("last login: {}", format_timestamp(last_login));
            }
        }
        None => println!("{}", state.session.display_name()),
    }
    Ok(())
}

pub async fn vehicles(state: &AppState, query: &VehicleQuery) -> anyhow::Result<()> {
    let list = state.api.list_vehicles(query).await?;

    println!("{} vehicles (page {}, size {})", list.total, list.page, list.size);
    for vehicle in &list.vehicles {
        println!(
            "{:<14} {:<10} {}",
            vehicle.terminal_phone,
            vehicle.plate_number.as_deref().unwrap_or("-"),
            vehicle.vehicle_type.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

pub async fn track(
    state: &AppState,
    terminal_phone: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_interval_secs: Option<u32>,
) -> anyhow::Result<()> {
    let range = DateRange {
        start_date,
        end_date,
    };
    let track = state.api.track(terminal_phone, &range, min_interval_secs).await?;
    let summary = track.summary();

    println!("Track for {} from {} to {}", track.terminal_phone, track.start_date, track.end_date);
    println!("points:    {}", summary.points);
    println!("distance:  {}", format_distance(summary.distance_m));
    println!("elapsed:   {}", format_duration(summary.elapsed_secs));
    println!("avg speed: {}", format_speed(summary.average_speed_kmh));
    println!("max speed: {}", format_speed(summary.max_speed_kmh));
    Ok(())
}

pub async fn export(state: &AppState, query: &ExportQuery, output: &Path) -> anyhow::Result<()> {
    let bytes = state.api.export_locations(query).await?;

    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write export to {}", output.display()))?;

    println!("Wrote {} to {}", format_file_size(bytes.len() as i64), output.display());
    Ok(())
}

pub async fn connections(state: &AppState) -> anyhow::Result<()> {
    let connections = state.api.connections().await?;

    println!("{} connections", connections.len());
    for connection in &connections {
        println!(
            "{:<10} {}:{:<6} {:?} data={} errors={}",
            connection.id,
            connection.client_ip,
            connection.client_port,
            connection.status,
            connection.data_count,
            connection.error_count,
        );
    }
    Ok(())
}

pub async fn status(state: &AppState) -> anyhow::Result<()> {
    let status = state.api.system_status().await?;

    println!("cpu:    {:.1}%", status.cpu_usage);
    println!("memory: {:.1}%", status.memory_usage);
    println!("disk:   {:.1}%", status.disk_usage);
    println!(
        "links:  {} active / {} total",
        status.active_connections, status.total_connections
    );
    println!(
        "traffic: {} in, {} out",
        format_file_size(status.received_bytes),
        format_file_size(status.sent_bytes)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::ClientConfig;
    use crate::storage::MemoryStorage;

    use super::*;

    fn state_for(server: &MockServer) -> AppState {
        let config = ClientConfig::default().with_api_base_url(&server.uri());
        AppState::with_storage(config, Arc::new(MemoryStorage::new())).unwrap()
    }

    #[tokio::test]
    async fn export_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/locations/export"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 2048]))
            .mount(&server)
            .await;

        let state = state_for(&server);
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("locations.xlsx");

        export(&state, &ExportQuery::default(), &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap().len(), 2048);
    }

    #[tokio::test]
    async fn logout_clears_session() {
        let server = MockServer::start().await;
        let state = state_for(&server);
        state
            .session
            .login("tok", crate::auth::tests::sample_user())
            .unwrap();

        logout(&state);

        assert!(!state.session.is_authenticated());
    }

    #[tokio::test]
    async fn whoami_without_session_succeeds() {
        let server = MockServer::start().await;
        let state = state_for(&server);

        whoami(&state, true).await.unwrap();

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn relay_events_drains_receiver() {
        let bus = crate::events::EventBus::new();
        let mut rx = bus.subscribe();
        bus.notice(crate::events::Notice::error("boom"));
        bus.navigate_to_login("/login");

        relay_events(&mut rx);

        assert!(rx.try_recv().is_err());
    }
}
