use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::chime::SharedStamp;
use crate::models::AppointmentRow;
use crate::sound::SoundCache;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: broadcast::Sender<ServerEvent>,
    pub admin: AdminCredentials,
    pub chime: ChimeConfig,
    pub stamp: SharedStamp,
    pub sound: SoundCache,
    pub images: ImageHostConfig,
}

#[derive(Clone, Debug)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn matches(&self, email: &str, password: &str) -> bool {
        // Plaintext comparison on both fields.
        self.email == email && self.password == password
    }

    pub fn is_default(&self) -> bool {
        self.email == DEFAULT_ADMIN_EMAIL && self.password == DEFAULT_ADMIN_PASSWORD
    }
}

pub const DEFAULT_ADMIN_EMAIL: &str = "srjoseadm@gmail.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "654321";

/// Timing knobs for the dashboard chime, surfaced as configuration instead
/// of magic literals. `coalesce_ms` bounds the burst window, `suppress_ms`
/// is the cross-session silence window after a chime played.
#[derive(Clone, Copy, Debug)]
pub struct ChimeConfig {
    pub coalesce_ms: i64,
    pub suppress_ms: i64,
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            coalesce_ms: 400,
            suppress_ms: 6000,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageHostConfig {
    pub upload_url: String,
    pub api_key: String,
}

impl ImageHostConfig {
    pub fn enabled(&self) -> bool {
        !(self.upload_url.trim().is_empty() || self.api_key.trim().is_empty())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerEvent {
    pub kind: String,
    pub appointment_id: Option<String>,
    pub status: Option<String>,
    pub client_name: Option<String>,
    pub service_name: Option<String>,
    pub professional_name: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub title: Option<String>,
    /// Total number of appointment rows after the mutation. Present on
    /// appointment events only; the chime pumps read it as their snapshot
    /// count.
    pub appointments_total: Option<i64>,
}

impl ServerEvent {
    pub fn from_appointment(kind: &str, row: &AppointmentRow, total: i64) -> Self {
        Self {
            kind: kind.to_string(),
            appointment_id: Some(row.id.clone()),
            status: Some(row.status.clone()),
            client_name: Some(row.client_name.clone()),
            service_name: Some(row.service_name.clone()),
            professional_name: Some(row.professional_name.clone()),
            date: Some(row.date.clone()),
            start_time: Some(row.start_time.clone()),
            title: None,
            appointments_total: Some(total),
        }
    }

    /// Covers appointment deletion too, where no row survives to describe.
    pub fn appointment_count(kind: &str, total: i64) -> Self {
        Self {
            kind: kind.to_string(),
            appointment_id: None,
            status: None,
            client_name: None,
            service_name: None,
            professional_name: None,
            date: None,
            start_time: None,
            title: None,
            appointments_total: Some(total),
        }
    }

    pub fn named(kind: &str, title: &str) -> Self {
        Self {
            kind: kind.to_string(),
            appointment_id: None,
            status: None,
            client_name: None,
            service_name: None,
            professional_name: None,
            date: None,
            start_time: None,
            title: Some(title.to_string()),
            appointments_total: None,
        }
    }
}
