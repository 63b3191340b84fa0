pub const STATUS_SCHEDULED: &str = "scheduled";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELED: &str = "canceled";
pub const STATUS_RESCHEDULED: &str = "rescheduled";

pub const SERVICE_ACTIVE: &str = "active";
pub const SERVICE_INACTIVE: &str = "inactive";

pub const ENTRY_REVENUE: &str = "revenue";
pub const ENTRY_EXPENSE: &str = "expense";

/// An appointment occupies its slot unless it was canceled. Rescheduled
/// appointments keep occupying the slot they were moved to.
pub fn occupies_slot(status: &str) -> bool {
    status != STATUS_CANCELED
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: String,
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_phone: String,
    pub service_id: Option<String>,
    pub service_name: String,
    pub price: f64,
    pub duration_min: i64,
    pub professional_id: String,
    pub professional_name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfessionalRow {
    pub id: String,
    pub name: String,
    pub work_start: String,
    pub work_end: String,
    pub commission_pct: f64,
    pub likes: i64,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub duration_min: i64,
    pub status: String,
    pub category: String,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub total_spent: f64,
    pub last_visit: Option<String>,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FinancialEntryRow {
    pub id: String,
    pub description: String,
    pub category: String,
    pub amount: f64,
    pub date: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub title: String,
    pub message: String,
    pub read: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SuggestionRow {
    pub id: String,
    pub author_name: String,
    pub message: String,
    pub created_at: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettingsRow {
    pub id: i64,
    pub shop_name: String,
    pub admin_name: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub updated_at: String,
}
