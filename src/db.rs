use std::{fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    models::{AppointmentRow, SettingsRow, SERVICE_ACTIVE},
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"));

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    seed_settings(pool).await?;
    seed_services(pool).await?;
    Ok(())
}

async fn seed_settings(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM settings WHERE id = 1 LIMIT 1")
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    sqlx::query(
        r#"INSERT INTO settings (id, shop_name, admin_name, avatar_url, phone, address, updated_at)
           VALUES (1, ?, ?, NULL, NULL, NULL, ?)"#,
    )
    .bind("Barbearia Sr. José")
    .bind("Sr. José")
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_services(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, String>("SELECT id FROM services LIMIT 1")
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let catalog = [
        ("Haircut", 35.0, 30_i64, "cuts"),
        ("Beard Trim", 25.0, 20, "beard"),
        ("Cut & Beard", 55.0, 50, "combo"),
        ("Kids Cut", 28.0, 25, "cuts"),
    ];

    for (name, price, duration, category) in catalog {
        sqlx::query(
            r#"INSERT INTO services (id, name, price, duration_min, status, category, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(price)
        .bind(duration)
        .bind(SERVICE_ACTIVE)
        .bind(category)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn record_notification(
    pool: &SqlitePool,
    title: &str,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO notifications (id, title, message, read, created_at)
           VALUES (?, ?, ?, 0, ?)"#,
    )
    .bind(new_id())
    .bind(title)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_appointment(
    pool: &SqlitePool,
    appointment: &AppointmentRow,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO appointments
           (id, client_id, client_name, client_phone, service_id, service_name, price,
            duration_min, professional_id, professional_name, date, start_time, end_time,
            status, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&appointment.id)
    .bind(&appointment.client_id)
    .bind(&appointment.client_name)
    .bind(&appointment.client_phone)
    .bind(&appointment.service_id)
    .bind(&appointment.service_name)
    .bind(appointment.price)
    .bind(appointment.duration_min)
    .bind(&appointment.professional_id)
    .bind(&appointment.professional_name)
    .bind(&appointment.date)
    .bind(&appointment.start_time)
    .bind(&appointment.end_time)
    .bind(&appointment.status)
    .bind(&appointment.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_appointment(pool: &SqlitePool, appointment_id: &str) -> Option<AppointmentRow> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, client_id, client_name, client_phone, service_id, service_name, price,
                  duration_min, professional_id, professional_name, date, start_time, end_time,
                  status, created_at
           FROM appointments
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(appointment_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

pub async fn count_appointments(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

pub async fn fetch_settings(pool: &SqlitePool) -> Option<SettingsRow> {
    sqlx::query_as::<_, SettingsRow>(
        r#"SELECT id, shop_name, admin_name, avatar_url, phone, address, updated_at
           FROM settings
           WHERE id = 1
           LIMIT 1"#,
    )
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}
