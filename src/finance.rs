//! Revenue bookkeeping. Completing an appointment books its price as a
//! revenue entry exactly once, keyed by a description derived from the
//! appointment id; the dedup is a plain string match, best effort.

use sqlx::SqlitePool;

use crate::auth::new_id;
use crate::models::{
    AppointmentRow, FinancialEntryRow, ProfessionalRow, ENTRY_EXPENSE, ENTRY_REVENUE,
    STATUS_COMPLETED,
};

pub fn revenue_description(appointment_id: &str) -> String {
    format!("Service revenue, appointment {appointment_id}")
}

/// Books revenue for an appointment that just turned completed. Returns
/// whether an entry was created; a matching description means the
/// appointment was settled before (toggled back and forth) and nothing
/// happens.
pub async fn settle_appointment(
    pool: &SqlitePool,
    appointment: &AppointmentRow,
) -> Result<bool, sqlx::Error> {
    let description = revenue_description(&appointment.id);
    let existing = sqlx::query_scalar::<_, String>(
        "SELECT id FROM financial_entries WHERE description = ? LIMIT 1",
    )
    .bind(&description)
    .fetch_optional(pool)
    .await?;

    if existing.is_some() {
        return Ok(false);
    }

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        r#"INSERT INTO financial_entries (id, description, category, amount, date, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&description)
    .bind(ENTRY_REVENUE)
    .bind(appointment.price)
    .bind(&appointment.date)
    .bind(&now)
    .execute(pool)
    .await?;

    if let Some(client_id) = appointment.client_id.as_deref() {
        sqlx::query("UPDATE clients SET total_spent = total_spent + ?, last_visit = ? WHERE id = ?")
            .bind(appointment.price)
            .bind(&appointment.date)
            .bind(client_id)
            .execute(pool)
            .await?;
    }

    Ok(true)
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Totals {
    pub revenue: f64,
    pub expense: f64,
}

impl Totals {
    pub fn net(&self) -> f64 {
        self.revenue - self.expense
    }
}

pub fn totals(entries: &[FinancialEntryRow]) -> Totals {
    let mut sums = Totals::default();
    for entry in entries {
        if entry.category == ENTRY_REVENUE {
            sums.revenue += entry.amount;
        } else if entry.category == ENTRY_EXPENSE {
            sums.expense += entry.amount;
        }
    }
    sums
}

#[derive(Clone, Debug)]
pub struct CommissionLine {
    pub professional_id: String,
    pub name: String,
    pub commission_pct: f64,
    pub base: f64,
    pub commission: f64,
}

/// Commission owed per professional over the given appointments: the sum
/// of their completed appointments' prices times their percentage.
pub fn commission_lines(
    professionals: &[ProfessionalRow],
    appointments: &[AppointmentRow],
) -> Vec<CommissionLine> {
    professionals
        .iter()
        .map(|professional| {
            let base: f64 = appointments
                .iter()
                .filter(|appt| {
                    appt.professional_id == professional.id && appt.status == STATUS_COMPLETED
                })
                .map(|appt| appt.price)
                .sum();
            CommissionLine {
                professional_id: professional.id.clone(),
                name: professional.name.clone(),
                commission_pct: professional.commission_pct,
                base,
                commission: base * professional.commission_pct / 100.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::STATUS_SCHEDULED;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("open in-memory sqlite");
        db::run_migrations(&pool).await.expect("run migrations");
        pool
    }

    fn entry(category: &str, amount: f64) -> FinancialEntryRow {
        FinancialEntryRow {
            id: new_id(),
            description: "entry".to_string(),
            category: category.to_string(),
            amount,
            date: "2024-06-10".to_string(),
            created_at: "2024-06-10T12:00:00Z".to_string(),
        }
    }

    fn completed_appointment(id: &str, client_id: &str, price: f64) -> AppointmentRow {
        AppointmentRow {
            id: id.to_string(),
            client_id: Some(client_id.to_string()),
            client_name: "Marcos".to_string(),
            client_phone: "11 98888-7777".to_string(),
            service_id: None,
            service_name: "Cut & Beard".to_string(),
            price,
            duration_min: 50,
            professional_id: "p1".to_string(),
            professional_name: "Carlos".to_string(),
            date: "2024-06-10".to_string(),
            start_time: "10:00".to_string(),
            end_time: "10:50".to_string(),
            status: STATUS_COMPLETED.to_string(),
            created_at: "2024-06-01T12:00:00Z".to_string(),
        }
    }

    async fn insert_client(pool: &SqlitePool, id: &str) {
        sqlx::query(
            "INSERT INTO clients (id, name, phone, total_spent, created_at) VALUES (?, ?, ?, 0, ?)",
        )
        .bind(id)
        .bind("Marcos")
        .bind("11 98888-7777")
        .bind("2024-06-01T12:00:00Z")
        .execute(pool)
        .await
        .expect("insert client");
    }

    #[tokio::test]
    async fn settling_twice_books_revenue_once() {
        let pool = memory_pool().await;
        insert_client(&pool, "c1").await;
        let appointment = completed_appointment("a1", "c1", 75.0);

        assert!(settle_appointment(&pool, &appointment).await.unwrap());
        // Toggled back to pending and completed again.
        assert!(!settle_appointment(&pool, &appointment).await.unwrap());

        let entries = sqlx::query_as::<_, FinancialEntryRow>(
            "SELECT id, description, category, amount, date, created_at FROM financial_entries",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, ENTRY_REVENUE);
        assert_eq!(entries[0].amount, 75.0);
        assert_eq!(entries[0].description, revenue_description("a1"));
    }

    #[tokio::test]
    async fn settling_updates_the_client_running_totals() {
        let pool = memory_pool().await;
        insert_client(&pool, "c1").await;
        let appointment = completed_appointment("a1", "c1", 75.0);
        settle_appointment(&pool, &appointment).await.unwrap();
        settle_appointment(&pool, &appointment).await.unwrap();

        let (spent, last_visit) = sqlx::query_as::<_, (f64, Option<String>)>(
            "SELECT total_spent, last_visit FROM clients WHERE id = 'c1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(spent, 75.0);
        assert_eq!(last_visit.as_deref(), Some("2024-06-10"));
    }

    #[test]
    fn totals_split_by_signed_category() {
        let entries = [
            entry(ENTRY_REVENUE, 75.0),
            entry(ENTRY_REVENUE, 35.0),
            entry(ENTRY_EXPENSE, 40.0),
        ];
        let sums = totals(&entries);
        assert_eq!(sums.revenue, 110.0);
        assert_eq!(sums.expense, 40.0);
        assert_eq!(sums.net(), 70.0);
    }

    #[test]
    fn commissions_only_count_completed_appointments() {
        let professionals = [ProfessionalRow {
            id: "p1".to_string(),
            name: "Carlos".to_string(),
            work_start: "08:00".to_string(),
            work_end: "21:00".to_string(),
            commission_pct: 40.0,
            likes: 0,
            created_at: "2024-06-01T12:00:00Z".to_string(),
        }];
        let mut open = completed_appointment("a2", "c1", 100.0);
        open.status = STATUS_SCHEDULED.to_string();
        let appointments = [completed_appointment("a1", "c1", 75.0), open];

        let lines = commission_lines(&professionals, &appointments);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].base, 75.0);
        assert_eq!(lines[0].commission, 30.0);
    }
}
