use actix_web::{http::header, middleware::from_fn, web, HttpRequest, HttpResponse, Result};
use actix_multipart::Multipart;
use actix_web_httpauth::middleware::HttpAuthentication;
use askama::Template;
use serde::Deserialize;
use tokio_stream::StreamExt;

use crate::{
    auth::{admin_validator, current_theme, logout_guard, new_id, AdminUser},
    db::{count_appointments, fetch_appointment, fetch_settings, insert_appointment},
    filters, finance, images,
    models::{
        AppointmentRow, ClientRow, FinancialEntryRow, NotificationRow, ProfessionalRow,
        ServiceRow, SuggestionRow, ENTRY_EXPENSE, ENTRY_REVENUE, SERVICE_ACTIVE,
        SERVICE_INACTIVE, STATUS_CANCELED, STATUS_COMPLETED, STATUS_RESCHEDULED,
        STATUS_SCHEDULED,
    },
    schedule,
    state::{AppState, ServerEvent},
    templates::{redirect, render},
};

#[derive(Clone, Debug)]
struct StatCard {
    label: String,
    value: String,
}

#[derive(Clone, Debug)]
struct AppointmentListView {
    id: String,
    client_name: String,
    client_phone: String,
    service_name: String,
    professional_name: String,
    date: String,
    start_time: String,
    end_time: String,
    status: String,
    price: f64,
    is_completed: bool,
    is_canceled: bool,
}

#[derive(Clone, Debug)]
struct StatusOption {
    value: &'static str,
    label: &'static str,
    selected: bool,
}

#[derive(Clone, Debug)]
struct PickOption {
    id: String,
    label: String,
    selected: bool,
}

#[derive(Clone, Debug)]
struct SlotOption {
    value: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "admin_dashboard.html")]
struct AdminDashboardTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    shop_name: String,
    stats: Vec<StatCard>,
    today: Vec<AppointmentListView>,
    has_latest: bool,
    latest_title: String,
    latest_message: String,
    unread_count: i64,
}

#[derive(Clone, Debug)]
struct GridCellView {
    professional_id: String,
    hour: String,
    busy: bool,
    appointment_id: String,
    client_name: String,
    service_name: String,
    is_completed: bool,
}

#[derive(Clone, Debug)]
struct GridRowView {
    hour: String,
    cells: Vec<GridCellView>,
}

#[derive(Template)]
#[template(path = "admin_schedule.html")]
struct AdminScheduleTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    date: String,
    prev_date: String,
    next_date: String,
    professionals: Vec<PickOption>,
    rows: Vec<GridRowView>,
}

#[derive(Template)]
#[template(path = "admin_appointments.html")]
struct AdminAppointmentsTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    appointments: Vec<AppointmentListView>,
    date_filter: String,
    statuses: Vec<StatusOption>,
}

#[derive(Clone, Debug, Default)]
struct AppointmentFormView {
    client_name: String,
    client_phone: String,
    client_email: String,
    date: String,
}

#[derive(Template)]
#[template(path = "admin_appointment_form.html")]
struct AdminAppointmentFormTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    services: Vec<PickOption>,
    professionals: Vec<PickOption>,
    slots: Vec<SlotOption>,
    form: AppointmentFormView,
    errors: Vec<String>,
}

#[derive(Clone, Debug)]
struct AppointmentDetailView {
    id: String,
    client_name: String,
    client_phone: String,
    service_name: String,
    price: f64,
    duration_min: i64,
    professional_name: String,
    date: String,
    start_time: String,
    end_time: String,
    status: String,
    created_at: String,
    is_completed: bool,
    is_canceled: bool,
}

#[derive(Template)]
#[template(path = "admin_appointment_detail.html")]
struct AdminAppointmentDetailTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    appointment: AppointmentDetailView,
}

#[derive(Template)]
#[template(path = "admin_reschedule.html")]
struct AdminRescheduleTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    appointment_id: String,
    client_name: String,
    service_name: String,
    date: String,
    slots: Vec<SlotOption>,
    professionals: Vec<PickOption>,
    errors: Vec<String>,
}

#[derive(Clone, Debug)]
struct ClientView {
    id: String,
    name: String,
    phone: String,
    email: String,
    has_email: bool,
    total_spent: f64,
    last_visit: String,
    has_last_visit: bool,
}

#[derive(Template)]
#[template(path = "admin_clients.html")]
struct AdminClientsTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    clients: Vec<ClientView>,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_client_edit.html")]
struct AdminClientEditTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    client_id: String,
    name: String,
    phone: String,
    email: String,
    errors: Vec<String>,
}

#[derive(Clone, Debug)]
struct ProfessionalView {
    id: String,
    name: String,
    work_start: String,
    work_end: String,
    commission_pct: f64,
    likes: i64,
}

#[derive(Template)]
#[template(path = "admin_professionals.html")]
struct AdminProfessionalsTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    professionals: Vec<ProfessionalView>,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_professional_edit.html")]
struct AdminProfessionalEditTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    professional_id: String,
    name: String,
    work_start: String,
    work_end: String,
    commission_pct: f64,
    errors: Vec<String>,
}

#[derive(Clone, Debug)]
struct ServiceView {
    id: String,
    name: String,
    price: f64,
    duration_min: i64,
    category: String,
    status: String,
    is_active: bool,
}

#[derive(Template)]
#[template(path = "admin_services.html")]
struct AdminServicesTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    services: Vec<ServiceView>,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "admin_service_edit.html")]
struct AdminServiceEditTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    service_id: String,
    name: String,
    price: f64,
    duration_min: i64,
    category: String,
    is_active: bool,
    errors: Vec<String>,
}

#[derive(Clone, Debug)]
struct EntryView {
    id: String,
    description: String,
    category: String,
    amount: f64,
    date: String,
    is_revenue: bool,
}

#[derive(Clone, Debug)]
struct CommissionView {
    name: String,
    commission_pct: f64,
    base: f64,
    commission: f64,
}

#[derive(Template)]
#[template(path = "admin_financials.html")]
struct AdminFinancialsTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    month: String,
    entries: Vec<EntryView>,
    revenue_total: f64,
    expense_total: f64,
    net_total: f64,
    commissions: Vec<CommissionView>,
    errors: Vec<String>,
}

#[derive(Clone, Debug)]
struct NotificationView {
    id: String,
    title: String,
    message: String,
    created_at: String,
    is_read: bool,
}

#[derive(Template)]
#[template(path = "admin_notifications.html")]
struct AdminNotificationsTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    notifications: Vec<NotificationView>,
    unread_count: i64,
}

#[derive(Clone, Debug)]
struct SuggestionView {
    author_name: String,
    message: String,
    created_at: String,
}

#[derive(Template)]
#[template(path = "admin_suggestions.html")]
struct AdminSuggestionsTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    suggestions: Vec<SuggestionView>,
}

#[derive(Template)]
#[template(path = "admin_settings.html")]
struct AdminSettingsTemplate {
    theme: String,
    admin_name: String,
    avatar_url: String,
    has_avatar: bool,
    shop_name: String,
    display_name: String,
    phone: String,
    address: String,
    uploads_enabled: bool,
    saved: bool,
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct ScheduleQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct AppointmentsQuery {
    date: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct NewAppointmentQuery {
    date: Option<String>,
    professional_id: Option<String>,
    time: Option<String>,
}

#[derive(Deserialize)]
struct AppointmentForm {
    client_name: String,
    client_phone: String,
    client_email: Option<String>,
    service_id: String,
    professional_id: String,
    date: String,
    start_time: String,
}

#[derive(Deserialize)]
struct NextForm {
    next: Option<String>,
}

#[derive(Deserialize)]
struct RescheduleForm {
    date: String,
    start_time: String,
    professional_id: String,
}

#[derive(Deserialize)]
struct ClientForm {
    name: String,
    phone: String,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct ProfessionalForm {
    name: String,
    work_start: Option<String>,
    work_end: Option<String>,
    commission_pct: Option<String>,
}

#[derive(Deserialize)]
struct ServiceForm {
    name: String,
    price: String,
    duration_min: String,
    category: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct FinancialsQuery {
    month: Option<String>,
}

#[derive(Deserialize)]
struct EntryForm {
    description: String,
    category: String,
    amount: String,
    date: String,
}

#[derive(Deserialize)]
struct SettingsQuery {
    saved: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct SettingsForm {
    shop_name: String,
    admin_name: String,
    phone: Option<String>,
    address: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::basic(admin_validator))
            .wrap(from_fn(logout_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/schedule").route(web::get().to(schedule_page)))
            .service(
                web::resource("/appointments")
                    .route(web::get().to(list_appointments))
                    .route(web::post().to(create_appointment)),
            )
            .service(web::resource("/appointments/new").route(web::get().to(new_appointment)))
            .service(web::resource("/appointments/{id}").route(web::get().to(appointment_detail)))
            .service(web::resource("/appointments/{id}/toggle").route(web::post().to(toggle_status)))
            .service(
                web::resource("/appointments/{id}/reschedule")
                    .route(web::get().to(reschedule_form))
                    .route(web::post().to(apply_reschedule)),
            )
            .service(web::resource("/appointments/{id}/cancel").route(web::post().to(cancel_appointment)))
            .service(web::resource("/appointments/{id}/delete").route(web::post().to(delete_appointment)))
            .service(
                web::resource("/clients")
                    .route(web::get().to(list_clients))
                    .route(web::post().to(create_client)),
            )
            .service(web::resource("/clients/{id}/edit").route(web::get().to(edit_client)))
            .service(web::resource("/clients/{id}").route(web::post().to(update_client)))
            .service(web::resource("/clients/{id}/delete").route(web::post().to(delete_client)))
            .service(
                web::resource("/professionals")
                    .route(web::get().to(list_professionals))
                    .route(web::post().to(create_professional)),
            )
            .service(web::resource("/professionals/{id}/edit").route(web::get().to(edit_professional)))
            .service(web::resource("/professionals/{id}").route(web::post().to(update_professional)))
            .service(web::resource("/professionals/{id}/delete").route(web::post().to(delete_professional)))
            .service(
                web::resource("/services")
                    .route(web::get().to(list_services))
                    .route(web::post().to(create_service)),
            )
            .service(web::resource("/services/{id}/edit").route(web::get().to(edit_service)))
            .service(web::resource("/services/{id}").route(web::post().to(update_service)))
            .service(web::resource("/services/{id}/delete").route(web::post().to(delete_service)))
            .service(
                web::resource("/financials")
                    .route(web::get().to(financials))
                    .route(web::post().to(create_entry)),
            )
            .service(web::resource("/financials/{id}/delete").route(web::post().to(delete_entry)))
            .service(web::resource("/notifications").route(web::get().to(notifications)))
            .service(web::resource("/notifications/read-all").route(web::post().to(mark_all_read)))
            .service(web::resource("/notifications/{id}/read").route(web::post().to(mark_notification_read)))
            .service(web::resource("/suggestions").route(web::get().to(suggestions)))
            .service(
                web::resource("/settings")
                    .route(web::get().to(settings_page))
                    .route(web::post().to(update_settings)),
            )
            .service(web::resource("/settings/avatar").route(web::post().to(upload_avatar))),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/admin/dashboard"))
        .finish()
}

async fn dashboard(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
) -> Result<HttpResponse> {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let month = chrono::Local::now().format("%Y-%m").to_string();

    let todays_total = count(
        "SELECT COUNT(*) FROM appointments WHERE date = ? AND status != 'canceled'",
        &state,
    )
    .run_with_param(&today)
    .await;
    let unread = count("SELECT COUNT(*) FROM notifications WHERE read = 0", &state)
        .run()
        .await;
    let clients_total = count("SELECT COUNT(*) FROM clients", &state).run().await;
    let month_revenue = sqlx::query_scalar::<_, Option<f64>>(
        "SELECT SUM(amount) FROM financial_entries WHERE category = 'revenue' AND date LIKE ?",
    )
    .bind(format!("{month}%"))
    .fetch_one(&state.db)
    .await
    .ok()
    .flatten()
    .unwrap_or(0.0);

    let stats = vec![
        StatCard {
            label: "Appointments today".to_string(),
            value: todays_total.to_string(),
        },
        StatCard {
            label: "Unread notifications".to_string(),
            value: unread.to_string(),
        },
        StatCard {
            label: "Clients".to_string(),
            value: clients_total.to_string(),
        },
        StatCard {
            label: "Revenue this month".to_string(),
            value: format!("R$ {month_revenue:.2}"),
        },
    ];

    let today_rows = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, client_id, client_name, client_phone, service_id, service_name, price,
                  duration_min, professional_id, professional_name, date, start_time, end_time,
                  status, created_at
           FROM appointments
           WHERE date = ?
           ORDER BY start_time
           LIMIT 6"#,
    )
    .bind(&today)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let latest = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, title, message, read, created_at FROM notifications ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None);

    let shop_name = fetch_settings(&state.db)
        .await
        .map(|row| row.shop_name)
        .unwrap_or_else(|| "Barbearia Sr. José".to_string());

    Ok(render(AdminDashboardTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        shop_name,
        stats,
        today: today_rows.into_iter().map(to_list_view).collect(),
        has_latest: latest.is_some(),
        latest_title: latest.as_ref().map(|row| row.title.clone()).unwrap_or_default(),
        latest_message: latest.map(|row| row.message).unwrap_or_default(),
        unread_count: unread,
    }))
}

async fn schedule_page(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    query: web::Query<ScheduleQuery>,
) -> Result<HttpResponse> {
    let date = normalize_date(query.date.as_deref());
    let professionals = fetch_professional_rows(&state).await.unwrap_or_default();
    let appointments = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, client_id, client_name, client_phone, service_id, service_name, price,
                  duration_min, professional_id, professional_name, date, start_time, end_time,
                  status, created_at
           FROM appointments
           WHERE date = ?
           ORDER BY created_at"#,
    )
    .bind(&date)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let grid = schedule::build_grid(&professionals, &appointments, &schedule::hour_slots());
    let rows = grid
        .into_iter()
        .map(|row| GridRowView {
            hour: row.hour,
            cells: row
                .cells
                .into_iter()
                .map(|cell| {
                    let busy = cell.appointment.is_some();
                    let appointment = cell.appointment;
                    GridCellView {
                        professional_id: cell.professional_id,
                        hour: cell.hour,
                        busy,
                        appointment_id: appointment
                            .as_ref()
                            .map(|appt| appt.id.clone())
                            .unwrap_or_default(),
                        client_name: appointment
                            .as_ref()
                            .map(|appt| appt.client_name.clone())
                            .unwrap_or_default(),
                        service_name: appointment
                            .as_ref()
                            .map(|appt| appt.service_name.clone())
                            .unwrap_or_default(),
                        is_completed: appointment
                            .map(|appt| appt.status == STATUS_COMPLETED)
                            .unwrap_or(false),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(render(AdminScheduleTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        prev_date: shift_date(&date, -1),
        next_date: shift_date(&date, 1),
        date,
        professionals: professionals
            .into_iter()
            .map(|row| PickOption {
                id: row.id,
                label: row.name,
                selected: false,
            })
            .collect(),
        rows,
    }))
}

async fn list_appointments(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    query: web::Query<AppointmentsQuery>,
) -> Result<HttpResponse> {
    let date_filter = query
        .date
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let status_filter = query
        .status
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, client_id, client_name, client_phone, service_id, service_name, price,
                  duration_min, professional_id, professional_name, date, start_time, end_time,
                  status, created_at
           FROM appointments
           WHERE (? = '' OR date = ?) AND (? = '' OR status = ?)
           ORDER BY date DESC, start_time"#,
    )
    .bind(&date_filter)
    .bind(&date_filter)
    .bind(&status_filter)
    .bind(&status_filter)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Ok(render(AdminAppointmentsTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        appointments: rows.into_iter().map(to_list_view).collect(),
        date_filter,
        statuses: status_options(&status_filter),
    }))
}

async fn new_appointment(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    query: web::Query<NewAppointmentQuery>,
) -> Result<HttpResponse> {
    let date = normalize_date(query.date.as_deref());
    let professional_id = query.professional_id.clone().unwrap_or_default();
    let time = query.time.clone().unwrap_or_default();

    let services = service_options(&state, "").await;
    let professionals = professional_options(&state, &professional_id).await;

    Ok(render(AdminAppointmentFormTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        services,
        professionals,
        slots: slot_options(&time),
        form: AppointmentFormView {
            date,
            ..AppointmentFormView::default()
        },
        errors: Vec::new(),
    }))
}

async fn create_appointment(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    form: web::Form<AppointmentForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.client_name.trim().is_empty() {
        errors.push("Client name is required.".to_string());
    }
    if form.client_phone.trim().is_empty() {
        errors.push("Client phone is required.".to_string());
    }
    if chrono::NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d").is_err() {
        errors.push("Please pick a valid date.".to_string());
    }
    if schedule::parse_time(&form.start_time).is_none() {
        errors.push("Please pick a time slot.".to_string());
    }

    let service = fetch_service_row(&state, &form.service_id).await;
    if service.is_none() {
        errors.push("Please select a service.".to_string());
    }
    let professional = fetch_professional_row(&state, &form.professional_id).await;
    if professional.is_none() {
        errors.push("Please select a professional.".to_string());
    }

    let (service, professional) = match (service, professional) {
        (Some(service), Some(professional)) if errors.is_empty() => (service, professional),
        _ => {
            return Ok(render(AdminAppointmentFormTemplate {
                theme: current_theme(&req),
                admin_name: admin.display_name.clone(),
                has_avatar: !admin.avatar_url.is_empty(),
                avatar_url: admin.avatar_url.clone(),
                services: service_options(&state, &form.service_id).await,
                professionals: professional_options(&state, &form.professional_id).await,
                slots: slot_options(&form.start_time),
                form: AppointmentFormView {
                    client_name: form.client_name,
                    client_phone: form.client_phone,
                    client_email: form.client_email.unwrap_or_default(),
                    date: form.date,
                },
                errors,
            }));
        }
    };

    let now = chrono::Utc::now().to_rfc3339();
    let client_id = match fetch_client_by_phone(&state, &form.client_phone).await {
        Some(existing) => existing.id,
        None => {
            let id = new_id();
            sqlx::query(
                r#"INSERT INTO clients (id, name, phone, email, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(&id)
            .bind(&form.client_name)
            .bind(&form.client_phone)
            .bind(form.client_email.as_deref().filter(|value| !value.trim().is_empty()))
            .bind(&now)
            .execute(&state.db)
            .await
            .map_err(actix_web::error::ErrorInternalServerError)?;
            id
        }
    };

    let end_time = schedule::end_time(&form.start_time, service.duration_min).unwrap_or_default();
    let appointment = AppointmentRow {
        id: new_id(),
        client_id: Some(client_id),
        client_name: form.client_name,
        client_phone: form.client_phone,
        service_id: Some(service.id),
        service_name: service.name,
        price: service.price,
        duration_min: service.duration_min,
        professional_id: professional.id,
        professional_name: professional.name,
        date: form.date,
        start_time: form.start_time,
        end_time,
        status: STATUS_SCHEDULED.to_string(),
        created_at: now,
    };

    insert_appointment(&state.db, &appointment)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    let total = count_appointments(&state.db).await;
    let _ = state
        .events
        .send(ServerEvent::from_appointment("appointment_created", &appointment, total));

    Ok(redirect(&format!("/admin/schedule?date={}", appointment.date)))
}

async fn appointment_detail(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    let row = match fetch_appointment(&state.db, &appointment_id).await {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Appointment not found")),
    };

    Ok(render(AdminAppointmentDetailTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        appointment: AppointmentDetailView {
            is_completed: row.status == STATUS_COMPLETED,
            is_canceled: row.status == STATUS_CANCELED,
            id: row.id,
            client_name: row.client_name,
            client_phone: row.client_phone,
            service_name: row.service_name,
            price: row.price,
            duration_min: row.duration_min,
            professional_name: row.professional_name,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            created_at: row.created_at,
        },
    }))
}

/// Flips an appointment between scheduled and completed. The first flip to
/// completed books the revenue entry; flipping back leaves it in place.
async fn toggle_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<NextForm>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    let mut row = match fetch_appointment(&state.db, &appointment_id).await {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Appointment not found")),
    };

    let next_status = if row.status == STATUS_COMPLETED {
        STATUS_SCHEDULED
    } else {
        STATUS_COMPLETED
    };

    sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
        .bind(next_status)
        .bind(&appointment_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    row.status = next_status.to_string();

    if next_status == STATUS_COMPLETED {
        if let Err(err) = finance::settle_appointment(&state.db, &row).await {
            log::warn!("Revenue booking failed for appointment {appointment_id}: {err}");
        }
    }

    let total = count_appointments(&state.db).await;
    let _ = state
        .events
        .send(ServerEvent::from_appointment("appointment_updated", &row, total));

    let fallback = format!("/admin/appointments/{appointment_id}");
    Ok(redirect(&admin_next(form.next.as_deref(), &fallback)))
}

async fn reschedule_form(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    let row = match fetch_appointment(&state.db, &appointment_id).await {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Appointment not found")),
    };

    Ok(render(AdminRescheduleTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        appointment_id: row.id,
        client_name: row.client_name,
        service_name: row.service_name,
        slots: slot_options(&row.start_time),
        professionals: professional_options(&state, &row.professional_id).await,
        date: row.date,
        errors: Vec::new(),
    }))
}

async fn apply_reschedule(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    path: web::Path<String>,
    form: web::Form<RescheduleForm>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    let mut row = match fetch_appointment(&state.db, &appointment_id).await {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Appointment not found")),
    };
    let form = form.into_inner();

    let mut errors = Vec::new();
    if chrono::NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d").is_err() {
        errors.push("Please pick a valid date.".to_string());
    }
    if schedule::parse_time(&form.start_time).is_none() {
        errors.push("Please pick a time slot.".to_string());
    }
    let professional = fetch_professional_row(&state, &form.professional_id).await;
    if professional.is_none() {
        errors.push("Please select a professional.".to_string());
    }

    let professional = match professional {
        Some(professional) if errors.is_empty() => professional,
        _ => {
            return Ok(render(AdminRescheduleTemplate {
                theme: current_theme(&req),
                admin_name: admin.display_name.clone(),
                has_avatar: !admin.avatar_url.is_empty(),
                avatar_url: admin.avatar_url.clone(),
                appointment_id: row.id,
                client_name: row.client_name,
                service_name: row.service_name,
                slots: slot_options(&form.start_time),
                professionals: professional_options(&state, &form.professional_id).await,
                date: form.date,
                errors,
            }));
        }
    };

    let end_time = schedule::end_time(&form.start_time, row.duration_min).unwrap_or_default();
    sqlx::query(
        r#"UPDATE appointments
           SET date = ?, start_time = ?, end_time = ?, professional_id = ?,
               professional_name = ?, status = ?
           WHERE id = ?"#,
    )
    .bind(form.date.trim())
    .bind(&form.start_time)
    .bind(&end_time)
    .bind(&professional.id)
    .bind(&professional.name)
    .bind(STATUS_RESCHEDULED)
    .bind(&appointment_id)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    row.date = form.date.trim().to_string();
    row.start_time = form.start_time;
    row.end_time = end_time;
    row.professional_id = professional.id;
    row.professional_name = professional.name;
    row.status = STATUS_RESCHEDULED.to_string();

    let total = count_appointments(&state.db).await;
    let _ = state
        .events
        .send(ServerEvent::from_appointment("appointment_updated", &row, total));

    Ok(redirect(&format!("/admin/appointments/{appointment_id}")))
}

async fn cancel_appointment(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<NextForm>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    let mut row = match fetch_appointment(&state.db, &appointment_id).await {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Appointment not found")),
    };

    sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
        .bind(STATUS_CANCELED)
        .bind(&appointment_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    row.status = STATUS_CANCELED.to_string();

    let total = count_appointments(&state.db).await;
    let _ = state
        .events
        .send(ServerEvent::from_appointment("appointment_updated", &row, total));

    Ok(redirect(&admin_next(form.next.as_deref(), "/admin/appointments")))
}

async fn delete_appointment(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment_id = path.into_inner();
    sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(&appointment_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    let total = count_appointments(&state.db).await;
    let _ = state
        .events
        .send(ServerEvent::appointment_count("appointment_deleted", total));

    Ok(redirect("/admin/appointments"))
}

async fn list_clients(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
) -> Result<HttpResponse> {
    clients_page(&state, &req, &admin, Vec::new()).await
}

async fn create_client(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    form: web::Form<ClientForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push("Name is required.".to_string());
    }
    if form.phone.trim().is_empty() {
        errors.push("Phone is required.".to_string());
    }
    if !errors.is_empty() {
        return clients_page(&state, &req, &admin, errors).await;
    }

    sqlx::query(
        r#"INSERT INTO clients (id, name, phone, email, password, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(form.name.trim())
    .bind(form.phone.trim())
    .bind(form.email.as_deref().filter(|value| !value.trim().is_empty()))
    .bind(form.password.as_deref().filter(|value| !value.trim().is_empty()))
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(redirect("/admin/clients"))
}

async fn edit_client(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let client_id = path.into_inner();
    let row = sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, email, password, total_spent, last_visit, created_at
           FROM clients WHERE id = ? LIMIT 1"#,
    )
    .bind(&client_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None);

    let row = match row {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Client not found")),
    };

    Ok(render(AdminClientEditTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        client_id: row.id,
        name: row.name,
        phone: row.phone,
        email: row.email.unwrap_or_default(),
        errors: Vec::new(),
    }))
}

async fn update_client(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ClientForm>,
) -> Result<HttpResponse> {
    let client_id = path.into_inner();
    let form = form.into_inner();
    if form.name.trim().is_empty() || form.phone.trim().is_empty() {
        return Ok(redirect(&format!("/admin/clients/{client_id}/edit")));
    }

    // An empty password field leaves the stored password untouched.
    match form.password.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(password) => {
            sqlx::query("UPDATE clients SET name = ?, phone = ?, email = ?, password = ? WHERE id = ?")
                .bind(form.name.trim())
                .bind(form.phone.trim())
                .bind(form.email.as_deref().filter(|value| !value.trim().is_empty()))
                .bind(password)
                .bind(&client_id)
                .execute(&state.db)
                .await
                .map_err(actix_web::error::ErrorInternalServerError)?;
        }
        None => {
            sqlx::query("UPDATE clients SET name = ?, phone = ?, email = ? WHERE id = ?")
                .bind(form.name.trim())
                .bind(form.phone.trim())
                .bind(form.email.as_deref().filter(|value| !value.trim().is_empty()))
                .bind(&client_id)
                .execute(&state.db)
                .await
                .map_err(actix_web::error::ErrorInternalServerError)?;
        }
    }

    Ok(redirect("/admin/clients"))
}

async fn delete_client(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let client_id = path.into_inner();
    sqlx::query("DELETE FROM clients WHERE id = ?")
        .bind(&client_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(redirect("/admin/clients"))
}

async fn list_professionals(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
) -> Result<HttpResponse> {
    professionals_page(&state, &req, &admin, Vec::new()).await
}

async fn create_professional(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    form: web::Form<ProfessionalForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    if form.name.trim().is_empty() {
        let errors = vec!["Name is required.".to_string()];
        return professionals_page(&state, &req, &admin, errors).await;
    }

    let work_start = normalize_slot(form.work_start.as_deref(), "08:00");
    let work_end = normalize_slot(form.work_end.as_deref(), "21:00");
    let commission = form
        .commission_pct
        .as_deref()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    sqlx::query(
        r#"INSERT INTO professionals (id, name, work_start, work_end, commission_pct, likes, created_at)
           VALUES (?, ?, ?, ?, ?, 0, ?)"#,
    )
    .bind(new_id())
    .bind(form.name.trim())
    .bind(&work_start)
    .bind(&work_end)
    .bind(commission)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(redirect("/admin/professionals"))
}

async fn edit_professional(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let professional_id = path.into_inner();
    let row = match fetch_professional_row(&state, &professional_id).await {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Professional not found")),
    };

    Ok(render(AdminProfessionalEditTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        professional_id: row.id,
        name: row.name,
        work_start: row.work_start,
        work_end: row.work_end,
        commission_pct: row.commission_pct,
        errors: Vec::new(),
    }))
}

async fn update_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ProfessionalForm>,
) -> Result<HttpResponse> {
    let professional_id = path.into_inner();
    let form = form.into_inner();
    if form.name.trim().is_empty() {
        return Ok(redirect(&format!("/admin/professionals/{professional_id}/edit")));
    }

    let work_start = normalize_slot(form.work_start.as_deref(), "08:00");
    let work_end = normalize_slot(form.work_end.as_deref(), "21:00");
    let commission = form
        .commission_pct
        .as_deref()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    sqlx::query(
        r#"UPDATE professionals
           SET name = ?, work_start = ?, work_end = ?, commission_pct = ?
           WHERE id = ?"#,
    )
    .bind(form.name.trim())
    .bind(&work_start)
    .bind(&work_end)
    .bind(commission)
    .bind(&professional_id)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(redirect("/admin/professionals"))
}

async fn delete_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let professional_id = path.into_inner();
    sqlx::query("DELETE FROM professionals WHERE id = ?")
        .bind(&professional_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(redirect("/admin/professionals"))
}

async fn list_services(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
) -> Result<HttpResponse> {
    services_page(&state, &req, &admin, Vec::new()).await
}

async fn create_service(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    form: web::Form<ServiceForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push("Name is required.".to_string());
    }
    let price = form.price.trim().parse::<f64>();
    if price.is_err() {
        errors.push("Price must be a number.".to_string());
    }
    let duration = form.duration_min.trim().parse::<i64>();
    if !matches!(duration, Ok(minutes) if minutes > 0) {
        errors.push("Duration must be a positive number of minutes.".to_string());
    }
    if !errors.is_empty() {
        return services_page(&state, &req, &admin, errors).await;
    }

    sqlx::query(
        r#"INSERT INTO services (id, name, price, duration_min, status, category, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(form.name.trim())
    .bind(price.unwrap_or(0.0))
    .bind(duration.unwrap_or(30))
    .bind(SERVICE_ACTIVE)
    .bind(form.category.as_deref().map(str::trim).unwrap_or(""))
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(redirect("/admin/services"))
}

async fn edit_service(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let service_id = path.into_inner();
    let row = match fetch_service_row(&state, &service_id).await {
        Some(row) => row,
        None => return Ok(HttpResponse::NotFound().body("Service not found")),
    };

    Ok(render(AdminServiceEditTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        service_id: row.id,
        name: row.name,
        price: row.price,
        duration_min: row.duration_min,
        category: row.category,
        is_active: row.status == SERVICE_ACTIVE,
        errors: Vec::new(),
    }))
}

async fn update_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<ServiceForm>,
) -> Result<HttpResponse> {
    let service_id = path.into_inner();
    let form = form.into_inner();
    let price = form.price.trim().parse::<f64>();
    let duration = form.duration_min.trim().parse::<i64>();
    if form.name.trim().is_empty() || price.is_err() || !matches!(duration, Ok(minutes) if minutes > 0) {
        return Ok(redirect(&format!("/admin/services/{service_id}/edit")));
    }

    let status = match form.status.as_deref() {
        Some(SERVICE_INACTIVE) => SERVICE_INACTIVE,
        _ => SERVICE_ACTIVE,
    };

    sqlx::query(
        r#"UPDATE services
           SET name = ?, price = ?, duration_min = ?, status = ?, category = ?
           WHERE id = ?"#,
    )
    .bind(form.name.trim())
    .bind(price.unwrap_or(0.0))
    .bind(duration.unwrap_or(30))
    .bind(status)
    .bind(form.category.as_deref().map(str::trim).unwrap_or(""))
    .bind(&service_id)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(redirect("/admin/services"))
}

async fn delete_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let service_id = path.into_inner();
    sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(&service_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(redirect("/admin/services"))
}

async fn financials(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    query: web::Query<FinancialsQuery>,
) -> Result<HttpResponse> {
    let month = normalize_month(query.month.as_deref());
    financials_page(&state, &req, &admin, month, Vec::new()).await
}

async fn create_entry(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    form: web::Form<EntryForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.description.trim().is_empty() {
        errors.push("Description is required.".to_string());
    }
    if form.category != ENTRY_REVENUE && form.category != ENTRY_EXPENSE {
        errors.push("Pick revenue or expense.".to_string());
    }
    let amount = form.amount.trim().parse::<f64>();
    if !matches!(amount, Ok(value) if value > 0.0) {
        errors.push("Amount must be a positive number.".to_string());
    }
    if chrono::NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d").is_err() {
        errors.push("Please pick a valid date.".to_string());
    }

    if !errors.is_empty() {
        let month = normalize_month(None);
        return financials_page(&state, &req, &admin, month, errors).await;
    }

    let date = form.date.trim().to_string();
    sqlx::query(
        r#"INSERT INTO financial_entries (id, description, category, amount, date, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(form.description.trim())
    .bind(&form.category)
    .bind(amount.unwrap_or(0.0))
    .bind(&date)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    let month = date.get(..7).unwrap_or(&date).to_string();
    Ok(redirect(&format!("/admin/financials?month={month}")))
}

async fn delete_entry(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let entry_id = path.into_inner();
    sqlx::query("DELETE FROM financial_entries WHERE id = ?")
        .bind(&entry_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(redirect("/admin/financials"))
}

async fn notifications(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, title, message, read, created_at FROM notifications ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let unread_count = rows.iter().filter(|row| row.read == 0).count() as i64;

    Ok(render(AdminNotificationsTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        notifications: rows
            .into_iter()
            .map(|row| NotificationView {
                is_read: row.read != 0,
                id: row.id,
                title: row.title,
                message: row.message,
                created_at: row.created_at,
            })
            .collect(),
        unread_count,
    }))
}

async fn mark_notification_read(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let notification_id = path.into_inner();
    sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
        .bind(&notification_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(redirect("/admin/notifications"))
}

async fn mark_all_read(state: web::Data<AppState>) -> Result<HttpResponse> {
    sqlx::query("UPDATE notifications SET read = 1 WHERE read = 0")
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(redirect("/admin/notifications"))
}

async fn suggestions(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, SuggestionRow>(
        "SELECT id, author_name, message, created_at FROM suggestions ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Ok(render(AdminSuggestionsTemplate {
        theme: current_theme(&req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        suggestions: rows
            .into_iter()
            .map(|row| SuggestionView {
                author_name: row.author_name,
                message: row.message,
                created_at: row.created_at,
            })
            .collect(),
    }))
}

async fn settings_page(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    query: web::Query<SettingsQuery>,
) -> Result<HttpResponse> {
    let mut errors = Vec::new();
    match query.error.as_deref() {
        Some("uploads") => errors.push("Image uploads are not configured.".to_string()),
        Some("upload") => errors.push("Avatar upload failed. Try again.".to_string()),
        _ => {}
    }

    render_settings(
        &state,
        &req,
        &admin,
        query.saved.as_deref() == Some("1"),
        errors,
    )
    .await
}

async fn update_settings(
    state: web::Data<AppState>,
    req: HttpRequest,
    admin: web::ReqData<AdminUser>,
    form: web::Form<SettingsForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    if form.shop_name.trim().is_empty() || form.admin_name.trim().is_empty() {
        let errors = vec!["Shop name and admin name are required.".to_string()];
        return render_settings(&state, &req, &admin, false, errors).await;
    }

    sqlx::query(
        r#"UPDATE settings
           SET shop_name = ?, admin_name = ?, phone = ?, address = ?, updated_at = ?
           WHERE id = 1"#,
    )
    .bind(form.shop_name.trim())
    .bind(form.admin_name.trim())
    .bind(form.phone.as_deref().map(str::trim).unwrap_or(""))
    .bind(form.address.as_deref().map(str::trim).unwrap_or(""))
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(redirect("/admin/settings?saved=1"))
}

async fn upload_avatar(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    if !state.images.enabled() {
        return Ok(redirect("/admin/settings?error=uploads"));
    }

    let mut file_name = String::from("avatar.png");
    let mut data: Vec<u8> = Vec::new();
    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field.name() != "avatar" {
            continue;
        }
        if let Some(name) = field.content_disposition().get_filename() {
            file_name = name.to_string();
        }
        while let Some(chunk) = field.next().await {
            data.extend_from_slice(&chunk?);
        }
        break;
    }

    if data.is_empty() {
        return Ok(redirect("/admin/settings?error=upload"));
    }

    match images::upload_image(&state.images, &file_name, data).await {
        Ok(url) => {
            sqlx::query("UPDATE settings SET avatar_url = ?, updated_at = ? WHERE id = 1")
                .bind(&url)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&state.db)
                .await
                .map_err(actix_web::error::ErrorInternalServerError)?;
            Ok(redirect("/admin/settings?saved=1"))
        }
        Err(err) => {
            log::warn!("Avatar upload failed: {err}");
            Ok(redirect("/admin/settings?error=upload"))
        }
    }
}

async fn clients_page(
    state: &web::Data<AppState>,
    req: &HttpRequest,
    admin: &AdminUser,
    errors: Vec<String>,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, email, password, total_spent, last_visit, created_at
           FROM clients ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Ok(render(AdminClientsTemplate {
        theme: current_theme(req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        clients: rows
            .into_iter()
            .map(|row| {
                let email = row.email.unwrap_or_default();
                let last_visit = row.last_visit.unwrap_or_default();
                ClientView {
                    id: row.id,
                    name: row.name,
                    phone: row.phone,
                    has_email: !email.is_empty(),
                    email,
                    total_spent: row.total_spent,
                    has_last_visit: !last_visit.is_empty(),
                    last_visit,
                }
            })
            .collect(),
        errors,
    }))
}

async fn professionals_page(
    state: &web::Data<AppState>,
    req: &HttpRequest,
    admin: &AdminUser,
    errors: Vec<String>,
) -> Result<HttpResponse> {
    let rows = fetch_professional_rows(state).await.unwrap_or_default();

    Ok(render(AdminProfessionalsTemplate {
        theme: current_theme(req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        professionals: rows
            .into_iter()
            .map(|row| ProfessionalView {
                id: row.id,
                name: row.name,
                work_start: row.work_start,
                work_end: row.work_end,
                commission_pct: row.commission_pct,
                likes: row.likes,
            })
            .collect(),
        errors,
    }))
}

async fn services_page(
    state: &web::Data<AppState>,
    req: &HttpRequest,
    admin: &AdminUser,
    errors: Vec<String>,
) -> Result<HttpResponse> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, price, duration_min, status, category, created_at
           FROM services ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Ok(render(AdminServicesTemplate {
        theme: current_theme(req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        services: rows
            .into_iter()
            .map(|row| ServiceView {
                is_active: row.status == SERVICE_ACTIVE,
                id: row.id,
                name: row.name,
                price: row.price,
                duration_min: row.duration_min,
                category: row.category,
                status: row.status,
            })
            .collect(),
        errors,
    }))
}

async fn financials_page(
    state: &web::Data<AppState>,
    req: &HttpRequest,
    admin: &AdminUser,
    month: String,
    errors: Vec<String>,
) -> Result<HttpResponse> {
    let pattern = format!("{month}%");
    let entries = sqlx::query_as::<_, FinancialEntryRow>(
        r#"SELECT id, description, category, amount, date, created_at
           FROM financial_entries
           WHERE date LIKE ?
           ORDER BY date DESC, created_at DESC"#,
    )
    .bind(&pattern)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let sums = finance::totals(&entries);

    let professionals = fetch_professional_rows(state).await.unwrap_or_default();
    let month_appointments = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, client_id, client_name, client_phone, service_id, service_name, price,
                  duration_min, professional_id, professional_name, date, start_time, end_time,
                  status, created_at
           FROM appointments
           WHERE date LIKE ?"#,
    )
    .bind(&pattern)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let commissions = finance::commission_lines(&professionals, &month_appointments)
        .into_iter()
        .map(|line| CommissionView {
            name: line.name,
            commission_pct: line.commission_pct,
            base: line.base,
            commission: line.commission,
        })
        .collect();

    Ok(render(AdminFinancialsTemplate {
        theme: current_theme(req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        month,
        entries: entries
            .into_iter()
            .map(|row| EntryView {
                is_revenue: row.category == ENTRY_REVENUE,
                id: row.id,
                description: row.description,
                category: row.category,
                amount: row.amount,
                date: row.date,
            })
            .collect(),
        revenue_total: sums.revenue,
        expense_total: sums.expense,
        net_total: sums.net(),
        commissions,
        errors,
    }))
}

async fn render_settings(
    state: &web::Data<AppState>,
    req: &HttpRequest,
    admin: &AdminUser,
    saved: bool,
    errors: Vec<String>,
) -> Result<HttpResponse> {
    let settings = fetch_settings(&state.db).await;

    Ok(render(AdminSettingsTemplate {
        theme: current_theme(req),
        admin_name: admin.display_name.clone(),
        has_avatar: !admin.avatar_url.is_empty(),
        avatar_url: admin.avatar_url.clone(),
        shop_name: settings
            .as_ref()
            .map(|row| row.shop_name.clone())
            .unwrap_or_else(|| "Barbearia Sr. José".to_string()),
        display_name: settings
            .as_ref()
            .map(|row| row.admin_name.clone())
            .unwrap_or_else(|| "Sr. José".to_string()),
        phone: settings
            .as_ref()
            .and_then(|row| row.phone.clone())
            .unwrap_or_default(),
        address: settings
            .and_then(|row| row.address)
            .unwrap_or_default(),
        uploads_enabled: state.images.enabled(),
        saved,
        errors,
    }))
}

fn to_list_view(row: AppointmentRow) -> AppointmentListView {
    AppointmentListView {
        is_completed: row.status == STATUS_COMPLETED,
        is_canceled: row.status == STATUS_CANCELED,
        id: row.id,
        client_name: row.client_name,
        client_phone: row.client_phone,
        service_name: row.service_name,
        professional_name: row.professional_name,
        date: row.date,
        start_time: row.start_time,
        end_time: row.end_time,
        status: row.status,
        price: row.price,
    }
}

fn status_options(selected: &str) -> Vec<StatusOption> {
    vec![
        StatusOption {
            value: "",
            label: "All statuses",
            selected: selected.is_empty(),
        },
        StatusOption {
            value: STATUS_SCHEDULED,
            label: "Scheduled",
            selected: selected == STATUS_SCHEDULED,
        },
        StatusOption {
            value: STATUS_COMPLETED,
            label: "Completed",
            selected: selected == STATUS_COMPLETED,
        },
        StatusOption {
            value: STATUS_RESCHEDULED,
            label: "Rescheduled",
            selected: selected == STATUS_RESCHEDULED,
        },
        StatusOption {
            value: STATUS_CANCELED,
            label: "Canceled",
            selected: selected == STATUS_CANCELED,
        },
    ]
}

fn slot_options(selected: &str) -> Vec<SlotOption> {
    schedule::hour_slots()
        .into_iter()
        .map(|value| SlotOption {
            selected: value == selected,
            value,
        })
        .collect()
}

async fn service_options(state: &web::Data<AppState>, selected: &str) -> Vec<PickOption> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, price, duration_min, status, category, created_at
           FROM services WHERE status = ? ORDER BY name"#,
    )
    .bind(SERVICE_ACTIVE)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    rows.into_iter()
        .map(|row| PickOption {
            selected: row.id == selected,
            label: format!("{} (R$ {:.2}, {} min)", row.name, row.price, row.duration_min),
            id: row.id,
        })
        .collect()
}

async fn professional_options(state: &web::Data<AppState>, selected: &str) -> Vec<PickOption> {
    let rows = fetch_professional_rows(state).await.unwrap_or_default();
    rows.into_iter()
        .map(|row| PickOption {
            selected: row.id == selected,
            label: row.name,
            id: row.id,
        })
        .collect()
}

async fn fetch_professional_rows(
    state: &web::Data<AppState>,
) -> Result<Vec<ProfessionalRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfessionalRow>(
        r#"SELECT id, name, work_start, work_end, commission_pct, likes, created_at
           FROM professionals ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await
}

async fn fetch_professional_row(
    state: &web::Data<AppState>,
    professional_id: &str,
) -> Option<ProfessionalRow> {
    if professional_id.trim().is_empty() {
        return None;
    }
    sqlx::query_as::<_, ProfessionalRow>(
        r#"SELECT id, name, work_start, work_end, commission_pct, likes, created_at
           FROM professionals WHERE id = ? LIMIT 1"#,
    )
    .bind(professional_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

async fn fetch_service_row(state: &web::Data<AppState>, service_id: &str) -> Option<ServiceRow> {
    if service_id.trim().is_empty() {
        return None;
    }
    sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, price, duration_min, status, category, created_at
           FROM services WHERE id = ? LIMIT 1"#,
    )
    .bind(service_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

async fn fetch_client_by_phone(state: &web::Data<AppState>, phone: &str) -> Option<ClientRow> {
    sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, email, password, total_spent, last_visit, created_at
           FROM clients WHERE phone = ? LIMIT 1"#,
    )
    .bind(phone)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

fn normalize_date(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok())
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string())
}

fn normalize_month(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| chrono::NaiveDate::parse_from_str(&format!("{v}-01"), "%Y-%m-%d").is_ok())
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m").to_string())
}

fn normalize_slot(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| schedule::parse_time(v).is_some())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn shift_date(date: &str, days: i64) -> String {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|parsed| (parsed + chrono::Duration::days(days)).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| date.to_string())
}

fn admin_next(next: Option<&str>, fallback: &str) -> String {
    match next {
        Some(value) if value.starts_with("/admin") => value.to_string(),
        _ => fallback.to_string(),
    }
}

fn count(query: &str, state: &web::Data<AppState>) -> CountQuery {
    CountQuery {
        query: query.to_string(),
        state: state.clone(),
    }
}

struct CountQuery {
    query: String,
    state: web::Data<AppState>,
}

impl CountQuery {
    async fn run(self) -> i64 {
        sqlx::query_scalar::<_, i64>(&self.query)
            .fetch_one(&self.state.db)
            .await
            .unwrap_or(0)
    }

    async fn run_with_param(self, param: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&self.query)
            .bind(param)
            .fetch_one(&self.state.db)
            .await
            .unwrap_or(0)
    }
}
