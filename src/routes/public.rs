use actix_web::{http::header, web, HttpRequest, HttpResponse, Result};
use actix_web::http::header::Header;
use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use askama::Template;
use serde::Deserialize;

use crate::{
    auth::{
        authenticate_admin, authenticate_client, clear_client_cookie, clear_logout_cookie,
        client_cookie, current_client, current_theme, logout_cookie, new_id, theme_cookie,
        AUTH_REALM,
    },
    db::{count_appointments, fetch_settings, insert_appointment, record_notification},
    filters,
    models::{AppointmentRow, ClientRow, ProfessionalRow, ServiceRow, SERVICE_ACTIVE, STATUS_SCHEDULED},
    schedule,
    state::{AppState, ServerEvent},
    templates::{redirect, render},
};

#[derive(Clone, Debug)]
struct ServiceView {
    id: String,
    name: String,
    price: f64,
    duration_min: i64,
    selected: bool,
}

#[derive(Clone, Debug)]
struct ProfessionalView {
    id: String,
    name: String,
    initials: String,
    likes: i64,
    selected: bool,
}

#[derive(Clone, Debug)]
struct SlotView {
    value: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    theme: String,
    shop_name: String,
    phone: String,
    has_phone: bool,
    address: String,
    has_address: bool,
    services: Vec<ServiceView>,
    professionals: Vec<ProfessionalView>,
    logged_in: bool,
    client_name: String,
}

#[derive(Clone, Debug, Default)]
struct BookingFormView {
    client_name: String,
    client_phone: String,
    client_email: String,
    date: String,
}

#[derive(Template)]
#[template(path = "book.html")]
struct BookingTemplate {
    theme: String,
    services: Vec<ServiceView>,
    professionals: Vec<ProfessionalView>,
    slots: Vec<SlotView>,
    form: BookingFormView,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "book_success.html")]
struct BookingSuccessTemplate {
    theme: String,
    client_name: String,
    service_name: String,
    professional_name: String,
    date: String,
    start_time: String,
    end_time: String,
}

#[derive(Template)]
#[template(path = "suggestions.html")]
struct SuggestionsTemplate {
    theme: String,
    sent: bool,
    author_name: String,
    message: String,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "client_login.html")]
struct ClientLoginTemplate {
    theme: String,
    email: String,
    errors: Vec<String>,
}

#[derive(Clone, Debug)]
struct ClientAppointmentView {
    date: String,
    start_time: String,
    end_time: String,
    service_name: String,
    professional_name: String,
    status: String,
    price: f64,
}

#[derive(Template)]
#[template(path = "client_appointments.html")]
struct ClientAppointmentsTemplate {
    theme: String,
    client_name: String,
    total_spent: f64,
    appointments: Vec<ClientAppointmentView>,
}

#[derive(Deserialize)]
struct BookingForm {
    client_name: String,
    client_phone: String,
    client_email: Option<String>,
    service_id: String,
    professional_id: String,
    date: String,
    start_time: String,
}

#[derive(Deserialize)]
struct SuggestionForm {
    author_name: Option<String>,
    message: String,
}

#[derive(Deserialize)]
struct ClientLoginForm {
    email: String,
    password: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/book").route(web::get().to(show_booking)).route(web::post().to(create_booking)))
        .service(web::resource("/professionals/{id}/like").route(web::post().to(like_professional)))
        .service(web::resource("/suggestions").route(web::get().to(show_suggestions)).route(web::post().to(create_suggestion)))
        .service(web::resource("/client/login").route(web::get().to(client_login_page)).route(web::post().to(client_login)))
        .service(web::resource("/client/appointments").route(web::get().to(client_appointments)))
        .service(web::resource("/client/logout").route(web::get().to(client_logout)))
        .service(web::resource("/theme/{theme}").route(web::get().to(set_theme)))
        .service(web::resource("/login").route(web::get().to(login)))
        .service(web::resource("/logout").route(web::get().to(logout)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .cookie(logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LoginQuery>,
) -> HttpResponse {
    let auth = match Authorization::<Basic>::parse(&req) {
        Ok(auth) => auth,
        Err(_) => return auth_challenge(),
    };
    let credentials = auth.into_scheme();
    let email = credentials.user_id();
    let password = credentials.password().unwrap_or_default();

    if authenticate_admin(&state, email, password).await.is_none() {
        return auth_challenge();
    }

    let requested = query.next.as_deref().unwrap_or("");
    let target = if requested.starts_with("/admin") {
        requested
    } else {
        "/admin/dashboard"
    };

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, target))
        .cookie(clear_logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

fn auth_challenge() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((header::WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", AUTH_REALM)))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn home(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let settings = fetch_settings(&state.db).await;
    let shop_name = settings
        .as_ref()
        .map(|row| row.shop_name.clone())
        .unwrap_or_else(|| "Barbearia Sr. José".to_string());
    let phone = settings
        .as_ref()
        .and_then(|row| row.phone.clone())
        .unwrap_or_default();
    let address = settings
        .as_ref()
        .and_then(|row| row.address.clone())
        .unwrap_or_default();

    let services = fetch_active_services(&state).await.unwrap_or_default();
    let professionals = fetch_professionals(&state).await.unwrap_or_default();
    let client = current_client(&state, &req).await;

    Ok(render(HomeTemplate {
        theme: current_theme(&req),
        shop_name,
        has_phone: !phone.is_empty(),
        phone,
        has_address: !address.is_empty(),
        address,
        services,
        professionals,
        logged_in: client.is_some(),
        client_name: client.map(|row| row.name).unwrap_or_default(),
    }))
}

async fn show_booking(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let services = fetch_active_services(&state).await.unwrap_or_default();
    let professionals = fetch_professionals(&state).await.unwrap_or_default();

    Ok(render(BookingTemplate {
        theme: current_theme(&req),
        services,
        professionals,
        slots: slot_views(""),
        form: BookingFormView {
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            ..BookingFormView::default()
        },
        errors: Vec::new(),
    }))
}

async fn create_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<BookingForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.client_name.trim().is_empty() {
        errors.push("Full name is required.".to_string());
    }
    if form.client_phone.trim().is_empty() {
        errors.push("Phone number is required.".to_string());
    }
    if chrono::NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d").is_err() {
        errors.push("Please pick a valid date.".to_string());
    }
    if schedule::parse_time(&form.start_time).is_none() {
        errors.push("Please pick a time slot.".to_string());
    }

    let service = fetch_service(&state, &form.service_id).await;
    if service.is_none() {
        errors.push("Please select a service.".to_string());
    }
    let professional = fetch_professional(&state, &form.professional_id).await;
    if professional.is_none() {
        errors.push("Please select a professional.".to_string());
    }

    let (service, professional) = match (service, professional) {
        (Some(service), Some(professional)) if errors.is_empty() => (service, professional),
        _ => {
            let mut services = fetch_active_services(&state).await.unwrap_or_default();
            for service in &mut services {
                service.selected = form.service_id == service.id;
            }
            let mut professionals = fetch_professionals(&state).await.unwrap_or_default();
            for professional in &mut professionals {
                professional.selected = form.professional_id == professional.id;
            }
            return Ok(render(BookingTemplate {
                theme: current_theme(&req),
                services,
                professionals,
                slots: slot_views(&form.start_time),
                form: BookingFormView {
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

    // Start time is already validated, so the end time always resolves.
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

    let _ = record_notification(
        &state.db,
        "New booking",
        &format!(
            "{} booked {} with {} on {} at {}.",
            appointment.client_name,
            appointment.service_name,
            appointment.professional_name,
            appointment.date,
            appointment.start_time
        ),
    )
    .await;

    let total = count_appointments(&state.db).await;
    let _ = state
        .events
        .send(ServerEvent::from_appointment("appointment_created", &appointment, total));

    Ok(render(BookingSuccessTemplate {
        theme: current_theme(&req),
        client_name: appointment.client_name,
        service_name: appointment.service_name,
        professional_name: appointment.professional_name,
        date: appointment.date,
        start_time: appointment.start_time,
        end_time: appointment.end_time,
    }))
}

/// Likes are not deduplicated; every press increments the counter.
async fn like_professional(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let professional_id = path.into_inner();
    sqlx::query("UPDATE professionals SET likes = likes + 1 WHERE id = ?")
        .bind(&professional_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(redirect("/"))
}

#[derive(Deserialize)]
struct SuggestionsQuery {
    sent: Option<String>,
}

async fn show_suggestions(
    req: HttpRequest,
    query: web::Query<SuggestionsQuery>,
) -> Result<HttpResponse> {
    Ok(render(SuggestionsTemplate {
        theme: current_theme(&req),
        sent: query.sent.as_deref() == Some("1"),
        author_name: String::new(),
        message: String::new(),
        errors: Vec::new(),
    }))
}

async fn create_suggestion(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<SuggestionForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    if form.message.trim().is_empty() {
        return Ok(render(SuggestionsTemplate {
            theme: current_theme(&req),
            sent: false,
            author_name: form.author_name.unwrap_or_default(),
            message: form.message,
            errors: vec!["Please write a suggestion first.".to_string()],
        }));
    }

    let author = form
        .author_name
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());

    sqlx::query(
        r#"INSERT INTO suggestions (id, author_name, message, created_at)
           VALUES (?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&author)
    .bind(form.message.trim())
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    let _ = record_notification(
        &state.db,
        "New suggestion",
        &format!("{author} left a suggestion."),
    )
    .await;
    let _ = state.events.send(ServerEvent::named("suggestion_created", &author));

    Ok(redirect("/suggestions?sent=1"))
}

async fn client_login_page(req: HttpRequest) -> Result<HttpResponse> {
    Ok(render(ClientLoginTemplate {
        theme: current_theme(&req),
        email: String::new(),
        errors: Vec::new(),
    }))
}

async fn client_login(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<ClientLoginForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    match authenticate_client(&state, form.email.trim(), &form.password).await {
        Some(client) => Ok(HttpResponse::SeeOther()
            .append_header((header::LOCATION, "/client/appointments"))
            .cookie(client_cookie(&req, &client.id))
            .finish()),
        None => Ok(render(ClientLoginTemplate {
            theme: current_theme(&req),
            email: form.email,
            errors: vec!["Invalid email or password.".to_string()],
        })),
    }
}

async fn client_appointments(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let client = match current_client(&state, &req).await {
        Some(client) => client,
        None => return Ok(redirect("/client/login")),
    };

    let appointments = fetch_client_appointments(&state, &client.id)
        .await
        .unwrap_or_default();

    Ok(render(ClientAppointmentsTemplate {
        theme: current_theme(&req),
        client_name: client.name,
        total_spent: client.total_spent,
        appointments,
    }))
}

async fn client_logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .cookie(clear_client_cookie(&req))
        .finish()
}

#[derive(Deserialize)]
struct ThemeQuery {
    next: Option<String>,
}

async fn set_theme(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ThemeQuery>,
) -> HttpResponse {
    let requested = path.into_inner();
    let theme = if requested == "dark" { "dark" } else { "light" };
    let next = query.next.as_deref().unwrap_or("/");
    let next = if next.starts_with('/') { next } else { "/" };

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, next.to_string()))
        .cookie(theme_cookie(&req, theme))
        .finish()
}

fn slot_views(selected: &str) -> Vec<SlotView> {
    schedule::hour_slots()
        .into_iter()
        .map(|value| SlotView {
            selected: value == selected,
            value,
        })
        .collect()
}

async fn fetch_active_services(state: &web::Data<AppState>) -> Result<Vec<ServiceView>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, price, duration_min, status, category, created_at
           FROM services
           WHERE status = ?
           ORDER BY name"#,
    )
    .bind(SERVICE_ACTIVE)
    .fetch_all(&state.db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ServiceView {
            id: row.id,
            name: row.name,
            price: row.price,
            duration_min: row.duration_min,
            selected: false,
        })
        .collect())
}

async fn fetch_professionals(state: &web::Data<AppState>) -> Result<Vec<ProfessionalView>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProfessionalRow>(
        r#"SELECT id, name, work_start, work_end, commission_pct, likes, created_at
           FROM professionals
           ORDER BY name"#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let initials = row
                .name
                .split_whitespace()
                .filter_map(|part| part.chars().next())
                .take(2)
                .collect::<String>();
            ProfessionalView {
                id: row.id,
                name: row.name,
                initials: initials.to_uppercase(),
                likes: row.likes,
                selected: false,
            }
        })
        .collect())
}

async fn fetch_service(state: &web::Data<AppState>, service_id: &str) -> Option<ServiceRow> {
    if service_id.trim().is_empty() {
        return None;
    }
    sqlx::query_as::<_, ServiceRow>(
        r#"SELECT id, name, price, duration_min, status, category, created_at
           FROM services
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(service_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

async fn fetch_professional(state: &web::Data<AppState>, professional_id: &str) -> Option<ProfessionalRow> {
    if professional_id.trim().is_empty() {
        return None;
    }
    sqlx::query_as::<_, ProfessionalRow>(
        r#"SELECT id, name, work_start, work_end, commission_pct, likes, created_at
           FROM professionals
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(professional_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

async fn fetch_client_by_phone(state: &web::Data<AppState>, phone: &str) -> Option<ClientRow> {
    sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, email, password, total_spent, last_visit, created_at
           FROM clients
           WHERE phone = ?
           LIMIT 1"#,
    )
    .bind(phone)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

async fn fetch_client_appointments(
    state: &web::Data<AppState>,
    client_id: &str,
) -> Result<Vec<ClientAppointmentView>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, client_id, client_name, client_phone, service_id, service_name, price,
                  duration_min, professional_id, professional_name, date, start_time, end_time,
                  status, created_at
           FROM appointments
           WHERE client_id = ?
           ORDER BY date DESC, start_time DESC"#,
    )
    .bind(client_id)
    .fetch_all(&state.db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ClientAppointmentView {
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            service_name: row.service_name,
            professional_name: row.professional_name,
            status: row.status,
            price: row.price,
        })
        .collect())
}
