use actix_web::{
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorUnauthorized,
    http::header,
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web_httpauth::extractors::basic::BasicAuth;
use uuid::Uuid;

use crate::{db, models::ClientRow, models::SettingsRow, state::AppState};

pub const AUTH_REALM: &str = "Navalha";
const LOGOUT_COOKIE: &str = "nv_logged_out";
const CLIENT_COOKIE: &str = "nv_client";
const THEME_COOKIE: &str = "nv_theme";

pub const DEFAULT_ADMIN_DISPLAY_NAME: &str = "Sr. José";

#[derive(Clone, Debug)]
pub struct AdminUser {
    pub email: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// Admin sign-in: the configured credential pair compared verbatim, with
/// the display identity taken from the stored settings when present.
pub async fn authenticate_admin(state: &AppState, email: &str, password: &str) -> Option<AdminUser> {
    if !state.admin.matches(email, password) {
        return None;
    }
    let settings = db::fetch_settings(&state.db).await;
    Some(admin_profile(email, settings))
}

fn admin_profile(email: &str, settings: Option<SettingsRow>) -> AdminUser {
    let (display_name, avatar_url) = match settings {
        Some(row) => {
            let name = if row.admin_name.trim().is_empty() {
                DEFAULT_ADMIN_DISPLAY_NAME.to_string()
            } else {
                row.admin_name
            };
            (name, row.avatar_url.unwrap_or_default())
        }
        None => (DEFAULT_ADMIN_DISPLAY_NAME.to_string(), String::new()),
    };
    AdminUser {
        email: email.to_string(),
        display_name,
        avatar_url,
    }
}

async fn authenticate(req: &ServiceRequest, credentials: &BasicAuth) -> Result<AdminUser, Error> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ErrorUnauthorized("Unauthorized"))?;
    let email = credentials.user_id();
    let password = credentials.password().unwrap_or_default();
    authenticate_admin(state, email, password)
        .await
        .ok_or_else(|| ErrorUnauthorized("Unauthorized"))
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authenticate(&req, &credentials).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Err(err) => Err((err, req)),
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(LOGOUT_COOKIE, "1")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(365));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn clear_logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(LOGOUT_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn is_logged_out(req: &HttpRequest) -> bool {
    req.cookie(LOGOUT_COOKIE).is_some()
}

pub async fn logout_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: actix_web::body::MessageBody + 'static,
{
    if is_logged_out(req.request()) {
        let body = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Logged out</title>
  </head>
  <body>
    <h1>You're logged out</h1>
    <p>Your session has been closed.</p>
    <p><a href="/login?next=/admin/dashboard">Log in again</a> or <a href="/">return to the public site</a>.</p>
  </body>
</html>"#;
        let response = HttpResponse::Unauthorized()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .content_type("text/html; charset=utf-8")
            .body(body);
        return Ok(req.into_response(response));
    }

    let res = next.call(req).await?;
    Ok(res.map_into_boxed_body())
}

/// Client sign-in compares the stored password verbatim; clients without
/// one cannot log in.
pub async fn authenticate_client(
    state: &AppState,
    email: &str,
    password: &str,
) -> Option<ClientRow> {
    let client = sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, email, password, total_spent, last_visit, created_at
           FROM clients
           WHERE email = ?
           LIMIT 1"#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)?;

    match client.password.as_deref() {
        Some(stored) if !stored.is_empty() && stored == password => Some(client),
        _ => None,
    }
}

pub fn client_cookie(req: &HttpRequest, client_id: &str) -> Cookie<'static> {
    let mut builder = Cookie::build(CLIENT_COOKIE, client_id.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(30));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn clear_client_cookie(req: &HttpRequest) -> Cookie<'static> {
    let mut builder = Cookie::build(CLIENT_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(0));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub async fn current_client(state: &AppState, req: &HttpRequest) -> Option<ClientRow> {
    let client_id = req.cookie(CLIENT_COOKIE)?.value().to_string();
    if client_id.is_empty() {
        return None;
    }
    sqlx::query_as::<_, ClientRow>(
        r#"SELECT id, name, phone, email, password, total_spent, last_visit, created_at
           FROM clients
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(client_id)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

pub fn theme_cookie(req: &HttpRequest, theme: &str) -> Cookie<'static> {
    let mut builder = Cookie::build(THEME_COOKIE, theme.to_string())
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(Duration::days(365));
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn current_theme(req: &HttpRequest) -> String {
    match req.cookie(THEME_COOKIE) {
        Some(cookie) if cookie.value() == "dark" => "dark".to_string(),
        _ => "light".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AdminCredentials;

    fn settings(admin_name: &str, avatar_url: Option<&str>) -> SettingsRow {
        SettingsRow {
            id: 1,
            shop_name: "Barbearia Sr. José".to_string(),
            admin_name: admin_name.to_string(),
            avatar_url: avatar_url.map(str::to_string),
            phone: None,
            address: None,
            updated_at: "2024-06-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn the_configured_pair_is_accepted_and_everything_else_rejected() {
        let credentials = AdminCredentials {
            email: "srjoseadm@gmail.com".to_string(),
            password: "654321".to_string(),
        };
        assert!(credentials.matches("srjoseadm@gmail.com", "654321"));
        assert!(!credentials.matches("srjoseadm@gmail.com", "123456"));
        assert!(!credentials.matches("someone@else.com", "654321"));
    }

    #[test]
    fn profile_comes_from_settings_when_present() {
        let user = admin_profile(
            "srjoseadm@gmail.com",
            Some(settings("José Oliveira", Some("https://img.test/a.png"))),
        );
        assert_eq!(user.display_name, "José Oliveira");
        assert_eq!(user.avatar_url, "https://img.test/a.png");
    }

    #[test]
    fn profile_falls_back_when_settings_are_missing_or_blank() {
        let user = admin_profile("srjoseadm@gmail.com", None);
        assert_eq!(user.display_name, DEFAULT_ADMIN_DISPLAY_NAME);
        assert_eq!(user.avatar_url, "");

        let user = admin_profile("srjoseadm@gmail.com", Some(settings("  ", None)));
        assert_eq!(user.display_name, DEFAULT_ADMIN_DISPLAY_NAME);
    }
}
