use std::time::Duration;

use actix_web::{http::header, middleware::from_fn, web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    auth::{admin_validator, logout_guard},
    chime::{ChimeDebouncer, Outcome},
    db,
    state::{AppState, ServerEvent},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/admin/events")
            .wrap(HttpAuthentication::basic(admin_validator))
            .wrap(from_fn(logout_guard))
            .route(web::get().to(stream_events)),
    )
    .service(
        web::resource("/admin/chime")
            .wrap(HttpAuthentication::basic(admin_validator))
            .wrap(from_fn(logout_guard))
            .route(web::get().to(chime_sound)),
    );
}

/// One SSE session per open dashboard. Every session forwards the shared
/// event feed and runs its own chime debouncer over the appointment totals
/// the events carry; the shared stamp keeps concurrent sessions from
/// chiming over each other.
async fn stream_events(state: web::Data<AppState>) -> HttpResponse {
    let mut events = state.events.subscribe();
    let (tx, rx) = mpsc::channel::<Result<web::Bytes, actix_web::Error>>(32);

    // Seed the baseline; the first snapshot never chimes.
    let mut debouncer = ChimeDebouncer::new(state.chime);
    debouncer.observe(db::count_appointments(&state.db).await, now_ms());
    let stamp = state.stamp.clone();

    actix_web::rt::spawn(async move {
        loop {
            let wait = debouncer
                .due_at()
                .map(|due| Duration::from_millis((due - now_ms()).max(0) as u64));

            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Some(total) = event.appointments_total {
                            debouncer.observe(total, now_ms());
                        }
                        if tx.send(Ok(update_frame(&event))).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::time::sleep(wait.unwrap_or(Duration::ZERO)), if wait.is_some() => {
                    if debouncer.evaluate(now_ms(), &stamp) == Some(Outcome::Play) {
                        if tx.send(Ok(chime_frame())).await.is_err() {
                            break;
                        }
                    }
                }
                _ = tx.closed() => break,
            }
        }
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(ReceiverStream::new(rx))
}

/// Serves the cached chime audio. 404 until the preload has finished, and
/// forever if it failed; the player swallows the error either way.
async fn chime_sound(state: web::Data<AppState>) -> HttpResponse {
    match state.sound.bytes() {
        Some(bytes) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "audio/mpeg"))
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .body(bytes),
        None => HttpResponse::NotFound().finish(),
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn update_frame(event: &ServerEvent) -> web::Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("event: update\ndata: {}\n\n", payload))
}

fn chime_frame() -> web::Bytes {
    web::Bytes::from_static(b"event: chime\ndata: {}\n\n")
}
