//! In-memory cache for the chime sound asset. The remote file is fetched
//! once per process start and replayed from memory; a failed fetch leaves
//! the dashboards without audio but otherwise intact.

use std::sync::{Arc, Mutex};

use actix_web::web::Bytes;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundState {
    Unloaded,
    Loading,
    Ready,
}

#[derive(Clone)]
pub struct SoundCache {
    url: String,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    state: SoundState,
    bytes: Option<Bytes>,
}

impl SoundCache {
    pub fn new(url: String) -> Self {
        Self {
            url,
            inner: Arc::new(Mutex::new(Inner {
                state: SoundState::Unloaded,
                bytes: None,
            })),
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> SoundState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// The cached asset, present only once loading succeeded.
    pub fn bytes(&self) -> Option<Bytes> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.state {
            SoundState::Ready => inner.bytes.clone(),
            _ => None,
        }
    }

    /// Fetches and caches the asset. Fire and forget: call it once from a
    /// spawned task at startup; repeat calls while loading or loaded do
    /// nothing, and failures are logged and swallowed.
    pub async fn preload(&self) {
        if self.url.trim().is_empty() {
            log::info!("No chime sound URL configured; dashboards stay silent");
            return;
        }
        if !self.begin_loading() {
            return;
        }
        match fetch(&self.url).await {
            Ok(bytes) => {
                log::info!("Cached chime sound ({} bytes)", bytes.len());
                self.finish(Some(bytes));
            }
            Err(err) => {
                log::warn!("Chime sound fetch failed: {err}");
                self.finish(None);
            }
        }
    }

    fn begin_loading(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state == SoundState::Unloaded {
            inner.state = SoundState::Loading;
            true
        } else {
            false
        }
    }

    fn finish(&self, fetched: Option<Bytes>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match fetched {
            Some(bytes) => {
                inner.bytes = Some(bytes);
                inner.state = SoundState::Ready;
            }
            None => {
                inner.bytes = None;
                inner.state = SoundState::Unloaded;
            }
        }
    }
}

async fn fetch(url: &str) -> Result<Bytes, reqwest::Error> {
    let response = reqwest::get(url).await?.error_for_status()?;
    response.bytes().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unloaded_with_no_bytes() {
        let cache = SoundCache::new("https://example.test/chime.mp3".to_string());
        assert_eq!(cache.state(), SoundState::Unloaded);
        assert!(cache.bytes().is_none());
    }

    #[test]
    fn loading_happens_at_most_once() {
        let cache = SoundCache::new("https://example.test/chime.mp3".to_string());
        assert!(cache.begin_loading());
        assert_eq!(cache.state(), SoundState::Loading);
        assert!(!cache.begin_loading());
    }

    #[test]
    fn a_successful_fetch_becomes_ready_and_serves_bytes() {
        let cache = SoundCache::new("https://example.test/chime.mp3".to_string());
        cache.begin_loading();
        cache.finish(Some(Bytes::from_static(b"ding")));
        assert_eq!(cache.state(), SoundState::Ready);
        assert_eq!(cache.bytes(), Some(Bytes::from_static(b"ding")));
        // Once ready the asset never reloads.
        assert!(!cache.begin_loading());
    }

    #[test]
    fn a_failed_fetch_falls_back_to_unloaded() {
        let cache = SoundCache::new("https://example.test/chime.mp3".to_string());
        cache.begin_loading();
        cache.finish(None);
        assert_eq!(cache.state(), SoundState::Unloaded);
        assert!(cache.bytes().is_none());
    }

    #[test]
    fn bytes_stay_hidden_while_loading() {
        let cache = SoundCache::new("https://example.test/chime.mp3".to_string());
        cache.begin_loading();
        assert!(cache.bytes().is_none());
    }
}
