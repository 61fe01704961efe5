mod models;

pub use models::*;

use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("User not found or code is incorrect.")]
    NotFound,
    #[error("Could not reach the participant service. Please try again.")]
    Transport(#[source] reqwest::Error),
    #[error("Could not reach the participant service. Please try again.")]
    Status(StatusCode),
    #[error("Could not reach the participant service. Please try again.")]
    Malformed(#[source] reqwest::Error),
}

struct CachedRecord {
    participant: Participant,
    fetched_at: Instant,
}

/// Client for the participant API with a small per-code record cache.
pub struct ParticipantDirectory {
    client: Client,
    base_url: String,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedRecord>>,
}

impl ParticipantDirectory {
    pub fn new(client: Client, base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached(&self, code: &str) -> Option<Participant> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(code)?;
        if entry.participant.unique_code != code || entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.participant.clone())
    }

    /// Looks a participant up by code, reusing a fresh cached record when present.
    pub async fn find(&self, code: &str) -> Result<Participant, LookupError> {
        if let Some(participant) = self.cached(code) {
            debug!("Participant cache hit for {}", code);
            return Ok(participant);
        }

        let participant = self.fetch(code).await?;
        if let Ok(mut cache) = self.cache.write() {
            cache.retain(|_, entry| entry.fetched_at.elapsed() <= self.ttl);
            cache.insert(
                code.to_string(),
                CachedRecord {
                    participant: participant.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(participant)
    }

    async fn fetch(&self, code: &str) -> Result<Participant, LookupError> {
        let url = format!("{}/api/user/{}", self.base_url, code);
        info!("Looking up participant {}", code);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(LookupError::Transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !status.is_success() {
            warn!("Participant API answered {} for {}", status, code);
            return Err(LookupError::Status(status));
        }

        let body: LookupResponse = response.json().await.map_err(LookupError::Malformed)?;
        Ok(body.into_participant())
    }
}
