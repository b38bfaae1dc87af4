//! qBittorrent torrent client implementation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::{
    extract_hash_from_magnet, AddTorrentRequest, ClientTorrent, ClientTorrentState, TorrentClient,
    TorrentClientError,
};

/// How often the add-wait loop polls the torrent list.
const HASH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// qBittorrent WebUI client.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Session marker (refreshed on auth failure); the cookie jar holds the
    /// actual SID cookie.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else if e.is_connect() {
                    TorrentClientError::ConnectionFailed(e.to_string())
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    async fn clear_session(&self) {
        let mut session = self.session.write().await;
        *session = None;
    }

    /// Make an authenticated GET request, re-authenticating once on 403.
    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TorrentClientError::Timeout
            } else {
                TorrentClientError::ApiError(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            self.clear_session().await;
            self.login().await?;

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(TorrentClientError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    /// Make an authenticated POST request with form data.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            self.clear_session().await;
            self.login().await?;

            let response = self
                .client
                .post(&url)
                .form(params)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(TorrentClientError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    /// Make an authenticated POST request with multipart data.
    async fn post_multipart(
        &self,
        endpoint: &str,
        form: multipart::Form,
    ) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    async fn current_hashes(&self) -> Result<HashSet<String>, TorrentClientError> {
        Ok(self
            .list_torrents()
            .await?
            .into_iter()
            .map(|t| t.hash)
            .collect())
    }
}

/// qBittorrent torrent info response (subset).
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
}

impl QBTorrentInfo {
    fn into_client_torrent(self) -> ClientTorrent {
        ClientTorrent {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: parse_qb_state(&self.state),
            progress: self.progress,
        }
    }
}

/// Parse qBittorrent state string to ClientTorrentState.
fn parse_qb_state(state: &str) -> ClientTorrentState {
    match state {
        "downloading" | "forcedDL" | "metaDL" | "allocating" => ClientTorrentState::Downloading,
        "uploading" | "forcedUP" => ClientTorrentState::Seeding,
        "pausedDL" | "pausedUP" | "stoppedDL" | "stoppedUP" => ClientTorrentState::Paused,
        "checkingDL" | "checkingUP" | "checkingResumeData" | "moving" => {
            ClientTorrentState::Checking
        }
        "queuedDL" | "queuedUP" => ClientTorrentState::Queued,
        "stalledDL" | "stalledUP" => ClientTorrentState::Stalled,
        "error" | "missingFiles" => ClientTorrentState::Error,
        _ => ClientTorrentState::Unknown,
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn add_torrent_and_get_hash(
        &self,
        request: AddTorrentRequest,
        timeout: Duration,
    ) -> Result<Option<String>, TorrentClientError> {
        // Magnet links carry their own hash; no need to diff the list.
        let expected_hash = extract_hash_from_magnet(&request.uri);
        let before = if expected_hash.is_none() {
            self.current_hashes().await?
        } else {
            HashSet::new()
        };

        let mut form = multipart::Form::new().text("urls", request.uri.clone());
        if let Some(path) = self.config.download_path.as_ref() {
            form = form.text("savepath", path.clone());
        }
        if let Some(cat) = request.category {
            form = form.text("category", cat);
        }
        if request.paused {
            form = form.text("paused", "true");
        }

        self.post_multipart("/api/v2/torrents/add", form).await?;

        // Bounded wait for the client to acknowledge the torrent.
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let hashes = self.current_hashes().await?;
            match &expected_hash {
                Some(h) if hashes.contains(h) => return Ok(Some(h.clone())),
                None => {
                    if let Some(new_hash) = hashes.difference(&before).next() {
                        return Ok(Some(new_hash.clone()));
                    }
                }
                _ => {}
            }

            if tokio::time::Instant::now() >= deadline {
                debug!(uri = %request.uri, "Torrent hash did not appear within wait window");
                return Ok(None);
            }
            tokio::time::sleep(HASH_POLL_INTERVAL).await;
        }
    }

    async fn list_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        let response = self.get("/api/v2/torrents/info").await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(torrents.into_iter().map(|t| t.into_client_torrent()).collect())
    }

    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.post_form("/api/v2/torrents/pause", &[("hashes", hash)])
            .await?;
        Ok(())
    }

    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.post_form("/api/v2/torrents/resume", &[("hashes", hash)])
            .await?;
        Ok(())
    }

    async fn remove_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.post_form(
            "/api/v2/torrents/delete",
            &[
                ("hashes", hash),
                ("deleteFiles", if delete_files { "true" } else { "false" }),
            ],
        )
        .await?;
        Ok(())
    }
}
