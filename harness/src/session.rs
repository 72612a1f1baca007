//! Mutable state shared by every check in one run: the authenticated
//! musician, the bearer token, and everything the run created on the
//! backend so it can be removed again afterwards.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::item_id;
use api::{
    ApiError, ApiRequest, ApiResponse, ApiResult, Credentials, Endpoint, Musician, NewSong,
    NewSongRequest, RequestStatus, RequestWaveClient, StatusUpdate,
};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    pub checkout_plan: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1_000),
            poll_attempts: 10,
            checkout_plan: "monthly".to_string(),
        }
    }
}

impl From<&HarnessConfig> for SessionOptions {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            poll_attempts: config.poll_attempts,
            checkout_plan: config.checkout_plan.clone(),
        }
    }
}

pub struct Session {
    client: RequestWaveClient,
    credentials: Credentials,
    options: SessionOptions,
    token: Option<String>,
    musician: Option<Musician>,
    created_songs: Vec<String>,
    created_requests: Vec<String>,
    created_playlists: Vec<String>,
}

impl Session {
    pub fn new(client: RequestWaveClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            options: SessionOptions::default(),
            token: None,
            musician: None,
            created_songs: Vec::new(),
            created_requests: Vec::new(),
            created_playlists: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn client(&self) -> &RequestWaveClient {
        &self.client
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub async fn authenticate(&mut self) -> ApiResult<&Musician> {
        let auth = self.client.login(&self.credentials).await?;
        let musician = auth.musician.ok_or_else(|| ApiError::missing_field("musician"))?;

        info!(
            "Session authenticated for musician {} ({})",
            musician.id,
            musician.slug.as_deref().unwrap_or("no slug")
        );

        self.token = Some(auth.token);
        Ok(self.musician.insert(musician))
    }

    pub fn token(&self) -> ApiResult<&str> {
        self.token.as_deref().ok_or(ApiError::NotAuthenticated)
    }

    pub fn musician(&self) -> ApiResult<&Musician> {
        self.musician.as_ref().ok_or(ApiError::NotAuthenticated)
    }

    pub fn musician_id(&self) -> ApiResult<&str> {
        Ok(&self.musician()?.id)
    }

    pub fn slug(&self) -> ApiResult<&str> {
        self.musician()?
            .slug
            .as_deref()
            .ok_or_else(|| ApiError::missing_field("musician.slug"))
    }

    pub fn authed(&self, request: ApiRequest) -> ApiResult<ApiRequest> {
        Ok(request.with_token(self.token()?))
    }

    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        self.client.send(request).await
    }

    pub async fn send_authed(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        self.client.send(self.authed(request)?).await
    }

    pub fn track_song(&mut self, id: impl Into<String>) {
        self.created_songs.push(id.into());
    }

    pub fn forget_song(&mut self, id: &str) {
        self.created_songs.retain(|s| s != id);
    }

    pub fn track_request(&mut self, id: impl Into<String>) {
        self.created_requests.push(id.into());
    }

    pub fn forget_request(&mut self, id: &str) {
        self.created_requests.retain(|r| r != id);
    }

    pub fn track_playlist(&mut self, id: impl Into<String>) {
        self.created_playlists.push(id.into());
    }

    pub fn forget_playlist(&mut self, id: &str) {
        self.created_playlists.retain(|p| p != id);
    }

    pub fn created_songs(&self) -> &[String] {
        &self.created_songs
    }

    pub fn created_requests(&self) -> &[String] {
        &self.created_requests
    }

    pub fn created_playlists(&self) -> &[String] {
        &self.created_playlists
    }

    pub async fn create_song(&mut self, song: &NewSong) -> HarnessResult<String> {
        let request = ApiRequest::post(Endpoint::Songs).with_body(song)?;
        let response = self.send_authed(request).await?;
        response.expect_success()?;

        let id = item_id(&response.body).ok_or_else(|| ApiError::missing_field("id"))?;
        debug!("Created song {} ({})", id, song.title);
        self.track_song(id.clone());
        Ok(id)
    }

    /// A song owned by this run, creating one on first use.
    pub async fn ensure_song(&mut self) -> HarnessResult<String> {
        if let Some(id) = self.created_songs.first() {
            return Ok(id.clone());
        }
        let song = NewSong::new(
            format!("Smoke Song {}", short_id()),
            "RequestWave Smoke",
        )
        .with_genres(&["Rock"])
        .with_moods(&["Upbeat"]);
        self.create_song(&song).await
    }

    /// Submits an audience request through the public musician page, the
    /// way a fan would: no bearer token.
    pub async fn submit_request(
        &mut self,
        song_id: &str,
        requester_name: &str,
    ) -> HarnessResult<ApiResponse> {
        let slug = self.slug()?.to_string();
        let payload = NewSongRequest {
            song_id: song_id.to_string(),
            requester_name: requester_name.to_string(),
            requester_email: format!("{}@smoke.requestwave.test", short_id()),
            dedication: Some("smoke test".to_string()),
            tip_amount: 0.0,
        };

        let request = ApiRequest::post(Endpoint::MusicianRequests(slug)).with_body(&payload)?;
        let response = self.send(request).await?;

        if response.is_success() {
            if let Some(id) = item_id(&response.body) {
                self.track_request(id);
            }
        }
        Ok(response)
    }

    /// Submits a request and insists on getting its id back.
    pub async fn submit_request_id(&mut self, requester_name: &str) -> HarnessResult<String> {
        let song_id = self.ensure_song().await?;
        let response = self.submit_request(&song_id, requester_name).await?;
        response.expect_success()?;
        item_id(&response.body).ok_or_else(|| HarnessError::Api(ApiError::missing_field("id")))
    }

    pub async fn set_request_status(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> ApiResult<ApiResponse> {
        let request = ApiRequest::put(Endpoint::RequestStatus(request_id.to_string()))
            .with_body(&StatusUpdate { status })?;
        self.send_authed(request).await
    }

    /// Archives a request and stops tracking it once the backend accepts.
    pub async fn archive_request(&mut self, request_id: &str) -> ApiResult<ApiResponse> {
        let response = self
            .set_request_status(request_id, RequestStatus::Archived)
            .await?;
        if response.is_success() {
            self.forget_request(request_id);
        }
        Ok(response)
    }

    /// Removes what this run created: requests still open are archived,
    /// playlists and songs are deleted. Returns how many of those calls
    /// failed; failures are logged, never raised.
    pub async fn cleanup(&mut self) -> usize {
        if !self.is_authenticated() {
            return 0;
        }

        let mut failures = 0;

        for id in std::mem::take(&mut self.created_requests) {
            failures += self.archive_quietly(&id).await;
        }
        for id in std::mem::take(&mut self.created_playlists) {
            failures += self.delete_quietly(Endpoint::Playlist(id)).await;
        }
        for id in std::mem::take(&mut self.created_songs) {
            failures += self.delete_quietly(Endpoint::Song(id)).await;
        }

        if failures > 0 {
            warn!("Cleanup left {} resources behind", failures);
        }
        failures
    }

    async fn archive_quietly(&self, request_id: &str) -> usize {
        match self
            .set_request_status(request_id, RequestStatus::Archived)
            .await
        {
            Ok(response) if response.is_success() || response.status == 404 => {
                debug!("Archived request {}", request_id);
                0
            }
            Ok(response) => {
                warn!("Archiving request {} returned {}", request_id, response.status);
                1
            }
            Err(e) => {
                warn!("Archiving request {} failed: {}", request_id, e);
                1
            }
        }
    }

    async fn delete_quietly(&self, endpoint: Endpoint) -> usize {
        let path = endpoint.path();
        match self.send_authed(ApiRequest::delete(endpoint)).await {
            Ok(response) if response.is_success() || response.status == 404 => {
                debug!("Cleaned up {}", path);
                0
            }
            Ok(response) => {
                warn!("Cleanup of {} returned {}", path, response.status);
                1
            }
            Err(e) => {
                warn!("Cleanup of {} failed: {}", path, e);
                1
            }
        }
    }
}

/// Short random tag for names and emails that must not collide between runs.
pub fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}
