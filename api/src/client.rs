use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::{AuthResponse, Credentials};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Paths of the RequestWave REST API, kept in one place so suites never
/// format URLs by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    Health,
    Songs,
    Song(String),
    SongsBatchDelete,
    Requests,
    RequestStatus(String),
    ArchiveOldRequests,
    RequestUpdates(String),
    AnalyticsDaily,
    AnalyticsRequesters,
    Playlists,
    Playlist(String),
    PlaylistActivate(String),
    SubscriptionStatus,
    SubscriptionCheckout,
    SubscriptionCancel,
    StripeWebhook,
    Genres,
    Moods,
    MusicianProfile(String),
    MusicianSongs(String),
    MusicianRequests(String),
}

impl Endpoint {
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/api/auth/login".to_string(),
            Self::Register => "/api/auth/register".to_string(),
            Self::ForgotPassword => "/api/auth/forgot-password".to_string(),
            Self::ResetPassword => "/api/auth/reset-password".to_string(),
            Self::Health => "/api/health".to_string(),
            Self::Songs => "/api/songs".to_string(),
            Self::Song(id) => format!("/api/songs/{}", id),
            Self::SongsBatchDelete => "/api/songs/batch-delete".to_string(),
            Self::Requests => "/api/requests".to_string(),
            Self::RequestStatus(id) => format!("/api/requests/{}/status", id),
            Self::ArchiveOldRequests => "/api/requests/archive-old".to_string(),
            Self::RequestUpdates(musician_id) => {
                format!("/api/requests/updates/{}", musician_id)
            }
            Self::AnalyticsDaily => "/api/analytics/daily".to_string(),
            Self::AnalyticsRequesters => "/api/analytics/requesters".to_string(),
            Self::Playlists => "/api/playlists".to_string(),
            Self::Playlist(id) => format!("/api/playlists/{}", id),
            Self::PlaylistActivate(id) => format!("/api/playlists/{}/activate", id),
            Self::SubscriptionStatus => "/api/subscription/status".to_string(),
            Self::SubscriptionCheckout => "/api/subscription/checkout".to_string(),
            Self::SubscriptionCancel => "/api/subscription/cancel".to_string(),
            Self::StripeWebhook => "/api/stripe/webhook".to_string(),
            Self::Genres => "/api/genres".to_string(),
            Self::Moods => "/api/moods".to_string(),
            Self::MusicianProfile(slug) => format!("/api/musicians/{}", slug),
            Self::MusicianSongs(slug) => format!("/api/musicians/{}/songs", slug),
            Self::MusicianRequests(slug) => format!("/api/musicians/{}/requests", slug),
        }
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.path()
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub token: Option<String>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            token: None,
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_body<T: serde::Serialize>(self, body: &T) -> ApiResult<Self> {
        Ok(self.with_json(serde_json::to_value(body)?))
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
    pub raw: String,
    pub elapsed: Duration,
}

impl ApiResponse {
    pub fn from_parts(status: u16, raw: impl Into<String>, elapsed: Duration) -> Self {
        let raw = raw.into();
        let body = serde_json::from_str(&raw).unwrap_or(Value::Null);
        Self {
            status,
            body,
            raw,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Names from `fields` the body does not carry.
    pub fn missing_fields<'a>(&self, fields: &[&'a str]) -> Vec<&'a str> {
        fields
            .iter()
            .filter(|f| self.body.get(**f).is_none())
            .copied()
            .collect()
    }

    pub fn has_fields(&self, fields: &[&str]) -> bool {
        self.missing_fields(fields).is_empty()
    }

    /// Either the body itself or the first array found under one of `keys`.
    pub fn list(&self, keys: &[&str]) -> Option<&Vec<Value>> {
        if let Some(items) = self.body.as_array() {
            return Some(items);
        }
        keys.iter().find_map(|k| self.body.get(*k).and_then(Value::as_array))
    }

    pub fn expect_status(&self, expected: u16) -> ApiResult<&Self> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(ApiError::unexpected_status(self.status, self.raw.clone()))
        }
    }

    pub fn expect_success(&self) -> ApiResult<&Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::unexpected_status(self.status, self.raw.clone()))
        }
    }

    /// Prefers the backend's `detail`/`message`/`error` text over the raw body.
    pub fn error_message(&self) -> String {
        ["detail", "message", "error"]
            .iter()
            .find_map(|k| self.body.get(*k))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| self.raw.clone())
    }
}

pub struct RequestWaveClient {
    http_client: reqwest::Client,
    base_url: String,
    config: ClientConfig,
}

impl RequestWaveClient {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        config
            .validate()
            .map_err(|message| ApiError::InvalidConfig { message })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url,
            config,
        })
    }

    pub fn with_default_config() -> ApiResult<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Sends one request and hands back whatever status the backend chose.
    /// Only transport failures are errors.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.url_for(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self.http_client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout { url: url.clone() }
            } else if e.is_connect() {
                ApiError::Unreachable { url: url.clone() }
            } else {
                ApiError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        let raw = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout { url: url.clone() }
            } else {
                ApiError::Network(e)
            }
        })?;
        let elapsed = start.elapsed();

        debug!(
            "{} {} -> {} in {}ms",
            request.method,
            url,
            status,
            elapsed.as_millis()
        );

        Ok(ApiResponse::from_parts(status, raw, elapsed))
    }

    pub async fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        debug!("Logging in as {}", credentials.email);

        let request = ApiRequest::post(Endpoint::Login).with_body(credentials)?;
        let response = self.send(request).await?;
        response.expect_success()?;

        if response.str_field("token").is_none() && response.str_field("access_token").is_none()
        {
            return Err(ApiError::missing_field("token"));
        }

        let auth: AuthResponse = response.json()?;
        info!("Authenticated as {}", credentials.email);
        Ok(auth)
    }

    pub async fn health(&self) -> ApiResult<()> {
        debug!("Performing health check");

        match self.send(ApiRequest::get(Endpoint::Health)).await {
            Ok(response) if response.is_success() => {
                info!("Health check passed");
                Ok(())
            }
            Ok(response) => {
                error!("Health check returned {}", response.status);
                Err(ApiError::unexpected_status(response.status, response.raw))
            }
            Err(e) => {
                error!("Health check failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_for(server: &mockito::Server) -> RequestWaveClient {
        RequestWaveClient::new(ClientConfig::default().with_base_url(server.url())).unwrap()
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Login.path(), "/api/auth/login");
        assert_eq!(Endpoint::Song("s1".into()).path(), "/api/songs/s1");
        assert_eq!(
            Endpoint::RequestUpdates("m1".into()).path(),
            "/api/requests/updates/m1"
        );
        assert_eq!(
            Endpoint::MusicianRequests("ana".into()).path(),
            "/api/musicians/ana/requests"
        );
        assert_eq!(
            Endpoint::PlaylistActivate("p1".into()).path(),
            "/api/playlists/p1/activate"
        );
    }

    #[test]
    fn test_base_url_normalization() {
        let client =
            RequestWaveClient::new(ClientConfig::default().with_base_url("https://rw.example/"))
                .unwrap();
        assert_eq!(client.base_url(), "https://rw.example");
        assert_eq!(client.url_for("/api/songs"), "https://rw.example/api/songs");
        assert_eq!(client.url_for("api/songs"), "https://rw.example/api/songs");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RequestWaveClient::new(ClientConfig::default().with_base_url("localhost"));
        assert!(matches!(result, Err(ApiError::InvalidConfig { .. })));
    }

    #[test]
    fn test_response_helpers() {
        let response = ApiResponse::from_parts(
            422,
            r#"{"detail":"plan is invalid","items":[1,2]}"#,
            Duration::from_millis(5),
        );
        assert!(!response.is_success());
        assert_eq!(response.error_message(), "plan is invalid");
        assert_eq!(response.missing_fields(&["detail", "url"]), vec!["url"]);
        assert_eq!(response.list(&["items"]).map(Vec::len), Some(2));
        assert!(response.expect_status(422).is_ok());
        assert!(matches!(
            response.expect_success(),
            Err(ApiError::UnexpectedStatus { status: 422, .. })
        ));

        let html = ApiResponse::from_parts(502, "<html>bad gateway</html>", Duration::ZERO);
        assert!(html.body.is_null());
        assert_eq!(html.error_message(), "<html>bad gateway</html>");
    }

    #[tokio::test]
    async fn test_send_injects_bearer_token_and_returns_error_statuses() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/subscription/status")
            .match_header("authorization", "Bearer secret")
            .with_status(403)
            .with_body(r#"{"detail":"Pro plan required"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client
            .send(ApiRequest::get(Endpoint::SubscriptionStatus).with_token("secret"))
            .await
            .unwrap();

        assert_eq!(response.status, 403);
        assert_eq!(response.error_message(), "Pro plan required");
    }

    #[tokio::test]
    async fn test_send_posts_json_with_query() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/songs")
            .match_query(mockito::Matcher::UrlEncoded("dry_run".into(), "1".into()))
            .match_body(mockito::Matcher::Json(json!({"title": "Hey Jude"})))
            .with_status(201)
            .with_body(r#"{"id":"s1","title":"Hey Jude"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client
            .send(
                ApiRequest::post(Endpoint::Songs)
                    .with_query("dry_run", "1")
                    .with_json(json!({"title": "Hey Jude"})),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.str_field("id"), Some("s1"));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_body(r#"{"token":"t1","musician":{"id":"m1","slug":"ana"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let auth = client
            .login(&Credentials::new("ana@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(auth.token, "t1");
        assert_eq!(auth.musician.unwrap().id, "m1");
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(401)
            .with_body(r#"{"detail":"Invalid credentials"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.login(&Credentials::new("ana@example.com", "nope")).await;
        assert!(matches!(
            result,
            Err(ApiError::UnexpectedStatus { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_login_without_token_is_missing_field() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_body(r#"{"musician":{"id":"m1"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.login(&Credentials::new("ana@example.com", "pw")).await;
        assert!(matches!(result, Err(ApiError::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_health_maps_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/health")
            .with_status(503)
            .with_body("down")
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.health().await,
            Err(ApiError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let client = RequestWaveClient::new(
            ClientConfig::default()
                .with_base_url("http://127.0.0.1:9")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let result = client.send(ApiRequest::get(Endpoint::Health)).await;
        assert!(matches!(
            result,
            Err(ApiError::Unreachable { .. }) | Err(ApiError::Timeout { .. })
        ));
    }
}
