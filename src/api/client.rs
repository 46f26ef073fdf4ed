use crate::error::GatewayError;
use crate::session::{IdentityApi, SessionCredential, SessionStore, UserInfo};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const CLIENT_USER_AGENT: &str = "ai.openspace.tactic/0.0.1";
pub const DEFAULT_CHUNK_SIZE: u64 = 8 * 1024 * 1024;
const EXPIRED_MESSAGE: &str = "Token expired - please login again";

/// Byte range of one chunk, rendered as a `Content-Range` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
    pub total: u64,
}

impl ContentRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn header_value(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Splits `total` bytes into consecutive ranges of at most `chunk_size`.
pub fn chunk_ranges(total: u64, chunk_size: u64) -> Vec<ContentRange> {
    let chunk_size = chunk_size.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total) - 1;
        ranges.push(ContentRange { start, end, total });
        start = end + 1;
    }
    ranges
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    api_host: String,
    token: String,
    token_type: String,
    store: Option<Arc<dyn SessionStore>>,
}

impl ApiClient {
    pub fn new(api_host: &str, token: &str, token_type: &str) -> Self {
        Self::with_client(Client::new(), api_host, token, token_type)
    }

    pub fn with_client(http: Client, api_host: &str, token: &str, token_type: &str) -> Self {
        Self {
            http,
            api_host: api_host.trim_end_matches('/').to_string(),
            token: token.to_string(),
            token_type: token_type.to_string(),
            store: None,
        }
    }

    pub fn from_credential(http: Client, credential: &SessionCredential) -> Self {
        Self::with_client(
            http,
            &credential.api_host,
            &credential.access_token,
            &credential.token_type,
        )
    }

    /// Store to clear when the API rejects the token.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_host, path)
    }

    fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.token)
    }

    pub async fn get_self(&self) -> Result<UserInfo, GatewayError> {
        let response = self
            .http
            .get(self.url("/api/self"))
            .header(AUTHORIZATION, self.authorization())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        self.decode(response).await
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: &Value,
        content_type: Option<&str>,
    ) -> Result<T, GatewayError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| GatewayError::InvalidArgument(format!("Invalid HTTP method: {}", e)))?;
        debug!(%method, path, "API request");

        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(AUTHORIZATION, self.authorization())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, content_type.unwrap_or("application/json"));
        if !body.is_null() {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        self.decode(response).await
    }

    pub async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk: Vec<u8>,
        range: ContentRange,
    ) -> Result<(), GatewayError> {
        let response = self
            .http
            .put(self.url(&format!("/api/tictac/uploads/{}", upload_id)))
            .header(AUTHORIZATION, self.authorization())
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("Content-Range", range.header_value())
            .body(chunk)
            .send()
            .await?;

        self.check_status(response.status(), || "Upload chunk failed".to_string())?;
        Ok(())
    }

    /// Uploads `data` in chunks, reporting `(bytes_uploaded, total)` after each one.
    pub async fn upload_bytes<F>(
        &self,
        upload_id: &str,
        data: &[u8],
        chunk_size: u64,
        mut on_progress: F,
    ) -> Result<(), GatewayError>
    where
        F: FnMut(u64, u64),
    {
        let total = data.len() as u64;
        for range in chunk_ranges(total, chunk_size) {
            let chunk = data[range.start as usize..=range.end as usize].to_vec();
            self.upload_chunk(upload_id, chunk, range).await?;
            on_progress(range.end + 1, total);
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, GatewayError> {
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        self.check_status(status, || format!("API error: {}", reason))?;
        Ok(response.json::<T>().await?)
    }

    fn check_status<F>(&self, status: StatusCode, message: F) -> Result<(), GatewayError>
    where
        F: FnOnce() -> String,
    {
        let result = classify_status(status, message);
        if let Err(GatewayError::Unauthorized(_)) = &result {
            warn!("API rejected the session token");
            if let Some(store) = &self.store {
                store.clear();
            }
        }
        result
    }
}

pub(crate) fn classify_status<F>(status: StatusCode, message: F) -> Result<(), GatewayError>
where
    F: FnOnce() -> String,
{
    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Unauthorized(EXPIRED_MESSAGE.to_string()));
    }
    if !status.is_success() {
        return Err(GatewayError::transport(status.as_u16(), message()));
    }
    Ok(())
}

/// [`IdentityApi`] backed by `GET /api/self`.
pub struct HttpIdentity {
    http: Client,
    store: Arc<dyn SessionStore>,
}

impl HttpIdentity {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            http: Client::new(),
            store,
        }
    }
}

#[async_trait]
impl IdentityApi for HttpIdentity {
    async fn get_self(&self, credential: &SessionCredential) -> Result<UserInfo, GatewayError> {
        ApiClient::from_credential(self.http.clone(), credential)
            .with_session_store(Arc::clone(&self.store))
            .get_self()
            .await
    }
}
