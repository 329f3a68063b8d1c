//! OAuth code exchange against the identity provider

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Timeout applied to every identity provider request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const EXCHANGE_TOKEN_PATH: &str = "/webdev.v1.WebDevAuthPublicService/ExchangeToken";
const GET_USER_INFO_PATH: &str = "/webdev.v1.WebDevAuthPublicService/GetUserInfo";

/// Tokens returned by a successful code exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Identity reported by the provider. `open_id` is the subject id.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub open_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub login_method: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

impl UserInfo {
    /// Provider tag stored on the user record
    pub fn provider(&self) -> Option<String> {
        self.login_method.clone().or_else(|| self.platform.clone())
    }
}

/// The identity provider as seen by the OAuth callback
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
        -> Result<TokenResponse, AppError>;

    /// Fetch the identity behind an access token
    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, AppError>;
}

/// Recover the redirect URI carried in the `state` parameter.
///
/// `state` is plain base64 of the redirect URI, not an anti-forgery nonce.
pub fn decode_state(state: &str) -> Result<String, AppError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(state.trim())
        .map_err(|_| AppError::Validation("state is not valid base64".to_string()))?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::Validation("state is not valid UTF-8".to_string()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetUserInfoRequest<'a> {
    access_token: &'a str,
}

/// Identity provider reached over HTTP
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    server_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpIdentityProvider {
    pub fn new(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            server_url: server_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.server_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("{} request failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("{} returned {}", path, status)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("{} returned invalid JSON: {}", path, e)))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppError> {
        let request = ExchangeTokenRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "authorization_code",
            code,
            redirect_uri,
        };

        self.post(EXCHANGE_TOKEN_PATH, &request).await
    }

    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, AppError> {
        self.post(GET_USER_INFO_PATH, &GetUserInfoRequest { access_token })
            .await
    }
}
