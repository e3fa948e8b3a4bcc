//! Service-account authentication.
//!
//! A signed JWT assertion is exchanged at the key's token endpoint for a
//! short-lived bearer token, which is reused until shortly before it expires.

use std::fs;
use std::path::Path;
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ApiResult;
use crate::error::{ApiError, Result, SheetError};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file that matter here
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            SheetError::Configuration(format!("Failed to read credentials {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| SheetError::Configuration(format!("Invalid service account key: {}", e)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Bearer tokens for a service account, cached until near expiry
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetError::Configuration(format!("Invalid private key: {}", e)))?;
        Ok(Self {
            key,
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A valid bearer token, fetching a new one if needed
    pub async fn access_token(&self) -> ApiResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    fn assertion(&self, now: i64) -> ApiResult<String> {
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: SPREADSHEETS_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Auth(format!("Failed to sign assertion: {}", e)))
    }

    async fn fetch_token(&self) -> ApiResult<CachedToken> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                ApiError::http(status.as_u16(), body)
            } else {
                ApiError::Auth(format!("Token request rejected ({}): {}", status, body))
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("Token response: {}", e)))?;
        tracing::debug!("Obtained access token for {}", self.key.client_email);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

/// How requests to the service are authorized
pub enum Authenticator {
    ServiceAccount(ServiceAccountAuth),
    /// A token obtained elsewhere, sent as is
    BearerToken(String),
}

impl Authenticator {
    pub async fn token(&self) -> ApiResult<String> {
        match self {
            Authenticator::ServiceAccount(auth) => auth.access_token().await,
            Authenticator::BearerToken(token) => Ok(token.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const KEY_JSON: &str = include_str!("../../tests/fixtures/service-account.json");
    const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/service-account.pub.pem");

    #[test]
    fn test_key_from_json() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        assert_eq!(key.client_email, "runsheet@runsheet-test.iam.gserviceaccount.com");
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);

        let key = ServiceAccountKey::from_json(r#"{"client_email": "a@b", "private_key": "k"}"#).unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);

        assert!(matches!(
            ServiceAccountKey::from_json("{}"),
            Err(SheetError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_bad_private_key() {
        let key = ServiceAccountKey {
            client_email: "a@b".into(),
            private_key: "not a key".into(),
            token_uri: DEFAULT_TOKEN_URI.into(),
        };
        assert!(matches!(
            ServiceAccountAuth::new(key, reqwest::Client::new()),
            Err(SheetError::Configuration(_))
        ));
    }

    #[test]
    fn test_assertion_claims() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let auth = ServiceAccountAuth::new(key, reqwest::Client::new()).unwrap();

        let now = chrono::Utc::now().timestamp();
        let assertion = auth.assertion(now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[DEFAULT_TOKEN_URI]);
        let decoded = jsonwebtoken::decode::<Claims>(
            &assertion,
            &DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, auth.client_email());
        assert_eq!(decoded.claims.scope, SPREADSHEETS_SCOPE);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, ASSERTION_LIFETIME_SECS);
    }

    #[tokio::test]
    async fn test_bearer_token_passthrough() {
        let auth = Authenticator::BearerToken("ya29.token".into());
        assert_eq!(auth.token().await.unwrap(), "ya29.token");
    }
}
