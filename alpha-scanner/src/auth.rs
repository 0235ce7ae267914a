//! Google service-account authentication
//!
//! Uses RS256 (RSASSA-PKCS1-v1_5 with SHA-256) for JWT signing.
//! The signed assertion is exchanged at the credential's `token_uri` for a
//! short-lived bearer token, which is reused until shortly before expiry.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::error::{Result, ScanError};

/// Read-only access to sheets and to the drive listing used to find them
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets.readonly https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime; Google caps it at one hour
const ASSERTION_SECONDS: i64 = 3600;

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// Fields of the service-account key file we use
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// JWT claims for the token exchange
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    /// Issuer (service-account email)
    iss: String,

    /// Space-separated scopes
    scope: String,

    /// Audience (token endpoint)
    aud: String,

    /// Issued at (Unix timestamp)
    iat: i64,

    /// Expiration (Unix timestamp)
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_SECONDS
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Service-account authentication handler
pub struct ServiceAccountAuth {
    client_email: String,
    private_key_id: Option<String>,
    token_uri: String,

    /// RSA signing key
    signing_key: SigningKey<Sha256>,

    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuth {
    /// Create auth handler from the credential bundle
    pub fn from_credentials(credentials: &Credentials, http: reqwest::Client) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(credentials.as_str())
            .map_err(|e| ScanError::Auth(format!("Credential bundle is not a service-account key: {e}")))?;

        Self::new(
            key.client_email,
            &key.private_key,
            key.private_key_id,
            key.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            http,
        )
    }

    /// Create new auth handler
    pub fn new(
        client_email: String,
        private_key_pem: &str,
        private_key_id: Option<String>,
        token_uri: String,
        http: reqwest::Client,
    ) -> Result<Self> {
        // Handle escaped newlines (from environment variables)
        let pem = private_key_pem.replace("\\n", "\n");

        // Service-account keys are PKCS#8; accept PKCS#1 as well
        let private_key = if pem.contains("BEGIN PRIVATE KEY") {
            RsaPrivateKey::from_pkcs8_pem(&pem)
                .map_err(|e| ScanError::Auth(format!("Failed to parse PKCS#8 key: {e}")))?
        } else if pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(&pem)
                .map_err(|e| ScanError::Auth(format!("Failed to parse PKCS#1 key: {e}")))?
        } else {
            return Err(ScanError::Auth("Unknown private key format".into()));
        };

        Ok(Self {
            client_email,
            private_key_id,
            token_uri,
            signing_key: SigningKey::<Sha256>::new(private_key),
            http,
            token: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Generate the signed assertion for a token exchange at `now`
    pub fn generate_jwt(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = JwtClaims {
            iss: self.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_SECONDS,
        };

        let mut header = serde_json::json!({
            "alg": "RS256",
            "typ": "JWT",
        });
        if let Some(kid) = &self.private_key_id {
            header["kid"] = serde_json::Value::String(kid.clone());
        }

        // Encode header and payload
        let header_b64 = Self::base64url_encode(&serde_json::to_vec(&header)?);
        let payload_b64 = Self::base64url_encode(&serde_json::to_vec(&claims)?);

        let message = format!("{header_b64}.{payload_b64}");

        // Sign the message
        let signature = self.signing_key.sign(message.as_bytes());
        let signature_b64 = Self::base64url_encode(&signature.to_bytes());

        Ok(format!("{message}.{signature_b64}"))
    }

    /// Bearer token for API calls, exchanging a new assertion when the
    /// cached one is missing or about to expire
    pub async fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.cached_token(now) {
            return Ok(token);
        }

        let assertion = self.generate_jwt(now)?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token exchange for {} failed ({}): {}", self.client_email, status, body);
            return Err(ScanError::Connection(format!("Token exchange failed ({status}): {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = token_expiry(now, token.expires_in)?;
        debug!("Obtained access token valid until {}", expires_at);

        *self.token.lock() = Some(AccessToken {
            token: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }

    fn cached_token(&self, now: DateTime<Utc>) -> Option<String> {
        self.token
            .lock()
            .as_ref()
            .filter(|t| now + Duration::seconds(REFRESH_MARGIN_SECONDS) < t.expires_at)
            .map(|t| t.token.clone())
    }

    /// `Base64URL` encode (no padding, URL-safe characters)
    fn base64url_encode(data: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(data)
    }
}

/// When a token issued at `now` with lifetime `expires_in` seconds expires
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| ScanError::Connection(format!("Token endpoint returned expires_in {expires_in}")))
}
