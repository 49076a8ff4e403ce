//! Service-account authentication for the spreadsheet API.
//!
//! Implements the OAuth 2.0 JWT-bearer grant: sign a short-lived RS256
//! assertion with the service account's private key and trade it at the
//! token endpoint for a bearer access token.

use crate::error::CredentialsError;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Read/write access to spreadsheets, nothing else
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Maximum lifetime the token endpoint accepts
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The parts of a service-account JSON key we need
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a service-account JSON payload
    pub fn from_json(payload: &str) -> Result<Self, CredentialsError> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign the JWT assertion for `key`, issued at `issued_at` (unix seconds)
pub fn signed_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, CredentialsError> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: SPREADSHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &encoding_key,
    )?)
}

/// Bearer token for API calls
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Value for the `Authorization` header
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange a freshly signed assertion for an access token.
///
/// # Errors
///
/// [`CredentialsError::Signing`] if the private key is unusable,
/// [`CredentialsError::TokenExchange`] if the endpoint is unreachable or
/// rejects the assertion.
pub fn fetch_access_token(
    agent: &ureq::Agent,
    key: &ServiceAccountKey,
) -> Result<AccessToken, CredentialsError> {
    let assertion = signed_assertion(key, Utc::now().timestamp())?;

    let response = agent
        .post(&key.token_uri)
        .send_form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .map_err(|e| CredentialsError::TokenExchange(e.to_string()))?;
    let token: TokenResponse = response
        .into_json()
        .map_err(|e| CredentialsError::TokenExchange(e.to_string()))?;

    debug!(client_email = %key.client_email, "Obtained spreadsheet access token");
    Ok(AccessToken(token.access_token))
}
