//! Token settings and the token handler.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{TokenError, MIN_KEY_BITS};

/// Number of random bytes in a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Signing key, issuer and audience used for access tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSettings {
    /// Symmetric signing key; its UTF-8 bytes are the HMAC key.
    pub security_key: String,

    /// Value of the `iss` claim.
    pub issuer: String,

    /// Value of the `aud` claim.
    pub audience: String,

    /// Access token lifetime in hours.
    pub access_token_lifetime_hours: i64,
}

/// Access token lifetime used when none is configured, in hours.
pub const DEFAULT_ACCESS_TOKEN_LIFETIME_HOURS: i64 = 8;

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            security_key: String::new(),
            issuer: String::new(),
            audience: String::new(),
            access_token_lifetime_hours: DEFAULT_ACCESS_TOKEN_LIFETIME_HOURS,
        }
    }
}

// The key never reaches logs.
impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("security_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_lifetime_hours", &self.access_token_lifetime_hours)
            .finish()
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Not before, seconds since the Unix epoch.
    pub nbf: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// An issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Signed JWT.
    pub access_token: String,
    /// Opaque random refresh token.
    pub refresh_token: String,
    /// When the access token expires.
    pub expiration: DateTime<Utc>,
}

/// Issues access and refresh tokens from a fixed set of [`TokenSettings`].
pub struct TokenHandler {
    issuer: String,
    audience: String,
    lifetime: Duration,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for TokenHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHandler")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenHandler {
    /// Builds a handler, checking the key and lifetime up front.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingKey`] if the key is empty,
    /// [`TokenError::KeyTooShort`] if it is under [`MIN_KEY_BITS`], and
    /// [`TokenError::InvalidLifetime`] if the lifetime is not a positive
    /// number of hours.
    pub fn new(settings: &TokenSettings) -> Result<Self, TokenError> {
        let key = settings.security_key.as_bytes();
        if key.is_empty() {
            return Err(TokenError::MissingKey);
        }
        let bits = key.len() * 8;
        if bits < MIN_KEY_BITS {
            return Err(TokenError::KeyTooShort { bits });
        }

        let hours = settings.access_token_lifetime_hours;
        let lifetime = Duration::try_hours(hours)
            .filter(|lifetime| *lifetime > Duration::zero())
            .ok_or(TokenError::InvalidLifetime(hours))?;

        Ok(Self {
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            lifetime,
            encoding_key: EncodingKey::from_secret(key),
        })
    }

    /// Creates a signed access token valid from now for the configured
    /// lifetime, paired with a fresh refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if JWT encoding fails.
    pub fn create_access_token(&self) -> Result<Token, TokenError> {
        self.create_access_token_at(Utc::now())
    }

    fn create_access_token_at(&self, now: DateTime<Utc>) -> Result<Token, TokenError> {
        let expiration = now
            .checked_add_signed(self.lifetime)
            .ok_or(TokenError::InvalidLifetime(self.lifetime.num_hours()))?;
        let claims = AccessClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            nbf: now.timestamp(),
            exp: expiration.timestamp(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        tracing::debug!(issuer = %self.issuer, %expiration, "issued access token");

        Ok(Token {
            access_token,
            refresh_token: Self::create_refresh_token(),
            expiration,
        })
    }

    /// Creates an opaque refresh token: [`REFRESH_TOKEN_BYTES`] random bytes,
    /// standard base64 encoded.
    pub fn create_refresh_token() -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }
}
