//! Access and refresh token issuance for the deppo backend.
//!
//! Access tokens are HS256-signed JWTs carrying issuer, audience, not-before
//! and expiry claims. Refresh tokens are 32 random bytes from the operating
//! system CSPRNG, base64 encoded. This crate only issues tokens; it does not
//! validate, refresh or revoke them.

mod handler;

pub use handler::{
    AccessClaims, Token, TokenHandler, TokenSettings, DEFAULT_ACCESS_TOKEN_LIFETIME_HOURS,
    REFRESH_TOKEN_BYTES,
};

use thiserror::Error;

/// Smallest accepted signing key, in bits.
pub const MIN_KEY_BITS: usize = 128;

/// Errors produced while issuing tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No signing key was configured.
    #[error("token security key is not configured")]
    MissingKey,
    /// The signing key is shorter than [`MIN_KEY_BITS`].
    #[error("token security key must be at least 128 bits, got {bits}")]
    KeyTooShort {
        /// Size of the configured key in bits.
        bits: usize,
    },
    /// The access token lifetime is zero, negative or out of range.
    #[error("access token lifetime must be a positive number of hours, got {0}")]
    InvalidLifetime(i64),
    /// JWT encoding failed.
    #[error("failed to sign access token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
