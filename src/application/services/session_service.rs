//! Anonymous sessions backed by signed bearer tokens.
//!
//! A token is `base64url(claims) "." hex(hmac_sha256(secret, base64url(claims)))`
//! where the claims are `{"sub": <user id>, "iss": ..., "exp": <unix seconds>}`.
//! Tokens carry identity only; the user must still exist in the store.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::entities::User;
use crate::domain::repositories::{Store, StoreError};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Value of the `iss` claim.
pub const TOKEN_ISSUER: &str = "url-shortener";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
    /// True when the user was registered by this call.
    pub registered: bool,
}

/// Issues and validates session tokens, registering users on demand.
pub struct SessionService<S: Store + ?Sized> {
    store: Arc<S>,
    secret: String,
    token_ttl: Duration,
}

impl<S: Store + ?Sized> SessionService<S> {
    /// Creates a new session service.
    ///
    /// # Arguments
    ///
    /// - `store` - where users are registered and looked up
    /// - `secret` - HMAC key; tokens signed with another key are rejected
    /// - `token_ttl` - lifetime of issued tokens
    pub fn new(store: Arc<S>, secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            store,
            secret: secret.into(),
            token_ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::internal("Invalid signing key", json!({ "reason": e.to_string() })))
    }

    /// Signs a token for `user_id` valid for the configured lifetime.
    pub fn issue_token(&self, user_id: &str) -> Result<String, AppError> {
        let exp = i64::try_from(self.token_ttl.as_secs())
            .ok()
            .and_then(|ttl| Utc::now().timestamp().checked_add(ttl))
            .ok_or_else(|| {
                AppError::internal(
                    "Token lifetime out of range",
                    json!({ "ttl_secs": self.token_ttl.as_secs() }),
                )
            })?;

        let claims = Claims {
            sub: user_id.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            exp,
        };

        let payload = serde_json::to_vec(&claims)
            .map_err(|e| AppError::internal("Failed to encode token", json!({ "reason": e.to_string() })))?;
        let payload = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac().map_err(|_| TokenError::BadSignature)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

        if claims.iss != TOKEN_ISSUER || claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Registers a fresh anonymous user and issues its token.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the user cannot be stored.
    pub async fn register(&self) -> Result<Session, AppError> {
        let user = User::new();
        self.store.create_user(user.clone()).await?;
        let token = self.issue_token(&user.id)?;

        info!(user_id = %user.id, "User registered");

        Ok(Session {
            user,
            token,
            registered: true,
        })
    }

    /// Validates `token` and loads its user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token is malformed, forged
    /// or expired, or names a user the store does not know.
    ///
    /// Returns [`AppError::Internal`] on storage failure.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let claims = self.verify_token(token).map_err(|e| {
            debug!(reason = %e, "Token rejected");
            AppError::unauthorized("Unauthorized", json!({ "reason": e.to_string() }))
        })?;

        self.load_user(&claims.sub).await
    }

    /// Resolves the caller, registering a new user when no usable token is
    /// presented.
    ///
    /// A missing or invalid token yields a new user. A valid token for a
    /// user the store does not know is rejected rather than replaced.
    ///
    /// # Errors
    ///
    /// See [`Self::authenticate`].
    pub async fn authenticate_or_register(
        &self,
        token: Option<&str>,
    ) -> Result<Session, AppError> {
        let claims = match token.map(|t| self.verify_token(t)) {
            Some(Ok(claims)) => claims,
            Some(Err(e)) => {
                debug!(reason = %e, "Token rejected, registering new user");
                return self.register().await;
            }
            None => return self.register().await,
        };

        let user = self.load_user(&claims.sub).await?;

        Ok(Session {
            user,
            token: token.unwrap_or_default().trim().to_string(),
            registered: false,
        })
    }

    async fn load_user(&self, user_id: &str) -> Result<User, AppError> {
        match self.store.get_user(user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::UserNotFound(_)) => Err(AppError::unauthorized(
                "Unauthorized",
                json!({ "reason": "Unknown user" }),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
