//! JWT Token Handler
//! Mission: Issue and validate signed access/refresh tokens

use crate::auth::models::{Claims, TokenKind, TokenResponse};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// JWT handler for token operations.
///
/// Holds the process-wide signing secret and the per-kind lifetimes.
/// Tokens are stateless: nothing is persisted server-side, and the only
/// early-invalidation mechanism is deleting the account the subject
/// points at (the middleware re-resolves the account on every request).
pub struct JwtHandler {
    secret: String,
    access_expire_minutes: i64,
    refresh_expire_minutes: i64,
}

impl JwtHandler {
    pub fn new(secret: String, access_expire_minutes: i64, refresh_expire_minutes: i64) -> Self {
        Self {
            secret,
            access_expire_minutes,
            refresh_expire_minutes,
        }
    }

    fn ttl_minutes(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_expire_minutes,
            TokenKind::Refresh => self.refresh_expire_minutes,
        }
    }

    /// Sign a token of the given kind for an account.
    ///
    /// The issuance instant is embedded, so tokens minted at different
    /// instants (or with different lifetimes) are never byte-identical.
    pub fn issue(&self, user_id: i64, kind: TokenKind) -> Result<(String, Claims)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(Duration::minutes(self.ttl_minutes(kind)))
            .context("Invalid expiry timestamp")?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            kind,
        };

        debug!(
            "Issuing {:?} token for account {}, expires in {}m",
            kind,
            user_id,
            self.ttl_minutes(kind)
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign token")?;

        Ok((token, claims))
    }

    /// Issue the access + refresh pair handed out at login and on refresh.
    pub fn issue_pair(&self, user_id: i64) -> Result<TokenResponse> {
        let (access_token, access_claims) = self.issue(user_id, TokenKind::Access)?;
        let (refresh_token, _) = self.issue(user_id, TokenKind::Refresh)?;

        let issued_at = DateTime::from_timestamp(access_claims.iat, 0)
            .ok_or_else(|| anyhow!("Invalid issued-at timestamp"))?;
        let expires_at = DateTime::from_timestamp(access_claims.exp, 0)
            .ok_or_else(|| anyhow!("Invalid expiry timestamp"))?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: access_claims.exp - access_claims.iat,
            expires_at,
            issued_at,
            scope: String::new(),
            user_id,
        })
    }

    /// Validate signature and expiry, returning the embedded claims.
    ///
    /// No leeway: a token is rejected from the instant of expiry onward.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }

    /// Validate a token and additionally require it to be of `kind`.
    pub fn validate_kind(&self, token: &str, kind: TokenKind) -> Result<Claims> {
        let claims = self.validate(token)?;
        if claims.kind != kind {
            return Err(anyhow!("Wrong token kind"));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> JwtHandler {
        JwtHandler::new("test-secret-key-12345".to_string(), 300, 10080)
    }

    #[test]
    fn test_issue_and_validate() {
        let handler = handler();

        let (token, claims) = handler.issue(7, TokenKind::Access).unwrap();
        assert!(!token.is_empty());
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.exp - claims.iat, 300 * 60);

        let decoded = handler.validate(&token).unwrap();
        assert_eq!(decoded.user_id(), Some(7));
        assert_eq!(decoded.kind, TokenKind::Access);
    }

    #[test]
    fn test_pair_has_distinct_tokens_and_lifetimes() {
        let handler = handler();
        let pair = handler.issue_pair(3).unwrap();

        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 300 * 60);
        assert!(pair.expires_at > pair.issued_at);

        let access = handler.validate(&pair.access_token).unwrap();
        let refresh = handler.validate(&pair.refresh_token).unwrap();
        assert_eq!(access.kind, TokenKind::Access);
        assert_eq!(refresh.kind, TokenKind::Refresh);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_malformed_token_rejected() {
        let handler = handler();
        assert!(handler.validate("not.a.token").is_err());
        assert!(handler.validate("").is_err());
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = JwtHandler::new("secret1".to_string(), 300, 10080);
        let handler2 = JwtHandler::new("secret2".to_string(), 300, 10080);

        let (token, _) = handler1.issue(1, TokenKind::Access).unwrap();
        assert!(handler2.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Negative ttl puts the expiry in the past; with zero leeway the
        // token must already be invalid.
        let expired = JwtHandler::new("test-secret".to_string(), -5, 10080);
        let (token, _) = expired.issue(1, TokenKind::Access).unwrap();
        assert!(expired.validate(&token).is_err());
    }

    #[test]
    fn test_kind_enforcement() {
        let handler = handler();
        let pair = handler.issue_pair(9).unwrap();

        // The refresh endpoint must not accept an access token
        assert!(handler
            .validate_kind(&pair.access_token, TokenKind::Refresh)
            .is_err());
        assert!(handler
            .validate_kind(&pair.refresh_token, TokenKind::Refresh)
            .is_ok());
    }
}
