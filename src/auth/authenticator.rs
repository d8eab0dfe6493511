use chrono::Utc;
use moka::sync::Cache;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{color_for, Identity, SyncError};
use crate::services::auth_service::validate_jwt;

/// Turns a credential into an [`Identity`].
///
/// Issuing credentials is the auth service's business; the engine only
/// needs to check them.
pub trait Authenticator: Send + Sync {
    fn verify(&self, credential: &str) -> Result<Identity, SyncError>;

    /// Verify a credential presented together with a username.
    fn authenticate(&self, username: &str, credential: &str) -> Result<Identity, SyncError> {
        let identity = self.verify(credential)?;
        if identity.username != username {
            warn!("Credential of '{}' presented by '{}'", identity.username, username);
            return Err(SyncError::Unauthorized(format!(
                "credential does not belong to '{}'",
                username
            )));
        }
        Ok(identity)
    }

    /// Number of identities currently cached.
    fn cached_identities(&self) -> u64 {
        0
    }
}

/// An identity validated earlier, good until the token's `exp`.
#[derive(Clone)]
struct CachedIdentity {
    identity: Identity,
    exp: u64,
}

/// Validates HS256 tokens and keeps recently seen identities around.
pub struct JwtAuthenticator {
    secret: String,
    cache: Cache<String, CachedIdentity>,
}

impl JwtAuthenticator {
    pub fn new(secret: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(cache_ttl)
                .build(),
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn verify(&self, credential: &str) -> Result<Identity, SyncError> {
        if credential.is_empty() {
            return Err(SyncError::Unauthorized("missing credential".to_string()));
        }
        if let Some(cached) = self.cache.get(credential) {
            if cached.exp > Utc::now().timestamp() as u64 {
                return Ok(cached.identity);
            }
            debug!("Cached identity of '{}' expired", cached.identity.username);
            self.cache.invalidate(credential);
        }

        let token_data = validate_jwt(credential, &self.secret).map_err(|e| {
            debug!("JWT validation failed: {}", e);
            SyncError::Unauthorized(e.to_string())
        })?;
        let claims = token_data.claims;
        if claims.token_type != "user" {
            return Err(SyncError::Unauthorized(format!("invalid token type: {}", claims.token_type)));
        }

        let color = claims.color.unwrap_or_else(|| color_for(&claims.sub));
        let identity = Identity::new(claims.sub, credential, color);
        self.cache.insert(
            credential.to_string(),
            CachedIdentity { identity: identity.clone(), exp: claims.exp },
        );
        Ok(identity)
    }

    fn cached_identities(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::{issue_token, TokenClaims};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn authenticator() -> JwtAuthenticator {
        JwtAuthenticator::new("secret", Duration::from_secs(60))
    }

    #[test]
    fn token_color_is_used_when_present() {
        let token = issue_token("secret", "alice", Some("#123456"), 60).unwrap();
        let identity = authenticator().authenticate("alice", &token).unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.color, "#123456");
        assert_eq!(identity.token, token);
    }

    #[test]
    fn color_is_derived_when_missing() {
        let token = issue_token("secret", "bob", None, 60).unwrap();
        let identity = authenticator().verify(&token).unwrap();
        assert_eq!(identity.color, color_for("bob"));
    }

    #[test]
    fn bad_credentials_are_unauthorized() {
        let auth = authenticator();
        assert!(matches!(auth.verify(""), Err(SyncError::Unauthorized(_))));
        assert!(matches!(auth.verify("not-a-jwt"), Err(SyncError::Unauthorized(_))));

        let foreign = issue_token("other-secret", "alice", None, 60).unwrap();
        assert!(matches!(auth.verify(&foreign), Err(SyncError::Unauthorized(_))));
    }

    #[test]
    fn username_must_match_the_subject() {
        let token = issue_token("secret", "alice", None, 60).unwrap();
        assert!(matches!(
            authenticator().authenticate("mallory", &token),
            Err(SyncError::Unauthorized(_))
        ));
    }

    #[test]
    fn validated_identities_are_cached() {
        let auth = authenticator();
        let token = issue_token("secret", "alice", None, 60).unwrap();
        auth.verify(&token).unwrap();
        auth.verify(&token).unwrap();
        auth.cache.run_pending_tasks();
        assert_eq!(auth.cached_identities(), 1);
    }

    #[test]
    fn cached_identity_does_not_outlive_its_token() {
        let auth = authenticator();
        let exp = Utc::now().timestamp() as u64 - 120;
        let claims = TokenClaims {
            sub: "alice".to_string(),
            color: None,
            token_type: "user".to_string(),
            exp,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap();

        // Cached while the token was still valid
        auth.cache.insert(
            token.clone(),
            CachedIdentity { identity: Identity::new("alice", &token, color_for("alice")), exp },
        );

        assert!(matches!(auth.verify(&token), Err(SyncError::Unauthorized(_))));
        assert!(auth.cache.get(&token).is_none());
    }
}
