//! Session resolution: identity token in, application user out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use sea_orm::Set;
use serde::Deserialize;
use talentvote_common::{AppError, AppResult, IdGenerator};
use talentvote_db::{
    entities::user::{self, UserRole},
    repositories::UserRepository,
};
use tokio::sync::RwLock;

use super::gateway::http_client;

/// Google's published signing keys for Firebase ID tokens.
const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// How long fetched signing keys are trusted before refetching.
const JWKS_TTL: Duration = Duration::from_secs(3600);

/// Unknown key IDs refetch at most this often.
const JWKS_MIN_REFRESH: Duration = Duration::from_secs(60);

const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
}

/// Verifies identity-provider tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a bearer token and return its claims.
    ///
    /// Any invalid, expired or foreign token is `Unauthorized`.
    async fn verify(&self, token: &str) -> AppResult<IdentityClaims>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: Option<String>,
}

/// Firebase ID token verifier (RS256 against Google's JWKs).
pub struct FirebaseIdentityVerifier {
    project_id: String,
    http: reqwest::Client,
    keys: RwLock<Option<(JwkSet, Instant)>>,
}

impl FirebaseIdentityVerifier {
    /// Create a verifier for tokens issued to `project_id`.
    pub fn new(project_id: String) -> AppResult<Self> {
        Ok(Self {
            project_id,
            http: http_client(JWKS_FETCH_TIMEOUT, Duration::from_secs(5))?,
            keys: RwLock::new(None),
        })
    }

    /// Cached keys, refetched once older than the TTL. A forced refresh only
    /// refetches keys older than `JWKS_MIN_REFRESH`.
    async fn signing_keys(&self, force_refresh: bool) -> AppResult<JwkSet> {
        {
            let max_age = if force_refresh {
                JWKS_MIN_REFRESH
            } else {
                JWKS_TTL
            };
            let cached = self.keys.read().await;
            if let Some((set, fetched_at)) = cached.as_ref()
                && fetched_at.elapsed() < max_age
            {
                return Ok(set.clone());
            }
        }

        let set: JwkSet = self
            .http
            .get(FIREBASE_JWKS_URL)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Identity keys fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::ExternalService(format!("Identity keys fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Identity keys malformed: {e}")))?;

        *self.keys.write().await = Some((set.clone(), Instant::now()));
        tracing::debug!(keys = set.keys.len(), "Refreshed identity signing keys");
        Ok(set)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseIdentityVerifier {
    async fn verify(&self, token: &str) -> AppResult<IdentityClaims> {
        let header = decode_header(token).map_err(|_| AppError::Unauthorized)?;
        let kid = header.kid.ok_or(AppError::Unauthorized)?;

        let mut keys = self.signing_keys(false).await?;
        if keys.find(&kid).is_none() {
            // Google rotates keys; an unknown kid may just mean a stale cache
            keys = self.signing_keys(true).await?;
        }
        let jwk = keys.find(&kid).ok_or(AppError::Unauthorized)?;
        let key = DecodingKey::from_jwk(jwk).map_err(|_| AppError::Unauthorized)?;

        let data = decode::<FirebaseClaims>(token, &key, &self.validation()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected identity token");
            AppError::Unauthorized
        })?;

        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthorized);
        }

        Ok(IdentityClaims {
            uid: data.claims.sub,
            email: data.claims.email,
            email_verified: data.claims.email_verified,
            name: data.claims.name,
        })
    }
}

/// Resolves identity tokens to application users.
#[derive(Clone)]
pub struct SessionService {
    verifier: Arc<dyn IdentityVerifier>,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl SessionService {
    /// Create a new session service.
    #[must_use]
    pub fn new(verifier: Arc<dyn IdentityVerifier>, user_repo: UserRepository) -> Self {
        Self {
            verifier,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Verify a token and return its user, creating the user on first sight.
    pub async fn resolve(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.verifier.verify(token).await?;

        if let Some(existing) = self.user_repo.find_by_firebase_uid(&claims.uid).await? {
            return self
                .user_repo
                .touch(existing, claims.email, claims.email_verified, claims.name)
                .await;
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            firebase_uid: Set(claims.uid.clone()),
            email: Set(claims.email),
            email_verified: Set(claims.email_verified),
            display_name: Set(claims.name),
            role: Set(UserRole::Voter),
            created_at: Set(now.into()),
            last_seen_at: Set(now.into()),
        };

        match self.user_repo.create(model).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Created user on first sign-in");
                Ok(user)
            }
            Err(e) => {
                // Two first requests for the same account race on the unique uid
                match self.user_repo.find_by_firebase_uid(&claims.uid).await? {
                    Some(user) => Ok(user),
                    None => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{StaticVerifier, test_user};
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_resolve_creates_user_on_first_sight() {
        let created = test_user("u1", UserRole::Voter);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created.clone()]])
                .into_connection(),
        );

        let service = SessionService::new(
            Arc::new(StaticVerifier::accepting("fb-u1")),
            UserRepository::new(db),
        );
        let user = service.resolve("good-token").await.unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.role, UserRole::Voter);
    }

    #[tokio::test]
    async fn test_resolve_existing_user_is_touched() {
        let existing = test_user("u1", UserRole::Host);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing.clone()]])
                .append_query_results([[existing.clone()]])
                .into_connection(),
        );

        let service = SessionService::new(
            Arc::new(StaticVerifier::accepting("fb-u1")),
            UserRepository::new(db),
        );
        let user = service.resolve("good-token").await.unwrap();

        assert_eq!(user.role, UserRole::Host);
    }

    #[tokio::test]
    async fn test_forced_refresh_reuses_recent_keys() {
        let verifier = FirebaseIdentityVerifier::new("talentvote-test".to_string()).unwrap();
        let cached: JwkSet = serde_json::from_str(r#"{"keys":[]}"#).unwrap();
        *verifier.keys.write().await = Some((cached, Instant::now()));

        // Served from the cache, so no request leaves the process
        let keys = verifier.signing_keys(true).await.unwrap();

        assert!(keys.keys.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_rejected_token() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = SessionService::new(
            Arc::new(StaticVerifier::rejecting()),
            UserRepository::new(db),
        );

        assert!(matches!(
            service.resolve("bad-token").await,
            Err(AppError::Unauthorized)
        ));
    }
}
