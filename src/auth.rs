//! Accounts and session tokens.
//!
//! Passwords are stored as argon2id PHC strings.  Sessions are stateless
//! HS256 JWTs whose `sub` claim is the user id; there is no revocation, so
//! logging out is purely a client concern.

use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm as ArgonAlgorithm, Argon2, Params, Version};
use axum::Router;
use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::Json;
use axum::routing::post;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    ApiError, ApiJson, AppState, AuthResponse, Clock, DataStore, DataStoreError, LoginRequest,
    RegisterRequest, User, UserId, UserProfile, normalize_email,
};

/// Default lifetime of a session token.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Largest age accepted at registration.
pub const MAX_AGE: u32 = 150;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

////////////////////////////////////////////// AuthError //////////////////////////////////////////////

/// Failures of the authentication service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,
    /// Unknown email or wrong password; the two are indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Validation(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(DataStoreError),
}

impl From<DataStoreError> for AuthError {
    fn from(e: DataStoreError) -> Self {
        match e {
            DataStoreError::AlreadyExists => AuthError::DuplicateEmail,
            other => AuthError::Store(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::DuplicateEmail => ApiError::Conflict(e.to_string()),
            AuthError::InvalidCredentials | AuthError::Unauthenticated(_) => {
                ApiError::Unauthenticated(e.to_string())
            }
            AuthError::Validation(msg) => ApiError::Validation(msg),
            AuthError::Store(store) => ApiError::from(store),
            AuthError::Hashing(_) | AuthError::Token(_) => ApiError::Unexpected(e.to_string()),
        }
    }
}

/////////////////////////////////////////////// Claims ////////////////////////////////////////////////

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

///////////////////////////////////////////// AuthService /////////////////////////////////////////////

/// Hashes and checks passwords, and signs and verifies session tokens.
#[derive(Clone)]
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
    hash_params: Params,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Creates a service signing with `secret`; tokens live for `token_ttl`.
    pub fn new(secret: &[u8], token_ttl: Duration) -> Self {
        AuthService {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            token_ttl,
            hash_params: Params::default(),
        }
    }

    /// Replaces the argon2 cost parameters.
    pub fn with_hash_params(mut self, params: Params) -> Self {
        self.hash_params = params;
        self
    }

    /// How long issued tokens stay valid.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    fn hasher(params: Params) -> Argon2<'static> {
        Argon2::new(ArgonAlgorithm::Argon2id, Version::V0x13, params)
    }

    /// Hashes `password` into a PHC string off the async runtime.
    pub async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let params = self.hash_params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Self::hasher(params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::Hashing(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Checks `password` against a stored PHC string.
    ///
    /// The parameters embedded in the hash are used, so changing cost
    /// parameters never invalidates existing accounts.
    pub async fn verify_password(&self, hash: String, password: String) -> Result<bool, AuthError> {
        let params = self.hash_params.clone();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
            Ok(Self::hasher(params)
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Signs a token for `user` issued at `now`.  Returns the token and its expiry.
    pub fn issue_token(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires_at = now + self.token_ttl;
        let claims = Claims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, expires_at))
    }

    /// Verifies a token's signature and expiry and returns the user it names.
    pub fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthError::Unauthenticated("token expired".to_string())
                }
                _ => AuthError::Unauthenticated("invalid token".to_string()),
            })?
            .claims;
        claims
            .sub
            .parse()
            .map_err(|_| AuthError::Unauthenticated("invalid token".to_string()))
    }

    /// Creates an account and signs the caller in.
    pub async fn register(
        &self,
        store: &dyn DataStore,
        clock: &dyn Clock,
        request: RegisterRequest,
    ) -> Result<AuthResponse, AuthError> {
        let name = request.name.trim().to_string();
        let email = normalize_email(&request.email);
        if name.is_empty() {
            return Err(AuthError::Validation("name is required".to_string()));
        }
        if !EMAIL_SHAPE.is_match(&email) {
            return Err(AuthError::Validation("a valid email is required".to_string()));
        }
        if request.password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }
        if request.age.is_some_and(|age| age > MAX_AGE) {
            return Err(AuthError::Validation(format!(
                "age must be at most {}",
                MAX_AGE
            )));
        }
        if store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let now = clock.now();
        let user = User {
            id: UserId::generate(),
            name,
            age: request.age,
            email,
            password_hash: self.hash_password(request.password).await?,
            affiliation: request.affiliation.filter(|a| !a.trim().is_empty()),
            created_at: now,
        };
        store.create_user(&user).await?;
        tracing::info!(user = %user.id, "user registered");
        self.respond(&user, now)
    }

    /// Checks credentials and signs the caller in.
    pub async fn login(
        &self,
        store: &dyn DataStore,
        clock: &dyn Clock,
        request: LoginRequest,
    ) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let Some(user) = store.find_user_by_email(&email).await? else {
            tracing::debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !self
            .verify_password(user.password_hash.clone(), request.password)
            .await?
        {
            tracing::debug!(user = %user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        self.respond(&user, clock.now())
    }

    fn respond(&self, user: &User, now: DateTime<Utc>) -> Result<AuthResponse, AuthError> {
        let (token, expires_at) = self.issue_token(user.id, now)?;
        Ok(AuthResponse {
            token,
            expires_at,
            user: UserProfile::from(user),
        })
    }
}

////////////////////////////////////////////// AuthUser ///////////////////////////////////////////////

/// The authenticated caller, taken from an `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".to_string()))?;
        Ok(AuthUser(state.auth.authenticate(token)?))
    }
}

/////////////////////////////////////////////// Routes ////////////////////////////////////////////////

async fn register_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = state
        .auth
        .register(state.store.as_ref(), state.clock.as_ref(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state
        .auth
        .login(state.store.as_ref(), state.clock.as_ref(), request)
        .await?;
    Ok(Json(response))
}

/// Creates an Axum router with the unauthenticated account endpoints.
pub fn create_auth_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::test_helpers::{fast_auth_service, test_server};
    use crate::{InMemoryDataStore, ManualClock};

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Hazel".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            age: Some(30),
            affiliation: None,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = fast_auth_service();
        let store = InMemoryDataStore::new();
        let clock = ManualClock::default();

        let registered = auth
            .register(&store, &clock, register_request(" Hazel@Example.com "))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "hazel@example.com");
        assert_eq!(registered.expires_at, clock.now() + Duration::days(7));
        assert_eq!(
            auth.authenticate(&registered.token).unwrap(),
            registered.user.id
        );

        let stored = store
            .find_user_by_email("hazel@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.password_hash.starts_with("$argon2id$"));

        let login = auth
            .login(
                &store,
                &clock,
                LoginRequest {
                    email: "HAZEL@example.com".to_string(),
                    password: "correct horse".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(login.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_alike() {
        let auth = fast_auth_service();
        let store = InMemoryDataStore::new();
        let clock = ManualClock::default();
        auth.register(&store, &clock, register_request("a@b.co"))
            .await
            .unwrap();

        let wrong = auth
            .login(
                &store,
                &clock,
                LoginRequest {
                    email: "a@b.co".to_string(),
                    password: "nope".to_string(),
                },
            )
            .await
            .unwrap_err();
        let unknown = auth
            .login(
                &store,
                &clock,
                LoginRequest {
                    email: "x@b.co".to_string(),
                    password: "nope".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_registration_creates_nothing() {
        let auth = fast_auth_service();
        let store = InMemoryDataStore::new();
        let clock = ManualClock::default();
        auth.register(&store, &clock, register_request("dup@example.com"))
            .await
            .unwrap();
        let err = auth
            .register(&store, &clock, register_request("DUP@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let auth = fast_auth_service();
        let store = InMemoryDataStore::new();
        let clock = ManualClock::default();
        for request in [
            RegisterRequest {
                name: " ".to_string(),
                ..register_request("n@example.com")
            },
            register_request("not-an-email"),
            RegisterRequest {
                password: String::new(),
                ..register_request("p@example.com")
            },
            RegisterRequest {
                age: Some(3_000_000_000),
                ..register_request("old@example.com")
            },
            RegisterRequest {
                age: Some(MAX_AGE + 1),
                ..register_request("older@example.com")
            },
        ] {
            let err = auth.register(&store, &clock, request).await.unwrap_err();
            assert!(matches!(err, AuthError::Validation(_)), "{:?}", err);
        }
        assert_eq!(store.user_count(), 0);

        let oldest = RegisterRequest {
            age: Some(MAX_AGE),
            ..register_request("oldest@example.com")
        };
        assert!(auth.register(&store, &clock, oldest).await.is_ok());
    }

    #[tokio::test]
    async fn oversized_age_is_a_bad_request() {
        let (server, store, _clock) = test_server();
        let response = server
            .post("/api/register")
            .json(&serde_json::json!({
                "name": "Methuselah",
                "email": "m@example.com",
                "password": "pw",
                "age": 3_000_000_000u64,
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(store.user_count(), 0);
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let auth = fast_auth_service();
        let user = UserId::generate();
        let (expired, _) = auth
            .issue_token(user, Utc::now() - Duration::days(8))
            .unwrap();
        assert!(matches!(
            auth.authenticate(&expired),
            Err(AuthError::Unauthenticated(_))
        ));

        let other = AuthService::new(b"some other secret", Duration::days(7));
        let (foreign, _) = other.issue_token(user, Utc::now()).unwrap();
        assert!(matches!(
            auth.authenticate(&foreign),
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(auth.authenticate("garbage").is_err());
    }

    #[tokio::test]
    async fn http_statuses() {
        let (server, _store, _clock) = test_server();
        let body = serde_json::json!({
            "name": "Rowan",
            "email": "rowan@example.com",
            "password": "pw",
        });
        server
            .post("/api/register")
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post("/api/register")
            .json(&body)
            .await
            .assert_status(StatusCode::CONFLICT);
        server
            .post("/api/login")
            .json(&serde_json::json!({"email": "rowan@example.com", "password": "bad"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/api/plants")
            .authorization_bearer("not.a.token")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
