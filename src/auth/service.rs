//! Registration, login, and token resolution.

use super::password::{PasswordHasher, MAX_PASSWORD_BYTES};
use super::store::{normalize_email, User, UserStore};
use super::token::TokenIssuer;
use crate::error::{AppError, Result};
use crate::validate::Validator;
use serde::{Deserialize, Serialize};

/// Minimum password length, in characters, before hashing.
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User as returned to clients: no password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Result of a successful registration or login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

/// Request-scoped identity attached by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

pub struct AuthService {
    users: UserStore,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    /// Verified against when the email is unknown so both login failures cost
    /// the same.
    dummy_digest: String,
}

impl AuthService {
    pub fn new(users: UserStore, hasher: PasswordHasher, tokens: TokenIssuer) -> anyhow::Result<Self> {
        let dummy_digest = hasher.hash("luminate-dummy-password")?;
        tracing::debug!(bcrypt_cost = hasher.cost(), "Auth service ready");
        Ok(Self {
            users,
            hasher,
            tokens,
            dummy_digest,
        })
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession> {
        let mut v = Validator::new();
        let email = v.required("email", request.email.as_deref()).map(|e| normalize_email(&e));
        if let Some(email) = &email {
            v.check(looks_like_email(email), "email", "email is not a valid address");
        }
        let password = v.required_raw("password", request.password.as_deref());
        if let Some(password) = &password {
            v.check(
                password.chars().count() >= MIN_PASSWORD_CHARS,
                "password",
                format!("password must be at least {MIN_PASSWORD_CHARS} characters"),
            );
            v.check(
                password.len() <= MAX_PASSWORD_BYTES,
                "password",
                format!("password must be at most {MAX_PASSWORD_BYTES} bytes"),
            );
        }
        let name = v.required("name", request.name.as_deref());
        let (email, password, name) = match (email, password, name) {
            (Some(e), Some(p), Some(n)) if v.is_valid() => (e, p, n),
            _ => return Err(v.into_error("Invalid registration details.")),
        };

        // Fast path; the insert's unique constraint is what actually decides.
        if self.users.find_by_email(&email)?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let hasher = self.hasher;
        let digest = blocking(move || hasher.hash(&password)).await??;
        let user = self.users.create(&email, &digest, &name)?;
        let token = self.tokens.issue(&user.id, &user.email)?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(AuthSession {
            token,
            user: PublicUser::from(&user),
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession> {
        let mut v = Validator::new();
        let email = v.required("email", request.email.as_deref());
        let password = v.required_raw("password", request.password.as_deref());
        let (email, password) = match (email, password) {
            (Some(e), Some(p)) if v.is_valid() => (e, p),
            _ => return Err(v.into_error("Email and password are required.")),
        };

        let user = self.users.find_by_email(&email)?;
        let digest = user
            .as_ref()
            .map_or_else(|| self.dummy_digest.clone(), |u| u.password_hash.clone());

        let hasher = self.hasher;
        let matches = blocking(move || hasher.verify(&password, &digest)).await??;

        let user = match user {
            Some(user) if matches => user,
            _ => {
                tracing::debug!("Login rejected");
                return Err(AppError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue(&user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AuthSession {
            token,
            user: PublicUser::from(&user),
        })
    }

    /// Verify a token and re-read its user.
    pub fn resolve(&self, token: &str) -> Result<Identity> {
        let claims = self.tokens.verify(token).map_err(|e| {
            let reason = match &e {
                super::token::TokenError::Expired => "expired",
                _ => "invalid",
            };
            tracing::warn!(reason, "Rejected session token");
            AppError::from(e)
        })?;

        let user = self
            .users
            .find_by_id(&claims.user_id)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        Ok(Identity {
            user_id: user.id,
            email: user.email,
            name: user.name,
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Run CPU-bound work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("blocking task failed: {e}")))
}
