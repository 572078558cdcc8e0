//! User authentication and session identity.
//!
//! Provides:
//! - Registration and login with email/password (bcrypt, cost 8 by default)
//! - Stateless session tokens (HS256 JWT, 7-day expiry, no revocation)
//! - A middleware that turns `Authorization: Bearer <token>` into a
//!   request-scoped [`Identity`]
//!
//! ## Design Decisions
//! - Email is the uniqueness key, always lowercased and trimmed, and the
//!   `users` table enforces it so racing registrations cannot both land.
//! - Tokens are not stored. Every protected request re-reads the user, so a
//!   deleted account stops resolving immediately even though its token still
//!   verifies.

pub mod middleware;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

pub use middleware::{extract_bearer_token, require_auth};
pub use password::PasswordHasher;
pub use service::{AuthService, AuthSession, Identity, LoginRequest, PublicUser, RegisterRequest};
pub use store::{normalize_email, User, UserStore};
pub use token::{Claims, TokenError, TokenIssuer};
