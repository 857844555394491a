//! JWT Authentication and Middleware
//!
//! The API has a single administrator whose credentials come from
//! configuration (`ADMIN_USER` / `ADMIN_PASSWORD`). A successful login returns
//! an HS256 bearer token whose `sub` claim is the username.
//!
//! # Module Structure
//!
//! - [`auth::jwt`](crate::auth::jwt) - credential check, token signing and verification
//! - [`auth::middleware`](crate::auth::middleware) - Axum middleware and the [`AuthUser`](middleware::AuthUser) extractor
//!
//! # Usage
//!
//! ```ignore
//! use gemelo::auth::{jwt::AuthService, middleware::auth_middleware};
//!
//! let auth = Arc::new(AuthService::new(secret, 30, "admin".into(), "pw"));
//! let app = Router::new()
//!     .route("/protected", get(handler))
//!     .layer(middleware::from_fn_with_state(auth, auth_middleware));
//! ```
//!
//! Handlers read the caller with `AuthUser(claims)`.

/// Admin credential check and JWT services.
pub mod jwt;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
