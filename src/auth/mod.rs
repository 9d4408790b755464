//! Authentication Module
//! Mission: Secure API access with JWT tokens, RBAC, and ownership checks

pub mod api;
pub mod guard;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod user_store;

pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, CurrentUser};
pub use user_store::UserStore;
