//! HTTP surface: query, summary, heading and chat history routes

mod auth;
mod router;
#[allow(clippy::module_inception)]
mod server;

pub use auth::{AuthenticatedUser, Claims, JwtVerifier, auth_middleware};
pub use router::{AppState, create_router};
pub use server::Server;
