//! JSON-over-HTTP remote procedure surface of the auth service.
//!
//! Each method is a `POST /sso.Auth/<Method>`. Required fields are checked here,
//! before the service runs, and service errors are folded into [`status::RpcStatus`].

use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod status;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
