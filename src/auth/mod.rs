pub mod claims;
pub mod errors;
pub mod jwt;
pub mod password;
pub mod repo_types;
pub mod services;

pub use errors::AuthError;
pub use jwt::{TokenCodec, TokenError};
pub use services::{AuthService, LoginOutcome, ProfileUpdate};
