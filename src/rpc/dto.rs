use serde::{Deserialize, Serialize};

// Absent fields deserialize to their zero value and are rejected by validation,
// so callers get a field-specific message instead of a parse error.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
    pub app_id: i32,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub name: String,
    pub email: String,
    pub token: String,
    pub user_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IsAdminRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GetUserRequest {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct GetUserResponse {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteUserRequest {
    pub phone: String,
    pub token: String,
}

/// Shared by UpdateUser and DeleteUser.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
