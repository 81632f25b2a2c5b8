use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{AuthError, ProfileUpdate},
    rpc::{
        dto::{
            DeleteUserRequest, GetUserRequest, GetUserResponse, IsAdminRequest, IsAdminResponse,
            LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, SuccessResponse,
            UpdateUserRequest,
        },
        status::RpcStatus,
    },
    state::AppState,
};

const EMPTY_ID: i64 = 0;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sso.Auth/Register", post(register))
        .route("/sso.Auth/Login", post(login))
        .route("/sso.Auth/IsAdmin", post(is_admin))
        .route("/sso.Auth/GetUser", post(get_user))
        .route("/sso.Auth/UpdateUser", post(update_user))
        .route("/sso.Auth/DeleteUser", post(delete_user))
}

/// Logs the real cause and hands the caller a bare internal error.
fn internal(err: AuthError) -> RpcStatus {
    error!(error = %err, "request failed");
    RpcStatus::internal()
}

fn not_found_or_internal(err: AuthError) -> RpcStatus {
    match err {
        AuthError::UserNotFound => RpcStatus::not_found("user not found"),
        other => internal(other),
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, RpcStatus> {
    let Json(req) = payload?;
    validate_register(&req)?;

    let user_id = state
        .auth
        .register_new_user(&req.phone, &req.password)
        .await
        .map_err(|e| match e {
            AuthError::UserExists => {
                warn!("user already exists");
                RpcStatus::already_exists("user already exists")
            }
            other => internal(other),
        })?;

    Ok(Json(RegisterResponse { user_id }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, RpcStatus> {
    let Json(req) = payload?;
    validate_login(&req)?;

    let outcome = state
        .auth
        .login(&req.phone, &req.password, req.app_id)
        .await
        .map_err(|e| match e {
            // Unknown phone and wrong password must look the same to the caller.
            AuthError::UserNotFound | AuthError::InvalidCredentials => {
                warn!(error = %e, "login rejected");
                RpcStatus::invalid_argument("invalid phone or password")
            }
            other => internal(other),
        })?;

    Ok(Json(LoginResponse {
        name: outcome.name,
        email: outcome.email,
        token: outcome.token,
        user_id: outcome.user_id,
    }))
}

#[instrument(skip(state, payload))]
pub async fn is_admin(
    State(state): State<AppState>,
    payload: Result<Json<IsAdminRequest>, JsonRejection>,
) -> Result<Json<IsAdminResponse>, RpcStatus> {
    let Json(req) = payload?;
    validate_is_admin(&req)?;

    let is_admin = state
        .auth
        .is_admin(req.user_id)
        .await
        .map_err(not_found_or_internal)?;

    Ok(Json(IsAdminResponse { is_admin }))
}

#[instrument(skip(state, payload))]
pub async fn get_user(
    State(state): State<AppState>,
    payload: Result<Json<GetUserRequest>, JsonRejection>,
) -> Result<Json<GetUserResponse>, RpcStatus> {
    let Json(req) = payload?;
    validate_get_user(&req)?;

    let name = state
        .auth
        .get_user(&req.phone)
        .await
        .map_err(not_found_or_internal)?;

    Ok(Json(GetUserResponse { name }))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, RpcStatus> {
    let Json(req) = payload?;
    validate_update_user(&req)?;

    let update = ProfileUpdate {
        name: req.name,
        email: req.email,
        phone: req.phone,
        password: req.password,
    };
    let success = state
        .auth
        .update_user(req.user_id, update, &req.token)
        .await
        .map_err(not_found_or_internal)?;

    Ok(Json(SuccessResponse { success }))
}

#[instrument(skip(state, payload))]
pub async fn delete_user(
    State(state): State<AppState>,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, RpcStatus> {
    let Json(req) = payload?;
    validate_delete_user(&req)?;

    let success = state
        .auth
        .delete_user(&req.phone, &req.token)
        .await
        .map_err(not_found_or_internal)?;

    Ok(Json(SuccessResponse { success }))
}

fn require(missing: bool, field: &str) -> Result<(), RpcStatus> {
    if missing {
        return Err(RpcStatus::invalid_argument(format!("{field} is required")));
    }
    Ok(())
}

fn validate_register(req: &RegisterRequest) -> Result<(), RpcStatus> {
    require(req.phone.is_empty(), "phone")?;
    require(req.password.is_empty(), "password")
}

fn validate_login(req: &LoginRequest) -> Result<(), RpcStatus> {
    require(req.phone.is_empty(), "phone")?;
    require(req.password.is_empty(), "password")?;
    require(req.app_id == 0, "app_id")
}

fn validate_is_admin(req: &IsAdminRequest) -> Result<(), RpcStatus> {
    require(req.user_id == EMPTY_ID, "userID")
}

fn validate_get_user(req: &GetUserRequest) -> Result<(), RpcStatus> {
    require(req.phone.is_empty(), "phone")
}

fn validate_update_user(req: &UpdateUserRequest) -> Result<(), RpcStatus> {
    require(req.user_id == EMPTY_ID, "userID")?;
    require(req.token.is_empty(), "token")
}

fn validate_delete_user(req: &DeleteUserRequest) -> Result<(), RpcStatus> {
    require(req.phone.is_empty(), "phone")?;
    require(req.token.is_empty(), "token")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::repo_types::App;
    use crate::storage::MemoryStorage;

    fn app() -> Router {
        let storage = Arc::new(MemoryStorage::with_apps([App {
            id: 1,
            name: "test".into(),
            secret: "test-secret".into(),
        }]));
        auth_routes().with_state(AppState::fake(storage))
    }

    async fn call_raw(app: &Router, method: &str, body: String) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(format!("/sso.Auth/{method}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn call(app: &Router, method: &str, body: Value) -> (StatusCode, Value) {
        call_raw(app, method, body.to_string()).await
    }

    async fn register_and_login(app: &Router, phone: &str) -> (i64, String) {
        let (status, body) = call(app, "Register", json!({"phone": phone, "password": "secret1"})).await;
        assert_eq!(status, StatusCode::OK);
        let user_id = body["user_id"].as_i64().unwrap();
        let (status, body) = call(
            app,
            "Login",
            json!({"phone": phone, "password": "secret1", "app_id": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (user_id, body["token"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn full_account_lifecycle() {
        let app = app();
        let (user_id, token) = register_and_login(&app, "+15550001").await;

        let (status, body) = call(&app, "IsAdmin", json!({"user_id": user_id})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"is_admin": false}));

        let (status, body) = call(
            &app,
            "UpdateUser",
            json!({"user_id": user_id, "name": "Alice", "token": token}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (_, body) = call(&app, "GetUser", json!({"phone": "+15550001"})).await;
        assert_eq!(body, json!({"name": "Alice"}));

        let (status, body) = call(
            &app,
            "DeleteUser",
            json!({"phone": "+15550001", "token": token}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, body) = call(&app, "GetUser", json!({"phone": "+15550001"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"code": "NOT_FOUND", "message": "user not found"}));
    }

    #[tokio::test]
    async fn missing_fields_are_invalid_arguments() {
        let app = app();
        let cases = [
            ("Register", json!({"password": "x"}), "phone is required"),
            ("Register", json!({"phone": "+1"}), "password is required"),
            ("Login", json!({"phone": "+1", "password": "x"}), "app_id is required"),
            ("Login", json!({"phone": "+1", "password": "x", "app_id": 0}), "app_id is required"),
            ("IsAdmin", json!({}), "userID is required"),
            ("GetUser", json!({"phone": ""}), "phone is required"),
            ("UpdateUser", json!({"user_id": 1}), "token is required"),
            ("UpdateUser", json!({"token": "t"}), "userID is required"),
            ("DeleteUser", json!({"phone": "+1"}), "token is required"),
        ];
        for (method, body, message) in cases {
            let (status, body) = call(&app, method, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
            assert_eq!(body["code"], "INVALID_ARGUMENT");
            assert_eq!(body["message"], message);
        }
    }

    #[tokio::test]
    async fn grpc_framed_requests_are_rejected() {
        let app = app();
        // Length-prefixed protobuf frame, as a gRPC client would send it.
        let req = Request::builder()
            .method("POST")
            .uri("/sso.Auth/Register")
            .header(CONTENT_TYPE, "application/grpc")
            .body(Body::from(vec![0u8, 0, 0, 0, 2, 0x0a, 0x00]))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn login_response_carries_only_profile_and_token() {
        let app = app();
        let creds = json!({"phone": "+15550001", "password": "secret1"});
        call(&app, "Register", creds).await;
        let (status, body) = call(
            &app,
            "Login",
            json!({"phone": "+15550001", "password": "secret1", "app_id": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let mut keys: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["email", "name", "token", "user_id"]);
    }

    #[tokio::test]
    async fn unparseable_body_is_invalid_argument() {
        let app = app();
        let (status, body) = call_raw(&app, "Register", "{not json".into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn duplicate_registration_is_already_exists() {
        let app = app();
        register_and_login(&app, "+15550001").await;
        let (status, body) = call(
            &app,
            "Register",
            json!({"phone": "+15550001", "password": "other"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({"code": "ALREADY_EXISTS", "message": "user already exists"})
        );
    }

    #[tokio::test]
    async fn unknown_phone_and_wrong_password_are_indistinguishable() {
        let app = app();
        register_and_login(&app, "+15550001").await;

        let unknown = call(
            &app,
            "Login",
            json!({"phone": "+15559999", "password": "secret1", "app_id": 1}),
        )
        .await;
        let wrong = call(
            &app,
            "Login",
            json!({"phone": "+15550001", "password": "nope", "app_id": 1}),
        )
        .await;

        assert_eq!(unknown, wrong);
        assert_eq!(unknown.0, StatusCode::BAD_REQUEST);
        assert_eq!(unknown.1["message"], "invalid phone or password");
    }

    #[tokio::test]
    async fn unclassified_failures_hide_detail() {
        let app = app();
        register_and_login(&app, "+15550001").await;

        let (status, body) = call(
            &app,
            "Login",
            json!({"phone": "+15550001", "password": "secret1", "app_id": 9}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"code": "INTERNAL", "message": "internal error"}));
    }

    #[tokio::test]
    async fn foreign_token_cannot_update_or_delete() {
        let app = app();
        let (_, token_x) = register_and_login(&app, "+15550001").await;
        let (id_y, _) = register_and_login(&app, "+15550002").await;

        let (status, body) = call(
            &app,
            "UpdateUser",
            json!({"user_id": id_y, "name": "Mallory", "token": token_x}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal error");

        let (status, _) = call(
            &app,
            "DeleteUser",
            json!({"phone": "+15550002", "token": token_x}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, body) = call(&app, "GetUser", json!({"phone": "+15550002"})).await;
        assert_eq!(body, json!({"name": ""}));
    }

    #[tokio::test]
    async fn is_admin_for_unknown_user_is_not_found() {
        let app = app();
        let (status, body) = call(&app, "IsAdmin", json!({"user_id": 12345})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
