use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use validator::Validate;

use super::service::{AuthResponse, LoginRequest, RegisterRequest};
use crate::core_types::MemberId;
use crate::gateway::types::error_codes;
use crate::gateway::{state::AppState, types::ApiResponse};

/// Register a new member
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Member registered successfully", body = ApiResponse<MemberId>),
        (status = 400, description = "Invalid input or unknown sponsor code"),
        (status = 409, description = "Email or mobile already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MemberId>>), (StatusCode, Json<ApiResponse<()>>)> {
    if let Err(e) = req.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                format!("Invalid input: {e}"),
            )),
        ));
    }

    match state.user_auth.register(req).await {
        Ok(member_id) => Ok((StatusCode::CREATED, Json(ApiResponse::success(member_id)))),
        Err(e) => {
            let err_msg = e.to_string();
            if err_msg.contains("duplicate key") {
                tracing::warn!("Registration attempt for existing member: {}", err_msg);
                Err((
                    StatusCode::CONFLICT,
                    Json(ApiResponse::<()>::error(
                        error_codes::INVALID_PARAMETER,
                        "Email or mobile already registered",
                    )),
                ))
            } else if err_msg.contains("Sponsor code not found") {
                Err((
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<()>::error(
                        error_codes::SPONSOR_NOT_FOUND,
                        "Sponsor code not found",
                    )),
                ))
            } else {
                tracing::error!("Registration failed: {:?}", e);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error(
                        error_codes::INTERNAL_ERROR,
                        "Registration failed",
                    )),
                ))
            }
        }
    }
}

/// Login member
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), (StatusCode, Json<ApiResponse<()>>)> {
    if let Err(e) = req.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                format!("Invalid input: {e}"),
            )),
        ));
    }

    match state.user_auth.login(req).await {
        Ok(resp) => Ok((StatusCode::OK, Json(ApiResponse::success(resp)))),
        Err(e) => {
            tracing::warn!("Login failed: {:?}", e);
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::error(
                    error_codes::AUTH_FAILED,
                    "Invalid email or password",
                )),
            ))
        }
    }
}

/// Logout: tear down the member's session cache.
///
/// POST /api/v1/auth/logout
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Session torn down"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<super::service::Claims>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    state.session.teardown(claims.member_id());
    (StatusCode::OK, Json(ApiResponse::success(())))
}
