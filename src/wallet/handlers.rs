use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{StkOutcome, TransferOutcome, WalletError, WithdrawOutcome};
use crate::gateway::types::{
    ApiResponse, DepositRequest, StkTradeRequest, TransferRequest, WithdrawRequest, error_codes,
};
use crate::gateway::state::AppState;
use crate::member::{Transaction, TransactionRepository, TxType};
use crate::user_auth::Claims;

type ErrorReply = (StatusCode, Json<ApiResponse<()>>);

fn wallet_error(e: WalletError) -> ErrorReply {
    let (status, code, msg) = match &e {
        WalletError::InsufficientBalance => (
            StatusCode::BAD_REQUEST,
            error_codes::INSUFFICIENT_BALANCE,
            e.to_string(),
        ),
        WalletError::InvalidAmount => (
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            e.to_string(),
        ),
        WalletError::BelowMinimum(_) => (
            StatusCode::BAD_REQUEST,
            error_codes::BELOW_MINIMUM,
            e.to_string(),
        ),
        WalletError::RecipientNotFound(_) | WalletError::DepositNotFound => {
            (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, e.to_string())
        }
        WalletError::SelfTransfer => (
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            e.to_string(),
        ),
        WalletError::Database(err) => {
            tracing::error!("wallet operation failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Operation failed".to_string(),
            )
        }
    };
    (status, Json(ApiResponse::<()>::error(code, msg)))
}

fn validation_error(e: validator::ValidationErrors) -> ErrorReply {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            error_codes::INVALID_PARAMETER,
            format!("Invalid input: {e}"),
        )),
    )
}

/// Transfer funds to another member
///
/// POST /api/v1/wallet/transfer
#[utoipa::path(
    post,
    path = "/api/v1/wallet/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer completed", body = ApiResponse<TransferOutcome>),
        (status = 400, description = "Invalid amount or insufficient balance"),
        (status = 404, description = "Recipient not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<ApiResponse<TransferOutcome>>, ErrorReply> {
    req.validate().map_err(validation_error)?;

    state
        .wallet
        .transfer(claims.member_id(), &req.recipient_code, req.amount.inner())
        .await
        .map(|outcome| Json(ApiResponse::success(outcome)))
        .map_err(wallet_error)
}

/// Request a withdrawal
///
/// POST /api/v1/wallet/withdraw
#[utoipa::path(
    post,
    path = "/api/v1/wallet/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 200, description = "Withdrawal requested", body = ApiResponse<WithdrawOutcome>),
        (status = 400, description = "Below minimum or insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<ApiResponse<WithdrawOutcome>>, ErrorReply> {
    state
        .wallet
        .withdraw(claims.member_id(), req.amount.inner(), &req.method)
        .await
        .map(|outcome| Json(ApiResponse::success(outcome)))
        .map_err(wallet_error)
}

/// File a deposit claim for operator review
///
/// POST /api/v1/wallet/deposit
#[utoipa::path(
    post,
    path = "/api/v1/wallet/deposit",
    request_body = DepositRequest,
    responses(
        (status = 201, description = "Deposit recorded as pending", body = ApiResponse<Uuid>),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<DepositRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Uuid>>), ErrorReply> {
    req.validate().map_err(validation_error)?;

    state
        .wallet
        .deposit_request(
            claims.member_id(),
            req.amount.inner(),
            &req.method,
            &req.transaction_id,
            &req.proof_link,
        )
        .await
        .map(|reference| (StatusCode::CREATED, Json(ApiResponse::success(reference))))
        .map_err(wallet_error)
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct TopupRequest {
    pub amount: crate::gateway::types::StrictAmount,
}

/// Move main-balance funds into the top-up (purchase) wallet
///
/// POST /api/v1/wallet/topup
#[utoipa::path(
    post,
    path = "/api/v1/wallet/topup",
    request_body = TopupRequest,
    responses(
        (status = 200, description = "Top-up completed"),
        (status = 400, description = "Insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn topup(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<TopupRequest>,
) -> Result<Json<ApiResponse<()>>, ErrorReply> {
    state
        .wallet
        .topup(claims.member_id(), req.amount.inner())
        .await
        .map(|_| Json(ApiResponse::success(())))
        .map_err(wallet_error)
}

/// Buy STK at the platform price
///
/// POST /api/v1/wallet/stk/buy
#[utoipa::path(
    post,
    path = "/api/v1/wallet/stk/buy",
    request_body = StkTradeRequest,
    responses(
        (status = 200, description = "STK purchased", body = ApiResponse<StkOutcome>),
        (status = 400, description = "Insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn stk_buy(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<StkTradeRequest>,
) -> Result<Json<ApiResponse<StkOutcome>>, ErrorReply> {
    state
        .wallet
        .stk_buy(claims.member_id(), req.quantity.inner())
        .await
        .map(|outcome| Json(ApiResponse::success(outcome)))
        .map_err(wallet_error)
}

/// Sell STK back at the platform price
///
/// POST /api/v1/wallet/stk/sell
#[utoipa::path(
    post,
    path = "/api/v1/wallet/stk/sell",
    request_body = StkTradeRequest,
    responses(
        (status = 200, description = "STK sold", body = ApiResponse<StkOutcome>),
        (status = 400, description = "Insufficient STK")
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn stk_sell(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<StkTradeRequest>,
) -> Result<Json<ApiResponse<StkOutcome>>, ErrorReply> {
    state
        .wallet
        .stk_sell(claims.member_id(), req.quantity.inner())
        .await
        .map(|outcome| Json(ApiResponse::success(outcome)))
        .map_err(wallet_error)
}

/// Transaction history, optionally filtered by type
///
/// GET /api/v1/wallet/history
#[utoipa::path(
    get,
    path = "/api/v1/wallet/history",
    params(crate::gateway::types::TransactionsQuery),
    responses(
        (status = 200, description = "Transactions, newest first", body = ApiResponse<Vec<Transaction>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    axum::extract::Query(query): axum::extract::Query<crate::gateway::types::TransactionsQuery>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, ErrorReply> {
    let tx_type = match query.tx_type.as_deref() {
        Some(raw) => match TxType::parse(raw) {
            Some(t) => Some(t),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<()>::error(
                        error_codes::INVALID_PARAMETER,
                        format!("Unknown transaction type: {raw}"),
                    )),
                ));
            }
        },
        None => None,
    };

    TransactionRepository::list_by_member(state.db.pool(), claims.member_id(), tx_type)
        .await
        .map(|txs| Json(ApiResponse::success(txs)))
        .map_err(|e| wallet_error(WalletError::Database(e)))
}

/// Internal Mock Deposit Approval (Debug)
///
/// [SECURITY WARNING] This endpoint is for development/testing ONLY.
/// It approves pending deposits without operator review.
///
/// POST /internal/mock/deposit/approve
#[cfg(feature = "mock-api")]
pub async fn mock_approve_deposit(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(req): Json<MockApproveRequest>,
) -> Result<Json<ApiResponse<String>>, ErrorReply> {
    let secret = headers
        .get("X-Internal-Secret")
        .and_then(|v| v.to_str().ok());
    if secret != Some("dev-secret") {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Access Denied: Missing or Invalid X-Internal-Secret",
            )),
        ));
    }

    state
        .wallet
        .approve_deposit(req.reference_id)
        .await
        .map(|_| Json(ApiResponse::success("approved".to_string())))
        .map_err(wallet_error)
}

#[cfg(feature = "mock-api")]
#[derive(Debug, serde::Deserialize)]
pub struct MockApproveRequest {
    pub reference_id: Uuid,
}
