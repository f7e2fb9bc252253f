use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use validator::Validate;

use super::state::AppState;
use super::types::{
    ApiResponse, DashboardResponse, LevelView, PurchaseRequest, SalaryResponse, TeamSummary,
    TicketRequest, TreeNodeView, TreeQuery, error_codes, level_views, salary_response,
};
use crate::member::{Member, MemberRepository, Wallet, WalletRepository};
use crate::network::error::NetworkError;
use crate::network::model::{BvEntry, PlacementEdge};
use crate::network::tree::TreePresenter;
use crate::session::SessionError;
use crate::shop::{Order, Product, PurchaseOutcome, ShopError};
use crate::support::{Announcement, AnnouncementRepository, SupportTicket, TicketRepository};
use crate::user_auth::Claims;

type ErrorReply = (StatusCode, Json<ApiResponse<()>>);

fn internal_error(msg: impl Into<String>) -> ErrorReply {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error(error_codes::INTERNAL_ERROR, msg)),
    )
}

fn db_error(e: sqlx::Error) -> ErrorReply {
    tracing::error!("database query failed: {e}");
    internal_error("Query failed")
}

pub(crate) fn network_error(e: NetworkError) -> ErrorReply {
    let (status, code) = match &e {
        NetworkError::MemberNotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
        NetworkError::SponsorNotFound(_) => {
            (StatusCode::NOT_FOUND, error_codes::SPONSOR_NOT_FOUND)
        }
        NetworkError::SlotOccupied { .. } => (StatusCode::CONFLICT, error_codes::SLOT_OCCUPIED),
        NetworkError::AlreadyPlaced(_) => {
            (StatusCode::CONFLICT, error_codes::INVALID_PARAMETER)
        }
        NetworkError::InvalidAmount(_) => {
            (StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER)
        }
        NetworkError::CorruptTree { .. } => {
            tracing::error!("tree corruption detected: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::CORRUPT_TREE,
            )
        }
        NetworkError::Database(_) if e.is_transient() => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
        ),
        NetworkError::Database(_) => {
            tracing::error!("network store failure: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
            )
        }
    };
    (status, Json(ApiResponse::<()>::error(code, e.to_string())))
}

fn session_error(e: SessionError) -> ErrorReply {
    use crate::session::Transient;
    let (status, code, msg) = match &e {
        SessionError::MemberNotFound(_) | SessionError::WalletNotFound(_) => {
            (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, e.to_string())
        }
        SessionError::Database(_) if e.is_transient() => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            "Could not load your data right now, please retry".to_string(),
        ),
        SessionError::Database(err) => {
            tracing::error!("session bootstrap failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Could not load your data".to_string(),
            )
        }
    };
    (status, Json(ApiResponse::<()>::error(code, msg)))
}

fn shop_error(e: ShopError) -> ErrorReply {
    let (status, code, msg) = match e {
        ShopError::Volume(inner) => {
            tracing::error!("BV crediting after purchase failed: {inner}");
            return network_error(inner);
        }
        ShopError::ProductNotFound(_) => {
            (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, e.to_string())
        }
        ShopError::OutOfStock { .. } => (
            StatusCode::BAD_REQUEST,
            error_codes::OUT_OF_STOCK,
            e.to_string(),
        ),
        ShopError::InsufficientBalance => (
            StatusCode::BAD_REQUEST,
            error_codes::INSUFFICIENT_BALANCE,
            e.to_string(),
        ),
        ShopError::InvalidQuantity => (
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            e.to_string(),
        ),
        ShopError::Database(ref err) => {
            tracing::error!("shop operation failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Operation failed".to_string(),
            )
        }
    };
    (status, Json(ApiResponse::<()>::error(code, msg)))
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub build: String,
}

/// Service health check
///
/// GET /api/v1/health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service healthy", body = ApiResponse<HealthResponse>)),
    tag = "Public"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ErrorReply> {
    state.db.health_check().await.map_err(db_error)?;
    Ok(Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        build: env!("GIT_HASH").to_string(),
    })))
}

// ============================================================================
// Member
// ============================================================================

/// Logged-in member's profile
///
/// GET /api/v1/member/profile
#[utoipa::path(
    get,
    path = "/api/v1/member/profile",
    responses(
        (status = 200, description = "Member profile", body = ApiResponse<Member>),
        (status = 404, description = "Profile missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Member"
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<Member>>, ErrorReply> {
    let member = MemberRepository::get_by_id(state.db.pool(), claims.member_id())
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error(
                    error_codes::NOT_FOUND,
                    "Profile not found",
                )),
            )
        })?;
    Ok(Json(ApiResponse::success(member)))
}

/// Logged-in member's wallet balances
///
/// GET /api/v1/member/wallet
#[utoipa::path(
    get,
    path = "/api/v1/member/wallet",
    responses(
        (status = 200, description = "Wallet balances", body = ApiResponse<Wallet>),
        (status = 404, description = "Wallet missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Member"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<Wallet>>, ErrorReply> {
    let wallet = WalletRepository::get_by_member(state.db.pool(), claims.member_id())
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error(
                    error_codes::NOT_FOUND,
                    "Wallet not found",
                )),
            )
        })?;
    Ok(Json(ApiResponse::success(wallet)))
}

async fn assemble_dashboard(
    state: &AppState,
    session: crate::session::Session,
) -> Result<DashboardResponse, ErrorReply> {
    let member_id = session.member_id;
    let aggregate = state
        .placement
        .get_aggregate(member_id)
        .await
        .map_err(network_error)?;
    let bv = state
        .volume
        .bv_summary(member_id)
        .await
        .map_err(network_error)?;
    let standing = salary_response(&state.salary_scale, bv).standing;

    Ok(DashboardResponse {
        member: session.snapshot.member,
        wallet: session.snapshot.wallet,
        freshness: session.freshness,
        team: TeamSummary::from(aggregate),
        bv,
        salary: standing,
    })
}

/// Complete dashboard payload: profile, wallet, team, BV, salary standing.
/// Either everything loads or an error envelope is returned - partial
/// financial figures are never served.
///
/// GET /api/v1/member/dashboard
#[utoipa::path(
    get,
    path = "/api/v1/member/dashboard",
    responses(
        (status = 200, description = "Dashboard data", body = ApiResponse<DashboardResponse>),
        (status = 503, description = "Backend unavailable and no cached snapshot; retry")
    ),
    security(("bearer_auth" = [])),
    tag = "Member"
)]
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ErrorReply> {
    let session = state
        .session
        .bootstrap(claims.member_id())
        .await
        .map_err(session_error)?;
    let dashboard = assemble_dashboard(&state, session).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// Retry action for the dashboard: bypasses the cache fast path.
///
/// POST /api/v1/member/refresh
#[utoipa::path(
    post,
    path = "/api/v1/member/refresh",
    responses(
        (status = 200, description = "Dashboard data", body = ApiResponse<DashboardResponse>),
        (status = 503, description = "Backend unavailable and no cached snapshot; retry")
    ),
    security(("bearer_auth" = [])),
    tag = "Member"
)]
pub async fn refresh_dashboard(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ErrorReply> {
    let session = state
        .session
        .refresh(claims.member_id())
        .await
        .map_err(session_error)?;
    let dashboard = assemble_dashboard(&state, session).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

// ============================================================================
// Team / network
// ============================================================================

/// Member's placement edge in the binary tree
///
/// GET /api/v1/team/placement
#[utoipa::path(
    get,
    path = "/api/v1/team/placement",
    responses(
        (status = 200, description = "Placement edge", body = ApiResponse<PlacementEdge>),
        (status = 404, description = "Not placed")
    ),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn get_placement(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<PlacementEdge>>, ErrorReply> {
    state
        .placement
        .get_placement(claims.member_id())
        .await
        .map(|edge| Json(ApiResponse::success(edge)))
        .map_err(network_error)
}

/// Subtree counters for the logged-in member
///
/// GET /api/v1/team/aggregate
#[utoipa::path(
    get,
    path = "/api/v1/team/aggregate",
    responses((status = 200, description = "Team counters", body = ApiResponse<TeamSummary>)),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn get_aggregate(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<TeamSummary>>, ErrorReply> {
    state
        .placement
        .get_aggregate(claims.member_id())
        .await
        .map(|agg| Json(ApiResponse::success(TeamSummary::from(agg))))
        .map_err(network_error)
}

/// Interactive tree rendering rooted at the logged-in member
///
/// GET /api/v1/team/tree
#[utoipa::path(
    get,
    path = "/api/v1/team/tree",
    params(TreeQuery),
    responses((status = 200, description = "Tree view", body = ApiResponse<TreeNodeView>)),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn get_tree(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<ApiResponse<TreeNodeView>>, ErrorReply> {
    let expanded = query.expanded_set();
    let presenter = TreePresenter::new(state.placement.store().as_ref());
    let tree = presenter
        .render(claims.member_id(), &expanded)
        .await
        .map_err(network_error)?;

    let names = MemberRepository::display_map(state.db.pool(), &tree.ids())
        .await
        .map_err(db_error)?;
    Ok(Json(ApiResponse::success(TreeNodeView::hydrate(
        &tree, &names,
    ))))
}

/// Members directly sponsored by the logged-in member
///
/// GET /api/v1/team/direct
#[utoipa::path(
    get,
    path = "/api/v1/team/direct",
    responses((status = 200, description = "Direct team", body = ApiResponse<Vec<Member>>)),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn get_direct_team(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<Member>>>, ErrorReply> {
    MemberRepository::direct_team(state.db.pool(), claims.member_id())
        .await
        .map(|members| Json(ApiResponse::success(members)))
        .map_err(db_error)
}

/// Referral levels with unlock status for the logged-in member
///
/// GET /api/v1/team/levels
#[utoipa::path(
    get,
    path = "/api/v1/team/levels",
    responses((status = 200, description = "Referral levels", body = ApiResponse<Vec<LevelView>>)),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn get_levels(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<LevelView>>>, ErrorReply> {
    let aggregate = state
        .placement
        .get_aggregate(claims.member_id())
        .await
        .map_err(network_error)?;
    Ok(Json(ApiResponse::success(level_views(
        &state.referral_scale,
        aggregate.direct_count,
    ))))
}

/// Salary standing and the full slab table
///
/// GET /api/v1/team/salary
#[utoipa::path(
    get,
    path = "/api/v1/team/salary",
    responses((status = 200, description = "Salary standing", body = ApiResponse<SalaryResponse>)),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn get_salary(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<SalaryResponse>>, ErrorReply> {
    let bv = state
        .volume
        .bv_summary(claims.member_id())
        .await
        .map_err(network_error)?;
    Ok(Json(ApiResponse::success(salary_response(
        &state.salary_scale,
        bv,
    ))))
}

/// BV ledger entries credited to the logged-in member, newest first
///
/// GET /api/v1/team/bv/history
#[utoipa::path(
    get,
    path = "/api/v1/team/bv/history",
    responses((status = 200, description = "BV ledger", body = ApiResponse<Vec<BvEntry>>)),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn get_bv_history(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<BvEntry>>>, ErrorReply> {
    state
        .volume
        .history(claims.member_id())
        .await
        .map(|entries| Json(ApiResponse::success(entries)))
        .map_err(network_error)
}

// ============================================================================
// Shop
// ============================================================================

/// Active product catalogue (TTL-cached)
///
/// GET /api/v1/public/products
#[utoipa::path(
    get,
    path = "/api/v1/public/products",
    responses((status = 200, description = "Products", body = ApiResponse<Vec<Product>>)),
    tag = "Shop"
)]
pub async fn get_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ErrorReply> {
    super::cache::load_products_cached(Arc::new(state.db.pool().clone()))
        .await
        .map(|products| Json(ApiResponse::success(products)))
        .map_err(internal_error)
}

/// Purchase a product from the top-up wallet
///
/// POST /api/v1/shop/orders
#[utoipa::path(
    post,
    path = "/api/v1/shop/orders",
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<PurchaseOutcome>),
        (status = 400, description = "Out of stock or insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Shop"
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PurchaseOutcome>>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                format!("Invalid input: {e}"),
            )),
        ));
    }

    state
        .shop
        .purchase(claims.member_id(), req.product_id, req.quantity)
        .await
        .map(|outcome| (StatusCode::CREATED, Json(ApiResponse::success(outcome))))
        .map_err(shop_error)
}

/// Order history for the logged-in member
///
/// GET /api/v1/shop/orders
#[utoipa::path(
    get,
    path = "/api/v1/shop/orders",
    responses((status = 200, description = "Orders", body = ApiResponse<Vec<Order>>)),
    security(("bearer_auth" = [])),
    tag = "Shop"
)]
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ErrorReply> {
    state
        .shop
        .orders_for(claims.member_id())
        .await
        .map(|orders| Json(ApiResponse::success(orders)))
        .map_err(shop_error)
}

// ============================================================================
// Support
// ============================================================================

/// Open a support ticket
///
/// POST /api/v1/support/tickets
#[utoipa::path(
    post,
    path = "/api/v1/support/tickets",
    request_body = TicketRequest,
    responses((status = 201, description = "Ticket created", body = ApiResponse<SupportTicket>)),
    security(("bearer_auth" = [])),
    tag = "Support"
)]
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(req): Json<TicketRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SupportTicket>>), ErrorReply> {
    if let Err(e) = req.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                format!("Invalid input: {e}"),
            )),
        ));
    }

    TicketRepository::create(
        state.db.pool(),
        claims.member_id(),
        &req.subject,
        &req.message,
        &req.priority,
    )
    .await
    .map(|ticket| (StatusCode::CREATED, Json(ApiResponse::success(ticket))))
    .map_err(db_error)
}

/// Tickets opened by the logged-in member
///
/// GET /api/v1/support/tickets
#[utoipa::path(
    get,
    path = "/api/v1/support/tickets",
    responses((status = 200, description = "Tickets", body = ApiResponse<Vec<SupportTicket>>)),
    security(("bearer_auth" = [])),
    tag = "Support"
)]
pub async fn get_tickets(
    State(state): State<Arc<AppState>>,
    axum::Extension(claims): axum::Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<SupportTicket>>>, ErrorReply> {
    TicketRepository::list_by_member(state.db.pool(), claims.member_id())
        .await
        .map(|tickets| Json(ApiResponse::success(tickets)))
        .map_err(db_error)
}

// ============================================================================
// Public reference tables
// ============================================================================

/// Active announcements
///
/// GET /api/v1/public/announcements
#[utoipa::path(
    get,
    path = "/api/v1/public/announcements",
    responses((status = 200, description = "Announcements", body = ApiResponse<Vec<Announcement>>)),
    tag = "Public"
)]
pub async fn get_announcements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Announcement>>>, ErrorReply> {
    AnnouncementRepository::list_active(state.db.pool())
        .await
        .map(|items| Json(ApiResponse::success(items)))
        .map_err(db_error)
}

/// Fee and threshold constants clients display alongside wallet forms
///
/// GET /api/v1/public/fees
#[utoipa::path(
    get,
    path = "/api/v1/public/fees",
    responses((status = 200, description = "Platform fees", body = ApiResponse<crate::config::PlatformConfig>)),
    tag = "Public"
)]
pub async fn get_platform_fees(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<crate::config::PlatformConfig>> {
    Json(ApiResponse::success(state.platform.clone()))
}

/// Salary slab table (TTL-cached)
///
/// GET /api/v1/public/salary-slabs
#[utoipa::path(
    get,
    path = "/api/v1/public/salary-slabs",
    responses((status = 200, description = "Salary slabs", body = ApiResponse<Vec<crate::network::eligibility::SalarySlab>>)),
    tag = "Public"
)]
pub async fn get_salary_slabs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<crate::network::eligibility::SalarySlab>>>, ErrorReply> {
    super::cache::load_salary_slabs_cached(Arc::new(state.db.pool().clone()))
        .await
        .map(|slabs| Json(ApiResponse::success(slabs)))
        .map_err(internal_error)
}

/// Referral level table (TTL-cached)
///
/// GET /api/v1/public/referral-levels
#[utoipa::path(
    get,
    path = "/api/v1/public/referral-levels",
    responses((status = 200, description = "Referral levels", body = ApiResponse<Vec<crate::network::eligibility::ReferralLevel>>)),
    tag = "Public"
)]
pub async fn get_referral_levels(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<crate::network::eligibility::ReferralLevel>>>, ErrorReply> {
    super::cache::load_referral_levels_cached(Arc::new(state.db.pool().clone()))
        .await
        .map(|levels| Json(ApiResponse::success(levels)))
        .map_err(internal_error)
}
