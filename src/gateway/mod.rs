pub mod cache;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::middleware::jwt_auth_middleware;
use state::AppState;

/// Start HTTP Gateway server
pub async fn run_server(port: u16, state: AppState) {
    let state = Arc::new(state);

    // ==========================================================================
    // Auth routes: register/login public, logout behind JWT
    // ==========================================================================
    let auth_routes = Router::new()
        .route("/register", post(crate::user_auth::handlers::register))
        .route("/login", post(crate::user_auth::handlers::login))
        .merge(
            Router::new()
                .route("/logout", post(crate::user_auth::handlers::logout))
                .layer(from_fn_with_state(state.clone(), jwt_auth_middleware)),
        );

    // ==========================================================================
    // Member routes (JWT)
    // ==========================================================================
    let member_routes = Router::new()
        .route("/profile", get(handlers::get_profile))
        .route("/wallet", get(handlers::get_wallet))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/refresh", post(handlers::refresh_dashboard))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Team / network routes (JWT)
    // ==========================================================================
    let team_routes = Router::new()
        .route("/placement", get(handlers::get_placement))
        .route("/aggregate", get(handlers::get_aggregate))
        .route("/tree", get(handlers::get_tree))
        .route("/direct", get(handlers::get_direct_team))
        .route("/levels", get(handlers::get_levels))
        .route("/salary", get(handlers::get_salary))
        .route("/bv/history", get(handlers::get_bv_history))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Wallet routes (JWT)
    // ==========================================================================
    let wallet_routes = Router::new()
        .route("/transfer", post(crate::wallet::handlers::transfer))
        .route("/withdraw", post(crate::wallet::handlers::withdraw))
        .route("/deposit", post(crate::wallet::handlers::deposit))
        .route("/topup", post(crate::wallet::handlers::topup))
        .route("/stk/buy", post(crate::wallet::handlers::stk_buy))
        .route("/stk/sell", post(crate::wallet::handlers::stk_sell))
        .route("/history", get(crate::wallet::handlers::history))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Shop routes (JWT for orders, catalogue is public below)
    // ==========================================================================
    let shop_routes = Router::new()
        .route("/orders", post(handlers::create_order))
        .route("/orders", get(handlers::get_orders))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Support routes (JWT)
    // ==========================================================================
    let support_routes = Router::new()
        .route("/tickets", post(handlers::create_ticket))
        .route("/tickets", get(handlers::get_tickets))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // ==========================================================================
    // Public routes (no auth required)
    // ==========================================================================
    let public_routes = Router::new()
        .route("/products", get(handlers::get_products))
        .route("/announcements", get(handlers::get_announcements))
        .route("/fees", get(handlers::get_platform_fees))
        .route("/salary-slabs", get(handlers::get_salary_slabs))
        .route("/referral-levels", get(handlers::get_referral_levels));

    // Build complete router
    let app = Router::new()
        // Health check
        .route("/api/v1/health", get(handlers::health_check))
        // API Routes
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/member", member_routes)
        .nest("/api/v1/team", team_routes)
        .nest("/api/v1/wallet", wallet_routes)
        .nest("/api/v1/shop", shop_routes)
        .nest("/api/v1/public", public_routes)
        .nest("/api/v1/support", support_routes);

    // [SECURITY] Mock API routes - only compiled when 'mock-api' feature is enabled.
    // Production builds MUST be compiled with `--no-default-features` to exclude this.
    #[cfg(feature = "mock-api")]
    let app = app.nest(
        "/internal/mock",
        Router::new().route(
            "/deposit/approve",
            post(crate::wallet::handlers::mock_approve_deposit),
        ),
    );

    let app = app
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()));

    // Bind address
    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("❌ FATAL: Failed to bind to {}: {}", addr, e);
            eprintln!(
                "   Hint: Port {} may already be in use. Check with: lsof -i :{}",
                port, port
            );
            std::process::exit(1);
        }
    };

    println!("🚀 Gateway listening on http://{}", addr);
    println!("📖 API Docs: http://{}/docs", addr);
    println!("📂 Public API:  /api/v1/public/*");
    println!("🔒 Member API:  /api/v1/member/*, /api/v1/team/*, /api/v1/wallet/* (auth required)");

    // Start server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("❌ FATAL: Server error: {}", e);
        std::process::exit(1);
    }
}
