//! OpenAPI / Swagger UI Documentation
//!
//! Auto-generated OpenAPI 3.0 documentation for the ApexUnity member API.
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

// Import handler types for schema registration
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    DashboardResponse, LevelView, SalaryResponse, SlabView, TeamSummary, TreeNodeView,
};
use crate::member::{Member, Transaction, Wallet};
use crate::network::eligibility::{ReferralLevel, SalarySlab};
use crate::network::model::{BvEntry, PlacementEdge};
use crate::network::volume::BvSummary;
use crate::shop::{Order, Product, PurchaseOutcome};
use crate::support::{Announcement, SupportTicket};
use crate::user_auth::AuthResponse;
use crate::wallet::{StkOutcome, TransferOutcome, WithdrawOutcome};

/// Bearer JWT security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT issued by POST /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ApexUnity Member API",
        version = "1.0.0",
        description = "Member platform backend: binary placement network, BV compensation engine, wallets and shop.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        // Auth
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::logout,
        // Member
        crate::gateway::handlers::get_profile,
        crate::gateway::handlers::get_wallet,
        crate::gateway::handlers::get_dashboard,
        crate::gateway::handlers::refresh_dashboard,
        // Team / network
        crate::gateway::handlers::get_placement,
        crate::gateway::handlers::get_aggregate,
        crate::gateway::handlers::get_tree,
        crate::gateway::handlers::get_direct_team,
        crate::gateway::handlers::get_levels,
        crate::gateway::handlers::get_salary,
        crate::gateway::handlers::get_bv_history,
        // Wallet
        crate::wallet::handlers::transfer,
        crate::wallet::handlers::withdraw,
        crate::wallet::handlers::deposit,
        crate::wallet::handlers::topup,
        crate::wallet::handlers::stk_buy,
        crate::wallet::handlers::stk_sell,
        crate::wallet::handlers::history,
        // Shop
        crate::gateway::handlers::get_products,
        crate::gateway::handlers::create_order,
        crate::gateway::handlers::get_orders,
        // Support
        crate::gateway::handlers::create_ticket,
        crate::gateway::handlers::get_tickets,
        // Public
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::get_announcements,
        crate::gateway::handlers::get_platform_fees,
        crate::gateway::handlers::get_salary_slabs,
        crate::gateway::handlers::get_referral_levels,
    ),
    components(
        schemas(
            HealthResponse,
            crate::config::PlatformConfig,
            AuthResponse,
            Member,
            Wallet,
            Transaction,
            DashboardResponse,
            TeamSummary,
            SalaryResponse,
            SlabView,
            LevelView,
            TreeNodeView,
            PlacementEdge,
            BvEntry,
            BvSummary,
            SalarySlab,
            ReferralLevel,
            Product,
            Order,
            PurchaseOutcome,
            TransferOutcome,
            WithdrawOutcome,
            StkOutcome,
            SupportTicket,
            Announcement,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Member", description = "Profile, wallet and dashboard (auth required)"),
        (name = "Team", description = "Placement tree, BV and eligibility (auth required)"),
        (name = "Wallet", description = "Transfers, withdrawals, deposits, STK (auth required)"),
        (name = "Shop", description = "Product catalogue and purchases"),
        (name = "Support", description = "Support tickets (auth required)"),
        (name = "Public", description = "Reference tables and health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "ApexUnity Member API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let spec = ApiDoc::openapi();
        let json = spec.to_json();
        assert!(json.is_ok());
        assert!(json.unwrap().contains("ApexUnity Member API"));
    }

    #[test]
    fn test_core_endpoints_registered() {
        let spec = ApiDoc::openapi();
        let paths = spec.paths;
        assert!(paths.paths.contains_key("/api/v1/health"));
        assert!(paths.paths.contains_key("/api/v1/auth/register"));
        assert!(paths.paths.contains_key("/api/v1/team/tree"));
        assert!(paths.paths.contains_key("/api/v1/team/salary"));
        assert!(paths.paths.contains_key("/api/v1/wallet/transfer"));
    }

    #[test]
    fn test_security_scheme_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("should have components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
