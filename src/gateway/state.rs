use std::sync::Arc;

use crate::config::PlatformConfig;
use crate::db::Database;
use crate::network::eligibility::{ReferralScale, SalaryScale};
use crate::network::placement::PlacementService;
use crate::network::volume::VolumeService;
use crate::session::SessionManager;
use crate::shop::ShopService;
use crate::user_auth::UserAuthService;
use crate::wallet::WalletService;

/// Shared gateway state. Everything is Arc'd; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL pool wrapper
    pub db: Arc<Database>,
    /// Member registration / login / JWT verification
    pub user_auth: Arc<UserAuthService>,
    /// Placement tree reads and writes
    pub placement: Arc<PlacementService>,
    /// BV crediting, sweeps and summaries
    pub volume: Arc<VolumeService>,
    /// Dashboard bootstrap with retry + cache fallback
    pub session: Arc<SessionManager>,
    /// Balance operations
    pub wallet: Arc<WalletService>,
    /// Catalogue + purchases
    pub shop: Arc<ShopService>,
    /// Active salary plan
    pub salary_scale: Arc<SalaryScale>,
    /// Active referral commission plan
    pub referral_scale: Arc<ReferralScale>,
    /// Fee and threshold constants
    pub platform: PlatformConfig,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<Database>,
        user_auth: Arc<UserAuthService>,
        placement: Arc<PlacementService>,
        volume: Arc<VolumeService>,
        session: Arc<SessionManager>,
        wallet: Arc<WalletService>,
        shop: Arc<ShopService>,
        salary_scale: Arc<SalaryScale>,
        referral_scale: Arc<ReferralScale>,
        platform: PlatformConfig,
    ) -> Self {
        Self {
            db,
            user_auth,
            placement,
            volume,
            session,
            wallet,
            shop,
            salary_scale,
            referral_scale,
            platform,
        }
    }
}
