//! Explicit session lifecycle for the member dashboard.
//!
//! `bootstrap` produces a [`Session`] only when both the profile and the
//! wallet are available - the dashboard never renders partial financial
//! figures. Transient backend failures are retried per [`RetryPolicy`];
//! when retries exhaust, the last-known-good snapshot is served marked
//! stale. `teardown` ends the lifecycle and drops the cached snapshot.

pub mod cache;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::core_types::MemberId;
use crate::member::{Member, MemberRepository, Wallet, WalletRepository};
pub use cache::TtlCache;
pub use retry::{RetryPolicy, Transient};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("member {0} not found")]
    MemberNotFound(MemberId),

    #[error("wallet for member {0} not found")]
    WalletNotFound(MemberId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Transient for SessionError {
    fn is_transient(&self) -> bool {
        match self {
            SessionError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}

/// Profile + wallet pair; both present or neither.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberSnapshot {
    pub member: Member,
    pub wallet: Wallet,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Fetched from the backend this call
    Fresh,
    /// Served from the cache within its TTL
    Cached,
    /// Last-known-good fallback after retries exhausted
    Stale,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    pub member_id: MemberId,
    pub snapshot: MemberSnapshot,
    pub freshness: Freshness,
}

/// Where snapshots come from. The gateway uses [`PgSnapshotSource`];
/// tests substitute failure-injecting stubs.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, member: MemberId) -> Result<MemberSnapshot, SessionError>;
}

pub struct PgSnapshotSource {
    pool: PgPool,
}

impl PgSnapshotSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotSource for PgSnapshotSource {
    async fn fetch(&self, member: MemberId) -> Result<MemberSnapshot, SessionError> {
        // Both fetches run concurrently; completion order does not matter,
        // only that both succeed.
        let (profile, wallet) = futures::try_join!(
            MemberRepository::get_by_id(&self.pool, member),
            WalletRepository::get_by_member(&self.pool, member),
        )?;

        Ok(MemberSnapshot {
            member: profile.ok_or(SessionError::MemberNotFound(member))?,
            wallet: wallet.ok_or(SessionError::WalletNotFound(member))?,
            fetched_at: Utc::now(),
        })
    }
}

pub struct SessionManager {
    source: Arc<dyn SnapshotSource>,
    retry: RetryPolicy,
    cache: TtlCache<MemberId, MemberSnapshot>,
}

impl SessionManager {
    pub fn new(source: Arc<dyn SnapshotSource>, retry: RetryPolicy, cache_ttl: Duration) -> Self {
        Self {
            source,
            retry,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Start (or resume) a session for `member`.
    pub async fn bootstrap(&self, member: MemberId) -> Result<Session, SessionError> {
        if let Some(snapshot) = self.cache.get_fresh(&member) {
            return Ok(Session {
                member_id: member,
                snapshot,
                freshness: Freshness::Cached,
            });
        }

        match self.retry.run(|| self.source.fetch(member)).await {
            Ok(snapshot) => {
                self.cache.put(member, snapshot.clone());
                Ok(Session {
                    member_id: member,
                    snapshot,
                    freshness: Freshness::Fresh,
                })
            }
            Err(e) if e.is_transient() => match self.cache.last_known(&member) {
                Some((snapshot, age)) => {
                    tracing::warn!(
                        member,
                        age_secs = age.as_secs(),
                        "serving stale snapshot after retries exhausted: {e}"
                    );
                    Ok(Session {
                        member_id: member,
                        snapshot,
                        freshness: Freshness::Stale,
                    })
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Force a refetch, bypassing the fresh-cache fast path.
    pub async fn refresh(&self, member: MemberId) -> Result<Session, SessionError> {
        self.cache.invalidate(&member);
        self.bootstrap(member).await
    }

    /// End the lifecycle for `member` (logout / re-authentication).
    pub fn teardown(&self, member: MemberId) {
        self.cache.invalidate(&member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::KycStatus;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn snapshot(member: MemberId) -> MemberSnapshot {
        MemberSnapshot {
            member: Member {
                id: member,
                name: "Alice Johnson".to_string(),
                email: "alice@example.com".to_string(),
                mobile: "9900000001".to_string(),
                referral_code: "AU000003".to_string(),
                sponsor_id: None,
                sponsor_name: None,
                preferred_side: None,
                join_date: Utc::now(),
                kyc_status: KycStatus::Verified,
                rank: "Associate".to_string(),
            },
            wallet: Wallet {
                member_id: member,
                main_balance: Decimal::new(125_000, 2),
                topup_balance: Decimal::ZERO,
                purchased_amount: Decimal::ZERO,
                referral_bonus: Decimal::ZERO,
                business_volume: 58_000,
                stk_balance: Decimal::ZERO,
                updated_at: Utc::now(),
            },
            fetched_at: Utc::now(),
        }
    }

    /// Fails transiently `failures` times, then succeeds.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakySource {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for FlakySource {
        async fn fetch(&self, member: MemberId) -> Result<MemberSnapshot, SessionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(SessionError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(snapshot(member))
            }
        }
    }

    fn manager(source: Arc<dyn SnapshotSource>) -> SessionManager {
        SessionManager::new(
            source,
            RetryPolicy::new(3, Duration::from_millis(1)),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn bootstrap_retries_transient_failures() {
        let source = Arc::new(FlakySource::new(2));
        let mgr = manager(source.clone());

        let session = mgr.bootstrap(7).await.unwrap();
        assert_eq!(session.freshness, Freshness::Fresh);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn second_bootstrap_hits_the_cache() {
        let source = Arc::new(FlakySource::new(0));
        let mgr = manager(source.clone());

        mgr.bootstrap(7).await.unwrap();
        let session = mgr.bootstrap(7).await.unwrap();
        assert_eq!(session.freshness, Freshness::Cached);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    /// Succeeds for the first `successes` calls, then fails transiently.
    struct DegradingSource {
        successes: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SnapshotSource for DegradingSource {
        async fn fetch(&self, member: MemberId) -> Result<MemberSnapshot, SessionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.successes {
                Ok(snapshot(member))
            } else {
                Err(SessionError::Database(sqlx::Error::PoolTimedOut))
            }
        }
    }

    #[tokio::test]
    async fn falls_back_to_stale_snapshot_when_retries_exhaust() {
        let source = Arc::new(DegradingSource {
            successes: 1,
            calls: AtomicU32::new(0),
        });
        let mgr = SessionManager::new(
            source,
            RetryPolicy::new(2, Duration::from_millis(1)),
            // Zero TTL: the snapshot immediately leaves the fast path
            Duration::ZERO,
        );

        let first = mgr.bootstrap(7).await.unwrap();
        assert_eq!(first.freshness, Freshness::Fresh);

        // Backend is now down; retries exhaust and the old snapshot serves.
        let second = mgr.bootstrap(7).await.unwrap();
        assert_eq!(second.freshness, Freshness::Stale);
        assert_eq!(second.snapshot.wallet.business_volume, 58_000);
    }

    #[tokio::test]
    async fn error_surfaces_when_nothing_is_cached() {
        let source = Arc::new(DegradingSource {
            successes: 0,
            calls: AtomicU32::new(0),
        });
        let mgr = SessionManager::new(
            source,
            RetryPolicy::new(2, Duration::from_millis(1)),
            Duration::from_secs(60),
        );

        let err = mgr.bootstrap(7).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn terminal_errors_surface_immediately() {
        struct MissingSource;
        #[async_trait]
        impl SnapshotSource for MissingSource {
            async fn fetch(&self, member: MemberId) -> Result<MemberSnapshot, SessionError> {
                Err(SessionError::MemberNotFound(member))
            }
        }

        let mgr = manager(Arc::new(MissingSource));
        let err = mgr.bootstrap(7).await.unwrap_err();
        assert!(matches!(err, SessionError::MemberNotFound(7)));
    }

    #[tokio::test]
    async fn teardown_drops_the_snapshot() {
        let source = Arc::new(FlakySource::new(0));
        let mgr = manager(source.clone());

        mgr.bootstrap(7).await.unwrap();
        mgr.teardown(7);
        let session = mgr.bootstrap(7).await.unwrap();
        assert_eq!(session.freshness, Freshness::Fresh);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
