use thiserror::Error;

use crate::core_types::{Bv, MemberId};
use crate::network::model::Side;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("member {0} has no placement record")]
    MemberNotFound(MemberId),

    #[error("sponsor {0} does not resolve to a placed member")]
    SponsorNotFound(MemberId),

    #[error("member {0} is already placed in the tree")]
    AlreadyPlaced(MemberId),

    #[error("direct {side} slot under sponsor {sponsor} is occupied")]
    SlotOccupied { sponsor: MemberId, side: Side },

    #[error("ancestor walk from member {member} exceeded depth {depth}, tree is corrupt")]
    CorruptTree { member: MemberId, depth: u32 },

    #[error("BV amount must be positive, got {0}")]
    InvalidAmount(Bv),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl NetworkError {
    /// Transient failures are retryable; structural ones require
    /// operator intervention and must surface immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}
