pub mod models;
pub mod repository;

pub use models::{KycStatus, Member, Transaction, TxStatus, TxType, Wallet};
pub use repository::{MemberRepository, NewMember, TransactionRepository, WalletRepository};
