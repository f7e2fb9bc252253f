pub mod models;
pub mod service;

pub use models::{Order, Product, ProductRepository};
pub use service::{PurchaseOutcome, ShopError, ShopService};
