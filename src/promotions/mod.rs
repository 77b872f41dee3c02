// Promotion engine
//
// Three promotion kinds share one evaluation pipeline:
// - Campaign: time-bound, broadly scoped discount (percentage/fixed/shipping)
// - Coupon: code-activated discount the customer enters at checkout
// - BogoOffer: "buy N of X, get M of Y at a discount"
//
// `eligibility` decides whether a promotion may apply (pure reads, advisory);
// `calculator` turns a validated promotion into a monetary discount;
// `service` orchestrates both across all kinds and produces the breakdown the
// checkout transaction persists. The authoritative limit checks happen again
// inside that transaction.

pub mod calculator;
pub mod eligibility;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use calculator::*;
pub use eligibility::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use service::*;
