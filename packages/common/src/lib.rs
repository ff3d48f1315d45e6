pub mod access;
pub mod cart;
pub mod content;
pub mod filter;
pub mod ledger;
pub mod payout;
pub mod purchase;
pub mod role;

pub use access::{AccessDecision, AccessLevel, ItemFacts, Viewer};
pub use content::{ApprovalStatus, ItemType, PlanType};
pub use payout::{PayoutMethod, PayoutStatus};
pub use purchase::PurchaseStatus;
pub use role::Role;
