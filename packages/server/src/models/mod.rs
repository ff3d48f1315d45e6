pub mod auth;
pub mod cart;
pub mod content;
pub mod earnings;
pub mod payout;
pub mod purchase;
pub mod shared;
