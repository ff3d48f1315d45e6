pub mod access;
pub mod cart;
pub mod earnings;
pub mod gateway;
pub mod payout;
pub mod purchase;
