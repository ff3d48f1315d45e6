pub mod cart;
pub mod cart_item;
pub mod content_item;
pub mod developer_earnings;
pub mod payout_request;
pub mod purchase;
pub mod role_permission;
pub mod user;
