mod common;

mod auth;
mod cart;
mod content;
mod purchase;
