// Library entry point for wishlist-api
// Exposes modules for testing

pub mod api;
pub mod auth;
pub mod config;
pub mod mail;
pub mod models;
pub mod services;
pub mod store;
