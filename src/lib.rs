// src/lib.rs

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod guard;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

pub use routes::create_router;
