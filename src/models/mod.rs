// src/models/mod.rs

pub mod account;
pub mod comment;
pub mod post;
