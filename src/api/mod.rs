pub mod chat;
pub(crate) mod common;
pub mod health;
pub mod models;
