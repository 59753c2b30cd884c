//! Car listing marketplace: REST API over Postgres plus a typed client with
//! upload coordination for listing images.

pub mod app;
pub mod auth;
pub mod cars;
pub mod client;
pub mod config;
pub mod db;
pub mod docs;
pub mod dto;
pub mod error;
pub mod state;
pub mod storage;
pub mod uploads;
pub mod users;
