//! Exhibition booth recommendation service
//!
//! Builds sector-balanced candidate pools from an interest profile, hands
//! them to an external ranking service and manages each visitor's
//! displayed recommendation list: deletion with backfill and the
//! evaluation-completion gate.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
