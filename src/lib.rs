pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod uploads;
pub mod utils;
