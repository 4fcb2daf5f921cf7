pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod portal;
pub mod types;
