pub mod config;
pub mod db;
pub mod handlers;
pub mod server;
pub mod vision;
