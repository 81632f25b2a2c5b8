pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod rpc;
pub mod state;
pub mod storage;
