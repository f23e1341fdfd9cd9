pub mod accuracy;
pub mod admin;
pub mod api;
pub mod config;
pub mod feed;
pub mod http_client;
pub mod models;
pub mod outcome;
pub mod persist;
pub mod provider;
pub mod session;
pub mod state;
pub mod vote_gate;
