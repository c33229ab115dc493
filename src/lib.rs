pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod images;
pub mod recipes;
pub mod social;
pub mod state;
pub mod storage;
pub mod store;
pub mod users;
