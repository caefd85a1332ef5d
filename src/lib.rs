#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod event_handler;
pub mod models;
pub mod network;
pub mod session;
pub mod ui;
