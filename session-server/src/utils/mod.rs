//! Utilities - logging setup and client request metadata

pub mod client;
pub mod logger;

pub use client::{ClientInfo, client_ip};
