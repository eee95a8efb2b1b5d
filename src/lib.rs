//! Chat Realtime - connection and subscription core for a chat client
//!
//! This crate keeps one STOMP-over-WebSocket session per process, multiplexes
//! room and private-chat topic subscriptions over it, and exposes channel
//! adapters whose `connected` signal follows the real transport lifecycle.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
