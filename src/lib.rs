//! Pagecast Server Library
//!
//! A shared presentation session: one PDF, one current page, pushed live to
//! every connected viewer, plus a chat side channel over MQTT.
//!
//! # Modules
//!
//! - `session`: session state, viewer registry, broadcaster and gateway
//! - `storage`: flat directory of uploaded documents
//! - `render`: page rasterization
//! - `relay`: chat relay (MQTT or in-process)
//! - `routes`: HTTP and WebSocket binding

pub mod config;
pub mod error;
pub mod relay;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
