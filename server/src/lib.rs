//! FlightSurety Oracle Server Library
//!
//! This library exports the core modules of the oracle relay: the chain
//! client boundary, the oracle registry, the request dispatcher and the
//! HTTP status surface.

pub mod app_state;
pub mod chain;
pub mod config;
pub mod event_listener;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
