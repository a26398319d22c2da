//! # tvmount
//!
//! HTTP server, CLI and outbound integrations for the TV-installation
//! booking marketplace. The booking rules live in `tvmount-core`; this
//! crate wires them to axum, clap and the third-party services.

pub mod api;
pub mod cli;
pub mod config;
pub mod integrations;
