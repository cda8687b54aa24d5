#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod entities;
pub mod events;
pub mod framework;
pub mod gateways;
pub mod orchestrator;
pub mod pricing;
pub mod processors;
pub mod providers;
pub mod store;
pub mod utils;
