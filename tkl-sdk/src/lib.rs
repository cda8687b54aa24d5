//! Wire types and signatures for the Topkilat top-up storefront.
//!
//! Enable the `client` feature for a typed HTTP client.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod signature;
