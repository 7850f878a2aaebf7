//! # Services
//!
//! The two roles of the exchange, each driving a session over a [`Transport`](crate::transport::Transport).
//!
//! - **Server**: [`server::LookupServer`] answers Hello, Lookup and End from its lookup table
//! - **Client**: [`client::LookupClient`] sends Hello, one Lookup per query, and End

pub mod client;
pub mod server;

pub use client::{ExchangeReport, LookupClient, LookupOutcome};
pub use server::{load_table, LookupServer};
