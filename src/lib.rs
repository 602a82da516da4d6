//! Polls a fixed set of third-party status pages, normalizes what they report
//! into one status model, and republishes it over HTTP and WebSocket.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod source;
pub mod status;
pub mod upstream;

#[cfg(test)]
mod testing;
