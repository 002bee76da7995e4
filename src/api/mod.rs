//! HTTP API for reading and replacing the served configuration.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/api/config` (GET)
//!
//!   Returns the current configuration in the [persisted JSON format][crate::config].
//!
//! ## `/api/config` (POST)
//!
//!   Expects a complete configuration in the same format. The candidate is validated,
//!   written to the configuration file and only then served.
//!
//!   For successful updates, returns HTTP 200 (OK) and:
//!
//!   ```json
//!   { "message": "Configuration updated successfully" }
//!   ```
//!
//!   Invalid configurations and malformed JSON are rejected with HTTP 400 (or 422/415 for JSON
//!   of the wrong shape or content type). A failure to write the configuration file returns
//!   HTTP 500. In every error case the body is `{"error": "..."}` and the running configuration
//!   is unchanged.
//!
//! ## `/ws` (GET)
//!
//!   Upgrades to a WebSocket that receives one text message per processed DNS question:
//!
//!   ```text
//!   Received DNS request from 192.0.2.10 for www.example.com. (Type: A)
//!   ```
//!
//!   A subscriber that can't keep up misses the oldest messages; it never slows the DNS server.
//!
//! ## `/` (GET)
//!
//!   Serves the file at [`Settings::index_path`][crate::settings::Settings::index_path], when
//!   configured.

mod api_error;
mod routes;
pub mod server;

pub use server::new;
