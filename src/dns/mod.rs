//! DNS query resolution.
//!
//! Each inbound UDP datagram is handled by the [`QueryEngine`][engine::QueryEngine] against the
//! configuration snapshot that is current when it arrives. For every question:
//!
//! 1. The most specific configured zone is selected (see [`zone_matcher::match_zone`]).
//! 2. If a zone matched, the answer is synthesized from its records. A name or type the zone
//!    doesn't define simply yields no answer; it is never forwarded.
//! 3. If no zone matched, the question is forwarded to the configured `ExternalAddr` and its
//!    answer section is copied into the reply.
//!
//! # Records
//!
//! Records are keyed by fully qualified name and answered only for a query of exactly their
//! declared type, with a TTL of one hour.
//!
//! ## A
//!
//! `Data` is an IPv4 address.
//!
//! ```json
//! "www.example.com.": { "Type": "A", "Data": "10.0.0.1" }
//! ```
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 www.example.com +short A
//! 10.0.0.1
//! ```
//!
//! ## MX
//!
//! `Data` is the preference followed by the exchange name.
//!
//! ```json
//! "example.com.": { "Type": "MX", "Data": "10 mail.example.com." }
//! ```
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 example.com +short MX
//! 10 mail.example.com.
//! ```
//!
//! ## TXT
//!
//! `Data` is the text, served as-is (split into 255 byte strings when longer).
//!
//! ```json
//! "example.com.": { "Type": "TXT", "Data": "hello world" }
//! ```
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 example.com +short TXT
//! "hello world"
//! ```
//!
//! Any other declared type is accepted in the configuration but never answered.
//!
//! # Failures
//!
//! Unparsable record data, an unreachable or misbehaving upstream, and unsupported record types
//! only cost the question they affect. The reply is still sent with the answers that could be
//! produced, and every question is reported to the [`Notifier`][crate::notify::Notifier].

pub mod engine;
pub mod forwarder;
pub mod server;
pub mod synthesizer;
pub mod zone_matcher;

pub use engine::QueryEngine;
pub use forwarder::{DynForwarder, Forwarder, UdpForwarder};
pub use server::{new, DnsServer};
