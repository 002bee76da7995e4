//! Error types.

use crate::config::ValidationError;
use std::net::IpAddr;
use trust_dns_proto::error::ProtoError;
use trust_dns_proto::rr::RecordType;

/// Error enumerates the possible Zone Crab error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned at startup when the persisted configuration can't be read, parsed or validated.
    /// The process does not start serving when this occurs.
    #[error("failed to load DNS configuration: {0}")]
    ConfigLoad(Box<Error>),

    /// Returned when a candidate configuration is structurally invalid. The current
    /// configuration is retained.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    /// Returned when a validated configuration could not be written to durable storage. The
    /// in-memory snapshot is left unchanged.
    #[error("failed to persist configuration: {0}")]
    ConfigPersist(Box<Error>),

    /// Returned when a configured record's `Data` can't be turned into a resource record of its
    /// declared type.
    #[error("cannot build {record_type} record for \"{name}\" from \"{data}\"")]
    RecordSynthesis {
        name: String,
        record_type: RecordType,
        data: String,
    },

    /// Returned when a matching record declares a type that can't be served.
    #[error("unsupported record type {0}")]
    UnsupportedRecordType(RecordType),

    /// Returned when the external resolver did not answer within the forward timeout.
    #[error("forward to {0} timed out")]
    ForwardTimeout(String),

    /// Returned when the external resolver can't be reached.
    #[error("forward to {upstream} failed: {source}")]
    Forward {
        upstream: String,
        #[source]
        source: std::io::Error,
    },

    /// Returned when the external resolver's reply can't be used.
    #[error("malformed reply from {upstream}: {reason}")]
    MalformedUpstreamReply { upstream: String, reason: String },

    /// Returned when the configured `ExternalAddr` is not an `ip` or `ip:port` value.
    #[error("invalid external resolver address \"{0}\"")]
    InvalidUpstreamAddr(String),

    /// Returned when the DNS socket can't be bound.
    #[error("cannot listen for DNS on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Returned when the [`Settings::api_bind_addr`][`crate::settings::Settings::api_bind_addr`]
    /// is not a loopback address, or an address within a private network space. The
    /// [HTTP API][crate::api] can replace the served zones without authentication so it must
    /// never be exposed publicly.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when a numeric setting that sizes a channel or a timer is zero.
    #[error("setting \"{0}\" must be greater than zero")]
    InvalidSetting(&'static str),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred: {0}")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk fails due to invalid JSON content.
    #[error("invalid JSON: {0}")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when a DNS message can't be encoded or decoded.
    #[error("DNS error: {0}")]
    DNSError(#[from] ProtoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_cause_is_reported_once() {
        let err = Error::ConfigLoad(Box::new(Error::InvalidUpstreamAddr("nowhere".to_string())));
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(
            format!("{:#}", anyhow::Error::from(err)),
            "failed to load DNS configuration: invalid external resolver address \"nowhere\""
        );

        let err = Error::ConfigPersist(Box::new(Error::InvalidSetting("x")));
        assert!(std::error::Error::source(&err).is_none());
    }
}
