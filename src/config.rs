//! Served zone configuration.
//!
//! The configuration is persisted as JSON using the field names below:
//!
//! ```json
//! {
//!     "ServerAddr": "0.0.0.0:5353",
//!     "ExternalAddr": "9.9.9.9:53",
//!     "Zones": [
//!         {
//!             "Zone": "example.com.",
//!             "Records": {
//!                 "www.example.com.": { "Type": "A", "Data": "10.0.0.1" },
//!                 "example.com.": { "Type": "MX", "Data": "10 mail.example.com." }
//!             }
//!         }
//!     ]
//! }
//! ```
//!
//! A [`Config`] is never edited in place. Updates build a whole new value, run it through
//! [`Config::normalize`] and hand it to the [`ConfigStore`][crate::config_store::ConfigStore].
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use trust_dns_proto::rr::RecordType;

/// Port assumed for an `ExternalAddr` given as a bare IP.
pub const DEFAULT_DNS_PORT: u16 = 53;

/// The complete set of served zones plus the listener and upstream addresses.
///
/// Equality is structural: both addresses must be equal, the zone lists must have the same
/// length with pairwise equal zones (order matters), and each zone must hold the same record
/// names with the same type and data (record order is irrelevant).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(rename = "ServerAddr")]
    pub server_addr: String,
    #[serde(rename = "ExternalAddr")]
    pub external_addr: String,
    #[serde(rename = "Zones", default)]
    pub zones: Vec<ZoneConfig>,
}

/// A name suffix under which the configured records are authoritative.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct ZoneConfig {
    #[serde(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "Records", default)]
    pub records: HashMap<String, RecordConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct RecordConfig {
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "Data")]
    pub data: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ServerAddr must not be empty")]
    EmptyServerAddr,
    #[error("ExternalAddr must not be empty")]
    EmptyExternalAddr,
    #[error("ExternalAddr \"{0}\" is not an IP or IP:port")]
    InvalidExternalAddr(String),
    #[error("zone #{0} has an empty name")]
    EmptyZoneName(usize),
    #[error("record \"{name}\" has unrecognized type \"{record_type}\"")]
    UnknownRecordType { name: String, record_type: String },
    #[error("zone \"{zone}\" defines \"{name}\" more than once")]
    DuplicateRecord { zone: String, name: String },
}

impl Config {
    /// Validate the configuration and return it in normalized form: zone names and record keys
    /// lower-cased and fully qualified, record types upper-cased.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for the first structural problem found.
    pub fn normalize(self) -> Result<Self, ValidationError> {
        if self.server_addr.trim().is_empty() {
            return Err(ValidationError::EmptyServerAddr);
        }
        if self.external_addr.trim().is_empty() {
            return Err(ValidationError::EmptyExternalAddr);
        }
        if parse_upstream_addr(&self.external_addr).is_none() {
            return Err(ValidationError::InvalidExternalAddr(self.external_addr));
        }

        let mut zones = Vec::with_capacity(self.zones.len());
        for (idx, zone) in self.zones.into_iter().enumerate() {
            zones.push(zone.normalize(idx)?);
        }

        Ok(Self {
            server_addr: self.server_addr.trim().to_string(),
            external_addr: self.external_addr.trim().to_string(),
            zones,
        })
    }

    /// The external resolver as a socket address, if it parses.
    #[must_use]
    pub fn upstream_addr(&self) -> Option<SocketAddr> {
        parse_upstream_addr(&self.external_addr)
    }
}

impl ZoneConfig {
    fn normalize(self, idx: usize) -> Result<Self, ValidationError> {
        if self.zone.trim().is_empty() {
            return Err(ValidationError::EmptyZoneName(idx));
        }
        let zone = fqdn_lower(&self.zone);

        let mut records = HashMap::with_capacity(self.records.len());
        for (name, record) in self.records {
            let name = fqdn_lower(&name);
            let record = record.normalize(&name)?;
            if records.insert(name.clone(), record).is_some() {
                return Err(ValidationError::DuplicateRecord { zone, name });
            }
        }
        Ok(Self { zone, records })
    }
}

impl RecordConfig {
    fn normalize(self, name: &str) -> Result<Self, ValidationError> {
        let record_type = self.record_type.trim().to_ascii_uppercase();
        if RecordType::from_str(&record_type).is_err() {
            return Err(ValidationError::UnknownRecordType {
                name: name.to_string(),
                record_type: self.record_type,
            });
        }
        Ok(Self {
            record_type,
            data: self.data,
        })
    }

    /// The declared record type. Only meaningful for normalized records.
    #[must_use]
    pub fn rtype(&self) -> Option<RecordType> {
        RecordType::from_str(&self.record_type).ok()
    }
}

/// Lower-case a domain name and make it fully qualified.
#[must_use]
pub fn fqdn_lower(name: &str) -> String {
    let name = name.trim().to_ascii_lowercase();
    if name.ends_with('.') {
        name
    } else {
        format!("{name}.")
    }
}

fn parse_upstream_addr(addr: &str) -> Option<SocketAddr> {
    let addr = addr.trim();
    SocketAddr::from_str(addr)
        .ok()
        .or_else(|| {
            IpAddr::from_str(addr)
                .ok()
                .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
        })
}
