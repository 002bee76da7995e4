use crate::error::Error;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Process settings. Unlike the served [`Config`][crate::config::Config] these are read once at
/// startup and never reloaded.
#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Settings {
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub forward_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub reload_interval: Duration,
    pub notify_capacity: usize,
    pub index_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            api_timeout: Duration::from_secs(10),
            forward_timeout: Duration::from_secs(2),
            reload_interval: Duration::from_secs(5),
            notify_capacity: 256,
            index_path: None,
        }
    }
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

impl Settings {
    /// Load settings from a JSON file. Missing fields take their default value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] or [`Error::InvalidJSON`] if the file can't be read or parsed, and
    /// any error of [`Settings::validate`].
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let settings: Settings = serde_json::from_reader(reader)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every setting the server can't run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsecureAPIBind`] if the API would listen on a public address and
    /// [`Error::InvalidSetting`] if `notify_capacity` or `reload_interval` is zero.
    pub fn validate(&self) -> Result<(), Error> {
        self.bind_addr_is_secure()?;
        if self.notify_capacity == 0 {
            return Err(Error::InvalidSetting("notify_capacity"));
        }
        if self.reload_interval.is_zero() {
            return Err(Error::InvalidSetting("reload_interval"));
        }
        Ok(())
    }

    /// Check that the API bind address is loopback or private.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsecureAPIBind`] otherwise.
    pub fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{ "forward_timeout": 1 }"#).unwrap();
        assert_eq!(settings.forward_timeout, Duration::from_secs(1));
        assert_eq!(settings.reload_interval, Duration::from_secs(5));
        assert_eq!(settings.api_bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert!(settings.index_path.is_none());
    }

    #[test]
    fn private_and_loopback_binds_are_allowed() {
        for addr in ["127.0.0.1:8080", "10.1.2.3:80", "[::1]:8080", "[fd00::1]:8080"] {
            let settings = Settings {
                api_bind_addr: addr.parse().unwrap(),
                ..Settings::default()
            };
            assert!(settings.bind_addr_is_secure().is_ok(), "{addr}");
        }
    }

    #[test]
    fn public_binds_are_rejected() {
        for addr in ["0.0.0.0:8080", "93.184.216.34:80", "[2606:2800::1]:8080"] {
            let settings = Settings {
                api_bind_addr: addr.parse().unwrap(),
                ..Settings::default()
            };
            assert!(matches!(
                settings.bind_addr_is_secure(),
                Err(Error::InsecureAPIBind(_))
            ));
        }
    }

    #[test]
    fn zero_sizes_are_rejected() {
        for (json, setting) in [
            (r#"{ "notify_capacity": 0 }"#, "notify_capacity"),
            (r#"{ "reload_interval": 0 }"#, "reload_interval"),
        ] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, "{json}").unwrap();
            match Settings::try_from_file(file.path()) {
                Err(Error::InvalidSetting(name)) => assert_eq!(name, setting),
                other => panic!("{json}: unexpected {other:?}"),
            }
        }
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn try_from_file_rejects_public_bind() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "api_bind_addr": "0.0.0.0:8080" }}"#).unwrap();
        assert!(matches!(
            Settings::try_from_file(file.path()),
            Err(Error::InsecureAPIBind(_))
        ));
    }
}
