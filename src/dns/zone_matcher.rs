use crate::config::{Config, ZoneConfig};

/// Find the most specific configured zone for `query_name`.
///
/// `query_name` must be lower-cased and fully qualified, as produced by
/// [`fqdn_lower`][crate::config::fqdn_lower]. A zone matches when its name is a plain suffix of
/// the query name, so zone `example.com.` also claims `badexample.com.`. The longest matching
/// zone wins; among zones of the same length the first one in configuration order wins.
///
/// The returned zone borrows from `config`, i.e. from the snapshot the caller is resolving
/// against.
#[must_use]
pub fn match_zone<'a>(config: &'a Config, query_name: &str) -> Option<&'a ZoneConfig> {
    let mut best: Option<&ZoneConfig> = None;
    for zone in &config.zones {
        if !query_name.ends_with(zone.zone.as_str()) {
            continue;
        }
        if best.map_or(true, |b| zone.zone.len() > b.zone.len()) {
            best = Some(zone);
        }
    }
    best
}
