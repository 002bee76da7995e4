use crate::config::{fqdn_lower, RecordConfig, ZoneConfig};
use crate::error::Error;
use std::net::Ipv4Addr;
use trust_dns_proto::rr::rdata::{MX, TXT};
use trust_dns_proto::rr::{Name, RData, Record, RecordType};

/// TTL of every locally synthesized record.
pub const RECORD_TTL: u32 = 3600;

// A TXT character-string holds at most 255 bytes.
const MAX_CHARACTER_STRING: usize = 255;

/// Build the answer for `name`/`query_type` from a matched zone.
///
/// Returns `Ok(None)` when the zone has no record for the name, or has one of a different type.
///
/// # Errors
///
/// Returns [`Error::RecordSynthesis`] when the record's data can't be parsed for its type, and
/// [`Error::UnsupportedRecordType`] when the record declares a type that isn't served.
pub fn synthesize(
    zone: &ZoneConfig,
    name: &Name,
    query_type: RecordType,
) -> Result<Option<Record>, Error> {
    let Some(record) = zone.records.get(&fqdn_lower(&name.to_string())) else {
        return Ok(None);
    };
    if record.rtype() != Some(query_type) {
        return Ok(None);
    }

    let rdata = match query_type {
        RecordType::A => a_rdata(name, record)?,
        RecordType::MX => mx_rdata(name, record)?,
        RecordType::TXT => txt_rdata(record),
        other => return Err(Error::UnsupportedRecordType(other)),
    };
    Ok(Some(Record::from_rdata(name.clone(), RECORD_TTL, rdata)))
}

fn a_rdata(name: &Name, record: &RecordConfig) -> Result<RData, Error> {
    record
        .data
        .trim()
        .parse::<Ipv4Addr>()
        .map(RData::A)
        .map_err(|_| synthesis_error(name, RecordType::A, record))
}

// MX data is "<preference> <exchange>".
fn mx_rdata(name: &Name, record: &RecordConfig) -> Result<RData, Error> {
    let mut fields = record.data.split_whitespace();
    let (Some(preference), Some(exchange), None) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(synthesis_error(name, RecordType::MX, record));
    };
    let preference: u16 = preference
        .parse()
        .map_err(|_| synthesis_error(name, RecordType::MX, record))?;
    let exchange = if exchange.ends_with('.') {
        Name::from_ascii(exchange)
    } else {
        Name::from_ascii(format!("{exchange}."))
    }
    .map_err(|_| synthesis_error(name, RecordType::MX, record))?;
    Ok(RData::MX(MX::new(preference, exchange)))
}

fn txt_rdata(record: &RecordConfig) -> RData {
    let mut strings = Vec::new();
    let mut current = String::new();
    for c in record.data.chars() {
        if current.len() + c.len_utf8() > MAX_CHARACTER_STRING {
            strings.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    strings.push(current);
    RData::TXT(TXT::new(strings))
}

fn synthesis_error(name: &Name, record_type: RecordType, record: &RecordConfig) -> Error {
    Error::RecordSynthesis {
        name: name.to_string(),
        record_type,
        data: record.data.clone(),
    }
}
