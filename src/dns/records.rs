//! The static part of the zone: records parsed from the config, plus the zone's SOA.

use crate::config::{fqdn, Config};
use crate::error::Error;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, error};
use trust_dns_proto::rr::rdata::SOA;
use trust_dns_server::client::rr::rdata::TXT;
use trust_dns_server::client::rr::{LowerName, Name, RData, Record, RecordType};

/// TTL for static records that don't name one.
pub const DEFAULT_TTL: u32 = 3600;

lazy_static! {
    static ref SERIAL_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year][month][day][hour]");
}

#[derive(Debug, Clone)]
pub struct StaticRecords {
    records: HashMap<(LowerName, RecordType), Vec<Record>>,
    names: HashSet<LowerName>,
    soa: Record,
}

impl StaticRecords {
    /// Build the static zone from `config`. Unparseable record strings are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DNSError`] if the SOA can't be built from the configured names.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let soa = soa_record(config)?;
        let mut table = StaticRecords {
            records: HashMap::default(),
            names: HashSet::default(),
            soa: soa.clone(),
        };
        table.insert(soa);
        for line in &config.records {
            match parse_record(line) {
                Ok(record) => {
                    debug!(name = %record.name(), rtype = %record.record_type(), "static record");
                    table.insert(record);
                }
                Err(err) => error!("skipping static record: {err}"),
            }
        }
        Ok(table)
    }

    fn insert(&mut self, record: Record) {
        let name = LowerName::new(record.name());
        self.names.insert(name.clone());
        self.records
            .entry((name, record.record_type()))
            .or_default()
            .push(record);
    }

    /// Records of exactly `rtype` at `name`.
    #[must_use]
    pub fn get(&self, name: &LowerName, rtype: RecordType) -> &[Record] {
        self.records
            .get(&(name.clone(), rtype))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Records of `rtype` at `name`, or the name's CNAME when it has none of that type.
    #[must_use]
    pub fn lookup(&self, name: &LowerName, rtype: RecordType) -> Vec<Record> {
        let records = self.get(name, rtype);
        if records.is_empty() {
            self.get(name, RecordType::CNAME).to_vec()
        } else {
            records.to_vec()
        }
    }

    /// Whether any static record is owned by exactly `name`.
    #[must_use]
    pub fn contains_name(&self, name: &LowerName) -> bool {
        self.names.contains(name)
    }

    /// Whether `name` is, or is a descendant of, a name owning a static record.
    #[must_use]
    pub fn covers(&self, name: &LowerName) -> bool {
        self.names.iter().any(|known| known.zone_of(name))
    }

    #[must_use]
    pub fn soa(&self) -> &Record {
        &self.soa
    }
}

/// Build the zone's SOA record. The serial is the startup time as `YYYYMMDDHH`.
///
/// # Errors
///
/// Returns [`Error::DNSError`] if the configured admin mailbox isn't a valid name.
pub fn soa_record(config: &Config) -> Result<Record, Error> {
    // NB: the fallback is unreachable: known format producing values that always parse as u32.
    let serial: u32 = OffsetDateTime::now_utc()
        .format(&SERIAL_FORMATTER)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    let soa = SOA::new(
        fqdn(&config.ns_domain),
        config.ns_admin()?,
        serial,
        28_800,  // 8 hours.
        7_200,   // 2 hours.
        604_800, // 1 week.
        86_400,  // 1 day.
    );
    Ok(Record::from_rdata(
        fqdn(&config.domain),
        DEFAULT_TTL,
        RData::SOA(soa),
    ))
}

/// Parse a static record of the form `<name> [ttl] [IN] <TYPE> <rdata>`.
///
/// Supported types are `A`, `AAAA`, `CNAME`, `NS` and `TXT`. Owner and target names are
/// lowercased and made fully qualified. TXT data may be quoted and may contain spaces.
///
/// # Errors
///
/// Returns [`Error::InvalidRecord`] describing the first problem found.
pub fn parse_record(line: &str) -> Result<Record, Error> {
    let invalid = |reason: &str| Error::InvalidRecord {
        record: line.to_string(),
        reason: reason.to_string(),
    };
    let mut tokens = line.split_whitespace();

    let name = tokens.next().ok_or_else(|| invalid("empty record"))?;
    let name = parse_name(name).map_err(|_| invalid("invalid owner name"))?;

    let mut token = tokens.next().ok_or_else(|| invalid("missing type"))?;
    let ttl = match token.parse::<u32>() {
        Ok(ttl) => {
            token = tokens.next().ok_or_else(|| invalid("missing type"))?;
            ttl
        }
        Err(_) => DEFAULT_TTL,
    };
    if token.eq_ignore_ascii_case("IN") {
        token = tokens.next().ok_or_else(|| invalid("missing type"))?;
    }
    let rtype =
        RecordType::from_str(&token.to_ascii_uppercase()).map_err(|_| invalid("unknown type"))?;

    let rest: Vec<&str> = tokens.collect();
    let single = || match rest.as_slice() {
        [value] => Ok(*value),
        _ => Err(invalid("expected exactly one data field")),
    };
    let rdata = match rtype {
        RecordType::A => RData::A(
            Ipv4Addr::from_str(single()?).map_err(|_| invalid("invalid IPv4 address"))?,
        ),
        RecordType::AAAA => RData::AAAA(
            Ipv6Addr::from_str(single()?).map_err(|_| invalid("invalid IPv6 address"))?,
        ),
        RecordType::CNAME => {
            RData::CNAME(parse_name(single()?).map_err(|_| invalid("invalid target name"))?)
        }
        RecordType::NS => {
            RData::NS(parse_name(single()?).map_err(|_| invalid("invalid target name"))?)
        }
        RecordType::TXT => {
            if rest.is_empty() {
                return Err(invalid("missing TXT data"));
            }
            let text = rest.join(" ");
            let text = text
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(&text);
            RData::TXT(TXT::new(vec![text.to_string()]))
        }
        _ => return Err(invalid("unsupported type")),
    };
    Ok(Record::from_rdata(name, ttl, rdata))
}

fn parse_name(name: &str) -> Result<Name, Error> {
    Ok(fqdn(&Name::from_str(name)?))
}
