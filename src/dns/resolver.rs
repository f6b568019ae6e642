//! Transport independent query resolution.
//!
//! A [`Resolver`] turns the questions of one DNS message into a [`Resolution`]: answers,
//! authority section, response code, the authoritative flag and the EDNS pseudo-record to
//! respond with. It reads the static zone, the store of published TXT values and its own
//! challenge slot, and never writes anything.

use crate::config::{fqdn, Config};
use crate::dns::challenge::OwnChallenge;
use crate::dns::records::StaticRecords;
use crate::error::Error;
use crate::store::DynAccountStore;
use std::sync::Arc;
use tracing::{debug, error};
use trust_dns_proto::op::{Edns, ResponseCode};
use trust_dns_server::client::op::LowerQuery;
use trust_dns_server::client::rr::rdata::TXT;
use trust_dns_server::client::rr::{LowerName, Name, RData, Record, RecordType};

/// TTL of dynamic TXT answers. Challenge values change between validations.
pub const TXT_TTL: u32 = 1;

/// Bounds on the UDP payload size advertised in responses.
pub const MIN_PAYLOAD: u16 = 512;
pub const MAX_PAYLOAD: u16 = 4096;

const OWN_CHALLENGE_LABEL: &str = "_acme-challenge";

/// The outcome of resolving one message's questions.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub response_code: ResponseCode,
    pub authoritative: bool,
    pub answers: Vec<Record>,
    pub name_servers: Vec<Record>,
    pub edns: Option<Edns>,
}

impl Resolution {
    fn new(response_code: ResponseCode) -> Self {
        Resolution {
            response_code,
            authoritative: false,
            answers: Vec::default(),
            name_servers: Vec::default(),
            edns: None,
        }
    }
}

pub struct Resolver {
    own_domain: LowerName,
    own_challenge_name: LowerName,
    records: Arc<StaticRecords>,
    store: DynAccountStore,
    own_challenge: OwnChallenge,
}

impl Resolver {
    /// # Errors
    ///
    /// Returns [`Error::DNSError`] if the configured domain can't carry the own challenge name.
    pub fn new(
        config: &Config,
        records: Arc<StaticRecords>,
        store: DynAccountStore,
    ) -> Result<Self, Error> {
        let own_domain = config.own_domain();
        let own_challenge_name =
            Name::from_ascii(OWN_CHALLENGE_LABEL)?.append_domain(&Name::from(&own_domain))?;
        Ok(Resolver {
            own_domain,
            own_challenge_name: LowerName::new(&own_challenge_name),
            records,
            store,
            own_challenge: OwnChallenge::default(),
        })
    }

    /// A handle to this engine's own challenge slot.
    #[must_use]
    pub fn own_challenge(&self) -> OwnChallenge {
        self.own_challenge.clone()
    }

    /// Resolve `queries`, honouring the request's EDNS pseudo-record if it had one.
    ///
    /// The response code is that of the last question. The response is authoritative if any
    /// question was, and an authoritative NXDOMAIN carries the zone SOA in its authority
    /// section.
    pub async fn resolve(&self, queries: &[LowerQuery], edns: Option<&Edns>) -> Resolution {
        let response_edns = edns.map(|request| {
            let mut edns = Edns::new();
            edns.set_max_payload(request.max_payload().clamp(MIN_PAYLOAD, MAX_PAYLOAD));
            edns.set_version(0);
            edns
        });

        if let (Some(request), Some(mut edns)) = (edns, response_edns.clone()) {
            if request.version() > 0 {
                debug!("unsupported EDNS version {}", request.version());
                edns.set_rcode_high(ResponseCode::BADVERS.high());
                let mut resolution = Resolution::new(ResponseCode::BADVERS);
                resolution.edns = Some(edns);
                return resolution;
            }
        }

        let mut resolution = Resolution::new(ResponseCode::NoError);
        resolution.edns = response_edns;
        for query in queries {
            let (answers, response_code, authoritative) = self.answer(query).await;
            resolution.answers.extend(answers);
            resolution.response_code = response_code;
            resolution.authoritative |= authoritative;
        }
        if resolution.authoritative && resolution.response_code == ResponseCode::NXDomain {
            resolution.name_servers.push(self.records.soa().clone());
        }
        resolution
    }

    async fn answer(&self, query: &LowerQuery) -> (Vec<Record>, ResponseCode, bool) {
        let name = LowerName::new(&fqdn(&Name::from(query.name())));
        let qtype = query.query_type();
        let is_own_challenge = name == self.own_challenge_name;
        let authoritative = is_own_challenge || self.is_authoritative(&name);

        let answers = match qtype {
            RecordType::TXT if is_own_challenge => self.own_challenge_answer(&name).await,
            RecordType::TXT => {
                let mut answers = self.records.get(&name, RecordType::TXT).to_vec();
                answers.extend(self.dynamic_answer(&name).await);
                if answers.is_empty() {
                    self.records.lookup(&name, RecordType::TXT)
                } else {
                    answers
                }
            }
            _ => self.records.lookup(&name, qtype),
        };

        let response_code =
            if !answers.is_empty() || is_own_challenge || self.records.contains_name(&name) {
                ResponseCode::NoError
            } else {
                ResponseCode::NXDomain
            };
        debug!(
            "{name} {qtype}: {response_code}, {} answer(s), authoritative {authoritative}",
            answers.len()
        );
        (answers, response_code, authoritative)
    }

    fn is_authoritative(&self, name: &LowerName) -> bool {
        self.own_domain.zone_of(name) || self.records.covers(name)
    }

    async fn own_challenge_answer(&self, name: &LowerName) -> Vec<Record> {
        vec![txt_record(name, self.own_challenge.get().await)]
    }

    async fn dynamic_answer(&self, name: &LowerName) -> Vec<Record> {
        let name_ref = Name::from(name);
        let Some(label) = name_ref.iter().next() else {
            return Vec::default();
        };
        let subdomain = String::from_utf8_lossy(label).to_ascii_lowercase();
        match self.store.get_txt(&subdomain).await {
            Ok(values) => values
                .into_iter()
                .map(|value| txt_record(name, value))
                .collect(),
            Err(err) => {
                error!("TXT lookup for {subdomain} failed: {err}");
                Vec::default()
            }
        }
    }
}

fn txt_record(name: &LowerName, value: String) -> Record {
    Record::from_rdata(name.into(), TXT_TTL, RData::TXT(TXT::new(vec![value])))
}
