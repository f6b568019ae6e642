//! Accounts and the TXT record values they publish.
//!
//! An account is created once by [registration][crate::api#register-post]. It owns a random
//! identity (the `X-Api-User` header value), a random 40 character API key (the `X-Api-Key`
//! header value, only ever stored as a salted hash), a random delegated subdomain and an
//! optional list of networks updates may originate from.

pub mod cidr;
pub mod password;
pub mod validation;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use cidr::CidrList;

/// A stored account, as read back from an [`AccountStore`][crate::store::AccountStore].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: Uuid,
    pub key_hash: String,
    pub subdomain: String,
    pub allow_from: CidrList,
}

/// A freshly registered account. The only place the plaintext API key ever exists.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: Uuid,
    pub key: String,
    pub subdomain: String,
    pub allow_from: CidrList,
}

impl Registration {
    /// Generate new random credentials and subdomain. Only the valid entries of `allow_from`
    /// are kept.
    #[must_use]
    pub fn generate(allow_from: &CidrList) -> Self {
        Registration {
            username: Uuid::new_v4(),
            key: password::generate_key(),
            subdomain: Uuid::new_v4().hyphenated().to_string(),
            allow_from: CidrList::new(allow_from.valid_entries()),
        }
    }
}

/// A TXT value published under a delegated subdomain.
///
/// Doubles as the JSON body of the [`/update`][crate::api#update-post] and
/// [`/delete`][crate::api#delete-post] endpoints.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TxtRecord {
    #[serde(default)]
    pub subdomain: String,
    #[serde(default, rename = "txt")]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::validation::{valid_key, valid_subdomain};

    #[test]
    fn generated_registrations() {
        let allow = CidrList::from(vec!["10.0.0.0/8", "bogus", "[::1]/128"]);
        let a = Registration::generate(&allow);
        let b = Registration::generate(&allow);
        assert_ne!(a.username, b.username);
        assert_ne!(a.subdomain, b.subdomain);
        assert!(valid_subdomain(&a.subdomain));
        assert!(valid_key(&a.key));
        assert_eq!(a.allow_from.as_slice(), ["10.0.0.0/8", "::1/128"]);
    }

    #[test]
    fn txt_record_json_shape() {
        let rec: TxtRecord =
            serde_json::from_str(r#"{"subdomain":"abc","txt":"value"}"#).unwrap();
        assert_eq!(rec.subdomain, "abc");
        assert_eq!(rec.value, "value");

        let rec: TxtRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(rec, TxtRecord::default());
    }
}
