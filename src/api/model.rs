use crate::account::{Account, Registration, TxtRecord};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct RegisterRequest {
    #[serde(default)]
    pub allowfrom: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(super) struct RegisterResult {
    pub username: String,
    pub password: String,
    pub fulldomain: String,
    pub subdomain: String,
    pub allowfrom: Vec<String>,
}

impl RegisterResult {
    pub fn new(registration: Registration, fulldomain: String) -> Self {
        RegisterResult {
            username: registration.username.hyphenated().to_string(),
            password: registration.key,
            fulldomain,
            subdomain: registration.subdomain,
            allowfrom: registration.allow_from.as_slice().to_vec(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, Ord, PartialOrd, Eq, PartialEq)]
pub(super) struct TxtResult {
    pub txt: String,
}

/// An update or delete request that passed authentication, stashed in the request extensions
/// for the route handler.
#[derive(Debug, Clone)]
pub(super) struct AuthorizedRecord {
    pub account: Account,
    pub record: TxtRecord,
}
