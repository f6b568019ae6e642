//! Authentication and authorization of `/update` and `/delete` requests.
//!
//! Every rejection is the same [`Error::Forbidden`], and every path to it verifies exactly one
//! password hash (the account's, or a dummy when there is no account to check against). A caller
//! can't tell from the response or its timing whether the identity, the key, the source address
//! or the subdomain was wrong.

use crate::account::password::{verify_key, DUMMY_HASH};
use crate::account::validation::{valid_key, valid_username};
use crate::account::{Account, TxtRecord};
use crate::api::api_error::APIError;
use crate::api::model::AuthorizedRecord;
use crate::api::server::AppState;
use crate::error::Error;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use http_body::{LengthLimitError, Limited};
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info};

const USER_HEADER: &str = "X-Api-User";
const KEY_HEADER: &str = "X-Api-Key";

/// Largest `/update` or `/delete` body read before authenticating. A well-formed body is a
/// subdomain and a 43 character value.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Middleware admitting only requests whose credentials, source address and body subdomain
/// match a single account. The decoded body is passed on as an [`AuthorizedRecord`] extension.
pub(super) async fn authenticate(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, APIError> {
    let (mut parts, body) = request.into_parts();
    let bytes = hyper::body::to_bytes(Limited::new(body, MAX_BODY_BYTES))
        .await
        .map_err(|err| match err.downcast::<LengthLimitError>() {
            Ok(_) => Error::PayloadTooLarge(MAX_BODY_BYTES),
            Err(err) => Error::Body(err),
        })?;
    let record: TxtRecord = serde_json::from_slice(&bytes).map_err(Error::MalformedJson)?;

    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let account = authorize(&state, &parts.headers, peer, &record, verify_key).await?;
    info!(subdomain = %account.subdomain, "authorized {}", parts.uri.path());

    parts.extensions.insert(AuthorizedRecord { account, record });
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Checks a request against the account it names. `verify` compares a key with a stored hash
/// and is called exactly once on every path, on the blocking pool.
async fn authorize<V>(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    record: &TxtRecord,
    verify: V,
) -> Result<Account, Error>
where
    V: Fn(&str, &str) -> bool + Send + 'static,
{
    let user = header_str(headers, USER_HEADER);
    let key = header_str(headers, KEY_HEADER).to_string();

    let username = match valid_username(user) {
        Some(username) if valid_key(&key) => username,
        _ => {
            debug!("malformed credentials");
            return reject(verify, key).await;
        }
    };
    let account = match state.store.get_by_username(username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            debug!(%username, "unknown user");
            return reject(verify, key).await;
        }
        Err(err) => {
            verify_dummy(verify, key).await;
            return Err(err);
        }
    };

    if !verify_blocking(verify, key, account.key_hash.clone()).await? {
        debug!(%username, "wrong key");
        return Err(Error::Forbidden);
    }

    let source_allowed = if state.config.use_header {
        account
            .allow_from
            .allows_any(forwarded_addrs(headers, &state.config.header_name))
    } else {
        peer.map_or_else(
            || account.allow_from.is_unrestricted(),
            |ip| account.allow_from.allows(ip),
        )
    };
    if !source_allowed {
        debug!(%username, ?peer, "source address not allowed");
        return Err(Error::Forbidden);
    }

    if record.subdomain != account.subdomain {
        debug!(%username, subdomain = %record.subdomain, "subdomain mismatch");
        return Err(Error::Forbidden);
    }
    Ok(account)
}

async fn verify_blocking<V>(verify: V, key: String, hash: String) -> Result<bool, Error>
where
    V: Fn(&str, &str) -> bool + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(move || verify(&key, &hash)).await?)
}

async fn reject<V>(verify: V, key: String) -> Result<Account, Error>
where
    V: Fn(&str, &str) -> bool + Send + 'static,
{
    verify_dummy(verify, key).await;
    Err(Error::Forbidden)
}

/// Pays for one verification against [`DUMMY_HASH`] when there is no stored hash to check,
/// so these rejections cost the same as a wrong key. `black_box` keeps the work from being
/// optimised away.
async fn verify_dummy<V>(verify: V, key: String)
where
    V: Fn(&str, &str) -> bool + Send + 'static,
{
    let padded = move |key: &str, hash: &str| {
        std::hint::black_box(verify(std::hint::black_box(key), hash))
    };
    // A failed join only loses the padding work, the request is rejected either way.
    let _ = verify_blocking(padded, key, DUMMY_HASH.to_string()).await;
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Every address listed in all occurrences of the `name` header.
fn forwarded_addrs<'a>(headers: &'a HeaderMap, name: &str) -> impl Iterator<Item = &'a str> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
}
