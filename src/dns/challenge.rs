//! The server's own `_acme-challenge` value, used when it obtains a certificate for itself.
//!
//! Each DNS transport runs its own query engine with its own [`OwnChallenge`] slot. A
//! [`ChallengeProvider`] holds every slot and writes to all of them, so a challenge presented
//! once is visible on UDP and TCP alike.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A single engine's view of the own challenge value. Empty means no challenge is pending.
#[derive(Clone, Debug, Default)]
pub struct OwnChallenge(Arc<RwLock<String>>);

impl OwnChallenge {
    pub async fn get(&self) -> String {
        self.0.read().await.clone()
    }

    async fn set(&self, value: &str) {
        value.clone_into(&mut *self.0.write().await);
    }
}

#[derive(Clone, Debug, Default)]
pub struct ChallengeProvider {
    slots: Vec<OwnChallenge>,
}

impl ChallengeProvider {
    #[must_use]
    pub fn new(slots: Vec<OwnChallenge>) -> Self {
        ChallengeProvider { slots }
    }

    /// Publish `token` as the own challenge value on every engine.
    pub async fn present(&self, token: &str) {
        debug!("presenting own challenge on {} engine(s)", self.slots.len());
        for slot in &self.slots {
            slot.set(token).await;
        }
    }

    /// Publish the DNS-01 value for an ACME key authorization: the unpadded base64url encoding
    /// of its SHA-256 digest.
    pub async fn present_key_authorization(&self, key_authorization: &str) {
        self.present(&key_authorization_digest(key_authorization))
            .await;
    }

    /// Withdraw the own challenge value from every engine.
    pub async fn clean_up(&self) {
        debug!("cleaning up own challenge");
        for slot in &self.slots {
            slot.set("").await;
        }
    }
}

#[must_use]
pub fn key_authorization_digest(key_authorization: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(key_authorization.as_bytes()))
}
