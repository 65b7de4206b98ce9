//! Per-request HMAC authentication between relay nodes.
//!
//! The signer computes `HMAC-SHA256(secret, command ‖ JSON(args) ‖ timestamp)`
//! and ships it hex-encoded next to the millisecond timestamp. The verifier
//! recomputes the digest, demands the timestamp lie within five minutes of
//! its own clock and compares in constant time. There is no handshake: each
//! peer pair shares a secret out of band.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{RelayError, RelayResult};

type HmacSha256 = Hmac<Sha256>;

/// Maximum clock skew, in either direction, for a signed envelope.
pub const SIGNATURE_WINDOW_MS: u64 = 5 * 60 * 1000;

/// JSON body exchanged between a dispatcher and a receiving relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(rename = "serverId", default)]
    pub server_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Envelope {
    /// Envelope for a peer that holds no shared secret.
    pub fn unsigned(command: &str, args: &[String], server_id: &str) -> Self {
        Self {
            command: command.to_string(),
            args: Some(args.to_vec()),
            server_id: server_id.to_string(),
            timestamp: None,
            signature: None,
        }
    }

    pub fn signed(
        command: &str,
        args: &[String],
        server_id: &str,
        secret: &str,
    ) -> RelayResult<Self> {
        Self::signed_at(command, args, server_id, secret, now_ms())
    }

    pub fn signed_at(
        command: &str,
        args: &[String],
        server_id: &str,
        secret: &str,
        timestamp: i64,
    ) -> RelayResult<Self> {
        let signature = sign_at(command, args, secret, timestamp)?;
        Ok(Self {
            timestamp: Some(timestamp),
            signature: Some(signature),
            ..Self::unsigned(command, args, server_id)
        })
    }

    pub fn args(&self) -> &[String] {
        self.args.as_deref().unwrap_or(&[])
    }

    pub fn is_signed(&self) -> bool {
        self.timestamp.is_some() && self.signature.is_some()
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The exact bytes covered by the MAC.
pub fn signing_payload(command: &str, args: &[String], timestamp: i64) -> String {
    let args_json = serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string());
    format!("{}{}{}", command, args_json, timestamp)
}

/// Lowercase hex HMAC-SHA256 over [`signing_payload`].
pub fn sign_at(command: &str, args: &[String], secret: &str, timestamp: i64) -> RelayResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| RelayError::auth(format!("invalid signing key: {}", err)))?;
    mac.update(signing_payload(command, args, timestamp).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify against the local clock.
pub fn verify(envelope: &Envelope, secret: Option<&str>) -> RelayResult<()> {
    verify_at(envelope, secret, now_ms())
}

/// Fails closed: any missing piece, skew beyond the window or digest mismatch
/// is an [`RelayError::Auth`]. The message is meant for logs; callers answer
/// every variant the same way.
pub fn verify_at(envelope: &Envelope, secret: Option<&str>, now: i64) -> RelayResult<()> {
    let (Some(args), Some(timestamp), Some(signature)) = (
        envelope.args.as_deref(),
        envelope.timestamp,
        envelope.signature.as_deref(),
    ) else {
        return Err(RelayError::auth("envelope is missing signing fields"));
    };
    if envelope.command.is_empty()
        || envelope.server_id.is_empty()
        || signature.is_empty()
        || timestamp == 0
    {
        return Err(RelayError::auth("envelope is missing signing fields"));
    }

    let Some(secret) = secret.filter(|value| !value.is_empty()) else {
        return Err(RelayError::auth("no shared secret configured"));
    };

    if now.abs_diff(timestamp) > SIGNATURE_WINDOW_MS {
        return Err(RelayError::auth(format!(
            "timestamp {} outside validity window (now {})",
            timestamp, now
        )));
    }

    let expected = sign_at(&envelope.command, args, secret, timestamp)?;

    // Slices of different length compare unequal without inspecting bytes.
    if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        Ok(())
    } else {
        Err(RelayError::auth("signature mismatch"))
    }
}
