//! HMAC signatures on task requests.
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac-sha256(secret, "<t>.<body>")>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signatures older (or further in the future) than this are rejected.
pub const MAX_SIGNATURE_AGE_SECS: i64 = 600;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing task signature")]
    Missing,

    #[error("Malformed task signature")]
    Malformed,

    #[error("Task signature has expired")]
    Expired,

    #[error("Task signature does not match")]
    Mismatch,

    #[error("Invalid signing key")]
    InvalidKey,
}

#[derive(Clone)]
pub struct TaskSigner {
    keyed: HmacSha256,
}

impl std::fmt::Debug for TaskSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSigner").finish_non_exhaustive()
    }
}

impl TaskSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SignatureError> {
        let keyed =
            HmacSha256::new_from_slice(secret.as_ref()).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self { keyed })
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        mac
    }

    pub fn sign_at(&self, body: &[u8], timestamp: i64) -> String {
        let signature = hex::encode(self.mac(timestamp, body).finalize().into_bytes());
        format!("t={},v1={}", timestamp, signature)
    }

    pub fn sign(&self, body: &[u8]) -> String {
        self.sign_at(body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, header: Option<&str>, body: &[u8], now: i64) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::Missing)?;

        let mut timestamp = None;
        let mut signature = None;
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                Some(("v1", value)) => signature = hex::decode(value).ok(),
                _ => {}
            }
        }
        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(s)) => (t, s),
            _ => return Err(SignatureError::Malformed),
        };

        if (now - timestamp).abs() > MAX_SIGNATURE_AGE_SECS {
            return Err(SignatureError::Expired);
        }

        self.mac(timestamp, body)
            .verify_slice(&signature)
            .map_err(|_| SignatureError::Mismatch)
    }

    pub fn verify(&self, header: Option<&str>, body: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(header, body, chrono::Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"id":"img-1","filePath":"_temp/a.jpg","orientation":1}"#;

    #[test]
    fn test_signature_round_trip() {
        let signer = TaskSigner::new("s".repeat(32)).unwrap();
        let header = signer.sign_at(BODY, 1_700_000_000);
        assert!(header.starts_with("t=1700000000,v1="));
        assert_eq!(signer.verify_at(Some(&header), BODY, 1_700_000_100), Ok(()));
    }

    #[test]
    fn test_tampered_body_or_other_secret_is_rejected() {
        let signer = TaskSigner::new("s".repeat(32)).unwrap();
        let header = signer.sign_at(BODY, 1_700_000_000);

        assert_eq!(
            signer.verify_at(Some(&header), b"{}", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            TaskSigner::new("t".repeat(32)).unwrap().verify_at(Some(&header), BODY, 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_missing_and_malformed() {
        let signer = TaskSigner::new("s".repeat(32)).unwrap();
        let header = signer.sign_at(BODY, 1_700_000_000);

        assert_eq!(
            signer.verify_at(Some(&header), BODY, 1_700_000_000 + MAX_SIGNATURE_AGE_SECS + 1),
            Err(SignatureError::Expired)
        );
        assert_eq!(signer.verify_at(None, BODY, 0), Err(SignatureError::Missing));
        assert_eq!(
            signer.verify_at(Some("v1=zz"), BODY, 0),
            Err(SignatureError::Malformed)
        );
    }
}
