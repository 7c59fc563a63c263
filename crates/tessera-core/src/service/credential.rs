//! Ticket Credentials
//!
//! The scannable credential is a signed, encoded payload bound to a ticket
//! code: `base64url(json).base64url(hmac-sha256)`. Scanners decode it back
//! to the payload; only the ticket code is authoritative — the event and
//! team names are display hints and are never trusted for authorization.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Result, TesseraError};

type HmacSha256 = Hmac<Sha256>;

/// Logical credential payload rendered into the scannable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    /// Presentable ticket code; the only authoritative field
    #[serde(rename = "ticketId")]
    pub ticket_code: String,

    /// Display hint for staff
    pub event_name: String,

    /// Display hint, present on team tickets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
}

/// Signs and verifies credential payloads with HMAC-SHA256.
#[derive(Clone)]
pub struct CredentialSigner {
    key: Vec<u8>,
}

impl CredentialSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    pub fn sign(&self, payload: &QrPayload) -> Result<String> {
        let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| TesseraError::internal(format!("Invalid signing key: {}", e)))?;
        mac.update(encoded.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", encoded, signature))
    }

    pub fn verify(&self, credential: &str) -> Result<QrPayload> {
        let (encoded, signature) = credential
            .split_once('.')
            .ok_or_else(|| TesseraError::invalid_credential("Malformed credential"))?;

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TesseraError::invalid_credential("Malformed credential signature"))?;

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| TesseraError::internal(format!("Invalid signing key: {}", e)))?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&sig_bytes)
            .map_err(|_| TesseraError::invalid_credential("Credential signature mismatch"))?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| TesseraError::invalid_credential("Malformed credential payload"))?;

        serde_json::from_slice(&payload_bytes)
            .map_err(|_| TesseraError::invalid_credential("Unreadable credential payload"))
    }

    /// Heuristic for scan input: a full credential contains the payload /
    /// signature separator, a bare ticket code does not.
    pub fn looks_like_credential(input: &str) -> bool {
        input.contains('.')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> CredentialSigner {
        CredentialSigner::new("test-secret")
    }

    fn payload() -> QrPayload {
        QrPayload {
            ticket_code: "TKT-0123456789".to_string(),
            event_name: "GameJam".to_string(),
            team_name: None,
        }
    }

    #[test]
    fn test_sign_then_verify() {
        let signed = signer().sign(&payload()).unwrap();
        assert!(CredentialSigner::looks_like_credential(&signed));
        let verified = signer().verify(&signed).unwrap();
        assert_eq!(verified, payload());
    }

    #[test]
    fn test_team_name_survives_the_credential() {
        let p = QrPayload {
            team_name: Some("Rustaceans".to_string()),
            ..payload()
        };
        let verified = signer().verify(&signer().sign(&p).unwrap()).unwrap();
        assert_eq!(verified.team_name.as_deref(), Some("Rustaceans"));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let signed = signer().sign(&payload()).unwrap();
        let (_, signature) = signed.split_once('.').unwrap();

        let forged = QrPayload {
            ticket_code: "TKT-FFFFFFFFFF".to_string(),
            ..payload()
        };
        let forged_encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let spliced = format!("{}.{}", forged_encoded, signature);

        assert!(matches!(
            signer().verify(&spliced).unwrap_err(),
            TesseraError::InvalidCredential { .. }
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let signed = signer().sign(&payload()).unwrap();
        let other = CredentialSigner::new("other-secret");
        assert!(other.verify(&signed).is_err());
    }

    #[test]
    fn test_garbage_input_is_rejected() {
        assert!(signer().verify("not-a-credential").is_err());
        assert!(signer().verify("a.b").is_err());
    }

    #[test]
    fn test_payload_wire_field_names() {
        let json = serde_json::to_value(payload()).unwrap();
        assert!(json.get("ticketId").is_some());
        assert!(json.get("eventName").is_some());
        assert!(json.get("teamName").is_none());
    }
}
