//! TOS V4 request signing (`TOS4-HMAC-SHA256`)
//!
//! Same shape as AWS SigV4 with TOS names: `x-tos-*` headers, a
//! `{date}/{region}/tos/request` scope and a signing key derived directly from
//! the secret key (no prefix).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::error::StorageError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "TOS4-HMAC-SHA256";
pub const DATE_HEADER: &str = "x-tos-date";
pub const CONTENT_SHA256_HEADER: &str = "x-tos-content-sha256";
const SIGNED_HEADERS: &str = "host;x-tos-content-sha256;x-tos-date";

/// Request parts covered by the signature
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    /// Host header value, including a non-default port
    pub host: &'a str,
    /// Already percent-encoded absolute path
    pub canonical_uri: &'a str,
    pub payload: &'a [u8],
}

/// Headers to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub date: String,
    pub content_sha256: String,
}

#[derive(Clone)]
pub struct TosSigner {
    access_key_id: String,
    access_key_secret: String,
    region: String,
}

impl TosSigner {
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region: region.into(),
        }
    }

    pub fn sign(
        &self,
        request: &SigningRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<SignedHeaders, StorageError> {
        let date_stamp = now.format("%Y%m%d").to_string();
        let tos_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex::encode(Sha256::digest(request.payload));

        let canonical_headers = format!(
            "host:{}\n{}:{}\n{}:{}\n",
            request.host, CONTENT_SHA256_HEADER, payload_hash, DATE_HEADER, tos_date
        );
        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            request.method, request.canonical_uri, canonical_headers, SIGNED_HEADERS, payload_hash
        );

        let credential_scope = format!("{}/{}/tos/request", date_stamp, self.region);
        let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM, tos_date, credential_scope, canonical_request_hash
        );

        let signature = self.calculate_signature(&date_stamp, &string_to_sign)?;

        Ok(SignedHeaders {
            authorization: format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.access_key_id, credential_scope, SIGNED_HEADERS, signature
            ),
            date: tos_date,
            content_sha256: payload_hash,
        })
    }

    fn calculate_signature(
        &self,
        date_stamp: &str,
        string_to_sign: &str,
    ) -> Result<String, StorageError> {
        let k_date = Self::hmac_sha256(self.access_key_secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = Self::hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = Self::hmac_sha256(&k_region, b"tos")?;
        let k_signing = Self::hmac_sha256(&k_service, b"request")?;

        let signature = Self::hmac_sha256(&k_signing, string_to_sign.as_bytes())?;
        Ok(hex::encode(signature))
    }

    fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| StorageError::Configuration(format!("HMAC key error: {}", e)))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for TosSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TosSigner")
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
