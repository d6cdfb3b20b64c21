//! Timestamp digests binding a request to the shared secret.

use md5::{Digest, Md5};
use ring::hmac;
use serde::Deserialize;
use subtle::ConstantTimeEq;

/// Scheme used to compute the request tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DigestScheme {
    /// `hex(md5(timestamp || secret))`, sent in the `MD5` header.
    #[default]
    #[serde(rename = "md5")]
    Md5,
    /// `hex(HMAC-SHA256(secret, timestamp))`, sent in the `Signature` header.
    #[serde(rename = "hmac-sha256")]
    HmacSha256,
}

impl DigestScheme {
    /// Name of the HTTP header carrying the tag.
    pub fn header_name(&self) -> &'static str {
        match self {
            DigestScheme::Md5 => "MD5",
            DigestScheme::HmacSha256 => "Signature",
        }
    }
}

/// Keyed digest over request timestamps.
pub struct Digester {
    scheme: DigestScheme,
    secret: Vec<u8>,
    hmac_key: hmac::Key,
}

impl Digester {
    pub fn new(scheme: DigestScheme, secret: &[u8]) -> Self {
        Self {
            scheme,
            secret: secret.to_vec(),
            hmac_key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        }
    }

    pub fn scheme(&self) -> DigestScheme {
        self.scheme
    }

    /// Compute the lowercase hex tag for `timestamp`.
    pub fn tag(&self, timestamp: &str) -> String {
        match self.scheme {
            DigestScheme::Md5 => {
                let mut hasher = Md5::new();
                hasher.update(timestamp.as_bytes());
                hasher.update(&self.secret);
                hex::encode(hasher.finalize())
            }
            DigestScheme::HmacSha256 => {
                let tag = hmac::sign(&self.hmac_key, timestamp.as_bytes());
                hex::encode(tag.as_ref())
            }
        }
    }

    /// Check a presented tag against the expected one.
    ///
    /// Exact, case-sensitive comparison that does not short-circuit on the
    /// first differing byte.
    pub fn verify(&self, timestamp: &str, presented: &str) -> bool {
        let expected = self.tag(timestamp);
        expected.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

/// Unkeyed MD5 hex digest of `input`.
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
