use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::StoragePath;

type HmacSha256 = Hmac<Sha256>;

/// Produces and checks expiring blob URLs of the form
/// `{base}/{path}?expires={unix}&signature={hex}`, where the signature is an
/// HMAC-SHA256 over `{path}\n{expires}`.
#[derive(Clone)]
pub struct UrlSigner {
    base_url: String,
    mac: HmacSha256,
}

impl UrlSigner {
    pub fn new(base_url: impl Into<String>, secret: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mac: HmacSha256::new_from_slice(secret.as_ref())?,
        })
    }

    pub fn sign(&self, path: &StoragePath, ttl: Duration, now: DateTime<Utc>) -> String {
        let expires = now.timestamp() + ttl.as_secs() as i64;
        format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            path.as_str(),
            expires,
            self.signature(path.as_str(), expires)
        )
    }

    pub fn verify(&self, path: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() > expires {
            return false;
        }
        let expected = self.signature(path, expires);
        // Constant-time comparison.
        expected.len() == signature.len()
            && expected
                .bytes()
                .zip(signature.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }

    fn signature(&self, path: &str, expires: i64) -> String {
        let mut mac = self.mac.clone();
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
