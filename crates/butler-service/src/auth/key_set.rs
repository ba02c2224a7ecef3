//! Key-set cache for the identity provider's token signing keys.
//!
//! The cache is populated once at startup from the user pool's
//! `/.well-known/jwks.json` document. Each RSA descriptor is converted into
//! a [`DecodingKey`] and stored under its `kid`. There is no TTL and no
//! refresh on an unknown `kid`: a key missing from the cache means the token
//! is rejected.
//!
//! # Security
//!
//! - Only `kty = "RSA"` descriptors are loaded; `use = "enc"` keys are skipped
//! - A descriptor's declared `alg` must be an RSA-family algorithm
//! - Fetch failures leave the cache as it was; an empty cache rejects every token

use crate::observability::metrics::record_key_set_refresh;
use common::jwt::RSA_ALGORITHMS;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Timeout for the key-set HTTP fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key as published by the identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for Cognito).
    #[serde(default)]
    pub kty: String,

    /// Key ID used to select the key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is meant for (e.g. "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" or "enc").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// A `{ "keys": [...] }` document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeySet {
    pub keys: Vec<Jwk>,
}

/// Verification material for one `kid`.
#[derive(Clone)]
pub struct CachedKey {
    pub decoding_key: DecodingKey,

    /// Algorithm the descriptor declared, if any.
    pub alg: Option<Algorithm>,
}

/// Why a population attempt left the cache untouched.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("key set fetch failed: {0}")]
    Fetch(String),

    #[error("key set endpoint returned HTTP {0}")]
    Status(u16),

    #[error("key set payload is malformed: {0}")]
    Malformed(String),
}

/// Why a single descriptor was skipped.
#[derive(Debug, Error, PartialEq, Eq)]
enum DescriptorError {
    #[error("missing kid")]
    MissingKid,

    #[error("unsupported key type '{0}'")]
    UnsupportedKeyType(String),

    #[error("encryption key")]
    EncryptionKey,

    #[error("missing RSA component '{0}'")]
    MissingComponent(&'static str),

    #[error("unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid key encoding")]
    InvalidEncoding,
}

/// Process-wide mapping of key id to verification key.
///
/// Reads never block on network I/O. A population swaps all of its entries
/// in under a single write lock.
pub struct KeySetCache {
    http_client: reqwest::Client,
    keys: RwLock<HashMap<String, CachedKey>>,
}

impl Default for KeySetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySetCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "butler.auth.key_set", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            http_client,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the key set at `url` and load it.
    ///
    /// On any failure the cache keeps whatever it held before. The error is
    /// logged here; callers may ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError`] when the document could not be fetched or
    /// parsed. Skipped descriptors are not errors.
    #[instrument(skip(self), name = "butler.auth.key_set.populate")]
    pub async fn populate(&self, url: &str) -> Result<usize, KeySetError> {
        let start = Instant::now();
        let result = self.fetch(url).await.map(|key_set| self.load(&key_set));

        match &result {
            Ok(loaded) => {
                record_key_set_refresh("success", start.elapsed());
                tracing::info!(
                    target: "butler.auth.key_set",
                    loaded = loaded,
                    cached = self.len(),
                    "Key set populated"
                );
            }
            Err(e) => {
                record_key_set_refresh("error", start.elapsed());
                tracing::error!(
                    target: "butler.auth.key_set",
                    error = %e,
                    cached = self.len(),
                    "Key set population failed; cache left unchanged"
                );
            }
        }

        result
    }

    async fn fetch(&self, url: &str) -> Result<KeySet, KeySetError> {
        tracing::debug!(target: "butler.auth.key_set", url = %url, "Fetching key set");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| KeySetError::Fetch(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(KeySetError::Status(response.status().as_u16()));
        }

        response
            .json::<KeySet>()
            .await
            .map_err(|e| KeySetError::Malformed(e.to_string()))
    }

    /// Insert every convertible descriptor of `key_set`.
    ///
    /// Entries with the same `kid` are overwritten; other entries stay.
    /// Returns how many descriptors were loaded.
    pub fn load(&self, key_set: &KeySet) -> usize {
        let converted: Vec<(String, CachedKey)> = key_set
            .keys
            .iter()
            .filter_map(|jwk| match convert(jwk) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(
                        target: "butler.auth.key_set",
                        kid = jwk.kid.as_deref().unwrap_or("<none>"),
                        reason = %e,
                        "Skipping key set descriptor"
                    );
                    None
                }
            })
            .collect();

        let loaded = converted.len();
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.extend(converted);
        loaded
    }

    /// Look up the key registered under `kid`.
    pub fn get(&self, kid: &str) -> Option<CachedKey> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kid)
            .cloned()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn convert(jwk: &Jwk) -> Result<(String, CachedKey), DescriptorError> {
    let kid = jwk
        .kid
        .as_ref()
        .filter(|kid| !kid.is_empty())
        .ok_or(DescriptorError::MissingKid)?;

    if jwk.kty != "RSA" {
        return Err(DescriptorError::UnsupportedKeyType(jwk.kty.clone()));
    }

    if jwk.key_use.as_deref() == Some("enc") {
        return Err(DescriptorError::EncryptionKey);
    }

    let n = jwk.n.as_ref().ok_or(DescriptorError::MissingComponent("n"))?;
    let e = jwk.e.as_ref().ok_or(DescriptorError::MissingComponent("e"))?;

    let alg = match jwk.alg.as_deref() {
        None => None,
        Some(name) => match Algorithm::from_str(name) {
            Ok(alg) if RSA_ALGORITHMS.contains(&alg) => Some(alg),
            _ => return Err(DescriptorError::UnsupportedAlgorithm(name.to_string())),
        },
    };

    let decoding_key =
        DecodingKey::from_rsa_components(n, e).map_err(|_| DescriptorError::InvalidEncoding)?;

    Ok((kid.clone(), CachedKey { decoding_key, alg }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // Modulus of a throwaway 2048-bit test key.
    const N: &str = "rIDJe4yKEKP3bTKI5LE251Ct8Z6VeaSGOMhagtCQUIyUnYtf5oMGzH3aEPOtq46C5cUblagZXUEEF6VjcSWv1ezSWWzsSuJRf92Oh2OTrEIu58BbvrpAX9tTI37x7M2Azlq3XM705znfDZaKLoVKW-MVPsa4k4dH9Y2gCfNYwPUrHU2yb8YT4Q_EXrl_Fz9MiCtiCEx_YQulYd5kBIgDqrapW2k_PwGS2OP_M0rKTVRv-CRv0L6GMpbwhOPyrnZGY2YEDsH-6K5tn8L0OcxZkrEjYRd_ReWHLh-7n1S1C06WcsYJBeTy9x24StP79iGTZF5aiIYXOqlW_Dxup2OU1w";

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: Some(kid.to_string()),
            n: Some(N.to_string()),
            e: Some("AQAB".to_string()),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
        }
    }

    #[test]
    fn test_key_set_deserialization_cognito_shape() {
        let json = format!(
            r#"{{"keys": [{{"alg": "RS256", "e": "AQAB", "kid": "abc=", "kty": "RSA", "n": "{N}", "use": "sig"}}]}}"#
        );

        let key_set: KeySet = serde_json::from_str(&json).unwrap();
        let jwk = key_set.keys.first().unwrap();
        assert_eq!(jwk.kid.as_deref(), Some("abc="));
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
    }

    #[test]
    fn test_load_two_independent_keys() {
        let cache = KeySetCache::new();
        let loaded = cache.load(&KeySet {
            keys: vec![rsa_jwk("key-1"), rsa_jwk("key-2")],
        });

        assert_eq!(loaded, 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("key-1").is_some());
        assert!(cache.get("key-2").is_some());
        assert!(cache.get("key-3").is_none());
    }

    #[test]
    fn test_reload_overwrites_same_kid_only() {
        let cache = KeySetCache::new();
        cache.load(&KeySet {
            keys: vec![rsa_jwk("key-1"), rsa_jwk("key-2")],
        });

        let mut replacement = rsa_jwk("key-1");
        replacement.alg = Some("PS256".to_string());
        cache.load(&KeySet {
            keys: vec![replacement],
        });

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("key-1").unwrap().alg, Some(Algorithm::PS256));
        assert_eq!(cache.get("key-2").unwrap().alg, Some(Algorithm::RS256));
    }

    #[test]
    fn test_bad_descriptors_are_skipped() {
        let mut no_kid = rsa_jwk("x");
        no_kid.kid = None;

        let mut ec = rsa_jwk("ec-key");
        ec.kty = "EC".to_string();

        let mut enc = rsa_jwk("enc-key");
        enc.key_use = Some("enc".to_string());

        let mut no_modulus = rsa_jwk("no-n");
        no_modulus.n = None;

        let mut hmac = rsa_jwk("hs-key");
        hmac.alg = Some("HS256".to_string());

        let mut bad_encoding = rsa_jwk("bad-b64");
        bad_encoding.n = Some("!!not base64!!".to_string());

        let cache = KeySetCache::new();
        let loaded = cache.load(&KeySet {
            keys: vec![
                no_kid,
                ec,
                enc,
                no_modulus,
                hmac,
                bad_encoding,
                rsa_jwk("good"),
            ],
        });

        assert_eq!(loaded, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("good").is_some());
    }

    #[test]
    fn test_convert_reports_reason() {
        let mut enc = rsa_jwk("enc-key");
        enc.key_use = Some("enc".to_string());
        assert_eq!(convert(&enc).err(), Some(DescriptorError::EncryptionKey));

        let mut no_e = rsa_jwk("no-e");
        no_e.e = None;
        assert_eq!(
            convert(&no_e).err(),
            Some(DescriptorError::MissingComponent("e"))
        );
    }

    #[test]
    fn test_descriptor_without_alg_is_accepted() {
        let mut jwk = rsa_jwk("no-alg");
        jwk.alg = None;

        let cache = KeySetCache::new();
        assert_eq!(cache.load(&KeySet { keys: vec![jwk] }), 1);
        assert!(cache.get("no-alg").unwrap().alg.is_none());
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = KeySetCache::default();
        assert!(cache.is_empty());
        assert!(cache.get("anything").is_none());
    }

    #[tokio::test]
    async fn test_populate_unreachable_leaves_cache_unchanged() {
        let cache = KeySetCache::new();
        cache.load(&KeySet {
            keys: vec![rsa_jwk("key-1")],
        });

        // Port 1 on loopback refuses connections
        let result = cache.populate("http://127.0.0.1:1/.well-known/jwks.json").await;

        assert!(matches!(result, Err(KeySetError::Fetch(_))));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("key-1").is_some());
    }
}
