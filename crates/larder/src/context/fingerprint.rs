//! Canonical request fingerprints and the cache keys derived from them.
//!
//! A [`FingerprintInput`] is the normalized, order-independent form of a
//! generation request. [`FingerprintHasher`] maps it to a short, stable
//! [`CacheKey`] by serializing every field in a fixed order with
//! length-prefixed framing, then hashing the result with 64-bit FNV-1a and
//! encoding it in base36.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Normalized generation request. Sets are `BTreeSet`s, so iteration order
/// is always lexicographic regardless of how the raw lists were ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FingerprintInput {
    /// Trimmed, lower-cased request text.
    pub prompt_text: String,
    /// Skill level, empty when unknown.
    pub skill_level: String,
    pub dietary_restrictions: BTreeSet<String>,
    /// Safety-critical: the union of every allergy/restriction source.
    pub allergies: BTreeSet<String>,
    pub kitchen_tools: BTreeSet<String>,
    /// Canonical `field=value;...` rendering of secondary preferences.
    pub preferences_blob: String,
}

/// Opaque cache key derived from a [`FingerprintInput`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a key read back from storage. Returns `None` for strings the
    /// hasher can never produce.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= 13
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic mapping from [`FingerprintInput`] to [`CacheKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintHasher;

impl FingerprintHasher {
    /// Compute the cache key for a normalized fingerprint.
    pub fn key(fingerprint: &FingerprintInput) -> CacheKey {
        CacheKey(to_base36(fnv1a(canonical_bytes(fingerprint).as_bytes())))
    }
}

/// Serialize fields in a fixed order. Every scalar and every set member is
/// written as `<byte length>:<bytes>`, and every set is prefixed by its
/// member count, so no choice of content can shift a field boundary:
/// `{"a,b"}` frames as `1#3:a,b` while `{"a","b"}` frames as `2#1:a1:b`.
fn canonical_bytes(fp: &FingerprintInput) -> String {
    let mut out = String::with_capacity(128);
    push_field(&mut out, "prompt", &fp.prompt_text);
    push_field(&mut out, "skill", &fp.skill_level);
    push_set(&mut out, "diet", &fp.dietary_restrictions);
    push_set(&mut out, "allergy", &fp.allergies);
    push_set(&mut out, "tools", &fp.kitchen_tools);
    push_field(&mut out, "prefs", &fp.preferences_blob);
    out
}

fn push_field(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push('=');
    out.push_str(&value.len().to_string());
    out.push(':');
    out.push_str(value);
    out.push('\n');
}

fn push_set(out: &mut String, name: &str, set: &BTreeSet<String>) {
    out.push_str(name);
    out.push('=');
    out.push_str(&set.len().to_string());
    out.push('#');
    for item in set {
        out.push_str(&item.len().to_string());
        out.push(':');
        out.push_str(item);
    }
    out.push('\n');
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> FingerprintInput {
        FingerprintInput {
            prompt_text: "quick breakfast with eggs".into(),
            skill_level: "basic_skills".into(),
            dietary_restrictions: set(&["vegetarian"]),
            allergies: set(&["peanuts"]),
            kitchen_tools: set(&["pan", "stove"]),
            preferences_blob: String::new(),
        }
    }

    #[test]
    fn key_is_deterministic() {
        assert_eq!(
            FingerprintHasher::key(&sample()),
            FingerprintHasher::key(&sample())
        );
    }

    #[test]
    fn different_fields_give_different_keys() {
        let mut other = sample();
        other.allergies.clear();
        assert_ne!(
            FingerprintHasher::key(&sample()),
            FingerprintHasher::key(&other)
        );
    }

    #[test]
    fn delimiter_inside_member_does_not_collide() {
        let mut joined = sample();
        joined.kitchen_tools = set(&["a,b"]);
        let mut split = sample();
        split.kitchen_tools = set(&["a", "b"]);
        assert_ne!(
            FingerprintHasher::key(&joined),
            FingerprintHasher::key(&split)
        );
    }

    #[test]
    fn moving_text_between_fields_does_not_collide() {
        let mut a = sample();
        a.prompt_text = "eggs".into();
        a.skill_level = "basic".into();
        let mut b = sample();
        b.prompt_text = "eggsbasic".into();
        b.skill_level = String::new();
        assert_ne!(FingerprintHasher::key(&a), FingerprintHasher::key(&b));
    }

    #[test]
    fn key_round_trips_through_parse() {
        let key = FingerprintHasher::key(&sample());
        assert_eq!(CacheKey::parse(key.as_str()), Some(key));
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert!(CacheKey::parse("").is_none());
        assert!(CacheKey::parse("../etc").is_none());
        assert!(CacheKey::parse("ABC").is_none());
        assert!(CacheKey::parse(".entry.json.tmp").is_none());
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }
}
