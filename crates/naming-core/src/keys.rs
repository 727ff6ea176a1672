//! Composite keys for the name maps.
//!
//! Neuron entries are scoped per collective: `"<collective-id>:<fingerprint-hex>"`.
//! Principal entries use the raw textual principal id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the collective id and the neuron fingerprint.
pub const KEY_DELIMITER: char = ':';

/// Which kind of identity a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Neuron,
    Principal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("collective id is empty")]
    EmptyCollective,
    #[error("collective id contains the key delimiter: {0}")]
    DelimiterInCollective(String),
    #[error("fingerprint is not an even-length hex string: {0}")]
    InvalidFingerprint(String),
    #[error("neuron key has no delimiter: {0}")]
    MissingDelimiter(String),
    #[error("principal id is empty")]
    EmptyPrincipal,
    #[error("principal id contains the key delimiter: {0}")]
    DelimiterInPrincipal(String),
}

/// Neuron identity scoped to its owning collective.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeuronKey {
    collective_id: String,
    fingerprint_hex: String,
}

impl NeuronKey {
    /// Validates both halves. The fingerprint is normalised to lower-case hex.
    pub fn new(collective_id: &str, fingerprint_hex: &str) -> Result<Self, KeyError> {
        let collective_id = collective_id.trim();
        if collective_id.is_empty() {
            return Err(KeyError::EmptyCollective);
        }
        if collective_id.contains(KEY_DELIMITER) {
            return Err(KeyError::DelimiterInCollective(collective_id.to_string()));
        }
        let fingerprint = fingerprint_hex.trim();
        if !is_even_hex(fingerprint) {
            return Err(KeyError::InvalidFingerprint(fingerprint.to_string()));
        }
        Ok(Self {
            collective_id: collective_id.to_string(),
            fingerprint_hex: fingerprint.to_ascii_lowercase(),
        })
    }

    /// Builds a key from raw fingerprint bytes.
    pub fn from_bytes(collective_id: &str, fingerprint: &[u8]) -> Result<Self, KeyError> {
        let hex: String = fingerprint.iter().map(|b| format!("{:02x}", b)).collect();
        Self::new(collective_id, &hex)
    }

    /// Parses `"<collective-id>:<fingerprint-hex>"`, splitting on the first delimiter.
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let (collective, fingerprint) = s
            .split_once(KEY_DELIMITER)
            .ok_or_else(|| KeyError::MissingDelimiter(s.to_string()))?;
        Self::new(collective, fingerprint)
    }

    pub fn collective_id(&self) -> &str {
        &self.collective_id
    }

    pub fn fingerprint_hex(&self) -> &str {
        &self.fingerprint_hex
    }
}

impl fmt::Display for NeuronKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.collective_id, KEY_DELIMITER, self.fingerprint_hex)
    }
}

/// Raw principal id. Never contains [`KEY_DELIMITER`], so it cannot alias a neuron key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrincipalKey(String);

impl PrincipalKey {
    pub fn new(id: &str) -> Result<Self, KeyError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(KeyError::EmptyPrincipal);
        }
        if id.contains(KEY_DELIMITER) {
            return Err(KeyError::DelimiterInPrincipal(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key into any of the name maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompositeKey {
    Neuron(NeuronKey),
    Principal(PrincipalKey),
}

impl CompositeKey {
    pub fn neuron(collective_id: &str, fingerprint_hex: &str) -> Result<Self, KeyError> {
        NeuronKey::new(collective_id, fingerprint_hex).map(Self::Neuron)
    }

    pub fn principal(id: &str) -> Result<Self, KeyError> {
        PrincipalKey::new(id).map(Self::Principal)
    }

    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::Neuron(_) => IdentityKind::Neuron,
            Self::Principal(_) => IdentityKind::Principal,
        }
    }

    /// String form used as the map key and in persisted snapshots.
    pub fn as_storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neuron(k) => k.fmt(f),
            Self::Principal(k) => k.fmt(f),
        }
    }
}

impl From<NeuronKey> for CompositeKey {
    fn from(k: NeuronKey) -> Self {
        Self::Neuron(k)
    }
}

impl From<PrincipalKey> for CompositeKey {
    fn from(k: PrincipalKey) -> Self {
        Self::Principal(k)
    }
}

fn is_even_hex(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neuron_key_splits_on_first_delimiter() {
        let key = NeuronKey::new("fp274-iaaaa-aaaaq-aacha-cai", "0a1B").unwrap();
        let text = key.to_string();
        assert_eq!(text, "fp274-iaaaa-aaaaq-aacha-cai:0a1b");
        let parsed = NeuronKey::parse(&text).unwrap();
        assert_eq!(parsed.collective_id(), "fp274-iaaaa-aaaaq-aacha-cai");
        assert_eq!(parsed.fingerprint_hex(), "0a1b");
        assert_eq!(parsed, key);
    }

    #[test]
    fn rejects_delimiter_in_collective() {
        assert_eq!(
            NeuronKey::new("a:b", "aa"),
            Err(KeyError::DelimiterInCollective("a:b".to_string()))
        );
    }

    #[test]
    fn rejects_odd_or_non_hex_fingerprint() {
        assert!(matches!(NeuronKey::new("sns1", "abc"), Err(KeyError::InvalidFingerprint(_))));
        assert!(matches!(NeuronKey::new("sns1", "zz"), Err(KeyError::InvalidFingerprint(_))));
        assert!(matches!(NeuronKey::new("sns1", ""), Err(KeyError::InvalidFingerprint(_))));
        assert!(matches!(NeuronKey::parse("sns1aa"), Err(KeyError::MissingDelimiter(_))));
    }

    #[test]
    fn from_bytes_hex_encodes() {
        let key = NeuronKey::from_bytes("sns1", &[0xde, 0xad, 0x01]).unwrap();
        assert_eq!(key.fingerprint_hex(), "dead01");
    }

    #[test]
    fn composite_kind_and_storage_form() {
        let p = CompositeKey::principal(" abc-123 ").unwrap();
        assert_eq!(p.kind(), IdentityKind::Principal);
        assert_eq!(p.as_storage_key(), "abc-123");
        let n = CompositeKey::neuron("sns1", "aa").unwrap();
        assert_eq!(n.kind(), IdentityKind::Neuron);
        assert_eq!(n.as_storage_key(), "sns1:aa");
        assert_eq!(CompositeKey::principal("  "), Err(KeyError::EmptyPrincipal));
    }

    #[test]
    fn principal_rejects_delimiter() {
        assert_eq!(
            PrincipalKey::new("sns1:aa"),
            Err(KeyError::DelimiterInPrincipal("sns1:aa".to_string()))
        );
        assert!(PrincipalKey::new("rrkah-fqaaa-aaaaa-aaaaq-cai").is_ok());
    }
}
