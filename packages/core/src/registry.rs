//! Algorithm registry
//!
//! Maps `(AlgorithmType, name)` to a shared backend. Unknown names are
//! rejected here, before any key or session is created.

use crate::crypto::provider::{
    AlgorithmType, KeyCodec, KeyExchangeScheme, SignatureScheme, SymmetricScheme,
};
use crate::crypto::suites;
use crate::error::{CryptoError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Backend of an asymmetric key: either a signature scheme or a key
/// exchange scheme.
#[derive(Clone)]
pub enum AsymmetricBackend {
    Signature(Arc<dyn SignatureScheme>),
    KeyExchange(Arc<dyn KeyExchangeScheme>),
}

impl AsymmetricBackend {
    pub fn codec(&self) -> &dyn KeyCodec {
        match self {
            AsymmetricBackend::Signature(s) => s.as_codec(),
            AsymmetricBackend::KeyExchange(k) => k.as_codec(),
        }
    }

    pub fn algorithm_type(&self) -> AlgorithmType {
        match self {
            AsymmetricBackend::Signature(_) => AlgorithmType::Signatures,
            AsymmetricBackend::KeyExchange(_) => AlgorithmType::KeyExchange,
        }
    }

    pub fn name(&self) -> &'static str {
        self.codec().name()
    }

    pub fn same_algorithm(&self, other: &AsymmetricBackend) -> bool {
        self.algorithm_type() == other.algorithm_type() && self.name() == other.name()
    }

    pub fn signature(&self) -> Result<&Arc<dyn SignatureScheme>> {
        match self {
            AsymmetricBackend::Signature(s) => Ok(s),
            AsymmetricBackend::KeyExchange(_) => Err(CryptoError::KeyNotSupported),
        }
    }

    pub fn key_exchange(&self) -> Result<&Arc<dyn KeyExchangeScheme>> {
        match self {
            AsymmetricBackend::KeyExchange(k) => Ok(k),
            AsymmetricBackend::Signature(_) => Err(CryptoError::KeyNotSupported),
        }
    }
}

/// Таблица доступных алгоритмов
pub struct Registry {
    signatures: HashMap<&'static str, Arc<dyn SignatureScheme>>,
    key_exchange: HashMap<&'static str, Arc<dyn KeyExchangeScheme>>,
    symmetric: HashMap<&'static str, Arc<dyn SymmetricScheme>>,
}

impl Registry {
    /// Empty registry; see [`Registry::with_defaults`].
    pub fn new() -> Self {
        Self {
            signatures: HashMap::new(),
            key_exchange: HashMap::new(),
            symmetric: HashMap::new(),
        }
    }

    /// Registry holding every built-in algorithm.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        suites::register_defaults(&mut registry);
        registry
    }

    pub fn register_signature(&mut self, scheme: Arc<dyn SignatureScheme>) {
        self.signatures.insert(scheme.name(), scheme);
    }

    pub fn register_key_exchange(&mut self, scheme: Arc<dyn KeyExchangeScheme>) {
        self.key_exchange.insert(scheme.name(), scheme);
    }

    pub fn register_symmetric(&mut self, scheme: Arc<dyn SymmetricScheme>) {
        self.symmetric.insert(scheme.name(), scheme);
    }

    pub fn lookup_signature(&self, name: &str) -> Result<Arc<dyn SignatureScheme>> {
        self.signatures
            .get(name)
            .cloned()
            .ok_or(CryptoError::UnsupportedAlgorithm)
    }

    pub fn lookup_key_exchange(&self, name: &str) -> Result<Arc<dyn KeyExchangeScheme>> {
        self.key_exchange
            .get(name)
            .cloned()
            .ok_or(CryptoError::UnsupportedAlgorithm)
    }

    pub fn lookup_symmetric(&self, name: &str) -> Result<Arc<dyn SymmetricScheme>> {
        self.symmetric
            .get(name)
            .cloned()
            .ok_or(CryptoError::UnsupportedAlgorithm)
    }

    /// Backend for asymmetric keys of the given type.
    pub fn keypair_backend(&self, alg_type: AlgorithmType, name: &str) -> Result<AsymmetricBackend> {
        match alg_type {
            AlgorithmType::Signatures => self.lookup_signature(name).map(AsymmetricBackend::Signature),
            AlgorithmType::KeyExchange => {
                self.lookup_key_exchange(name).map(AsymmetricBackend::KeyExchange)
            }
            AlgorithmType::Symmetric => Err(CryptoError::UnsupportedAlgorithm),
        }
    }

    /// Names of registered algorithms of one type, sorted.
    pub fn algorithms(&self, alg_type: AlgorithmType) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = match alg_type {
            AlgorithmType::Signatures => self.signatures.keys().copied().collect(),
            AlgorithmType::KeyExchange => self.key_exchange.keys().copied().collect(),
            AlgorithmType::Symmetric => self.symmetric.keys().copied().collect(),
        };
        names.sort_unstable();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = Registry::with_defaults();
        assert_eq!(
            registry.algorithms(AlgorithmType::Signatures),
            vec!["ECDSA_P256_SHA256", "Ed25519"]
        );
        assert_eq!(registry.algorithms(AlgorithmType::KeyExchange), vec!["P256", "X25519"]);
        for name in [
            "SHA-256",
            "SHA-512",
            "SHA-512/256",
            "SHAKE-128",
            "SHAKE-256",
            "HMAC/SHA-256",
            "HMAC/SHA-512",
            "HKDF-EXTRACT/SHA-256",
            "HKDF-EXTRACT/SHA-512",
            "HKDF-EXPAND/SHA-256",
            "HKDF-EXPAND/SHA-512",
            "HKDF-RATCHET/SHA-256",
            "AES-128-GCM",
            "AES-256-GCM",
            "CHACHA20-POLY1305",
            "XCHACHA20-POLY1305",
        ] {
            assert!(registry.lookup_symmetric(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_unknown_algorithm() {
        let registry = Registry::with_defaults();
        assert_eq!(
            registry.lookup_symmetric("ROT13").err(),
            Some(CryptoError::UnsupportedAlgorithm)
        );
        assert_eq!(
            registry.keypair_backend(AlgorithmType::Symmetric, "SHA-256").err(),
            Some(CryptoError::UnsupportedAlgorithm)
        );
        // Names are exact
        assert!(registry.lookup_signature("ed25519").is_err());
    }

    #[test]
    fn test_backend_kind() {
        let registry = Registry::with_defaults();
        let backend = registry
            .keypair_backend(AlgorithmType::KeyExchange, "X25519")
            .unwrap();
        assert_eq!(backend.algorithm_type(), AlgorithmType::KeyExchange);
        assert_eq!(backend.signature().err(), Some(CryptoError::KeyNotSupported));
        assert!(backend.key_exchange().is_ok());
    }
}
