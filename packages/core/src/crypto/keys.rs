// Объекты ключей
// Асимметричные и симметричные ключи, привязка к менеджеру секретов

use crate::crypto::provider::{AlgorithmType, SymmetricScheme};
use crate::error::{CryptoError, Result};
use crate::registry::AsymmetricBackend;
use crate::secrets::{SecretId, Version};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use zeroize::Zeroizing;

/// Canonical raw key material of an asymmetric keypair.
#[derive(Clone)]
pub struct RawKeypair {
    pub secret: Zeroizing<Vec<u8>>,
    pub public: Vec<u8>,
}

impl fmt::Debug for RawKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawKeypair")
            .field("secret", &"<redacted>")
            .field("public", &self.public.len())
            .finish()
    }
}

/// Link between a key object and the secrets-manager record backing it.
///
/// `revoked` is shared with the record; invalidating the record makes
/// every key object created from it unusable.
#[derive(Debug, Clone)]
pub struct ManagedBinding {
    pub manager: u64,
    pub id: SecretId,
    pub version: Version,
    pub revoked: Arc<AtomicBool>,
}

impl ManagedBinding {
    fn ensure_valid(&self) -> Result<()> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(CryptoError::InvalidKey);
        }
        Ok(())
    }
}

struct KeypairInner {
    backend: AsymmetricBackend,
    raw: RawKeypair,
    managed: OnceLock<ManagedBinding>,
}

/// Asymmetric keypair.
#[derive(Clone)]
pub struct Keypair {
    inner: Arc<KeypairInner>,
}

impl Keypair {
    pub fn new(backend: AsymmetricBackend, raw: RawKeypair) -> Self {
        Self {
            inner: Arc::new(KeypairInner {
                backend,
                raw,
                managed: OnceLock::new(),
            }),
        }
    }

    pub fn backend(&self) -> &AsymmetricBackend {
        &self.inner.backend
    }

    pub fn algorithm(&self) -> &'static str {
        self.inner.backend.name()
    }

    pub fn algorithm_type(&self) -> AlgorithmType {
        self.inner.backend.algorithm_type()
    }

    /// Raw material, after checking that the key has not been revoked.
    pub fn raw(&self) -> Result<&RawKeypair> {
        self.ensure_usable()?;
        Ok(&self.inner.raw)
    }

    pub fn public_bytes(&self) -> &[u8] {
        &self.inner.raw.public
    }

    pub fn managed(&self) -> Option<&ManagedBinding> {
        self.inner.managed.get()
    }

    pub fn is_same_key(&self, other: &Keypair) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attaches the keypair to a manager record; a key is managed at most once.
    pub fn bind(&self, binding: ManagedBinding) -> Result<()> {
        self.inner
            .managed
            .set(binding)
            .map_err(|_| CryptoError::InvalidOperation)
    }

    pub fn ensure_usable(&self) -> Result<()> {
        match self.inner.managed.get() {
            Some(binding) => binding.ensure_valid(),
            None => Ok(()),
        }
    }

    /// Secret material for export; refused for managed keys.
    pub fn exportable(&self) -> Result<&RawKeypair> {
        if self.managed().is_some() {
            return Err(CryptoError::ProhibitedOperation);
        }
        self.raw()
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        self.ensure_usable()?;
        Ok(PublicKey::new(
            self.inner.backend.clone(),
            self.inner.raw.public.clone(),
        ))
    }

    pub fn secret_key(&self) -> Result<SecretKey> {
        let raw = self.exportable()?;
        Ok(SecretKey::new(self.inner.backend.clone(), raw.clone()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("algorithm", &self.algorithm())
            .field("managed", &self.managed().is_some())
            .finish()
    }
}

struct PublicKeyInner {
    backend: AsymmetricBackend,
    raw: Vec<u8>,
}

#[derive(Clone)]
pub struct PublicKey {
    inner: Arc<PublicKeyInner>,
}

impl PublicKey {
    pub fn new(backend: AsymmetricBackend, raw: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(PublicKeyInner { backend, raw }),
        }
    }

    pub fn backend(&self) -> &AsymmetricBackend {
        &self.inner.backend
    }

    pub fn algorithm(&self) -> &'static str {
        self.inner.backend.name()
    }

    pub fn raw(&self) -> &[u8] {
        &self.inner.raw
    }
}

/// Secret key; keeps the derived keypair so the public half is at hand.
struct SecretKeyInner {
    backend: AsymmetricBackend,
    raw: RawKeypair,
}

#[derive(Clone)]
pub struct SecretKey {
    inner: Arc<SecretKeyInner>,
}

impl SecretKey {
    pub fn new(backend: AsymmetricBackend, raw: RawKeypair) -> Self {
        Self {
            inner: Arc::new(SecretKeyInner { backend, raw }),
        }
    }

    pub fn backend(&self) -> &AsymmetricBackend {
        &self.inner.backend
    }

    pub fn algorithm(&self) -> &'static str {
        self.inner.backend.name()
    }

    pub fn raw(&self) -> &[u8] {
        &self.inner.raw.secret
    }

    pub fn keypair(&self) -> &RawKeypair {
        &self.inner.raw
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(self.inner.backend.clone(), self.inner.raw.public.clone())
    }
}

struct SymmetricKeyInner {
    scheme: Arc<dyn SymmetricScheme>,
    raw: Zeroizing<Vec<u8>>,
    managed: OnceLock<ManagedBinding>,
}

/// Symmetric key tagged with the algorithm it was created for.
#[derive(Clone)]
pub struct SymmetricKey {
    inner: Arc<SymmetricKeyInner>,
}

impl SymmetricKey {
    pub fn new(scheme: Arc<dyn SymmetricScheme>, raw: Zeroizing<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(SymmetricKeyInner {
                scheme,
                raw,
                managed: OnceLock::new(),
            }),
        }
    }

    pub fn scheme(&self) -> &Arc<dyn SymmetricScheme> {
        &self.inner.scheme
    }

    pub fn algorithm(&self) -> &'static str {
        self.inner.scheme.name()
    }

    pub fn raw(&self) -> Result<&[u8]> {
        self.ensure_usable()?;
        Ok(&self.inner.raw)
    }

    pub fn managed(&self) -> Option<&ManagedBinding> {
        self.inner.managed.get()
    }

    pub fn is_same_key(&self, other: &SymmetricKey) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn bind(&self, binding: ManagedBinding) -> Result<()> {
        self.inner
            .managed
            .set(binding)
            .map_err(|_| CryptoError::InvalidOperation)
    }

    pub fn ensure_usable(&self) -> Result<()> {
        match self.inner.managed.get() {
            Some(binding) => binding.ensure_valid(),
            None => Ok(()),
        }
    }

    pub fn exportable(&self) -> Result<&[u8]> {
        if self.managed().is_some() {
            return Err(CryptoError::ProhibitedOperation);
        }
        self.raw()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("algorithm", &self.algorithm())
            .field("managed", &self.managed().is_some())
            .finish()
    }
}
