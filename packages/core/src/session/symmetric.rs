//! Symmetric session state machine.
//!
//! ```text
//!            absorb              squeeze*
//! Created ──────────▶ Absorbing ◀────────▶ Squeezing
//!    │                    │   (absorb only with sponge)
//!    └────── encrypt / decrypt ──────▶ Finalized
//! ```
//!
//! The next phase is computed before the backend runs and committed only
//! once the backend call succeeded, so a failed call leaves the session
//! exactly as it was.

use crate::crypto::keys::SymmetricKey;
use crate::crypto::provider::{Capabilities, SymmetricScheme, SymmetricSession};
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use std::sync::{Arc, Mutex};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Absorbing,
    Squeezing,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Absorb,
    Squeeze,
    Ratchet,
    Encrypt,
    Decrypt,
}

fn transition(phase: Phase, op: Op, caps: Capabilities) -> Result<Phase> {
    if phase == Phase::Finalized {
        // Повторное шифрование с тем же nonce
        return Err(match op {
            Op::Encrypt => CryptoError::ProhibitedOperation,
            _ => CryptoError::InvalidOperation,
        });
    }
    match op {
        Op::Absorb if phase == Phase::Squeezing && !caps.sponge => Err(CryptoError::InvalidOperation),
        Op::Absorb => Ok(Phase::Absorbing),
        Op::Squeeze => Ok(Phase::Squeezing),
        Op::Ratchet if !caps.ratchet => Err(CryptoError::NotImplemented),
        Op::Ratchet => Ok(Phase::Absorbing),
        Op::Encrypt | Op::Decrypt => Ok(Phase::Finalized),
    }
}

struct SessionInner {
    session: Box<dyn SymmetricSession>,
    phase: Phase,
}

/// Open symmetric session.
#[derive(Clone)]
pub struct SymmetricState {
    scheme: Arc<dyn SymmetricScheme>,
    options: Option<OptionsSnapshot>,
    max_tag_len: usize,
    inner: Arc<Mutex<SessionInner>>,
}

impl SymmetricState {
    /// Opens a session; the key, when given, must belong to `scheme`.
    /// Keyless algorithms refuse any key with `KeyNotSupported`.
    pub fn open(
        scheme: Arc<dyn SymmetricScheme>,
        key: Option<&SymmetricKey>,
        options: Option<OptionsSnapshot>,
    ) -> Result<Self> {
        let raw = match key {
            Some(_) if scheme.key_len().is_none() => return Err(CryptoError::KeyNotSupported),
            Some(key) if key.algorithm() != scheme.name() => return Err(CryptoError::InvalidKey),
            Some(key) => Some(key.raw()?),
            None => None,
        };
        let session = scheme.open(raw, options.as_ref())?;
        debug!(target: "hostcrypto::symmetric", algorithm = scheme.name(), keyed = raw.is_some(), "state opened");
        Ok(Self {
            max_tag_len: scheme.max_tag_len(),
            scheme,
            options,
            inner: Arc::new(Mutex::new(SessionInner {
                session,
                phase: Phase::Created,
            })),
        })
    }

    pub fn algorithm(&self) -> &'static str {
        self.scheme.name()
    }

    pub fn phase(&self) -> Result<Phase> {
        Ok(self.inner.lock()?.phase)
    }

    pub fn max_tag_len(&self) -> usize {
        self.max_tag_len
    }

    /// Copies a byte option of the session into `out`; returns its length.
    pub fn options_get(&self, name: &str, out: &mut [u8]) -> Result<usize> {
        let options = self.options.as_ref().ok_or(CryptoError::OptionNotSet)?;
        let value = options.get(name)?;
        if out.len() < value.len() {
            return Err(CryptoError::Overflow);
        }
        out[..value.len()].copy_from_slice(value);
        Ok(value.len())
    }

    pub fn options_get_u64(&self, name: &str) -> Result<u64> {
        self.options
            .as_ref()
            .ok_or(CryptoError::OptionNotSet)?
            .get_u64(name)
    }

    /// Runs `f` against the backend under the phase transition for `op`.
    fn step<T>(
        &self,
        op: Op,
        f: impl FnOnce(&mut dyn SymmetricSession) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self.inner.lock()?;
        let next = transition(inner.phase, op, self.scheme.capabilities())?;
        let out = f(inner.session.as_mut())?;
        inner.phase = next;
        Ok(out)
    }

    pub fn absorb(&self, data: &[u8]) -> Result<()> {
        self.step(Op::Absorb, |s| s.absorb(data))
    }

    pub fn squeeze(&self, out: &mut [u8]) -> Result<()> {
        self.step(Op::Squeeze, |s| s.squeeze(out))
    }

    pub fn squeeze_tag(&self) -> Result<SymmetricTag> {
        let raw = self.step(Op::Squeeze, |s| s.squeeze_tag())?;
        Ok(SymmetricTag::new(self.algorithm(), raw))
    }

    /// Derives a key for `target` from the session.
    pub fn squeeze_key(&self, target: Arc<dyn SymmetricScheme>) -> Result<SymmetricKey> {
        let raw = self.step(Op::Squeeze, |s| s.squeeze_key(target.as_ref()))?;
        debug!(target: "hostcrypto::symmetric", algorithm = self.algorithm(), derived = target.name(), "key squeezed");
        Ok(SymmetricKey::new(target, raw))
    }

    pub fn ratchet(&self) -> Result<()> {
        self.step(Op::Ratchet, |s| s.ratchet())?;
        debug!(target: "hostcrypto::symmetric", algorithm = self.algorithm(), "chain key ratcheted");
        Ok(())
    }

    /// Writes `ciphertext || tag` into `out`; returns the number of bytes
    /// written.
    pub fn encrypt(&self, out: &mut [u8], data: &[u8]) -> Result<usize> {
        if out.len() < data.len() + self.max_tag_len {
            return Err(CryptoError::Overflow);
        }
        let mut buf = Zeroizing::new(data.to_vec());
        let tag = self.step(Op::Encrypt, |s| s.encrypt_detached(&mut buf))?;
        out[..buf.len()].copy_from_slice(&buf);
        out[buf.len()..buf.len() + tag.len()].copy_from_slice(&tag);
        Ok(buf.len() + tag.len())
    }

    /// Writes the ciphertext into `out` and returns the tag separately.
    pub fn encrypt_detached(&self, out: &mut [u8], data: &[u8]) -> Result<SymmetricTag> {
        if out.len() < data.len() {
            return Err(CryptoError::Overflow);
        }
        let mut buf = Zeroizing::new(data.to_vec());
        let tag = self.step(Op::Encrypt, |s| s.encrypt_detached(&mut buf))?;
        out[..buf.len()].copy_from_slice(&buf);
        Ok(SymmetricTag::new(self.algorithm(), tag))
    }

    /// Decrypts `ciphertext || tag`; `out` is written only when the tag
    /// verifies.
    pub fn decrypt(&self, out: &mut [u8], data: &[u8]) -> Result<usize> {
        if self.max_tag_len == 0 {
            return Err(CryptoError::InvalidOperation);
        }
        if data.len() < self.max_tag_len {
            return Err(CryptoError::InvalidTag);
        }
        let (ciphertext, tag) = data.split_at(data.len() - self.max_tag_len);
        self.decrypt_detached(out, ciphertext, tag)
    }

    pub fn decrypt_detached(&self, out: &mut [u8], data: &[u8], raw_tag: &[u8]) -> Result<usize> {
        if out.len() < data.len() {
            return Err(CryptoError::Overflow);
        }
        // Приватная копия обнуляется при drop, в том числе при неверном теге
        let mut buf = Zeroizing::new(data.to_vec());
        self.step(Op::Decrypt, |s| s.decrypt_detached(&mut buf, raw_tag))?;
        out[..buf.len()].copy_from_slice(&buf);
        Ok(buf.len())
    }

    /// Independent copy of the session, including its phase.
    pub fn try_clone(&self) -> Result<Self> {
        let inner = self.inner.lock()?;
        Ok(Self {
            scheme: self.scheme.clone(),
            options: self.options.clone(),
            max_tag_len: self.max_tag_len,
            inner: Arc::new(Mutex::new(SessionInner {
                session: inner.session.box_clone(),
                phase: inner.phase,
            })),
        })
    }
}

/// Authentication tag produced by a symmetric session.
#[derive(Clone)]
pub struct SymmetricTag {
    algorithm: &'static str,
    raw: Arc<Zeroizing<Vec<u8>>>,
}

impl SymmetricTag {
    pub fn new(algorithm: &'static str, raw: Vec<u8>) -> Self {
        Self {
            algorithm,
            raw: Arc::new(Zeroizing::new(raw)),
        }
    }

    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn pull(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < self.raw.len() {
            return Err(CryptoError::Overflow);
        }
        buf[..self.raw.len()].copy_from_slice(&self.raw);
        Ok(self.raw.len())
    }

    /// Constant-time comparison against a caller-supplied tag.
    pub fn verify(&self, expected: &[u8]) -> Result<()> {
        if bool::from(self.raw.as_slice().ct_eq(expected)) {
            Ok(())
        } else {
            Err(CryptoError::InvalidTag)
        }
    }
}
