//! Options handles
//!
//! An options object is a small named-parameter bag attached to one
//! [`OptionsType`]. Names are case-insensitive and checked against the
//! closed set of parameters known for that type when they are set.
//! Operations consuming options take a [`OptionsSnapshot`], so mutating the
//! handle afterwards never reaches an already-open session.

use crate::error::{CryptoError, Result};
use std::sync::{Arc, Mutex};
use zeroize::Zeroizing;

/// Caller-provided scratch memory. No registered algorithm borrows caller
/// memory, so every options type refuses it with `UnsupportedFeature`.
pub type GuestBuffer = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionsType {
    Signatures,
    Symmetric,
    KeyExchange,
    SecretsManager,
}

#[derive(Clone)]
pub enum OptionValue {
    Bytes(Zeroizing<Vec<u8>>),
    U64(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Bytes,
    U64,
}

/// Длина транспортного ключа менеджера секретов (seed X25519)
pub const TRANSPORT_KEY_LEN: usize = 32;

fn value_kind(options_type: OptionsType, name: &str) -> Result<ValueKind> {
    match (options_type, name) {
        (OptionsType::Symmetric, "context" | "salt" | "nonce") => Ok(ValueKind::Bytes),
        (OptionsType::Symmetric, "memory_limit" | "ops_limit" | "parallelism") => {
            Ok(ValueKind::U64)
        }
        (OptionsType::SecretsManager, "transport_key") => Ok(ValueKind::Bytes),
        _ => Err(CryptoError::UnsupportedOption),
    }
}

/// Mutable options object behind an options handle.
#[derive(Clone)]
pub struct Options {
    kind: OptionsType,
    values: Arc<Mutex<Vec<(String, OptionValue)>>>,
}

impl Options {
    pub fn new(kind: OptionsType) -> Self {
        Self {
            kind,
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn kind(&self) -> OptionsType {
        self.kind
    }

    pub fn set(&self, name: &str, value: &[u8]) -> Result<()> {
        let name = self.check(name, ValueKind::Bytes)?;
        if name == "transport_key" && value.len() != TRANSPORT_KEY_LEN {
            return Err(CryptoError::InvalidLength);
        }
        self.store(name, OptionValue::Bytes(Zeroizing::new(value.to_vec())))
    }

    pub fn set_u64(&self, name: &str, value: u64) -> Result<()> {
        let name = self.check(name, ValueKind::U64)?;
        self.store(name, OptionValue::U64(value))
    }

    pub fn set_guest_buffer(&self, _name: &str, _buffer: GuestBuffer) -> Result<()> {
        Err(CryptoError::UnsupportedFeature)
    }

    /// Copies the current values out.
    pub fn snapshot(&self) -> Result<OptionsSnapshot> {
        Ok(OptionsSnapshot {
            kind: self.kind,
            values: self.values.lock()?.clone(),
        })
    }

    fn check(&self, name: &str, expected: ValueKind) -> Result<String> {
        let name = name.to_lowercase();
        if value_kind(self.kind, &name)? != expected {
            return Err(CryptoError::UnsupportedOption);
        }
        Ok(name)
    }

    fn store(&self, name: String, value: OptionValue) -> Result<()> {
        let mut values = self.values.lock()?;
        match values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => values.push((name, value)),
        }
        Ok(())
    }
}

/// Frozen copy of an options object, owned by the operation that consumed it.
#[derive(Clone)]
pub struct OptionsSnapshot {
    kind: OptionsType,
    values: Vec<(String, OptionValue)>,
}

impl OptionsSnapshot {
    pub fn kind(&self) -> OptionsType {
        self.kind
    }

    fn lookup(&self, name: &str, expected: ValueKind) -> Result<&OptionValue> {
        let name = name.to_lowercase();
        if value_kind(self.kind, &name)? != expected {
            return Err(CryptoError::UnsupportedOption);
        }
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or(CryptoError::OptionNotSet)
    }

    pub fn get(&self, name: &str) -> Result<&[u8]> {
        match self.lookup(name, ValueKind::Bytes)? {
            OptionValue::Bytes(bytes) => Ok(bytes.as_slice()),
            _ => Err(CryptoError::UnsupportedOption),
        }
    }

    pub fn get_u64(&self, name: &str) -> Result<u64> {
        match self.lookup(name, ValueKind::U64)? {
            OptionValue::U64(v) => Ok(*v),
            _ => Err(CryptoError::UnsupportedOption),
        }
    }

    /// Like [`get`](Self::get) but treats an unset option as absent.
    pub fn get_optional(&self, name: &str) -> Result<Option<&[u8]>> {
        match self.get(name) {
            Ok(v) => Ok(Some(v)),
            Err(CryptoError::OptionNotSet) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
