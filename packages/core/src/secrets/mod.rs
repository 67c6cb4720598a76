//! Менеджер секретов
//!
//! Хранит внешние секреты и управляемые ключи под случайными
//! идентификаторами с версиями.
//!
//! ## Жизненный цикл версии
//!
//! ```text
//! store / generate_managed ──▶ v1
//! replace                  ──▶ v2, v3, ...   (старые версии читаемы)
//! invalidate(v)            ──▶ v удалена, все handle из неё → InvalidKey
//! ```
//!
//! Срок действия (только у внешних секретов) проверяется при чтении по
//! часам контекста; запись с истёкшим сроком остаётся в хранилище до
//! явной инвалидации.

pub mod store;
pub mod transport;

use crate::config::Config;
use crate::crypto::keys::{Keypair, ManagedBinding, SymmetricKey};
use crate::crypto::provider::SymmetricScheme;
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use crate::registry::{AsymmetricBackend, Registry};
use crate::utils::time::{Clock, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use store::{MemoryStore, RecordKind, SecretRecord, SecretStore, StoredSecret};
use tracing::{debug, info};
use transport::Transport;
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

pub type Version = u64;

/// Reads or invalidates the newest version that is still valid.
pub const VERSION_LATEST: Version = 0xff00_0000_0000_0001;

/// No particular version: reads behave like [`VERSION_LATEST`],
/// invalidation removes every version.
pub const VERSION_UNSPECIFIED: Version = 0xff00_0000_0000_0000;

/// Идентификатор секрета (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecretId(Uuid);

impl SecretId {
    pub const LEN: usize = 16;

    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Uuid::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidLength)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Содержимое конверта external_secret_encapsulate
#[derive(Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
struct TransportPayload {
    #[serde(with = "serde_bytes")]
    secret: Vec<u8>,
    expiration: Option<Timestamp>,
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

struct ManagerInner {
    instance: u64,
    store: Box<dyn SecretStore>,
    clock: Arc<dyn Clock>,
    transport: Transport,
}

/// Versioned secrets manager behind a secrets-manager handle.
#[derive(Clone)]
pub struct SecretsManager {
    inner: Arc<ManagerInner>,
}

impl SecretsManager {
    /// Opens a manager backed by an in-memory store. A `transport_key`
    /// option seeds the transport keypair.
    pub fn open(
        registry: &Registry,
        config: &Config,
        clock: Arc<dyn Clock>,
        options: Option<&OptionsSnapshot>,
    ) -> Result<Self> {
        Self::with_store(registry, config, clock, options, Box::new(MemoryStore::new()))
    }

    pub fn with_store(
        registry: &Registry,
        config: &Config,
        clock: Arc<dyn Clock>,
        options: Option<&OptionsSnapshot>,
        store: Box<dyn SecretStore>,
    ) -> Result<Self> {
        let seed = match options {
            Some(options) => options.get_optional("transport_key")?,
            None => None,
        };
        let transport = Transport::new(registry, config, seed)?;
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        info!(target: "hostcrypto::secrets", instance, shared_transport = seed.is_some(), "secrets manager opened");
        Ok(Self {
            inner: Arc::new(ManagerInner {
                instance,
                store,
                clock,
                transport,
            }),
        })
    }

    pub fn instance(&self) -> u64 {
        self.inner.instance
    }

    fn binding(&self, id: SecretId, version: Version, stored: &StoredSecret) -> ManagedBinding {
        ManagedBinding {
            manager: self.inner.instance,
            id,
            version,
            revoked: stored.revoked.clone(),
        }
    }

    /// Ключ привязывается только после записи в хранилище; если привязка
    /// не удалась (ключ уже под управлением), запись удаляется.
    fn bind_inserted(&self, id: &SecretId, bound: Result<()>) -> Result<()> {
        if let Err(e) = bound {
            self.inner.store.invalidate(id, None, VERSION_UNSPECIFIED)?;
            return Err(e);
        }
        Ok(())
    }

    fn check_expiration(&self, expiration: Option<Timestamp>) -> Result<()> {
        match expiration {
            Some(at) if self.inner.clock.now() >= at => Err(CryptoError::Expired),
            _ => Ok(()),
        }
    }

    /// Invalidates `version` of `id` whatever kind of record it holds.
    pub fn invalidate(&self, id: &SecretId, version: Version) -> Result<()> {
        self.inner.store.invalidate(id, None, version)?;
        info!(target: "hostcrypto::secrets", %id, version, "secret invalidated");
        Ok(())
    }

    // === Внешние секреты ===

    pub fn store_external(&self, secret: &[u8], expiration: Option<Timestamp>) -> Result<SecretId> {
        let id = SecretId::generate();
        self.inner.store.insert(
            id,
            StoredSecret::new(SecretRecord::External {
                secret: Zeroizing::new(secret.to_vec()),
                expiration,
            }),
        )?;
        debug!(target: "hostcrypto::secrets", %id, ?expiration, "external secret stored");
        Ok(id)
    }

    pub fn replace_external(
        &self,
        secret: &[u8],
        expiration: Option<Timestamp>,
        id: &SecretId,
    ) -> Result<Version> {
        let version = self.inner.store.append(id, RecordKind::External, &mut |_| {
            Ok(StoredSecret::new(SecretRecord::External {
                secret: Zeroizing::new(secret.to_vec()),
                expiration,
            }))
        })?;
        debug!(target: "hostcrypto::secrets", %id, version, "external secret replaced");
        Ok(version)
    }

    pub fn external_from_id(&self, id: &SecretId, version: Version) -> Result<Zeroizing<Vec<u8>>> {
        let (_, stored) = self.inner.store.get(id, Some(RecordKind::External), version)?;
        match stored.record {
            SecretRecord::External { secret, expiration } => {
                self.check_expiration(expiration)?;
                Ok(secret)
            }
            _ => Err(CryptoError::NotFound),
        }
    }

    pub fn invalidate_external(&self, id: &SecretId, version: Version) -> Result<()> {
        self.inner
            .store
            .invalidate(id, Some(RecordKind::External), version)?;
        info!(target: "hostcrypto::secrets", %id, version, "external secret invalidated");
        Ok(())
    }

    /// Seals a secret for another manager sharing this manager's transport key.
    pub fn encapsulate(&self, secret: &[u8], expiration: Option<Timestamp>) -> Result<Vec<u8>> {
        let payload = TransportPayload {
            secret: secret.to_vec(),
            expiration,
        };
        let encoded = Zeroizing::new(bincode::serialize(&payload)?);
        self.inner.transport.seal(&encoded)
    }

    pub fn decapsulate(&self, encapsulated: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let plaintext = self.inner.transport.open(encapsulated)?;
        let mut payload: TransportPayload = bincode::deserialize(&plaintext)?;
        self.check_expiration(payload.expiration)?;
        Ok(Zeroizing::new(std::mem::take(&mut payload.secret)))
    }

    // === Управляемые пары ключей ===

    /// Puts an unmanaged keypair under management as version 1 of a new id.
    pub fn store_keypair(&self, keypair: &Keypair) -> Result<SecretId> {
        if keypair.managed().is_some() {
            return Err(CryptoError::InvalidOperation);
        }
        keypair.ensure_usable()?;
        let id = SecretId::generate();
        let stored = StoredSecret::new(SecretRecord::Keypair(keypair.clone()));
        let binding = self.binding(id, 1, &stored);
        self.inner.store.insert(id, stored)?;
        self.bind_inserted(&id, keypair.bind(binding))?;
        info!(target: "hostcrypto::secrets", %id, algorithm = keypair.algorithm(), "keypair stored");
        Ok(id)
    }

    pub fn generate_keypair(&self, backend: AsymmetricBackend) -> Result<Keypair> {
        let raw = backend.codec().generate_keypair()?;
        let keypair = Keypair::new(backend, raw);
        self.store_keypair(&keypair)?;
        Ok(keypair)
    }

    /// Stores `new` as the next version of the id `old` is managed under.
    pub fn replace_keypair(&self, old: &Keypair, new: &Keypair) -> Result<Version> {
        let id = match old.managed() {
            Some(binding) if binding.manager == self.inner.instance => binding.id,
            _ => return Err(CryptoError::NotFound),
        };
        if new.managed().is_some() {
            return Err(CryptoError::InvalidOperation);
        }
        if !old.backend().same_algorithm(new.backend()) {
            return Err(CryptoError::IncompatibleKeys);
        }
        new.ensure_usable()?;
        let version = self.inner.store.append(&id, RecordKind::Keypair, &mut |version| {
            let stored = StoredSecret::new(SecretRecord::Keypair(new.clone()));
            new.bind(self.binding(id, version, &stored))?;
            Ok(stored)
        })?;
        info!(target: "hostcrypto::secrets", %id, version, "keypair replaced");
        Ok(version)
    }

    pub fn keypair_from_id(&self, id: &SecretId, version: Version) -> Result<Keypair> {
        let (_, stored) = self.inner.store.get(id, Some(RecordKind::Keypair), version)?;
        match stored.record {
            SecretRecord::Keypair(keypair) => Ok(keypair),
            _ => Err(CryptoError::NotFound),
        }
    }

    // === Управляемые симметричные ключи ===

    pub fn store_symmetric_key(&self, key: &SymmetricKey) -> Result<SecretId> {
        if key.managed().is_some() {
            return Err(CryptoError::InvalidOperation);
        }
        key.ensure_usable()?;
        let id = SecretId::generate();
        let stored = StoredSecret::new(SecretRecord::SymmetricKey(key.clone()));
        let binding = self.binding(id, 1, &stored);
        self.inner.store.insert(id, stored)?;
        self.bind_inserted(&id, key.bind(binding))?;
        info!(target: "hostcrypto::secrets", %id, algorithm = key.algorithm(), "symmetric key stored");
        Ok(id)
    }

    pub fn generate_symmetric_key(&self, key: SymmetricKey) -> Result<SymmetricKey> {
        self.store_symmetric_key(&key)?;
        Ok(key)
    }

    pub fn replace_symmetric_key(&self, old: &SymmetricKey, new: &SymmetricKey) -> Result<Version> {
        let id = match old.managed() {
            Some(binding) if binding.manager == self.inner.instance => binding.id,
            _ => return Err(CryptoError::NotFound),
        };
        if new.managed().is_some() {
            return Err(CryptoError::InvalidOperation);
        }
        if old.algorithm() != new.algorithm() {
            return Err(CryptoError::IncompatibleKeys);
        }
        new.ensure_usable()?;
        let version = self.inner.store.append(&id, RecordKind::SymmetricKey, &mut |version| {
            let stored = StoredSecret::new(SecretRecord::SymmetricKey(new.clone()));
            new.bind(self.binding(id, version, &stored))?;
            Ok(stored)
        })?;
        info!(target: "hostcrypto::secrets", %id, version, "symmetric key replaced");
        Ok(version)
    }

    pub fn symmetric_key_from_id(&self, id: &SecretId, version: Version) -> Result<SymmetricKey> {
        let (_, stored) = self
            .inner
            .store
            .get(id, Some(RecordKind::SymmetricKey), version)?;
        match stored.record {
            SecretRecord::SymmetricKey(key) => Ok(key),
            _ => Err(CryptoError::NotFound),
        }
    }
}

/// Generates fresh key material for a symmetric algorithm.
pub(crate) fn generate_symmetric_material(scheme: &dyn SymmetricScheme) -> Result<Zeroizing<Vec<u8>>> {
    use rand::RngCore;

    let len = scheme.key_len().ok_or(CryptoError::KeyNotSupported)?;
    let mut raw = Zeroizing::new(vec![0u8; len]);
    rand::rngs::OsRng.try_fill_bytes(&mut raw)?;
    Ok(raw)
}
