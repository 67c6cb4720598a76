// Хранилище версий секретов
//
// Каждый id хранит записи одного вида (внешний секрет, пара ключей или
// симметричный ключ). Номера версий только растут и никогда не выдаются
// повторно, даже после инвалидации.

use super::{SecretId, Version, VERSION_LATEST, VERSION_UNSPECIFIED};
use crate::crypto::keys::{Keypair, SymmetricKey};
use crate::error::{CryptoError, Result};
use crate::utils::time::Timestamp;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    External,
    Keypair,
    SymmetricKey,
}

#[derive(Clone)]
pub enum SecretRecord {
    External {
        secret: Zeroizing<Vec<u8>>,
        expiration: Option<Timestamp>,
    },
    Keypair(Keypair),
    SymmetricKey(SymmetricKey),
}

impl SecretRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            SecretRecord::External { .. } => RecordKind::External,
            SecretRecord::Keypair(_) => RecordKind::Keypair,
            SecretRecord::SymmetricKey(_) => RecordKind::SymmetricKey,
        }
    }
}

/// One version of a secret together with its revocation flag.
#[derive(Clone)]
pub struct StoredSecret {
    pub record: SecretRecord,
    pub revoked: Arc<AtomicBool>,
}

impl StoredSecret {
    pub fn new(record: SecretRecord) -> Self {
        Self {
            record,
            revoked: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Persistence backend of a secrets manager.
///
/// `kind` arguments restrict an operation to ids holding that kind of
/// record; a mismatch is reported as `NotFound`.
pub trait SecretStore: Send + Sync {
    /// Stores version 1 of a new id.
    fn insert(&self, id: SecretId, secret: StoredSecret) -> Result<()>;

    /// Stores the next version of `id`. `build` receives the version number
    /// being assigned and runs under the store's write lock.
    fn append(
        &self,
        id: &SecretId,
        kind: RecordKind,
        build: &mut dyn FnMut(Version) -> Result<StoredSecret>,
    ) -> Result<Version>;

    /// Resolves `version` (or `LATEST`/`UNSPECIFIED`) to a stored secret.
    fn get(&self, id: &SecretId, kind: Option<RecordKind>, version: Version)
        -> Result<(Version, StoredSecret)>;

    /// Removes one version (`LATEST` = newest, `UNSPECIFIED` = all) and
    /// revokes it.
    fn invalidate(&self, id: &SecretId, kind: Option<RecordKind>, version: Version) -> Result<()>;
}

struct VersionChain {
    kind: RecordKind,
    next: Version,
    versions: BTreeMap<Version, StoredSecret>,
}

impl VersionChain {
    fn check(&self, kind: Option<RecordKind>) -> Result<()> {
        match kind {
            Some(kind) if kind != self.kind => Err(CryptoError::NotFound),
            _ => Ok(()),
        }
    }
}

fn revoke(secret: &StoredSecret) {
    secret.revoked.store(true, Ordering::SeqCst);
}

/// In-memory хранилище
#[derive(Default)]
pub struct MemoryStore {
    chains: RwLock<HashMap<SecretId, VersionChain>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryStore {
    fn insert(&self, id: SecretId, secret: StoredSecret) -> Result<()> {
        let mut chains = self.chains.write()?;
        if chains.contains_key(&id) {
            return Err(CryptoError::InvalidOperation);
        }
        let mut versions = BTreeMap::new();
        let kind = secret.record.kind();
        versions.insert(1, secret);
        chains.insert(
            id,
            VersionChain {
                kind,
                next: 2,
                versions,
            },
        );
        Ok(())
    }

    fn append(
        &self,
        id: &SecretId,
        kind: RecordKind,
        build: &mut dyn FnMut(Version) -> Result<StoredSecret>,
    ) -> Result<Version> {
        let mut chains = self.chains.write()?;
        let chain = chains.get_mut(id).ok_or(CryptoError::NotFound)?;
        chain.check(Some(kind))?;
        let version = chain.next;
        if version >= VERSION_UNSPECIFIED {
            return Err(CryptoError::Overflow);
        }
        let secret = build(version)?;
        if secret.record.kind() != kind {
            return Err(CryptoError::InternalError);
        }
        chain.versions.insert(version, secret);
        chain.next = version + 1;
        Ok(version)
    }

    fn get(
        &self,
        id: &SecretId,
        kind: Option<RecordKind>,
        version: Version,
    ) -> Result<(Version, StoredSecret)> {
        let chains = self.chains.read()?;
        let chain = chains.get(id).ok_or(CryptoError::NotFound)?;
        chain.check(kind)?;
        let found = match version {
            VERSION_LATEST | VERSION_UNSPECIFIED => chain.versions.iter().next_back(),
            v => chain.versions.get_key_value(&v),
        };
        found
            .map(|(v, s)| (*v, s.clone()))
            .ok_or(CryptoError::NotFound)
    }

    fn invalidate(&self, id: &SecretId, kind: Option<RecordKind>, version: Version) -> Result<()> {
        let mut chains = self.chains.write()?;
        let chain = chains.get_mut(id).ok_or(CryptoError::NotFound)?;
        chain.check(kind)?;
        match version {
            VERSION_UNSPECIFIED => {
                if chain.versions.is_empty() {
                    return Err(CryptoError::NotFound);
                }
                for secret in chain.versions.values() {
                    revoke(secret);
                }
                chain.versions.clear();
            }
            VERSION_LATEST => {
                let (_, secret) = chain.versions.pop_last().ok_or(CryptoError::NotFound)?;
                revoke(&secret);
            }
            v => {
                let secret = chain.versions.remove(&v).ok_or(CryptoError::NotFound)?;
                revoke(&secret);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(byte: u8) -> StoredSecret {
        StoredSecret::new(SecretRecord::External {
            secret: Zeroizing::new(vec![byte; 4]),
            expiration: None,
        })
    }

    fn secret_byte(stored: &StoredSecret) -> u8 {
        match &stored.record {
            SecretRecord::External { secret, .. } => secret[0],
            _ => panic!("not an external secret"),
        }
    }

    fn store_with_versions(n: u8) -> (MemoryStore, SecretId) {
        let store = MemoryStore::new();
        let id = SecretId::generate();
        store.insert(id, external(1)).unwrap();
        for b in 2..=n {
            store
                .append(&id, RecordKind::External, &mut |_| Ok(external(b)))
                .unwrap();
        }
        (store, id)
    }

    #[test]
    fn test_versions_and_latest() {
        let (store, id) = store_with_versions(3);
        let (v, s) = store.get(&id, None, VERSION_LATEST).unwrap();
        assert_eq!((v, secret_byte(&s)), (3, 3));
        let (v, s) = store.get(&id, None, 2).unwrap();
        assert_eq!((v, secret_byte(&s)), (2, 2));
        assert_eq!(store.get(&id, None, 9).err().map(|e| e.code()), Some(CryptoError::NotFound.code()));
    }

    #[test]
    fn test_invalidate_is_forward_only() {
        let (store, id) = store_with_versions(2);
        let (_, latest) = store.get(&id, None, VERSION_LATEST).unwrap();
        store.invalidate(&id, None, VERSION_LATEST).unwrap();
        assert!(latest.revoked.load(Ordering::SeqCst));

        let (v, _) = store.get(&id, None, VERSION_UNSPECIFIED).unwrap();
        assert_eq!(v, 1);
        // Номер 2 не выдаётся повторно
        let next = store
            .append(&id, RecordKind::External, &mut |_| Ok(external(7)))
            .unwrap();
        assert_eq!(next, 3);
    }

    #[test]
    fn test_invalidate_all() {
        let (store, id) = store_with_versions(3);
        store.invalidate(&id, None, VERSION_UNSPECIFIED).unwrap();
        assert!(store.get(&id, None, VERSION_LATEST).is_err());
        assert_eq!(
            store.invalidate(&id, None, VERSION_UNSPECIFIED),
            Err(CryptoError::NotFound)
        );
    }

    #[test]
    fn test_kind_mismatch_is_not_found() {
        let (store, id) = store_with_versions(1);
        assert!(store.get(&id, Some(RecordKind::Keypair), 1).is_err());
        assert_eq!(
            store.append(&id, RecordKind::SymmetricKey, &mut |_| Ok(external(0))),
            Err(CryptoError::NotFound)
        );
        assert_eq!(
            store.invalidate(&id, Some(RecordKind::Keypair), 1),
            Err(CryptoError::NotFound)
        );
    }

    #[test]
    fn test_failed_build_keeps_counter() {
        let (store, id) = store_with_versions(1);
        assert_eq!(
            store.append(&id, RecordKind::External, &mut |_| Err(CryptoError::InvalidOperation)),
            Err(CryptoError::InvalidOperation)
        );
        let v = store
            .append(&id, RecordKind::External, &mut |_| Ok(external(2)))
            .unwrap();
        assert_eq!(v, 2);
    }
}
