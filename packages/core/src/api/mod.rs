// Публичный API runtime
// Все объекты доступны вызывающей стороне только через handle

pub mod asymmetric;
pub mod common;
pub mod external_secrets;
pub mod key_exchange;
pub mod signatures;
pub mod symmetric;

use crate::array_output::ArrayOutput;
use crate::config::Config;
use crate::crypto::keys::{Keypair, PublicKey, SecretKey, SymmetricKey};
use crate::crypto::provider::AlgorithmType;
use crate::error::{CryptoError, Result};
use crate::handles::{Handle, HandleAllocator, HandleTable, HandleType};
use crate::options::{Options, OptionsSnapshot, OptionsType};
use crate::registry::Registry;
use crate::secrets::SecretsManager;
use crate::session::{Signature, SignatureState, SymmetricState, SymmetricTag, VerificationState};
use crate::utils::time::{Clock, SystemClock};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// Таблицы handle одного контекста
pub(crate) struct HandleTables {
    pub options: HandleTable<Options>,
    pub array_output: HandleTable<ArrayOutput>,
    pub keypair: HandleTable<Keypair>,
    pub publickey: HandleTable<PublicKey>,
    pub secretkey: HandleTable<SecretKey>,
    pub signature: HandleTable<Signature>,
    pub signature_state: HandleTable<SignatureState>,
    pub verification_state: HandleTable<VerificationState>,
    pub symmetric_key: HandleTable<SymmetricKey>,
    pub symmetric_state: HandleTable<SymmetricState>,
    pub symmetric_tag: HandleTable<SymmetricTag>,
    pub secrets_manager: HandleTable<SecretsManager>,
}

impl HandleTables {
    fn new(max_handles: u32) -> Self {
        let allocator = Arc::new(HandleAllocator::new(max_handles));
        Self {
            options: HandleTable::new(HandleType::Options, allocator.clone()),
            array_output: HandleTable::new(HandleType::ArrayOutput, allocator.clone()),
            keypair: HandleTable::new(HandleType::Keypair, allocator.clone()),
            publickey: HandleTable::new(HandleType::PublicKey, allocator.clone()),
            secretkey: HandleTable::new(HandleType::SecretKey, allocator.clone()),
            signature: HandleTable::new(HandleType::Signature, allocator.clone()),
            signature_state: HandleTable::new(HandleType::SignatureState, allocator.clone()),
            verification_state: HandleTable::new(HandleType::VerificationState, allocator.clone()),
            symmetric_key: HandleTable::new(HandleType::SymmetricKey, allocator.clone()),
            symmetric_state: HandleTable::new(HandleType::SymmetricState, allocator.clone()),
            symmetric_tag: HandleTable::new(HandleType::SymmetricTag, allocator.clone()),
            secrets_manager: HandleTable::new(HandleType::SecretsManager, allocator),
        }
    }
}

/// Контекст runtime: реестр алгоритмов, часы и все таблицы handle.
///
/// Методы сгруппированы по модулям:
///
/// - [`common`]: options, array output
/// - [`asymmetric`]: keypair, publickey, secretkey
/// - [`signatures`]: подписи и их проверка
/// - [`symmetric`]: симметричные ключи, состояния и теги
/// - [`key_exchange`]: DH и инкапсуляция
/// - [`external_secrets`]: менеджер секретов
pub struct CryptoCtx {
    pub(crate) config: Config,
    pub(crate) registry: Registry,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) handles: HandleTables,
}

impl CryptoCtx {
    /// Контекст с глобальной конфигурацией и системными часами
    pub fn new() -> Self {
        Self::with_config(Config::global().clone(), Arc::new(SystemClock::new()))
    }

    pub fn with_config(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self::with_registry(config, clock, Registry::with_defaults())
    }

    /// Context over a caller-assembled registry.
    pub fn with_registry(config: Config, clock: Arc<dyn Clock>, registry: Registry) -> Self {
        debug!(target: "hostcrypto::handles", max_handles = config.max_handles, "context created");
        Self {
            handles: HandleTables::new(config.max_handles),
            config,
            registry,
            clock,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves an optional options handle, checking that it was opened for
    /// `expected`.
    pub(crate) fn options_snapshot(
        &self,
        handle: Option<Handle>,
        expected: OptionsType,
    ) -> Result<Option<OptionsSnapshot>> {
        let Some(handle) = handle else {
            return Ok(None);
        };
        let options = self.handles.options.get(handle)?;
        if options.kind() != expected {
            return Err(CryptoError::InvalidHandle);
        }
        options.snapshot().map(Some)
    }

    pub(crate) fn output(&self, data: Vec<u8>) -> Result<Handle> {
        self.handles.array_output.register(ArrayOutput::new(data))
    }

    pub(crate) fn secret_output(&self, data: Zeroizing<Vec<u8>>) -> Result<Handle> {
        self.handles
            .array_output
            .register(ArrayOutput::from_secret(data))
    }
}

impl Default for CryptoCtx {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn options_type_for(alg_type: AlgorithmType) -> OptionsType {
    match alg_type {
        AlgorithmType::Signatures => OptionsType::Signatures,
        AlgorithmType::Symmetric => OptionsType::Symmetric,
        AlgorithmType::KeyExchange => OptionsType::KeyExchange,
    }
}
