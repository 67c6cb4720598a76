// Host Crypto Core
// Handle-based криптографический runtime с менеджером секретов

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

// Модули
pub mod api;
pub mod array_output;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handles;
pub mod options;
pub mod registry;
pub mod secrets;
pub mod session;
pub mod utils;

// Re-exports для удобства
pub use api::CryptoCtx;
pub use config::Config;
pub use crypto::encoding::{KeypairEncoding, PublicKeyEncoding, SecretKeyEncoding, SignatureEncoding};
pub use crypto::provider::AlgorithmType;
pub use error::{CryptoError, Result};
pub use handles::{Handle, HandleType};
pub use options::OptionsType;
pub use secrets::{SecretId, Version, VERSION_LATEST, VERSION_UNSPECIFIED};
pub use utils::time::{Clock, ManualClock, SystemClock, Timestamp};
