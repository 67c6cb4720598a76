//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CryptoCtx (api, handles)                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   Keys (keys, encoding)   │  │  Sessions (session)      │
//! │  - Keypair / PublicKey    │  │  - Symmetric state       │
//! │  - SecretKey / Symmetric  │  │  - Signature states      │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Backends (provider, suites)                    │
//! │  - KeyCodec / SignatureScheme / KeyExchangeScheme           │
//! │  - SymmetricScheme / SymmetricSession                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

/// Трейты алгоритмов
pub mod provider;

/// Встроенные алгоритмы
pub mod suites;

/// Объекты ключей
pub mod keys;

/// Форматы импорта/экспорта ключей и подписей
pub mod encoding;

pub use encoding::{KeypairEncoding, PublicKeyEncoding, SecretKeyEncoding, SignatureEncoding};
pub use keys::{Keypair, PublicKey, RawKeypair, SecretKey, SymmetricKey};
pub use provider::AlgorithmType;
