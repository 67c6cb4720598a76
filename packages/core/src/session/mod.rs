//! Сессии поверх ключей
//!
//! ## Архитектура
//!
//! ```text
//! SymmetricState
//!   ├── SymmetricScheme / SymmetricSession  - алгоритм
//!   └── Phase                               - машина состояний
//!
//! SignatureState / VerificationState
//!   ├── Keypair / PublicKey                 - ключ удерживается сессией
//!   └── SignerState / VerifierState         - алгоритм
//! ```
//!
//! ## Ответственность
//!
//! - Порядок вызовов (absorb → squeeze, sign один раз, verify терминален)
//! - Проверка размеров выходных буферов
//! - Отсутствие частичного результата при ошибке
//!
//! ## Не отвечает за
//!
//! - Выдачу handle (это делает `api`)
//! - Математику алгоритмов (это делают `crypto::suites`)

pub mod signature;
pub mod symmetric;

pub use signature::{Signature, SignatureState, VerificationState};
pub use symmetric::{Phase, SymmetricState, SymmetricTag};
