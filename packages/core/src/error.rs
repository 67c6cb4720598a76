//! Error taxonomy shared by every entry point.
//!
//! Every operation returns either a value or exactly one [`CryptoError`].
//! An adapter exposing the API through a flat status-code ABI uses
//! [`CryptoError::code`]; success is [`STATUS_SUCCESS`].

use std::sync::PoisonError;
use thiserror::Error;

/// Status code reported for a successful call.
pub const STATUS_SUCCESS: u16 = 0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptoError {
    // Ошибки входных данных
    #[error("guest error")]
    GuestError,
    #[error("unsupported encoding")]
    UnsupportedEncoding,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("unsupported option")]
    UnsupportedOption,
    #[error("invalid length")]
    InvalidLength,
    #[error("invalid key")]
    InvalidKey,
    #[error("invalid handle")]
    InvalidHandle,
    #[error("key not supported by this operation")]
    KeyNotSupported,
    #[error("key required")]
    KeyRequired,
    #[error("nonce required")]
    NonceRequired,
    #[error("invalid nonce")]
    InvalidNonce,
    #[error("option not set")]
    OptionNotSet,
    #[error("required parameters missing")]
    ParametersMissing,

    // Операционные ошибки
    #[error("not implemented")]
    NotImplemented,
    #[error("unsupported feature")]
    UnsupportedFeature,
    #[error("prohibited operation")]
    ProhibitedOperation,
    #[error("invalid operation")]
    InvalidOperation,
    #[error("handle closed")]
    Closed,
    #[error("overflow")]
    Overflow,
    #[error("too many handles")]
    TooManyHandles,
    #[error("not found")]
    NotFound,
    #[error("incompatible keys")]
    IncompatibleKeys,
    #[error("expired")]
    Expired,
    #[error("operation in progress")]
    InProgress,

    // Результаты криптографических проверок
    #[error("verification failed")]
    VerificationFailed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid authentication tag")]
    InvalidTag,
    #[error("random number generator failure")]
    RngError,
    #[error("algorithm failure")]
    AlgorithmFailure,
    #[error("internal error")]
    InternalError,
}

impl CryptoError {
    /// Stable numeric status for this error.
    pub fn code(self) -> u16 {
        match self {
            CryptoError::GuestError => 1,
            CryptoError::NotImplemented => 2,
            CryptoError::UnsupportedFeature => 3,
            CryptoError::ProhibitedOperation => 4,
            CryptoError::UnsupportedEncoding => 5,
            CryptoError::UnsupportedAlgorithm => 6,
            CryptoError::UnsupportedOption => 7,
            CryptoError::InvalidKey => 8,
            CryptoError::InvalidLength => 9,
            CryptoError::VerificationFailed => 10,
            CryptoError::RngError => 11,
            CryptoError::AlgorithmFailure => 12,
            CryptoError::InvalidSignature => 13,
            CryptoError::Closed => 14,
            CryptoError::InvalidHandle => 15,
            CryptoError::Overflow => 16,
            CryptoError::InternalError => 17,
            CryptoError::TooManyHandles => 18,
            CryptoError::KeyNotSupported => 19,
            CryptoError::KeyRequired => 20,
            CryptoError::InvalidTag => 21,
            CryptoError::InvalidOperation => 22,
            CryptoError::NonceRequired => 23,
            CryptoError::InvalidNonce => 24,
            CryptoError::OptionNotSet => 25,
            CryptoError::NotFound => 26,
            CryptoError::ParametersMissing => 27,
            CryptoError::InProgress => 28,
            CryptoError::IncompatibleKeys => 29,
            CryptoError::Expired => 30,
        }
    }

    /// `true` for outcomes that report a failed integrity check rather than
    /// a misuse or a system fault.
    pub fn is_integrity_failure(self) -> bool {
        matches!(
            self,
            CryptoError::InvalidTag
                | CryptoError::InvalidSignature
                | CryptoError::VerificationFailed
        )
    }
}

/// Collapses a result into the status code an adapter would report.
pub fn status_of<T>(result: &Result<T>) -> u16 {
    match result {
        Ok(_) => STATUS_SUCCESS,
        Err(e) => e.code(),
    }
}

impl<T> From<PoisonError<T>> for CryptoError {
    fn from(_: PoisonError<T>) -> Self {
        CryptoError::InternalError
    }
}

impl From<rand_core::Error> for CryptoError {
    fn from(_: rand_core::Error) -> Self {
        CryptoError::RngError
    }
}

impl From<hkdf::InvalidLength> for CryptoError {
    fn from(_: hkdf::InvalidLength) -> Self {
        CryptoError::InvalidLength
    }
}

impl From<bincode::Error> for CryptoError {
    fn from(_: bincode::Error) -> Self {
        CryptoError::UnsupportedEncoding
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let all = [
            CryptoError::GuestError,
            CryptoError::UnsupportedEncoding,
            CryptoError::UnsupportedAlgorithm,
            CryptoError::UnsupportedOption,
            CryptoError::InvalidLength,
            CryptoError::InvalidKey,
            CryptoError::InvalidHandle,
            CryptoError::KeyNotSupported,
            CryptoError::KeyRequired,
            CryptoError::NonceRequired,
            CryptoError::InvalidNonce,
            CryptoError::OptionNotSet,
            CryptoError::ParametersMissing,
            CryptoError::NotImplemented,
            CryptoError::UnsupportedFeature,
            CryptoError::ProhibitedOperation,
            CryptoError::InvalidOperation,
            CryptoError::Closed,
            CryptoError::Overflow,
            CryptoError::TooManyHandles,
            CryptoError::NotFound,
            CryptoError::IncompatibleKeys,
            CryptoError::Expired,
            CryptoError::InProgress,
            CryptoError::VerificationFailed,
            CryptoError::InvalidSignature,
            CryptoError::InvalidTag,
            CryptoError::RngError,
            CryptoError::AlgorithmFailure,
            CryptoError::InternalError,
        ];
        let mut codes: Vec<u16> = all.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert!(!codes.contains(&STATUS_SUCCESS));
    }

    #[test]
    fn test_status_of() {
        let ok: Result<u8> = Ok(1);
        let err: Result<u8> = Err(CryptoError::Closed);
        assert_eq!(status_of(&ok), STATUS_SUCCESS);
        assert_eq!(status_of(&err), 14);
    }

    #[test]
    fn test_integrity_failures() {
        assert!(CryptoError::InvalidTag.is_integrity_failure());
        assert!(CryptoError::InvalidSignature.is_integrity_failure());
        assert!(!CryptoError::InternalError.is_integrity_failure());
    }
}
