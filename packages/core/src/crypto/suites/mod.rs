//! Встроенные алгоритмы
//!
//! Каждый модуль реализует одну группу алгоритмов поверх RustCrypto/dalek.
//! [`register_defaults`] заполняет ими [`Registry`].
//!
//! | модуль      | алгоритмы                                              |
//! |-------------|--------------------------------------------------------|
//! | `ed25519`   | Ed25519                                                |
//! | `p256`      | ECDSA_P256_SHA256, P256 (ECDH)                         |
//! | `x25519`    | X25519                                                 |
//! | `hashing`   | SHA-256, SHA-512, SHA-512/256, SHAKE-128, SHAKE-256    |
//! | `mac`       | HMAC/SHA-256, HMAC/SHA-512                             |
//! | `kdf`       | HKDF-EXTRACT/*, HKDF-EXPAND/*                          |
//! | `ratchet`   | HKDF-RATCHET/SHA-256                                   |
//! | `aead`      | AES-128-GCM, AES-256-GCM, (X)CHACHA20-POLY1305         |

pub mod aead;
pub mod ed25519;
pub mod hashing;
pub mod kdf;
pub mod mac;
pub mod p256;
pub mod ratchet;
pub mod x25519;

use crate::registry::Registry;
use ::aes_gcm::{Aes128Gcm, Aes256Gcm};
use ::sha2::{Sha256, Sha512, Sha512_256};
use ::sha3::{Shake128, Shake256};
use chacha20poly1305::{ChaCha20Poly1305, XChaCha20Poly1305};
use std::sync::Arc;

/// Registers every built-in algorithm.
pub fn register_defaults(registry: &mut Registry) {
    // Подписи
    registry.register_signature(Arc::new(ed25519::Ed25519));
    registry.register_signature(Arc::new(p256::EcdsaP256Sha256));

    // Обмен ключами
    registry.register_key_exchange(Arc::new(x25519::X25519));
    registry.register_key_exchange(Arc::new(p256::P256Ecdh));

    // Хеши и XOF
    registry.register_symmetric(Arc::new(hashing::Sha2::<Sha256>::new("SHA-256")));
    registry.register_symmetric(Arc::new(hashing::Sha2::<Sha512>::new("SHA-512")));
    registry.register_symmetric(Arc::new(hashing::Sha2::<Sha512_256>::new("SHA-512/256")));
    registry.register_symmetric(Arc::new(hashing::Shake::<Shake128>::new("SHAKE-128")));
    registry.register_symmetric(Arc::new(hashing::Shake::<Shake256>::new("SHAKE-256")));

    // MAC
    registry.register_symmetric(Arc::new(mac::HmacSha2::<Sha256>::new("HMAC/SHA-256")));
    registry.register_symmetric(Arc::new(mac::HmacSha2::<Sha512>::new("HMAC/SHA-512")));

    // KDF
    registry.register_symmetric(Arc::new(kdf::HkdfExtract::<Sha256>::new(
        "HKDF-EXTRACT/SHA-256",
        "HKDF-EXPAND/SHA-256",
    )));
    registry.register_symmetric(Arc::new(kdf::HkdfExtract::<Sha512>::new(
        "HKDF-EXTRACT/SHA-512",
        "HKDF-EXPAND/SHA-512",
    )));
    registry.register_symmetric(Arc::new(kdf::HkdfExpand::<Sha256>::new("HKDF-EXPAND/SHA-256")));
    registry.register_symmetric(Arc::new(kdf::HkdfExpand::<Sha512>::new("HKDF-EXPAND/SHA-512")));
    registry.register_symmetric(Arc::new(ratchet::HkdfRatchet));

    // AEAD
    registry.register_symmetric(Arc::new(aead::AeadCipher::<Aes128Gcm>::new("AES-128-GCM")));
    registry.register_symmetric(Arc::new(aead::AeadCipher::<Aes256Gcm>::new("AES-256-GCM")));
    registry.register_symmetric(Arc::new(aead::AeadCipher::<ChaCha20Poly1305>::new(
        "CHACHA20-POLY1305",
    )));
    registry.register_symmetric(Arc::new(aead::AeadCipher::<XChaCha20Poly1305>::new(
        "XCHACHA20-POLY1305",
    )));
}
