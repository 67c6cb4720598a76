//! Capability traits implemented by algorithm backends.
//!
//! A backend is registered once per algorithm name and shared (`Arc`) by
//! every key and session that uses it. Backends work on canonical raw key
//! material (see [`RawKeypair`]) and rebuild library key types on demand,
//! so keys stay plain bytes inside the handle tables.
//!
//! | trait                 | algorithms                                  |
//! |-----------------------|---------------------------------------------|
//! | [`SignatureScheme`]   | Ed25519, ECDSA_P256_SHA256                  |
//! | [`KeyExchangeScheme`] | X25519, P256                                |
//! | [`SymmetricScheme`]   | hashes, XOFs, HMAC, HKDF, ratchet, AEADs    |

use crate::crypto::encoding::SignatureEncoding;
use crate::crypto::keys::RawKeypair;
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmType {
    Signatures,
    Symmetric,
    KeyExchange,
}

/// Generation, derivation and container codecs for asymmetric keys.
///
/// The container hooks default to `UnsupportedEncoding`; a backend only
/// overrides the formats its key type actually has.
pub trait KeyCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Length of the raw secret key.
    fn secret_len(&self) -> usize;

    fn generate_keypair(&self) -> Result<RawKeypair>;

    /// Rebuilds a keypair from a raw secret, deriving the public half.
    fn keypair_from_secret(&self, secret: &[u8]) -> Result<RawKeypair>;

    /// Checks that `public` is a well-formed raw public key.
    fn validate_public(&self, public: &[u8]) -> Result<()>;

    fn secret_to_pkcs8(&self, _secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn secret_from_pkcs8(&self, _der: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn secret_to_pem(&self, _secret: &[u8]) -> Result<Zeroizing<String>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn secret_from_pem(&self, _pem: &str) -> Result<Zeroizing<Vec<u8>>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn public_to_spki(&self, _public: &[u8]) -> Result<Vec<u8>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn public_from_spki(&self, _der: &[u8]) -> Result<Vec<u8>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn public_to_pem(&self, _public: &[u8]) -> Result<String> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn public_from_pem(&self, _pem: &str) -> Result<Vec<u8>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    fn public_to_sec(&self, _public: &[u8], _compressed: bool) -> Result<Vec<u8>> {
        Err(CryptoError::UnsupportedEncoding)
    }

    /// Accepts compressed or uncompressed SEC1 and returns the raw form.
    fn public_from_sec(&self, _sec: &[u8]) -> Result<Vec<u8>> {
        Err(CryptoError::UnsupportedEncoding)
    }
}

/// Streaming signer bound to one secret key.
pub trait SignerState: Send {
    fn update(&mut self, data: &[u8]) -> Result<()>;
    fn sign(&mut self) -> Result<Vec<u8>>;
}

/// Streaming verifier bound to one public key.
pub trait VerifierState: Send {
    fn update(&mut self, data: &[u8]) -> Result<()>;
    /// `signature` is in the scheme's raw encoding.
    fn verify(&mut self, signature: &[u8]) -> Result<()>;
}

pub trait SignatureScheme: KeyCodec {
    fn as_codec(&self) -> &dyn KeyCodec;

    fn signer(&self, keypair: &RawKeypair) -> Result<Box<dyn SignerState>>;

    fn verifier(&self, public: &[u8]) -> Result<Box<dyn VerifierState>>;

    /// Converts a raw signature to `encoding`.
    fn encode_signature(&self, raw: &[u8], encoding: SignatureEncoding) -> Result<Vec<u8>>;

    /// Parses an encoded signature back to raw form. Malformed input yields
    /// `InvalidSignature`.
    fn decode_signature(&self, encoded: &[u8], encoding: SignatureEncoding) -> Result<Vec<u8>>;
}

pub trait KeyExchangeScheme: KeyCodec {
    fn as_codec(&self) -> &dyn KeyCodec;

    fn dh(&self, public: &[u8], secret: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// Returns `(shared_secret, encapsulated_key)`.
    fn encapsulate(&self, _public: &[u8]) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        Err(CryptoError::NotImplemented)
    }

    fn decapsulate(&self, _secret: &[u8], _encapsulated: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Err(CryptoError::NotImplemented)
    }
}

/// Operation families a symmetric algorithm supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub hashing: bool,
    pub xof: bool,
    pub mac: bool,
    pub aead: bool,
    pub key_derivation: bool,
    /// Absorbing after squeezing is allowed.
    pub sponge: bool,
    pub ratchet: bool,
}

pub trait SymmetricScheme: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Length of generated keys, `None` for keyless algorithms.
    fn key_len(&self) -> Option<usize>;

    /// Checks imported key material.
    fn validate_key(&self, key: &[u8]) -> Result<()> {
        match self.key_len() {
            Some(len) if key.len() != len => Err(CryptoError::InvalidKey),
            Some(_) => Ok(()),
            None => Err(CryptoError::KeyNotSupported),
        }
    }

    /// Upper bound of tags produced by this algorithm; 0 when it has none.
    fn max_tag_len(&self) -> usize {
        0
    }

    /// Nonce length expected in the `nonce` option, for algorithms that
    /// take one.
    fn nonce_len(&self) -> Option<usize> {
        None
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>>;
}

/// Running state of one symmetric session.
///
/// Phase bookkeeping lives in the caller; a backend only reports what its
/// algorithm cannot do.
pub trait SymmetricSession: Send {
    fn absorb(&mut self, data: &[u8]) -> Result<()>;

    fn squeeze(&mut self, _out: &mut [u8]) -> Result<()> {
        Err(CryptoError::InvalidOperation)
    }

    fn squeeze_tag(&mut self) -> Result<Vec<u8>> {
        Err(CryptoError::InvalidOperation)
    }

    /// Derives raw key material for `target`.
    fn squeeze_key(&mut self, _target: &dyn SymmetricScheme) -> Result<Zeroizing<Vec<u8>>> {
        Err(CryptoError::InvalidOperation)
    }

    fn ratchet(&mut self) -> Result<()> {
        Err(CryptoError::NotImplemented)
    }

    /// Encrypts `data` in place and returns the tag.
    fn encrypt_detached(&mut self, _data: &mut [u8]) -> Result<Vec<u8>> {
        Err(CryptoError::InvalidOperation)
    }

    /// Decrypts `data` in place. On failure the content of `data` is
    /// unspecified and must be discarded by the caller.
    fn decrypt_detached(&mut self, _data: &mut [u8], _tag: &[u8]) -> Result<()> {
        Err(CryptoError::InvalidOperation)
    }

    fn box_clone(&self) -> Box<dyn SymmetricSession>;
}
