//! Key and signature encodings.
//!
//! `raw`, `local` and the keypair layout are handled here for every
//! algorithm; the standard containers (PKCS#8, SPKI, PEM, SEC1) are
//! delegated to the backend's [`KeyCodec`] hooks.
//!
//! Raw keypair layout: `secret || public`.

use crate::crypto::keys::RawKeypair;
use crate::crypto::provider::KeyCodec;
use crate::error::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypairEncoding {
    Raw,
    Pkcs8,
    Pem,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyEncoding {
    Raw,
    Pkcs8,
    Pem,
    Sec,
    CompressedSec,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKeyEncoding {
    Raw,
    Pkcs8,
    Pem,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureEncoding {
    Raw,
    Der,
}

const LOCAL_FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum LocalKind {
    Keypair,
    PublicKey,
    SecretKey,
}

/// Собственный формат `local`: алгоритм + сырой материал ключа
#[derive(Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
struct LocalKey {
    version: u8,
    #[zeroize(skip)]
    kind: LocalKind,
    algorithm: String,
    #[serde(with = "serde_bytes")]
    material: Vec<u8>,
}

fn encode_local(codec: &dyn KeyCodec, kind: LocalKind, material: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let local = LocalKey {
        version: LOCAL_FORMAT_VERSION,
        kind,
        algorithm: codec.name().to_string(),
        material: material.to_vec(),
    };
    Ok(Zeroizing::new(bincode::serialize(&local)?))
}

fn decode_local(codec: &dyn KeyCodec, kind: LocalKind, encoded: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let local: LocalKey = bincode::deserialize(encoded).map_err(|_| CryptoError::InvalidKey)?;
    if local.version != LOCAL_FORMAT_VERSION || local.kind != kind || local.algorithm != codec.name()
    {
        return Err(CryptoError::InvalidKey);
    }
    Ok(Zeroizing::new(local.material.clone()))
}

fn as_pem(encoded: &[u8]) -> Result<&str> {
    std::str::from_utf8(encoded).map_err(|_| CryptoError::InvalidKey)
}

pub fn export_keypair(
    codec: &dyn KeyCodec,
    keypair: &RawKeypair,
    encoding: KeypairEncoding,
) -> Result<Zeroizing<Vec<u8>>> {
    match encoding {
        KeypairEncoding::Raw => {
            let mut out = Zeroizing::new(Vec::with_capacity(
                keypair.secret.len() + keypair.public.len(),
            ));
            out.extend_from_slice(&keypair.secret);
            out.extend_from_slice(&keypair.public);
            Ok(out)
        }
        KeypairEncoding::Pkcs8 => codec.secret_to_pkcs8(&keypair.secret),
        KeypairEncoding::Pem => {
            let pem = codec.secret_to_pem(&keypair.secret)?;
            Ok(Zeroizing::new(pem.as_bytes().to_vec()))
        }
        KeypairEncoding::Local => encode_local(codec, LocalKind::Keypair, &keypair.secret),
    }
}

pub fn import_keypair(
    codec: &dyn KeyCodec,
    encoded: &[u8],
    encoding: KeypairEncoding,
) -> Result<RawKeypair> {
    match encoding {
        KeypairEncoding::Raw => {
            let split = codec.secret_len();
            if encoded.len() <= split {
                return Err(CryptoError::InvalidKey);
            }
            let (secret, public) = encoded.split_at(split);
            let keypair = codec.keypair_from_secret(secret)?;
            if keypair.public != public {
                return Err(CryptoError::InvalidKey);
            }
            Ok(keypair)
        }
        KeypairEncoding::Pkcs8 => codec.keypair_from_secret(&codec.secret_from_pkcs8(encoded)?),
        KeypairEncoding::Pem => {
            codec.keypair_from_secret(&codec.secret_from_pem(as_pem(encoded)?)?)
        }
        KeypairEncoding::Local => {
            codec.keypair_from_secret(&decode_local(codec, LocalKind::Keypair, encoded)?)
        }
    }
}

pub fn export_public(
    codec: &dyn KeyCodec,
    public: &[u8],
    encoding: PublicKeyEncoding,
) -> Result<Vec<u8>> {
    match encoding {
        PublicKeyEncoding::Raw => Ok(public.to_vec()),
        PublicKeyEncoding::Pkcs8 => codec.public_to_spki(public),
        PublicKeyEncoding::Pem => Ok(codec.public_to_pem(public)?.into_bytes()),
        PublicKeyEncoding::Sec => codec.public_to_sec(public, false),
        PublicKeyEncoding::CompressedSec => codec.public_to_sec(public, true),
        PublicKeyEncoding::Local => {
            encode_local(codec, LocalKind::PublicKey, public).map(|v| v.to_vec())
        }
    }
}

/// Returns the canonical raw public key.
pub fn import_public(
    codec: &dyn KeyCodec,
    encoded: &[u8],
    encoding: PublicKeyEncoding,
) -> Result<Vec<u8>> {
    let raw = match encoding {
        PublicKeyEncoding::Raw => encoded.to_vec(),
        PublicKeyEncoding::Pkcs8 => codec.public_from_spki(encoded)?,
        PublicKeyEncoding::Pem => codec.public_from_pem(as_pem(encoded)?)?,
        PublicKeyEncoding::Sec | PublicKeyEncoding::CompressedSec => {
            codec.public_from_sec(encoded)?
        }
        PublicKeyEncoding::Local => decode_local(codec, LocalKind::PublicKey, encoded)?.to_vec(),
    };
    codec.validate_public(&raw)?;
    Ok(raw)
}

pub fn export_secret(
    codec: &dyn KeyCodec,
    secret: &[u8],
    encoding: SecretKeyEncoding,
) -> Result<Zeroizing<Vec<u8>>> {
    match encoding {
        SecretKeyEncoding::Raw => Ok(Zeroizing::new(secret.to_vec())),
        SecretKeyEncoding::Pkcs8 => codec.secret_to_pkcs8(secret),
        SecretKeyEncoding::Pem => {
            let pem = codec.secret_to_pem(secret)?;
            Ok(Zeroizing::new(pem.as_bytes().to_vec()))
        }
        SecretKeyEncoding::Local => encode_local(codec, LocalKind::SecretKey, secret),
    }
}

/// Returns the canonical raw secret key, checked by deriving its keypair.
pub fn import_secret(
    codec: &dyn KeyCodec,
    encoded: &[u8],
    encoding: SecretKeyEncoding,
) -> Result<RawKeypair> {
    let secret = match encoding {
        SecretKeyEncoding::Raw => Zeroizing::new(encoded.to_vec()),
        SecretKeyEncoding::Pkcs8 => codec.secret_from_pkcs8(encoded)?,
        SecretKeyEncoding::Pem => codec.secret_from_pem(as_pem(encoded)?)?,
        SecretKeyEncoding::Local => decode_local(codec, LocalKind::SecretKey, encoded)?,
    };
    codec.keypair_from_secret(&secret)
}
