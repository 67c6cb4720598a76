// Транспорт секретов между менеджерами
//
// Конверт: KEM к транспортному ключу менеджера → HKDF extract/expand →
// AEAD. Заголовок конверта (алгоритмы, инкапсулированный ключ, nonce)
// аутентифицируется как associated data.

use crate::config::Config;
use crate::crypto::keys::RawKeypair;
use crate::crypto::provider::{KeyExchangeScheme, SymmetricScheme};
use crate::error::{CryptoError, Result};
use crate::options::{Options, OptionsSnapshot, OptionsType};
use crate::registry::Registry;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::Zeroizing;

const ENVELOPE_VERSION: u8 = 1;
const KDF_INFO: &[u8] = b"hostcrypto secret transport v1";

#[derive(Serialize, Deserialize)]
struct SealedHeader {
    version: u8,
    kx: String,
    aead: String,
    #[serde(with = "serde_bytes")]
    encapsulated: Vec<u8>,
    #[serde(with = "serde_bytes")]
    nonce: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct SealedSecret {
    header: SealedHeader,
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
    #[serde(with = "serde_bytes")]
    tag: Vec<u8>,
}

/// Transport keypair of one manager plus the algorithms used to seal.
pub struct Transport {
    kx: Arc<dyn KeyExchangeScheme>,
    extract: Arc<dyn SymmetricScheme>,
    expand: Arc<dyn SymmetricScheme>,
    aead: Arc<dyn SymmetricScheme>,
    keypair: RawKeypair,
}

impl Transport {
    /// Uses `seed` as the transport secret when given, otherwise a fresh
    /// keypair is generated.
    pub fn new(registry: &Registry, config: &Config, seed: Option<&[u8]>) -> Result<Self> {
        let kx = registry.lookup_key_exchange(&config.transport_kx_algorithm)?;
        let keypair = match seed {
            Some(seed) => kx.keypair_from_secret(seed)?,
            None => kx.generate_keypair()?,
        };
        Ok(Self {
            extract: registry.lookup_symmetric(&config.transport_kdf_extract)?,
            expand: registry.lookup_symmetric(&config.transport_kdf_expand)?,
            aead: registry.lookup_symmetric(&config.transport_aead_algorithm)?,
            kx,
            keypair,
        })
    }

    fn derive_key(&self, shared: &[u8], encapsulated: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let mut salt = encapsulated.to_vec();
        salt.extend_from_slice(&self.keypair.public);

        let mut extract = self.extract.open(Some(salt.as_slice()), None)?;
        extract.absorb(shared)?;
        let prk = extract.squeeze_key(self.expand.as_ref())?;

        let mut expand = self.expand.open(Some(prk.as_slice()), None)?;
        expand.absorb(KDF_INFO)?;
        expand.absorb(self.aead.name().as_bytes())?;
        expand.squeeze_key(self.aead.as_ref())
    }

    fn aead_options(nonce: &[u8]) -> Result<OptionsSnapshot> {
        let options = Options::new(OptionsType::Symmetric);
        options.set("nonce", nonce)?;
        options.snapshot()
    }

    pub fn seal(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let (shared, encapsulated) = self.kx.encapsulate(&self.keypair.public)?;
        let key = self.derive_key(&shared, &encapsulated)?;

        let mut nonce = vec![0u8; self.aead.nonce_len().ok_or(CryptoError::UnsupportedAlgorithm)?];
        OsRng.try_fill_bytes(&mut nonce)?;

        let header = SealedHeader {
            version: ENVELOPE_VERSION,
            kx: self.kx.name().to_string(),
            aead: self.aead.name().to_string(),
            encapsulated,
            nonce,
        };
        let associated_data = bincode::serialize(&header)?;

        let mut session = self
            .aead
            .open(Some(key.as_slice()), Some(&Self::aead_options(&header.nonce)?))?;
        session.absorb(&associated_data)?;
        let mut ciphertext = payload.to_vec();
        let tag = session.encrypt_detached(&mut ciphertext)?;

        Ok(bincode::serialize(&SealedSecret {
            header,
            ciphertext,
            tag,
        })?)
    }

    pub fn open(&self, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let sealed: SealedSecret = bincode::deserialize(envelope)?;
        let header = &sealed.header;
        if header.version != ENVELOPE_VERSION
            || header.kx != self.kx.name()
            || header.aead != self.aead.name()
            || Some(header.nonce.len()) != self.aead.nonce_len()
        {
            return Err(CryptoError::UnsupportedEncoding);
        }

        let shared = self
            .kx
            .decapsulate(&self.keypair.secret, &header.encapsulated)
            .map_err(|_| CryptoError::UnsupportedEncoding)?;
        let key = self.derive_key(&shared, &header.encapsulated)?;
        let associated_data = bincode::serialize(header)?;

        let mut session = self
            .aead
            .open(Some(key.as_slice()), Some(&Self::aead_options(&header.nonce)?))?;
        session.absorb(&associated_data)?;
        let mut plaintext = Zeroizing::new(sealed.ciphertext.clone());
        session.decrypt_detached(&mut plaintext, &sealed.tag)?;
        Ok(plaintext)
    }
}
