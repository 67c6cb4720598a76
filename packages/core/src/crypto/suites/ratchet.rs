//! Forward-secure ratcheting KDF over HKDF-SHA256.
//!
//! The session holds a 32-byte chain key and a transcript of everything
//! absorbed since the last ratchet step:
//!
//! - open: `chain = HKDF-Extract(salt = context, ikm = key)`
//! - squeeze: `HKDF-Expand(chain, "squeeze" || transcript || counter)`
//! - squeeze_tag: `HMAC(chain, "tag" || transcript)`
//! - squeeze_key: `HKDF-Expand(chain, "key" || alg || transcript || counter)`
//! - ratchet: `chain = HMAC(chain, "ratchet" || transcript)`, then the old
//!   chain key is wiped and the transcript restarts
//!
//! Absorbing after squeezing is allowed; each squeeze bumps the counter so
//! consecutive outputs differ.

use crate::crypto::provider::{Capabilities, SymmetricScheme, SymmetricSession};
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

type HmacSha256 = Hmac<Sha256>;

const CHAIN_LEN: usize = 32;

const SQUEEZE_LABEL: &[u8] = b"squeeze";
const TAG_LABEL: &[u8] = b"tag";
const KEY_LABEL: &[u8] = b"key";
const RATCHET_LABEL: &[u8] = b"ratchet";

pub struct HkdfRatchet;

#[derive(Clone)]
struct RatchetSession {
    chain: Zeroizing<[u8; CHAIN_LEN]>,
    transcript: Sha256,
    counter: u64,
}

impl RatchetSession {
    fn transcript_hash(&self) -> [u8; 32] {
        self.transcript.clone().finalize().into()
    }

    fn expand(&mut self, label: &[u8], extra: &[u8], out: &mut [u8]) -> Result<()> {
        let hk = Hkdf::<Sha256>::from_prk(self.chain.as_slice()).map_err(|_| CryptoError::InternalError)?;
        let transcript = self.transcript_hash();
        hk.expand_multi_info(
            &[label, extra, &transcript[..], &self.counter.to_be_bytes()[..]],
            out,
        )?;
        self.counter = self.counter.checked_add(1).ok_or(CryptoError::Overflow)?;
        Ok(())
    }

    fn chain_mac(&self, label: &[u8]) -> Result<[u8; 32]> {
        let mut mac = HmacSha256::new_from_slice(self.chain.as_slice())
            .map_err(|_| CryptoError::InternalError)?;
        mac.update(label);
        mac.update(&self.transcript_hash());
        Ok(mac.finalize().into_bytes().into())
    }
}

impl SymmetricSession for RatchetSession {
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        Digest::update(&mut self.transcript, (data.len() as u64).to_be_bytes());
        Digest::update(&mut self.transcript, data);
        Ok(())
    }

    fn squeeze(&mut self, out: &mut [u8]) -> Result<()> {
        self.expand(SQUEEZE_LABEL, &[], out)
    }

    fn squeeze_tag(&mut self) -> Result<Vec<u8>> {
        Ok(self.chain_mac(TAG_LABEL)?.to_vec())
    }

    fn squeeze_key(&mut self, target: &dyn SymmetricScheme) -> Result<Zeroizing<Vec<u8>>> {
        let len = target.key_len().ok_or(CryptoError::KeyNotSupported)?;
        let mut key = Zeroizing::new(vec![0u8; len]);
        self.expand(KEY_LABEL, target.name().as_bytes(), &mut key)?;
        Ok(key)
    }

    fn ratchet(&mut self) -> Result<()> {
        let mut next = self.chain_mac(RATCHET_LABEL)?;
        self.chain.zeroize();
        self.chain.copy_from_slice(&next);
        next.zeroize();
        self.transcript = Sha256::new();
        self.counter = 0;
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn SymmetricSession> {
        Box::new(self.clone())
    }
}

impl SymmetricScheme for HkdfRatchet {
    fn name(&self) -> &'static str {
        "HKDF-RATCHET/SHA-256"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            key_derivation: true,
            sponge: true,
            ratchet: true,
            ..Capabilities::default()
        }
    }

    fn key_len(&self) -> Option<usize> {
        Some(CHAIN_LEN)
    }

    fn validate_key(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(CryptoError::InvalidKey);
        }
        Ok(())
    }

    fn max_tag_len(&self) -> usize {
        32
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>> {
        let key = key.ok_or(CryptoError::KeyRequired)?;
        self.validate_key(key)?;
        let context: &[u8] = match options {
            Some(options) => options.get_optional("context")?.unwrap_or_default(),
            None => &[],
        };
        let (prk, _) = Hkdf::<Sha256>::extract(Some(context), key);
        let mut chain = Zeroizing::new([0u8; CHAIN_LEN]);
        chain.copy_from_slice(&prk);
        Ok(Box::new(RatchetSession {
            chain,
            transcript: Sha256::new(),
            counter: 0,
        }))
    }
}
