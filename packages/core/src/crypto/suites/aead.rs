use crate::crypto::provider::{Capabilities, SymmetricScheme, SymmetricSession};
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use chacha20poly1305::aead::generic_array::typenum::Unsigned;
use chacha20poly1305::aead::{AeadInPlace, KeyInit, Nonce, Tag};
use std::marker::PhantomData;
use zeroize::Zeroizing;

/// AEAD cipher with a caller-supplied nonce.
///
/// Absorbed data becomes the associated data of the next encryption or
/// decryption.
pub struct AeadCipher<A> {
    name: &'static str,
    _cipher: PhantomData<fn() -> A>,
}

impl<A> AeadCipher<A> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _cipher: PhantomData,
        }
    }
}

fn nonce_size<A: AeadInPlace>() -> usize {
    <A::NonceSize as Unsigned>::USIZE
}

fn tag_size<A: AeadInPlace>() -> usize {
    <A::TagSize as Unsigned>::USIZE
}

struct AeadSession<A> {
    key: Zeroizing<Vec<u8>>,
    nonce: Vec<u8>,
    associated_data: Vec<u8>,
    _cipher: PhantomData<fn() -> A>,
}

impl<A> AeadSession<A>
where
    A: AeadInPlace + KeyInit,
{
    fn cipher(&self) -> Result<A> {
        A::new_from_slice(&self.key).map_err(|_| CryptoError::InvalidKey)
    }
}

impl<A> SymmetricSession for AeadSession<A>
where
    A: AeadInPlace + KeyInit + 'static,
{
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        self.associated_data.extend_from_slice(data);
        Ok(())
    }

    fn encrypt_detached(&mut self, data: &mut [u8]) -> Result<Vec<u8>> {
        let tag = self
            .cipher()?
            .encrypt_in_place_detached(
                Nonce::<A>::from_slice(&self.nonce),
                &self.associated_data,
                data,
            )
            .map_err(|_| CryptoError::AlgorithmFailure)?;
        Ok(tag.to_vec())
    }

    fn decrypt_detached(&mut self, data: &mut [u8], tag: &[u8]) -> Result<()> {
        if tag.len() != tag_size::<A>() {
            return Err(CryptoError::InvalidTag);
        }
        self.cipher()?
            .decrypt_in_place_detached(
                Nonce::<A>::from_slice(&self.nonce),
                &self.associated_data,
                data,
                Tag::<A>::from_slice(tag),
            )
            .map_err(|_| CryptoError::InvalidTag)
    }

    fn box_clone(&self) -> Box<dyn SymmetricSession> {
        Box::new(AeadSession::<A> {
            key: self.key.clone(),
            nonce: self.nonce.clone(),
            associated_data: self.associated_data.clone(),
            _cipher: PhantomData,
        })
    }
}

impl<A> SymmetricScheme for AeadCipher<A>
where
    A: AeadInPlace + KeyInit + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            aead: true,
            ..Capabilities::default()
        }
    }

    fn key_len(&self) -> Option<usize> {
        Some(A::key_size())
    }

    fn max_tag_len(&self) -> usize {
        tag_size::<A>()
    }

    fn nonce_len(&self) -> Option<usize> {
        Some(nonce_size::<A>())
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>> {
        let key = key.ok_or(CryptoError::KeyRequired)?;
        self.validate_key(key)?;
        let options = options.ok_or(CryptoError::ParametersMissing)?;
        let nonce = options
            .get_optional("nonce")?
            .ok_or(CryptoError::NonceRequired)?;
        if nonce.len() != nonce_size::<A>() {
            return Err(CryptoError::InvalidNonce);
        }
        Ok(Box::new(AeadSession::<A> {
            key: Zeroizing::new(key.to_vec()),
            nonce: nonce.to_vec(),
            associated_data: Vec::new(),
            _cipher: PhantomData,
        }))
    }
}
