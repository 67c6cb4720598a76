//! HKDF (RFC 5869) split into its two steps.
//!
//! - `HKDF-EXTRACT/*`: key = salt, absorbed data = IKM, `squeeze_key`
//!   yields the PRK as a key for the matching `HKDF-EXPAND/*`.
//! - `HKDF-EXPAND/*`: key = PRK, absorbed data = info, `squeeze` yields
//!   up to 255 hash lengths of output.

use crate::crypto::provider::{Capabilities, SymmetricScheme, SymmetricSession};
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use hkdf::SimpleHkdf;
use hmac::digest::core_api::BlockSizeUser;
use sha2::Digest;
use std::marker::PhantomData;
use zeroize::Zeroizing;

pub struct HkdfExtract<D> {
    name: &'static str,
    expand_name: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D> HkdfExtract<D> {
    pub const fn new(name: &'static str, expand_name: &'static str) -> Self {
        Self {
            name,
            expand_name,
            _digest: PhantomData,
        }
    }
}

pub struct HkdfExpand<D> {
    name: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D> HkdfExpand<D> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _digest: PhantomData,
        }
    }
}

struct ExtractSession<D> {
    salt: Zeroizing<Vec<u8>>,
    ikm: Zeroizing<Vec<u8>>,
    expand_name: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D> SymmetricSession for ExtractSession<D>
where
    D: Digest + BlockSizeUser + Clone + Send + 'static,
{
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        self.ikm.extend_from_slice(data);
        Ok(())
    }

    fn squeeze_key(&mut self, target: &dyn SymmetricScheme) -> Result<Zeroizing<Vec<u8>>> {
        if target.name() != self.expand_name {
            return Err(CryptoError::UnsupportedAlgorithm);
        }
        let (prk, _) = SimpleHkdf::<D>::extract(Some(self.salt.as_slice()), &self.ikm);
        Ok(Zeroizing::new(prk.to_vec()))
    }

    fn box_clone(&self) -> Box<dyn SymmetricSession> {
        Box::new(ExtractSession::<D> {
            salt: self.salt.clone(),
            ikm: self.ikm.clone(),
            expand_name: self.expand_name,
            _digest: PhantomData,
        })
    }
}

impl<D> SymmetricScheme for HkdfExtract<D>
where
    D: Digest + BlockSizeUser + Clone + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            key_derivation: true,
            ..Capabilities::default()
        }
    }

    fn key_len(&self) -> Option<usize> {
        Some(<D as Digest>::output_size())
    }

    /// Any salt length is acceptable.
    fn validate_key(&self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        _options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>> {
        let salt = key.ok_or(CryptoError::KeyRequired)?;
        Ok(Box::new(ExtractSession::<D> {
            salt: Zeroizing::new(salt.to_vec()),
            ikm: Zeroizing::new(Vec::new()),
            expand_name: self.expand_name,
            _digest: PhantomData,
        }))
    }
}

struct ExpandSession<D> {
    prk: Zeroizing<Vec<u8>>,
    info: Vec<u8>,
    _digest: PhantomData<fn() -> D>,
}

impl<D> ExpandSession<D>
where
    D: Digest + BlockSizeUser + Clone + Send + 'static,
{
    fn expand(&self, out: &mut [u8]) -> Result<()> {
        let hk = SimpleHkdf::<D>::from_prk(&self.prk).map_err(|_| CryptoError::InvalidKey)?;
        hk.expand(&self.info, out)?;
        Ok(())
    }
}

impl<D> SymmetricSession for ExpandSession<D>
where
    D: Digest + BlockSizeUser + Clone + Send + 'static,
{
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        self.info.extend_from_slice(data);
        Ok(())
    }

    fn squeeze(&mut self, out: &mut [u8]) -> Result<()> {
        self.expand(out)
    }

    fn squeeze_key(&mut self, target: &dyn SymmetricScheme) -> Result<Zeroizing<Vec<u8>>> {
        let len = target.key_len().ok_or(CryptoError::KeyNotSupported)?;
        let mut key = Zeroizing::new(vec![0u8; len]);
        self.expand(&mut key)?;
        Ok(key)
    }

    fn box_clone(&self) -> Box<dyn SymmetricSession> {
        Box::new(ExpandSession::<D> {
            prk: self.prk.clone(),
            info: self.info.clone(),
            _digest: PhantomData,
        })
    }
}

impl<D> SymmetricScheme for HkdfExpand<D>
where
    D: Digest + BlockSizeUser + Clone + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            key_derivation: true,
            ..Capabilities::default()
        }
    }

    fn key_len(&self) -> Option<usize> {
        Some(<D as Digest>::output_size())
    }

    /// The PRK must be at least one hash length long.
    fn validate_key(&self, key: &[u8]) -> Result<()> {
        if key.len() < <D as Digest>::output_size() {
            return Err(CryptoError::InvalidKey);
        }
        Ok(())
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        _options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>> {
        let prk = key.ok_or(CryptoError::KeyRequired)?;
        self.validate_key(prk)?;
        Ok(Box::new(ExpandSession::<D> {
            prk: Zeroizing::new(prk.to_vec()),
            info: Vec::new(),
            _digest: PhantomData,
        }))
    }
}
