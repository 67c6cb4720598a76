use crate::crypto::provider::{Capabilities, SymmetricScheme, SymmetricSession};
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use hmac::digest::core_api::BlockSizeUser;
use hmac::{Mac, SimpleHmac};
use sha2::Digest;
use std::marker::PhantomData;

/// HMAC over a SHA-2 hash (RFC 2104).
pub struct HmacSha2<D> {
    name: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D> HmacSha2<D> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _digest: PhantomData,
        }
    }
}

#[derive(Clone)]
struct MacSession<D: Digest + BlockSizeUser> {
    mac: SimpleHmac<D>,
}

impl<D> SymmetricSession for MacSession<D>
where
    D: Digest + BlockSizeUser + Clone + Send + 'static,
{
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        Mac::update(&mut self.mac, data);
        Ok(())
    }

    fn squeeze_tag(&mut self) -> Result<Vec<u8>> {
        Ok(Mac::finalize(self.mac.clone()).into_bytes().to_vec())
    }

    fn box_clone(&self) -> Box<dyn SymmetricSession> {
        Box::new(self.clone())
    }
}

impl<D> SymmetricScheme for HmacSha2<D>
where
    D: Digest + BlockSizeUser + Clone + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            mac: true,
            ..Capabilities::default()
        }
    }

    fn key_len(&self) -> Option<usize> {
        Some(<D as Digest>::output_size())
    }

    /// HMAC accepts keys of any non-zero length.
    fn validate_key(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(CryptoError::InvalidKey);
        }
        Ok(())
    }

    fn max_tag_len(&self) -> usize {
        <D as Digest>::output_size()
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        _options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>> {
        let key = key.ok_or(CryptoError::KeyRequired)?;
        let mac = <SimpleHmac<D> as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Box::new(MacSession { mac }))
    }
}
