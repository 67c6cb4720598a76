//! SHA-2 hashes and SHAKE extendable-output functions.

use crate::crypto::provider::{Capabilities, SymmetricScheme, SymmetricSession};
use crate::error::{CryptoError, Result};
use crate::options::OptionsSnapshot;
use sha2::Digest;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use std::marker::PhantomData;

/// Fixed-output hash; `squeeze` returns a prefix of the digest.
pub struct Sha2<D> {
    name: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D> Sha2<D> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _digest: PhantomData,
        }
    }
}

#[derive(Clone)]
struct HashSession<D> {
    state: D,
}

impl<D> SymmetricSession for HashSession<D>
where
    D: Digest + Clone + Send + 'static,
{
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        Digest::update(&mut self.state, data);
        Ok(())
    }

    fn squeeze(&mut self, out: &mut [u8]) -> Result<()> {
        if out.len() > <D as Digest>::output_size() {
            return Err(CryptoError::InvalidLength);
        }
        let digest = self.state.clone().finalize();
        out.copy_from_slice(&digest[..out.len()]);
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn SymmetricSession> {
        Box::new(self.clone())
    }
}

impl<D> SymmetricScheme for Sha2<D>
where
    D: Digest + Clone + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            hashing: true,
            ..Capabilities::default()
        }
    }

    fn key_len(&self) -> Option<usize> {
        None
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        _options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>> {
        if key.is_some() {
            return Err(CryptoError::KeyNotSupported);
        }
        Ok(Box::new(HashSession { state: D::new() }))
    }
}

/// SHAKE; every `squeeze` continues the output stream.
pub struct Shake<X> {
    name: &'static str,
    _xof: PhantomData<fn() -> X>,
}

impl<X> Shake<X> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _xof: PhantomData,
        }
    }
}

struct XofSession<X: ExtendableOutput> {
    hasher: X,
    reader: Option<X::Reader>,
    /// Bytes already squeezed.
    offset: u64,
}

fn skip<R: XofReader>(reader: &mut R, mut n: u64) {
    let mut scratch = [0u8; 64];
    while n > 0 {
        let chunk = n.min(scratch.len() as u64) as usize;
        reader.read(&mut scratch[..chunk]);
        n -= chunk as u64;
    }
}

impl<X> SymmetricSession for XofSession<X>
where
    X: Update + ExtendableOutput + Clone + Send + 'static,
    X::Reader: Send,
{
    fn absorb(&mut self, data: &[u8]) -> Result<()> {
        if self.reader.is_some() {
            return Err(CryptoError::InvalidOperation);
        }
        Update::update(&mut self.hasher, data);
        Ok(())
    }

    fn squeeze(&mut self, out: &mut [u8]) -> Result<()> {
        let hasher = &self.hasher;
        let offset = self.offset;
        let reader = self.reader.get_or_insert_with(|| {
            let mut reader = hasher.clone().finalize_xof();
            skip(&mut reader, offset);
            reader
        });
        reader.read(out);
        self.offset += out.len() as u64;
        Ok(())
    }

    // The reader is rebuilt lazily from the absorbed state and the offset
    fn box_clone(&self) -> Box<dyn SymmetricSession> {
        Box::new(XofSession {
            hasher: self.hasher.clone(),
            reader: None,
            offset: self.offset,
        })
    }
}

impl<X> SymmetricScheme for Shake<X>
where
    X: Update + ExtendableOutput + Default + Clone + Send + 'static,
    X::Reader: Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            hashing: true,
            xof: true,
            ..Capabilities::default()
        }
    }

    fn key_len(&self) -> Option<usize> {
        None
    }

    fn open(
        &self,
        key: Option<&[u8]>,
        _options: Option<&OptionsSnapshot>,
    ) -> Result<Box<dyn SymmetricSession>> {
        if key.is_some() {
            return Err(CryptoError::KeyNotSupported);
        }
        Ok(Box::new(XofSession {
            hasher: X::default(),
            reader: None,
            offset: 0,
        }))
    }
}
