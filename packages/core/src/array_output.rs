// Буфер результата переменной длины, читаемый частями

use crate::error::Result;
use std::sync::{Arc, Mutex};
use zeroize::{Zeroize, Zeroizing};

/// Drain-only output buffer.
///
/// Every [`pull`](ArrayOutput::pull) moves a prefix to the caller and wipes
/// the vacated bytes, so nothing already handed out lingers in host memory.
#[derive(Clone)]
pub struct ArrayOutput {
    data: Arc<Mutex<Zeroizing<Vec<u8>>>>,
}

impl ArrayOutput {
    pub fn new(data: Vec<u8>) -> Self {
        Self::from_secret(Zeroizing::new(data))
    }

    pub fn from_secret(data: Zeroizing<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Bytes still available.
    pub fn len(&self) -> Result<usize> {
        Ok(self.data.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copies up to `buf.len()` bytes out and removes them. Returns 0 once
    /// the output is exhausted.
    pub fn pull(&self, buf: &mut [u8]) -> Result<usize> {
        let mut data = self.data.lock()?;
        let n = buf.len().min(data.len());
        if n == 0 {
            return Ok(0);
        }
        buf[..n].copy_from_slice(&data[..n]);
        let len = data.len();
        data.copy_within(n.., 0);
        data[len - n..].zeroize();
        data.truncate(len - n);
        Ok(n)
    }
}
