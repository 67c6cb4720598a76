// Общие объекты: options и array output

use super::CryptoCtx;
use crate::error::Result;
use crate::handles::Handle;
use crate::options::{GuestBuffer, Options, OptionsType};

impl CryptoCtx {
    // === Options ===

    pub fn options_open(&self, options_type: OptionsType) -> Result<Handle> {
        self.handles.options.register(Options::new(options_type))
    }

    pub fn options_close(&self, options: Handle) -> Result<()> {
        self.handles.options.close(options).map(|_| ())
    }

    pub fn options_set(&self, options: Handle, name: &str, value: &[u8]) -> Result<()> {
        self.handles.options.get(options)?.set(name, value)
    }

    pub fn options_set_u64(&self, options: Handle, name: &str, value: u64) -> Result<()> {
        self.handles.options.get(options)?.set_u64(name, value)
    }

    /// Caller memory is not borrowed by any registered algorithm; always
    /// `UnsupportedFeature` once the handle resolves.
    pub fn options_set_guest_buffer(
        &self,
        options: Handle,
        name: &str,
        buffer: GuestBuffer,
    ) -> Result<()> {
        self.handles
            .options
            .get(options)?
            .set_guest_buffer(name, buffer)
    }

    // === Array output ===

    pub fn array_output_len(&self, output: Handle) -> Result<usize> {
        self.handles.array_output.get(output)?.len()
    }

    /// Moves up to `buf.len()` bytes out; returns 0 once drained.
    pub fn array_output_pull(&self, output: Handle, buf: &mut [u8]) -> Result<usize> {
        self.handles.array_output.get(output)?.pull(buf)
    }

    pub fn array_output_close(&self, output: Handle) -> Result<()> {
        self.handles.array_output.close(output).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::CryptoError;
    use crate::utils::time::ManualClock;
    use std::sync::{Arc, Mutex};

    fn ctx() -> CryptoCtx {
        CryptoCtx::with_config(Config::default(), Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn test_options_lifecycle() {
        let ctx = ctx();
        let opts = ctx.options_open(OptionsType::Symmetric).unwrap();
        ctx.options_set(opts, "context", b"ctx").unwrap();
        ctx.options_set_u64(opts, "ops_limit", 3).unwrap();
        assert_eq!(
            ctx.options_set_guest_buffer(opts, "buffer", Arc::new(Mutex::new(vec![0u8; 16]))),
            Err(CryptoError::UnsupportedFeature)
        );
        assert_eq!(
            ctx.options_set(opts, "unknown", b"x"),
            Err(CryptoError::UnsupportedOption)
        );
        ctx.options_close(opts).unwrap();
        assert_eq!(ctx.options_set(opts, "context", b"x"), Err(CryptoError::Closed));
        assert_eq!(ctx.options_close(opts), Err(CryptoError::Closed));
    }

    #[test]
    fn test_wrong_handle_type() {
        let ctx = ctx();
        let opts = ctx.options_open(OptionsType::Symmetric).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(ctx.array_output_pull(opts, &mut buf), Err(CryptoError::InvalidHandle));
        assert_eq!(ctx.array_output_len(0), Err(CryptoError::InvalidHandle));
    }

    #[test]
    fn test_array_output_drains() {
        let ctx = ctx();
        let out = ctx.output(b"abcdef".to_vec()).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(ctx.array_output_pull(out, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(ctx.array_output_len(out).unwrap(), 2);
        assert_eq!(ctx.array_output_pull(out, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(ctx.array_output_pull(out, &mut buf).unwrap(), 0);
        ctx.array_output_close(out).unwrap();
    }
}
