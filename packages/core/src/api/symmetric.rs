// Симметричная криптография: ключи, состояния, теги

use super::CryptoCtx;
use crate::crypto::keys::SymmetricKey;
use crate::error::{CryptoError, Result};
use crate::handles::Handle;
use crate::options::OptionsType;
use crate::secrets::{generate_symmetric_material, SecretId, Version};
use crate::session::SymmetricState;
use tracing::debug;
use zeroize::Zeroizing;

impl CryptoCtx {
    fn new_symmetric_key(&self, alg: &str, options: Option<Handle>) -> Result<SymmetricKey> {
        let scheme = self.registry.lookup_symmetric(alg)?;
        self.options_snapshot(options, OptionsType::Symmetric)?;
        let raw = generate_symmetric_material(scheme.as_ref())?;
        Ok(SymmetricKey::new(scheme, raw))
    }

    // === Symmetric key ===

    pub fn symmetric_key_generate(&self, alg: &str, options: Option<Handle>) -> Result<Handle> {
        let key = self.new_symmetric_key(alg, options)?;
        debug!(target: "hostcrypto::symmetric", algorithm = alg, "key generated");
        self.handles.symmetric_key.register(key)
    }

    pub fn symmetric_key_import(&self, alg: &str, raw: &[u8]) -> Result<Handle> {
        let scheme = self.registry.lookup_symmetric(alg)?;
        scheme.validate_key(raw)?;
        let key = SymmetricKey::new(scheme, Zeroizing::new(raw.to_vec()));
        self.handles.symmetric_key.register(key)
    }

    /// Raw key bytes; refused for managed keys.
    pub fn symmetric_key_export(&self, key: Handle) -> Result<Handle> {
        let key = self.handles.symmetric_key.get(key)?;
        let raw = Zeroizing::new(key.exportable()?.to_vec());
        self.secret_output(raw)
    }

    pub fn symmetric_key_close(&self, key: Handle) -> Result<()> {
        self.handles.symmetric_key.close(key).map(|_| ())
    }

    // === Управляемые ключи ===

    pub fn symmetric_key_generate_managed(
        &self,
        sm: Handle,
        alg: &str,
        options: Option<Handle>,
    ) -> Result<Handle> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let key = self.new_symmetric_key(alg, options)?;
        let slot = self.handles.symmetric_key.reserve()?;
        Ok(slot.fill(manager.generate_symmetric_key(key)?))
    }

    pub fn symmetric_key_store_managed(&self, sm: Handle, key: Handle) -> Result<SecretId> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let key = self.handles.symmetric_key.get(key)?;
        manager.store_symmetric_key(&key)
    }

    pub fn symmetric_key_replace_managed(
        &self,
        sm: Handle,
        key: Handle,
        new_key: Handle,
    ) -> Result<Version> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let old = self.handles.symmetric_key.get(key)?;
        let new = self.handles.symmetric_key.get(new_key)?;
        manager.replace_symmetric_key(&old, &new)
    }

    pub fn symmetric_key_id(&self, key: Handle) -> Result<(SecretId, Version)> {
        let key = self.handles.symmetric_key.get(key)?;
        let binding = key.managed().ok_or(CryptoError::NotFound)?;
        Ok((binding.id, binding.version))
    }

    pub fn symmetric_key_from_id(&self, sm: Handle, id: &[u8], version: Version) -> Result<Handle> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let key = manager.symmetric_key_from_id(&SecretId::from_slice(id)?, version)?;
        self.handles.symmetric_key.register(key)
    }

    // === Symmetric state ===

    pub fn symmetric_state_open(
        &self,
        alg: &str,
        key: Option<Handle>,
        options: Option<Handle>,
    ) -> Result<Handle> {
        let scheme = self.registry.lookup_symmetric(alg)?;
        let key = key.map(|h| self.handles.symmetric_key.get(h)).transpose()?;
        let options = self.options_snapshot(options, OptionsType::Symmetric)?;
        let state = SymmetricState::open(scheme, key.as_ref(), options)?;
        self.handles.symmetric_state.register(state)
    }

    /// Copies a byte option the state was opened with into `out`.
    pub fn symmetric_state_options_get(&self, state: Handle, name: &str, out: &mut [u8]) -> Result<usize> {
        self.handles.symmetric_state.get(state)?.options_get(name, out)
    }

    pub fn symmetric_state_options_get_u64(&self, state: Handle, name: &str) -> Result<u64> {
        self.handles.symmetric_state.get(state)?.options_get_u64(name)
    }

    /// Independent copy of the session, phase included.
    pub fn symmetric_state_clone(&self, state: Handle) -> Result<Handle> {
        let copy = self.handles.symmetric_state.get(state)?.try_clone()?;
        self.handles.symmetric_state.register(copy)
    }

    pub fn symmetric_state_close(&self, state: Handle) -> Result<()> {
        self.handles.symmetric_state.close(state).map(|_| ())
    }

    pub fn symmetric_state_absorb(&self, state: Handle, data: &[u8]) -> Result<()> {
        self.handles.symmetric_state.get(state)?.absorb(data)
    }

    pub fn symmetric_state_squeeze(&self, state: Handle, out: &mut [u8]) -> Result<()> {
        self.handles.symmetric_state.get(state)?.squeeze(out)
    }

    pub fn symmetric_state_squeeze_tag(&self, state: Handle) -> Result<Handle> {
        let state = self.handles.symmetric_state.get(state)?;
        let slot = self.handles.symmetric_tag.reserve()?;
        Ok(slot.fill(state.squeeze_tag()?))
    }

    /// Derives a key for `alg` from the session.
    pub fn symmetric_state_squeeze_key(&self, state: Handle, alg: &str) -> Result<Handle> {
        let target = self.registry.lookup_symmetric(alg)?;
        let state = self.handles.symmetric_state.get(state)?;
        let slot = self.handles.symmetric_key.reserve()?;
        Ok(slot.fill(state.squeeze_key(target)?))
    }

    pub fn symmetric_state_max_tag_len(&self, state: Handle) -> Result<usize> {
        Ok(self.handles.symmetric_state.get(state)?.max_tag_len())
    }

    /// Writes `ciphertext || tag` to `out`, returns the number of bytes written.
    pub fn symmetric_state_encrypt(&self, state: Handle, out: &mut [u8], data: &[u8]) -> Result<usize> {
        self.handles.symmetric_state.get(state)?.encrypt(out, data)
    }

    pub fn symmetric_state_encrypt_detached(
        &self,
        state: Handle,
        out: &mut [u8],
        data: &[u8],
    ) -> Result<Handle> {
        let state = self.handles.symmetric_state.get(state)?;
        let slot = self.handles.symmetric_tag.reserve()?;
        Ok(slot.fill(state.encrypt_detached(out, data)?))
    }

    pub fn symmetric_state_decrypt(&self, state: Handle, out: &mut [u8], data: &[u8]) -> Result<usize> {
        self.handles.symmetric_state.get(state)?.decrypt(out, data)
    }

    pub fn symmetric_state_decrypt_detached(
        &self,
        state: Handle,
        out: &mut [u8],
        data: &[u8],
        raw_tag: &[u8],
    ) -> Result<usize> {
        self.handles
            .symmetric_state
            .get(state)?
            .decrypt_detached(out, data, raw_tag)
    }

    pub fn symmetric_state_ratchet(&self, state: Handle) -> Result<()> {
        self.handles.symmetric_state.get(state)?.ratchet()
    }

    // === Tags ===

    pub fn symmetric_tag_len(&self, tag: Handle) -> Result<usize> {
        Ok(self.handles.symmetric_tag.get(tag)?.len())
    }

    pub fn symmetric_tag_pull(&self, tag: Handle, buf: &mut [u8]) -> Result<usize> {
        self.handles.symmetric_tag.get(tag)?.pull(buf)
    }

    /// Constant-time comparison with `expected`.
    pub fn symmetric_tag_verify(&self, tag: Handle, expected: &[u8]) -> Result<()> {
        self.handles.symmetric_tag.get(tag)?.verify(expected)
    }

    pub fn symmetric_tag_close(&self, tag: Handle) -> Result<()> {
        self.handles.symmetric_tag.close(tag).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::utils::time::ManualClock;
    use std::sync::Arc;

    fn ctx() -> CryptoCtx {
        CryptoCtx::with_config(Config::default(), Arc::new(ManualClock::new(0)))
    }

    fn limited_ctx(max_handles: u32) -> CryptoCtx {
        let config = Config {
            max_handles,
            ..Config::default()
        };
        CryptoCtx::with_config(config, Arc::new(ManualClock::new(0)))
    }

    fn nonce_options(ctx: &CryptoCtx, nonce: &[u8]) -> Handle {
        let opts = ctx.options_open(OptionsType::Symmetric).unwrap();
        ctx.options_set(opts, "nonce", nonce).unwrap();
        opts
    }

    #[test]
    fn test_sha256_vector() {
        let ctx = ctx();
        let state = ctx.symmetric_state_open("SHA-256", None, None).unwrap();
        ctx.symmetric_state_absorb(state, b"a").unwrap();
        ctx.symmetric_state_absorb(state, b"bc").unwrap();
        let mut digest = [0u8; 32];
        ctx.symmetric_state_squeeze(state, &mut digest).unwrap();
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(ctx.symmetric_state_max_tag_len(state).unwrap(), 0);
    }

    #[test]
    fn test_hash_rejects_key() {
        let ctx = ctx();
        let key = ctx.symmetric_key_generate("HMAC/SHA-256", None).unwrap();
        assert_eq!(
            ctx.symmetric_state_open("SHA-256", Some(key), None),
            Err(CryptoError::KeyNotSupported)
        );
        assert_eq!(
            ctx.symmetric_key_generate("SHA-256", None),
            Err(CryptoError::KeyNotSupported)
        );
    }

    #[test]
    fn test_mac_tag_verify() {
        let ctx = ctx();
        let key = ctx.symmetric_key_import("HMAC/SHA-256", &[0x0b; 32]).unwrap();
        let state = ctx.symmetric_state_open("HMAC/SHA-256", Some(key), None).unwrap();
        ctx.symmetric_state_absorb(state, b"message").unwrap();
        let tag = ctx.symmetric_state_squeeze_tag(state).unwrap();
        assert_eq!(ctx.symmetric_tag_len(tag).unwrap(), 32);

        let mut raw = [0u8; 32];
        ctx.symmetric_tag_pull(tag, &mut raw).unwrap();
        ctx.symmetric_tag_verify(tag, &raw).unwrap();
        raw[0] ^= 1;
        assert_eq!(ctx.symmetric_tag_verify(tag, &raw), Err(CryptoError::InvalidTag));

        let mut short = [0u8; 8];
        assert_eq!(ctx.symmetric_tag_pull(tag, &mut short), Err(CryptoError::Overflow));
        assert_eq!(
            ctx.symmetric_state_open("HMAC/SHA-256", None, None),
            Err(CryptoError::KeyRequired)
        );
    }

    #[test]
    fn test_squeeze_tag_without_free_handle() {
        let ctx = limited_ctx(2);
        let key = ctx.symmetric_key_import("HMAC/SHA-256", &[0x0b; 32]).unwrap();
        let state = ctx.symmetric_state_open("HMAC/SHA-256", Some(key), None).unwrap();
        ctx.symmetric_state_absorb(state, b"message").unwrap();
        assert_eq!(ctx.symmetric_state_squeeze_tag(state), Err(CryptoError::TooManyHandles));
        // Сессия не финализирована
        ctx.symmetric_state_absorb(state, b" continued").unwrap();
        assert_eq!(ctx.handles.symmetric_tag.len(), 0);
    }

    #[test]
    fn test_squeeze_key_without_free_handle() {
        let ctx = limited_ctx(2);
        let salt = ctx.symmetric_key_import("HKDF-EXTRACT/SHA-256", &[0u8; 32]).unwrap();
        let extract = ctx
            .symmetric_state_open("HKDF-EXTRACT/SHA-256", Some(salt), None)
            .unwrap();
        ctx.symmetric_state_absorb(extract, b"ikm").unwrap();
        assert_eq!(
            ctx.symmetric_state_squeeze_key(extract, "HKDF-EXPAND/SHA-256"),
            Err(CryptoError::TooManyHandles)
        );
        ctx.symmetric_state_absorb(extract, b" more ikm").unwrap();
        assert_eq!(ctx.handles.symmetric_key.len(), 1);
    }

    #[test]
    fn test_encrypt_detached_without_free_handle() {
        let ctx = limited_ctx(3);
        let key = ctx.symmetric_key_import("AES-128-GCM", &[5u8; 16]).unwrap();
        let opts = nonce_options(&ctx, &[6u8; 12]);
        let state = ctx.symmetric_state_open("AES-128-GCM", Some(key), Some(opts)).unwrap();

        let mut out = [0u8; 4 + 16];
        assert_eq!(
            ctx.symmetric_state_encrypt_detached(state, &mut out[..4], b"data"),
            Err(CryptoError::TooManyHandles)
        );
        assert_eq!(out, [0u8; 20]);
        // Nonce не израсходован: обычное шифрование всё ещё доступно
        assert_eq!(ctx.symmetric_state_encrypt(state, &mut out, b"data").unwrap(), 20);
    }

    #[test]
    fn test_aead_round_trip() {
        let ctx = ctx();
        let key = ctx.symmetric_key_generate("AES-256-GCM", None).unwrap();
        let opts = nonce_options(&ctx, &[1u8; 12]);

        let enc = ctx.symmetric_state_open("AES-256-GCM", Some(key), Some(opts)).unwrap();
        ctx.symmetric_state_absorb(enc, b"header").unwrap();
        let max_tag = ctx.symmetric_state_max_tag_len(enc).unwrap();
        let mut ciphertext = vec![0u8; 5 + max_tag];
        let n = ctx.symmetric_state_encrypt(enc, &mut ciphertext, b"hello").unwrap();
        assert_eq!(n, 5 + max_tag);
        // Повторное шифрование с тем же nonce запрещено
        assert_eq!(
            ctx.symmetric_state_encrypt(enc, &mut ciphertext.clone(), b"hello"),
            Err(CryptoError::ProhibitedOperation)
        );

        let dec = ctx.symmetric_state_open("AES-256-GCM", Some(key), Some(opts)).unwrap();
        ctx.symmetric_state_absorb(dec, b"header").unwrap();
        let mut plaintext = [0u8; 5];
        assert_eq!(ctx.symmetric_state_decrypt(dec, &mut plaintext, &ciphertext).unwrap(), 5);
        assert_eq!(&plaintext, b"hello");
    }

    #[test]
    fn test_aead_detached_tamper() {
        let ctx = ctx();
        let key = ctx.symmetric_key_generate("CHACHA20-POLY1305", None).unwrap();
        let opts = nonce_options(&ctx, &[2u8; 12]);

        let enc = ctx
            .symmetric_state_open("CHACHA20-POLY1305", Some(key), Some(opts))
            .unwrap();
        let mut ciphertext = [0u8; 4];
        let tag = ctx
            .symmetric_state_encrypt_detached(enc, &mut ciphertext, b"data")
            .unwrap();
        let mut raw_tag = vec![0u8; ctx.symmetric_tag_len(tag).unwrap()];
        ctx.symmetric_tag_pull(tag, &mut raw_tag).unwrap();

        let dec = ctx
            .symmetric_state_open("CHACHA20-POLY1305", Some(key), Some(opts))
            .unwrap();
        let mut out = [0xaau8; 4];
        ciphertext[0] ^= 1;
        assert_eq!(
            ctx.symmetric_state_decrypt_detached(dec, &mut out, &ciphertext, &raw_tag),
            Err(CryptoError::InvalidTag)
        );
        assert_eq!(out, [0xaa; 4]);
    }

    #[test]
    fn test_aead_parameter_errors() {
        let ctx = ctx();
        let key = ctx.symmetric_key_generate("AES-128-GCM", None).unwrap();
        assert_eq!(
            ctx.symmetric_state_open("AES-128-GCM", Some(key), None),
            Err(CryptoError::ParametersMissing)
        );
        let empty = ctx.options_open(OptionsType::Symmetric).unwrap();
        assert_eq!(
            ctx.symmetric_state_open("AES-128-GCM", Some(key), Some(empty)),
            Err(CryptoError::NonceRequired)
        );
        let short = nonce_options(&ctx, &[0u8; 8]);
        assert_eq!(
            ctx.symmetric_state_open("AES-128-GCM", Some(key), Some(short)),
            Err(CryptoError::InvalidNonce)
        );
    }

    #[test]
    fn test_hkdf_chain() {
        let ctx = ctx();
        let salt = ctx.symmetric_key_import("HKDF-EXTRACT/SHA-256", &[0u8; 32]).unwrap();
        let extract = ctx
            .symmetric_state_open("HKDF-EXTRACT/SHA-256", Some(salt), None)
            .unwrap();
        ctx.symmetric_state_absorb(extract, b"input keying material").unwrap();
        assert_eq!(
            ctx.symmetric_state_squeeze_key(extract, "AES-256-GCM"),
            Err(CryptoError::UnsupportedAlgorithm)
        );
        let prk = ctx
            .symmetric_state_squeeze_key(extract, "HKDF-EXPAND/SHA-256")
            .unwrap();

        let expand = ctx
            .symmetric_state_open("HKDF-EXPAND/SHA-256", Some(prk), None)
            .unwrap();
        ctx.symmetric_state_absorb(expand, b"info").unwrap();
        let mut okm = [0u8; 42];
        ctx.symmetric_state_squeeze(expand, &mut okm).unwrap();
        assert_ne!(okm, [0u8; 42]);
    }

    #[test]
    fn test_ratchet_and_clone() {
        let ctx = ctx();
        let key = ctx.symmetric_key_generate("HKDF-RATCHET/SHA-256", None).unwrap();
        let state = ctx
            .symmetric_state_open("HKDF-RATCHET/SHA-256", Some(key), None)
            .unwrap();
        ctx.symmetric_state_absorb(state, b"epoch").unwrap();
        let copy = ctx.symmetric_state_clone(state).unwrap();
        ctx.symmetric_state_ratchet(state).unwrap();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        ctx.symmetric_state_squeeze(state, &mut a).unwrap();
        ctx.symmetric_state_squeeze(copy, &mut b).unwrap();
        assert_ne!(a, b);

        let sha = ctx.symmetric_state_open("SHA-256", None, None).unwrap();
        assert_eq!(ctx.symmetric_state_ratchet(sha), Err(CryptoError::NotImplemented));
    }

    #[test]
    fn test_options_get_through_state() {
        let ctx = ctx();
        let key = ctx.symmetric_key_generate("XCHACHA20-POLY1305", None).unwrap();
        let opts = nonce_options(&ctx, &[3u8; 24]);
        let state = ctx
            .symmetric_state_open("XCHACHA20-POLY1305", Some(key), Some(opts))
            .unwrap();
        // Изменение options после открытия не влияет на состояние
        ctx.options_set(opts, "nonce", &[4u8; 24]).unwrap();
        let mut nonce = [0u8; 24];
        assert_eq!(ctx.symmetric_state_options_get(state, "nonce", &mut nonce).unwrap(), 24);
        assert_eq!(nonce, [3u8; 24]);
        assert_eq!(
            ctx.symmetric_state_options_get_u64(state, "ops_limit"),
            Err(CryptoError::OptionNotSet)
        );
    }

    #[test]
    fn test_limits_readable_through_state() {
        let ctx = ctx();
        let opts = ctx.options_open(OptionsType::Symmetric).unwrap();
        ctx.options_set_u64(opts, "Memory_Limit", 1 << 20).unwrap();
        ctx.options_set_u64(opts, "parallelism", 4).unwrap();
        let state = ctx.symmetric_state_open("SHA-512", None, Some(opts)).unwrap();
        assert_eq!(ctx.symmetric_state_options_get_u64(state, "memory_limit").unwrap(), 1 << 20);
        assert_eq!(ctx.symmetric_state_options_get_u64(state, "PARALLELISM").unwrap(), 4);
        assert_eq!(
            ctx.symmetric_state_options_get_u64(state, "nonce"),
            Err(CryptoError::UnsupportedOption)
        );
    }

    #[test]
    fn test_key_export_import() {
        let ctx = ctx();
        let key = ctx.symmetric_key_generate("HMAC/SHA-512", None).unwrap();
        let out = ctx.symmetric_key_export(key).unwrap();
        let mut raw = vec![0u8; ctx.array_output_len(out).unwrap()];
        ctx.array_output_pull(out, &mut raw).unwrap();
        assert_eq!(raw.len(), 64);
        assert!(ctx.symmetric_key_import("HMAC/SHA-512", &raw).is_ok());
        assert_eq!(
            ctx.symmetric_key_import("HMAC/SHA-512", &[]),
            Err(CryptoError::InvalidKey)
        );
        assert_eq!(
            ctx.symmetric_key_import("AES-256-GCM", &raw[..3]),
            Err(CryptoError::InvalidKey)
        );
    }
}
