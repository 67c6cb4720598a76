// Менеджер секретов и внешние секреты
//
// Идентификаторы передаются как 16 байт (SecretId::LEN).

use super::CryptoCtx;
use crate::error::Result;
use crate::handles::Handle;
use crate::options::OptionsType;
use crate::secrets::{SecretId, SecretsManager, Version};
use crate::utils::time::Timestamp;

impl CryptoCtx {
    /// Opens a secrets manager. A `transport_key` option lets several
    /// managers exchange encapsulated secrets.
    pub fn secrets_manager_open(&self, options: Option<Handle>) -> Result<Handle> {
        let options = self.options_snapshot(options, OptionsType::SecretsManager)?;
        let manager = SecretsManager::open(
            &self.registry,
            &self.config,
            self.clock.clone(),
            options.as_ref(),
        )?;
        self.handles.secrets_manager.register(manager)
    }

    pub fn secrets_manager_close(&self, sm: Handle) -> Result<()> {
        self.handles.secrets_manager.close(sm).map(|_| ())
    }

    /// Invalidates a version of any kind of secret held by the manager.
    pub fn secrets_manager_invalidate(&self, sm: Handle, id: &[u8], version: Version) -> Result<()> {
        let manager = self.handles.secrets_manager.get(sm)?;
        manager.invalidate(&SecretId::from_slice(id)?, version)
    }

    pub fn external_secret_store(
        &self,
        sm: Handle,
        secret: &[u8],
        expiration: Option<Timestamp>,
    ) -> Result<SecretId> {
        self.handles
            .secrets_manager
            .get(sm)?
            .store_external(secret, expiration)
    }

    pub fn external_secret_replace(
        &self,
        sm: Handle,
        secret: &[u8],
        expiration: Option<Timestamp>,
        id: &[u8],
    ) -> Result<Version> {
        let manager = self.handles.secrets_manager.get(sm)?;
        manager.replace_external(secret, expiration, &SecretId::from_slice(id)?)
    }

    pub fn external_secret_from_id(&self, sm: Handle, id: &[u8], version: Version) -> Result<Handle> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let secret = manager.external_from_id(&SecretId::from_slice(id)?, version)?;
        self.secret_output(secret)
    }

    pub fn external_secret_invalidate(&self, sm: Handle, id: &[u8], version: Version) -> Result<()> {
        let manager = self.handles.secrets_manager.get(sm)?;
        manager.invalidate_external(&SecretId::from_slice(id)?, version)
    }

    pub fn external_secret_encapsulate(
        &self,
        sm: Handle,
        secret: &[u8],
        expiration: Option<Timestamp>,
    ) -> Result<Handle> {
        let envelope = self
            .handles
            .secrets_manager
            .get(sm)?
            .encapsulate(secret, expiration)?;
        self.output(envelope)
    }

    pub fn external_secret_decapsulate(&self, sm: Handle, encapsulated: &[u8]) -> Result<Handle> {
        let secret = self
            .handles
            .secrets_manager
            .get(sm)?
            .decapsulate(encapsulated)?;
        self.secret_output(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::CryptoError;
    use crate::secrets::VERSION_LATEST;
    use crate::utils::time::ManualClock;
    use std::sync::Arc;

    fn ctx(clock: Arc<ManualClock>) -> CryptoCtx {
        CryptoCtx::with_config(Config::default(), clock)
    }

    fn read(ctx: &CryptoCtx, out: Handle) -> Vec<u8> {
        let mut buf = vec![0u8; ctx.array_output_len(out).unwrap()];
        ctx.array_output_pull(out, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_store_replace_read() {
        let ctx = ctx(Arc::new(ManualClock::new(0)));
        let sm = ctx.secrets_manager_open(None).unwrap();
        let id = ctx.external_secret_store(sm, b"v1", None).unwrap();
        let id = id.as_bytes();
        assert_eq!(ctx.external_secret_replace(sm, b"v2", None, id).unwrap(), 2);

        assert_eq!(read(&ctx, ctx.external_secret_from_id(sm, id, 1).unwrap()), b"v1");
        assert_eq!(
            read(&ctx, ctx.external_secret_from_id(sm, id, VERSION_LATEST).unwrap()),
            b"v2"
        );

        ctx.external_secret_invalidate(sm, id, VERSION_LATEST).unwrap();
        assert_eq!(
            read(&ctx, ctx.external_secret_from_id(sm, id, VERSION_LATEST).unwrap()),
            b"v1"
        );
        assert_eq!(
            ctx.external_secret_from_id(sm, id, 2),
            Err(CryptoError::NotFound)
        );
        assert_eq!(
            ctx.external_secret_from_id(sm, &id[..4], 1),
            Err(CryptoError::InvalidLength)
        );
    }

    #[test]
    fn test_expiration_is_lazy() {
        let clock = Arc::new(ManualClock::new(100));
        let ctx = ctx(clock.clone());
        let sm = ctx.secrets_manager_open(None).unwrap();
        let id = ctx.external_secret_store(sm, b"temp", Some(150)).unwrap();
        assert!(ctx.external_secret_from_id(sm, id.as_bytes(), 1).is_ok());
        clock.set(150);
        assert_eq!(
            ctx.external_secret_from_id(sm, id.as_bytes(), 1),
            Err(CryptoError::Expired)
        );
    }

    #[test]
    fn test_encapsulate_between_managers() {
        let ctx = ctx(Arc::new(ManualClock::new(0)));
        let opts = ctx.options_open(OptionsType::SecretsManager).unwrap();
        ctx.options_set(opts, "transport_key", &[9u8; 32]).unwrap();
        let a = ctx.secrets_manager_open(Some(opts)).unwrap();
        let b = ctx.secrets_manager_open(Some(opts)).unwrap();
        let lone = ctx.secrets_manager_open(None).unwrap();

        let envelope = read(&ctx, ctx.external_secret_encapsulate(a, b"shared", None).unwrap());
        assert_eq!(
            read(&ctx, ctx.external_secret_decapsulate(b, &envelope).unwrap()),
            b"shared"
        );
        assert_eq!(
            ctx.external_secret_decapsulate(lone, &envelope),
            Err(CryptoError::InvalidTag)
        );
    }

    #[test]
    fn test_wrong_options_type() {
        let ctx = ctx(Arc::new(ManualClock::new(0)));
        let opts = ctx.options_open(OptionsType::Symmetric).unwrap();
        assert_eq!(ctx.secrets_manager_open(Some(opts)), Err(CryptoError::InvalidHandle));
    }

    #[test]
    fn test_closed_manager() {
        let ctx = ctx(Arc::new(ManualClock::new(0)));
        let sm = ctx.secrets_manager_open(None).unwrap();
        ctx.secrets_manager_close(sm).unwrap();
        assert_eq!(
            ctx.external_secret_store(sm, b"x", None).err(),
            Some(CryptoError::Closed)
        );
    }
}
