// Асимметричные ключи: keypair, publickey, secretkey
// и управляемые пары ключей

use super::{options_type_for, CryptoCtx};
use crate::crypto::encoding::{self, KeypairEncoding, PublicKeyEncoding, SecretKeyEncoding};
use crate::crypto::keys::{Keypair, PublicKey, SecretKey};
use crate::crypto::provider::AlgorithmType;
use crate::error::{CryptoError, Result};
use crate::handles::Handle;
use crate::secrets::{SecretId, Version};
use tracing::debug;

impl CryptoCtx {
    // === Keypair ===

    pub fn keypair_generate(
        &self,
        alg_type: AlgorithmType,
        alg: &str,
        options: Option<Handle>,
    ) -> Result<Handle> {
        let backend = self.registry.keypair_backend(alg_type, alg)?;
        self.options_snapshot(options, options_type_for(alg_type))?;
        let raw = backend.codec().generate_keypair()?;
        debug!(target: "hostcrypto::keys", algorithm = alg, "keypair generated");
        self.handles.keypair.register(Keypair::new(backend, raw))
    }

    pub fn keypair_import(
        &self,
        alg_type: AlgorithmType,
        alg: &str,
        encoded: &[u8],
        encoding: KeypairEncoding,
    ) -> Result<Handle> {
        let backend = self.registry.keypair_backend(alg_type, alg)?;
        let raw = encoding::import_keypair(backend.codec(), encoded, encoding)?;
        self.handles.keypair.register(Keypair::new(backend, raw))
    }

    /// Exports the keypair; refused for managed keys.
    pub fn keypair_export(&self, kp: Handle, encoding: KeypairEncoding) -> Result<Handle> {
        let keypair = self.handles.keypair.get(kp)?;
        let raw = keypair.exportable()?;
        let encoded = encoding::export_keypair(keypair.backend().codec(), raw, encoding)?;
        self.secret_output(encoded)
    }

    pub fn keypair_publickey(&self, kp: Handle) -> Result<Handle> {
        let public = self.handles.keypair.get(kp)?.public_key()?;
        self.handles.publickey.register(public)
    }

    pub fn keypair_secretkey(&self, kp: Handle) -> Result<Handle> {
        let secret = self.handles.keypair.get(kp)?.secret_key()?;
        self.handles.secretkey.register(secret)
    }

    /// Joins a public and a secret key into a keypair. The public key must
    /// be the one derived from the secret key.
    pub fn keypair_from_pk_and_sk(&self, pk: Handle, sk: Handle) -> Result<Handle> {
        let public = self.handles.publickey.get(pk)?;
        let secret = self.handles.secretkey.get(sk)?;
        if !public.backend().same_algorithm(secret.backend()) {
            return Err(CryptoError::IncompatibleKeys);
        }
        if secret.keypair().public != public.raw() {
            return Err(CryptoError::VerificationFailed);
        }
        let keypair = Keypair::new(secret.backend().clone(), secret.keypair().clone());
        self.handles.keypair.register(keypair)
    }

    pub fn keypair_close(&self, kp: Handle) -> Result<()> {
        self.handles.keypair.close(kp).map(|_| ())
    }

    // === Управляемые пары ключей ===

    /// Generates a keypair directly under management of `sm`.
    pub fn keypair_generate_managed(
        &self,
        sm: Handle,
        alg_type: AlgorithmType,
        alg: &str,
        options: Option<Handle>,
    ) -> Result<Handle> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let backend = self.registry.keypair_backend(alg_type, alg)?;
        self.options_snapshot(options, options_type_for(alg_type))?;
        let slot = self.handles.keypair.reserve()?;
        Ok(slot.fill(manager.generate_keypair(backend)?))
    }

    pub fn keypair_store_managed(&self, sm: Handle, kp: Handle) -> Result<SecretId> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let keypair = self.handles.keypair.get(kp)?;
        manager.store_keypair(&keypair)
    }

    /// Makes `new_kp` the next version of the id `kp` is managed under.
    pub fn keypair_replace_managed(&self, sm: Handle, kp: Handle, new_kp: Handle) -> Result<Version> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let old = self.handles.keypair.get(kp)?;
        let new = self.handles.keypair.get(new_kp)?;
        manager.replace_keypair(&old, &new)
    }

    /// Id and version of a managed keypair.
    pub fn keypair_id(&self, kp: Handle) -> Result<(SecretId, Version)> {
        let keypair = self.handles.keypair.get(kp)?;
        let binding = keypair.managed().ok_or(CryptoError::NotFound)?;
        Ok((binding.id, binding.version))
    }

    pub fn keypair_from_id(&self, sm: Handle, id: &[u8], version: Version) -> Result<Handle> {
        let manager = self.handles.secrets_manager.get(sm)?;
        let keypair = manager.keypair_from_id(&SecretId::from_slice(id)?, version)?;
        self.handles.keypair.register(keypair)
    }

    // === Public key ===

    pub fn publickey_import(
        &self,
        alg_type: AlgorithmType,
        alg: &str,
        encoded: &[u8],
        encoding: PublicKeyEncoding,
    ) -> Result<Handle> {
        let backend = self.registry.keypair_backend(alg_type, alg)?;
        let raw = encoding::import_public(backend.codec(), encoded, encoding)?;
        self.handles.publickey.register(PublicKey::new(backend, raw))
    }

    pub fn publickey_export(&self, pk: Handle, encoding: PublicKeyEncoding) -> Result<Handle> {
        let public = self.handles.publickey.get(pk)?;
        let encoded = encoding::export_public(public.backend().codec(), public.raw(), encoding)?;
        self.output(encoded)
    }

    /// Checks that the public key is a valid point for its algorithm.
    pub fn publickey_verify(&self, pk: Handle) -> Result<()> {
        let public = self.handles.publickey.get(pk)?;
        public
            .backend()
            .codec()
            .validate_public(public.raw())
            .map_err(|_| CryptoError::InvalidKey)
    }

    pub fn publickey_close(&self, pk: Handle) -> Result<()> {
        self.handles.publickey.close(pk).map(|_| ())
    }

    // === Secret key ===

    pub fn secretkey_import(
        &self,
        alg_type: AlgorithmType,
        alg: &str,
        encoded: &[u8],
        encoding: SecretKeyEncoding,
    ) -> Result<Handle> {
        let backend = self.registry.keypair_backend(alg_type, alg)?;
        let raw = encoding::import_secret(backend.codec(), encoded, encoding)?;
        self.handles.secretkey.register(SecretKey::new(backend, raw))
    }

    pub fn secretkey_export(&self, sk: Handle, encoding: SecretKeyEncoding) -> Result<Handle> {
        let secret = self.handles.secretkey.get(sk)?;
        let encoded = encoding::export_secret(secret.backend().codec(), secret.raw(), encoding)?;
        self.secret_output(encoded)
    }

    pub fn secretkey_publickey(&self, sk: Handle) -> Result<Handle> {
        let public = self.handles.secretkey.get(sk)?.public_key();
        self.handles.publickey.register(public)
    }

    pub fn secretkey_close(&self, sk: Handle) -> Result<()> {
        self.handles.secretkey.close(sk).map(|_| ())
    }
}
