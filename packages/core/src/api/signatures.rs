// Подписи: создание, проверка, импорт и экспорт

use super::CryptoCtx;
use crate::crypto::encoding::SignatureEncoding;
use crate::error::Result;
use crate::handles::Handle;
use crate::session::{Signature, SignatureState, VerificationState};

impl CryptoCtx {
    pub fn signature_export(&self, signature: Handle, encoding: SignatureEncoding) -> Result<Handle> {
        let encoded = self.handles.signature.get(signature)?.export(encoding)?;
        self.output(encoded)
    }

    /// Malformed input yields `InvalidSignature`.
    pub fn signature_import(
        &self,
        alg: &str,
        encoded: &[u8],
        encoding: SignatureEncoding,
    ) -> Result<Handle> {
        let scheme = self.registry.lookup_signature(alg)?;
        let signature = Signature::import(scheme, encoded, encoding)?;
        self.handles.signature.register(signature)
    }

    pub fn signature_close(&self, signature: Handle) -> Result<()> {
        self.handles.signature.close(signature).map(|_| ())
    }

    // === Signing ===

    pub fn signature_state_open(&self, kp: Handle) -> Result<Handle> {
        let keypair = self.handles.keypair.get(kp)?;
        let state = SignatureState::open(keypair)?;
        self.handles.signature_state.register(state)
    }

    pub fn signature_state_update(&self, state: Handle, data: &[u8]) -> Result<()> {
        self.handles.signature_state.get(state)?.update(data)
    }

    pub fn signature_state_sign(&self, state: Handle) -> Result<Handle> {
        let state = self.handles.signature_state.get(state)?;
        let slot = self.handles.signature.reserve()?;
        Ok(slot.fill(state.sign()?))
    }

    pub fn signature_state_close(&self, state: Handle) -> Result<()> {
        self.handles.signature_state.close(state).map(|_| ())
    }

    // === Verification ===

    pub fn signature_verification_state_open(&self, pk: Handle) -> Result<Handle> {
        let public = self.handles.publickey.get(pk)?;
        let state = VerificationState::open(public)?;
        self.handles.verification_state.register(state)
    }

    pub fn signature_verification_state_update(&self, state: Handle, data: &[u8]) -> Result<()> {
        self.handles.verification_state.get(state)?.update(data)
    }

    pub fn signature_verification_state_verify(&self, state: Handle, signature: Handle) -> Result<()> {
        let signature = self.handles.signature.get(signature)?;
        self.handles.verification_state.get(state)?.verify(&signature)
    }

    pub fn signature_verification_state_close(&self, state: Handle) -> Result<()> {
        self.handles.verification_state.close(state).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crypto::provider::AlgorithmType;
    use crate::error::CryptoError;
    use crate::utils::time::ManualClock;
    use std::sync::Arc;

    fn ctx() -> CryptoCtx {
        CryptoCtx::with_config(Config::default(), Arc::new(ManualClock::new(0)))
    }

    fn sign(ctx: &CryptoCtx, kp: Handle, parts: &[&[u8]]) -> Handle {
        let state = ctx.signature_state_open(kp).unwrap();
        for part in parts {
            ctx.signature_state_update(state, part).unwrap();
        }
        let signature = ctx.signature_state_sign(state).unwrap();
        ctx.signature_state_close(state).unwrap();
        signature
    }

    fn verify(ctx: &CryptoCtx, pk: Handle, parts: &[&[u8]], signature: Handle) -> Result<()> {
        let state = ctx.signature_verification_state_open(pk)?;
        for part in parts {
            ctx.signature_verification_state_update(state, part)?;
        }
        ctx.signature_verification_state_verify(state, signature)
    }

    #[test]
    fn test_sign_without_free_handle() {
        let config = Config {
            max_handles: 2,
            ..Config::default()
        };
        let ctx = CryptoCtx::with_config(config, Arc::new(ManualClock::new(0)));
        let kp = ctx.keypair_generate(AlgorithmType::Signatures, "Ed25519", None).unwrap();
        let state = ctx.signature_state_open(kp).unwrap();
        ctx.signature_state_update(state, b"payload").unwrap();
        assert_eq!(ctx.signature_state_sign(state), Err(CryptoError::TooManyHandles));
        // Состояние не помечено как подписанное
        ctx.signature_state_update(state, b" more").unwrap();
    }

    #[test]
    fn test_sign_verify_both_algorithms() {
        let ctx = ctx();
        for alg in ["Ed25519", "ECDSA_P256_SHA256"] {
            let kp = ctx.keypair_generate(AlgorithmType::Signatures, alg, None).unwrap();
            let pk = ctx.keypair_publickey(kp).unwrap();
            let signature = sign(&ctx, kp, &[b"hello ", b"world"]);
            // Разбиение сообщения на части не влияет на подпись
            verify(&ctx, pk, &[b"hello world"], signature).unwrap();
            assert_eq!(
                verify(&ctx, pk, &[b"hello there"], signature),
                Err(CryptoError::InvalidSignature)
            );
        }
    }

    #[test]
    fn test_sign_once() {
        let ctx = ctx();
        let kp = ctx.keypair_generate(AlgorithmType::Signatures, "Ed25519", None).unwrap();
        let state = ctx.signature_state_open(kp).unwrap();
        ctx.signature_state_sign(state).unwrap();
        assert_eq!(ctx.signature_state_sign(state), Err(CryptoError::InvalidOperation));
        assert_eq!(
            ctx.signature_state_update(state, b"late"),
            Err(CryptoError::InvalidOperation)
        );
    }

    #[test]
    fn test_state_outlives_key_handle() {
        let ctx = ctx();
        let kp = ctx.keypair_generate(AlgorithmType::Signatures, "Ed25519", None).unwrap();
        let state = ctx.signature_state_open(kp).unwrap();
        ctx.keypair_close(kp).unwrap();
        ctx.signature_state_update(state, b"still fine").unwrap();
        assert!(ctx.signature_state_sign(state).is_ok());
    }

    #[test]
    fn test_der_export_import() {
        let ctx = ctx();
        let kp = ctx
            .keypair_generate(AlgorithmType::Signatures, "ECDSA_P256_SHA256", None)
            .unwrap();
        let pk = ctx.keypair_publickey(kp).unwrap();
        let signature = sign(&ctx, kp, &[b"msg"]);

        let out = ctx.signature_export(signature, SignatureEncoding::Der).unwrap();
        let mut der = vec![0u8; ctx.array_output_len(out).unwrap()];
        ctx.array_output_pull(out, &mut der).unwrap();

        let imported = ctx
            .signature_import("ECDSA_P256_SHA256", &der, SignatureEncoding::Der)
            .unwrap();
        verify(&ctx, pk, &[b"msg"], imported).unwrap();
        assert_eq!(
            ctx.signature_import("ECDSA_P256_SHA256", b"junk", SignatureEncoding::Der),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_key_exchange_key_rejected() {
        let ctx = ctx();
        let kp = ctx.keypair_generate(AlgorithmType::KeyExchange, "X25519", None).unwrap();
        assert_eq!(ctx.signature_state_open(kp), Err(CryptoError::KeyNotSupported));
    }

    #[test]
    fn test_cross_algorithm_signature() {
        let ctx = ctx();
        let ed = ctx.keypair_generate(AlgorithmType::Signatures, "Ed25519", None).unwrap();
        let ec = ctx
            .keypair_generate(AlgorithmType::Signatures, "ECDSA_P256_SHA256", None)
            .unwrap();
        let ec_pk = ctx.keypair_publickey(ec).unwrap();
        let signature = sign(&ctx, ed, &[b"msg"]);
        assert_eq!(
            verify(&ctx, ec_pk, &[b"msg"], signature),
            Err(CryptoError::InvalidSignature)
        );
    }
}
