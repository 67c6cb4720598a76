// Обмен ключами: DH и инкапсуляция

use super::CryptoCtx;
use crate::array_output::ArrayOutput;
use crate::crypto::keys::{PublicKey, SecretKey};
use crate::crypto::provider::KeyExchangeScheme;
use crate::error::{CryptoError, Result};
use crate::handles::Handle;
use std::sync::Arc;
use tracing::debug;

fn kx_scheme(public: &PublicKey, secret: &SecretKey) -> Result<Arc<dyn KeyExchangeScheme>> {
    let scheme = public.backend().key_exchange()?.clone();
    secret.backend().key_exchange()?;
    if !public.backend().same_algorithm(secret.backend()) {
        return Err(CryptoError::IncompatibleKeys);
    }
    Ok(scheme)
}

impl CryptoCtx {
    /// Shared secret of `pk` and `sk`.
    pub fn kx_dh(&self, pk: Handle, sk: Handle) -> Result<Handle> {
        let public = self.handles.publickey.get(pk)?;
        let secret = self.handles.secretkey.get(sk)?;
        let scheme = kx_scheme(&public, &secret)?;
        let shared = scheme.dh(public.raw(), secret.raw())?;
        debug!(target: "hostcrypto::kx", algorithm = scheme.name(), "dh computed");
        self.secret_output(shared)
    }

    /// Returns `(shared_secret, encapsulated_key)` output handles.
    pub fn kx_encapsulate(&self, pk: Handle) -> Result<(Handle, Handle)> {
        let public = self.handles.publickey.get(pk)?;
        let scheme = public.backend().key_exchange()?;
        // Оба handle берутся до инкапсуляции: при ошибке ни один не виден
        let shared_slot = self.handles.array_output.reserve()?;
        let encapsulated_slot = self.handles.array_output.reserve()?;
        let (shared, encapsulated) = scheme.encapsulate(public.raw())?;
        debug!(target: "hostcrypto::kx", algorithm = scheme.name(), "secret encapsulated");
        Ok((
            shared_slot.fill(ArrayOutput::from_secret(shared)),
            encapsulated_slot.fill(ArrayOutput::new(encapsulated)),
        ))
    }

    pub fn kx_decapsulate(&self, sk: Handle, encapsulated: &[u8]) -> Result<Handle> {
        let secret = self.handles.secretkey.get(sk)?;
        let scheme = secret.backend().key_exchange()?;
        let shared = scheme.decapsulate(secret.raw(), encapsulated)?;
        self.secret_output(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::crypto::provider::AlgorithmType;
    use crate::handles::HandleType;
    use crate::utils::time::ManualClock;

    fn ctx() -> CryptoCtx {
        CryptoCtx::with_config(Config::default(), Arc::new(ManualClock::new(0)))
    }

    fn read(ctx: &CryptoCtx, out: Handle) -> Vec<u8> {
        let mut buf = vec![0u8; ctx.array_output_len(out).unwrap()];
        ctx.array_output_pull(out, &mut buf).unwrap();
        buf
    }

    fn keys(ctx: &CryptoCtx, alg: &str) -> (Handle, Handle) {
        let kp = ctx.keypair_generate(AlgorithmType::KeyExchange, alg, None).unwrap();
        (ctx.keypair_publickey(kp).unwrap(), ctx.keypair_secretkey(kp).unwrap())
    }

    #[test]
    fn test_dh_agreement() {
        let ctx = ctx();
        for alg in ["X25519", "P256"] {
            let (pk_a, sk_a) = keys(&ctx, alg);
            let (pk_b, sk_b) = keys(&ctx, alg);
            let ab = read(&ctx, ctx.kx_dh(pk_b, sk_a).unwrap());
            let ba = read(&ctx, ctx.kx_dh(pk_a, sk_b).unwrap());
            assert_eq!(ab, ba, "{alg}");
            assert_eq!(ab.len(), 32);
        }
    }

    #[test]
    fn test_encapsulation() {
        let ctx = ctx();
        let (pk, sk) = keys(&ctx, "X25519");
        let (shared, encapsulated) = ctx.kx_encapsulate(pk).unwrap();
        let shared = read(&ctx, shared);
        let encapsulated = read(&ctx, encapsulated);
        let decapsulated = read(&ctx, ctx.kx_decapsulate(sk, &encapsulated).unwrap());
        assert_eq!(shared, decapsulated);

        let (p256_pk, _) = keys(&ctx, "P256");
        assert_eq!(ctx.kx_encapsulate(p256_pk), Err(CryptoError::NotImplemented));
    }

    #[test]
    fn test_mismatched_keys() {
        let ctx = ctx();
        let (x_pk, _) = keys(&ctx, "X25519");
        let (_, p_sk) = keys(&ctx, "P256");
        assert_eq!(ctx.kx_dh(x_pk, p_sk), Err(CryptoError::IncompatibleKeys));

        let ed = ctx.keypair_generate(AlgorithmType::Signatures, "Ed25519", None).unwrap();
        let ed_pk = ctx.keypair_publickey(ed).unwrap();
        let ed_sk = ctx.keypair_secretkey(ed).unwrap();
        assert_eq!(ctx.kx_dh(ed_pk, ed_sk), Err(CryptoError::KeyNotSupported));
        assert_eq!(ctx.kx_encapsulate(ed_pk), Err(CryptoError::KeyNotSupported));
    }

    #[test]
    fn test_encapsulate_needs_both_handles() {
        let config = Config {
            max_handles: 4,
            ..Config::default()
        };
        let ctx = CryptoCtx::with_config(config, Arc::new(ManualClock::new(0)));
        let (pk, _) = keys(&ctx, "X25519");
        assert_eq!(ctx.kx_encapsulate(pk), Err(CryptoError::TooManyHandles));
        // Единственный свободный индекс сожжён, но не стал живым output
        let burned = ((HandleType::ArrayOutput as u32) << 24) | 4;
        assert_eq!(ctx.array_output_len(burned), Err(CryptoError::Closed));
        assert_eq!(ctx.handles.array_output.len(), 0);
    }

    #[test]
    fn test_low_order_point() {
        let ctx = ctx();
        let zero = ctx
            .publickey_import(
                AlgorithmType::KeyExchange,
                "X25519",
                &[0u8; 32],
                crate::crypto::encoding::PublicKeyEncoding::Raw,
            )
            .unwrap();
        let (_, sk) = keys(&ctx, "X25519");
        assert_eq!(ctx.kx_dh(zero, sk), Err(CryptoError::InvalidKey));
    }
}
