// Подпись и проверка подписи
//
// SignatureState: update* → sign (один раз)
// VerificationState: update* → verify (терминально при любом исходе)

use crate::crypto::encoding::SignatureEncoding;
use crate::crypto::keys::{Keypair, PublicKey};
use crate::crypto::provider::{SignatureScheme, SignerState, VerifierState};
use crate::error::{CryptoError, Result};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Подпись в сыром формате алгоритма
#[derive(Clone)]
pub struct Signature {
    scheme: Arc<dyn SignatureScheme>,
    raw: Arc<Vec<u8>>,
}

impl Signature {
    pub fn new(scheme: Arc<dyn SignatureScheme>, raw: Vec<u8>) -> Self {
        Self {
            scheme,
            raw: Arc::new(raw),
        }
    }

    /// Parses an encoded signature for `scheme`.
    pub fn import(
        scheme: Arc<dyn SignatureScheme>,
        encoded: &[u8],
        encoding: SignatureEncoding,
    ) -> Result<Self> {
        let raw = scheme.decode_signature(encoded, encoding)?;
        Ok(Self::new(scheme, raw))
    }

    pub fn export(&self, encoding: SignatureEncoding) -> Result<Vec<u8>> {
        self.scheme.encode_signature(&self.raw, encoding)
    }

    pub fn algorithm(&self) -> &'static str {
        self.scheme.name()
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

struct SignerInner {
    signer: Box<dyn SignerState>,
    signed: bool,
}

/// Streaming signer; the keypair stays alive for as long as the state does.
#[derive(Clone)]
pub struct SignatureState {
    keypair: Keypair,
    scheme: Arc<dyn SignatureScheme>,
    inner: Arc<Mutex<SignerInner>>,
}

impl SignatureState {
    pub fn open(keypair: Keypair) -> Result<Self> {
        let scheme = keypair.backend().signature()?.clone();
        let signer = scheme.signer(keypair.raw()?)?;
        debug!(target: "hostcrypto::signatures", algorithm = scheme.name(), "signature state opened");
        Ok(Self {
            keypair,
            scheme,
            inner: Arc::new(Mutex::new(SignerInner {
                signer,
                signed: false,
            })),
        })
    }

    pub fn update(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if inner.signed {
            return Err(CryptoError::InvalidOperation);
        }
        inner.signer.update(data)
    }

    pub fn sign(&self) -> Result<Signature> {
        let mut inner = self.inner.lock()?;
        if inner.signed {
            return Err(CryptoError::InvalidOperation);
        }
        // Ключ мог быть отозван после открытия сессии
        self.keypair.ensure_usable()?;
        let raw = inner.signer.sign()?;
        inner.signed = true;
        debug!(target: "hostcrypto::signatures", algorithm = self.scheme.name(), "message signed");
        Ok(Signature::new(self.scheme.clone(), raw))
    }
}

struct VerifierInner {
    verifier: Box<dyn VerifierState>,
    finished: bool,
}

/// Streaming verifier bound to one public key.
#[derive(Clone)]
pub struct VerificationState {
    public: PublicKey,
    inner: Arc<Mutex<VerifierInner>>,
}

impl VerificationState {
    pub fn open(public: PublicKey) -> Result<Self> {
        let scheme = public.backend().signature()?;
        let verifier = scheme.verifier(public.raw())?;
        debug!(target: "hostcrypto::signatures", algorithm = scheme.name(), "verification state opened");
        Ok(Self {
            public,
            inner: Arc::new(Mutex::new(VerifierInner {
                verifier,
                finished: false,
            })),
        })
    }

    pub fn update(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if inner.finished {
            return Err(CryptoError::InvalidOperation);
        }
        inner.verifier.update(data)
    }

    pub fn verify(&self, signature: &Signature) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if inner.finished {
            return Err(CryptoError::InvalidOperation);
        }
        inner.finished = true;
        if signature.algorithm() != self.public.algorithm() {
            return Err(CryptoError::InvalidSignature);
        }
        let result = inner.verifier.verify(signature.raw());
        debug!(
            target: "hostcrypto::signatures",
            algorithm = self.public.algorithm(),
            valid = result.is_ok(),
            "signature verified"
        );
        result
    }
}
