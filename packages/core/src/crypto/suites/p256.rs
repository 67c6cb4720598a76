//! NIST P-256: ECDSA with SHA-256 and ECDH.
//!
//! Both schemes share one key codec. Raw secret keys are 32-byte big-endian
//! scalars; raw public keys are uncompressed SEC1 points (`0x04 || x || y`).

use crate::crypto::encoding::SignatureEncoding;
use crate::crypto::keys::RawKeypair;
use crate::crypto::provider::{
    KeyCodec, KeyExchangeScheme, SignatureScheme, SignerState, VerifierState,
};
use crate::error::{CryptoError, Result};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const SECRET_LEN: usize = 32;
const UNCOMPRESSED_LEN: usize = 65;

fn secret_key(secret: &[u8]) -> Result<SecretKey> {
    if secret.len() != SECRET_LEN {
        return Err(CryptoError::InvalidKey);
    }
    SecretKey::from_slice(secret).map_err(|_| CryptoError::InvalidKey)
}

fn public_key(public: &[u8]) -> Result<PublicKey> {
    if public.len() != UNCOMPRESSED_LEN {
        return Err(CryptoError::InvalidKey);
    }
    PublicKey::from_sec1_bytes(public).map_err(|_| CryptoError::InvalidKey)
}

fn uncompressed(public: &PublicKey) -> Vec<u8> {
    public.to_encoded_point(false).as_bytes().to_vec()
}

fn keypair_of(secret: &SecretKey) -> RawKeypair {
    RawKeypair {
        secret: Zeroizing::new(secret.to_bytes().to_vec()),
        public: uncompressed(&secret.public_key()),
    }
}

/// Shared P-256 key codec.
struct P256Keys;

impl P256Keys {
    fn generate(&self) -> RawKeypair {
        keypair_of(&SecretKey::random(&mut OsRng))
    }

    fn from_secret(&self, secret: &[u8]) -> Result<RawKeypair> {
        Ok(keypair_of(&secret_key(secret)?))
    }

    fn to_pkcs8(&self, secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let doc = secret_key(secret)?
            .to_pkcs8_der()
            .map_err(|_| CryptoError::AlgorithmFailure)?;
        Ok(Zeroizing::new(doc.as_bytes().to_vec()))
    }

    fn from_pkcs8(&self, der: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let key = SecretKey::from_pkcs8_der(der).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Zeroizing::new(key.to_bytes().to_vec()))
    }

    fn to_pem(&self, secret: &[u8]) -> Result<Zeroizing<String>> {
        secret_key(secret)?
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|_| CryptoError::AlgorithmFailure)
    }

    fn from_pem(&self, pem: &str) -> Result<Zeroizing<Vec<u8>>> {
        let key = SecretKey::from_pkcs8_pem(pem).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Zeroizing::new(key.to_bytes().to_vec()))
    }

    fn to_spki(&self, public: &[u8]) -> Result<Vec<u8>> {
        let doc = public_key(public)?
            .to_public_key_der()
            .map_err(|_| CryptoError::AlgorithmFailure)?;
        Ok(doc.as_bytes().to_vec())
    }

    fn from_spki(&self, der: &[u8]) -> Result<Vec<u8>> {
        let key = PublicKey::from_public_key_der(der).map_err(|_| CryptoError::InvalidKey)?;
        Ok(uncompressed(&key))
    }

    fn to_public_pem(&self, public: &[u8]) -> Result<String> {
        public_key(public)?
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| CryptoError::AlgorithmFailure)
    }

    fn from_public_pem(&self, pem: &str) -> Result<Vec<u8>> {
        let key = PublicKey::from_public_key_pem(pem).map_err(|_| CryptoError::InvalidKey)?;
        Ok(uncompressed(&key))
    }

    fn to_sec(&self, public: &[u8], compressed: bool) -> Result<Vec<u8>> {
        Ok(public_key(public)?
            .to_encoded_point(compressed)
            .as_bytes()
            .to_vec())
    }

    fn from_sec(&self, sec: &[u8]) -> Result<Vec<u8>> {
        let key = PublicKey::from_sec1_bytes(sec).map_err(|_| CryptoError::InvalidKey)?;
        Ok(uncompressed(&key))
    }
}

macro_rules! p256_codec {
    ($scheme:ty, $name:literal) => {
        impl KeyCodec for $scheme {
            fn name(&self) -> &'static str {
                $name
            }

            fn secret_len(&self) -> usize {
                SECRET_LEN
            }

            fn generate_keypair(&self) -> Result<RawKeypair> {
                Ok(P256Keys.generate())
            }

            fn keypair_from_secret(&self, secret: &[u8]) -> Result<RawKeypair> {
                P256Keys.from_secret(secret)
            }

            fn validate_public(&self, public: &[u8]) -> Result<()> {
                public_key(public).map(|_| ())
            }

            fn secret_to_pkcs8(&self, secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
                P256Keys.to_pkcs8(secret)
            }

            fn secret_from_pkcs8(&self, der: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
                P256Keys.from_pkcs8(der)
            }

            fn secret_to_pem(&self, secret: &[u8]) -> Result<Zeroizing<String>> {
                P256Keys.to_pem(secret)
            }

            fn secret_from_pem(&self, pem: &str) -> Result<Zeroizing<Vec<u8>>> {
                P256Keys.from_pem(pem)
            }

            fn public_to_spki(&self, public: &[u8]) -> Result<Vec<u8>> {
                P256Keys.to_spki(public)
            }

            fn public_from_spki(&self, der: &[u8]) -> Result<Vec<u8>> {
                P256Keys.from_spki(der)
            }

            fn public_to_pem(&self, public: &[u8]) -> Result<String> {
                P256Keys.to_public_pem(public)
            }

            fn public_from_pem(&self, pem: &str) -> Result<Vec<u8>> {
                P256Keys.from_public_pem(pem)
            }

            fn public_to_sec(&self, public: &[u8], compressed: bool) -> Result<Vec<u8>> {
                P256Keys.to_sec(public, compressed)
            }

            fn public_from_sec(&self, sec: &[u8]) -> Result<Vec<u8>> {
                P256Keys.from_sec(sec)
            }
        }
    };
}

/// ECDSA over P-256 with SHA-256; the message is streamed into the hash.
pub struct EcdsaP256Sha256;

/// ECDH over P-256.
pub struct P256Ecdh;

p256_codec!(EcdsaP256Sha256, "ECDSA_P256_SHA256");
p256_codec!(P256Ecdh, "P256");

struct EcdsaSigner {
    key: SigningKey,
    digest: Sha256,
}

impl SignerState for EcdsaSigner {
    fn update(&mut self, data: &[u8]) -> Result<()> {
        self.digest.update(data);
        Ok(())
    }

    fn sign(&mut self) -> Result<Vec<u8>> {
        let prehash = self.digest.clone().finalize();
        let signature: Signature = PrehashSigner::<Signature>::sign_prehash(&self.key, &prehash)
            .map_err(|_| CryptoError::AlgorithmFailure)?;
        Ok(signature.to_bytes().to_vec())
    }
}

struct EcdsaVerifier {
    key: VerifyingKey,
    digest: Sha256,
}

impl VerifierState for EcdsaVerifier {
    fn update(&mut self, data: &[u8]) -> Result<()> {
        self.digest.update(data);
        Ok(())
    }

    fn verify(&mut self, signature: &[u8]) -> Result<()> {
        let signature = Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        let prehash = self.digest.clone().finalize();
        self.key
            .verify_prehash(&prehash, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl SignatureScheme for EcdsaP256Sha256 {
    fn as_codec(&self) -> &dyn KeyCodec {
        self
    }

    fn signer(&self, keypair: &RawKeypair) -> Result<Box<dyn SignerState>> {
        let key = SigningKey::from(&secret_key(&keypair.secret)?);
        Ok(Box::new(EcdsaSigner {
            key,
            digest: Sha256::new(),
        }))
    }

    fn verifier(&self, public: &[u8]) -> Result<Box<dyn VerifierState>> {
        let key = VerifyingKey::from(&public_key(public)?);
        Ok(Box::new(EcdsaVerifier {
            key,
            digest: Sha256::new(),
        }))
    }

    fn encode_signature(&self, raw: &[u8], encoding: SignatureEncoding) -> Result<Vec<u8>> {
        let signature = Signature::from_slice(raw).map_err(|_| CryptoError::InvalidSignature)?;
        match encoding {
            SignatureEncoding::Raw => Ok(signature.to_bytes().to_vec()),
            SignatureEncoding::Der => Ok(signature.to_der().as_bytes().to_vec()),
        }
    }

    fn decode_signature(&self, encoded: &[u8], encoding: SignatureEncoding) -> Result<Vec<u8>> {
        let signature = match encoding {
            SignatureEncoding::Raw => Signature::from_slice(encoded),
            SignatureEncoding::Der => Signature::from_der(encoded),
        }
        .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl KeyExchangeScheme for P256Ecdh {
    fn as_codec(&self) -> &dyn KeyCodec {
        self
    }

    fn dh(&self, public: &[u8], secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let secret = secret_key(secret)?;
        let public = public_key(public)?;
        let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
        Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encoding::{export_public, import_public, PublicKeyEncoding};

    #[test]
    fn test_sign_verify_streaming() {
        let kp = EcdsaP256Sha256.generate_keypair().unwrap();
        assert_eq!(kp.public.len(), UNCOMPRESSED_LEN);
        assert_eq!(kp.public[0], 0x04);

        let mut signer = EcdsaP256Sha256.signer(&kp).unwrap();
        signer.update(b"stream").unwrap();
        signer.update(b"ed").unwrap();
        let sig = signer.sign().unwrap();
        assert_eq!(sig.len(), 64);

        let mut verifier = EcdsaP256Sha256.verifier(&kp.public).unwrap();
        verifier.update(b"streamed").unwrap();
        verifier.verify(&sig).unwrap();

        let mut verifier = EcdsaP256Sha256.verifier(&kp.public).unwrap();
        verifier.update(b"streamex").unwrap();
        assert_eq!(verifier.verify(&sig), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn test_der_signature_round_trip() {
        let kp = EcdsaP256Sha256.generate_keypair().unwrap();
        let mut signer = EcdsaP256Sha256.signer(&kp).unwrap();
        signer.update(b"der").unwrap();
        let raw = signer.sign().unwrap();
        let der = EcdsaP256Sha256
            .encode_signature(&raw, SignatureEncoding::Der)
            .unwrap();
        assert_eq!(der[0], 0x30);
        let back = EcdsaP256Sha256
            .decode_signature(&der, SignatureEncoding::Der)
            .unwrap();
        assert_eq!(back, raw);
        assert_eq!(
            EcdsaP256Sha256.decode_signature(&der[..der.len() - 1], SignatureEncoding::Der),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_public_key_encodings() {
        let kp = P256Ecdh.generate_keypair().unwrap();
        for enc in [
            PublicKeyEncoding::Raw,
            PublicKeyEncoding::Pkcs8,
            PublicKeyEncoding::Pem,
            PublicKeyEncoding::Sec,
            PublicKeyEncoding::CompressedSec,
            PublicKeyEncoding::Local,
        ] {
            let encoded = export_public(&P256Ecdh, &kp.public, enc).unwrap();
            assert_eq!(import_public(&P256Ecdh, &encoded, enc).unwrap(), kp.public, "{enc:?}");
        }
        let compressed = export_public(&P256Ecdh, &kp.public, PublicKeyEncoding::CompressedSec).unwrap();
        assert_eq!(compressed.len(), 33);
    }

    #[test]
    fn test_ecdh_agreement() {
        let a = P256Ecdh.generate_keypair().unwrap();
        let b = P256Ecdh.generate_keypair().unwrap();
        let ab = P256Ecdh.dh(&b.public, &a.secret).unwrap();
        let ba = P256Ecdh.dh(&a.public, &b.secret).unwrap();
        assert_eq!(*ab, *ba);
        assert_eq!(ab.len(), 32);
        assert_eq!(
            P256Ecdh.encapsulate(&a.public).err(),
            Some(CryptoError::NotImplemented)
        );
    }

    #[test]
    fn test_zero_scalar_rejected() {
        assert_eq!(
            P256Ecdh.keypair_from_secret(&[0u8; 32]).err(),
            Some(CryptoError::InvalidKey)
        );
    }
}
