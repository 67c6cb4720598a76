use crate::crypto::encoding::SignatureEncoding;
use crate::crypto::keys::RawKeypair;
use crate::crypto::provider::{KeyCodec, SignatureScheme, SignerState, VerifierState};
use crate::error::{CryptoError, Result};
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

const SECRET_LEN: usize = 32;
const PUBLIC_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

/// Pure Ed25519 (RFC 8032).
pub struct Ed25519;

fn signing_key(secret: &[u8]) -> Result<SigningKey> {
    let bytes: &[u8; SECRET_LEN] = secret.try_into().map_err(|_| CryptoError::InvalidKey)?;
    Ok(SigningKey::from_bytes(bytes))
}

fn verifying_key(public: &[u8]) -> Result<VerifyingKey> {
    let bytes: &[u8; PUBLIC_LEN] = public.try_into().map_err(|_| CryptoError::InvalidKey)?;
    VerifyingKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidKey)
}

fn keypair_of(signing_key: &SigningKey) -> RawKeypair {
    RawKeypair {
        secret: Zeroizing::new(signing_key.to_bytes().to_vec()),
        public: signing_key.verifying_key().to_bytes().to_vec(),
    }
}

impl KeyCodec for Ed25519 {
    fn name(&self) -> &'static str {
        "Ed25519"
    }

    fn secret_len(&self) -> usize {
        SECRET_LEN
    }

    fn generate_keypair(&self) -> Result<RawKeypair> {
        Ok(keypair_of(&SigningKey::generate(&mut OsRng)))
    }

    fn keypair_from_secret(&self, secret: &[u8]) -> Result<RawKeypair> {
        Ok(keypair_of(&signing_key(secret)?))
    }

    fn validate_public(&self, public: &[u8]) -> Result<()> {
        verifying_key(public).map(|_| ())
    }

    fn secret_to_pkcs8(&self, secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let doc = signing_key(secret)?
            .to_pkcs8_der()
            .map_err(|_| CryptoError::AlgorithmFailure)?;
        Ok(Zeroizing::new(doc.as_bytes().to_vec()))
    }

    fn secret_from_pkcs8(&self, der: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let key = SigningKey::from_pkcs8_der(der).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Zeroizing::new(key.to_bytes().to_vec()))
    }

    fn secret_to_pem(&self, secret: &[u8]) -> Result<Zeroizing<String>> {
        signing_key(secret)?
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|_| CryptoError::AlgorithmFailure)
    }

    fn secret_from_pem(&self, pem: &str) -> Result<Zeroizing<Vec<u8>>> {
        let key = SigningKey::from_pkcs8_pem(pem).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Zeroizing::new(key.to_bytes().to_vec()))
    }

    fn public_to_spki(&self, public: &[u8]) -> Result<Vec<u8>> {
        let doc = verifying_key(public)?
            .to_public_key_der()
            .map_err(|_| CryptoError::AlgorithmFailure)?;
        Ok(doc.as_bytes().to_vec())
    }

    fn public_from_spki(&self, der: &[u8]) -> Result<Vec<u8>> {
        let key = VerifyingKey::from_public_key_der(der).map_err(|_| CryptoError::InvalidKey)?;
        Ok(key.to_bytes().to_vec())
    }

    fn public_to_pem(&self, public: &[u8]) -> Result<String> {
        verifying_key(public)?
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| CryptoError::AlgorithmFailure)
    }

    fn public_from_pem(&self, pem: &str) -> Result<Vec<u8>> {
        let key = VerifyingKey::from_public_key_pem(pem).map_err(|_| CryptoError::InvalidKey)?;
        Ok(key.to_bytes().to_vec())
    }
}

/// Ed25519 подписывает сообщение целиком, поэтому данные буферизуются
struct Ed25519Signer {
    key: SigningKey,
    message: Vec<u8>,
}

impl SignerState for Ed25519Signer {
    fn update(&mut self, data: &[u8]) -> Result<()> {
        self.message.extend_from_slice(data);
        Ok(())
    }

    fn sign(&mut self) -> Result<Vec<u8>> {
        Ok(self.key.sign(&self.message).to_bytes().to_vec())
    }
}

struct Ed25519Verifier {
    key: VerifyingKey,
    message: Vec<u8>,
}

impl VerifierState for Ed25519Verifier {
    fn update(&mut self, data: &[u8]) -> Result<()> {
        self.message.extend_from_slice(data);
        Ok(())
    }

    fn verify(&mut self, signature: &[u8]) -> Result<()> {
        let signature = Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        self.key
            .verify(&self.message, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl SignatureScheme for Ed25519 {
    fn as_codec(&self) -> &dyn KeyCodec {
        self
    }

    fn signer(&self, keypair: &RawKeypair) -> Result<Box<dyn SignerState>> {
        Ok(Box::new(Ed25519Signer {
            key: signing_key(&keypair.secret)?,
            message: Vec::new(),
        }))
    }

    fn verifier(&self, public: &[u8]) -> Result<Box<dyn VerifierState>> {
        Ok(Box::new(Ed25519Verifier {
            key: verifying_key(public)?,
            message: Vec::new(),
        }))
    }

    fn encode_signature(&self, raw: &[u8], encoding: SignatureEncoding) -> Result<Vec<u8>> {
        match encoding {
            SignatureEncoding::Raw => Ok(raw.to_vec()),
            SignatureEncoding::Der => Err(CryptoError::UnsupportedEncoding),
        }
    }

    fn decode_signature(&self, encoded: &[u8], encoding: SignatureEncoding) -> Result<Vec<u8>> {
        match encoding {
            SignatureEncoding::Raw if encoded.len() == SIGNATURE_LEN => Ok(encoded.to_vec()),
            SignatureEncoding::Raw => Err(CryptoError::InvalidSignature),
            SignatureEncoding::Der => Err(CryptoError::UnsupportedEncoding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encoding::{export_keypair, import_keypair, KeypairEncoding};

    fn sign(kp: &RawKeypair, parts: &[&[u8]]) -> Vec<u8> {
        let mut signer = Ed25519.signer(kp).unwrap();
        for p in parts {
            signer.update(p).unwrap();
        }
        signer.sign().unwrap()
    }

    #[test]
    fn test_rfc8032_vector_1() {
        // RFC 8032, 7.1 TEST 1 (empty message)
        let secret =
            hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60").unwrap();
        let kp = Ed25519.keypair_from_secret(&secret).unwrap();
        assert_eq!(
            hex::encode(&kp.public),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
        let sig = sign(&kp, &[]);
        assert_eq!(
            hex::encode(sig),
            "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155\
             5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
        );
    }

    #[test]
    fn test_streaming_equals_one_shot() {
        let kp = Ed25519.generate_keypair().unwrap();
        let a = sign(&kp, &[b"hello ", b"world"]);
        let b = sign(&kp, &[b"hello world"]);
        assert_eq!(a, b);

        let mut verifier = Ed25519.verifier(&kp.public).unwrap();
        verifier.update(b"hello").unwrap();
        verifier.update(b" world").unwrap();
        verifier.verify(&a).unwrap();
    }

    #[test]
    fn test_wrong_message_rejected() {
        let kp = Ed25519.generate_keypair().unwrap();
        let sig = sign(&kp, &[b"message"]);
        let mut verifier = Ed25519.verifier(&kp.public).unwrap();
        verifier.update(b"massage").unwrap();
        assert_eq!(verifier.verify(&sig), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn test_pkcs8_and_pem() {
        let kp = Ed25519.generate_keypair().unwrap();
        for enc in [KeypairEncoding::Pkcs8, KeypairEncoding::Pem] {
            let encoded = export_keypair(&Ed25519, &kp, enc).unwrap();
            let back = import_keypair(&Ed25519, &encoded, enc).unwrap();
            assert_eq!(back.public, kp.public);
        }
        let pem = Ed25519.public_to_pem(&kp.public).unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert_eq!(Ed25519.public_from_pem(&pem).unwrap(), kp.public);
    }
}
