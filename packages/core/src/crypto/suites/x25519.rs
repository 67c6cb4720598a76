use crate::crypto::keys::RawKeypair;
use crate::crypto::provider::{KeyCodec, KeyExchangeScheme};
use crate::error::{CryptoError, Result};
use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};
use zeroize::Zeroizing;

const KEY_LEN: usize = 32;

/// X25519 Diffie-Hellman (RFC 7748).
///
/// Encapsulation is ephemeral-static DH: the encapsulated key is the
/// ephemeral public key, the shared secret is the DH output.
pub struct X25519;

fn static_secret(secret: &[u8]) -> Result<StaticSecret> {
    let bytes: [u8; KEY_LEN] = secret.try_into().map_err(|_| CryptoError::InvalidKey)?;
    Ok(StaticSecret::from(bytes))
}

fn public_key(public: &[u8]) -> Result<PublicKey> {
    let bytes: [u8; KEY_LEN] = public.try_into().map_err(|_| CryptoError::InvalidKey)?;
    Ok(PublicKey::from(bytes))
}

/// Rejects low-order peer points, which force an all-zero output.
fn contributory(shared: SharedSecret) -> Result<Zeroizing<Vec<u8>>> {
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey);
    }
    Ok(Zeroizing::new(shared.as_bytes().to_vec()))
}

impl KeyCodec for X25519 {
    fn name(&self) -> &'static str {
        "X25519"
    }

    fn secret_len(&self) -> usize {
        KEY_LEN
    }

    fn generate_keypair(&self) -> Result<RawKeypair> {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Ok(RawKeypair {
            secret: Zeroizing::new(secret.to_bytes().to_vec()),
            public: public.to_bytes().to_vec(),
        })
    }

    fn keypair_from_secret(&self, secret: &[u8]) -> Result<RawKeypair> {
        let static_secret = static_secret(secret)?;
        let public = PublicKey::from(&static_secret);
        Ok(RawKeypair {
            secret: Zeroizing::new(static_secret.to_bytes().to_vec()),
            public: public.to_bytes().to_vec(),
        })
    }

    fn validate_public(&self, public: &[u8]) -> Result<()> {
        public_key(public).map(|_| ())
    }
}

impl KeyExchangeScheme for X25519 {
    fn as_codec(&self) -> &dyn KeyCodec {
        self
    }

    fn dh(&self, public: &[u8], secret: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let secret = static_secret(secret)?;
        contributory(secret.diffie_hellman(&public_key(public)?))
    }

    fn encapsulate(&self, public: &[u8]) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        let recipient = public_key(public)?;
        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let encapsulated = PublicKey::from(&ephemeral).to_bytes().to_vec();
        let shared = contributory(ephemeral.diffie_hellman(&recipient))?;
        Ok((shared, encapsulated))
    }

    fn decapsulate(&self, secret: &[u8], encapsulated: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let secret = static_secret(secret)?;
        let ephemeral = public_key(encapsulated)?;
        contributory(secret.diffie_hellman(&ephemeral))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7748_vector() {
        // RFC 7748, 6.1
        let alice_sk =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a").unwrap();
        let bob_sk =
            hex::decode("5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb").unwrap();
        let alice = X25519.keypair_from_secret(&alice_sk).unwrap();
        let bob = X25519.keypair_from_secret(&bob_sk).unwrap();
        assert_eq!(
            hex::encode(&alice.public),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
        let shared = X25519.dh(&bob.public, &alice.secret).unwrap();
        assert_eq!(
            hex::encode(&*shared),
            "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742"
        );
    }

    #[test]
    fn test_encapsulation() {
        let kp = X25519.generate_keypair().unwrap();
        let (secret, encapsulated) = X25519.encapsulate(&kp.public).unwrap();
        let recovered = X25519.decapsulate(&kp.secret, &encapsulated).unwrap();
        assert_eq!(*secret, *recovered);
    }

    #[test]
    fn test_low_order_point_rejected() {
        let kp = X25519.generate_keypair().unwrap();
        assert_eq!(
            X25519.dh(&[0u8; 32], &kp.secret).err(),
            Some(CryptoError::InvalidKey)
        );
        assert_eq!(
            X25519.dh(&[1u8; 31], &kp.secret).err(),
            Some(CryptoError::InvalidKey)
        );
    }
}
