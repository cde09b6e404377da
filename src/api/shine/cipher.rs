use base64::prelude::{BASE64_STANDARD, Engine as _};
use rsa::{Pkcs1v15Encrypt, RsaPublicKey, pkcs8::DecodePublicKey};

use super::error::AuthenticationError;

/// Encrypt the account password with the extracted RSA public key.
///
/// The login endpoint only accepts PKCS#1 v1.5 padding. Pure computation,
/// deterministic modulo the padding randomness.
pub fn encrypt_password(
    plaintext: &str,
    public_key_pem: &str,
) -> Result<String, AuthenticationError> {
    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(AuthenticationError::InvalidPublicKey)?;
    let encrypted = public_key
        .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(AuthenticationError::EncryptionFailed)?;
    Ok(BASE64_STANDARD.encode(encrypted))
}

#[cfg(test)]
mod tests {
    use rsa::{
        RsaPrivateKey,
        pkcs8::{EncodePublicKey, LineEnding},
    };

    use super::*;
    use crate::prelude::Result;

    #[test]
    fn round_trips_through_the_private_key() -> Result {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)?;
        let public_key_pem = private_key.to_public_key().to_public_key_pem(LineEnding::LF)?;

        let encrypted = encrypt_password("hunter2", &public_key_pem)?;
        let decrypted =
            private_key.decrypt(Pkcs1v15Encrypt, &BASE64_STANDARD.decode(encrypted)?)?;

        assert_eq!(decrypted, b"hunter2");
        Ok(())
    }

    #[test]
    fn rejects_garbage_keys() {
        assert!(matches!(
            encrypt_password("hunter2", "-----BEGIN PUBLIC KEY-----\nbm9wZQ==\n-----END PUBLIC KEY-----\n"),
            Err(AuthenticationError::InvalidPublicKey(_)),
        ));
    }
}
