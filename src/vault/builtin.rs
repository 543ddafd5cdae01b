use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

/// Envelope-encrypted secret as persisted in the credential row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    pub encrypted_dek: Vec<u8>,
    pub dek_nonce: Vec<u8>,
    pub encrypted_secret: Vec<u8>,
    pub secret_nonce: Vec<u8>,
}

/// AES-256-GCM envelope encryption keyed by the service master key.
///
/// Each secret gets its own random data key (DEK); only the DEK is encrypted
/// with the master key (KEK).
pub struct VaultCrypto {
    kek: Zeroizing<[u8; 32]>,
}

impl VaultCrypto {
    pub fn new(master_key_hex: &str) -> anyhow::Result<Self> {
        let kek = parse_master_key(master_key_hex)?;
        Ok(Self {
            kek: Zeroizing::new(kek),
        })
    }

    pub fn encrypt_string(&self, plaintext: &str) -> anyhow::Result<EncryptedSecret> {
        let mut dek = [0u8; 32];
        OsRng.fill_bytes(&mut dek);

        let secret_cipher = Aes256Gcm::new_from_slice(&dek)
            .map_err(|e| anyhow::anyhow!("invalid key length: {:?}", e))?;
        let secret_nonce_bytes = generate_nonce();
        let encrypted_secret = secret_cipher
            .encrypt(Nonce::from_slice(&secret_nonce_bytes), plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("secret encryption failed: {}", e))?;

        let kek_cipher = Aes256Gcm::new_from_slice(&self.kek[..])
            .map_err(|e| anyhow::anyhow!("invalid key length: {:?}", e))?;
        let dek_nonce_bytes = generate_nonce();
        let encrypted_dek = kek_cipher
            .encrypt(Nonce::from_slice(&dek_nonce_bytes), dek.as_slice())
            .map_err(|e| anyhow::anyhow!("DEK encryption failed: {}", e))?;

        dek.zeroize();

        Ok(EncryptedSecret {
            encrypted_dek,
            dek_nonce: dek_nonce_bytes.to_vec(),
            encrypted_secret,
            secret_nonce: secret_nonce_bytes.to_vec(),
        })
    }

    pub fn decrypt_string(&self, blob: &EncryptedSecret) -> anyhow::Result<String> {
        if blob.dek_nonce.len() != 12 || blob.secret_nonce.len() != 12 {
            anyhow::bail!("malformed nonce in stored secret");
        }

        let kek_cipher = Aes256Gcm::new_from_slice(&self.kek[..])
            .map_err(|e| anyhow::anyhow!("invalid key length: {:?}", e))?;
        let dek_bytes = Zeroizing::new(
            kek_cipher
                .decrypt(Nonce::from_slice(&blob.dek_nonce), blob.encrypted_dek.as_slice())
                .map_err(|e| anyhow::anyhow!("DEK decryption failed: {}", e))?,
        );

        let secret_cipher = Aes256Gcm::new_from_slice(dek_bytes.as_slice())
            .map_err(|e| anyhow::anyhow!("invalid key length: {:?}", e))?;
        let plaintext_bytes = secret_cipher
            .decrypt(
                Nonce::from_slice(&blob.secret_nonce),
                blob.encrypted_secret.as_slice(),
            )
            .map_err(|e| anyhow::anyhow!("secret decryption failed: {}", e))?;

        Ok(String::from_utf8(plaintext_bytes)?)
    }
}

fn generate_nonce() -> [u8; 12] {
    let mut nonce = [0u8; 12];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

pub fn parse_master_key(hex: &str) -> anyhow::Result<[u8; 32]> {
    if hex.len() != 64 {
        anyhow::bail!(
            "SETTINGS_MASTER_KEY must be 64 hex chars (32 bytes), got {} chars",
            hex.len()
        );
    }
    let bytes = hex::decode(hex)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_encryption_roundtrip() {
        let crypto = VaultCrypto::new(MASTER_KEY).unwrap();

        let blob = crypto.encrypt_string("masterkey").unwrap();
        assert_ne!(blob.encrypted_secret, b"masterkey".to_vec());

        assert_eq!(crypto.decrypt_string(&blob).unwrap(), "masterkey");
    }

    #[test]
    fn test_wrong_master_key_fails() {
        let blob = VaultCrypto::new(MASTER_KEY)
            .unwrap()
            .encrypt_string("pw")
            .unwrap();
        let other = VaultCrypto::new(&"ff".repeat(32)).unwrap();
        assert!(other.decrypt_string(&blob).is_err());
    }

    #[test]
    fn test_master_key_must_be_64_hex_chars() {
        assert!(VaultCrypto::new("abcd").is_err());
        assert!(VaultCrypto::new(&"zz".repeat(32)).is_err());
    }
}
