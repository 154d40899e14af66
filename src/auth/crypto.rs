//! Machine-derived encryption-at-rest for the stored token pair.

use aes_gcm_siv::aead::{Aead, KeyInit};
use aes_gcm_siv::{Aes256GcmSiv, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use rand::RngCore;
use scrypt::{scrypt, Params as ScryptParams};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::types::TokenPair;
use crate::error::StoreError;

pub(crate) const TOKEN_FILE_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const MACHINE_KEY_CONTEXT: &str = "enwis-id-token-kek-v1";

/// scrypt cost used when deriving the machine key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfCost {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            log_n: ScryptParams::RECOMMENDED_LOG_N,
            r: ScryptParams::RECOMMENDED_R,
            p: ScryptParams::RECOMMENDED_P,
        }
    }
}

/// On-disk layout of an encrypted token file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct EncryptedTokenFile {
    #[serde(default)]
    pub(crate) version: u32,
    #[serde(default)]
    pub(crate) encryption: EncryptionEnvelope,
    #[serde(default)]
    pub(crate) tokens: SealedRecord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct EncryptionEnvelope {
    #[serde(default)]
    pub(crate) salt: String,
    #[serde(default)]
    pub(crate) log_n: u8,
    #[serde(default)]
    pub(crate) r: u32,
    #[serde(default)]
    pub(crate) p: u32,
    #[serde(default)]
    pub(crate) wrapped_dek_nonce: String,
    #[serde(default)]
    pub(crate) wrapped_dek_ciphertext: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct SealedRecord {
    #[serde(default)]
    pub(crate) nonce: String,
    #[serde(default)]
    pub(crate) ciphertext: String,
}

pub(crate) fn looks_encrypted(value: &serde_json::Value) -> bool {
    value
        .get("encryption")
        .and_then(|inner| inner.as_object())
        .is_some()
}

/// Seal a token pair under a fresh data key wrapped by the machine key.
pub(crate) fn seal_pair(pair: &TokenPair, cost: KdfCost) -> Result<EncryptedTokenFile, StoreError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let kek = derive_machine_kek(&salt, cost)?;

    let mut dek = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut dek);
    let (wrapped_nonce, wrapped_dek) = encrypt_blob(&kek, &dek)?;

    let payload = serde_json::to_vec(pair)
        .map_err(|err| StoreError::Invalid(format!("failed to serialize token pair: {err}")))?;
    let (nonce, ciphertext) = encrypt_blob(&dek, &payload)?;

    Ok(EncryptedTokenFile {
        version: TOKEN_FILE_VERSION,
        encryption: EncryptionEnvelope {
            salt: B64.encode(salt),
            log_n: cost.log_n,
            r: cost.r,
            p: cost.p,
            wrapped_dek_nonce: B64.encode(wrapped_nonce),
            wrapped_dek_ciphertext: B64.encode(wrapped_dek),
        },
        tokens: SealedRecord {
            nonce: B64.encode(nonce),
            ciphertext: B64.encode(ciphertext),
        },
    })
}

/// Open a sealed token file produced by [`seal_pair`].
pub(crate) fn open_pair(file: &EncryptedTokenFile) -> Result<TokenPair, StoreError> {
    let envelope = &file.encryption;
    let salt = decode_fixed::<SALT_LEN>(&envelope.salt, "salt")?;
    let cost = KdfCost {
        log_n: envelope.log_n,
        r: envelope.r,
        p: envelope.p,
    };
    let kek = derive_machine_kek(&salt, cost)?;
    let wrapped_nonce = decode_fixed::<NONCE_LEN>(&envelope.wrapped_dek_nonce, "wrapped_dek_nonce")?;
    let wrapped_dek = decode_bytes(&envelope.wrapped_dek_ciphertext, "wrapped_dek_ciphertext")?;
    let dek_raw = decrypt_blob(&kek, &wrapped_nonce, &wrapped_dek).map_err(|_| {
        StoreError::Invalid(
            "failed to decrypt stored session (machine identity may have changed); run `enwis logout` and sign in again"
                .to_string(),
        )
    })?;
    if dek_raw.len() != KEY_LEN {
        return Err(StoreError::Invalid(
            "invalid key material in token file".to_string(),
        ));
    }
    let mut dek = [0u8; KEY_LEN];
    dek.copy_from_slice(&dek_raw);

    let nonce = decode_fixed::<NONCE_LEN>(&file.tokens.nonce, "nonce")?;
    let ciphertext = decode_bytes(&file.tokens.ciphertext, "ciphertext")?;
    let payload = decrypt_blob(&dek, &nonce, &ciphertext)
        .map_err(|_| StoreError::Invalid("failed to decrypt stored token pair".to_string()))?;
    serde_json::from_slice(&payload)
        .map_err(|err| StoreError::Invalid(format!("failed to decode stored token pair: {err}")))
}

fn derive_machine_kek(salt: &[u8; SALT_LEN], cost: KdfCost) -> Result<[u8; KEY_LEN], StoreError> {
    let mut hashed = Sha256::new();
    hashed.update(MACHINE_KEY_CONTEXT.as_bytes());
    hashed.update(machine_secret_material());
    hashed.update(salt);
    let seed = hashed.finalize();

    let params = ScryptParams::new(cost.log_n, cost.r, cost.p, KEY_LEN)
        .map_err(|err| StoreError::Invalid(format!("invalid key derivation parameters: {err}")))?;
    let mut key = [0u8; KEY_LEN];
    scrypt(&seed, salt, &params, &mut key)
        .map_err(|err| StoreError::Invalid(format!("failed to derive machine key: {err}")))?;
    Ok(key)
}

fn machine_secret_material() -> Vec<u8> {
    let hostname = hostname::get()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());
    let home = dirs::home_dir()
        .map(|path| path.display().to_string())
        .unwrap_or_default();
    let machine_id = read_machine_id().unwrap_or_default();
    format!(
        "os={}|host={hostname}|user={username}|home={home}|machine_id={machine_id}",
        std::env::consts::OS
    )
    .into_bytes()
}

fn read_machine_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id", "/etc/hostid"]
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn encrypt_blob(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), StoreError> {
    let cipher = Aes256GcmSiv::new_from_slice(key)
        .map_err(|_| StoreError::Invalid("invalid encryption key length".to_string()))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| StoreError::Invalid("failed to encrypt token data".to_string()))?;
    Ok((nonce.to_vec(), ciphertext))
}

fn decrypt_blob(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, StoreError> {
    let cipher = Aes256GcmSiv::new_from_slice(key)
        .map_err(|_| StoreError::Invalid("invalid encryption key length".to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| StoreError::Invalid("failed to decrypt token data".to_string()))
}

fn decode_bytes(value: &str, field: &str) -> Result<Vec<u8>, StoreError> {
    B64.decode(value)
        .map_err(|err| StoreError::Invalid(format!("failed to decode token file field `{field}`: {err}")))
}

fn decode_fixed<const N: usize>(value: &str, field: &str) -> Result<[u8; N], StoreError> {
    let bytes = decode_bytes(value, field)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        StoreError::Invalid(format!(
            "invalid token file field `{field}` length: expected {N}, got {}",
            bytes.len()
        ))
    })
}
