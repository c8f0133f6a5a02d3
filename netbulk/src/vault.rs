//! Encrypted credential store.
//!
//! Credentials are kept as a JSON map of section name to username/password,
//! encrypted as a whole with AES-256-GCM. The 256-bit key lives in its own
//! file (base64url, owner-only permissions on Unix) and is generated on
//! first use.
//!
//! Data file layout:
//!
//! ```text
//! "NBV1" | 12-byte nonce | ciphertext + tag
//! ```
//!
//! Older stores held a single `{"username", "password"}` object; those are
//! read as the `main` section and rewritten in the sectioned shape on the
//! next save.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::RngCore;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

const MAGIC: &[u8; 4] = b"NBV1";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Section holding device credentials.
pub const MAIN_SECTION: &str = "main";

/// Section holding jump-host credentials.
pub const JUMP_SECTION: &str = "jump";

/// A username/password pair.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// On-disk shape of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub username: String,
    pub password: String,
}

/// Decrypted store contents, in insertion order.
pub type CredentialRecord = IndexMap<String, StoredCredential>;

/// Encrypted credential vault.
pub struct CredentialVault {
    cipher: Aes256Gcm,
    data_path: PathBuf,
}

impl CredentialVault {
    /// Open the vault, generating the key file if it does not exist.
    pub fn initialize(key_path: impl AsRef<Path>, data_path: impl Into<PathBuf>) -> Result<Self> {
        let key_path = key_path.as_ref();
        if !key_path.exists() {
            create_key_file(key_path)?;
            info!("Generated credential key {}", key_path.display());
        }

        let encoded = fs::read_to_string(key_path).map_err(|source| VaultError::Io {
            path: key_path.to_path_buf(),
            source,
        })?;
        let key = URL_SAFE
            .decode(encoded.trim())
            .ok()
            .filter(|key| key.len() == KEY_LEN)
            .ok_or_else(|| VaultError::InvalidKey(key_path.to_path_buf()))?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|_| VaultError::InvalidKey(key_path.to_path_buf()))?;

        Ok(Self {
            cipher,
            data_path: data_path.into(),
        })
    }

    /// Path of the encrypted data file.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Store credentials for `section`, keeping the other sections.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn save(&self, section: &str, username: &str, password: &SecretString) {
        if let Err(e) = self.try_save(section, username, password) {
            warn!("Could not save '{section}' credentials: {e}");
        }
    }

    /// Store credentials for `section`, reporting failures.
    ///
    /// Unreadable existing data is treated as empty and replaced.
    pub fn try_save(&self, section: &str, username: &str, password: &SecretString) -> Result<()> {
        let mut record = match self.read_record() {
            Ok(record) => record,
            Err(e) => {
                debug!("Starting a fresh credential record: {e}");
                CredentialRecord::new()
            }
        };

        record.insert(
            section.to_string(),
            StoredCredential {
                username: username.to_string(),
                password: password.expose_secret().to_string(),
            },
        );

        let plaintext = serde_json::to_vec(&record).map_err(VaultError::Malformed)?;
        let sealed = self.seal(&plaintext)?;
        self.write_atomic(&sealed)?;

        debug!("Saved '{section}' credentials to {}", self.data_path.display());
        Ok(())
    }

    /// Load credentials for `section`.
    ///
    /// Returns `None` when the store is missing, unreadable, encrypted with
    /// another key, or has no such section.
    pub fn load(&self, section: &str) -> Option<Credential> {
        let mut record = match self.read_record() {
            Ok(record) => record,
            Err(e) => {
                debug!("No stored credentials: {e}");
                return None;
            }
        };

        record.shift_remove(section).map(|stored| Credential {
            username: stored.username,
            password: SecretString::from(stored.password),
        })
    }

    /// Names of the stored sections, empty when nothing can be read.
    pub fn sections(&self) -> Vec<String> {
        self.read_record()
            .map(|record| record.into_keys().collect())
            .unwrap_or_default()
    }

    /// Decrypt and parse the whole store, upgrading the legacy shape.
    pub fn read_record(&self) -> Result<CredentialRecord> {
        let data = match fs::read(&self.data_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::Empty.into());
            }
            Err(source) => {
                return Err(VaultError::Io {
                    path: self.data_path.clone(),
                    source,
                }
                .into());
            }
        };

        let plaintext = self.open(&data)?;
        Ok(parse_record(&plaintext)?)
    }

    fn seal(&self, plaintext: &[u8]) -> std::result::Result<Vec<u8>, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;

        let mut out = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(&self, data: &[u8]) -> std::result::Result<Vec<u8>, VaultError> {
        let header = MAGIC.len() + NONCE_LEN;
        if data.len() < header || &data[..MAGIC.len()] != MAGIC {
            return Err(VaultError::Crypto("missing vault header".into()));
        }

        let nonce = Nonce::from_slice(&data[MAGIC.len()..header]);
        self.cipher
            .decrypt(nonce, &data[header..])
            .map_err(|_| VaultError::Crypto("decryption failed (wrong key or corrupted data)".into()))
    }

    fn write_atomic(&self, data: &[u8]) -> std::result::Result<(), VaultError> {
        let io_error = |source| VaultError::Io {
            path: self.data_path.clone(),
            source,
        };

        let dir = match self.data_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(io_error)?;
        file.write_all(data).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(&self.data_path)
            .map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

fn parse_record(plaintext: &[u8]) -> std::result::Result<CredentialRecord, VaultError> {
    let value: serde_json::Value = serde_json::from_slice(plaintext)?;

    let legacy = value
        .as_object()
        .is_some_and(|map| map.contains_key("username"));
    let value = if legacy {
        debug!("Upgrading legacy single-section credential record");
        serde_json::json!({ MAIN_SECTION: value })
    } else {
        value
    };

    Ok(serde_json::from_value(value)?)
}

fn create_key_file(path: &Path) -> std::result::Result<(), VaultError> {
    let io_error = |source| VaultError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    let encoded = URL_SAFE.encode(key);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(io_error)?;
    file.write_all(encoded.as_bytes()).map_err(io_error)?;
    file.sync_all().map_err(io_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault_in(dir: &TempDir, key: &str) -> CredentialVault {
        CredentialVault::initialize(dir.path().join(key), dir.path().join("creds.dat")).unwrap()
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let vault = vault_in(&dir, "secret.key");

        vault.save("main", "admin", &secret("p@ss"));
        let credential = vault.load("main").unwrap();
        assert_eq!(credential.username, "admin");
        assert_eq!(credential.password.expose_secret(), "p@ss");
        assert!(vault.load("jump").is_none());
    }

    #[test]
    fn test_sections_merge() {
        let dir = TempDir::new().unwrap();
        let vault = vault_in(&dir, "secret.key");

        vault.save("main", "admin", &secret("one"));
        vault.save("jump", "bastion", &secret("two"));
        vault.save("main", "operator", &secret("three"));

        assert_eq!(vault.sections(), vec!["main", "jump"]);
        assert_eq!(vault.load("main").unwrap().username, "operator");
        assert_eq!(vault.load("jump").unwrap().username, "bastion");
    }

    #[test]
    fn test_data_is_encrypted() {
        let dir = TempDir::new().unwrap();
        let vault = vault_in(&dir, "secret.key");
        vault.save("main", "admin", &secret("hunter2"));

        let raw = fs::read(vault.data_path()).unwrap();
        assert!(raw.starts_with(MAGIC));
        assert!(memchr::memmem::find(&raw, b"hunter2").is_none());
        assert!(memchr::memmem::find(&raw, b"admin").is_none());
    }

    #[test]
    fn test_wrong_key_yields_nothing() {
        let dir = TempDir::new().unwrap();
        vault_in(&dir, "first.key").save("main", "admin", &secret("x"));

        let other = vault_in(&dir, "second.key");
        assert!(other.load("main").is_none());
        assert!(other.sections().is_empty());
        assert!(matches!(
            other.read_record(),
            Err(crate::Error::Vault(VaultError::Crypto(_)))
        ));
    }

    #[test]
    fn test_key_file_reused() {
        let dir = TempDir::new().unwrap();
        vault_in(&dir, "secret.key").save("main", "admin", &secret("x"));

        let reopened = vault_in(&dir, "secret.key");
        assert_eq!(reopened.load("main").unwrap().username, "admin");
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        vault_in(&dir, "secret.key");
        let mode = fs::metadata(dir.path().join("secret.key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_invalid_key_file() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("bad.key");
        fs::write(&key_path, "not-a-key").unwrap();

        let err = CredentialVault::initialize(&key_path, dir.path().join("creds.dat"))
            .err()
            .unwrap();
        assert!(matches!(err, crate::Error::Vault(VaultError::InvalidKey(_))));
    }

    #[test]
    fn test_legacy_record_upgrades() {
        let dir = TempDir::new().unwrap();
        let vault = vault_in(&dir, "secret.key");

        let legacy = br#"{"username": "olduser", "password": "oldpass"}"#;
        vault.write_atomic(&vault.seal(legacy).unwrap()).unwrap();

        let credential = vault.load("main").unwrap();
        assert_eq!(credential.username, "olduser");
        assert_eq!(credential.password.expose_secret(), "oldpass");

        vault.save("jump", "bastion", &secret("j"));
        let record = vault.read_record().unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record["main"].username, "olduser");

        let plaintext = vault.open(&fs::read(vault.data_path()).unwrap()).unwrap();
        let stored: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
        assert!(stored.get("username").is_none());
        assert_eq!(stored["main"]["password"], "oldpass");
    }

    #[test]
    fn test_corrupt_data_is_replaced() {
        let dir = TempDir::new().unwrap();
        let vault = vault_in(&dir, "secret.key");
        fs::write(vault.data_path(), b"garbage").unwrap();

        assert!(vault.load("main").is_none());
        vault.save("main", "admin", &secret("x"));
        assert_eq!(vault.sections(), vec!["main"]);
    }
}
