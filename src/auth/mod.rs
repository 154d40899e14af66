//! Token pair persistence.
//!
//! The session credential is one access/refresh [`TokenPair`]. It is kept in
//! a [`TokenStorage`] backend (encrypted file by default, memory for
//! embedding/tests) behind a shared [`TokenStore`] handle that the request
//! interceptor and session state both use.

mod crypto;
mod store;
mod types;

pub use crypto::KdfCost;
pub use store::{FileTokenStorage, MemoryTokenStorage, TokenStorage, TokenStore};
pub use types::TokenPair;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::TestTempDir;

    /// Cheap scrypt cost so file-store tests stay fast.
    const TEST_KDF: KdfCost = KdfCost {
        log_n: 4,
        r: 8,
        p: 1,
    };

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair::new(access, refresh)
    }

    #[test]
    fn save_then_read_yields_exact_pair() {
        let store = TokenStore::in_memory();
        store.save_tokens(&pair("a1", "r1")).expect("save");
        assert_eq!(store.tokens().unwrap(), Some(pair("a1", "r1")));

        store.save_tokens(&pair("a2", "r2")).expect("overwrite");
        assert_eq!(store.access_token().unwrap().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r2"));
    }

    #[test]
    fn logout_twice_leaves_storage_empty() {
        let store = TokenStore::in_memory();
        store.save_tokens(&pair("a", "r")).unwrap();
        store.logout().expect("first logout");
        store.logout().expect("second logout is a no-op");
        assert_eq!(store.tokens().unwrap(), None);
        assert!(!store.has_session());
    }

    #[test]
    fn half_present_pair_counts_as_logged_out() {
        let store = TokenStore::new(MemoryTokenStorage::with_pair(pair("access", "")));
        assert_eq!(store.tokens().unwrap(), None);
        assert_eq!(store.access_token().unwrap(), None);
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", pair("secret-access", "secret-refresh"));
        assert!(!rendered.contains("secret-access"), "got: {rendered}");
        assert!(!rendered.contains("secret-refresh"), "got: {rendered}");
    }

    #[test]
    fn concurrent_saves_never_expose_mixed_pairs() {
        let store = TokenStore::in_memory();
        store.save_tokens(&pair("a0", "r0")).unwrap();
        let writers: Vec<_> = (1..=8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .save_tokens(&pair(&format!("a{n}"), &format!("r{n}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for _ in 0..500 {
            let current = store.tokens().unwrap().expect("pair present");
            assert_eq!(
                current.access_token.trim_start_matches('a'),
                current.refresh_token.trim_start_matches('r')
            );
        }
        for writer in writers {
            writer.join().unwrap();
        }
    }

    #[test]
    fn file_storage_encrypts_tokens_on_disk() {
        let dir = TestTempDir::new("tokens");
        let path = dir.child("tokens.json");
        let mut storage = FileTokenStorage::with_kdf_cost(&path, TEST_KDF);
        storage.save(&pair("access-plain-text", "refresh-plain-text")).unwrap();

        let raw = std::fs::read_to_string(&path).expect("read token file");
        assert!(raw.contains("\"encryption\""), "raw: {raw}");
        assert!(!raw.contains("access-plain-text"), "token leaked: {raw}");
        assert!(!raw.contains("refresh-plain-text"), "token leaked: {raw}");

        let mut reopened = FileTokenStorage::with_kdf_cost(&path, TEST_KDF);
        assert_eq!(
            reopened.load().unwrap(),
            Some(pair("access-plain-text", "refresh-plain-text"))
        );
    }

    #[test]
    fn file_storage_missing_file_means_no_session() {
        let dir = TestTempDir::new("tokens-missing");
        let mut storage = FileTokenStorage::with_kdf_cost(dir.child("absent.json"), TEST_KDF);
        assert_eq!(storage.load().unwrap(), None);
        storage.clear().expect("clearing absent file is fine");
        storage.clear().expect("and idempotent");
    }

    #[tokio::test]
    async fn persist_writes_through_blocking_pool() {
        let dir = TestTempDir::new("tokens-persist");
        let path = dir.child("tokens.json");
        let store = TokenStore::new(FileTokenStorage::with_kdf_cost(&path, TEST_KDF));
        store.persist(pair("a-async", "r-async")).await.expect("persist");
        assert!(path.exists());

        let reopened = TokenStore::new(FileTokenStorage::with_kdf_cost(&path, TEST_KDF));
        assert_eq!(reopened.tokens().unwrap(), Some(pair("a-async", "r-async")));
    }

    #[test]
    fn file_storage_clear_removes_file() {
        let dir = TestTempDir::new("tokens-clear");
        let path = dir.child("tokens.json");
        let store = TokenStore::new(FileTokenStorage::with_kdf_cost(&path, TEST_KDF));
        store.save_tokens(&pair("a", "r")).unwrap();
        assert!(path.exists());
        store.logout().unwrap();
        assert!(!path.exists());
        assert_eq!(store.tokens().unwrap(), None);
    }

    #[test]
    fn file_storage_migrates_plaintext_pair() {
        let dir = TestTempDir::new("tokens-legacy");
        let path = dir.write_text(
            "tokens.json",
            r#"{"access_token":"legacy-access","refresh_token":"legacy-refresh"}"#,
        );
        let mut storage = FileTokenStorage::with_kdf_cost(&path, TEST_KDF);
        assert_eq!(
            storage.load().unwrap(),
            Some(pair("legacy-access", "legacy-refresh"))
        );
        let migrated = std::fs::read_to_string(&path).unwrap();
        assert!(migrated.contains("\"encryption\""), "raw: {migrated}");
        assert!(!migrated.contains("legacy-access"));
    }

    #[test]
    fn file_storage_reports_tampered_ciphertext() {
        let dir = TestTempDir::new("tokens-tamper");
        let path = dir.child("tokens.json");
        FileTokenStorage::with_kdf_cost(&path, TEST_KDF)
            .save(&pair("token-a", "token-b"))
            .unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let ciphertext = value["tokens"]["ciphertext"].as_str().unwrap().to_string();
        value["tokens"]["ciphertext"] = serde_json::Value::String(format!("AAAA{ciphertext}"));
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let err = FileTokenStorage::with_kdf_cost(&path, TEST_KDF)
            .load()
            .expect_err("tampered payload should fail");
        assert!(err.to_string().contains("failed to decrypt"), "got: {err}");
    }
}
