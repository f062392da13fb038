//! Credentials file I/O.
//!
//! Reads and writes `credentials.json` inside the config directory. Writes go
//! through a temp file in the same directory and are renamed into place, so a
//! reader never sees a half-written document. The file is owner-only (0o600).
//!
//! [`CredentialStore::lock`] takes an advisory lock on a sibling
//! `credentials.json.lock` file. Callers hold it across a full
//! load-mutate-save cycle so two invocations cannot interleave their writes.
//! Writers that skip the lock (manual edits, older binaries) can still race.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use latch_settings::LatchSettings;
use tracing::debug;

use crate::errors::AuthError;
use crate::types::Credentials;

const LOCK_POLL_START: Duration = Duration::from_millis(10);
const LOCK_POLL_MAX: Duration = Duration::from_millis(200);

/// Handle to the credentials document.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `credentials.json` inside `config_dir`.
    pub fn in_config_dir(config_dir: &Path) -> Self {
        Self::new(latch_settings::credentials_path(config_dir))
    }

    /// Store in the config directory resolved from `settings`.
    pub fn from_settings(settings: &LatchSettings) -> Result<Self, AuthError> {
        let dir = latch_settings::config_dir(settings)?;
        Ok(Self::in_config_dir(&dir))
    }

    /// Location of the credentials document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Read and parse the document.
    ///
    /// Returns `Ok(None)` when the file does not exist yet. A file that exists
    /// but is empty reads as an empty collection.
    pub fn load(&self) -> Result<Option<Credentials>, AuthError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "credentials file not found");
                return Ok(None);
            }
            Err(e) => return Err(AuthError::Io(e)),
        };

        debug!(path = ?self.path, "found credentials, reading");
        if raw.trim().is_empty() {
            return Ok(Some(Credentials::new()));
        }

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| AuthError::MalformedCredentials {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the document with `credentials`.
    ///
    /// Creates the parent directory if needed and returns the written path.
    pub fn save(&self, credentials: &Credentials) -> Result<PathBuf, AuthError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(credentials)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        tmp.as_file().sync_all()?;
        let _ = tmp.persist(&self.path).map_err(|e| AuthError::Io(e.error))?;

        debug!(path = ?self.path, count = credentials.len(), "saved credentials");
        Ok(self.path.clone())
    }

    /// Acquire the advisory lock, polling until `timeout` elapses.
    pub async fn lock(&self, timeout: Duration) -> Result<StoreLock, AuthError> {
        let path = self.lock_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let started = Instant::now();
        let mut delay = LOCK_POLL_START;
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(StoreLock { file, path }),
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(AuthError::LockTimeout {
                            path,
                            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        });
                    }
                    debug!(?path, "credentials locked by another process, waiting");
                    tokio::time::sleep(delay.min(timeout - waited)).await;
                    delay = (delay * 2).min(LOCK_POLL_MAX);
                }
                Err(e) => return Err(AuthError::Io(e)),
            }
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Exclusive hold on the credentials file. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = ?self.path, "failed to release credentials lock: {e}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    use super::*;
    use crate::types::Credential;

    fn store(dir: &TempDir) -> CredentialStore {
        CredentialStore::in_config_dir(dir.path())
    }

    fn sample() -> Credentials {
        [(
            "T123456789A",
            Credential {
                token: "xoxp-1".to_string(),
                account_domain: "acme".to_string(),
                account_id: "T123456789A".to_string(),
                user_id: Some("U1".to_string()),
                refresh_token: Some("xoxe-1".to_string()),
                expires_at: Some(1_700_000_000),
                api_host: Some("https://dev1234.slack.com".to_string()),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load().unwrap().is_none());
    }

    #[test]
    fn load_empty_file_is_empty_collection() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        std::fs::write(s.path(), "  \n").unwrap();
        assert!(s.load().unwrap().unwrap().is_empty());
    }

    #[test]
    fn load_malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        std::fs::write(s.path(), "{\"T1\": ").unwrap();
        let err = s.load().unwrap_err();
        assert_matches!(&err, AuthError::MalformedCredentials { path, .. } if path == s.path());
        assert!(err.remediation().unwrap().contains("credentials.json"));
    }

    #[test]
    fn save_then_load_is_stable() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let creds = sample();

        let written = s.save(&creds).unwrap();
        assert_eq!(written, s.path());

        let loaded = s.load().unwrap().unwrap();
        assert_eq!(loaded, creds);

        let _ = s.save(&loaded).unwrap();
        assert_eq!(s.load().unwrap().unwrap(), creds);
    }

    #[test]
    fn save_writes_indented_json() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let _ = s.save(&sample()).unwrap();
        let raw = std::fs::read_to_string(s.path()).unwrap();
        assert!(raw.starts_with("{\n  \"T123456789A\": {\n    \"token\""));
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let s = CredentialStore::new(dir.path().join("nested").join("credentials.json"));
        let _ = s.save(&Credentials::new()).unwrap();
        assert!(s.path().exists());
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let _ = s.save(&sample()).unwrap();
        let _ = s.save(&Credentials::new()).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("credentials.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_permissions_0600() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let _ = s.save(&sample()).unwrap();
        let perms = std::fs::metadata(s.path()).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_dropped() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);

        let held = s.lock(Duration::from_millis(100)).await.unwrap();
        assert!(held.path().ends_with("credentials.json.lock"));

        let err = s.lock(Duration::from_millis(30)).await.unwrap_err();
        assert_matches!(err, AuthError::LockTimeout { .. });

        drop(held);
        let _again = s.lock(Duration::from_millis(100)).await.unwrap();
    }
}
