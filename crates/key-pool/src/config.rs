//! Configuration types and loading
//!
//! Config precedence: CLI arg > env vars > config file > defaults.
//! The provider credential is loaded from the KEY_SOURCE_CREDENTIAL env var
//! or a credential_file path, never stored in the TOML directly, so config
//! files stay free of secrets.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub pool: PoolConfig,
    pub source: SourceConfig,
}

/// Rotation and failure-threshold settings.
#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    /// Failure count at which a key is skipped by rotation.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
    /// Optional out-of-rotation key (e.g. a paid tier).
    #[serde(default)]
    pub designated_key: Option<String>,
}

/// Where the initial key list comes from.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// Dataset or list identifier within the source.
    pub source_id: String,
    /// Base URL of the dataset endpoint. Absent means a static key list
    /// is supplied some other way (tests, embedding application).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(skip)]
    pub credential: Option<Secret<String>>,
    /// Path to a file containing the credential (alternative to the
    /// KEY_SOURCE_CREDENTIAL env var).
    #[serde(default)]
    pub credential_file: Option<PathBuf>,
}

fn default_max_failures() -> u32 {
    3
}

impl Config {
    /// Load configuration from a TOML file, then resolve the credential.
    ///
    /// Credential resolution order:
    /// 1. KEY_SOURCE_CREDENTIAL env var
    /// 2. credential_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.pool.max_failures == 0 {
            return Err(common::Error::Config(
                "max_failures must be at least 1".into(),
            ));
        }

        if config.source.source_id.trim().is_empty() {
            return Err(common::Error::Config("source_id must not be empty".into()));
        }

        if let Some(ref base_url) = config.source.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "base_url must start with http:// or https://, got: {base_url}"
                )));
            }
        }

        // Resolve credential: env var takes precedence over file
        if let Ok(credential) = std::env::var("KEY_SOURCE_CREDENTIAL") {
            config.source.credential = Some(Secret::new(credential));
        } else if let Some(ref credential_file) = config.source.credential_file {
            let credential = std::fs::read_to_string(credential_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read credential_file {}: {e}",
                    credential_file.display()
                ))
            })?;
            let credential = credential.trim().to_owned();
            if !credential.is_empty() {
                config.source.credential = Some(Secret::new(credential));
            }
        }

        Ok(config)
    }

    /// Resolve the config file path from a CLI arg or KEY_POOL_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("KEY_POOL_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("key-pool.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that mutate environment variables, preventing data
    /// races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[pool]
max_failures = 5
designated_key = "paid-key"

[source]
source_id = "org/key-dataset"
base_url = "https://datasets.example.com/api"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.pool.max_failures, 5);
        assert_eq!(config.pool.designated_key.as_deref(), Some("paid-key"));
        assert_eq!(config.source.source_id, "org/key-dataset");
        assert!(config.source.credential.is_none());
    }

    #[test]
    fn max_failures_defaults_to_three() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[pool]

[source]
source_id = "org/key-dataset"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.pool.max_failures, 3);
        assert!(config.pool.designated_key.is_none());
    }

    #[test]
    fn load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/key-pool.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn zero_max_failures_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[pool]
max_failures = 0

[source]
source_id = "org/key-dataset"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(
            err.to_string().contains("max_failures"),
            "error should name the field, got: {err}"
        );
    }

    #[test]
    fn empty_source_id_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[pool]

[source]
source_id = "  "
"#,
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn base_url_without_scheme_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[pool]

[source]
source_id = "org/key-dataset"
base_url = "datasets.example.com"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn credential_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("KEY_SOURCE_CREDENTIAL", "hf_env_token") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };

        assert_eq!(
            config.source.credential.as_ref().unwrap().expose(),
            "hf_env_token"
        );
    }

    #[test]
    fn credential_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let credential_path = dir.path().join("credential");
        std::fs::write(&credential_path, "hf_file_token\n").unwrap();

        let toml_content = format!(
            r#"
[pool]

[source]
source_id = "org/key-dataset"
credential_file = "{}"
"#,
            credential_path.display()
        );
        let path = write_config(&dir, &toml_content);

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.source.credential.as_ref().unwrap().expose(),
            "hf_file_token"
        );
    }

    #[test]
    fn env_credential_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let credential_path = dir.path().join("credential");
        std::fs::write(&credential_path, "file_token").unwrap();

        let toml_content = format!(
            r#"
[pool]

[source]
source_id = "org/key-dataset"
credential_file = "{}"
"#,
            credential_path.display()
        );
        let path = write_config(&dir, &toml_content);

        unsafe { set_env("KEY_SOURCE_CREDENTIAL", "env_token") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };

        assert_eq!(
            config.source.credential.as_ref().unwrap().expose(),
            "env_token"
        );
    }

    #[test]
    fn whitespace_only_credential_file_yields_none() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let credential_path = dir.path().join("credential");
        std::fs::write(&credential_path, "  \n  ").unwrap();

        let toml_content = format!(
            r#"
[pool]

[source]
source_id = "org/key-dataset"
credential_file = "{}"
"#,
            credential_path.display()
        );
        let path = write_config(&dir, &toml_content);

        let config = Config::load(&path).unwrap();
        assert!(config.source.credential.is_none());
    }

    #[test]
    fn missing_credential_file_errors() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_SOURCE_CREDENTIAL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[pool]

[source]
source_id = "org/key-dataset"
credential_file = "/nonexistent/credential"
"#,
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn resolve_path_cli_wins() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("KEY_POOL_CONFIG", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        unsafe { remove_env("KEY_POOL_CONFIG") };
        assert_eq!(path, PathBuf::from("/cli/wins.toml"));
    }

    #[test]
    fn resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("KEY_POOL_CONFIG", "/env/path.toml") };
        let path = Config::resolve_path(None);
        unsafe { remove_env("KEY_POOL_CONFIG") };
        assert_eq!(path, PathBuf::from("/env/path.toml"));
    }

    #[test]
    fn resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("KEY_POOL_CONFIG") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("key-pool.toml"));
    }
}
