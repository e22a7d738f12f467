//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file if one exists (best effort)
//! 2. If `POCKET_DB_PATH` is set, builds the configuration from environment
//!    variables on top of the defaults
//! 3. Otherwise probes the standard locations for a JSON or TOML file
//! 4. Falls back to the built-in defaults when no file exists
//!
//! Every path ends with [`Config::validate`].
//!
//! ## Environment Variables
//! - `POCKET_DB_PATH`: Database file path (selects environment loading)
//! - `POCKET_DB_POOL_SIZE`: Connection pool size
//! - `POCKET_DB_ENCRYPTION_KEY`: Database encryption key
//! - `POCKET_MAX_VIOLATIONS`: Strikes before lockdown
//! - `POCKET_MAX_FAILED_LOGINS`: Failed logins before lockdown
//! - `POCKET_KEY_ACTIVE_SECS`: System key ACTIVE phase length
//! - `POCKET_KEY_COOLDOWN_SECS`: System key COOLDOWN phase length
//! - `POCKET_SESSION_TTL_SECS`: Session lifetime
//! - `POCKET_LOG_LEVEL`: Log filter directive
//! - `POCKET_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! `config.{json,toml}` and `student_pocket.{json,toml}` in the working
//! directory, its two parents, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use pocket_domain::{Config, PocketError, Result};

const CONFIG_FILE_STEMS: [&str; 2] = ["config", "student_pocket"];
const CONFIG_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `PocketError::Config` if a source exists but cannot be parsed,
/// or if the resulting configuration fails validation.
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }

    let config = if std::env::var_os("POCKET_DB_PATH").is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        config
    } else {
        match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::info!("No configuration source found, using defaults");
                Config::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `POCKET_DB_PATH` is required; every other variable overrides the
/// corresponding default when present.
///
/// # Errors
/// Returns `PocketError::Config` if `POCKET_DB_PATH` is missing or a
/// numeric variable does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("POCKET_DB_PATH")?;
    if let Some(pool_size) = env_parse::<u32>("POCKET_DB_POOL_SIZE", "pool size")? {
        config.database.pool_size = pool_size;
    }
    config.database.encryption_key =
        std::env::var("POCKET_DB_ENCRYPTION_KEY").ok().filter(|key| !key.is_empty());

    if let Some(max) = env_parse::<u32>("POCKET_MAX_VIOLATIONS", "max violations")? {
        config.security.max_violations = max;
    }
    if let Some(max) = env_parse::<u32>("POCKET_MAX_FAILED_LOGINS", "max failed logins")? {
        config.security.max_failed_logins = max;
    }
    if let Some(secs) = env_parse::<u64>("POCKET_KEY_ACTIVE_SECS", "key active seconds")? {
        config.key_rotation.active_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("POCKET_KEY_COOLDOWN_SECS", "key cooldown seconds")? {
        config.key_rotation.cooldown_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("POCKET_SESSION_TTL_SECS", "session ttl")? {
        config.session.ttl_secs = secs;
    }
    if let Ok(level) = std::env::var("POCKET_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("POCKET_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is chosen by
/// extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `PocketError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PocketError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PocketError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PocketError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PocketError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PocketError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(PocketError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    candidate_paths(&roots).into_iter().find(|path| path.is_file())
}

fn candidate_paths(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .flat_map(|root| {
            CONFIG_FILE_STEMS.iter().flat_map(move |stem| {
                CONFIG_EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| PocketError::Config(format!("Missing required environment variable: {key}")))
}

fn env_parse<T>(key: &str, label: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| PocketError::Config(format!("Invalid {label}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pocket_domain::constants::DEFAULT_MAX_VIOLATIONS;
    use serial_test::serial;
    use tempfile::Builder;

    use super::*;

    const POCKET_VARS: [&str; 10] = [
        "POCKET_DB_PATH",
        "POCKET_DB_POOL_SIZE",
        "POCKET_DB_ENCRYPTION_KEY",
        "POCKET_MAX_VIOLATIONS",
        "POCKET_MAX_FAILED_LOGINS",
        "POCKET_KEY_ACTIVE_SECS",
        "POCKET_KEY_COOLDOWN_SECS",
        "POCKET_SESSION_TTL_SECS",
        "POCKET_LOG_LEVEL",
        "POCKET_LOG_JSON",
    ];

    fn clear_env() {
        for key in POCKET_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn env_bool_parsing() {
        std::env::set_var("POCKET_TEST_BOOL", "ON");
        assert!(env_bool("POCKET_TEST_BOOL", false));
        std::env::set_var("POCKET_TEST_BOOL", "0");
        assert!(!env_bool("POCKET_TEST_BOOL", true));
        std::env::remove_var("POCKET_TEST_BOOL");
        assert!(env_bool("POCKET_TEST_BOOL", true));
    }

    #[test]
    #[serial]
    fn load_from_env_overrides_defaults() {
        clear_env();
        std::env::set_var("POCKET_DB_PATH", "/tmp/pocket.db");
        std::env::set_var("POCKET_DB_POOL_SIZE", "5");
        std::env::set_var("POCKET_DB_ENCRYPTION_KEY", "test-key");
        std::env::set_var("POCKET_MAX_FAILED_LOGINS", "5");
        std::env::set_var("POCKET_KEY_ACTIVE_SECS", "120");
        std::env::set_var("POCKET_LOG_JSON", "true");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.database.path, "/tmp/pocket.db");
        assert_eq!(config.database.pool_size, 5);
        assert_eq!(config.database.encryption_key.as_deref(), Some("test-key"));
        assert_eq!(config.security.max_failed_logins, 5);
        assert_eq!(config.security.max_violations, DEFAULT_MAX_VIOLATIONS);
        assert_eq!(config.key_rotation.active_secs, 120);
        assert!(config.logging.json);

        clear_env();
    }

    #[test]
    #[serial]
    fn load_from_env_requires_db_path() {
        clear_env();
        assert!(matches!(load_from_env(), Err(PocketError::Config(_))));
    }

    #[test]
    #[serial]
    fn load_from_env_rejects_bad_numbers() {
        clear_env();
        std::env::set_var("POCKET_DB_PATH", "/tmp/pocket.db");
        std::env::set_var("POCKET_SESSION_TTL_SECS", "forever");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, PocketError::Config(ref msg) if msg.contains("session ttl")));

        clear_env();
    }

    #[test]
    fn parses_toml_by_extension() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[database]\npath = \"pocket.db\"\npool_size = 3\n\n[key_rotation]\ncooldown_secs = 30"
        )
        .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.database.pool_size, 3);
        assert_eq!(config.key_rotation.cooldown_secs, 30);
    }

    #[test]
    fn rejects_unknown_extension_and_missing_file() {
        let file = Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(load_from_file(Some(file.path().to_path_buf())).is_err());
        assert!(load_from_file(Some(PathBuf::from("/definitely/not/here.json"))).is_err());
    }

    #[test]
    fn candidates_cover_both_stems_and_formats() {
        let paths = candidate_paths(&[PathBuf::from("/etc/pocket")]);
        assert_eq!(paths.len(), 4);
        assert!(paths.contains(&PathBuf::from("/etc/pocket/student_pocket.toml")));
    }
}
