// Configuration loading and parsing (server.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub chain: ChainConfig,
    pub twitter: TwitterConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// server.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire server.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ServerFile {
    server: ServerConfig,
    llm: LlmConfig,
    chain: ChainConfig,
    twitter: TwitterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Upper bound on model turns that request tools before the agent gives up.
    pub max_tool_rounds: usize,
}

/// Which public Aptos network the node URL defaults to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    pub fn default_node_url(self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet.aptoslabs.com/v1",
            Network::Testnet => "https://api.testnet.aptoslabs.com/v1",
            Network::Devnet => "https://api.devnet.aptoslabs.com/v1",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub network: Network,
    /// Overrides the network's public fullnode when set.
    #[serde(default)]
    pub node_url: Option<String>,
    pub emojicoin_module: String,
    pub integrator_address: String,
    pub swap_router: String,
    /// Delegation pool used by the staking tool. Staking is unavailable when unset.
    #[serde(default)]
    pub staking_pool: Option<String>,
    pub max_gas_amount: u64,
    pub expiration_secs: u64,
    pub confirmation_timeout_secs: u64,
}

impl ChainConfig {
    pub fn node_url(&self) -> &str {
        match &self.node_url {
            Some(url) if !url.is_empty() => url,
            _ => self.network.default_node_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    pub api_base: String,
    pub login_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub max_login_attempts: u32,
    /// Per-attempt login deadline. Absent means each attempt may run as long
    /// as the HTTP client allows.
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
    pub search_limit: usize,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
    pub twitter_username: Option<String>,
    pub twitter_password: Option<String>,
}

impl CredentialsConfig {
    /// Overlay credentials from the process environment. Values from `lookup`
    /// win over the file; empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(v) = pick("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(v);
        }
        if let Some(v) = pick("TWITTER_USERNAME") {
            self.twitter_username = Some(v);
        }
        if let Some(v) = pick("TWITTER_PASSWORD") {
            self.twitter_password = Some(v);
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/server.toml` and (optionally)
/// `config/credentials.toml`, both relative to the given `base_dir`.
///
/// This does not consult the environment or copy defaults; `load_config()`
/// does both.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- server.toml (required) ---
    let server_path = config_dir.join("server.toml");
    let server_text = read_file(&server_path)?;
    let server_file: ServerFile =
        toml::from_str(&server_text).map_err(|e| ConfigError::ParseError {
            path: server_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        server: server_file.server,
        llm: server_file.llm,
        chain: server_file.chain,
        twitter: server_file.twitter,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the workspace root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            // Already present; never overwrite a user's config.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first and overlaying credentials from the
/// environment last.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    let mut config = load_config_from(&cwd)?;
    config
        .credentials
        .apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Loose check for an Aptos account address: `0x` followed by 1..=64 hex digits.
fn looks_like_address(s: &str) -> bool {
    let Some(digits) = s.strip_prefix("0x") else {
        return false;
    };
    !digits.is_empty() && digits.len() <= 64 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.llm.max_tokens == 0 {
        return Err(ConfigError::ValidationError {
            field: "llm.max_tokens".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.llm.max_tool_rounds == 0 {
        return Err(ConfigError::ValidationError {
            field: "llm.max_tool_rounds".into(),
            message: "must be greater than 0".into(),
        });
    }

    let chain = &config.chain;
    let address_fields: &[(&str, &str)] = &[
        ("chain.emojicoin_module", chain.emojicoin_module.as_str()),
        ("chain.integrator_address", chain.integrator_address.as_str()),
    ];
    for (name, val) in address_fields {
        if !looks_like_address(val) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be a 0x-prefixed hex address, got {val:?}"),
            });
        }
    }
    if let Some(pool) = &chain.staking_pool {
        if !looks_like_address(pool) {
            return Err(ConfigError::ValidationError {
                field: "chain.staking_pool".into(),
                message: format!("must be a 0x-prefixed hex address, got {pool:?}"),
            });
        }
    }

    if chain.max_gas_amount == 0 {
        return Err(ConfigError::ValidationError {
            field: "chain.max_gas_amount".into(),
            message: "must be > 0".into(),
        });
    }

    if config.twitter.max_login_attempts == 0 {
        return Err(ConfigError::ValidationError {
            field: "twitter.max_login_attempts".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.twitter.search_limit == 0 {
        return Err(ConfigError::ValidationError {
            field: "twitter.search_limit".into(),
            message: "must be > 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Path to the workspace root, where `defaults/` lives.
    fn workspace_root() -> PathBuf {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        manifest
            .ancestors()
            .find(|p| p.join("defaults/server.toml").exists())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| panic!("cannot locate defaults/ above {:?}", manifest))
    }

    fn default_server_toml() -> String {
        fs::read_to_string(workspace_root().join("defaults/server.toml")).unwrap()
    }

    /// Fresh temp dir with `config/server.toml` holding `server_toml`.
    fn temp_with_server_toml(name: &str, server_toml: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/server.toml"), server_toml).unwrap();
        tmp
    }

    fn expect_validation_field(err: ConfigError, expected: &str) {
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_default_config() {
        let tmp = temp_with_server_toml("mb_config_defaults", &default_server_toml());
        let config = load_config_from(&tmp).expect("default config should load");

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.model, "claude-sonnet-4-5-20250929");
        assert!(config.llm.max_tool_rounds > 0);
        assert_eq!(config.chain.network, Network::Testnet);
        assert_eq!(config.chain.node_url(), "https://api.testnet.aptoslabs.com/v1");
        assert_eq!(
            config.chain.emojicoin_module,
            "0x1abfa4c5bb5f381b00719fc19e8e655cb2531904bf8f59309efd18eb081373b4"
        );
        assert_eq!(config.twitter.login_delay_ms, 2000);
        assert_eq!(config.twitter.retry_delay_ms, 5000);
        assert_eq!(config.twitter.max_login_attempts, 3);
        assert_eq!(config.twitter.attempt_timeout_secs, None);
        assert_eq!(config.twitter.search_limit, 10);
        assert!(config.credentials.twitter_username.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_is_loaded() {
        let tmp = temp_with_server_toml("mb_config_creds", &default_server_toml());
        fs::write(
            tmp.join("config/credentials.toml"),
            "anthropic_api_key = \"sk-ant-test\"\ntwitter_username = \"buddy\"\ntwitter_password = \"tok\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.credentials.anthropic_api_key.as_deref(), Some("sk-ant-test"));
        assert_eq!(config.credentials.twitter_username.as_deref(), Some("buddy"));
        assert_eq!(config.credentials.twitter_password.as_deref(), Some("tok"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut creds = CredentialsConfig {
            anthropic_api_key: Some("from-file".into()),
            twitter_username: Some("file-user".into()),
            twitter_password: None,
        };
        creds.apply_env_overrides(|key| match key {
            "TWITTER_USERNAME" => Some("env-user".into()),
            "TWITTER_PASSWORD" => Some("env-pass".into()),
            "ANTHROPIC_API_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(creds.anthropic_api_key.as_deref(), Some("from-file"));
        assert_eq!(creds.twitter_username.as_deref(), Some("env-user"));
        assert_eq!(creds.twitter_password.as_deref(), Some("env-pass"));
    }

    #[test]
    fn node_url_override_wins() {
        let text = default_server_toml().replace(
            "network = \"testnet\"",
            "network = \"mainnet\"\nnode_url = \"http://localhost:8080/v1\"",
        );
        let tmp = temp_with_server_toml("mb_config_node_url", &text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.chain.network, Network::Mainnet);
        assert_eq!(config.chain.node_url(), "http://localhost:8080/v1");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_login_attempts() {
        let text =
            default_server_toml().replace("max_login_attempts = 3", "max_login_attempts = 0");
        let tmp = temp_with_server_toml("mb_config_zero_attempts", &text);
        expect_validation_field(load_config_from(&tmp).unwrap_err(), "twitter.max_login_attempts");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_bad_emojicoin_module() {
        let text = default_server_toml().replace(
            "emojicoin_module = \"0x1abfa4c5bb5f381b00719fc19e8e655cb2531904bf8f59309efd18eb081373b4\"",
            "emojicoin_module = \"emojicoin\"",
        );
        let tmp = temp_with_server_toml("mb_config_bad_module", &text);
        expect_validation_field(load_config_from(&tmp).unwrap_err(), "chain.emojicoin_module");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_search_limit() {
        let text = default_server_toml().replace("search_limit = 10", "search_limit = 0");
        let tmp = temp_with_server_toml("mb_config_zero_search", &text);
        expect_validation_field(load_config_from(&tmp).unwrap_err(), "twitter.search_limit");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_server_toml() {
        let tmp = std::env::temp_dir().join("mb_config_missing_server");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("server.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_with_server_toml("mb_config_invalid_toml", "this is not valid [[[ toml");
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("server.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_and_skips_examples() {
        let tmp = std::env::temp_dir().join("mb_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join("server.toml"), default_server_toml()).unwrap();
        fs::write(
            defaults_dir.join("credentials.toml.example"),
            "twitter_username = \"...\"\n",
        )
        .unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/server.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_keeps_existing() {
        let tmp = std::env::temp_dir().join("mb_config_ensure_keeps");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/server.toml"), default_server_toml()).unwrap();
        fs::write(tmp.join("config/server.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        assert_eq!(fs::read_to_string(tmp.join("config/server.toml")).unwrap(), "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_second_run_copies_nothing() {
        let tmp = std::env::temp_dir().join("mb_config_ensure_twice");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/server.toml"), default_server_toml()).unwrap();

        let first = ensure_config_files(&tmp).unwrap();
        assert_eq!(first, vec![tmp.join("config").join("server.toml")]);
        fs::write(tmp.join("config/server.toml"), "# edited\n").unwrap();

        let second = ensure_config_files(&tmp).unwrap();
        assert!(second.is_empty());
        assert_eq!(fs::read_to_string(tmp.join("config/server.toml")).unwrap(), "# edited\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("mb_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_files(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }
}
