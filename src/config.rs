use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub clone: CloneConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/readme_history.sqlite")
}

/// Walker limits and exclusion rules.
///
/// Extension matching is case-sensitive: `.png` excludes `logo.png` but not
/// `logo.PNG`.
#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_max_chars_per_file")]
    pub max_chars_per_file: usize,
    #[serde(default = "default_max_snapshot_chars")]
    pub max_snapshot_chars: usize,
    #[serde(default = "default_ignore_extensions")]
    pub ignore_extensions: Vec<String>,
    /// Read through symlinks whose target stays inside the scan root.
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_chars_per_file: default_max_chars_per_file(),
            max_snapshot_chars: default_max_snapshot_chars(),
            ignore_extensions: default_ignore_extensions(),
            follow_symlinks: false,
        }
    }
}

fn default_max_chars_per_file() -> usize {
    20_000
}
fn default_max_snapshot_chars() -> usize {
    200_000
}
fn default_ignore_extensions() -> Vec<String> {
    [
        ".png", ".jpg", ".jpeg", ".pdf", ".gif", ".ico", ".zip", ".exe", ".bin", ".jar",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

impl ScanConfig {
    /// Whether `file_name` ends in one of the ignored extensions.
    ///
    /// The extension is everything from the last `.` onwards, so dotfiles
    /// without a further dot have none.
    pub fn is_ignored_extension(&self, file_name: &str) -> bool {
        let ext = match file_name.rfind('.') {
            Some(0) | None => return false,
            Some(idx) => &file_name[idx..],
        };
        self.ignore_extensions.iter().any(|ignored| ignored == ext)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloneConfig {
    #[serde(default = "default_shallow")]
    pub shallow: bool,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_clone_timeout_secs")]
    pub timeout_secs: u64,
    /// Parent directory for temporary local copies. Defaults to the system
    /// temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            shallow: default_shallow(),
            branch: None,
            timeout_secs: default_clone_timeout_secs(),
            work_dir: None,
        }
    }
}

fn default_shallow() -> bool {
    true
}
fn default_clone_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    3
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.scan.max_chars_per_file == 0 {
        anyhow::bail!("scan.max_chars_per_file must be > 0");
    }
    if config.scan.max_snapshot_chars == 0 {
        anyhow::bail!("scan.max_snapshot_chars must be > 0");
    }
    if let Some(ext) = config
        .scan
        .ignore_extensions
        .iter()
        .find(|ext| !ext.starts_with('.') || ext.len() < 2)
    {
        anyhow::bail!(
            "scan.ignore_extensions entries must look like '.ext', got '{}'",
            ext
        );
    }

    match config.generation.provider.as_str() {
        "disabled" | "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled, gemini, or openai.",
            other
        ),
    }

    if config.generation.is_enabled() && config.generation.model.trim().is_empty() {
        anyhow::bail!(
            "generation.model must be specified when provider is '{}'",
            config.generation.provider
        );
    }

    Ok(())
}
