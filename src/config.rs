use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::trips::UserContext;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_aspect_ratio")]
    pub image_aspect_ratio: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub origin_country: String,
    #[serde(default = "default_monthly_savings")]
    pub monthly_savings: f64,
    #[serde(default = "default_initial_savings")]
    pub initial_savings: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub board_title: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub font_path: String,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
    #[serde(default = "default_board_path")]
    pub board_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub db_path: Option<String>,
    pub font_path: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/votum/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_key) = overrides.api_key {
            self.ai.api_key = api_key;
        }
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(font_path) = overrides.font_path {
            self.export.font_path = font_path;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_font_path(&self) -> Option<PathBuf> {
        let trimmed = self.export.font_path.trim();
        (!trimmed.is_empty()).then(|| expand_tilde(trimmed))
    }

    /// Copy safe to print or serve: an explicit API key is masked.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        if !config.ai.api_key.is_empty() {
            config.ai.api_key = "<redacted>".to_string();
        }
        config
    }

    pub fn initial_context(&self) -> UserContext {
        UserContext {
            origin_country: self.defaults.origin_country.clone(),
            monthly_savings: self.defaults.monthly_savings,
            initial_savings: self.defaults.initial_savings,
            currency: self.defaults.currency.clone(),
        }
    }

    pub fn default_template() -> String {
        let template = r#"[ai]
# Leave api_key empty to read it from the environment variable named below.
api_key = ""
api_key_env = "GEMINI_API_KEY"
base_url = "https://generativelanguage.googleapis.com/v1beta"
text_model = "gemini-3-flash-preview"
image_model = "gemini-2.5-flash-image"
image_aspect_ratio = "16:9"
timeout_secs = 120
connect_timeout_secs = 10

[storage]
db_path = "~/.local/share/votum/state.db"
max_value_bytes = 5000000
debounce_ms = 1000

[defaults]
origin_country = ""
monthly_savings = 500.0
initial_savings = 1000.0
currency = "$"

[export]
# year = 2026
board_title = ""
theme = "votum"
font_path = ""
jpeg_quality = 95
csv_path = "VOTUM_Plan_Maestro.csv"
board_path = "VOTUM_Vision_Board.jpg"

[server]
host = "127.0.0.1"
port = 3001
"#;
        template.to_string()
    }
}

impl AiConfig {
    /// Explicit key wins; otherwise the configured environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        let explicit = self.api_key.trim();
        if !explicit.is_empty() {
            return Some(explicit.to_string());
        }
        std::env::var(&self.api_key_env)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

impl ExportConfig {
    pub fn resolved_year(&self) -> i32 {
        self.year.unwrap_or_else(|| chrono::Local::now().year())
    }

    pub fn resolved_board_title(&self) -> String {
        let trimmed = self.board_title.trim();
        if trimmed.is_empty() {
            format!("MI MAPA DE POSIBILIDADES {}", self.resolved_year())
        } else {
            trimmed.to_string()
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            image_aspect_ratio: default_aspect_ratio(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_value_bytes: default_max_value_bytes(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            origin_country: String::new(),
            monthly_savings: default_monthly_savings(),
            initial_savings: default_initial_savings(),
            currency: default_currency(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            year: None,
            board_title: String::new(),
            theme: default_theme(),
            font_path: String::new(),
            jpeg_quality: default_jpeg_quality(),
            csv_path: default_csv_path(),
            board_path: default_board_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_db_path() -> String {
    "~/.local/share/votum/state.db".to_string()
}

fn default_max_value_bytes() -> usize {
    5_000_000
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_monthly_savings() -> f64 {
    500.0
}

fn default_initial_savings() -> f64 {
    1000.0
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_theme() -> String {
    "votum".to_string()
}

fn default_jpeg_quality() -> u8 {
    95
}

fn default_csv_path() -> String {
    "VOTUM_Plan_Maestro.csv".to_string()
}

fn default_board_path() -> String {
    "VOTUM_Vision_Board.jpg".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("template parses");
        assert_eq!(parsed.ai.text_model, "gemini-3-flash-preview");
        assert_eq!(parsed.storage.debounce_ms, 1000);
        assert_eq!(parsed.defaults.currency, "$");
        assert_eq!(parsed.server.port, 3001);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let parsed: Config = toml::from_str("[export]\nyear = 2026\n").unwrap();
        assert_eq!(parsed.export.resolved_year(), 2026);
        assert_eq!(parsed.export.resolved_board_title(), "MI MAPA DE POSIBILIDADES 2026");
        assert_eq!(parsed.export.jpeg_quality, 95);
        assert!((parsed.defaults.initial_savings - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            api_key: Some("k".to_string()),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.ai.resolved_api_key().as_deref(), Some("k"));
        assert_eq!(config.storage.db_path, default_db_path());
        assert!(config.resolved_font_path().is_none());
    }

    #[test]
    fn redacted_masks_only_the_api_key() {
        let mut config = Config::default();
        assert_eq!(config.redacted().ai.api_key, "");

        config.ai.api_key = "secret-key".to_string();
        let shown = config.redacted();
        assert_eq!(shown.ai.api_key, "<redacted>");
        assert_eq!(shown.ai.text_model, config.ai.text_model);
        assert!(!serde_json::to_string(&shown).unwrap().contains("secret-key"));
        assert_eq!(config.ai.api_key, "secret-key");
    }
}
