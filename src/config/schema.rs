use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Backend routing table, given as three positional lists.
///
/// `models[i]` is served by `base_urls[i]` using credential `keys[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendsConfig {
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub base_urls: Vec<String>,
    #[serde(default)]
    pub keys: Vec<String>,
    /// Falls back to the first entry of `models` when unset.
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "default_prompts_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_function_call_file")]
    pub function_call: String,
    #[serde(default = "default_fix_json_file")]
    pub fix_json: String,
    /// Replace the first `&quot;` and the first `\_` in an extracted answer
    /// before parsing it.
    #[serde(default = "default_true")]
    pub normalize_artifacts: bool,
}

impl PromptsConfig {
    pub fn function_call_path(&self) -> PathBuf {
        self.dir.join(&self.function_call)
    }

    pub fn fix_json_path(&self) -> PathBuf {
        self.dir.join(&self.fix_json)
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: default_prompts_dir(),
            function_call: default_function_call_file(),
            fix_json: default_fix_json_file(),
            normalize_artifacts: true,
        }
    }
}

/// Response cache limits. Both unset means the cache grows without bound
/// and entries never expire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub max_entries: Option<usize>,
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_debug_dir")]
    pub dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_debug_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_function_call_file() -> String {
    "function_call.txt".to_string()
}

fn default_fix_json_file() -> String {
    "fix_json.txt".to_string()
}

fn default_true() -> bool {
    true
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("errors")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
