use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Application configuration, loaded from `adminterm.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Initial presentation mode: "dark" or "light".
    pub theme: String,
    /// Single timeout applied to every network-backed command, including
    /// `ws connect`. Timeouts surface as their own error kind.
    pub request_timeout_secs: u64,
    /// Opt-in for `code run` on javascript snippets. Off by default:
    /// running stored snippets executes arbitrary code in a subprocess.
    pub allow_run: bool,
    pub node_executable: String,
    /// Hard wall-clock limit for a single snippet execution.
    pub run_timeout_secs: u64,
    /// Directory for snippet run scripts and HTML previews.
    pub snippet_dir: String,
    /// `sudo` and `backup` may only touch paths under this root.
    pub write_root: String,
    pub venice_api_url: String,
    /// URL probed by the `network` command.
    pub connectivity_probe: String,
    pub log_dir: String,
    /// How many recent command timings `perf` reports.
    pub perf_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            request_timeout_secs: 10,
            allow_run: false,
            node_executable: "node".to_string(),
            run_timeout_secs: 30,
            snippet_dir: "snippets".to_string(),
            write_root: ".".to_string(),
            venice_api_url: "https://api.venice.ai/api/v1".to_string(),
            connectivity_probe: "https://one.one.one.one".to_string(),
            log_dir: "logs".to_string(),
            perf_window: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./adminterm.toml` -> `~/adminterm.toml` -> defaults.
    pub fn load() -> Self {
        let candidates = Self::config_paths();
        for path in &candidates {
            if let Ok(contents) = fs::read_to_string(path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("adminterm.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("adminterm.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.theme, "dark");
        assert_eq!(cfg.request_timeout_secs, 10);
        assert!(!cfg.allow_run);
        assert_eq!(cfg.node_executable, "node");
        assert_eq!(cfg.run_timeout_secs, 30);
        assert_eq!(cfg.snippet_dir, "snippets");
        assert_eq!(cfg.write_root, ".");
        assert_eq!(cfg.venice_api_url, "https://api.venice.ai/api/v1");
        assert_eq!(cfg.log_dir, "logs");
        assert_eq!(cfg.perf_window, 10);
    }

    #[test]
    fn test_partial_toml_deserialize() {
        let toml_str = r#"
            theme = "light"
            request_timeout_secs = 30
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.theme, "light");
        assert_eq!(cfg.request_timeout_secs, 30);
        // Other fields should be defaults
        assert!(!cfg.allow_run);
        assert_eq!(cfg.perf_window, 10);
    }

    #[test]
    fn test_full_toml_deserialize() {
        let toml_str = r#"
            theme = "light"
            request_timeout_secs = 5
            allow_run = true
            node_executable = "nodejs"
            run_timeout_secs = 60
            snippet_dir = "my_snippets"
            write_root = "project"
            venice_api_url = "https://example.com/v1"
            connectivity_probe = "https://example.org"
            log_dir = "my_logs"
            perf_window = 25
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.theme, "light");
        assert_eq!(cfg.request_timeout_secs, 5);
        assert!(cfg.allow_run);
        assert_eq!(cfg.node_executable, "nodejs");
        assert_eq!(cfg.run_timeout_secs, 60);
        assert_eq!(cfg.snippet_dir, "my_snippets");
        assert_eq!(cfg.write_root, "project");
        assert_eq!(cfg.venice_api_url, "https://example.com/v1");
        assert_eq!(cfg.connectivity_probe, "https://example.org");
        assert_eq!(cfg.log_dir, "my_logs");
        assert_eq!(cfg.perf_window, 25);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        // When no config file exists, load() returns defaults
        let cfg = AppConfig::load();
        assert_eq!(cfg.perf_window, AppConfig::default().perf_window);
    }
}
