use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Items per page for paged listings
  #[serde(default = "default_page_size")]
  pub page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the catalog API
  #[serde(default = "default_api_url")]
  pub url: String,
}

fn default_api_url() -> String {
  "http://localhost:3001".to_string()
}

fn default_page_size() -> usize {
  10
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      page_size: default_page_size(),
    }
  }
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./reel.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/reel/config.yaml
  /// 4. ~/.config/reel/config.yaml
  ///
  /// With no file anywhere, defaults apply. REEL_API_URL overrides the
  /// configured API URL either way.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("REEL_API_URL") {
      if !url.is_empty() {
        config.api.url = url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("reel.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("reel").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the account password from the environment.
  ///
  /// Used by login and register when no --password flag is given.
  pub fn get_password() -> Result<String> {
    std::env::var("REEL_PASSWORD")
      .map_err(|_| eyre!("Password not found. Pass --password or set REEL_PASSWORD."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.api.url, "http://localhost:3001");
    assert_eq!(config.page_size, 10);
  }

  #[test]
  fn test_parse_full_config() {
    let yaml = "api:\n  url: https://catalog.example.com/api\npage_size: 25\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.api.url, "https://catalog.example.com/api");
    assert_eq!(config.page_size, 25);
  }

  #[test]
  fn test_partial_config_keeps_defaults() {
    let yaml = "api:\n  url: https://catalog.example.com\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.api.url, "https://catalog.example.com");
    assert_eq!(config.page_size, 10);
  }

  #[test]
  fn test_empty_config_is_all_defaults() {
    let config: Config = serde_yaml::from_str("{}").unwrap();

    assert_eq!(config.api.url, "http://localhost:3001");
    assert_eq!(config.page_size, 10);
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");

    let error = Config::load(Some(&missing)).unwrap_err();

    assert!(error.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reel.yaml");
    std::fs::write(&path, "page_size: 5\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.page_size, 5);
  }
}
