// cio - CLI for the Customer.io App API
// Copyright (C) 2024 The cio contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.customer.io";
pub const EU_BASE_URL: &str = "https://api-eu.customer.io";

pub const TOKEN_ENV: &str = "CUSTOMERIO_API_TOKEN";
pub const BASE_URL_ENV: &str = "CIO_BASE_URL";
pub const REGION_ENV: &str = "CIO_REGION";
pub const CONFIG_DIR_ENV: &str = "CIO_CONFIG_DIR";

/// API host selector. Anything other than `eu` means the default (US) host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "eu" => Region::Eu,
            _ => Region::Us,
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Region::Us => DEFAULT_BASE_URL,
            Region::Eu => EU_BASE_URL,
        }
    }
}

/// Optional settings persisted in `config.yaml` / `.cio.yaml`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error(
        "CUSTOMERIO_API_TOKEN environment variable is not set (or store one with `cio configure --token <token>`)"
    )]
    MissingToken,
}

/// Everything the request executor needs; fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
}

impl ClientConfig {
    /// Resolve from the process environment, falling back to the config file
    /// for the token only.
    pub fn from_env(region: Region, file: &Config) -> Result<Self, ConfigError> {
        Self::from_lookup(region, file, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(region: Region, file: &Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = non_empty(lookup(TOKEN_ENV))
            .or_else(|| non_empty(file.token.clone()))
            .ok_or(ConfigError::MissingToken)?;

        let base_url = base_url_from(region, &lookup);
        Ok(Self { base_url, token })
    }
}

/// `CIO_BASE_URL` verbatim when set, otherwise the region's host.
pub fn effective_base_url(region: Region) -> String {
    base_url_from(region, &|key: &str| env::var(key).ok())
}

fn base_url_from<F>(region: Region, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(BASE_URL_ENV)
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| region.base_url().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Region selector precedence: flag, `CIO_REGION`, config file, `us`.
pub fn resolve_region(flag: Option<&str>, env_value: Option<String>, file: &Config) -> String {
    flag.map(str::to_string)
        .or_else(|| non_empty(env_value))
        .or_else(|| non_empty(file.region.clone()))
        .unwrap_or_else(|| "us".to_string())
}

/// `abcd...wxyz` for tokens of 8+ characters, `***` otherwise.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".cio.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var(CONFIG_DIR_ENV) {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("cio").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    Config {
        token: local.token.or(user.token),
        region: local.region.or(user.region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn region_selector_is_permissive() {
        assert_eq!(Region::from_selector("eu"), Region::Eu);
        assert_eq!(Region::from_selector("us"), Region::Us);
        assert_eq!(Region::from_selector("asia"), Region::Us);
        assert_eq!(Region::from_selector("EU"), Region::Us);
        assert_eq!(Region::from_selector(""), Region::Us);
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        let err = ClientConfig::from_lookup(Region::Us, &Config::default(), lookup(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));

        let err = ClientConfig::from_lookup(
            Region::Us,
            &Config::default(),
            lookup(&[(TOKEN_ENV, "   ")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn region_picks_host_without_override() {
        let vars = [(TOKEN_ENV, "tok")];
        let us = ClientConfig::from_lookup(Region::Us, &Config::default(), lookup(&vars)).unwrap();
        assert_eq!(us.base_url, "https://api.customer.io");
        assert_eq!(us.token, "tok");

        let eu = ClientConfig::from_lookup(Region::Eu, &Config::default(), lookup(&vars)).unwrap();
        assert_eq!(eu.base_url, "https://api-eu.customer.io");

        let unknown = ClientConfig::from_lookup(
            Region::from_selector("asia"),
            &Config::default(),
            lookup(&vars),
        )
        .unwrap();
        assert_eq!(unknown.base_url, "https://api.customer.io");
    }

    #[test]
    fn base_url_override_wins_regardless_of_region() {
        let vars = [(TOKEN_ENV, "tok"), (BASE_URL_ENV, "http://127.0.0.1:9999")];
        for region in [Region::Us, Region::Eu] {
            let config =
                ClientConfig::from_lookup(region, &Config::default(), lookup(&vars)).unwrap();
            assert_eq!(config.base_url, "http://127.0.0.1:9999");
        }

        let empty = [(TOKEN_ENV, "tok"), (BASE_URL_ENV, "")];
        let config =
            ClientConfig::from_lookup(Region::Eu, &Config::default(), lookup(&empty)).unwrap();
        assert_eq!(config.base_url, EU_BASE_URL);
    }

    #[test]
    fn token_falls_back_to_config_file() {
        let file = Config {
            token: Some("file-token".into()),
            region: None,
        };
        let config = ClientConfig::from_lookup(Region::Us, &file, lookup(&[])).unwrap();
        assert_eq!(config.token, "file-token");

        let config =
            ClientConfig::from_lookup(Region::Us, &file, lookup(&[(TOKEN_ENV, "env-token")]))
                .unwrap();
        assert_eq!(config.token, "env-token");
    }

    #[test]
    fn region_precedence() {
        let file = Config {
            token: None,
            region: Some("eu".into()),
        };
        assert_eq!(resolve_region(Some("us"), Some("eu".into()), &file), "us");
        assert_eq!(resolve_region(None, Some("asia".into()), &file), "asia");
        assert_eq!(resolve_region(None, None, &file), "eu");
        assert_eq!(resolve_region(None, None, &Config::default()), "us");
    }

    #[test]
    fn masks_tokens() {
        assert_eq!(mask_token("abcdefghijkl"), "abcd...ijkl");
        assert_eq!(mask_token("short"), "***");
    }

    #[test]
    fn merges_user_and_local_files() {
        let _guard = ENV_LOCK.lock().unwrap();
        let cwd = tempdir().unwrap();
        unsafe {
            env::set_var(CONFIG_DIR_ENV, cwd.path().join("config"));
        }

        let user_cfg = Config {
            token: Some("user-token".into()),
            region: Some("eu".into()),
        };
        save(Scope::User, &user_cfg, cwd.path()).unwrap();

        let local_cfg = Config {
            token: Some("local-token".into()),
            region: None,
        };
        save(Scope::Local, &local_cfg, cwd.path()).unwrap();

        let merged = load(cwd.path()).unwrap();
        assert_eq!(merged.token.as_deref(), Some("local-token"));
        assert_eq!(merged.region.as_deref(), Some("eu"));

        assert_eq!(load_scope(Scope::User, cwd.path()).unwrap(), user_cfg);
        assert_eq!(load_scope(Scope::Local, cwd.path()).unwrap(), local_cfg);
    }

    #[test]
    fn missing_files_load_as_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        let cwd = tempdir().unwrap();
        unsafe {
            env::set_var(CONFIG_DIR_ENV, cwd.path().join("nowhere"));
        }
        assert_eq!(load(cwd.path()).unwrap(), Config::default());
    }
}
