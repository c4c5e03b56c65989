use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_CONFIG_FILE: &str = "uploader.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub service_url: String,
    pub upload_path: String,
    pub token_path: String,
    pub profile_path: String,
    pub credential_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".into(),
            upload_path: "/api/upload".into(),
            token_path: "/api/token".into(),
            profile_path: "/api/users/me".into(),
            credential_path: None,
            request_timeout_secs: 120,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    service_url: Option<String>,
    upload_path: Option<String>,
    token_path: Option<String>,
    profile_path: Option<String>,
    credential_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn upload_url(&self) -> Result<Url, ClientError> {
        self.endpoint(&self.upload_path)
    }

    pub fn token_url(&self) -> Result<Url, ClientError> {
        self.endpoint(&self.token_path)
    }

    pub fn profile_url(&self) -> Result<Url, ClientError> {
        self.endpoint(&self.profile_path)
    }

    /// Joins `path` onto the service base, keeping any path prefix the base
    /// already carries (`http://host/prefix` + `/api/upload`).
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let mut base = Url::parse(self.service_url.trim()).map_err(|e| {
            ClientError::Config(format!("invalid service_url '{}': {e}", self.service_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "service_url '{}' cannot be used as a base url",
                self.service_url
            )));
        }
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid endpoint path '{path}': {e}")))
    }

    pub fn credential_path(&self) -> PathBuf {
        self.credential_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("uploader")
                .join("credential.json")
        })
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.service_url {
            self.service_url = v;
        }
        if let Some(v) = file.upload_path {
            self.upload_path = v;
        }
        if let Some(v) = file.token_path {
            self.token_path = v;
        }
        if let Some(v) = file.profile_path {
            self.profile_path = v;
        }
        if let Some(v) = file.credential_path {
            self.credential_path = Some(v);
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.log_filter {
            self.log_filter = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("UPLOADER_SERVICE_URL") {
            self.service_url = v;
        }
        if let Some(v) = lookup("APP__SERVICE_URL") {
            self.service_url = v;
        }
        if let Some(v) = lookup("APP__CREDENTIAL_PATH") {
            self.credential_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.request_timeout_secs = parsed;
            }
        }
        if let Some(v) = lookup("APP__LOG_FILTER") {
            self.log_filter = v;
        }
    }
}

/// Loads settings from defaults, then the config file, then the environment.
///
/// An explicitly requested file must exist; the default `uploader.toml` is
/// optional.
pub fn load_settings(config_path: Option<&Path>) -> Result<ClientSettings, ClientError> {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    config_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, ClientError> {
    let mut settings = ClientSettings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg = toml::from_str::<FileSettings>(&raw).map_err(|e| {
                ClientError::Config(format!("failed to parse '{}': {e}", path.display()))
            })?;
            debug!(path = %path.display(), "config: loaded settings file");
            settings.apply_file(file_cfg);
        }
        Err(err) if required => {
            return Err(ClientError::Config(format!(
                "failed to read '{}': {err}",
                path.display()
            )));
        }
        Err(_) => {}
    }

    settings.apply_env(env);
    settings.upload_url()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
