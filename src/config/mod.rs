// ABOUTME: Configuration types and parsing for shipyard.yml.
// ABOUTME: Handles YAML parsing, validation, and destination merging.

mod deserialize;
mod init;
mod server;

pub use init::{init_config, template_yaml};
pub use server::ServerConfig;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::release::{DEFAULT_KEEP_RELEASES, DEFAULT_UMASK, Layout, ReleaseSettings};
use crate::remote::APP_ROLE;
use crate::scm::{Directory, Git, Source};
use crate::types::AppName;
use deserialize::{
    deserialize_app_name, deserialize_deploy_to, deserialize_deploy_to_option,
    deserialize_relative_paths, deserialize_servers, deserialize_servers_option,
    deserialize_shared_paths, deserialize_umask,
};

pub const CONFIG_FILENAME: &str = "shipyard.yml";
pub const CONFIG_FILENAME_ALT: &str = "shipyard.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".shipyard/config.yml";

/// How the release tree is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    /// Clone or fetch a git repository.
    #[default]
    Git,
    /// Copy a directory that already exists on each host.
    Copy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub application: AppName,

    #[serde(deserialize_with = "deserialize_deploy_to")]
    pub deploy_to: String,

    /// Repository URL for `git`, source directory for `copy`.
    pub repository: String,

    #[serde(default)]
    pub scm: ScmKind,

    #[serde(default = "default_revision")]
    pub revision: String,

    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    #[serde(default = "default_keep_releases")]
    pub keep_releases: usize,

    #[serde(default = "default_umask", deserialize_with = "deserialize_umask")]
    pub umask: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Export straight from the source instead of keeping a working copy.
    #[serde(default)]
    pub skip_scm: bool,

    #[serde(default, deserialize_with = "deserialize_shared_paths")]
    pub shared_paths: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "deserialize_relative_paths")]
    pub mkdirs: Vec<String>,

    /// Run on the app role after a rollback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    /// Locks older than this are considered stale.
    #[serde(default = "default_lock_timeout", with = "humantime_serde")]
    pub lock_timeout: Duration,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub destinations: BTreeMap<String, Destination>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Destination {
    #[serde(
        default,
        deserialize_with = "deserialize_servers_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub servers: Option<NonEmpty<ServerConfig>>,

    #[serde(
        default,
        deserialize_with = "deserialize_deploy_to_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deploy_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_releases: Option<usize>,
}

fn default_revision() -> String {
    "HEAD".to_string()
}

fn default_keep_releases() -> usize {
    DEFAULT_KEEP_RELEASES
}

fn default_umask() -> String {
    DEFAULT_UMASK.to_string()
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(60 * 60)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Checks that need more than one field.
    pub fn validate(&self) -> Result<()> {
        if self.repository.trim().is_empty() {
            return Err(Error::InvalidConfig("repository cannot be empty".to_string()));
        }
        if self.revision.trim().is_empty() {
            return Err(Error::InvalidConfig("revision cannot be empty".to_string()));
        }
        if self.scm == ScmKind::Copy && !self.repository.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "copy source must be an absolute directory: {}",
                self.repository
            )));
        }
        let mut names = std::collections::BTreeSet::new();
        for server in &self.servers {
            if server.roles.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "server {} has no roles",
                    server.host
                )));
            }
            if !names.insert(server.name()) {
                return Err(Error::InvalidConfig(format!(
                    "server listed twice: {}",
                    server.name()
                )));
            }
        }
        if !self.servers.iter().any(|s| s.has_role(APP_ROLE)) {
            return Err(Error::InvalidConfig(format!(
                "no server has the '{}' role",
                APP_ROLE
            )));
        }
        Ok(())
    }

    pub fn for_destination(&self, name: &str) -> Result<Config> {
        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref servers) = dest.servers {
            merged.servers = servers.clone();
        }
        if let Some(ref deploy_to) = dest.deploy_to {
            merged.deploy_to = deploy_to.clone();
        }
        if let Some(ref revision) = dest.revision {
            merged.revision = revision.clone();
        }
        if let Some(keep) = dest.keep_releases {
            merged.keep_releases = keep;
        }

        merged.validate()?;
        Ok(merged)
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.deploy_to)
    }

    pub fn source(&self) -> Arc<dyn Source> {
        match self.scm {
            ScmKind::Git => Arc::new(Git::new(&self.repository)),
            ScmKind::Copy => Arc::new(Directory::new(&self.repository)),
        }
    }

    /// Settings for the release lifecycle operations.
    pub fn release_settings(&self) -> ReleaseSettings {
        let mut settings = ReleaseSettings::new(self.layout(), self.source());
        settings.umask = self.umask.clone();
        settings.owner = self.owner.clone();
        settings.group = self.group.clone();
        settings.track_scm = !self.skip_scm;
        settings.shared_paths = self.shared_paths.clone();
        settings.mkdirs = self.mkdirs.clone();
        settings.keep_releases = self.keep_releases;
        settings.restart = self.restart.clone();
        settings
    }

    /// Servers that receive release updates.
    pub fn app_servers(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|s| s.has_role(APP_ROLE))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
