// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles application names, server lists, umask and relative paths.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ServerConfig;
use crate::types::AppName;

pub fn deserialize_app_name<'de, D>(deserializer: D) -> Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_deploy_to<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    validate_deploy_to(&s).map_err(serde::de::Error::custom)?;
    Ok(s)
}

pub fn deserialize_deploy_to_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    if let Some(s) = &opt {
        validate_deploy_to(s).map_err(serde::de::Error::custom)?;
    }
    Ok(opt)
}

fn validate_deploy_to(s: &str) -> Result<(), String> {
    if !s.starts_with('/') {
        return Err(format!("deploy_to must be an absolute path: {}", s));
    }
    if Path::new(s).components().any(|c| c == Component::ParentDir) {
        return Err(format!("deploy_to cannot contain '..': {}", s));
    }
    Ok(())
}

/// Unquoted umasks like `022` arrive as YAML integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum UmaskValue {
    Text(String),
    Number(u64),
}

pub fn deserialize_umask<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = match UmaskValue::deserialize(deserializer)? {
        UmaskValue::Text(s) => s,
        UmaskValue::Number(n) => n.to_string(),
    };
    let valid = (1..=4).contains(&s.len()) && s.chars().all(|c| ('0'..='7').contains(&c));
    if !valid {
        return Err(serde::de::Error::custom(format!(
            "umask must be 1 to 4 octal digits: {}",
            s
        )));
    }
    Ok(s)
}

/// Relative path inside a release: not absolute and no `..`.
pub(crate) fn validate_relative(s: &str) -> Result<(), String> {
    let path = Path::new(s);
    if s.trim().is_empty() {
        return Err("path cannot be empty".to_string());
    }
    if path.is_absolute() {
        return Err(format!("path must be relative: {}", s));
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(format!("path cannot contain '..': {}", s));
    }
    Ok(())
}

pub fn deserialize_shared_paths<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let map: BTreeMap<String, String> = BTreeMap::deserialize(deserializer)?;
    for (name, relative) in &map {
        validate_relative(name)
            .and_then(|_| validate_relative(relative))
            .map_err(|e| serde::de::Error::custom(format!("shared path '{}': {}", name, e)))?;
    }
    Ok(map)
}

pub fn deserialize_relative_paths<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let paths: Vec<String> = Vec::deserialize(deserializer)?;
    for path in &paths {
        validate_relative(path).map_err(serde::de::Error::custom)?;
    }
    Ok(paths)
}

pub fn deserialize_servers<'de, D>(deserializer: D) -> Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<ServerEntry> = Vec::deserialize(deserializer)?;
    let servers = values
        .into_iter()
        .map(|entry| entry.into_server_config())
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(servers)
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

pub fn deserialize_servers_option<'de, D>(
    deserializer: D,
) -> Result<Option<NonEmpty<ServerConfig>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<Vec<ServerEntry>> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(values) => {
            let servers = values
                .into_iter()
                .map(|entry| entry.into_server_config())
                .collect::<Result<Vec<_>, _>>()
                .map_err(serde::de::Error::custom)?;

            let nonempty = NonEmpty::from_vec(servers).ok_or_else(|| {
                serde::de::Error::custom("destination servers list cannot be empty")
            })?;
            Ok(Some(nonempty))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> Result<ServerConfig, String> {
        match self {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        }
    }
}
