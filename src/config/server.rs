// ABOUTME: Server configuration for SSH connections and role membership.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::remote::APP_ROLE;
use crate::ssh::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
    /// Private key used instead of the SSH agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
}

fn default_port() -> u16 {
    22
}

fn default_roles() -> Vec<String> {
    vec![APP_ROLE.to_string()]
}

fn default_trust_first_connection() -> bool {
    true
}

impl ServerConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = if let Some(at_pos) = s.find('@') {
            (Some(&s[..at_pos]), &s[at_pos + 1..])
        } else {
            (None, s)
        };

        let (host, port) = if let Some(colon_pos) = rest.rfind(':') {
            let port_str = &rest[colon_pos + 1..];
            let port = port_str
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {}", port_str))?;
            (&rest[..colon_pos], port)
        } else {
            (rest, 22)
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }
        if user_part.is_some_and(str::is_empty) {
            return Err("user cannot be empty".to_string());
        }

        Ok(ServerConfig {
            host: host.to_string(),
            port,
            user: user_part.map(|s| s.to_string()),
            roles: default_roles(),
            trust_first_connection: true,
            key: None,
        })
    }

    /// Name used for this server in role lists and output.
    pub fn name(&self) -> String {
        if self.port == 22 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// SSH user: the configured one, else the local user.
    pub fn ssh_user(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }

    pub fn ssh_session_config(&self) -> SessionConfig {
        let config = SessionConfig::new(&self.host, self.ssh_user())
            .port(self.port)
            .trust_on_first_use(self.trust_first_connection);
        match &self.key {
            Some(key) => config.key_path(key),
            None => config,
        }
    }
}
