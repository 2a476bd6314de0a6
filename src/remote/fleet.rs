// ABOUTME: SSH-backed executor holding one session per configured server.
// ABOUTME: Resolves role membership from the server list in configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use snafu::ResultExt;

use super::error::{PushSnafu, RemoteError, TransportSnafu, UnknownHostSnafu, UnknownRoleSnafu};
use super::executor::{FileSync, RemoteExecutor};
use super::shell;
use crate::config::ServerConfig;
use crate::ssh::{CommandOutput, Session};

struct Member {
    name: String,
    session: Session,
}

/// Connected sessions for every server of a deploy target.
pub struct Fleet {
    members: Vec<Member>,
    roles: BTreeMap<String, Vec<String>>,
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet")
            .field("hosts", &self.all_hosts())
            .field("roles", &self.roles)
            .finish()
    }
}

impl Fleet {
    /// Connect to every server concurrently.
    pub async fn connect<'a, I>(servers: I, command_timeout: Duration) -> Result<Self, RemoteError>
    where
        I: IntoIterator<Item = &'a ServerConfig>,
    {
        let servers: Vec<&ServerConfig> = servers.into_iter().collect();

        let connects = servers.iter().map(|server| async move {
            let config = server.ssh_session_config().command_timeout(command_timeout);
            Session::connect(config)
                .await
                .context(TransportSnafu { host: server.name() })
        });
        let sessions = futures::future::try_join_all(connects).await?;

        let mut roles: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let members = servers
            .iter()
            .zip(sessions)
            .map(|(server, session)| {
                let name = server.name();
                for role in server.roles() {
                    roles.entry(role.to_string()).or_default().push(name.clone());
                }
                Member { name, session }
            })
            .collect();

        Ok(Self { members, roles })
    }

    fn session(&self, host: &str) -> Result<&Session, RemoteError> {
        self.members
            .iter()
            .find(|m| m.name == host)
            .map(|m| &m.session)
            .ok_or_else(|| UnknownHostSnafu { host }.build())
    }

    /// Disconnect every session, returning the hosts that failed to close cleanly.
    pub async fn disconnect(self) -> Vec<(String, crate::ssh::Error)> {
        let mut failures = Vec::new();
        for member in self.members {
            if let Err(e) = member.session.disconnect().await {
                failures.push((member.name, e));
            }
        }
        failures
    }
}

#[async_trait]
impl RemoteExecutor for Fleet {
    fn hosts(&self, role: &str) -> Result<Vec<String>, RemoteError> {
        match self.roles.get(role) {
            Some(hosts) if !hosts.is_empty() => Ok(hosts.clone()),
            _ => UnknownRoleSnafu { role }.fail(),
        }
    }

    fn all_hosts(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    async fn exec(&self, host: &str, command: &str) -> Result<CommandOutput, RemoteError> {
        self.session(host)?
            .exec(command)
            .await
            .context(TransportSnafu { host })
    }
}

#[async_trait]
impl FileSync for Fleet {
    async fn push(&self, host: &str, local: &Path, remote_path: &str) -> Result<(), RemoteError> {
        let data = tokio::fs::read(local).await.context(PushSnafu {
            host,
            path: local.display().to_string(),
        })?;

        let command = format!(
            "mkdir -p {} && cat > {}",
            shell::quote(shell::parent(remote_path)),
            shell::quote(remote_path)
        );
        let output = self
            .session(host)?
            .exec_with_stdin(&command, &data)
            .await
            .context(TransportSnafu { host })?;

        if !output.success() {
            return Err(RemoteError::Transport {
                host: host.to_string(),
                source: crate::ssh::Error::UploadFailed {
                    path: remote_path.to_string(),
                    reason: output.stderr.trim().to_string(),
                },
            });
        }
        Ok(())
    }
}
