// ABOUTME: One authenticated SSH connection to a host, running commands on fresh channels.
// ABOUTME: Commands are bounded by a timeout and may stream a payload to stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Config, Handle};
use russh::{ChannelMsg, Disconnect};

use super::credential::Credential;
use super::error::{Error, Result};
use super::host_key::{HostKeyPolicy, Verifier};

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Explicit private key. Without one the agent and default keys are tried.
    pub key_path: Option<PathBuf>,
    pub host_keys: HostKeyPolicy,
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            host_keys: HostKeyPolicy::Strict,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, trust: bool) -> Self {
        self.host_keys = if trust {
            HostKeyPolicy::TrustFirstUse
        } else {
            HostKeyPolicy::Strict
        };
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// Exit status and captured streams of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Accumulates channel messages until both EOF and an exit status were seen.
#[derive(Debug, Default)]
struct Collector {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<u32>,
    eof: bool,
}

impl Collector {
    /// Feed one message. Returns true once the command is complete.
    fn feed(&mut self, msg: ChannelMsg) -> bool {
        match msg {
            ChannelMsg::Data { data } => self.stdout.extend_from_slice(&data),
            // ext 1 is stderr
            ChannelMsg::ExtendedData { data, ext: 1 } => self.stderr.extend_from_slice(&data),
            ChannelMsg::ExitStatus { exit_status } => self.exit_code = Some(exit_status),
            ChannelMsg::Eof => self.eof = true,
            ChannelMsg::Close => return true,
            _ => {}
        }
        self.eof && self.exit_code.is_some()
    }

    fn finish(self) -> Result<CommandOutput> {
        Ok(CommandOutput {
            exit_code: self.exit_code.ok_or(Error::NoExitStatus)?,
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
        })
    }
}

/// An authenticated connection. Safe to share across concurrent tasks.
pub struct Session {
    config: SessionConfig,
    handle: Arc<Handle<Verifier>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("user", &self.config.user)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credential = Credential::resolve(config.key_path.as_deref()).await?;

        let verifier = Verifier {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_keys,
        };
        let russh_config = Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        };
        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            verifier,
        )
        .await
        .map_err(|e| match e {
            russh::Error::UnknownKey => Error::HostKeyRejected {
                host: config.host.clone(),
                port: config.port,
            },
            other => Error::Unreachable {
                host: config.host.clone(),
                port: config.port,
                reason: other.to_string(),
            },
        })?;

        if !credential.offer(&mut handle, &config.user).await? {
            return Err(Error::NotAuthorized {
                user: config.user.clone(),
                host: config.host.clone(),
            });
        }

        tracing::debug!(host = %config.host, port = config.port, user = %config.user, "connected");
        Ok(Self {
            config,
            handle: Arc::new(handle),
        })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.bounded(command, None).await
    }

    /// Run `command` with `input` written to its stdin, then closed.
    pub async fn exec_with_stdin(&self, command: &str, input: &[u8]) -> Result<CommandOutput> {
        self.bounded(command, Some(input)).await
    }

    async fn bounded(&self, command: &str, input: Option<&[u8]>) -> Result<CommandOutput> {
        let limit = self.config.command_timeout;
        tokio::time::timeout(limit, self.run(command, input))
            .await
            .map_err(|_| Error::Timeout(limit))?
    }

    async fn run(&self, command: &str, input: Option<&[u8]>) -> Result<CommandOutput> {
        tracing::debug!(host = %self.config.host, "exec: {}", command);

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(Error::channel("open"))?;
        channel
            .exec(true, command)
            .await
            .map_err(Error::channel("exec"))?;

        if let Some(data) = input {
            channel.data(data).await.map_err(Error::channel("stdin"))?;
            channel.eof().await.map_err(Error::channel("eof"))?;
        }

        let mut collector = Collector::default();
        while let Some(msg) = channel.wait().await {
            if collector.feed(msg) {
                break;
            }
        }
        collector.finish()
    }

    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
