// ABOUTME: Picks the credential a session authenticates with.
// ABOUTME: An explicit key wins, then the running agent, then the first readable default key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use russh::client::Handle;
use russh::keys::agent::client::AgentClient;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use tokio::net::UnixStream;

use super::error::{Error, Result};
use super::host_key::Verifier;

const DEFAULT_KEYS: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];

pub(crate) enum Credential {
    Agent(AgentClient<UnixStream>),
    Key(Arc<ssh_key::PrivateKey>),
}

/// Default private key locations under `home`, in preference order.
pub(crate) fn default_keys(home: &Path) -> Vec<PathBuf> {
    DEFAULT_KEYS
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .collect()
}

fn load(path: &Path) -> Result<Credential> {
    load_secret_key(path, None)
        .map(|key| Credential::Key(Arc::new(key)))
        .map_err(|e| Error::BadKey {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

impl Credential {
    pub(crate) async fn resolve(key_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = key_path {
            return load(path);
        }

        if let Ok(agent) = AgentClient::connect_env().await {
            return Ok(Credential::Agent(agent));
        }

        let home = std::env::var_os("HOME")
            .ok_or_else(|| Error::NoCredentials("no agent and HOME is unset".to_string()))?;
        default_keys(Path::new(&home))
            .iter()
            .find_map(|path| load(path).ok())
            .ok_or_else(|| Error::NoCredentials("no agent and no default key".to_string()))
    }

    /// Offer this credential for `user`. Returns whether the server accepted it.
    pub(crate) async fn offer(self, handle: &mut Handle<Verifier>, user: &str) -> Result<bool> {
        match self {
            Credential::Agent(mut agent) => {
                let identities = agent
                    .request_identities()
                    .await
                    .map_err(|e| Error::NoCredentials(format!("agent: {}", e)))?;
                if identities.is_empty() {
                    return Err(Error::NoCredentials("agent holds no keys".to_string()));
                }
                for identity in identities {
                    if let Ok(result) = handle
                        .authenticate_publickey_with(user, identity, None, &mut agent)
                        .await
                        && result.success()
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Credential::Key(key) => {
                let hash = handle.best_supported_rsa_hash().await?.flatten();
                let result = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash))
                    .await?;
                Ok(result.success())
            }
        }
    }
}
