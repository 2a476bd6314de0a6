// ABOUTME: Server host-key verification against the user's known_hosts file.
// ABOUTME: Strict hosts must already be known; trust-first hosts are learned on first sight.

use russh::client;
use russh::keys::known_hosts::{check_known_hosts, learn_known_hosts};
use russh::keys::ssh_key;

/// What to do with a host that known_hosts has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyPolicy {
    #[default]
    Strict,
    TrustFirstUse,
}

/// Outcome of looking a server key up in known_hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    Known,
    Unknown,
    Changed,
    Unreadable,
}

impl Lookup {
    fn of(result: Result<bool, russh::keys::Error>) -> Self {
        match result {
            Ok(true) => Lookup::Known,
            Ok(false) => Lookup::Unknown,
            Err(russh::keys::Error::KeyChanged { .. }) => Lookup::Changed,
            Err(_) => Lookup::Unreadable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Accept,
    Learn,
    Reject,
}

impl HostKeyPolicy {
    pub(crate) fn judge(self, lookup: Lookup) -> Verdict {
        match (lookup, self) {
            (Lookup::Known, _) => Verdict::Accept,
            // a changed key is never accepted, whatever the policy
            (Lookup::Changed, _) => Verdict::Reject,
            (Lookup::Unknown | Lookup::Unreadable, HostKeyPolicy::TrustFirstUse) => Verdict::Learn,
            (Lookup::Unknown | Lookup::Unreadable, HostKeyPolicy::Strict) => Verdict::Reject,
        }
    }
}

/// russh handler that applies a [`HostKeyPolicy`] to one host.
pub(crate) struct Verifier {
    pub host: String,
    pub port: u16,
    pub policy: HostKeyPolicy,
}

impl client::Handler for Verifier {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        let lookup = Lookup::of(check_known_hosts(&self.host, self.port, server_public_key));
        match self.policy.judge(lookup) {
            Verdict::Accept => Ok(true),
            Verdict::Learn => {
                tracing::warn!(host = %self.host, port = self.port, "trusting unseen host key");
                if let Err(e) = learn_known_hosts(&self.host, self.port, server_public_key) {
                    tracing::warn!(host = %self.host, error = %e, "could not record host key");
                }
                Ok(true)
            }
            Verdict::Reject => {
                if lookup == Lookup::Changed {
                    tracing::error!(host = %self.host, port = self.port, "host key changed");
                }
                Ok(false)
            }
        }
    }
}
