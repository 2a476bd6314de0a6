// ABOUTME: Deploy lock that keeps two deployers off the same deploy target.
// ABOUTME: Atomic lock file creation in the deploy directory, with JSON holder info.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::{Diagnostics, Warning};
use crate::release::Layout;
use crate::remote::{RemoteExecutor, shell};
use crate::types::AppName;

/// Locks older than this are broken automatically.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("deploy lock on {host} held by {holder} (pid {pid}) since {started_at}")]
    Held {
        host: String,
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("deploy lock on {host}: {reason}")]
    Failed { host: String, reason: String },
}

impl LockError {
    fn failed(host: &str, reason: impl Into<String>) -> Self {
        LockError::Failed {
            host: host.to_string(),
            reason: reason.into(),
        }
    }
}

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Application being deployed.
    pub application: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(application: &AppName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            application: application.to_string(),
        }
    }

    /// Check if this lock is older than `stale_after`.
    pub fn is_stale(&self, stale_after: Duration) -> bool {
        let age = Utc::now() - self.started_at;
        match chrono::Duration::from_std(stale_after) {
            Ok(limit) => age >= limit,
            Err(_) => false,
        }
    }
}

/// How to treat a lock that is already held.
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Break any existing lock.
    pub force: bool,
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            force: false,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

/// A held deploy lock on one host.
pub struct DeployLock<'a, R: ?Sized> {
    exec: &'a R,
    host: String,
    path: String,
}

impl<R: ?Sized> std::fmt::Debug for DeployLock<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployLock")
            .field("host", &self.host)
            .field("path", &self.path)
            .finish()
    }
}

impl<'a, R: RemoteExecutor + ?Sized> DeployLock<'a, R> {
    /// Acquire the deploy lock on `host`.
    ///
    /// Uses shell noclobber mode so creation is atomic. Stale locks are broken
    /// with a warning, and so is any lock when `options.force` is set.
    pub async fn acquire(
        exec: &'a R,
        host: &str,
        layout: &Layout,
        application: &AppName,
        options: &LockOptions,
    ) -> Result<Self, LockError> {
        let path = layout.lock_path();

        exec.run_on_host(host, &format!("mkdir -p {}", shell::quote(layout.deploy_to())))
            .await
            .map_err(|e| LockError::failed(host, format!("failed to create deploy directory: {}", e)))?;

        let info = LockInfo::new(application);
        let json = serde_json::to_string(&info)
            .map_err(|e| LockError::failed(host, format!("failed to serialize lock: {}", e)))?;
        // set -C makes > fail if the file already exists
        let acquire_cmd = format!(
            "(set -C; printf '%s\\n' {} > {}) 2>/dev/null",
            shell::quote(&json),
            shell::quote(&path)
        );

        if Self::try_create(exec, host, &acquire_cmd).await? {
            return Ok(Self::held(exec, host, path));
        }

        if let Some(existing) = Self::check_existing(exec, host, &path, options).await? {
            return Err(LockError::Held {
                host: host.to_string(),
                holder: existing.holder,
                pid: existing.pid,
                started_at: existing.started_at,
            });
        }

        tracing::debug!(host, "removing stale or forced lock at {}", path);
        exec.run_on_host(host, &format!("rm -f {}", shell::quote(&path)))
            .await
            .map_err(|e| LockError::failed(host, format!("failed to break lock: {}", e)))?;

        if !Self::try_create(exec, host, &acquire_cmd).await? {
            return Err(LockError::failed(
                host,
                "lock acquired by another process during break",
            ));
        }
        Ok(Self::held(exec, host, path))
    }

    fn held(exec: &'a R, host: &str, path: String) -> Self {
        tracing::debug!(host, "acquired deploy lock");
        Self {
            exec,
            host: host.to_string(),
            path,
        }
    }

    async fn try_create(exec: &R, host: &str, command: &str) -> Result<bool, LockError> {
        let output = exec
            .exec(host, command)
            .await
            .map_err(|e| LockError::failed(host, format!("failed to acquire lock: {}", e)))?;
        Ok(output.success())
    }

    /// Returns the holder when the existing lock must be respected, `None`
    /// when it should be broken.
    async fn check_existing(
        exec: &R,
        host: &str,
        path: &str,
        options: &LockOptions,
    ) -> Result<Option<LockInfo>, LockError> {
        let output = exec
            .exec(host, &format!("cat {}", shell::quote(path)))
            .await
            .map_err(|e| LockError::failed(host, format!("failed to read lock info: {}", e)))?;

        if !output.success() {
            tracing::warn!(host, "lock info unreadable, breaking lock");
            return Ok(None);
        }

        match serde_json::from_str::<LockInfo>(output.stdout.trim()) {
            Ok(existing) if options.force => {
                tracing::warn!(
                    host,
                    "breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(None)
            }
            Ok(existing) if existing.is_stale(options.stale_after) => {
                tracing::warn!(
                    host,
                    "auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(None)
            }
            Ok(existing) => Ok(Some(existing)),
            Err(_) => {
                tracing::warn!(host, "lock info corrupted, breaking lock");
                Ok(None)
            }
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Release the lock.
    pub async fn release(self) -> Result<(), LockError> {
        self.exec
            .run_on_host(&self.host, &format!("rm -f {}", shell::quote(&self.path)))
            .await
            .map_err(|e| LockError::failed(&self.host, format!("failed to remove lock: {}", e)))?;
        Ok(())
    }
}

/// Deploy locks held on a group of hosts.
#[derive(Debug)]
pub struct LockSet<'a, R: ?Sized> {
    locks: Vec<DeployLock<'a, R>>,
}

impl<'a, R: RemoteExecutor + ?Sized> LockSet<'a, R> {
    /// Lock every host in order. If one host refuses, the locks already taken
    /// are released again.
    pub async fn acquire(
        exec: &'a R,
        hosts: &[String],
        layout: &Layout,
        application: &AppName,
        options: &LockOptions,
    ) -> Result<Self, LockError> {
        let mut locks = Vec::with_capacity(hosts.len());
        for host in hosts {
            match DeployLock::acquire(exec, host, layout, application, options).await {
                Ok(lock) => locks.push(lock),
                Err(e) => {
                    for lock in locks {
                        if let Err(release) = lock.release().await {
                            tracing::warn!("{}", release);
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self { locks })
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Release every lock, returning the ones that could not be removed.
    pub async fn release(self) -> Vec<LockError> {
        let mut failures = Vec::new();
        for lock in self.locks {
            if let Err(e) = lock.release().await {
                failures.push(e);
            }
        }
        failures
    }
}

/// Run `work` while holding the deploy lock on `hosts`.
///
/// The lock is released whether or not `work` succeeds. A failed release is
/// recorded in `diag` and does not change the result.
pub async fn with_lock<R, F, Fut, T, E>(
    exec: &R,
    hosts: &[String],
    layout: &Layout,
    application: &AppName,
    options: &LockOptions,
    diag: &mut Diagnostics,
    work: F,
) -> Result<T, E>
where
    R: RemoteExecutor + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<LockError>,
{
    let locks = LockSet::acquire(exec, hosts, layout, application, options).await?;
    let result = work().await;
    for failure in locks.release().await {
        diag.warn(Warning::lock_release(failure.to_string()));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LocalExecutor;

    fn app() -> AppName {
        AppName::new("shop").unwrap()
    }

    #[test]
    fn lock_info_creates_with_current_host_and_pid() {
        let info = LockInfo::new(&app());

        assert_eq!(info.application, "shop");
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
    }

    #[test]
    fn fresh_lock_is_not_stale() {
        assert!(!LockInfo::new(&app()).is_stale(DEFAULT_STALE_AFTER));
    }

    #[test]
    fn old_lock_is_stale() {
        let mut info = LockInfo::new(&app());
        info.started_at = Utc::now() - chrono::Duration::hours(2);
        assert!(info.is_stale(DEFAULT_STALE_AFTER));
        assert!(!info.is_stale(Duration::from_secs(3 * 60 * 60)));
    }

    #[tokio::test]
    async fn second_acquire_reports_holder() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("app").display().to_string());
        let local = LocalExecutor::default();
        let options = LockOptions::default();

        let lock = DeployLock::acquire(&local, "localhost", &layout, &app(), &options)
            .await
            .unwrap();
        let err = DeployLock::acquire(&local, "localhost", &layout, &app(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Held { pid, .. } if pid == std::process::id()));

        lock.release().await.unwrap();
        assert!(!dir.path().join("app/deploy.lock").exists());
    }

    #[tokio::test]
    async fn force_breaks_a_held_lock() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("app").display().to_string());
        let local = LocalExecutor::default();

        let _held = DeployLock::acquire(&local, "localhost", &layout, &app(), &LockOptions::default())
            .await
            .unwrap();
        let forced = LockOptions {
            force: true,
            ..LockOptions::default()
        };
        let lock = DeployLock::acquire(&local, "localhost", &layout, &app(), &forced).await;
        assert!(lock.is_ok());
    }

    #[tokio::test]
    async fn corrupted_lock_is_broken() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("app");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("deploy.lock"), "garbage").unwrap();
        let layout = Layout::new(app_dir.display().to_string());

        let executor = LocalExecutor::default();
        let lock = DeployLock::acquire(
            &executor,
            "localhost",
            &layout,
            &app(),
            &LockOptions::default(),
        )
        .await;
        assert!(lock.is_ok());
    }

    #[tokio::test]
    async fn with_lock_releases_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().join("app").display().to_string());
        let local = LocalExecutor::default();
        let mut diag = Diagnostics::default();
        let hosts = local.all_hosts();

        let result: Result<(), LockError> = with_lock(
            &local,
            &hosts,
            &layout,
            &app(),
            &LockOptions::default(),
            &mut diag,
            || async { Err(LockError::failed("localhost", "work failed")) },
        )
        .await;

        assert!(result.is_err());
        assert!(!diag.has_warnings());
        assert!(!dir.path().join("app/deploy.lock").exists());
    }
}
