// ABOUTME: Test support utilities.
// ABOUTME: Provides tracing setup and an on-disk deploy target driven through the local shell.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use chrono::{DateTime, Duration, TimeZone, Utc};
use shipyard::release::{Layout, ReleaseSettings};
use shipyard::scm::Directory;
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("shipyard=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Instant `offset_secs` after 2024-01-01T00:00:00Z.
#[allow(dead_code)]
pub fn clock(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs)
}

/// A deploy target in a temp directory with a prebuilt source tree.
///
/// Layout: `<tmp>/source` holds the files to deploy, `<tmp>/app` is deploy_to.
#[allow(dead_code)]
pub struct Target {
    pub dir: TempDir,
    pub settings: ReleaseSettings,
}

#[allow(dead_code)]
impl Target {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("bin")).unwrap();
        fs::write(source.join("index.html"), "hello\n").unwrap();
        fs::write(source.join("bin/start"), "#!/bin/sh\n").unwrap();

        let layout = Layout::new(dir.path().join("app").to_str().unwrap());
        let mut settings = ReleaseSettings::new(
            layout,
            Arc::new(Directory::new(source.to_str().unwrap())),
        );
        settings
            .shared_paths
            .insert("log".to_string(), "log".to_string());

        Self { dir, settings }
    }

    pub fn deploy_to(&self) -> PathBuf {
        PathBuf::from(self.settings.layout.deploy_to())
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.deploy_to().join(relative)
    }

    /// Release directory names on disk, sorted. Markers are excluded.
    pub fn releases(&self) -> Vec<String> {
        entries(&self.path("releases"))
            .into_iter()
            .filter(|name| !name.ends_with(".partial"))
            .collect()
    }

    /// Partial markers on disk, sorted.
    pub fn markers(&self) -> Vec<String> {
        entries(&self.path("releases"))
            .into_iter()
            .filter(|name| name.ends_with(".partial"))
            .collect()
    }

    /// Release name `current` points at, if the link exists.
    pub fn current(&self) -> Option<String> {
        let target = fs::read_link(self.path("current")).ok()?;
        target
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
    }

    /// Lines of the revision log, empty when it does not exist.
    pub fn log_lines(&self) -> Vec<String> {
        fs::read_to_string(self.path("revisions.log"))
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Create a release directory directly on disk.
    pub fn fake_release(&self, id: &str) {
        fs::create_dir_all(self.path("releases").join(id)).unwrap();
    }

    /// Point `current` at a release directly on disk.
    pub fn point_current(&self, id: &str) {
        let link = self.path("current");
        let _ = fs::remove_file(&link);
        std::os::unix::fs::symlink(self.path("releases").join(id), link).unwrap();
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(read) => read
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
