// ABOUTME: End-to-end tests of the release lifecycle against a local deploy target.
// ABOUTME: Covers update, compensation, rollback, cleanup, reconcile, status and upload.

mod support;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use shipyard::diagnostics::Diagnostics;
use shipyard::error::Error;
use shipyard::lock::{LockOptions, with_lock};
use shipyard::release::{
    ReleaseError, ReleaseErrorKind, cleanup, invoke, reconcile, rollback_to_previous, setup,
    status, update, upload,
};
use shipyard::remote::{LocalExecutor, RecordingExecutor, RemoteExecutor};
use shipyard::scm::Directory;
use shipyard::types::AppName;
use support::{Target, clock};

const R1: &str = "20240101000000";
const R2: &str = "20240101000100";

async fn deploy(target: &Target, exec: &LocalExecutor, offset_secs: i64, revision: &str) {
    update(exec, &target.settings, revision, "alice", clock(offset_secs))
        .await
        .unwrap();
}

mod updating {
    use super::*;

    /// Test: a successful update leaves a live release with shared links and one log line.
    #[tokio::test]
    async fn update_makes_release_current() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        setup(&exec, &target.settings).await.unwrap();

        let release = update(&exec, &target.settings, "abc123", "alice", clock(0))
            .await
            .unwrap();

        assert_eq!(release.id().as_str(), R1);
        assert_eq!(target.releases(), vec![R1.to_string()]);
        assert!(target.markers().is_empty());
        assert_eq!(target.current().as_deref(), Some(R1));
        assert_eq!(
            target.log_lines(),
            vec![format!("{} alice abc123 {}", R1, R1)]
        );

        let release_dir = target.path("releases").join(R1);
        assert_eq!(
            fs::read_to_string(release_dir.join("index.html")).unwrap(),
            "hello\n"
        );
        assert_eq!(
            fs::read_link(release_dir.join("log")).unwrap(),
            target.path("shared/log")
        );
    }

    /// Test: successive updates append to the log and move current forward.
    #[tokio::test]
    async fn second_update_appends_log() {
        let target = Target::new();
        let exec = LocalExecutor::default();

        deploy(&target, &exec, 0, "v1").await;
        deploy(&target, &exec, 60, "v2").await;

        assert_eq!(target.releases(), vec![R1.to_string(), R2.to_string()]);
        assert_eq!(target.current().as_deref(), Some(R2));
        let log = target.log_lines();
        assert_eq!(log.len(), 2);
        assert!(log[1].ends_with(&format!("v2 {}", R2)));
    }

    /// Test: a failing export removes the new release and leaves current alone.
    #[tokio::test]
    async fn failure_before_finalize_leaves_no_trace() {
        let mut target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        target.settings.source = Arc::new(Directory::new("/nonexistent/shipyard-source"));
        let err = update(&exec, &target.settings, "v2", "alice", clock(60))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ReleaseErrorKind::RemoteExecution);
        assert_eq!(target.releases(), vec![R1.to_string()]);
        assert!(target.markers().is_empty());
        assert_eq!(target.current().as_deref(), Some(R1));
        assert_eq!(target.log_lines().len(), 1);
    }

    /// Test: a failing first update leaves no release and no current link.
    #[tokio::test]
    async fn failed_first_update_creates_no_current() {
        let mut target = Target::new();
        let exec = LocalExecutor::default();
        target.settings.source = Arc::new(Directory::new("/nonexistent/shipyard-source"));

        assert!(
            update(&exec, &target.settings, "v1", "alice", clock(0))
                .await
                .is_err()
        );

        assert!(target.releases().is_empty());
        assert!(target.current().is_none());
        assert!(target.log_lines().is_empty());
    }

    /// Test: a failing log append after current moved restores the previous release.
    #[tokio::test]
    async fn failure_at_finalize_restores_previous_release() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        let log = target.path("revisions.log");
        fs::remove_file(&log).unwrap();
        fs::create_dir(&log).unwrap();

        let err = update(&exec, &target.settings, "v2", "alice", clock(60))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ReleaseErrorKind::Filesystem);
        assert_eq!(target.releases(), vec![R1.to_string()]);
        assert!(target.markers().is_empty());
        assert_eq!(target.current().as_deref(), Some(R1));
    }

    /// Test: a second update in the same second is refused and leaves the live release alone.
    #[tokio::test]
    async fn same_second_update_keeps_live_release() {
        let mut target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        target.settings.source = Arc::new(Directory::new("/nonexistent/shipyard-source"));
        let err = update(&exec, &target.settings, "v2", "alice", clock(0))
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::ReleaseExists { .. }));
        assert_eq!(err.kind(), ReleaseErrorKind::Precondition);
        assert_eq!(target.releases(), vec![R1.to_string()]);
        assert!(target.markers().is_empty());
        assert_eq!(target.current().as_deref(), Some(R1));
        assert_eq!(target.log_lines().len(), 1);
        assert_eq!(
            fs::read_to_string(target.path("releases").join(R1).join("index.html")).unwrap(),
            "hello\n"
        );
    }

    /// Test: a same-second update with a working source does not overwrite the release.
    #[tokio::test]
    async fn same_second_update_does_not_overwrite() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;
        fs::write(target.path("releases").join(R1).join("index.html"), "live\n").unwrap();

        let err = update(&exec, &target.settings, "v2", "alice", clock(0))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ReleaseErrorKind::Precondition);
        assert_eq!(
            fs::read_to_string(target.path("releases").join(R1).join("index.html")).unwrap(),
            "live\n"
        );
        assert_eq!(target.log_lines().len(), 1);
    }

    /// Test: a finalize failure restores the prior current even when a newer orphan exists.
    #[tokio::test]
    async fn failure_at_finalize_ignores_newer_orphan() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        let orphan = "20240101000200";
        target.fake_release(orphan);
        fs::write(target.path("releases").join(format!("{}.partial", orphan)), "").unwrap();
        let log = target.path("revisions.log");
        fs::remove_file(&log).unwrap();
        fs::create_dir(&log).unwrap();

        let err = update(&exec, &target.settings, "v2", "alice", clock(60))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ReleaseErrorKind::Filesystem);
        assert_eq!(target.current().as_deref(), Some(R1));
        assert_eq!(target.releases(), vec![R1.to_string(), orphan.to_string()]);
    }

    /// Test: the lock file exists only while the update runs.
    #[tokio::test]
    async fn update_under_lock_releases_it() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        let app = AppName::new("testapp").unwrap();
        let mut diag = Diagnostics::default();

        let (exec_ref, settings) = (&exec, &target.settings);
        let release = with_lock(
            &exec,
            &exec.all_hosts(),
            &target.settings.layout,
            &app,
            &LockOptions::default(),
            &mut diag,
            || async move {
                update(exec_ref, settings, "v1", "alice", clock(0))
                    .await
                    .map_err(Error::from)
            },
        )
        .await
        .unwrap();

        assert_eq!(release.id().as_str(), R1);
        assert!(!target.path("deploy.lock").exists());
        assert!(!diag.has_warnings());
    }

    /// Test: a dry run records commands and changes nothing on disk.
    #[tokio::test]
    async fn dry_run_changes_nothing() {
        let target = Target::new();
        let local = LocalExecutor::default();
        let recorder = RecordingExecutor::new(&local);

        update(&recorder, &target.settings, "v1", "alice", clock(0))
            .await
            .unwrap();

        assert!(!target.deploy_to().exists());
        let commands = recorder.commands();
        assert!(!commands.is_empty());
        assert!(commands.iter().all(|c| c.host == "localhost"));
        assert!(commands.iter().any(|c| c.command.contains("ln -s")));
    }
}

mod rolling_back {
    use super::*;

    /// Test: rollback points current at the previous release and deletes the newest.
    #[tokio::test]
    async fn rollback_restores_previous_release() {
        let mut target = Target::new();
        let exec = LocalExecutor::default();
        let restarted = target.dir.path().join("restarted");
        target.settings.restart = Some(format!("touch {}", restarted.display()));

        deploy(&target, &exec, 0, "v1").await;
        deploy(&target, &exec, 60, "v2").await;

        let outcomes = rollback_to_previous(&exec, &target.settings).await.unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].restored.as_str(), R1);
        assert_eq!(outcomes[0].removed.as_str(), R2);
        assert_eq!(target.current().as_deref(), Some(R1));
        assert_eq!(target.releases(), vec![R1.to_string()]);
        assert!(restarted.exists());
    }

    /// Test: rollback with a single release is refused and changes nothing.
    #[tokio::test]
    async fn rollback_without_prior_release_is_refused() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        let err = rollback_to_previous(&exec, &target.settings)
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::NoPriorRelease { found: 1, .. }));
        assert_eq!(err.kind(), ReleaseErrorKind::Precondition);
        assert_eq!(target.current().as_deref(), Some(R1));
        assert_eq!(target.releases(), vec![R1.to_string()]);
    }

    /// Test: rollback on an empty deploy root reports zero releases.
    #[tokio::test]
    async fn rollback_on_fresh_target_is_refused() {
        let target = Target::new();
        let exec = LocalExecutor::default();

        let err = rollback_to_previous(&exec, &target.settings)
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::NoPriorRelease { found: 0, .. }));
    }
}

mod retention {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("202401{:02}000000", i)).collect()
    }

    /// Test: cleanup removes the oldest releases beyond the keep count.
    #[tokio::test]
    async fn cleanup_keeps_newest() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        let all = ids(7);
        for id in &all {
            target.fake_release(id);
        }
        target.point_current(&all[6]);

        let reports = cleanup(&exec, &target.settings, 5).await.unwrap();

        let removed: Vec<&str> = reports[0].removed.iter().map(|id| id.as_str()).collect();
        assert_eq!(removed, vec![all[0].as_str(), all[1].as_str()]);
        assert_eq!(reports[0].kept, 5);
        assert_eq!(target.releases(), all[2..].to_vec());
        assert_eq!(target.current().as_deref(), Some(all[6].as_str()));
    }

    /// Test: a second cleanup with the same keep count is a no-op.
    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        for id in ids(7) {
            target.fake_release(&id);
        }

        cleanup(&exec, &target.settings, 5).await.unwrap();
        let reports = cleanup(&exec, &target.settings, 5).await.unwrap();

        assert!(reports[0].removed.is_empty());
        assert_eq!(target.releases().len(), 5);
    }

    /// Test: keep count zero deletes every release.
    #[tokio::test]
    async fn cleanup_with_zero_keep_removes_all() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        for id in ids(3) {
            target.fake_release(&id);
        }

        let reports = cleanup(&exec, &target.settings, 0).await.unwrap();

        assert_eq!(reports[0].removed.len(), 3);
        assert!(target.releases().is_empty());
    }

    /// Test: reconcile removes orphaned partial releases and unmarks the live one.
    #[tokio::test]
    async fn reconcile_removes_partial_releases() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        target.fake_release(R2);
        fs::write(target.path("releases").join(format!("{}.partial", R2)), "").unwrap();
        fs::write(target.path("releases").join(format!("{}.partial", R1)), "").unwrap();

        let reports = reconcile(&exec, &target.settings).await.unwrap();

        assert_eq!(reports[0].removed.len(), 1);
        assert_eq!(reports[0].removed[0].as_str(), R2);
        let unmarked: Vec<&str> = reports[0].unmarked.iter().map(|id| id.as_str()).collect();
        assert_eq!(unmarked, vec![R1]);
        assert_eq!(target.releases(), vec![R1.to_string()]);
        assert!(target.markers().is_empty());
        assert_eq!(target.current().as_deref(), Some(R1));
    }

    /// Test: reconcile with nothing partial reports nothing.
    #[tokio::test]
    async fn reconcile_clean_target_is_noop() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        let reports = reconcile(&exec, &target.settings).await.unwrap();

        assert!(reports[0].removed.is_empty());
        assert!(reports[0].unmarked.is_empty());
    }

    /// Test: a committed release that lost its marker cleanup survives reconcile.
    #[tokio::test]
    async fn reconcile_keeps_logged_release_with_stale_marker() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;
        deploy(&target, &exec, 60, "v2").await;
        fs::write(target.path("releases").join(format!("{}.partial", R1)), "").unwrap();

        let reports = reconcile(&exec, &target.settings).await.unwrap();

        assert!(reports[0].removed.is_empty());
        let unmarked: Vec<&str> = reports[0].unmarked.iter().map(|id| id.as_str()).collect();
        assert_eq!(unmarked, vec![R1]);
        assert_eq!(target.releases(), vec![R1.to_string(), R2.to_string()]);
        assert!(target.markers().is_empty());
    }

    /// Test: cleanup within the keep count dispatches no command at all.
    #[tokio::test]
    async fn cleanup_within_keep_count_makes_no_mutations() {
        let target = Target::new();
        let local = LocalExecutor::default();
        for id in ids(5) {
            target.fake_release(&id);
        }
        let recorder = RecordingExecutor::new(&local);

        let reports = cleanup(&recorder, &target.settings, 5).await.unwrap();

        assert!(reports[0].removed.is_empty());
        assert!(recorder.is_empty());
        assert_eq!(target.releases().len(), 5);
    }
}

mod operations {
    use super::*;

    /// Test: setup creates the layout and can run twice.
    #[tokio::test]
    async fn setup_is_idempotent() {
        let target = Target::new();
        let exec = LocalExecutor::default();

        setup(&exec, &target.settings).await.unwrap();
        setup(&exec, &target.settings).await.unwrap();

        assert!(target.path("releases").is_dir());
        assert!(target.path("shared/log").is_dir());
        assert!(target.path("scm").is_dir());
        assert!(target.current().is_none());
    }

    /// Test: status reports releases, current and the last log line.
    #[tokio::test]
    async fn status_reports_release_set() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;
        deploy(&target, &exec, 60, "v2").await;

        let statuses = status(&exec, &target.settings).await.unwrap();

        assert_eq!(statuses.len(), 1);
        let host = &statuses[0];
        assert_eq!(host.host, "localhost");
        assert_eq!(host.releases.len(), 2);
        assert_eq!(host.current.as_ref().map(|id| id.as_str()), Some(R2));
        assert!(host.partial.is_empty());
        let last = host.last_deploy.as_ref().unwrap();
        assert_eq!(last.revision, "v2");
        assert_eq!(last.user, "alice");
        assert_eq!(last.release.as_str(), R2);
    }

    /// Test: status on a fresh target is empty rather than an error.
    #[tokio::test]
    async fn status_on_fresh_target() {
        let target = Target::new();
        let exec = LocalExecutor::default();

        let statuses = status(&exec, &target.settings).await.unwrap();

        assert!(statuses[0].releases.is_empty());
        assert!(statuses[0].current.is_none());
        assert!(statuses[0].last_deploy.is_none());
    }

    /// Test: invoke runs the command on every host and collects output.
    #[tokio::test]
    async fn invoke_collects_output() {
        let exec = LocalExecutor::default();

        let outputs = invoke(&exec, &[], "echo hello").await.unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].output.stdout.trim(), "hello");
    }

    /// Test: upload copies files into the current release and skips hidden ones.
    #[tokio::test]
    async fn upload_copies_into_current_release() {
        let target = Target::new();
        let exec = LocalExecutor::default();
        deploy(&target, &exec, 0, "v1").await;

        let local = tempfile::Builder::new()
            .prefix("upload-")
            .tempdir_in(".")
            .unwrap();
        fs::write(local.path().join("settings.conf"), "mode=prod\n").unwrap();
        fs::write(local.path().join(".secret"), "hidden\n").unwrap();
        let relative = PathBuf::from(local.path().file_name().unwrap());

        let written = upload(&exec, &target.settings, &[relative.clone()])
            .await
            .unwrap();

        assert_eq!(written.len(), 1);
        let release_dir = target.path("releases").join(R1).join(&relative);
        assert_eq!(
            fs::read_to_string(release_dir.join("settings.conf")).unwrap(),
            "mode=prod\n"
        );
        assert!(!release_dir.join(".secret").exists());
    }
}
