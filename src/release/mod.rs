// ABOUTME: Release lifecycle: layout, update-then-commit, rollback and retention.
// ABOUTME: Exports the type-state Release and the operations on the release set.

mod adhoc;
mod batch;
mod cleanup;
mod directory;
mod error;
mod finalize;
mod layout;
mod reconcile;
mod rollback;
mod set;
mod settings;
mod setup;
mod shared;
mod state;
mod status;
mod update;

pub use adhoc::{collect_upload_files, invoke, upload};
pub use batch::{CommandBatch, Step, StepPolicy};
pub use cleanup::{CleanupPlan, CleanupReport, cleanup};
pub use directory::{RELEASE_EXISTS_STATUS, create_release_directory, directory_batch};
pub use error::{ReleaseError, ReleaseErrorKind};
pub use finalize::{RevisionLogEntry, acting_user, finalize_batch, finalize_current};
pub use layout::{
    CURRENT_LINK, Layout, PARTIAL_SUFFIX, RELEASES_DIR, REVISION_LOG, SCM_DIR, SHARED_DIR,
};
pub use reconcile::{ReconcileReport, reconcile};
pub use rollback::{RollbackOutcome, rollback_batch, rollback_to_previous};
pub use set::{ReleaseSet, current_release, current_releases};
pub use settings::{DEFAULT_KEEP_RELEASES, DEFAULT_UMASK, ReleaseSettings};
pub use setup::{setup, setup_batch};
pub use shared::{link_shared_paths, shared_link_batch};
pub use state::{Created, Linked, Live, Populated, Release};
pub use status::{HostStatus, status};
pub use update::{discard, discard_batch, update, update_batch};
