// ABOUTME: Release state marker types for the type state pattern.
// ABOUTME: A release can only be finalized after it was populated and linked.

use std::marker::PhantomData;

use crate::types::ReleaseId;

use super::layout::Layout;

/// Directory created and marked in progress.
/// Available actions: `populate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Created;

/// Revision exported and permissions fixed.
/// Available actions: `link_shared()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Populated;

/// Shared paths linked into the release.
/// Available actions: `finalize()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Linked;

/// `current` points at the release and the revision log has its line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Live;

/// A release directory, parameterized by how far its update got.
///
/// Until it reaches [`Live`] the release is owned by the update that created
/// it and is deleted again if any later step fails.
#[derive(Debug, Clone)]
pub struct Release<S> {
    pub(crate) id: ReleaseId,
    pub(crate) path: String,
    pub(crate) _state: PhantomData<S>,
}

impl Release<Created> {
    pub(crate) fn new(layout: &Layout, id: ReleaseId) -> Self {
        Release {
            path: layout.release_path(&id),
            id,
            _state: PhantomData,
        }
    }
}

impl<S> Release<S> {
    pub fn id(&self) -> &ReleaseId {
        &self.id
    }

    /// Absolute path of the release directory on the hosts.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn transition<T>(self) -> Release<T> {
        Release {
            id: self.id,
            path: self.path,
            _state: PhantomData,
        }
    }
}
