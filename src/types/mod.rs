// ABOUTME: Validated domain types.
// ABOUTME: Application names and timestamp release identifiers.

mod app_name;
mod release_id;

pub use app_name::{AppName, AppNameError};
pub use release_id::{RELEASE_ID_LEN, ReleaseId, ReleaseIdError};
pub(crate) use release_id::format_timestamp;
