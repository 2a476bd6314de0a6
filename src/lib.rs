// ABOUTME: Library root for shipyard - release lifecycle over SSH.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod lock;
pub mod output;
pub mod release;
pub mod remote;
pub mod scm;
pub mod ssh;
pub mod types;
