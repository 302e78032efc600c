//! Environment-specific persistence hooks.
//!
//! SYNC, FETCH, and TEST only do real work in constrained sandboxed
//! execution environments (a browser-hosted filesystem that must be synced
//! to durable storage, a fetch-to-file shim). On an ordinary host they are
//! not available; the dispatch surface still exists so the command
//! vocabulary is uniform everywhere.

use sqlbook_error::{Result, SqlbookError};

/// Collaborator interface for the sandbox-only commands.
///
/// Implementations return a short status message for the user on success.
pub trait SandboxHooks {
    /// Persist the sandboxed filesystem to durable storage.
    fn sync(&mut self) -> Result<String>;

    /// Fetch `url` into the sandboxed file at `dest`.
    fn fetch(&mut self, url: &str, dest: &str) -> Result<String>;

    /// Environment self-test.
    fn self_test(&mut self) -> Result<String>;
}

/// Default host implementation: every hook reports itself unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostHooks;

impl SandboxHooks for HostHooks {
    fn sync(&mut self) -> Result<String> {
        Err(SqlbookError::Unsupported { operation: "SYNC" })
    }

    fn fetch(&mut self, _url: &str, _dest: &str) -> Result<String> {
        Err(SqlbookError::Unsupported { operation: "FETCH" })
    }

    fn self_test(&mut self) -> Result<String> {
        Err(SqlbookError::Unsupported { operation: "TEST" })
    }
}
