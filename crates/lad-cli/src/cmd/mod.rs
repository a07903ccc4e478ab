//! Command implementations. Each returns the process exit code.

pub mod discover;
pub mod init;
pub mod keys;
pub mod serve;

/// Build the multi-threaded runtime for async commands.
pub(crate) fn runtime() -> Option<tokio::runtime::Runtime> {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => Some(rt),
        Err(e) => {
            crate::ui::error(&format!("Failed to start async runtime: {e}"));
            None
        }
    }
}
