//! Attach-with-retry for the watch loop.

use std::sync::Arc;
use std::time::Duration;

use lookout_core::{MemoryReader, ProcessConfig, ProcessHandle, ShutdownSignal};
use tracing::{debug, info};

/// Wait until the configured process can be opened.
///
/// Returns `None` if shutdown was signaled first.
pub fn attach_with_retry(
    process: &ProcessConfig,
    retry: Duration,
    shutdown: &ShutdownSignal,
) -> Option<Arc<MemoryReader>> {
    let mut attempts = 0u32;
    loop {
        if shutdown.is_shutdown() {
            return None;
        }
        attempts += 1;

        match ProcessHandle::find_and_open(&process.name, &process.module) {
            Ok(handle) => {
                info!(
                    "Attached to {} (PID: {}, {} at {:#x})",
                    process.name, handle.pid, handle.module_name, handle.base_address
                );
                return Some(Arc::new(MemoryReader::new(Arc::new(handle))));
            }
            Err(e) => {
                if attempts == 1 {
                    info!("{}; retrying every {}s", e, retry.as_secs());
                } else {
                    debug!("Attach attempt {} failed: {}", attempts, e);
                }
            }
        }

        if shutdown.wait(retry) {
            return None;
        }
    }
}
