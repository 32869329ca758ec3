//! Waiting on spawned tasks.
//!
//! Everything in the session runs on spawned tasks, so tests poll for the
//! outcome they expect instead of sleeping a fixed amount.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Give up polling after this long.
pub const LIMIT: Duration = Duration::from_secs(2);

const POLL: Duration = Duration::from_millis(1);

/// Poll `condition` until it holds. Returns false if it never did.
pub async fn until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + LIMIT;
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL).await;
    }
    true
}

/// Let every runnable task make progress before checking that something
/// did not happen.
pub async fn settle() {
    sleep(Duration::from_millis(20)).await;
}
