//! Single overall deadline support: expiry and explicit cancellation share
//! one `CancellationToken` code path, rather than the traversal loop
//! needing a second timeout check at every suspension point.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Derives a child of `parent` that also cancels itself once `deadline`
/// elapses. Races `tokio::time::sleep` against the child's own
/// cancellation so an explicit cancel doesn't leave the sleep task dangling.
pub fn with_deadline(parent: &CancellationToken, deadline: Duration) -> CancellationToken {
    let child = parent.child_token();
    let guard = child.clone();
    tokio::spawn(async move {
        if guard.run_until_cancelled(tokio::time::sleep(deadline)).await.is_some() {
            guard.cancel();
        }
    });
    child
}
