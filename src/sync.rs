//! Cross-tab synchronizer.
//!
//! Replays foreign storage writes into the local store so concurrently open
//! sessions observe a consistent-ish view without polling. Replication is
//! whole-collection replace, last writer wins: two tabs writing the same key
//! concurrently clobber each other, which is the accepted behavior of the
//! platform (see [`crate::store::Store::apply_change`]).

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::store::Store;

/// Drive `store` from foreign change notices until every other tab closes.
///
/// On channel lag the missed notices are irrecoverable, so the store reloads
/// every collection from the backend instead.
pub fn spawn(store: Arc<Store>) -> JoinHandle<()> {
    let mut changes = store.subscribe();

    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(notice) => store.apply_change(&notice),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change notices missed, reloading from storage");
                    store.reload();
                },
                Err(RecvError::Closed) => break,
            }
        }
    })
}
