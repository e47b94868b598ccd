//! Pushing the local queue to the server.

use anyhow::Result;
use gatelog_core::ingest::MAX_BATCH_SIZE;

use crate::{client::ApiClient, queue::Queue};

/// Outcome of one `sync` run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub sent:      usize,
  pub confirmed: usize,
  /// Records still unsynced afterwards.
  pub remaining: u64,
}

/// Send every pending record, at most [`MAX_BATCH_SIZE`] per request.
///
/// Only ids the server confirms are marked synced. The first failed request
/// stops the run; whatever was not confirmed stays queued for the next one.
pub async fn sync(queue: &Queue, client: &ApiClient) -> Result<SyncReport> {
  let mut report = SyncReport::default();

  loop {
    let batch = queue.pending(MAX_BATCH_SIZE).await?;
    if batch.is_empty() {
      break;
    }
    let size = batch.len();
    report.sent += size;

    let receipt = client.submit(batch).await?;
    let marked = queue.mark_synced(&receipt.confirmed).await?;
    report.confirmed += marked;
    tracing::info!(sent = size, confirmed = marked, "batch synced");

    // A partial confirmation would otherwise resend the same records forever.
    if marked < size {
      tracing::warn!(unconfirmed = size - marked, "server did not confirm every record");
      break;
    }
  }

  report.remaining = queue.pending_count().await?;
  Ok(report)
}
