// The mirror loop: fetch -> compare -> map -> push -> sleep.
//
// State between cycles is a plain `SyncState` value passed in and handed
// back, so a single cycle can be driven and inspected from tests without
// any timers or HTTP involved.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use super::sync_models::{
    CycleOutcome, FetchDegraded, Payload, Row, SchemaError, SyncError, SyncState, UpdateTarget,
    REQUIRED_FIELDS,
};
use super::sync_ports::{SheetWriter, SnapshotSource, TokenSource};
use crate::core::credentials::AuthError;

/// True when `current` differs from the last synced payload.
///
/// Comparison is deep and order-sensitive: the same records in another order
/// count as a change. With no previous snapshot everything is a change.
pub fn has_changed(previous: Option<&Payload>, current: &Payload) -> bool {
    match previous {
        Some(previous) => previous != current,
        None => true,
    }
}

/// Flatten each record into `[column1, column2, column3]`, in payload order.
///
/// All-or-nothing: the first bad record fails the whole batch.
pub fn map_to_rows(payload: &Payload) -> Result<Vec<Row>, SchemaError> {
    payload
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| -> Result<Row, SchemaError> {
            let fields = record
                .as_object()
                .ok_or(SchemaError::NotAnObject { index })?;

            REQUIRED_FIELDS
                .iter()
                .map(|&field| {
                    fields
                        .get(field)
                        .cloned()
                        .ok_or(SchemaError::MissingField { index, field })
                })
                .collect()
        })
        .collect()
}

/// Drives the mirror. Generic over its three ports so tests can swap in fakes.
pub struct SyncService<F: SnapshotSource, W: SheetWriter, T: TokenSource> {
    source: F,
    writer: W,
    tokens: T,
    target: UpdateTarget,
    clear_before_write: bool,
}

impl<F, W, T> SyncService<F, W, T>
where
    F: SnapshotSource,
    W: SheetWriter,
    T: TokenSource,
{
    pub fn new(source: F, writer: W, tokens: T, target: UpdateTarget) -> Self {
        Self {
            source,
            writer,
            tokens,
            target,
            clear_before_write: false,
        }
    }

    /// Blank the whole target range before every write, so rows left over
    /// from a longer previous payload do not linger.
    pub fn with_clear_before_write(mut self, enabled: bool) -> Self {
        self.clear_before_write = enabled;
        self
    }

    /// Read the source. A degraded read is handed back with its reason so
    /// the caller can skip the cycle.
    pub async fn fetch_snapshot(&self) -> Result<Payload, FetchDegraded> {
        self.source.fetch().await
    }

    /// Write `rows` to the configured target with a fresh bearer token.
    pub async fn push_rows(&self, rows: &[Row]) -> Result<(), SyncError> {
        let token = self.tokens.bearer_token().await?;

        if self.clear_before_write {
            self.writer.clear_range(&token, &self.target).await?;
        }

        self.writer.write_rows(&token, &self.target, rows).await?;
        Ok(())
    }

    /// Run one cycle against `state` and return the state for the next one.
    ///
    /// Only an authentication failure is returned as an error; everything
    /// else is contained in the outcome and leaves the snapshot untouched.
    pub async fn run_cycle(
        &self,
        state: SyncState,
    ) -> Result<(SyncState, CycleOutcome), AuthError> {
        let payload = match self.fetch_snapshot().await {
            Ok(payload) => payload,
            Err(reason) => {
                tracing::info!(reason = %reason, "No data to update, skipping iteration");
                return Ok((state, CycleOutcome::NoData(reason)));
            }
        };

        if !has_changed(state.snapshot.as_ref(), &payload) {
            tracing::debug!("Source data unchanged");
            return Ok((state, CycleOutcome::Unchanged));
        }

        tracing::info!(records = payload.len(), "Data has changed, updating sheet");

        let rows = match map_to_rows(&payload) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(field = e.field(), "Error in data format: {}", e);
                return Ok((state, CycleOutcome::Skipped(e.into())));
            }
        };

        match self.push_rows(&rows).await {
            Ok(()) => {
                tracing::info!(
                    rows = rows.len(),
                    range = %self.target.range,
                    "Sheet updated successfully"
                );
                let next = SyncState {
                    snapshot: Some(payload),
                };
                Ok((next, CycleOutcome::Synced { rows: rows.len() }))
            }
            Err(SyncError::Auth(e)) => Err(e),
            Err(e) => {
                tracing::warn!("{}", e);
                Ok((state, CycleOutcome::Skipped(e)))
            }
        }
    }

    /// Poll until Ctrl-C or an authentication failure.
    pub async fn run_forever(&self, interval: Duration) -> Result<(), AuthError> {
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.run_until(interval, interrupted).await
    }

    /// Poll until `shutdown` resolves or an authentication failure ends the
    /// loop. `shutdown` is watched during cycles as well as between them, so
    /// a stop request never waits on a hung request.
    pub async fn run_until<S>(&self, interval: Duration, shutdown: S) -> Result<(), AuthError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut state = SyncState::default();

        loop {
            let (next, _outcome) = tokio::select! {
                result = self.run_cycle(state) => result?,
                _ = &mut shutdown => {
                    tracing::info!("Interrupted, stopping sync loop");
                    return Ok(());
                }
            };
            state = next;

            tokio::select! {
                _ = sleep(interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Interrupted, stopping sync loop");
                    return Ok(());
                }
            }
        }
    }
}
