pub mod sync_models;
pub mod sync_ports;
pub mod sync_service;

#[allow(unused_imports)]
pub use sync_models::{
    Cell, CycleOutcome, FetchDegraded, Payload, PushFailure, Row, SchemaError, SyncError,
    SyncState, UpdateTarget, REQUIRED_FIELDS,
};
pub use sync_ports::{SheetWriter, SnapshotSource, TokenSource};
#[allow(unused_imports)]
pub use sync_service::{has_changed, map_to_rows, SyncService};
