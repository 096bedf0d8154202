// The core module contains all sync logic.
// Each concern gets its own submodule.

#[path = "credentials/credential_service.rs"]
pub mod credentials;

#[path = "sync/mod.rs"]
pub mod sync;
