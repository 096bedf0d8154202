// The infra module contains implementations of core traits.
// Each external system gets its own submodule.

#[path = "http.rs"]
pub mod http;

#[path = "firebase/mod.rs"]
pub mod firebase;

#[path = "sheets/mod.rs"]
pub mod sheets;

#[path = "google_auth/mod.rs"]
pub mod google_auth;

#[cfg(test)]
#[path = "test_server.rs"]
pub mod test_server;
