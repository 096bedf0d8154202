use std::time::Duration;

use reqwest::Client;

/// Shared builder for every outbound client. `timeout` of `None` keeps the
/// reqwest default (no overall deadline).
pub fn build_client(timeout: Option<Duration>) -> reqwest::Result<Client> {
    let mut builder =
        Client::builder().user_agent(concat!("sheet-mirror/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
