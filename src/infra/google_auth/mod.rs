// Google auth infra layer.
// - `oauth_client.rs` talks to Google's OAuth endpoints (refresh + consent).
// - `token_file.rs` persists the resulting credential to disk.

#[path = "oauth_client.rs"]
pub mod oauth_client;

#[path = "token_file.rs"]
pub mod token_file;

pub use oauth_client::GoogleOAuthClient;
pub use token_file::TokenFile;
