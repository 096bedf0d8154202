// Source side: Firebase Realtime Database over its REST interface.

#[path = "firebase_client.rs"]
pub mod firebase_client;

pub use firebase_client::FirebaseClient;
