pub mod client;
pub mod notifier;
pub mod remote;

pub use client::TestClient;
pub use notifier::RecordingNotifier;
pub use remote::{MemoryRemote, RemoteCall};
