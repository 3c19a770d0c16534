mod common;
mod local;
mod models;
mod remote;
mod sse;

pub use local::{EngineChunkStream, HttpLocalEngine, LocalBackend, LocalEngine};
pub use models::fetch_models;
pub use remote::RemoteBackend;
