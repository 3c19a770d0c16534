use tracing::{debug, warn};

use crate::backend::StreamBackendRef;
use crate::event_stream::DeltaStream;
use crate::types::ChatRequest;

/// Starts `backend` on `request` and returns the consumer side of its deltas.
///
/// The producer runs as a detached task. Dropping the returned stream makes
/// every further push fail, which the adapters treat as a signal to stop.
pub fn stream(backend: StreamBackendRef, request: ChatRequest) -> DeltaStream {
    let (writer, deltas) = DeltaStream::channel();
    let kind = backend.kind();
    spawn_backend_task(async move {
        let result = backend.stream(request, writer.clone()).await;
        match result {
            Ok(()) if writer.is_closed() => debug!(?kind, "backend stopped: consumer gone"),
            Ok(()) => debug!(?kind, "backend stream completed"),
            Err(error) => {
                warn!(?kind, "backend stream failed: {error}");
                writer.fail(error);
            }
        }
    });
    deltas
}

fn spawn_backend_task<F>(task: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(task);
        return;
    }

    std::thread::spawn(move || {
        if let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            runtime.block_on(task);
        }
    });
}
