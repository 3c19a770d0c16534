use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::LucidAiError;
use crate::types::StreamDelta;

pub type DeltaItem = Result<StreamDelta, LucidAiError>;

/// Ordered, single-pass sequence of deltas for one generation turn.
///
/// The sequence ends when every writer is dropped or right after the first
/// error item. It cannot be restarted: once `next` returns `None` it keeps
/// returning `None`.
pub struct DeltaStream {
    receiver: mpsc::UnboundedReceiver<DeltaItem>,
    finished: bool,
}

impl DeltaStream {
    pub fn channel() -> (DeltaStreamWriter, DeltaStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = DeltaStreamWriter {
            sender,
            failed: Arc::new(AtomicBool::new(false)),
        };
        let stream = DeltaStream {
            receiver,
            finished: false,
        };
        (writer, stream)
    }

    /// A stream that replays `items` and then ends.
    pub fn from_items(items: impl IntoIterator<Item = DeltaItem>) -> Self {
        let (writer, stream) = Self::channel();
        for item in items {
            match item {
                Ok(delta) => {
                    writer.push(delta);
                }
                Err(error) => writer.fail(error),
            }
        }
        stream
    }

    pub async fn next(&mut self) -> Option<DeltaItem> {
        if self.finished {
            return None;
        }

        match self.receiver.recv().await {
            Some(Ok(delta)) => Some(Ok(delta)),
            Some(Err(error)) => {
                self.finish();
                Some(Err(error))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        self.receiver.close();
    }
}

/// Producer side of a [`DeltaStream`], held by a backend adapter.
#[derive(Clone)]
pub struct DeltaStreamWriter {
    sender: mpsc::UnboundedSender<DeltaItem>,
    failed: Arc<AtomicBool>,
}

impl DeltaStreamWriter {
    /// Returns `false` once the consumer is gone or the stream has failed;
    /// adapters stop producing at that point.
    pub fn push(&self, delta: StreamDelta) -> bool {
        if self.failed.load(Ordering::SeqCst) {
            return false;
        }
        self.sender.send(Ok(delta)).is_ok()
    }

    pub fn push_text(&self, fragment: impl Into<String>) -> bool {
        self.push(StreamDelta::text(fragment))
    }

    pub fn push_reasoning(&self, fragment: impl Into<String>) -> bool {
        self.push(StreamDelta::reasoning(fragment))
    }

    /// Terminates the stream with `error`. Only the first failure is delivered.
    pub fn fail(&self, error: LucidAiError) {
        if self.failed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.sender.send(Err(error));
    }

    pub fn is_closed(&self) -> bool {
        self.failed.load(Ordering::SeqCst) || self.sender.is_closed()
    }
}
