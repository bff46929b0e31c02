use tokio::sync::mpsc;

/// Fire-and-forget notification that cached output for a path is stale.
/// The presentation layer owns the cache; nothing here awaits a response,
/// and delivery failure is only logged.
pub trait Revalidator: Send + Sync {
    fn invalidate(&self, path: &str);
}

/// Production default: emits the stale path on the log stream.
pub struct LogRevalidator;

impl Revalidator for LogRevalidator {
    fn invalidate(&self, path: &str) {
        tracing::debug!(path, "revalidate");
    }
}

/// Forwards stale paths over an unbounded channel, for embedders (and
/// tests) that consume the signal programmatically.
pub struct ChannelRevalidator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelRevalidator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Revalidator for ChannelRevalidator {
    fn invalidate(&self, path: &str) {
        if self.tx.send(path.to_string()).is_err() {
            log::warn!("revalidation receiver dropped; signal for {path} lost");
        }
    }
}
