use std::future::Future;
use std::sync::mpsc::Sender;
use tokio::runtime::Handle;

use crate::error::Result;
use crate::event::AppEvent;

/// Runs store actions on the tokio runtime and reports failures to the UI.
#[derive(Clone)]
pub struct Dispatcher {
    handle: Handle,
    tx: Sender<AppEvent>,
}

impl Dispatcher {
    pub fn new(handle: Handle, tx: Sender<AppEvent>) -> Self {
        Self { handle, tx }
    }

    pub fn spawn<F>(&self, action: &'static str, work: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            if let Err(err) = work.await {
                tracing::warn!(action, error = %err, "action failed");
                let _ = tx.send(AppEvent::ActionFailed {
                    action,
                    message: err.to_string(),
                });
            }
        });
    }

    pub fn send(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("ui event channel closed");
        }
    }
}
