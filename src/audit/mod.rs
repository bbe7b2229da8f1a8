pub mod event;
pub mod sink;

use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender, channel};

pub use event::{AccountAction, AuditEvent, render_hundredths};
pub use sink::AuditSink;

/// Internal fan-in: `Dispatcher`/`QuoteOracle`/engines publish events here;
/// a single background task drains the channel and hands each event to the
/// configured `AuditSink` as one XML element.
#[derive(Clone)]
pub struct AuditPublisher {
    tx: Sender<AuditEvent>,
}

impl AuditPublisher {
    pub fn new(capacity: usize) -> (Self, Receiver<AuditEvent>) {
        let (tx, rx) = channel(capacity);
        (Self { tx }, rx)
    }

    /// Best-effort publish: a full channel drops the event and logs a
    /// warning rather than blocking the caller (audit is not in the
    /// correctness path, per spec.md's "Quote Oracle's cache ... bounded
    /// staleness, not correctness" framing generalized to the audit path).
    pub fn publish(&self, event: AuditEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::warn!(error = %e, "audit event dropped; channel full or closed");
        }
    }
}

pub async fn run_audit_sink(mut rx: Receiver<AuditEvent>, sink: Arc<dyn AuditSink>) {
    while let Some(event) = rx.recv().await {
        match quick_xml::se::to_string(&event) {
            Ok(xml) => {
                if let Err(e) = sink.write_line(&xml).await {
                    tracing::error!(error = %e, "failed to write audit event");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize audit event"),
        }
    }

    tracing::warn!("audit channel closed; sink task exiting");
}
