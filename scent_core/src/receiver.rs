//! Message reception thread.
//!
//! Owns a `MessageSource` and hands every payload to the `CommandHandler`.
//! Each `MessageReceiver` spawns exactly one thread, shut down and joined
//! when the receiver is dropped.
use crate::bus::{Delivery, MessageSource};
use crate::handler::CommandHandler;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub struct MessageReceiver {
    handled: Arc<AtomicU64>,
    /// Set once the source reports end of stream; all earlier payloads have been handled.
    closed: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl MessageReceiver {
    /// `poll` bounds how long the thread blocks on the source before
    /// re-checking the shutdown flag.
    pub fn spawn<S: MessageSource + Send + 'static>(
        mut source: S,
        handler: CommandHandler,
        poll: Duration,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let closed = Arc::new(AtomicBool::new(false));
        let closed_clone = closed.clone();
        let handled = Arc::new(AtomicU64::new(0));
        let handled_clone = handled.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("receiver thread received shutdown signal");
                    break;
                }
                match source.next(poll) {
                    Delivery::Message(payload) => {
                        if let Err(e) = handler.handle(&payload) {
                            tracing::warn!(error = %e, "inbound message dropped");
                        }
                        handled_clone.fetch_add(1, Ordering::Release);
                    }
                    Delivery::Idle => {}
                    Delivery::Closed => {
                        tracing::info!("message source closed");
                        closed_clone.store(true, Ordering::Release);
                        break;
                    }
                }
            }
            tracing::trace!("receiver thread exiting cleanly");
        });

        Self {
            handled,
            closed,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Payloads handled so far, including rejected ones.
    #[must_use]
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Acquire)
    }
}

impl Drop for MessageReceiver {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // exits after the current source.next() returns (bounded by `poll`)
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("receiver thread joined"),
                Err(e) => tracing::warn!(?e, "receiver thread panicked during shutdown"),
            }
        }
    }
}
