use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy)]
enum Signal {
    Touch,
    Flush,
    Cancel,
}

/// Coalesces bursts of events into one callback. Every `touch` pushes the
/// deadline out to `delay` from now; the callback runs once the deadline
/// passes without another touch.
///
/// Dropping the debouncer closes its channel: signals already sent (a
/// `flush` included) are still handled, then a run that was only waiting on
/// the timer is discarded. Use [`Debouncer::shutdown`] to wait for that.
#[derive(Debug)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<Signal>,
    handle: JoinHandle<()>,
}

impl Debouncer {
    pub fn spawn<F, Fut>(delay: Duration, mut on_idle: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut deadline: Option<Instant> = None;
            loop {
                let sleep = async move {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                };
                tokio::select! {
                    signal = rx.recv() => match signal {
                        Some(Signal::Touch) => deadline = Some(Instant::now() + delay),
                        Some(Signal::Cancel) => deadline = None,
                        Some(Signal::Flush) => {
                            if deadline.take().is_some() {
                                on_idle().await;
                            }
                        }
                        None => break,
                    },
                    _ = sleep => {
                        deadline = None;
                        on_idle().await;
                    }
                }
            }
        });
        Self { tx, handle }
    }

    /// Records an edit and restarts the idle timer.
    pub fn touch(&self) {
        self.send(Signal::Touch);
    }

    /// Runs the callback now if a run is pending.
    pub fn flush(&self) {
        self.send(Signal::Flush);
    }

    /// Drops a pending run without invoking the callback.
    pub fn cancel(&self) {
        self.send(Signal::Cancel);
    }

    /// Closes the channel and waits until every queued signal is handled.
    pub async fn shutdown(self) {
        let Self { tx, handle } = self;
        drop(tx);
        if let Err(error) = handle.await {
            log::error!("debouncer task failed: {error}");
        }
    }

    fn send(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            log::warn!("debouncer stopped; dropping {signal:?}");
        }
    }
}
