//! Lifetime of a single acquisition.
//!
//! An [`AcquisitionSession`] owns the link for exactly one acquisition. It
//! runs the notify/timeout race through a [`SettleLatch`] and guarantees the
//! link is released on every exit path: explicitly through
//! [`AcquisitionSession::teardown`], or best-effort on drop when the
//! acquisition future itself is cancelled.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result, TransportStage};
use crate::traits::{SensorLink, Subscription};

/// Single-assignment cell deciding a race between competing callbacks.
///
/// The first call to [`SettleLatch::settle`] delivers its value to the
/// receiver returned by [`SettleLatch::channel`]; every later call is a no-op
/// and reports that it lost.
#[derive(Debug)]
pub struct SettleLatch<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> SettleLatch<T> {
    /// Create an unsettled latch and the receiver for its single value.
    pub fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Try to settle with `value`. Returns `true` only for the winning call.
    pub fn settle(&self, value: T) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => {
                // A dropped receiver still counts as settled: nobody else may win.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}

/// Which side of the race settled first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RaceOutcome {
    /// A value-changed notification arrived with this payload.
    Notified(Vec<u8>),
    /// The notification budget elapsed first.
    TimedOut,
}

/// Owner of the link for one acquisition.
pub(crate) struct AcquisitionSession<L: SensorLink + 'static> {
    link: Arc<L>,
    characteristic: Uuid,
    subscribed: bool,
    handlers: Vec<JoinHandle<()>>,
    finished: bool,
}

impl<L: SensorLink + 'static> AcquisitionSession<L> {
    pub(crate) fn new(link: L, characteristic: Uuid) -> Self {
        Self {
            link: Arc::new(link),
            characteristic,
            subscribed: false,
            handlers: Vec::new(),
            finished: false,
        }
    }

    /// Connect and verify the service exposes the snapshot characteristic.
    pub(crate) async fn open(&mut self, service: Uuid) -> Result<()> {
        debug!("Connecting...");
        self.link
            .connect()
            .await
            .map_err(|e| Error::transport(TransportStage::Connect, e))?;

        debug!(%service, characteristic = %self.characteristic, "Discovering services...");
        self.link
            .discover(service, self.characteristic)
            .await
            .map_err(|e| Error::transport(TransportStage::Discover, e))
    }

    pub(crate) async fn subscribe(&mut self) -> Result<Subscription> {
        debug!("Subscribing to notifications...");
        let subscription = self
            .link
            .subscribe(self.characteristic)
            .await
            .map_err(|e| Error::transport(TransportStage::Subscribe, e))?;
        self.subscribed = true;
        Ok(subscription)
    }

    /// Race the first notification against `budget`.
    ///
    /// Both sides run as independent tasks settling into one latch, so at
    /// most one outcome is ever observed. The losing task is aborted before
    /// this returns, and a notification arriving after the timer won is
    /// dropped without effect.
    pub(crate) async fn race(
        &mut self,
        subscription: Subscription,
        budget: Duration,
    ) -> RaceOutcome {
        let (latch, settled) = SettleLatch::channel();
        let latch = Arc::new(latch);

        let notify_latch = Arc::clone(&latch);
        let mut values = subscription.into_stream();
        let notify = tokio::spawn(async move {
            if let Some(payload) = values.next().await {
                if notify_latch.settle(RaceOutcome::Notified(payload)) {
                    debug!("Notification settled the race");
                } else {
                    debug!("Ignoring notification that arrived after the timeout");
                }
            }
        });

        let timer_latch = Arc::clone(&latch);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            if timer_latch.settle(RaceOutcome::TimedOut) {
                debug!(?budget, "Timeout settled the race");
            } else {
                debug!("Ignoring timer that fired after a notification");
            }
        });

        self.handlers.push(notify);
        self.handlers.push(timer);

        let outcome = settled.await.unwrap_or(RaceOutcome::TimedOut);
        self.abort_handlers();
        outcome
    }

    /// One explicit pull of the characteristic's current value.
    pub(crate) async fn fallback_read(&self) -> Result<Vec<u8>> {
        debug!("Performing fallback read");
        self.link
            .read(self.characteristic)
            .await
            .map_err(|e| Error::transport(TransportStage::Read, e))
    }

    /// Release the subscription and the connection.
    ///
    /// Consumes the session so it runs at most once. Failures are logged
    /// and swallowed so they never replace the acquisition's own outcome.
    pub(crate) async fn teardown(mut self) {
        self.finished = true;
        self.abort_handlers();

        if self.subscribed
            && let Err(e) = self.link.unsubscribe(self.characteristic).await
        {
            warn!(error = %e, "Failed to unsubscribe during teardown");
        }

        if self.link.is_connected().await {
            debug!("Disconnecting...");
            if let Err(e) = self.link.disconnect().await {
                warn!(error = %e, "Failed to disconnect during teardown");
            }
        }
    }

    fn abort_handlers(&mut self) {
        for handle in self.handlers.drain(..) {
            handle.abort();
        }
    }
}

impl<L: SensorLink + 'static> Drop for AcquisitionSession<L> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.abort_handlers();

        warn!("Acquisition dropped before teardown - performing best-effort cleanup");

        let link = Arc::clone(&self.link);
        let characteristic = self.characteristic;
        let subscribed = self.subscribed;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if subscribed {
                    let _ = link.unsubscribe(characteristic).await;
                }
                if link.is_connected().await
                    && let Err(e) = link.disconnect().await
                {
                    debug!(error = %e, "Best-effort disconnect failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latch_first_settle_wins() {
        let (latch, rx) = SettleLatch::channel();
        assert!(latch.settle(1));
        assert!(!latch.settle(2));

        assert_eq!(rx.await.unwrap(), 1);
    }

    #[test]
    fn test_latch_settles_with_dropped_receiver() {
        let (latch, rx) = SettleLatch::channel();
        drop(rx);
        assert!(latch.settle("late"));
        assert!(!latch.settle("later"));
    }

    #[tokio::test]
    async fn test_latch_concurrent_settlers() {
        let (latch, rx) = SettleLatch::channel();
        let latch = Arc::new(latch);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let latch = Arc::clone(&latch);
                tokio::spawn(async move { latch.settle(i) })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(rx.await.is_ok());
    }
}
