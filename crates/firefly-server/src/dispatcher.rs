//! Broadcast dispatcher: grid snapshots out to every session.
//!
//! The dispatcher loop waits on two inputs: the simulation's change
//! signal and its own fixed heartbeat. The change signal only wakes the
//! loop; the heartbeat is what triggers delivery. Each heartbeat takes a
//! single flattened snapshot, encodes it once, and offers it to every
//! registered session.
//!
//! Offering never waits. A session whose queue is full skips this frame
//! (the next heartbeat carries a complete state). A session whose writer
//! has gone is removed from the registry without affecting the rest.

use std::sync::Arc;
use std::time::Duration;

use firefly_core::shared::SharedGrid;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::registry::{Delivery, Frame, Session, SessionRegistry};

/// Counts from one delivery round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Sessions that accepted the frame.
    pub queued: usize,
    /// Sessions that were too far behind to take it.
    pub dropped: usize,
    /// Sessions removed because their writer was gone.
    pub removed: usize,
}

/// Fans grid snapshots out to the session registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    grid: Arc<SharedGrid>,
    registry: Arc<SessionRegistry>,
    interval: Duration,
}

impl Dispatcher {
    /// Create a dispatcher delivering every `interval`.
    pub const fn new(
        grid: Arc<SharedGrid>,
        registry: Arc<SessionRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            grid,
            registry,
            interval,
        }
    }

    /// Run the dispatch loop forever.
    pub async fn run(self) {
        let mut heartbeat = time::interval(self.interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.grid.changed() => {
                    // Wake-up only; delivery stays on the heartbeat.
                    trace!("Grid change observed");
                }
                _ = heartbeat.tick() => {
                    self.broadcast_round().await;
                }
            }
        }
    }

    /// Take one snapshot and offer it to every registered session.
    pub async fn broadcast_round(&self) -> RoundReport {
        let mut report = RoundReport::default();
        if self.registry.is_empty().await {
            return report;
        }
        let Some(frame) = self.encode_current().await else {
            return report;
        };

        for session in &self.registry.snapshot().await {
            match session.offer(frame.clone()) {
                Delivery::Queued => report.queued = report.queued.saturating_add(1),
                Delivery::Dropped => {
                    debug!(session_id = %session.id(), "Session behind, frame dropped");
                    report.dropped = report.dropped.saturating_add(1);
                }
                Delivery::Closed => {
                    if self.registry.remove(session.id()).await {
                        debug!(session_id = %session.id(), "Session closed, removed");
                    }
                    report.removed = report.removed.saturating_add(1);
                }
            }
        }
        report
    }

    /// Push the current state to one session, outside the heartbeat.
    ///
    /// Used on connect so a new viewer paints immediately.
    pub async fn send_full_state(&self, session: &Session) -> Delivery {
        let Some(frame) = self.encode_current().await else {
            return Delivery::Dropped;
        };
        let delivery = session.offer(frame);
        if delivery == Delivery::Closed {
            self.registry.remove(session.id()).await;
        }
        delivery
    }

    async fn encode_current(&self) -> Option<Frame> {
        let flat = self.grid.flatten().await;
        match flat.to_json() {
            Ok(json) => Some(Frame::from(json)),
            Err(e) => {
                warn!("Failed to serialize grid state: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use firefly_core::grid::{Grid, GridBlueprint};

    use super::*;

    fn dispatcher(size: usize) -> (Dispatcher, Arc<SessionRegistry>) {
        let grid = Arc::new(SharedGrid::new(GridBlueprint::default(), Grid::new(size)));
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(grid, Arc::clone(&registry), Duration::from_millis(100));
        (dispatcher, registry)
    }

    #[tokio::test]
    async fn round_reaches_every_session() {
        let (dispatcher, registry) = dispatcher(2);
        let (a, mut rx_a) = Session::new(4);
        let (b, mut rx_b) = Session::new(4);
        registry.add(a).await;
        registry.add(b).await;

        let report = dispatcher.broadcast_round().await;

        assert_eq!(report.queued, 2);
        assert_eq!(rx_a.recv().await.unwrap().as_str(), "[-1,-1,-1,-1]");
        assert_eq!(rx_b.recv().await.unwrap().as_str(), "[-1,-1,-1,-1]");
    }

    #[tokio::test]
    async fn closed_session_is_removed_without_affecting_others() {
        let (dispatcher, registry) = dispatcher(2);
        let (alive, mut rx_alive) = Session::new(4);
        let (dead, rx_dead) = Session::new(4);
        registry.add(alive.clone()).await;
        registry.add(dead.clone()).await;
        drop(rx_dead);

        let report = dispatcher.broadcast_round().await;

        assert_eq!(report.removed, 1);
        assert_eq!(report.queued, 1);
        assert!(!registry.contains(dead.id()).await);
        assert!(registry.contains(alive.id()).await);
        assert!(rx_alive.recv().await.is_some());
    }

    #[tokio::test]
    async fn slow_session_drops_frames_but_stays() {
        let (dispatcher, registry) = dispatcher(1);
        let (slow, mut rx) = Session::new(1);
        registry.add(slow.clone()).await;

        assert_eq!(dispatcher.broadcast_round().await.queued, 1);
        assert_eq!(dispatcher.broadcast_round().await.dropped, 1);
        assert!(registry.contains(slow.id()).await);

        assert_eq!(rx.recv().await.unwrap().as_str(), "[-1]");
        assert_eq!(dispatcher.broadcast_round().await.queued, 1);
    }

    #[tokio::test]
    async fn full_state_goes_to_one_session_only() {
        let (dispatcher, registry) = dispatcher(1);
        let (a, mut rx_a) = Session::new(2);
        let (b, mut rx_b) = Session::new(2);
        registry.add(a.clone()).await;
        registry.add(b).await;

        assert_eq!(dispatcher.send_full_state(&a).await, Delivery::Queued);
        assert_eq!(rx_a.recv().await.unwrap().as_str(), "[-1]");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_delivers_without_change_signals() {
        let (dispatcher, registry) = dispatcher(1);
        let (session, mut rx) = Session::new(16);
        registry.add(session).await;

        let handle = tokio::spawn(dispatcher.run());
        time::sleep(Duration::from_millis(350)).await;

        // Ticks at 0, 100, 200, 300 ms.
        let mut frames = 0;
        while rx.try_recv().is_ok() {
            frames += 1;
        }
        assert_eq!(frames, 4);
        handle.abort();
    }
}
