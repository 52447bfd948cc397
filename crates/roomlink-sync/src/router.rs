//! Role router: publishes the current view classification.
//!
//! Classification itself is pure (`roomlink_core::classify`). The router owns
//! the latest result in a watch channel so long-lived components, chiefly the
//! poller, can re-check the role on every tick.

use tokio::sync::watch;
use tracing::{debug, info};

use roomlink_core::{EntryParams, ViewClassification, classify};

#[derive(Debug)]
pub struct RoleRouter {
    tx: watch::Sender<ViewClassification>,
}

impl RoleRouter {
    pub fn new(params: &EntryParams) -> Self {
        let classification = classify(params);
        debug!(
            view = ?classification.view,
            booking_id = ?classification.booking_id,
            "Classified entry parameters"
        );
        let (tx, _) = watch::channel(classification);
        Self { tx }
    }

    pub fn from_query(query: &str) -> Self {
        Self::new(&EntryParams::from_query(query))
    }

    /// Snapshot of the current classification.
    pub fn classification(&self) -> ViewClassification {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewClassification> {
        self.tx.subscribe()
    }

    /// Reclassify after the entry parameters changed mid-session.
    pub fn reroute(&self, params: &EntryParams) -> ViewClassification {
        let next = classify(params);
        let previous_view = self.tx.borrow().view;
        if previous_view != next.view {
            info!(from = ?previous_view, to = ?next.view, "View classification changed");
        }
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        next
    }
}

#[cfg(test)]
mod tests {
    use roomlink_core::View;

    use super::*;

    #[test]
    fn reroute_notifies_subscribers_only_on_change() {
        let router = RoleRouter::from_query("room_id=r1");
        let mut rx = router.subscribe();
        assert_eq!(router.classification().view, View::Client);

        router.reroute(&EntryParams::from_query("room_id=r1"));
        assert!(!rx.has_changed().unwrap_or(true));

        router.reroute(&EntryParams::from_query("pro_id=p1&booking_id=r1"));
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().view, View::Pro);
    }
}
