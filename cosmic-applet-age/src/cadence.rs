// Copyright 2023 System76 <info@system76.com>
// SPDX-License-Identifier: GPL-3.0-only

use chrono::NaiveDate;
use tokio::sync::watch;

/// Owner of the live-refresh target.
///
/// The target lives in a single-slot watch channel that one tick subscription
/// listens on, so there is never more than one outstanding refresh cadence:
/// `start` replaces the previous target instead of stacking a second timer.
#[derive(Debug)]
pub struct Cadence {
    target: watch::Sender<Option<NaiveDate>>,
}

impl Cadence {
    pub fn new() -> Self {
        let (target, _) = watch::channel(None);
        Self { target }
    }

    /// Begins refreshing for `selected`, cancelling any active cadence.
    pub fn start(&self, selected: NaiveDate) {
        self.target.send_replace(Some(selected));
    }

    /// Stops the active cadence, if any.
    pub fn cancel(&self) {
        self.target.send_replace(None);
    }

    pub fn is_active(&self) -> bool {
        self.target.borrow().is_some()
    }

    /// Receiver for the tick subscription.
    pub fn watch(&self) -> watch::Receiver<Option<NaiveDate>> {
        self.target.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn start_replaces_the_active_target() {
        let cadence = Cadence::new();
        cadence.start(date(2000, 1, 1));
        cadence.start(date(2010, 5, 20));
        assert_eq!(*cadence.watch().borrow(), Some(date(2010, 5, 20)));
    }

    #[test]
    fn cancel_clears_the_target() {
        let cadence = Cadence::new();
        cadence.start(date(2000, 1, 1));
        assert!(cadence.is_active());
        cadence.cancel();
        assert!(!cadence.is_active());
        assert_eq!(*cadence.watch().borrow(), None);
    }

    #[test]
    fn watcher_only_ever_sees_the_latest_target() {
        let cadence = Cadence::new();
        let mut watcher = cadence.watch();

        cadence.start(date(2000, 1, 1));
        cadence.start(date(2010, 5, 20));

        assert_eq!(*watcher.borrow_and_update(), Some(date(2010, 5, 20)));
        assert!(!watcher.has_changed().unwrap());
    }

    #[test]
    fn idle_cadence_is_inactive() {
        assert!(!Cadence::new().is_active());
    }
}
