//! Prerender progress reporting and aggregation

use std::collections::HashMap;
use std::sync::Mutex;

/// Identifies one prerender engine among the engines a status display
/// monitors (one per renderer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EngineId(pub usize);

impl EngineId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

/// Receives progress fractions from prerender engines.
///
/// Called on the prerender thread after each completed slide; implementations
/// must be non-blocking. Failure or slowness to observe never affects
/// rendering correctness, only feedback.
pub trait ProgressObserver: Send + Sync {
    fn prerender_progress(&self, source: EngineId, fraction: f64);
}

/// Aggregates fractions from a fixed set of engines into one combined value
/// for passive display.
///
/// The combined value is the mean over the monitored engine count, with
/// engines that have not reported yet counting as 0.0. Per-engine fractions
/// never move backwards, so for a static deck the combined value is
/// monotonically non-decreasing.
pub struct CacheStatus {
    fractions: Mutex<HashMap<EngineId, f64>>,
    monitored: usize,
}

impl CacheStatus {
    /// `monitored` is the number of engines expected to report.
    #[must_use]
    pub fn new(monitored: usize) -> Self {
        Self {
            fractions: Mutex::new(HashMap::new()),
            monitored: monitored.max(1),
        }
    }

    /// Latest fraction reported by one engine
    #[must_use]
    pub fn fraction_of(&self, source: EngineId) -> f64 {
        self.lock().get(&source).copied().unwrap_or(0.0)
    }

    /// Combined fraction across all monitored engines
    #[must_use]
    pub fn combined(&self) -> f64 {
        let sum: f64 = self.lock().values().sum();
        sum / self.monitored as f64
    }

    /// Whether every monitored engine has reached 1.0
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let fractions = self.lock();
        fractions.len() >= self.monitored && fractions.values().all(|&f| f >= 1.0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EngineId, f64>> {
        self.fractions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ProgressObserver for CacheStatus {
    fn prerender_progress(&self, source: EngineId, fraction: f64) {
        let mut fractions = self.lock();
        let slot = fractions.entry(source).or_insert(0.0);
        if fraction > *slot {
            *slot = fraction;
        }
    }
}

/// One progress notification, as seen by a channel consumer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressEvent {
    pub source: EngineId,
    pub fraction: f64,
}

/// Observer that hands fractions off to a channel.
///
/// This is the hand-off point for consumers that cannot react on the
/// prerender thread: the send never blocks, and the receiver drains events
/// at its own pace.
pub struct ChannelObserver {
    tx: flume::Sender<ProgressEvent>,
}

impl ChannelObserver {
    /// Build the observer together with the receiving end.
    #[must_use]
    pub fn new() -> (Self, flume::Receiver<ProgressEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

impl ProgressObserver for ChannelObserver {
    fn prerender_progress(&self, source: EngineId, fraction: f64) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.tx.send(ProgressEvent { source, fraction });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_is_mean_over_monitored_engines() {
        let status = CacheStatus::new(2);
        assert_eq!(status.combined(), 0.0);

        status.prerender_progress(EngineId::new(0), 0.5);
        assert_eq!(status.combined(), 0.25);
        assert_eq!(status.fraction_of(EngineId::new(0)), 0.5);
        assert_eq!(status.fraction_of(EngineId::new(1)), 0.0);

        status.prerender_progress(EngineId::new(1), 1.0);
        assert_eq!(status.combined(), 0.75);
        assert!(!status.is_complete());

        status.prerender_progress(EngineId::new(0), 1.0);
        assert_eq!(status.combined(), 1.0);
        assert!(status.is_complete());
    }

    #[test]
    fn fractions_never_move_backwards() {
        let status = CacheStatus::new(1);
        status.prerender_progress(EngineId::new(0), 0.8);
        status.prerender_progress(EngineId::new(0), 0.3);
        assert_eq!(status.fraction_of(EngineId::new(0)), 0.8);
    }

    #[test]
    fn channel_observer_forwards_events() {
        let (observer, rx) = ChannelObserver::new();
        observer.prerender_progress(EngineId::new(1), 0.5);
        observer.prerender_progress(EngineId::new(1), 1.0);

        let events: Vec<_> = rx.drain().collect();
        assert_eq!(
            events,
            vec![
                ProgressEvent {
                    source: EngineId::new(1),
                    fraction: 0.5
                },
                ProgressEvent {
                    source: EngineId::new(1),
                    fraction: 1.0
                },
            ]
        );
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.prerender_progress(EngineId::new(0), 1.0);
    }
}
