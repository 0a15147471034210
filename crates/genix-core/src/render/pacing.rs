//! Paced iteration shared by every typing session.
//!
//! Both the fire-and-continue and the sequential-await disciplines consume
//! the same stream: one step per tick, and a final [`Step::Done`] one tick
//! after the last item.

use futures::Stream;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A step yielded by [`paced`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Item(T),
    Done,
}

/// Fixed-cadence ticker.
///
/// The first tick fires one period after creation. A zero period never
/// sleeps and only yields to the scheduler.
#[derive(Debug)]
pub struct Pacer {
    interval: Option<Interval>,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        if period.is_zero() {
            return Self { interval: None };
        }

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Some(interval),
        }
    }

    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
    }
}

/// Yield `items` one per `period`, then [`Step::Done`].
///
/// Must be polled inside a tokio runtime.
pub fn paced<T>(items: Vec<T>, period: Duration) -> impl Stream<Item = Step<T>> {
    let state = (Pacer::new(period), items.into_iter(), false);
    futures::stream::unfold(state, |(mut pacer, mut items, finished)| async move {
        if finished {
            return None;
        }

        pacer.tick().await;
        match items.next() {
            Some(item) => Some((Step::Item(item), (pacer, items, false))),
            None => Some((Step::Done, (pacer, items, true))),
        }
    })
}
