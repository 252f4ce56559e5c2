//! Fixed-interval polling keyed on a selectable station.
//!
//! A [`Poller`] owns a background task that fetches a value for the selected
//! station on every tick and publishes it through a watch channel. Ticks
//! never overlap: the fetch is awaited inside the tick and ticks missed
//! meanwhile are delayed rather than bunched. Selecting a different station
//! abandons any in-flight fetch and polls the new one immediately.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::domain::StationId;

/// One successful poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollUpdate<T> {
    pub station: StationId,
    pub value: T,
    pub at: DateTime<Utc>,
}

type Latest<T> = Option<Arc<PollUpdate<T>>>;

/// A cancelable polling loop. Dropping it stops the loop.
pub struct Poller<T> {
    name: &'static str,
    selection: watch::Sender<Option<StationId>>,
    updates: watch::Receiver<Latest<T>>,
    task: JoinHandle<()>,
}

impl<T: Send + Sync + 'static> Poller<T> {
    /// Start a poller with no station selected.
    pub fn spawn<Fetch, Fut, E>(name: &'static str, period: Duration, fetch: Fetch) -> Self
    where
        Fetch: Fn(StationId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (selection, selection_rx) = watch::channel(None);
        let (updates_tx, updates) = watch::channel(None);

        let task = tokio::spawn(run(name, period, fetch, selection_rx, updates_tx));

        Self {
            name,
            selection,
            updates,
            task,
        }
    }

    /// Poll `station` from now on, or pause with `None`.
    ///
    /// Re-selecting the current station does nothing.
    pub fn select(&self, station: Option<StationId>) {
        self.selection.send_if_modified(|current| {
            if *current == station {
                false
            } else {
                *current = station;
                true
            }
        });
    }

    pub fn selected(&self) -> Option<StationId> {
        self.selection.borrow().clone()
    }

    /// Most recent result for the selected station.
    pub fn latest(&self) -> Latest<T> {
        self.updates.borrow().clone()
    }

    /// Receiver that sees every published result.
    pub fn subscribe(&self) -> watch::Receiver<Latest<T>> {
        self.updates.clone()
    }

    /// Stop polling.
    pub fn stop(self) {
        debug!(poller = self.name, "Stopping poller");
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T, Fetch, Fut, E>(
    name: &'static str,
    period: Duration,
    fetch: Fetch,
    mut selection: watch::Receiver<Option<StationId>>,
    updates: watch::Sender<Latest<T>>,
) where
    Fetch: Fn(StationId) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    loop {
        let selected = selection.borrow_and_update().clone();
        updates.send_replace(None);

        let Some(station) = selected else {
            if selection.changed().await.is_err() {
                return;
            }
            continue;
        };

        debug!(poller = name, station = %station, "Polling station");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Runs until the selection changes, then restarts the outer loop.
        loop {
            tokio::select! {
                changed = selection.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        result = fetch(station.clone()) => match result {
                            Ok(value) => {
                                updates.send_replace(Some(Arc::new(PollUpdate {
                                    station: station.clone(),
                                    value,
                                    at: Utc::now(),
                                })));
                            }
                            Err(e) => {
                                warn!(poller = name, station = %station, error = %e, "Poll failed");
                            }
                        },
                        changed = selection.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            debug!(poller = name, "Selection changed mid-poll");
                            break;
                        }
                    }
                }
            }
        }
    }
}
