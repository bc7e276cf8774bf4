// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Periodic watch-time reports.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyspawn::Spawner;
use futures::{
    StreamExt,
    future::{AbortHandle, Abortable},
};
use tick::PeriodicTimer;

use crate::{PresenceStore, PresenceTracker, StreamId, UserId};

/// Guard of a running heartbeat.
///
/// Dropping the guard, or calling [`cancel`](Self::cancel), stops the heartbeat before its next
/// tick. Keep the guard alive for as long as the viewer stays on the stream.
#[derive(Debug)]
#[must_use = "dropping the guard stops the heartbeat"]
pub struct Heartbeat {
    abort: AbortHandle,
    finished: Arc<AtomicBool>,
}

impl Heartbeat {
    /// Stops the heartbeat.
    pub fn cancel(self) {
        drop(self);
    }

    /// Returns `true` once the heartbeat stopped by itself, after the claim was settled or on a
    /// non-transient error.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

impl<S: PresenceStore + 'static> PresenceTracker<S> {
    /// Starts reporting watch time for `user_id` on `stream_id`.
    ///
    /// Every [`heartbeat_interval`](crate::PresenceConfig::heartbeat_interval), the task computes
    /// the whole minutes elapsed since this call and passes them to
    /// [`report_elapsed`](Self::report_elapsed). It stops once a claim is settled, from this task
    /// or any other path of this tracker.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use anyspawn::Spawner;
    /// use tick::Clock;
    /// use vitrine_presence::{InMemoryPresenceStore, PresenceTracker, StreamId, UserId};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let clock = Clock::new_tokio();
    /// let store = Arc::new(InMemoryPresenceStore::new(clock.clone()));
    /// let tracker = Arc::new(PresenceTracker::new(store, clock));
    ///
    /// let heartbeat = tracker.spawn_heartbeat(&Spawner::new_tokio(), StreamId::new("launch"), UserId::new("u1"));
    /// assert!(!heartbeat.is_finished());
    ///
    /// // Leaving the page stops the reports.
    /// heartbeat.cancel();
    /// # }
    /// ```
    pub fn spawn_heartbeat(self: &Arc<Self>, spawner: &Spawner, stream_id: StreamId, user_id: UserId) -> Heartbeat {
        let (abort, registration) = AbortHandle::new_pair();
        let finished = Arc::new(AtomicBool::new(false));

        let tracker = Arc::clone(self);
        let done = Arc::clone(&finished);
        let task = Abortable::new(
            async move {
                tracker.heartbeat_loop(&stream_id, &user_id).await;
                done.store(true, Ordering::Release);
            },
            registration,
        );

        drop(spawner.spawn(async move {
            if task.await.is_err() {
                tracing::debug!("heartbeat cancelled");
            }
        }));

        Heartbeat { abort, finished }
    }

    async fn heartbeat_loop(&self, stream_id: &StreamId, user_id: &UserId) {
        let stopwatch = self.clock.stopwatch();
        let mut timer = PeriodicTimer::new(&self.clock, self.config().heartbeat_interval);

        while timer.next().await.is_some() {
            let minutes = u32::try_from(stopwatch.elapsed().as_secs() / 60).unwrap_or(u32::MAX);

            match self.report_elapsed(stream_id, user_id, minutes).await {
                Ok(Some(outcome)) if outcome.is_settled() => break,
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(stream.id = %stream_id, user.id = %user_id, error = %error, "heartbeat stopped");
                    break;
                }
            }

            if self.has_claimed() {
                break;
            }
        }

        tracing::debug!(stream.id = %stream_id, user.id = %user_id, "heartbeat finished");
    }
}
