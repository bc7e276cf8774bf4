// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-client presence bookkeeping.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tick::Clock;

use crate::{
    ClaimOutcome, NewSession, PresenceConfig, PresenceStore, Result, SessionId, StreamCounters, StreamId, UserId,
    ViewerSession,
};

/// Tracks one client's presence on live streams and claims its watch-time bonus.
///
/// A tracker belongs to a single client (one browser tab, one app instance). It keeps a local
/// "already claimed" flag so heartbeats past the threshold do not call the store again and again,
/// but the flag is only an optimization: the store decides whether a claim succeeds, so two
/// clients of the same viewer still get exactly one bonus between them.
///
/// Counter updates and claims are best effort. A transient store failure on those paths is
/// logged and swallowed; the live viewer count may then drift until the store recomputes it.
/// Missing streams or sessions and non-transient store failures are returned to the caller.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tick::Clock;
/// use vitrine_presence::{ClaimOutcome, InMemoryPresenceStore, PresenceTracker, StreamId, UserId};
/// # futures::executor::block_on(async {
///
/// let clock = Clock::new_frozen();
/// let store = Arc::new(InMemoryPresenceStore::new(clock.clone()));
/// let stream = StreamId::new("launch");
/// let viewer = UserId::new("u1");
/// store.create_stream(stream.clone());
///
/// let tracker = PresenceTracker::new(Arc::clone(&store), clock);
/// let session = tracker.join(&stream, Some(viewer.clone()), None).await?;
///
/// // Past the ten minute threshold, the heartbeat report claims the bonus.
/// let outcome = tracker.report_elapsed(&stream, &viewer, 10).await?;
/// assert!(matches!(outcome, Some(ClaimOutcome::Awarded(_))));
///
/// tracker.leave(&session.session_id, &stream).await?;
/// # Ok::<(), vitrine_presence::Error>(())
/// # });
/// ```
#[derive(Debug)]
pub struct PresenceTracker<S> {
    store: Arc<S>,
    pub(crate) clock: Clock,
    config: PresenceConfig,
    has_claimed: AtomicBool,
}

impl<S: PresenceStore> PresenceTracker<S> {
    /// Creates a tracker with the default configuration.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Clock) -> Self {
        Self {
            store,
            clock,
            config: PresenceConfig::default(),
            has_claimed: AtomicBool::new(false),
        }
    }

    /// Replaces the configuration.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Configuration`](crate::ErrorKind::Configuration) error if
    /// `config` does not [validate](PresenceConfig::validate).
    pub fn with_config(mut self, config: PresenceConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Returns the store this tracker reports to.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns `true` once a claim was settled from this client.
    #[must_use]
    pub fn has_claimed(&self) -> bool {
        self.has_claimed.load(Ordering::Acquire)
    }

    /// Clears the local claim flag, for instance when the client switches to another stream.
    pub fn reset_claim_flag(&self) {
        self.has_claimed.store(false, Ordering::Release);
    }

    /// Records that a viewer opened the stream and counts them as a live viewer.
    ///
    /// A session id is generated when `session_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be recorded, including
    /// [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) for an unknown stream. A transient
    /// failure to update the counters is logged and does not fail the join.
    ///
    /// A non-transient failure of the counter update is returned even though the session row is
    /// already recorded as active at that point. The caller still owns the session and should
    /// [`leave`](Self::leave) it; the decrement is clamped, so this cannot push the live count
    /// below zero.
    pub async fn join(&self, stream_id: &StreamId, user_id: Option<UserId>, session_id: Option<SessionId>) -> Result<ViewerSession> {
        let session_id = session_id.unwrap_or_else(|| SessionId::generate(&self.clock));
        let session = self
            .store
            .insert_session(NewSession {
                session_id,
                user_id,
                stream_id: stream_id.clone(),
            })
            .await?;

        match self.store.increment_viewers(stream_id).await {
            Ok(counters) => tracing::debug!(
                stream.id = %stream_id,
                session.id = %session.session_id,
                viewers.current = counters.current_viewers,
                viewers.total = counters.total_views,
                "viewer joined"
            ),
            Err(error) if error.is_transient() => tracing::warn!(
                stream.id = %stream_id,
                session.id = %session.session_id,
                error = %error,
                "failed to increment viewer count"
            ),
            Err(error) => return Err(error),
        }

        Ok(session)
    }

    /// Handles a heartbeat report of `minutes_watched`.
    ///
    /// Claims the bonus when the threshold is reached and no claim was settled from this client
    /// yet; otherwise returns `Ok(None)` without contacting the store.
    ///
    /// # Errors
    ///
    /// Returns the non-transient errors of [`claim_bonus`](Self::claim_bonus).
    pub async fn report_elapsed(&self, stream_id: &StreamId, user_id: &UserId, minutes_watched: u32) -> Result<Option<ClaimOutcome>> {
        if minutes_watched < self.config.threshold_minutes() || self.has_claimed() {
            return Ok(None);
        }

        self.claim_bonus(user_id, stream_id, minutes_watched).await.map(Some)
    }

    /// Asks the store for the watch-time bonus.
    ///
    /// [`ClaimOutcome::Awarded`] and [`ClaimOutcome::AlreadyClaimed`] both settle the claim and
    /// set the local flag. A transient store failure yields [`ClaimOutcome::Unavailable`] and
    /// leaves the flag unset, so the next heartbeat tries again.
    ///
    /// # Errors
    ///
    /// Returns non-transient store errors, such as an unknown stream.
    pub async fn claim_bonus(&self, user_id: &UserId, stream_id: &StreamId, minutes_watched: u32) -> Result<ClaimOutcome> {
        let response = match self.store.award_presence_bonus(user_id, stream_id, minutes_watched).await {
            Ok(response) => response,
            Err(error) if error.is_transient() => {
                tracing::warn!(
                    stream.id = %stream_id,
                    user.id = %user_id,
                    error = %error,
                    "failed to claim presence bonus"
                );
                return Ok(ClaimOutcome::Unavailable);
            }
            Err(error) => return Err(error),
        };

        let outcome = response.into_outcome();
        self.has_claimed.store(true, Ordering::Release);

        match &outcome {
            ClaimOutcome::Awarded(award) => tracing::info!(
                stream.id = %stream_id,
                user.id = %user_id,
                bonus.amount = award.amount,
                bonus.balance = award.new_balance,
                "presence bonus awarded"
            ),
            ClaimOutcome::AlreadyClaimed { message } => {
                tracing::debug!(stream.id = %stream_id, user.id = %user_id, reason = message.as_str(), "presence bonus already claimed");
            }
            ClaimOutcome::Unavailable => {}
        }

        Ok(outcome)
    }

    /// Records that the viewer left and removes them from the live count.
    ///
    /// Leaving a session that already left is a no-op: the live count is decremented only by
    /// the call that records the departure, so duplicate leaves never undercount the viewers
    /// still watching. When the store cannot tell (the mark failed transiently), the count is
    /// decremented anyway and clamped at zero.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) for an unknown session or
    /// stream, and other non-transient store errors. Transient failures are logged and swallowed.
    pub async fn leave(&self, session_id: &SessionId, stream_id: &StreamId) -> Result<()> {
        match self.store.mark_left(session_id).await {
            Ok(marked) if !marked.is_first_leave() => {
                tracing::debug!(stream.id = %stream_id, session.id = %session_id, "session already left");
                return Ok(());
            }
            Ok(_) => {}
            Err(error) if error.is_transient() => tracing::warn!(
                stream.id = %stream_id,
                session.id = %session_id,
                error = %error,
                "failed to mark session as left"
            ),
            Err(error) => return Err(error),
        }

        match self.store.decrement_viewers(stream_id).await {
            Ok(counters) => {
                tracing::debug!(
                    stream.id = %stream_id,
                    session.id = %session_id,
                    viewers.current = counters.current_viewers,
                    "viewer left"
                );
                Ok(())
            }
            Err(error) if error.is_transient() => {
                tracing::warn!(
                    stream.id = %stream_id,
                    session.id = %session_id,
                    error = %error,
                    "failed to decrement viewer count"
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Reads the current counters of a stream.
    ///
    /// # Errors
    ///
    /// Returns the store error, including transient ones: a read has nothing to fall back to.
    pub async fn counters(&self, stream_id: &StreamId) -> Result<StreamCounters> {
        self.store.stream_counters(stream_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::executor::block_on;

    use super::*;
    use crate::{ErrorKind, InMemoryPresenceStore};

    fn setup() -> (Arc<InMemoryPresenceStore>, PresenceTracker<InMemoryPresenceStore>, StreamId) {
        let clock = Clock::new_frozen();
        let store = Arc::new(InMemoryPresenceStore::new(clock.clone()));
        let stream = StreamId::new("s1");
        store.create_stream(stream.clone());
        let tracker = PresenceTracker::new(Arc::clone(&store), clock);
        (store, tracker, stream)
    }

    #[test]
    fn join_generates_session_id() {
        let (_, tracker, stream) = setup();
        let session = block_on(tracker.join(&stream, None, None)).unwrap();
        assert!(session.session_id.is_anonymous());
        assert_eq!(session.user_id, None);
    }

    #[test]
    fn join_keeps_supplied_session_id() {
        let (_, tracker, stream) = setup();
        let session = block_on(tracker.join(&stream, Some(UserId::new("u1")), Some(SessionId::new("tab-1")))).unwrap();
        assert_eq!(session.session_id, SessionId::new("tab-1"));
        assert_eq!(session.user_id, Some(UserId::new("u1")));
    }

    #[test]
    fn below_threshold_does_not_claim() {
        let (store, tracker, stream) = setup();
        let user = UserId::new("u1");

        assert_eq!(block_on(tracker.report_elapsed(&stream, &user, 9)).unwrap(), None);
        assert_eq!(store.balance(&user), 0);
        assert!(!tracker.has_claimed());
    }

    #[test]
    fn local_flag_skips_store() {
        let (store, tracker, stream) = setup();
        let user = UserId::new("u1");

        assert!(block_on(tracker.report_elapsed(&stream, &user, 10)).unwrap().is_some());
        assert!(tracker.has_claimed());

        // The store would fail this call; the flag keeps it from being made.
        store.fail_next(1);
        assert_eq!(block_on(tracker.report_elapsed(&stream, &user, 11)).unwrap(), None);
    }

    #[test]
    fn reset_flag_lets_store_answer_again() {
        let (store, tracker, stream) = setup();
        let user = UserId::new("u1");

        block_on(tracker.claim_bonus(&user, &stream, 10)).unwrap();
        tracker.reset_claim_flag();

        let outcome = block_on(tracker.report_elapsed(&stream, &user, 12)).unwrap();
        assert!(matches!(outcome, Some(ClaimOutcome::AlreadyClaimed { .. })));
        assert_eq!(store.balance(&user), store.bonus_amount());
    }

    #[test]
    fn custom_threshold_applies() {
        let (_, tracker, stream) = setup();
        let tracker = tracker
            .with_config(PresenceConfig::default().with_bonus_threshold(Duration::from_secs(120)))
            .unwrap();

        let outcome = block_on(tracker.report_elapsed(&stream, &UserId::new("u1"), 2)).unwrap();
        assert!(matches!(outcome, Some(ClaimOutcome::Awarded(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (_, tracker, _) = setup();
        let error = tracker
            .with_config(PresenceConfig::default().with_heartbeat_interval(Duration::ZERO))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn repeated_leave_keeps_other_viewers_counted() {
        let (store, tracker, stream) = setup();
        let first = block_on(tracker.join(&stream, None, None)).unwrap();
        block_on(tracker.join(&stream, None, None)).unwrap();

        block_on(tracker.leave(&first.session_id, &stream)).unwrap();
        block_on(tracker.leave(&first.session_id, &stream)).unwrap();

        let counters = block_on(store.stream_counters(&stream)).unwrap();
        assert_eq!(counters.current_viewers, 1);
        assert_eq!(counters.total_views, 2);
    }

    #[test]
    fn permanent_increment_failure_leaves_session_recorded() {
        let (store, tracker, stream) = setup();
        store.fail_after_with(1, 1, ErrorKind::Store);

        let error = block_on(tracker.join(&stream, None, None)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Store);

        let rows = store.sessions(&stream);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state(), crate::SessionState::Active);
        assert_eq!(block_on(store.stream_counters(&stream)).unwrap(), StreamCounters::default());

        // Leaving the orphaned session is safe: the count stays clamped at zero.
        block_on(tracker.leave(&rows[0].session_id, &stream)).unwrap();
        assert_eq!(block_on(store.stream_counters(&stream)).unwrap().current_viewers, 0);
    }

    #[test]
    fn claim_on_unknown_stream_propagates() {
        let (_, tracker, _) = setup();
        let error = block_on(tracker.claim_bonus(&UserId::new("u1"), &StreamId::new("missing"), 10)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(!tracker.has_claimed());
    }
}
