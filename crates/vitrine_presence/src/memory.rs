// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-process reference implementation of [`PresenceStore`].

use std::collections::HashMap;

use parking_lot::Mutex;
use tick::Clock;

use crate::{
    BonusResponse, ClaimState, Error, MarkedLeft, NewSession, PresenceStore, Result, SessionId, StreamCounters, StreamId, UserId,
    ViewerSession,
};

/// Points granted by a successful claim unless configured otherwise.
pub const DEFAULT_BONUS_AMOUNT: u64 = 10;

#[derive(Debug, Default)]
struct State {
    next_row_id: u64,
    streams: HashMap<StreamId, StreamCounters>,
    sessions: Vec<ViewerSession>,
    claims: HashMap<(UserId, StreamId), ClaimState>,
    balances: HashMap<UserId, u64>,
}

#[cfg(any(test, feature = "test-util"))]
#[derive(Debug)]
struct FailurePlan {
    skip: usize,
    fail: usize,
    kind: crate::ErrorKind,
}

#[cfg(any(test, feature = "test-util"))]
impl Default for FailurePlan {
    fn default() -> Self {
        Self {
            skip: 0,
            fail: 0,
            kind: crate::ErrorKind::Unavailable,
        }
    }
}

/// A [`PresenceStore`] kept in process memory.
///
/// All state sits behind a single mutex and every operation runs as one critical section, which
/// gives the same guarantees a database provides with conditional updates: counter updates are
/// atomic, and at most one claim per `(user, stream)` succeeds however many race.
///
/// Streams must be registered with [`create_stream`](Self::create_stream) before viewers can
/// join them.
///
/// # Examples
///
/// ```
/// use tick::Clock;
/// use vitrine_presence::{InMemoryPresenceStore, StreamId};
///
/// let store = InMemoryPresenceStore::new(Clock::new_frozen()).with_bonus_amount(25);
/// store.create_stream(StreamId::new("launch"));
///
/// assert_eq!(store.bonus_amount(), 25);
/// ```
#[derive(Debug)]
pub struct InMemoryPresenceStore {
    clock: Clock,
    bonus_amount: u64,
    state: Mutex<State>,
    #[cfg(any(test, feature = "test-util"))]
    failures: Mutex<FailurePlan>,
}

impl InMemoryPresenceStore {
    /// Creates an empty store that timestamps rows with `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            bonus_amount: DEFAULT_BONUS_AMOUNT,
            state: Mutex::new(State::default()),
            #[cfg(any(test, feature = "test-util"))]
            failures: Mutex::new(FailurePlan::default()),
        }
    }

    /// Sets the points granted by a successful claim.
    #[must_use]
    pub fn with_bonus_amount(mut self, amount: u64) -> Self {
        self.bonus_amount = amount;
        self
    }

    /// Returns the points granted by a successful claim.
    #[must_use]
    pub fn bonus_amount(&self) -> u64 {
        self.bonus_amount
    }

    /// Registers a stream with zeroed counters.
    ///
    /// Returns `false` if the stream already exists; its counters are left untouched.
    pub fn create_stream(&self, stream_id: StreamId) -> bool {
        let mut state = self.state.lock();
        if state.streams.contains_key(&stream_id) {
            return false;
        }
        state.streams.insert(stream_id, StreamCounters::default());
        true
    }

    /// Returns the bonus balance of a user; zero for users never credited.
    #[must_use]
    pub fn balance(&self, user_id: &UserId) -> u64 {
        self.state.lock().balances.get(user_id).copied().unwrap_or_default()
    }

    /// Returns every session row recorded for a stream, in insertion order.
    #[must_use]
    pub fn sessions(&self, stream_id: &StreamId) -> Vec<ViewerSession> {
        self.state
            .lock()
            .sessions
            .iter()
            .filter(|session| &session.stream_id == stream_id)
            .cloned()
            .collect()
    }

    /// Returns the claim state of a `(user, stream)` pair.
    #[must_use]
    pub fn claim_state(&self, user_id: &UserId, stream_id: &StreamId) -> ClaimState {
        self.state
            .lock()
            .claims
            .get(&(user_id.clone(), stream_id.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// Makes the next `count` store calls fail with a transient error.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_next(&self, count: usize) {
        self.fail_after(0, count);
    }

    /// Lets `skip` store calls succeed, then makes the following `count` calls fail with a
    /// transient error.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_after(&self, skip: usize, count: usize) {
        self.fail_after_with(skip, count, crate::ErrorKind::Unavailable);
    }

    /// Lets `skip` store calls succeed, then makes the following `count` calls fail with an
    /// error of `kind`.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_after_with(&self, skip: usize, count: usize, kind: crate::ErrorKind) {
        *self.failures.lock() = FailurePlan { skip, fail: count, kind };
    }

    #[cfg(any(test, feature = "test-util"))]
    fn injected_failure(&self, operation: &'static str) -> Result<()> {
        let mut plan = self.failures.lock();
        if plan.skip > 0 {
            plan.skip -= 1;
            return Ok(());
        }
        if plan.fail > 0 {
            plan.fail -= 1;
            return Err(Error::caused_by(plan.kind, format!("injected failure in {operation}")));
        }
        Ok(())
    }
}

fn unknown_stream(stream_id: &StreamId) -> Error {
    Error::not_found(format!("stream {stream_id} does not exist"))
}

impl PresenceStore for InMemoryPresenceStore {
    async fn insert_session(&self, session: NewSession) -> Result<ViewerSession> {
        #[cfg(any(test, feature = "test-util"))]
        self.injected_failure("insert_session")?;

        let mut state = self.state.lock();
        if !state.streams.contains_key(&session.stream_id) {
            return Err(unknown_stream(&session.stream_id));
        }

        state.next_row_id += 1;
        let row = ViewerSession {
            id: state.next_row_id,
            session_id: session.session_id,
            user_id: session.user_id,
            stream_id: session.stream_id,
            joined_at: self.clock.system_time(),
            left_at: None,
        };
        state.sessions.push(row.clone());
        Ok(row)
    }

    async fn mark_left(&self, session_id: &SessionId) -> Result<MarkedLeft> {
        #[cfg(any(test, feature = "test-util"))]
        self.injected_failure("mark_left")?;

        let now = self.clock.system_time();
        let mut state = self.state.lock();
        let mut latest = None;
        let mut marked = false;
        for session in state.sessions.iter_mut().filter(|s| &s.session_id == session_id) {
            if session.left_at.is_none() {
                session.left_at = Some(now);
                marked = true;
            }
            latest = Some(session.clone());
        }

        let session = latest.ok_or_else(|| Error::not_found(format!("session {session_id} does not exist")))?;
        Ok(if marked {
            MarkedLeft::Marked(session)
        } else {
            MarkedLeft::AlreadyLeft(session)
        })
    }

    async fn increment_viewers(&self, stream_id: &StreamId) -> Result<StreamCounters> {
        #[cfg(any(test, feature = "test-util"))]
        self.injected_failure("increment_viewers")?;

        let mut state = self.state.lock();
        let counters = state.streams.get_mut(stream_id).ok_or_else(|| unknown_stream(stream_id))?;
        *counters = counters.joined();
        Ok(*counters)
    }

    async fn decrement_viewers(&self, stream_id: &StreamId) -> Result<StreamCounters> {
        #[cfg(any(test, feature = "test-util"))]
        self.injected_failure("decrement_viewers")?;

        let mut state = self.state.lock();
        let counters = state.streams.get_mut(stream_id).ok_or_else(|| unknown_stream(stream_id))?;
        *counters = counters.left();
        Ok(*counters)
    }

    async fn stream_counters(&self, stream_id: &StreamId) -> Result<StreamCounters> {
        #[cfg(any(test, feature = "test-util"))]
        self.injected_failure("stream_counters")?;

        self.state
            .lock()
            .streams
            .get(stream_id)
            .copied()
            .ok_or_else(|| unknown_stream(stream_id))
    }

    async fn award_presence_bonus(&self, user_id: &UserId, stream_id: &StreamId, watch_minutes: u32) -> Result<BonusResponse> {
        #[cfg(any(test, feature = "test-util"))]
        self.injected_failure("award_presence_bonus")?;

        let mut state = self.state.lock();
        if !state.streams.contains_key(stream_id) {
            return Err(unknown_stream(stream_id));
        }

        let claim = state.claims.entry((user_id.clone(), stream_id.clone())).or_default();
        if let ClaimState::Claimed { .. } = claim {
            return Ok(BonusResponse::already_claimed(format!(
                "bonus for stream {stream_id} already claimed"
            )));
        }
        *claim = ClaimState::Claimed { watch_minutes };

        let balance = state.balances.entry(user_id.clone()).or_default();
        *balance = balance.saturating_add(self.bonus_amount);
        Ok(BonusResponse::awarded(self.bonus_amount, *balance))
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::{ErrorKind, SessionState};

    fn store_with_stream() -> (InMemoryPresenceStore, StreamId) {
        let store = InMemoryPresenceStore::new(Clock::new_frozen());
        let stream = StreamId::new("s1");
        assert!(store.create_stream(stream.clone()));
        (store, stream)
    }

    fn new_session(id: &str, stream: &StreamId) -> NewSession {
        NewSession {
            session_id: SessionId::new(id),
            user_id: None,
            stream_id: stream.clone(),
        }
    }

    #[test]
    fn create_stream_is_idempotent() {
        let (store, stream) = store_with_stream();
        block_on(store.increment_viewers(&stream)).unwrap();

        assert!(!store.create_stream(stream.clone()));
        assert_eq!(block_on(store.stream_counters(&stream)).unwrap().current_viewers, 1);
    }

    #[test]
    fn insert_into_unknown_stream_is_not_found() {
        let store = InMemoryPresenceStore::new(Clock::new_frozen());
        let error = block_on(store.insert_session(new_session("tab-1", &StreamId::new("missing")))).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn row_ids_increase() {
        let (store, stream) = store_with_stream();
        let first = block_on(store.insert_session(new_session("tab-1", &stream))).unwrap();
        let second = block_on(store.insert_session(new_session("tab-2", &stream))).unwrap();

        assert!(second.id > first.id);
        assert_eq!(store.sessions(&stream).len(), 2);
    }

    #[test]
    fn mark_left_keeps_first_timestamp() {
        let control = tick::ClockControl::new();
        let store = InMemoryPresenceStore::new(control.to_clock());
        let stream = StreamId::new("s1");
        store.create_stream(stream.clone());
        block_on(store.insert_session(new_session("tab-1", &stream))).unwrap();

        let first = block_on(store.mark_left(&SessionId::new("tab-1"))).unwrap();
        control.advance(std::time::Duration::from_secs(5));
        let second = block_on(store.mark_left(&SessionId::new("tab-1"))).unwrap();

        assert!(first.is_first_leave());
        assert!(!second.is_first_leave());
        assert_eq!(first.session().state(), SessionState::Left);
        assert_eq!(first.session().left_at, second.session().left_at);
    }

    #[test]
    fn mark_left_unknown_session_is_not_found() {
        let (store, _) = store_with_stream();
        let error = block_on(store.mark_left(&SessionId::new("ghost"))).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn decrement_saturates() {
        let (store, stream) = store_with_stream();
        let counters = block_on(store.decrement_viewers(&stream)).unwrap();
        assert_eq!(counters, StreamCounters::default());
    }

    #[test]
    fn second_claim_is_rejected_without_credit() {
        let (store, stream) = store_with_stream();
        let user = UserId::new("u1");

        let first = block_on(store.award_presence_bonus(&user, &stream, 10)).unwrap();
        let second = block_on(store.award_presence_bonus(&user, &stream, 12)).unwrap();

        assert!(first.success);
        assert_eq!(first.new_balance, Some(DEFAULT_BONUS_AMOUNT));
        assert!(!second.success);
        assert_eq!(store.balance(&user), DEFAULT_BONUS_AMOUNT);
        assert_eq!(store.claim_state(&user, &stream), ClaimState::Claimed { watch_minutes: 10 });
    }

    #[test]
    fn claims_are_per_stream() {
        let (store, stream) = store_with_stream();
        let other = StreamId::new("s2");
        store.create_stream(other.clone());
        let user = UserId::new("u1");

        assert!(block_on(store.award_presence_bonus(&user, &stream, 10)).unwrap().success);
        assert!(block_on(store.award_presence_bonus(&user, &other, 10)).unwrap().success);
        assert_eq!(store.balance(&user), 2 * DEFAULT_BONUS_AMOUNT);
    }

    #[test]
    fn failures_can_be_delayed() {
        let (store, stream) = store_with_stream();
        store.fail_after(1, 1);

        block_on(store.increment_viewers(&stream)).unwrap();
        assert!(block_on(store.increment_viewers(&stream)).unwrap_err().is_transient());
        assert_eq!(block_on(store.stream_counters(&stream)).unwrap().current_viewers, 1);
    }

    #[test]
    fn injected_failures_can_be_permanent() {
        let (store, stream) = store_with_stream();
        store.fail_after_with(0, 1, ErrorKind::Store);

        let error = block_on(store.increment_viewers(&stream)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Store);
        assert!(!error.is_transient());
    }

    #[test]
    fn injected_failures_are_transient_and_consumed() {
        let (store, stream) = store_with_stream();
        store.fail_next(2);

        assert!(block_on(store.increment_viewers(&stream)).unwrap_err().is_transient());
        assert!(block_on(store.stream_counters(&stream)).unwrap_err().is_transient());
        assert_eq!(block_on(store.stream_counters(&stream)).unwrap(), StreamCounters::default());
    }
}
