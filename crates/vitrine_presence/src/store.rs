// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The collaborator store contract.

use crate::{BonusResponse, MarkedLeft, NewSession, Result, SessionId, StreamCounters, StreamId, UserId, ViewerSession};

/// Persistent store backing presence tracking.
///
/// The store is the only serialization point between independent clients: every counter update
/// and every claim must be atomic on the store side (a conditional update or a transaction),
/// never a read-then-write from the client.
///
/// Transient failures (the store could not be reached) are reported as
/// [`ErrorKind::Unavailable`](crate::ErrorKind::Unavailable).
pub trait PresenceStore: Send + Sync {
    /// Records a new session and returns the stored row.
    ///
    /// Fails with [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) if the stream does not
    /// exist; the store must not create streams implicitly.
    fn insert_session(&self, session: NewSession) -> impl Future<Output = Result<ViewerSession>> + Send;

    /// Sets `left_at` on the session if it is not set yet.
    ///
    /// Marking an already left session leaves its `left_at` unchanged and reports
    /// [`MarkedLeft::AlreadyLeft`]. Fails with [`ErrorKind::NotFound`](crate::ErrorKind::NotFound)
    /// for an unknown session.
    fn mark_left(&self, session_id: &SessionId) -> impl Future<Output = Result<MarkedLeft>> + Send;

    /// Atomically adds one live viewer and one total view.
    fn increment_viewers(&self, stream_id: &StreamId) -> impl Future<Output = Result<StreamCounters>> + Send;

    /// Atomically removes one live viewer, saturating at zero.
    fn decrement_viewers(&self, stream_id: &StreamId) -> impl Future<Output = Result<StreamCounters>> + Send;

    /// Reads the counters of a stream.
    fn stream_counters(&self, stream_id: &StreamId) -> impl Future<Output = Result<StreamCounters>> + Send;

    /// Grants the watch-time bonus at most once per `(user, stream)`.
    ///
    /// Duplicate and concurrent calls for a pair that already claimed return a response with
    /// `success: false`, not an error.
    fn award_presence_bonus(
        &self,
        user_id: &UserId,
        stream_id: &StreamId,
        watch_minutes: u32,
    ) -> impl Future<Output = Result<BonusResponse>> + Send;
}
