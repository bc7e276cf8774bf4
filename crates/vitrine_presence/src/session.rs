// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::SystemTime;

use crate::{SessionId, StreamId, UserId};

/// Lifecycle of a viewer session.
///
/// A session that was never joined has no row at all; a left session never becomes active again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    /// The viewer is on the stream page.
    Active,
    /// The viewer left. Terminal.
    Left,
}

/// A viewer session row as recorded by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewerSession {
    /// Store-generated row id.
    pub id: u64,
    /// Caller-supplied or generated session id.
    pub session_id: SessionId,
    /// The viewer, if authenticated.
    pub user_id: Option<UserId>,
    /// The stream being watched.
    pub stream_id: StreamId,
    /// When the session was recorded.
    pub joined_at: SystemTime,
    /// When the viewer left, if they did.
    pub left_at: Option<SystemTime>,
}

impl ViewerSession {
    /// Returns the lifecycle state of this session.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.left_at.is_some() {
            SessionState::Left
        } else {
            SessionState::Active
        }
    }
}

/// What [`PresenceStore::mark_left`](crate::PresenceStore::mark_left) did to a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkedLeft {
    /// This call recorded the departure.
    Marked(ViewerSession),
    /// The session had already left; `left_at` keeps its earlier value.
    AlreadyLeft(ViewerSession),
}

impl MarkedLeft {
    /// Returns the session row after the call.
    #[must_use]
    pub fn session(&self) -> &ViewerSession {
        match self {
            Self::Marked(session) | Self::AlreadyLeft(session) => session,
        }
    }

    /// Returns `true` if this call recorded the departure.
    #[must_use]
    pub fn is_first_leave(&self) -> bool {
        matches!(self, Self::Marked(_))
    }
}

/// The fields a caller supplies when recording a new session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewSession {
    /// Session id, already generated if the caller had none.
    pub session_id: SessionId,
    /// The viewer, if authenticated.
    pub user_id: Option<UserId>,
    /// The stream being joined.
    pub stream_id: StreamId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_follows_left_at() {
        let mut session = ViewerSession {
            id: 1,
            session_id: SessionId::new("tab-1"),
            user_id: None,
            stream_id: StreamId::new("s1"),
            joined_at: SystemTime::UNIX_EPOCH,
            left_at: None,
        };
        assert_eq!(session.state(), SessionState::Active);

        session.left_at = Some(SystemTime::UNIX_EPOCH);
        assert_eq!(session.state(), SessionState::Left);

        let repeated = MarkedLeft::AlreadyLeft(session.clone());
        assert!(!repeated.is_first_leave());
        assert_eq!(repeated.session(), &session);
        assert!(MarkedLeft::Marked(session).is_first_leave());
    }
}
