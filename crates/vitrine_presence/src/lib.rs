// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Viewer presence on live streams, with a watch-time bonus granted at most once.
//!
//! A [`PresenceTracker`] is the client side of presence: it records joins and leaves, keeps the
//! live viewer count up to date, and claims a bonus once the viewer has watched long enough
//! (ten minutes by default). Reports are driven by a [`Heartbeat`] every minute.
//!
//! The [`PresenceStore`] behind the tracker is the only serialization point between clients.
//! It must update counters atomically and grant each `(user, stream)` bonus at most once, even
//! when several tabs of the same viewer claim at the same moment.
//! [`InMemoryPresenceStore`] is a reference implementation with those guarantees.
//!
//! # Failure handling
//!
//! Presence is best-effort bookkeeping. Transient store failures on counter updates and claims
//! are logged with `tracing` and swallowed; unknown streams or sessions, configuration problems
//! and other store errors are returned as [`Error`]s. An already claimed bonus and a viewer count
//! already at zero are ordinary outcomes, not errors.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use tick::Clock;
//! use vitrine_presence::{InMemoryPresenceStore, PresenceTracker, StreamId};
//! # futures::executor::block_on(async {
//!
//! let clock = Clock::new_frozen();
//! let store = Arc::new(InMemoryPresenceStore::new(clock.clone()));
//! let stream = StreamId::new("launch");
//! store.create_stream(stream.clone());
//!
//! let tracker = PresenceTracker::new(Arc::clone(&store), clock);
//! let session = tracker.join(&stream, None, None).await?;
//! assert_eq!(tracker.counters(&stream).await?.current_viewers, 1);
//!
//! tracker.leave(&session.session_id, &stream).await?;
//! tracker.leave(&session.session_id, &stream).await?;
//! assert_eq!(tracker.counters(&stream).await?.current_viewers, 0);
//! # Ok::<(), vitrine_presence::Error>(())
//! # });
//! ```

mod bonus;
mod config;
mod counters;
mod error;
mod heartbeat;
mod ids;
mod memory;
mod session;
mod store;
mod tracker;

pub use bonus::{BonusAward, BonusResponse, ClaimOutcome, ClaimState};
pub use config::{DEFAULT_BONUS_THRESHOLD, DEFAULT_HEARTBEAT_INTERVAL, PresenceConfig};
pub use counters::StreamCounters;
pub use error::{Error, ErrorKind, Result};
pub use heartbeat::Heartbeat;
pub use ids::{SessionId, StreamId, UserId};
pub use memory::{DEFAULT_BONUS_AMOUNT, InMemoryPresenceStore};
pub use session::{MarkedLeft, NewSession, SessionState, ViewerSession};
pub use store::PresenceStore;
pub use tracker::PresenceTracker;
