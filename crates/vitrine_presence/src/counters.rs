// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Live and cumulative viewer counts of a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamCounters {
    /// Viewers currently on the stream. Never negative.
    pub current_viewers: u64,
    /// Every join ever recorded, repeat joins included. Never decreases.
    pub total_views: u64,
}

impl StreamCounters {
    /// Returns the counters after one more viewer joined.
    #[must_use]
    pub fn joined(self) -> Self {
        Self {
            current_viewers: self.current_viewers.saturating_add(1),
            total_views: self.total_views.saturating_add(1),
        }
    }

    /// Returns the counters after one viewer left, clamped at zero live viewers.
    #[must_use]
    pub fn left(self) -> Self {
        Self {
            current_viewers: self.current_viewers.saturating_sub(1),
            ..self
        }
    }
}
