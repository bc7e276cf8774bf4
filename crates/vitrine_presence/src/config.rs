// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::{Error, Result};

/// Watch time after which a viewer may claim the bonus: ten minutes.
pub const DEFAULT_BONUS_THRESHOLD: Duration = Duration::from_secs(600);

/// Period of the watch-time heartbeat: one minute.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Settings of a [`PresenceTracker`](crate::PresenceTracker).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use vitrine_presence::PresenceConfig;
///
/// let config = PresenceConfig::default().with_bonus_threshold(Duration::from_secs(300));
/// assert_eq!(config.threshold_minutes(), 5);
/// config.validate()?;
/// # Ok::<(), vitrine_presence::Error>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct PresenceConfig {
    /// Watch time that qualifies for the bonus.
    pub bonus_threshold: Duration,
    /// Period of the heartbeat started by [`PresenceTracker::spawn_heartbeat`](crate::PresenceTracker::spawn_heartbeat).
    pub heartbeat_interval: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            bonus_threshold: DEFAULT_BONUS_THRESHOLD,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

impl PresenceConfig {
    /// Sets the qualifying watch time.
    #[must_use]
    pub fn with_bonus_threshold(self, bonus_threshold: Duration) -> Self {
        Self { bonus_threshold, ..self }
    }

    /// Sets the heartbeat period.
    #[must_use]
    pub fn with_heartbeat_interval(self, heartbeat_interval: Duration) -> Self {
        Self {
            heartbeat_interval,
            ..self
        }
    }

    /// Returns the qualifying watch time in whole minutes, rounded up.
    #[must_use]
    pub fn threshold_minutes(&self) -> u32 {
        let minutes = self.bonus_threshold.as_secs().div_ceil(60);
        u32::try_from(minutes).unwrap_or(u32::MAX)
    }

    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Configuration`](crate::ErrorKind::Configuration) error if the
    /// threshold or the heartbeat interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.bonus_threshold.is_zero() {
            return Err(Error::configuration("bonus threshold must be greater than zero"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(Error::configuration("heartbeat interval must be greater than zero"));
        }
        Ok(())
    }
}
