// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Watch-time bonus claims.

/// A granted bonus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BonusAward {
    /// Points credited by this claim.
    pub amount: u64,
    /// Account balance after the credit.
    pub new_balance: u64,
}

/// Raw reply of the store's claim procedure.
///
/// `success: false` is not a failure: it is how the store signals a pair that already claimed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BonusResponse {
    /// Whether this call granted the bonus.
    pub success: bool,
    /// Human-readable explanation from the store.
    pub message: String,
    /// Points credited, on success.
    pub amount: Option<u64>,
    /// Account balance after the credit, on success.
    pub new_balance: Option<u64>,
}

impl BonusResponse {
    /// Builds the reply for a granted claim.
    #[must_use]
    pub fn awarded(amount: u64, new_balance: u64) -> Self {
        Self {
            success: true,
            message: "bonus awarded".to_string(),
            amount: Some(amount),
            new_balance: Some(new_balance),
        }
    }

    /// Builds the reply for a pair that already claimed.
    #[must_use]
    pub fn already_claimed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            amount: None,
            new_balance: None,
        }
    }

    /// Interprets the reply.
    ///
    /// A successful reply missing its amount or balance is read as zero for the missing field.
    #[must_use]
    pub fn into_outcome(self) -> ClaimOutcome {
        if self.success {
            ClaimOutcome::Awarded(BonusAward {
                amount: self.amount.unwrap_or_default(),
                new_balance: self.new_balance.unwrap_or_default(),
            })
        } else {
            ClaimOutcome::AlreadyClaimed { message: self.message }
        }
    }
}

/// What a claim attempt produced, as seen by the viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This attempt granted the bonus.
    Awarded(BonusAward),
    /// The bonus was granted earlier, to this or another tab. Not an error.
    AlreadyClaimed {
        /// Explanation from the store.
        message: String,
    },
    /// The store could not be reached; a later attempt may succeed.
    Unavailable,
}

impl ClaimOutcome {
    /// Returns `true` if the claim is settled, one way or the other, and need not be retried.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// Returns the award, if this attempt granted one.
    #[must_use]
    pub fn award(&self) -> Option<BonusAward> {
        match self {
            Self::Awarded(award) => Some(*award),
            Self::AlreadyClaimed { .. } | Self::Unavailable => None,
        }
    }
}

/// Claim state of one `(user, stream)` pair. The only transition is `Unclaimed -> Claimed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClaimState {
    /// No bonus was granted yet.
    #[default]
    Unclaimed,
    /// The bonus was granted.
    Claimed {
        /// Watch time reported by the successful claim.
        watch_minutes: u32,
    },
}
