// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Identifiers of streams, users and viewer sessions.

use std::{fmt, time::UNIX_EPOCH};

use tick::Clock;

const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from its textual form.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the textual form of the identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifies a live stream.
    StreamId
}

string_id! {
    /// Identifies an authenticated viewer.
    UserId
}

string_id! {
    /// Identifies one viewing session: one page view of one stream, possibly anonymous.
    SessionId
}

impl SessionId {
    /// Generates an anonymous session id of the form `anon_<unix-millis>_<random>`.
    ///
    /// `<random>` is nine lowercase base-36 characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use tick::Clock;
    /// use vitrine_presence::SessionId;
    ///
    /// let id = SessionId::generate(&Clock::new_frozen());
    /// assert!(id.as_str().starts_with("anon_"));
    /// ```
    #[must_use]
    pub fn generate(clock: &Clock) -> Self {
        let millis = clock.system_time().duration_since(UNIX_EPOCH).map_or(0, |since| since.as_millis());
        let suffix: String = (0..SESSION_SUFFIX_LEN)
            .map(|_| char::from(BASE36[fastrand::usize(..BASE36.len())]))
            .collect();

        Self(format!("anon_{millis}_{suffix}"))
    }

    /// Returns `true` if this id was produced by [`SessionId::generate`].
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.starts_with("anon_")
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn generated_session_id_format() {
        let clock = Clock::new_frozen_at(SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123));
        let id = SessionId::generate(&clock);

        let mut parts = id.as_str().split('_');
        assert_eq!(parts.next(), Some("anon"));
        assert_eq!(parts.next(), Some("1700000000123"));

        let suffix = parts.next().unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
        assert_eq!(parts.next(), None);
        assert!(id.is_anonymous());
    }

    #[test]
    fn generated_session_ids_differ() {
        let clock = Clock::new_frozen();
        assert_ne!(SessionId::generate(&clock), SessionId::generate(&clock));
    }

    #[test]
    fn ids_convert_from_strings() {
        assert_eq!(StreamId::from("s1"), StreamId::new("s1".to_string()));
        assert_eq!(UserId::from("u1").to_string(), "u1");
        assert_eq!(SessionId::from("tab-1").as_ref(), "tab-1");
        assert!(!SessionId::from("tab-1").is_anonymous());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&StreamId::new("s1")).unwrap();
        assert_eq!(json, r#""s1""#);
    }
}
