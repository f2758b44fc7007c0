use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Server-assigned primary keys. The backend hands out positive integers and
/// the client never mints its own, so each entity gets a distinct newtype to
/// keep a `FlowId` from being passed where a `CsvId` is expected.
macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| CoreError::InvalidId {
                        value: s.to_string(),
                    })
            }
        }
    };
}

backend_id!(
    /// Identifies a project.
    ProjectId
);
backend_id!(
    /// Identifies an uploaded CSV dataset.
    CsvId
);
backend_id!(
    /// Identifies a flow (one pipeline run under a project).
    FlowId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let id: FlowId = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "FlowId(42)");
    }

    #[test]
    fn rejects_non_numeric() {
        assert!("abc".parse::<CsvId>().is_err());
        assert!("-1".parse::<ProjectId>().is_err());
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&CsvId::new(10)).unwrap();
        assert_eq!(json, "10");
        let back: CsvId = serde_json::from_str("11").unwrap();
        assert_eq!(back, CsvId::new(11));
    }
}
