//! Identifier types for ledger entities.
//!
//! All identifiers are database-assigned 64-bit integers. The newtypes keep an
//! account id from being passed where an entry or transfer id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw database id.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw database id.
            pub const fn get(&self) -> i64 {
                self.0
            }

            /// Database sequences start at 1, so only positive ids can refer to a row.
            pub const fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

ledger_id!(
    /// Unique identifier for an account.
    AccountId
);

ledger_id!(
    /// Unique identifier for a balance-change entry.
    EntryId
);

ledger_id!(
    /// Unique identifier for a transfer.
    TransferId
);
