pub mod cache;
pub mod community;
pub mod error;
pub mod friends;
pub mod ledger;
pub mod store;

pub use error::{Error, Result};

use uuid::Uuid;

/// Display name used when no profile row is available for a user id.
pub(crate) fn placeholder_name(id: Uuid) -> String {
    let s = id.to_string();
    format!("User {}", &s[s.len() - 4..])
}

#[cfg(test)]
pub(crate) mod testutil;
