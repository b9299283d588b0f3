//! HTTP backends for the stocktake toolkit.
//!
//! [`InventoryClient`] implements the record store contract over the
//! workspace REST surface; [`DirectoryClient`] implements the identity
//! lookup contract. Both derive their roots and credentials from one
//! [`Connection`] and pace requests through a minimum-interval
//! throttle sized from a calls-per-minute budget.

mod connection;
mod directory;
mod dto;
mod inventory;
mod throttle;

pub use connection::{Connection, DEFAULT_REQUESTS_PER_MINUTE};
pub use directory::{DirectoryClient, PREFERRED_ACCOUNT_TYPE};
pub use inventory::InventoryClient;
