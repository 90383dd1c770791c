//! Back-office models.

pub mod session;

pub use session::{CurrentUser, StaffUser, keys as session_keys};
