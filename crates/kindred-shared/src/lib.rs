//! # kindred-shared
//!
//! Domain vocabulary shared by every Kindred crate: the fixed avatar set,
//! friend-request states, and the moderation policy constants.

pub mod constants;
pub mod types;

pub use types::{Avatar, RequestStatus, RespondAction};
