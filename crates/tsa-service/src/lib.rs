//! Collaborators around the time-stamp protocol engine
//!
//! The engine itself performs no persistence and no notification. This
//! crate provides the narrow interfaces it is wired to at startup: a
//! repository that stores issued responses and assigns their identifiers,
//! and listeners notified after each successful save.

pub mod error;
pub mod issue;
pub mod listener;
pub mod repository;

pub use error::{Error, Result};
pub use issue::{IssueTimeStampService, ValidateTimeStampService};
pub use listener::TimeStampListener;
pub use repository::{InMemoryResponseRepository, ResponseRepository};
