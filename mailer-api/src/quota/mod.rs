//! Daily send quota
//!
//! Each user may send `daily_email_quota` emails per local calendar day.
//! The counter lives on the user row; the window rolls over lazily, the
//! first time the user sends after `reset_quota_date` has passed.

pub mod tracker;
pub mod types;

pub use tracker::{next_reset_after, QuotaTracker};
pub use types::{QuotaSnapshot, QuotaStatus};
