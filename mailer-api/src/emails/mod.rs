//! Send records and the dispatch pipeline
//!
//! ```text
//! validate → quota check → record (pending) → transport → sent | failed
//!                                                  └─ on success: quota +1
//! ```

pub mod service;
pub mod store;
pub mod types;

pub use service::DispatchService;
pub use store::EmailStore;
pub use types::{
    AttachmentInput, AttachmentMeta, EmailRecord, EmailStatus, Metadata, MetadataValue,
    SendEmailRequest, SendTemplatedRequest,
};
