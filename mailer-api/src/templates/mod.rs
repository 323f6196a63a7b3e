//! Email templates
//!
//! Per-user reusable content with `{{name}}` placeholders, optionally shared
//! with every user, plus the substitution engine used for templated sends.

pub mod manager;
pub mod renderer;
pub mod types;

pub use manager::TemplateManager;
pub use renderer::{TemplateData, TemplateRenderer};
pub use types::{
    CreateTemplateRequest, RenderedTemplate, Template, UpdateTemplateRequest,
};
