//! scalemate-templates — resolves named metric templates.
//!
//! A template is one YAML file under a configured directory, named by
//! the template name and decoding into a single
//! [`MetricSpec`](scalemate_core::MetricSpec). Resolution failures are
//! per-name: a caller resolving a list skips the bad entry and keeps
//! the rest.

pub mod resolver;

pub use resolver::{TemplateError, TemplateStore};
