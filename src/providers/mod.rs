//! Provider catalog: request templates, response field paths, defaults.

pub mod descriptor;
pub mod path;
pub mod template;

pub use descriptor::{AuthStyle, ProviderCatalog, ProviderDescriptor};
pub use path::{FieldPath, PathParseError, PathSegment, ResolveError};
pub use template::{BodyTemplate, TemplateError, MESSAGE_PLACEHOLDER};
