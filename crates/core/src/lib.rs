pub mod catalog;
pub mod format;
pub mod locale;
pub mod localized;
pub mod models;
pub mod text;
pub mod validate;

pub use locale::{Locale, TextDirection};
pub use localized::{localized_field, localized_variant};
pub use models::*;
pub use text::{excerpt, normalize_text};
pub use validate::{ValidationError, ValidationIssue};
