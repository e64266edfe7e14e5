//! Utility functions for common operations.
//!
//! - **Text**: Unicode-aware width, truncation, name formatting and control
//!   character stripping for API-provided strings
//! - **Collation**: locale-aware name ordering
//! - **URLs**: resource id extraction and pre-open validation
//!
//! ```
//! use dexview::util::{display_width, id_from_resource_url, CollationKey};
//!
//! assert_eq!(id_from_resource_url("https://pokeapi.co/api/v2/type/10/"), Some(10));
//! assert!(CollationKey::new("abra") < CollationKey::new("Zubat"));
//! assert_eq!(display_width("eevee"), 5);
//! ```

mod collate;
mod text;
mod urls;

pub use collate::CollationKey;
pub use text::{display_name, display_width, strip_control_chars, truncate_to_width};
pub use urls::{id_from_resource_url, validate_url_for_open, UrlValidationError};
