//! HTML parsing and field extraction
//!
//! - [`selectors`]: runtime selector compilation and item exclusion
//! - [`text`]: the text extraction primitive shared by text fields and date
//!   components
//! - [`item`]: per-type field dispatch and the per-item subpage cache

pub mod item;
pub mod selectors;
pub mod text;

pub use item::{resolve_field, FieldFailure, SubpageCache};
pub use selectors::{parse_selector, ExclusionSet};
pub use text::{extract_regex, extract_text};
