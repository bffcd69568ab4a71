//! Built-in transform steps.
//!
//! These always run, in this order, before any extension step:
//!
//! 1. **LayoutStep** - Pick a layout when the document does not name one
//! 2. **UrlStep** - Apply the site base URL to links and the document URL
//! 3. **MetadataStep** - Attach display date, reading time and site data

mod layout;
mod metadata;
mod urls;

pub use layout::{DEFAULT_LAYOUT, LayoutStep};
pub use metadata::MetadataStep;
pub use urls::UrlStep;
