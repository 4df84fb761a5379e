pub mod aggregate;
pub mod content;

pub use content::{ContentEntity, ContentService, ListParams, Listing};
