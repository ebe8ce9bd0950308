//! Shared types for MTG tooling.
//!
//! Holds the Scryfall wire format and the error type returned by catalog
//! lookups, so tools that talk to Scryfall agree on both.

pub mod error;
pub mod scryfall;

pub use error::{CatalogError, CatalogResult};
pub use scryfall::{CardFace, ImageUris, ScryfallCard, ScryfallError, SearchList};
