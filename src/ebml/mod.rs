//! EBML tag events.
//!
//! Matroska is a tree of EBML elements. Decoding is done by `webm_iterable`;
//! this module narrows its output to `Start` / `End` / `Tag` events over the
//! small subset of Matroska that subtitle recovery needs.

pub mod element;
pub mod event;
pub mod reader;

pub use element::ElementId;
pub use event::{TagEvent, TagValue};
pub use reader::{DEFAULT_MAX_ELEMENT_SIZE, TagReader};
