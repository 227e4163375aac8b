//! Pull-style tag reader over `webm_iterable`.
//!
//! [`TagReader`] wraps a [`WebmIterator`] that buffers nothing, so master
//! elements arrive as `Start`/`End` pairs and leaves arrive one at a time.
//! Bytes are only pulled from the source when the next tag needs them, which
//! is what lets an extraction stop reading as soon as it has enough.

use std::io::Read;

use webm_iterable::WebmIterator;

use crate::ebml::event::TagEvent;
use crate::error::ExtractError;

/// Largest element the reader accepts by default (256 MiB).
pub const DEFAULT_MAX_ELEMENT_SIZE: u64 = 256 * 1024 * 1024;

/// Iterator of [`TagEvent`]s decoded from a byte source.
///
/// Yields `Err(ExtractError::Decode { .. })` once when the source violates
/// the EBML grammar; callers stop at the first error.
pub struct TagReader<R: Read> {
    tags: WebmIterator<R>,
    failed: bool,
}

impl<R: Read> TagReader<R> {
    /// Read tags from `source` with the default element size limit.
    pub fn new(source: R) -> Self {
        Self::with_max_element_size(source, DEFAULT_MAX_ELEMENT_SIZE)
    }

    /// Read tags from `source`, rejecting elements larger than `limit` bytes.
    pub fn with_max_element_size(source: R, limit: u64) -> Self {
        let mut tags = WebmIterator::new(source, &[]);
        tags.set_max_allowable_tag_size(Some(usize::try_from(limit.max(1)).unwrap_or(usize::MAX)));
        Self {
            tags,
            failed: false,
        }
    }

    /// Byte offset of the last tag handed out.
    pub fn offset(&self) -> u64 {
        self.tags.last_emitted_tag_offset() as u64
    }
}

impl<R: Read> Iterator for TagReader<R> {
    type Item = Result<TagEvent, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.tags.next()? {
                Ok(tag) => {
                    if let Some(event) = TagEvent::from_tag(tag) {
                        return Some(Ok(event));
                    }
                }
                Err(error) => {
                    self.failed = true;
                    log::debug!("Tag reader failed near byte {}: {error}", self.offset());
                    return Some(Err(ExtractError::decode(self.offset(), error.to_string())));
                }
            }
        }
    }
}
