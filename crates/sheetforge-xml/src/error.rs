//! Error type for this crate's own fallible schema-level operations,
//! independent of whatever XML (de)serialization library parsed the
//! document.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("comment references unknown authorId {0}")]
    UnknownAuthor(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
