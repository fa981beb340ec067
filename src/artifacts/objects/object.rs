use anyhow::Result;
use std::io::BufRead;

/// Objects that can be read back from their database representation
///
/// The reader is positioned right after the `<type> <size>\0` header.
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}
