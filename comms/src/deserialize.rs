use std::io;

/// Rebuilds a value from the payload of a single frame.
pub trait Deserialize<'a>: Sized {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
