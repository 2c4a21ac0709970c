/// Turns a value into the payload of a single frame.
pub trait Serialize<'a> {
    /// Writes the owned part of the payload into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to append the serialized bytes to.
    ///
    /// # Returns
    /// An optional borrowed tail that is sent right after `buf` without being copied.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
