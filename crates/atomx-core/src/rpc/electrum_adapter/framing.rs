//! Newline framing for one request/response cycle.
//!
//! The framer treats the first chunk that contains a `\n` as the end of the
//! response and hands back everything buffered so far, that chunk included.
//! It does not split on the terminator: a chunk carrying two responses, or
//! a response followed by further bytes, is returned as one unit and will
//! fail JSON decoding upstream.

const TERMINATOR: u8 = b'\n';

#[derive(Debug, Default)]
pub(crate) struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append one inbound chunk. Returns the complete frame once the chunk
    /// contains a terminator.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Option<String> {
        self.buf.extend_from_slice(chunk);
        if chunk.contains(&TERMINATOR) {
            Some(String::from_utf8_lossy(&std::mem::take(&mut self.buf)).into_owned())
        } else {
            None
        }
    }

    pub(crate) fn buffered(&self) -> usize {
        self.buf.len()
    }
}
