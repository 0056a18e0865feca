//! Block-aligned copy buffer.

use std::io::{self, Read};

/// An owned buffer holding a whole number of blocks.
///
/// [`fill_from`](Self::fill_from) keeps reading until the buffer is full or
/// the source is exhausted, so a block is never split across two fills.
#[derive(Debug)]
pub struct CopyBuffer {
    data: Vec<u8>,
    len: usize,
    block_size: usize,
}

impl CopyBuffer {
    /// Allocates a buffer of `blocks` blocks of `block_size` bytes.
    #[must_use]
    pub fn new(block_size: usize, blocks: usize) -> Self {
        Self {
            data: vec![0u8; block_size * blocks],
            len: 0,
            block_size,
        }
    }

    /// Capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Replaces the contents with the next bytes from `reader`.
    ///
    /// Returns the number of bytes now held. Anything less than the
    /// capacity means the reader is exhausted; zero means it was already
    /// exhausted before this call.
    ///
    /// # Errors
    ///
    /// Returns the first read error other than [`io::ErrorKind::Interrupted`].
    pub fn fill_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.len = 0;
        while self.len < self.data.len() {
            match reader.read(&mut self.data[self.len..]) {
                Ok(0) => break,
                Ok(n) => self.len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.len)
    }

    /// The bytes read by the last fill.
    #[must_use]
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Mutable access to the bytes read by the last fill.
    pub fn filled_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Number of complete blocks held.
    #[must_use]
    pub fn full_blocks(&self) -> usize {
        self.len / self.block_size
    }

    /// Returns true if the last fill read nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most `step` bytes per read and interrupts every other call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
        interrupt: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn fills_across_short_reads() {
        let source: Vec<u8> = (0..100u8).collect();
        let mut reader = Trickle {
            data: &source,
            step: 7,
            interrupt: false,
        };
        let mut buffer = CopyBuffer::new(16, 4);

        assert_eq!(buffer.fill_from(&mut reader).unwrap(), 64);
        assert_eq!(buffer.full_blocks(), 4);
        assert_eq!(buffer.filled(), &source[..64]);

        assert_eq!(buffer.fill_from(&mut reader).unwrap(), 36);
        assert_eq!(buffer.full_blocks(), 2);
        assert_eq!(buffer.filled(), &source[64..]);

        assert_eq!(buffer.fill_from(&mut reader).unwrap(), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn read_error_propagates() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "bad sector"))
            }
        }

        let mut buffer = CopyBuffer::new(16, 1);
        assert!(buffer.fill_from(&mut Broken).is_err());
        assert_eq!(buffer.capacity(), 16);
    }
}
