/// Bounded, append-only output buffer for one connection's extracted banner.
///
/// The scanner appends label and value bytes as it discovers them; once the
/// buffer is full, further appends are silently dropped. Truncation is the
/// policy, not an error — a partial banner is still a useful banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl BannerBuffer {
    /// Create an empty buffer that will hold at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        BannerBuffer {
            data: Vec::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Append as many of `bytes` as still fit; drop the rest.
    pub fn append(&mut self, bytes: &[u8]) {
        let room = self.capacity - self.data.len();
        let take = bytes.len().min(room);
        self.data.extend_from_slice(&bytes[..take]);
    }

    /// The banner accumulated so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Current write offset.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The immutable capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes still available before truncation sets in.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Discard the contents, keeping the capacity (for buffer reuse across
    /// connections).
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_within_capacity() {
        let mut buf = BannerBuffer::new(16);
        buf.append(b"hello");
        buf.append(b" world");
        assert_eq!(buf.as_bytes(), b"hello world");
        assert_eq!(buf.remaining(), 5);
    }

    #[test]
    fn append_truncates_silently() {
        let mut buf = BannerBuffer::new(4);
        buf.append(b"abcdef");
        assert_eq!(buf.as_bytes(), b"abcd");
        buf.append(b"x");
        assert_eq!(buf.as_bytes(), b"abcd");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn append_exactly_to_capacity() {
        let mut buf = BannerBuffer::new(3);
        buf.append(b"ab");
        buf.append(b"cd");
        assert_eq!(buf.as_bytes(), b"abc");
        assert_eq!(buf.len(), buf.capacity());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = BannerBuffer::new(8);
        buf.append(b"12345678");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.remaining(), 8);
    }

    #[test]
    fn zero_capacity_accepts_nothing() {
        let mut buf = BannerBuffer::new(0);
        buf.append(b"data");
        assert!(buf.is_empty());
    }
}
