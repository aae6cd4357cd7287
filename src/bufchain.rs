use std::collections::VecDeque;

use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};

#[derive(Debug, Default)]
pub struct BufChain {
    segments: VecDeque<Bytes>,
    len: usize,
}

impl BufChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn add(&mut self, data: impl Into<Bytes>) {
        let data = data.into();
        if data.is_empty() {
            return;
        }
        self.len += data.len();
        self.segments.push_back(data);
    }

    pub fn prefix(&self) -> &[u8] {
        self.segments.front().map(AsRef::as_ref).unwrap_or(&[])
    }

    // Unlike prefix, crosses segment boundaries.
    pub fn fetch(&self, out: &mut [u8]) {
        assert!(out.len() <= self.len, "fetch beyond end of chain");
        let mut filled = 0;
        for segment in &self.segments {
            if filled == out.len() {
                break;
            }
            let n = segment.len().min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&segment[..n]);
            filled += n;
        }
    }

    pub fn consume(&mut self, mut n: usize) {
        assert!(n <= self.len, "consume beyond end of chain");
        self.len -= n;
        while n > 0 {
            let segment = self.segments.front_mut().unwrap();
            if n < segment.len() {
                segment.advance(n);
                break;
            }
            n -= segment.len();
            self.segments.pop_front();
        }
    }

    pub fn take_all(&mut self) -> Bytes {
        if self.segments.len() == 1 {
            self.len = 0;
            return self.segments.pop_front().unwrap();
        }
        let mut out = BytesMut::with_capacity(self.len);
        for segment in self.segments.drain(..) {
            out.put_slice(&segment);
        }
        self.len = 0;
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_consume() {
        let mut bc = BufChain::new();
        assert!(bc.is_empty());

        bc.add(&b"hello "[..]);
        bc.add(&b"world"[..]);
        assert_eq!(bc.len(), 11);
        assert_eq!(bc.prefix(), b"hello ");

        bc.consume(6);
        assert_eq!(bc.prefix(), b"world");

        bc.consume(5);
        assert!(bc.is_empty());
        assert_eq!(bc.prefix(), b"");
    }

    #[test]
    fn test_consume_within_segment() {
        let mut bc = BufChain::new();
        bc.add(&b"abcdef"[..]);
        bc.consume(2);
        assert_eq!(bc.prefix(), b"cdef");
        assert_eq!(bc.len(), 4);
    }

    #[test]
    fn test_fetch_across_segments() {
        let mut bc = BufChain::new();
        for b in b"SSH-" {
            bc.add(vec![*b]);
        }
        let mut out = [0u8; 4];
        bc.fetch(&mut out);
        assert_eq!(&out, b"SSH-");
        assert_eq!(bc.len(), 4);
    }

    #[test]
    fn test_empty_add_ignored() {
        let mut bc = BufChain::new();
        bc.add(Bytes::new());
        assert!(bc.is_empty());
        assert!(bc.segments.is_empty());
    }

    #[test]
    fn test_take_all() {
        let mut bc = BufChain::new();
        bc.add(&b"foo"[..]);
        bc.add(&b"bar"[..]);
        assert_eq!(bc.take_all(), Bytes::from("foobar"));
        assert!(bc.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_consume_too_much() {
        let mut bc = BufChain::new();
        bc.add(&b"ab"[..]);
        bc.consume(3);
    }
}
