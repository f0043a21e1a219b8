//! Splitting a byte range of a file into per-frame pieces.
//!
//! A range `[start, start + len)` touches a head frame (possibly partial),
//! zero or more whole interior frames and a tail frame (possibly partial).
//! Each piece says which frame of the file it lands in, where inside that
//! frame it starts, and where inside the caller's buffer it starts.

use cartfs_proto::FRAME_SIZE;

/// One frame's share of a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    /// Frame index within the file.
    pub index: usize,
    /// First byte inside the frame.
    pub frame_offset: usize,
    /// First byte inside the caller's buffer.
    pub buf_offset: usize,
    /// Bytes covered.
    pub len: usize,
}

impl FrameSpan {
    /// True if the span covers the whole frame.
    pub fn is_full(&self) -> bool {
        self.len == FRAME_SIZE
    }

    pub fn frame_range(&self) -> std::ops::Range<usize> {
        self.frame_offset..self.frame_offset + self.len
    }

    pub fn buf_range(&self) -> std::ops::Range<usize> {
        self.buf_offset..self.buf_offset + self.len
    }
}

/// Iterator over the frame spans of a byte range.
#[derive(Debug, Clone)]
pub struct Spans {
    pos: usize,
    end: usize,
    buf_offset: usize,
}

/// Split `[start, start + len)` into frame spans, in order.
pub fn spans(start: usize, len: usize) -> Spans {
    Spans {
        pos: start,
        end: start + len,
        buf_offset: 0,
    }
}

impl Iterator for Spans {
    type Item = FrameSpan;

    fn next(&mut self) -> Option<FrameSpan> {
        if self.pos >= self.end {
            return None;
        }
        let frame_offset = self.pos % FRAME_SIZE;
        let len = (FRAME_SIZE - frame_offset).min(self.end - self.pos);
        let span = FrameSpan {
            index: self.pos / FRAME_SIZE,
            frame_offset,
            buf_offset: self.buf_offset,
            len,
        };
        self.pos += len;
        self.buf_offset += len;
        Some(span)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.pos >= self.end {
            0
        } else {
            (self.end - 1) / FRAME_SIZE - self.pos / FRAME_SIZE + 1
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Spans {}
