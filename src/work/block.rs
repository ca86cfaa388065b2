//! Unrolled-list storage for one bag segment.
//!
//! Pushes land in the tail block; a full tail grows a successor of twice
//! its capacity, up to the configured ceiling. Pops come off the end of the
//! head block, so consumption is LIFO within a block and FIFO across
//! blocks. Not synchronized; the owning segment's status word serializes
//! access.

use std::ptr;

pub(crate) struct SegmentBlock<W> {
    elems: Vec<W>,
    cap: usize,
    next: Option<Box<SegmentBlock<W>>>,
}

impl<W> SegmentBlock<W> {
    fn boxed(cap: usize) -> Box<Self> {
        Box::new(Self {
            elems: Vec::with_capacity(cap),
            cap,
            next: None,
        })
    }
}

/// Head/tail view of the block chain.
pub(crate) struct BlockList<W> {
    head: Option<Box<SegmentBlock<W>>>,
    /// Last block in the chain; dangling-free because blocks are only freed
    /// from the head, and the tail is nulled when the chain empties.
    tail: *mut SegmentBlock<W>,
    initial_block_size: usize,
    max_block_size: usize,
}

unsafe impl<W: Send> Send for BlockList<W> {}

impl<W> BlockList<W> {
    pub(crate) fn new(initial_block_size: usize, max_block_size: usize) -> Self {
        debug_assert!(initial_block_size > 0 && initial_block_size <= max_block_size);
        Self {
            head: None,
            tail: ptr::null_mut(),
            initial_block_size,
            max_block_size,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[cfg(test)]
    pub(crate) fn has_tail(&self) -> bool {
        !self.tail.is_null()
    }

    pub(crate) fn push(&mut self, w: W) {
        if self.head.is_none() {
            let mut block = SegmentBlock::boxed(self.initial_block_size);
            self.tail = &mut *block;
            self.head = Some(block);
        }
        // tail is valid whenever head is Some
        let tail = unsafe { &mut *self.tail };
        if tail.elems.len() == tail.cap {
            let mut block = SegmentBlock::boxed((tail.cap * 2).min(self.max_block_size));
            self.tail = &mut *block;
            tail.next = Some(block);
        }
        let tail = unsafe { &mut *self.tail };
        tail.elems.push(w);
    }

    pub(crate) fn pop(&mut self) -> Option<W> {
        while let Some(head) = self.head.as_mut() {
            if let Some(w) = head.elems.pop() {
                if head.elems.is_empty() {
                    self.advance_head();
                }
                return Some(w);
            }
            self.advance_head();
        }
        None
    }

    /// Move up to `n` elements out of the head blocks with contiguous
    /// drains.
    pub(crate) fn take_batch(&mut self, n: usize) -> Vec<W> {
        let mut out = Vec::new();
        while out.len() < n {
            let Some(head) = self.head.as_mut() else { break };
            let avail = head.elems.len();
            if avail == 0 {
                self.advance_head();
                continue;
            }
            let take = (n - out.len()).min(avail);
            out.extend(head.elems.drain(avail - take..));
            if head.elems.is_empty() {
                self.advance_head();
            }
        }
        out
    }

    fn advance_head(&mut self) {
        if let Some(mut old) = self.head.take() {
            self.head = old.next.take();
        }
        if self.head.is_none() {
            self.tail = ptr::null_mut();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_growth_and_drain_order() {
        // initial 2, max 8: blocks of 2, 4, 8, 8 hold 20 pushes.
        let mut list: BlockList<u32> = BlockList::new(2, 8);
        for i in 0..20 {
            list.push(i);
        }
        let mut popped = Vec::new();
        while let Some(w) = list.pop() {
            popped.push(w);
        }
        // LIFO within a block, FIFO across blocks.
        assert_eq!(
            popped,
            vec![1, 0, 5, 4, 3, 2, 13, 12, 11, 10, 9, 8, 7, 6, 19, 18, 17, 16, 15, 14]
        );
        assert!(list.is_empty());
        assert!(!list.has_tail());
    }

    #[test]
    fn batch_take_is_contiguous_from_head() {
        let mut list: BlockList<u32> = BlockList::new(4, 4);
        for i in 0..10 {
            list.push(i);
        }
        let batch = list.take_batch(6);
        assert_eq!(batch.len(), 6);
        let mut rest = Vec::new();
        while let Some(w) = list.pop() {
            rest.push(w);
        }
        assert_eq!(batch.len() + rest.len(), 10);
        let mut all: Vec<u32> = batch.into_iter().chain(rest).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        assert!(list.is_empty());
    }

    #[test]
    fn push_after_empty_reuses_initial_capacity() {
        let mut list: BlockList<u32> = BlockList::new(2, 8);
        list.push(1);
        assert_eq!(list.pop(), Some(1));
        assert!(list.is_empty());
        list.push(2);
        assert_eq!(list.pop(), Some(2));
        assert_eq!(list.pop(), None);
    }
}
