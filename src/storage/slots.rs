//! Free-list slot allocator.
//!
//! Every arena in the crate (nodes, edges, edge types, views) hands out dense
//! ids through a [`SlotAllocator`]. Freed ids go on a LIFO garbage queue and
//! are reused before the arena grows, so removing a run of entities and
//! re-adding them in reverse removal order gives them back their old slots.
//!
//! Entity arenas grow in fixed-size blocks. Only the trailing block is ever
//! reclaimed, and only once none of its slots is live.

use tracing::trace;

use crate::{Error, NULL_ID, Result, StoreId};

/// How an allocator grows its backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// Fixed-size blocks, reclaimable from the tail.
    Blocks(usize),
    /// One contiguous vector.
    Linear,
}

#[derive(Debug, Clone)]
struct Block<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Block<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self { slots: Vec::with_capacity(capacity), live: 0 }
    }
}

/// Dense id allocator with a garbage queue.
#[derive(Debug, Clone)]
pub struct SlotAllocator<T> {
    growth: Growth,
    blocks: Vec<Block<T>>,
    garbage: Vec<StoreId>,
    /// Slots handed out so far, live or freed.
    len: usize,
    size: usize,
}

impl<T> SlotAllocator<T> {
    pub fn new(growth: Growth) -> Self {
        let growth = match growth {
            Growth::Blocks(0) => Growth::Blocks(1),
            g => g,
        };
        Self {
            growth,
            blocks: vec![Block::with_capacity(Self::initial_capacity(growth))],
            garbage: Vec::new(),
            len: 0,
            size: 0,
        }
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self::new(Growth::Blocks(block_size))
    }

    pub fn linear() -> Self {
        Self::new(Growth::Linear)
    }

    fn initial_capacity(growth: Growth) -> usize {
        match growth {
            Growth::Blocks(n) => n,
            Growth::Linear => 0,
        }
    }

    fn locate(&self, id: StoreId) -> Option<(usize, usize)> {
        if id < 0 || id as usize >= self.len {
            return None;
        }
        let id = id as usize;
        Some(match self.growth {
            Growth::Blocks(n) => (id / n, id % n),
            Growth::Linear => (0, id),
        })
    }

    /// Store `value` and return its id, reusing the most recently freed id.
    pub fn alloc(&mut self, value: T) -> Result<StoreId> {
        if let Some(id) = self.garbage.pop() {
            if id >= 0 && id as usize >= self.len {
                self.regrow(id as usize);
            }
            let (b, o) = self.locate(id).ok_or_else(|| {
                Error::NotFound(format!("garbage slot {id} outside the arena"))
            })?;
            let block = &mut self.blocks[b];
            block.slots[o] = Some(value);
            block.live += 1;
            self.size += 1;
            return Ok(id);
        }

        if self.len >= StoreId::MAX as usize {
            return Err(Error::Capacity(format!("arena is full at {} slots", self.len)));
        }
        let id = self.len;
        let (b, _) = match self.growth {
            Growth::Blocks(n) => (id / n, id % n),
            Growth::Linear => (0, id),
        };
        if b == self.blocks.len() {
            trace!(block = b, "slots.block.grow");
            self.blocks.push(Block::with_capacity(Self::initial_capacity(self.growth)));
        }
        let block = &mut self.blocks[b];
        block.slots.push(Some(value));
        block.live += 1;
        self.len += 1;
        self.size += 1;
        Ok(id as StoreId)
    }

    /// Bring back the reclaimed tail up to and including `id`.
    ///
    /// Every slot of a reclaimed block sits in the garbage queue, so the
    /// recreated slots below `id` stay reachable through it.
    fn regrow(&mut self, id: usize) {
        let Growth::Blocks(n) = self.growth else {
            return;
        };
        let b = id / n;
        while self.blocks.len() <= b {
            trace!(block = self.blocks.len(), "slots.block.regrow");
            self.blocks.push(Block::with_capacity(n));
        }
        for (i, block) in self.blocks.iter_mut().enumerate().skip(self.len / n) {
            let want = if i == b { id % n + 1 } else { n };
            if block.slots.len() < want {
                block.slots.resize_with(want, || None);
            }
        }
        self.len = id + 1;
    }

    /// Release `id`, returning what it held. Free or out-of-range ids yield `None`.
    pub fn free(&mut self, id: StoreId) -> Option<T> {
        let (b, o) = self.locate(id)?;
        let value = self.blocks[b].slots[o].take()?;
        self.blocks[b].live -= 1;
        self.size -= 1;
        self.garbage.push(id);

        if let Growth::Blocks(n) = self.growth {
            if b > 0 && b + 1 == self.blocks.len() && self.blocks[b].live == 0 {
                let start = b * n;
                self.blocks.pop();
                self.len = start;
                trace!(block = b, "slots.block.reclaim");
            }
        }
        Some(value)
    }

    pub fn get(&self, id: StoreId) -> Option<&T> {
        let (b, o) = self.locate(id)?;
        self.blocks[b].slots[o].as_ref()
    }

    pub fn get_mut(&mut self, id: StoreId) -> Option<&mut T> {
        let (b, o) = self.locate(id)?;
        self.blocks[b].slots[o].as_mut()
    }

    /// Whether `id` lies inside the allocated range (live or freed).
    pub fn in_range(&self, id: StoreId) -> bool {
        self.locate(id).is_some()
    }

    pub fn check_range(&self, id: StoreId) -> Result<()> {
        if self.in_range(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("store id {id} is out of range 0..{}", self.len)))
        }
    }

    /// Live slots.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Slots handed out, live or freed. Upper bound (exclusive) of live ids.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn garbage_len(&self) -> usize {
        self.garbage.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Drop everything and shrink back to one empty block.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.blocks.push(Block::with_capacity(Self::initial_capacity(self.growth)));
        self.garbage.clear();
        self.len = 0;
        self.size = 0;
    }

    /// Live slots in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (StoreId, &T)> + '_ {
        let stride = match self.growth {
            Growth::Blocks(n) => n,
            Growth::Linear => 0,
        };
        self.blocks.iter().enumerate().flat_map(move |(b, block)| {
            block
                .slots
                .iter()
                .enumerate()
                .filter_map(move |(o, slot)| slot.as_ref().map(|v| ((b * stride + o) as StoreId, v)))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StoreId, &mut T)> + '_ {
        let stride = match self.growth {
            Growth::Blocks(n) => n,
            Growth::Linear => 0,
        };
        self.blocks.iter_mut().enumerate().flat_map(move |(b, block)| {
            block
                .slots
                .iter_mut()
                .enumerate()
                .filter_map(move |(o, slot)| slot.as_mut().map(|v| ((b * stride + o) as StoreId, v)))
        })
    }

    /// First live id at or after `from`, or [`NULL_ID`].
    pub fn next_live(&self, from: usize) -> StoreId {
        let mut id = from;
        while id < self.len {
            if self.get(id as StoreId).is_some() {
                return id as StoreId;
            }
            id += 1;
        }
        NULL_ID
    }
}
