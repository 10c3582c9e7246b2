//! Content Store
//!
//! Rolling window of the last K ticks of authored content. Each slot holds
//! the stripped posts of one tick, sorted ascending by leaning so the
//! ranker can pull a leaning range with two binary searches.

use thiserror::Error;

use feed_events::{Post, PostId, PostTuple};

/// Errors raised by the content store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("content store window must hold at least one tick")]
    ZeroWindow,
    #[error("{id} already stored for tick {tick}")]
    DuplicateId { id: PostId, tick: u64 },
    #[error("tick {tick} has already been overwritten by tick {current}")]
    StaleTick { tick: u64, current: u64 },
}

/// Hands out post ids in increasing order
#[derive(Debug, Clone, Default)]
pub struct PostIdAllocator {
    next: u64,
}

impl PostIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> PostId {
        let id = PostId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[derive(Debug, Clone)]
struct Slot {
    tick: u64,
    posts: Vec<PostTuple>,
}

/// Ring buffer of leaning-sorted post tuples, one slot per tick
#[derive(Debug, Clone)]
pub struct ContentStore {
    slots: Vec<Option<Slot>>,
}

impl ContentStore {
    pub fn new(window: usize) -> Result<Self, StoreError> {
        if window == 0 {
            return Err(StoreError::ZeroWindow);
        }
        Ok(Self {
            slots: vec![None; window],
        })
    }

    /// Number of ticks the store keeps (K).
    pub fn window(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_index(&self, tick: u64) -> usize {
        (tick % self.slots.len() as u64) as usize
    }

    /// Replaces the slot for `tick` with an empty one, dropping whatever
    /// tick it held before.
    pub fn begin_tick(&mut self, tick: u64) {
        let index = self.slot_index(tick);
        self.slots[index] = Some(Slot {
            tick,
            posts: Vec::new(),
        });
    }

    /// Inserts a post into the slot for `tick`, keeping the slot sorted by
    /// leaning. A slot still holding an older tick is rolled over first.
    /// Returns the position the post landed at.
    pub fn insert(&mut self, tick: u64, post: &Post) -> Result<usize, StoreError> {
        let index = self.slot_index(tick);
        let held = self.slots[index].as_ref().map(|slot| slot.tick);
        if let Some(current) = held.filter(|&current| current > tick) {
            return Err(StoreError::StaleTick { tick, current });
        }
        if held != Some(tick) {
            self.begin_tick(tick);
        }

        let slot = self.slots[index].get_or_insert_with(|| Slot {
            tick,
            posts: Vec::new(),
        });
        let raw_id = post.id().0 as f64;
        if slot.posts.iter().any(|t| t[2] == raw_id) {
            return Err(StoreError::DuplicateId {
                id: post.id(),
                tick,
            });
        }

        let leaning = post.leaning();
        let pos = slot.posts.partition_point(|t| t[0] < leaning);
        slot.posts.insert(pos, post.to_tuple());
        Ok(pos)
    }

    /// Posts stored for `tick`, if its slot has not been overwritten.
    pub fn slot(&self, tick: u64) -> Option<&[PostTuple]> {
        self.slots[self.slot_index(tick)]
            .as_ref()
            .filter(|slot| slot.tick == tick)
            .map(|slot| slot.posts.as_slice())
    }

    /// Tick held by the slot at `index` and its posts.
    pub fn slot_at(&self, index: usize) -> Option<(u64, &[PostTuple])> {
        self.slots
            .get(index)?
            .as_ref()
            .map(|slot| (slot.tick, slot.posts.as_slice()))
    }

    /// Populated slots, oldest tick first.
    fn populated(&self) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self.slots.iter().flatten().collect();
        slots.sort_by_key(|slot| slot.tick);
        slots
    }

    /// Every stored tuple, oldest tick first and by leaning within a tick.
    pub fn iter(&self) -> impl Iterator<Item = &PostTuple> + '_ {
        self.populated().into_iter().flat_map(|slot| slot.posts.iter())
    }

    /// Tuples whose leaning lies strictly between `low` and `high`, in the
    /// same order as [`ContentStore::iter`].
    pub fn in_range(&self, low: f64, high: f64) -> impl Iterator<Item = &PostTuple> + '_ {
        self.populated().into_iter().flat_map(move |slot| {
            let start = slot.posts.partition_point(|t| t[0] <= low);
            let end = slot.posts.partition_point(|t| t[0] < high).max(start);
            slot.posts[start..end].iter()
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().map(|slot| slot.posts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks every slot unused.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}
