//! Chunked slot arena with copy-on-write chunks.

use std::sync::Arc;

#[derive(Clone)]
struct Chunk<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Chunk<T> {
    fn empty(size: usize) -> Self {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || None);
        Self { slots, live: 0 }
    }
}

/// Slot-indexed storage with structural sharing.
///
/// Slots are grouped into fixed-size chunks. Cloning the arena copies one
/// `Arc`. Writing through a clone copies the chunk directory (one pointer per
/// chunk) and the single chunk holding the slot; every other chunk stays
/// shared with the clone it came from.
///
/// A chunk whose last occupant is removed is released. The directory only
/// spans the chunks between the first and last live ones, so slots that are
/// handed out in increasing order and later freed do not pin memory.
pub(crate) struct ChunkedArena<T> {
    chunks: Arc<Vec<Option<Arc<Chunk<T>>>>>,
    /// Chunk number of `chunks[0]`.
    first: usize,
    chunk_bits: u32,
    len: usize,
}

impl<T> Clone for ChunkedArena<T> {
    fn clone(&self) -> Self {
        Self {
            chunks: Arc::clone(&self.chunks),
            first: self.first,
            chunk_bits: self.chunk_bits,
            len: self.len,
        }
    }
}

impl<T: Clone> ChunkedArena<T> {
    /// Creates an empty arena with `1 << chunk_bits` slots per chunk.
    pub(crate) fn new(chunk_bits: u32) -> Self {
        Self {
            chunks: Arc::new(Vec::new()),
            first: 0,
            chunk_bits,
            len: 0,
        }
    }

    #[inline]
    fn chunk_size(&self) -> usize {
        1 << self.chunk_bits
    }

    #[inline]
    fn locate(&self, slot: u32) -> (usize, usize) {
        let slot = slot as usize;
        (slot >> self.chunk_bits, slot & (self.chunk_size() - 1))
    }

    fn chunk(&self, number: usize) -> Option<&Arc<Chunk<T>>> {
        let index = number.checked_sub(self.first)?;
        self.chunks.get(index)?.as_ref()
    }

    /// Returns the value in a slot.
    pub(crate) fn get(&self, slot: u32) -> Option<&T> {
        let (chunk, offset) = self.locate(slot);
        self.chunk(chunk)?.slots[offset].as_ref()
    }

    /// Returns true if the slot is occupied.
    pub(crate) fn contains(&self, slot: u32) -> bool {
        self.get(slot).is_some()
    }

    /// Stores a value, returning the previous occupant.
    pub(crate) fn insert(&mut self, slot: u32, value: T) -> Option<T> {
        let (number, offset) = self.locate(slot);
        let size = self.chunk_size();
        let chunks = Arc::make_mut(&mut self.chunks);
        if chunks.is_empty() {
            self.first = number;
        } else if number < self.first {
            let gap = self.first - number;
            let mut grown = Vec::with_capacity(gap + chunks.len());
            grown.resize_with(gap, || None);
            grown.append(chunks);
            *chunks = grown;
            self.first = number;
        }
        let index = number - self.first;
        if chunks.len() <= index {
            chunks.resize_with(index + 1, || None);
        }
        let chunk = chunks[index].get_or_insert_with(|| Arc::new(Chunk::empty(size)));
        let chunk = Arc::make_mut(chunk);
        let previous = chunk.slots[offset].replace(value);
        if previous.is_none() {
            chunk.live += 1;
            self.len += 1;
        }
        previous
    }

    /// Empties a slot, returning its occupant.
    pub(crate) fn remove(&mut self, slot: u32) -> Option<T> {
        if !self.contains(slot) {
            return None;
        }
        let (number, offset) = self.locate(slot);
        let index = number - self.first;
        let chunks = Arc::make_mut(&mut self.chunks);
        let last = chunks[index].as_ref().is_some_and(|chunk| chunk.live == 1);
        let previous = if last {
            // Last occupant: drop the chunk instead of copying it.
            chunks[index]
                .take()
                .and_then(|chunk| chunk.slots[offset].clone())
        } else {
            chunks[index].as_mut().and_then(|chunk| {
                let chunk = Arc::make_mut(chunk);
                chunk.live -= 1;
                chunk.slots[offset].take()
            })
        };
        self.len -= 1;

        while matches!(chunks.last(), Some(None)) {
            chunks.pop();
        }
        let leading = chunks.iter().take_while(|chunk| chunk.is_none()).count();
        if leading > 0 {
            chunks.rotate_left(leading);
            chunks.truncate(chunks.len() - leading);
            self.first += leading;
        }
        if chunks.is_empty() {
            self.first = 0;
        }
        previous
    }

    /// Iterates occupied slots in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        let bits = self.chunk_bits;
        let first = self.first;
        self.chunks
            .iter()
            .enumerate()
            .filter_map(move |(index, chunk)| chunk.as_ref().map(|chunk| (first + index, chunk)))
            .flat_map(move |(number, chunk)| {
                chunk.slots.iter().enumerate().filter_map(move |(offset, value)| {
                    value
                        .as_ref()
                        .map(|value| (((number << bits) | offset) as u32, value))
                })
            })
    }

    /// Returns the number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Counts chunks physically shared with `other`.
    pub(crate) fn shared_chunks(&self, other: &Self) -> usize {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(index, chunk)| Some((self.first + index, chunk.as_ref()?)))
            .filter(|(number, chunk)| {
                other
                    .chunk(*number)
                    .is_some_and(|theirs| Arc::ptr_eq(chunk, theirs))
            })
            .count()
    }

    /// Returns the number of allocated chunks.
    pub(crate) fn chunk_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.is_some()).count()
    }

    /// Returns the length of the chunk directory.
    #[cfg(test)]
    fn directory_len(&self) -> usize {
        self.chunks.len()
    }
}
