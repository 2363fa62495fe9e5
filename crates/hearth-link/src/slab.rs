//! Generational slab used for both sides of the link arena.
//!
//! Freed slots go on a free list and are reused LIFO. Every free bumps
//! the slot's generation, so keys issued before the free no longer
//! match. A slot whose generation reaches `u32::MAX` is retired instead
//! of wrapping, so an old key can never alias a later occupant.

/// A single slab slot.
#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slab of generational slots.
#[derive(Debug)]
pub(crate) struct Slab<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Slab<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Store `value`, returning `(index, generation)`.
    pub(crate) fn insert(&mut self, value: T) -> (u32, u32) {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none(), "free-listed slot {index} is occupied");
            slot.value = Some(value);
            return (index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).expect("slab exceeds u32::MAX slots");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        (index, 0)
    }

    /// Whether `(index, generation)` names a live slot.
    pub(crate) fn contains(&self, index: u32, generation: u32) -> bool {
        self.get(index, generation).is_some()
    }

    pub(crate) fn get(&self, index: u32, generation: u32) -> Option<&T> {
        match self.slots.get(index as usize) {
            Some(slot) if slot.generation == generation => slot.value.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        match self.slots.get_mut(index as usize) {
            Some(slot) if slot.generation == generation => slot.value.as_mut(),
            _ => None,
        }
    }

    /// Free a live slot, returning its value.
    pub(crate) fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free_list.push(index);
        }
        self.len -= 1;
        Some(value)
    }

    /// Current generation of a slot, live or not.
    pub(crate) fn generation_of(&self, index: u32) -> u32 {
        self.slots[index as usize].generation
    }

    /// Access a slot known to be live by index alone.
    ///
    /// Used for sibling and back-pointer hops, which only ever point at
    /// live slots.
    pub(crate) fn live(&self, index: u32) -> &T {
        self.slots[index as usize]
            .value
            .as_ref()
            .expect("intrusive link points at a freed slot")
    }

    pub(crate) fn live_mut(&mut self, index: u32) -> &mut T {
        self.slots[index as usize]
            .value
            .as_mut()
            .expect("intrusive link points at a freed slot")
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
