//! Doubly-linked sequence container backing the agent roster and every
//! sector bucket.
//!
//! Nodes live in an arena (`Vec` of slots with a free-list) instead of
//! holding raw back-pointers; a [`NodeId`] carries a generation counter so a
//! handle that outlived its node is detected instead of aliasing whatever
//! reused the slot. Handles are only meaningful for the container that
//! issued them.

/// Handle to a live node inside one [`SequenceContainer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Debug)]
enum SlotKind<T> {
    Occupied {
        data: T,
        prev: Option<u32>,
        next: Option<u32>,
    },
    Free {
        next_free: Option<u32>,
    },
}

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    kind: SlotKind<T>,
}

/// Doubly-linked list with O(1) insertion/removal at both ends and O(1)
/// removal of any node given its handle.
///
/// Indexed access (`get`, `remove_at`) traverses from the head and is O(n).
#[derive(Clone, Debug)]
pub struct SequenceContainer<T> {
    slots: Vec<Slot<T>>,
    head: Option<u32>,
    tail: Option<u32>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for SequenceContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SequenceContainer<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            head: None,
            tail: None,
            free_head: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn alloc(&mut self, data: T, prev: Option<u32>, next: Option<u32>) -> u32 {
        match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let next_free = match slot.kind {
                    SlotKind::Free { next_free } => next_free,
                    SlotKind::Occupied { .. } => unreachable!("free list points at occupied slot"),
                };
                slot.kind = SlotKind::Occupied { data, prev, next };
                self.free_head = next_free;
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    kind: SlotKind::Occupied { data, prev, next },
                });
                (self.slots.len() - 1) as u32
            }
        }
    }

    fn id_at(&self, index: u32) -> NodeId {
        NodeId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn resolve(&self, id: NodeId) -> Option<u32> {
        let slot = self.slots.get(id.index as usize)?;
        match slot.kind {
            SlotKind::Occupied { .. } if slot.generation == id.generation => Some(id.index),
            _ => None,
        }
    }

    fn data(&self, index: u32) -> &T {
        match &self.slots[index as usize].kind {
            SlotKind::Occupied { data, .. } => data,
            SlotKind::Free { .. } => unreachable!("data access on free slot"),
        }
    }

    fn data_mut(&mut self, index: u32) -> &mut T {
        match &mut self.slots[index as usize].kind {
            SlotKind::Occupied { data, .. } => data,
            SlotKind::Free { .. } => unreachable!("data access on free slot"),
        }
    }

    fn links(&self, index: u32) -> (Option<u32>, Option<u32>) {
        match &self.slots[index as usize].kind {
            SlotKind::Occupied { prev, next, .. } => (*prev, *next),
            SlotKind::Free { .. } => unreachable!("link access on free slot"),
        }
    }

    fn set_prev(&mut self, index: u32, value: Option<u32>) {
        if let SlotKind::Occupied { prev, .. } = &mut self.slots[index as usize].kind {
            *prev = value;
        }
    }

    fn set_next(&mut self, index: u32, value: Option<u32>) {
        if let SlotKind::Occupied { next, .. } = &mut self.slots[index as usize].kind {
            *next = value;
        }
    }

    /// Insert at the head. O(1).
    pub fn push_front(&mut self, data: T) -> NodeId {
        let old_head = self.head;
        let index = self.alloc(data, None, old_head);
        match old_head {
            Some(h) => self.set_prev(h, Some(index)),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.len += 1;
        self.id_at(index)
    }

    /// Insert at the tail. O(1).
    pub fn push_back(&mut self, data: T) -> NodeId {
        let old_tail = self.tail;
        let index = self.alloc(data, old_tail, None);
        match old_tail {
            Some(t) => self.set_next(t, Some(index)),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        self.id_at(index)
    }

    /// Splice out the node at `index`, fix up neighbors and endpoints,
    /// recycle the slot with a bumped generation.
    fn detach(&mut self, index: u32) -> T {
        let free_head = self.free_head;
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let kind = std::mem::replace(&mut slot.kind, SlotKind::Free { next_free: free_head });
        let (data, prev, next) = match kind {
            SlotKind::Occupied { data, prev, next } => (data, prev, next),
            SlotKind::Free { .. } => unreachable!("detach on free slot"),
        };
        self.free_head = Some(index);
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.head = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.tail = prev,
        }
        self.len -= 1;
        data
    }

    /// Remove a node by handle. O(1).
    ///
    /// # Panics
    /// Panics if `id` was already removed or was issued by another
    /// container; both are contract violations, not runtime conditions.
    pub fn remove(&mut self, id: NodeId) -> T {
        let index = self
            .resolve(id)
            .expect("node handle is not a live member of this container");
        self.detach(index)
    }

    pub fn front(&self) -> Option<&T> {
        self.head.map(|h| self.data(h))
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.map(|t| self.data(t))
    }

    /// Remove and return the head element, or `None` when empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let h = self.head?;
        Some(self.detach(h))
    }

    /// Remove and return the tail element, or `None` when empty.
    pub fn pop_back(&mut self) -> Option<T> {
        let t = self.tail?;
        Some(self.detach(t))
    }

    fn index_at(&self, position: usize) -> Option<u32> {
        if position >= self.len {
            return None;
        }
        let mut cur = self.head?;
        for _ in 0..position {
            cur = self.links(cur).1?;
        }
        Some(cur)
    }

    /// Element at `position`, counted from the head. O(n).
    pub fn get(&self, position: usize) -> Option<&T> {
        self.index_at(position).map(|i| self.data(i))
    }

    /// Handle of the node at `position`. O(n).
    pub fn handle_at(&self, position: usize) -> Option<NodeId> {
        self.index_at(position).map(|i| self.id_at(i))
    }

    /// Remove the element at `position`. O(n).
    pub fn remove_at(&mut self, position: usize) -> Option<T> {
        let index = self.index_at(position)?;
        Some(self.detach(index))
    }

    /// Borrow the element behind a handle, or `None` for a dead handle.
    pub fn node(&self, id: NodeId) -> Option<&T> {
        self.resolve(id).map(|i| self.data(i))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut T> {
        let index = self.resolve(id)?;
        Some(self.data_mut(index))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.resolve(id).is_some()
    }

    /// Splice a new node immediately before `id`. O(1).
    ///
    /// # Panics
    /// Panics when `id` is not a live member of this container.
    pub fn insert_before(&mut self, id: NodeId, data: T) -> NodeId {
        let index = self
            .resolve(id)
            .expect("node handle is not a live member of this container");
        let (prev, _) = self.links(index);
        match prev {
            None => self.push_front(data),
            Some(p) => {
                let new_index = self.alloc(data, Some(p), Some(index));
                self.set_next(p, Some(new_index));
                self.set_prev(index, Some(new_index));
                self.len += 1;
                self.id_at(new_index)
            }
        }
    }

    /// Remove all elements. Pops one at a time so outstanding handles stay
    /// invalidated by their generation bump.
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cur: self.head,
        }
    }

    pub fn handles(&self) -> Handles<'_, T> {
        Handles {
            list: self,
            cur: self.head,
        }
    }

    /// Bidirectional cursor starting before the first element.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        let head = self.head;
        Cursor {
            list: self,
            next: head,
            last: None,
        }
    }
}

impl<T: PartialEq> PartialEq for SequenceContainer<T> {
    /// Structural equality: same length, pairwise-equal elements in
    /// traversal order.
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T> FromIterator<T> for SequenceContainer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.push_back(item);
        }
        list
    }
}

/// Front-to-back borrowing iterator.
pub struct Iter<'a, T> {
    list: &'a SequenceContainer<T>,
    cur: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let index = self.cur?;
        self.cur = self.list.links(index).1;
        Some(self.list.data(index))
    }
}

impl<'a, T> IntoIterator for &'a SequenceContainer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Front-to-back iterator over node handles.
pub struct Handles<'a, T> {
    list: &'a SequenceContainer<T>,
    cur: Option<u32>,
}

impl<T> Iterator for Handles<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let index = self.cur?;
        self.cur = self.list.links(index).1;
        Some(self.list.id_at(index))
    }
}

/// Bidirectional cursor supporting in-place structural edits.
///
/// The cursor sits between elements. `next`/`prev` return the element
/// crossed and clamp at the ends instead of panicking; `remove`/`set`
/// operate on the element most recently returned.
pub struct Cursor<'a, T> {
    list: &'a mut SequenceContainer<T>,
    next: Option<u32>,
    last: Option<u32>,
}

impl<T> Cursor<'_, T> {
    /// Advance past the next element and return it, or `None` at the end.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&T> {
        let index = self.next?;
        self.last = Some(index);
        self.next = self.list.links(index).1;
        Some(self.list.data(index))
    }

    /// Retreat past the previous element and return it, or `None` at the
    /// start.
    pub fn prev(&mut self) -> Option<&T> {
        let index = match self.next {
            Some(i) => self.list.links(i).0?,
            None => self.list.tail?,
        };
        self.last = Some(index);
        self.next = Some(index);
        Some(self.list.data(index))
    }

    /// Remove the element last returned by `next`/`prev`.
    ///
    /// # Panics
    /// Panics when no element has been returned since the last structural
    /// edit; positioning first is part of the contract.
    pub fn remove(&mut self) -> T {
        let index = self
            .last
            .take()
            .expect("cursor has no current element: call next or prev first");
        if self.next == Some(index) {
            self.next = self.list.links(index).1;
        }
        self.list.detach(index)
    }

    /// Replace the data of the element last returned by `next`/`prev`.
    ///
    /// # Panics
    /// Panics when no element has been returned since the last structural
    /// edit.
    pub fn set(&mut self, data: T) {
        let index = self
            .last
            .expect("cursor has no current element: call next or prev first");
        *self.list.data_mut(index) = data;
    }

    /// Splice a new node immediately before the cursor position. The new
    /// node is not the cursor's current element.
    pub fn insert(&mut self, data: T) {
        match self.next {
            Some(index) => {
                let id = self.list.id_at(index);
                self.list.insert_before(id, data);
            }
            None => {
                self.list.push_back(data);
            }
        }
        self.last = None;
    }
}
