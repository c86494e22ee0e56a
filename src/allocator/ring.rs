use super::header::Class;
use super::pool::Pool;

/// The six rings that partition every pool owned by an allocator.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RingId {
    /// Old pools that are full or almost. Not considered for allocation.
    OldFull,
    /// Old pools, the head is the current target of old allocations.
    OldAvailable,
    /// Old pools with lots of room, reused first as young pools.
    OldLow,
    /// Young pools, the head is the current target of young allocations.
    YoungAvailable,
    /// Young pools that are full or almost.
    YoungFull,
    /// Empty pools waiting to be released on the next major scan.
    Free,
}

impl RingId {
    pub const ALL: [RingId; 6] = [
        RingId::OldFull,
        RingId::OldAvailable,
        RingId::OldLow,
        RingId::YoungAvailable,
        RingId::YoungFull,
        RingId::Free,
    ];

    pub fn class(self) -> Class {
        match self {
            RingId::OldFull | RingId::OldAvailable | RingId::OldLow => Class::Old,
            RingId::YoungAvailable | RingId::YoungFull => Class::Young,
            RingId::Free => Class::Untracked,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

fn link(p: Pool, q: Pool) {
    p.set_next(q);
    q.set_prev(p);
}

/// A circular doubly-linked list of pools, known only by its head.
#[derive(Default, Debug)]
pub struct Ring {
    head: Option<Pool>,
}

impl Ring {
    /// Views the ring that `pool` belongs to, starting at `pool`.
    pub fn from_head(pool: Pool) -> Self {
        Self { head: Some(pool) }
    }

    pub fn head(&self) -> Option<Pool> {
        self.head
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Splices the whole ring `source` in front of the head, which makes it
    /// the back of this ring.
    pub fn push_back(&mut self, source: Pool) {
        match self.head {
            None => self.head = Some(source),
            Some(target) => {
                debug_assert_eq!(target.class(), source.class());

                let target_last = target.prev();
                let source_last = source.prev();

                link(target_last, source);
                link(source_last, target);
            }
        }
    }

    /// Moves every pool of `other` to the back of this ring.
    pub fn append(&mut self, other: &mut Ring) {
        if let Some(source) = other.head.take() {
            self.push_back(source);
        }
    }

    /// Unlinks the head and returns it as a ring of one.
    pub fn pop_front(&mut self) -> Option<Pool> {
        let front = self.head?;

        if front.is_singleton() {
            self.head = None;
            return Some(front);
        }

        link(front.prev(), front.next());
        self.head = Some(front.next());
        link(front, front);

        Some(front)
    }

    /// Makes `pool`, which must already be a member, the head of the ring.
    pub fn rotate_to(&mut self, pool: Pool) {
        debug_assert!(self.iter().any(|p| p == pool));

        self.head = Some(pool);
    }

    /// Replaces the head without touching any link.
    pub(crate) fn set_head(&mut self, head: Option<Pool>) {
        self.head = head;
    }

    pub fn iter(&self) -> RingIter {
        RingIter {
            start: self.head,
            next: self.head,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

/// Visits each pool of a ring once, starting at the head.
pub struct RingIter {
    start: Option<Pool>,
    next: Option<Pool>,
}

impl Iterator for RingIter {
    type Item = Pool;

    fn next(&mut self) -> Option<Pool> {
        let current = self.next?;
        let following = current.next();

        self.next = if Some(following) == self.start {
            None
        } else {
            Some(following)
        };

        Some(current)
    }
}
