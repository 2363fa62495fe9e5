//! The link arena: containers, membership references, and the
//! intrusive sibling chains that connect them.
//!
//! Every container owns a doubly-linked chain of the references that are
//! currently linked to it, threaded through the reference slots
//! themselves. Each linked reference stores the index of its container,
//! so unlinking never searches.

use std::ops::{Deref, DerefMut};

use hearth_core::LinkError;

use crate::key::{ContainerKey, RefKey};
use crate::slab::Slab;

/// A container slot: payload plus the head of its sibling chain.
#[derive(Debug)]
struct ContainerEntry<C> {
    payload: C,
    head: Option<u32>,
    size: usize,
}

/// A reference slot: payload plus its position in at most one chain.
///
/// `container` is `None` exactly when the reference is unlinked, and
/// then `prev`/`next` are `None` as well.
#[derive(Debug)]
struct RefEntry<M> {
    member: M,
    container: Option<u32>,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Arena of containers and the membership references linked to them.
///
/// `C` is the container payload (e.g. a cell coordinate), `M` the
/// member payload carried by each reference (e.g. an entity handle).
///
/// Re-linking an already-linked reference moves it: the reference is
/// unlinked from its current container first, so both containers' sizes
/// stay equal to their actual membership.
#[derive(Debug)]
pub struct LinkArena<C, M> {
    containers: Slab<ContainerEntry<C>>,
    refs: Slab<RefEntry<M>>,
}

impl<C, M> Default for LinkArena<C, M> {
    fn default() -> Self {
        Self::new()
    }
}

// Compile-time assertion: the arena can move between threads whenever
// its payloads can.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<LinkArena<u64, u64>>();
};

impl<C, M> LinkArena<C, M> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            containers: Slab::new(),
            refs: Slab::new(),
        }
    }

    /// Create an arena with room for `refs` references before growing.
    pub fn with_capacity(containers: usize, refs: usize) -> Self {
        Self {
            containers: Slab::with_capacity(containers),
            refs: Slab::with_capacity(refs),
        }
    }

    // ── Containers ──────────────────────────────────────────────

    /// Add an empty container.
    pub fn insert_container(&mut self, payload: C) -> ContainerKey {
        let (index, generation) = self.containers.insert(ContainerEntry {
            payload,
            head: None,
            size: 0,
        });
        ContainerKey::new(index, generation)
    }

    /// Destroy a container, invalidating every reference linked to it.
    ///
    /// The member references survive, unlinked, and report
    /// `is_valid() == false` afterwards. Returns the container payload.
    pub fn remove_container(&mut self, key: ContainerKey) -> Result<C, LinkError> {
        let entry = self
            .containers
            .remove(key.index, key.generation)
            .ok_or(key.stale())?;

        let mut cursor = entry.head;
        let mut invalidated = 0usize;
        while let Some(idx) = cursor {
            let r = self.refs.live_mut(idx);
            debug_assert_eq!(r.container, Some(key.index), "chain crosses containers");
            cursor = r.next;
            r.container = None;
            r.prev = None;
            r.next = None;
            invalidated += 1;
        }
        debug_assert_eq!(
            invalidated, entry.size,
            "container size counter disagrees with its chain"
        );
        Ok(entry.payload)
    }

    /// Whether `key` names a live container.
    pub fn contains_container(&self, key: ContainerKey) -> bool {
        self.containers.contains(key.index, key.generation)
    }

    /// The container's payload.
    pub fn container(&self, key: ContainerKey) -> Result<&C, LinkError> {
        self.containers
            .get(key.index, key.generation)
            .map(|c| &c.payload)
            .ok_or(key.stale())
    }

    /// The container's payload, mutably.
    pub fn container_mut(&mut self, key: ContainerKey) -> Result<&mut C, LinkError> {
        self.containers
            .get_mut(key.index, key.generation)
            .map(|c| &mut c.payload)
            .ok_or(key.stale())
    }

    /// Number of references currently linked to the container. O(1).
    pub fn size(&self, key: ContainerKey) -> Result<usize, LinkError> {
        self.containers
            .get(key.index, key.generation)
            .map(|c| c.size)
            .ok_or(key.stale())
    }

    /// The most recently linked member of the container.
    pub fn first(&self, key: ContainerKey) -> Result<Option<RefKey>, LinkError> {
        let entry = self
            .containers
            .get(key.index, key.generation)
            .ok_or(key.stale())?;
        Ok(entry.head.map(|idx| self.ref_key(idx)))
    }

    /// Iterate the container's members, most recently linked first.
    pub fn members(&self, key: ContainerKey) -> Result<Members<'_, C, M>, LinkError> {
        let entry = self
            .containers
            .get(key.index, key.generation)
            .ok_or(key.stale())?;
        Ok(Members {
            arena: self,
            cursor: entry.head,
            remaining: entry.size,
        })
    }

    /// Number of live containers.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    // ── References ──────────────────────────────────────────────

    /// Create an unlinked reference carrying `member`.
    pub fn create_ref(&mut self, member: M) -> RefKey {
        let (index, generation) = self.refs.insert(RefEntry {
            member,
            container: None,
            prev: None,
            next: None,
        });
        RefKey::new(index, generation)
    }

    /// Create a reference that is destroyed when the returned guard
    /// goes out of scope.
    ///
    /// The guard dereferences to the arena, so the arena stays usable
    /// while the guard is held.
    pub fn scoped(&mut self, member: M) -> ScopedRef<'_, C, M> {
        let key = self.create_ref(member);
        ScopedRef {
            arena: self,
            key,
            released: false,
        }
    }

    /// Destroy a reference, unlinking it first if needed. O(1).
    ///
    /// Returns the member payload. Every copy of `key` is stale after
    /// this call.
    pub fn destroy_ref(&mut self, key: RefKey) -> Result<M, LinkError> {
        self.check_ref(key)?;
        self.detach(key.index);
        let entry = self
            .refs
            .remove(key.index, key.generation)
            .ok_or(key.stale())?;
        Ok(entry.member)
    }

    /// Link a reference into a container's sibling chain. O(1).
    ///
    /// A reference that is already linked is moved: it is unlinked from
    /// its current container first. Linking into the container it already
    /// belongs to moves it to the head of the chain and leaves the size
    /// unchanged.
    pub fn link(&mut self, key: RefKey, container: ContainerKey) -> Result<(), LinkError> {
        self.check_ref(key)?;
        if !self.containers.contains(container.index, container.generation) {
            return Err(container.stale());
        }

        self.detach(key.index);

        let c = self.containers.live_mut(container.index);
        let old_head = c.head;
        c.head = Some(key.index);
        c.size += 1;

        if let Some(h) = old_head {
            self.refs.live_mut(h).prev = Some(key.index);
        }
        let r = self.refs.live_mut(key.index);
        r.container = Some(container.index);
        r.prev = None;
        r.next = old_head;
        Ok(())
    }

    /// Unlink a reference from its container. O(1).
    ///
    /// Returns `Ok(false)` if the reference was not linked; repeated
    /// calls are harmless.
    pub fn unlink(&mut self, key: RefKey) -> Result<bool, LinkError> {
        self.check_ref(key)?;
        Ok(self.detach(key.index))
    }

    /// Whether the reference is currently linked to a container.
    ///
    /// Stale keys report `false`.
    pub fn is_valid(&self, key: RefKey) -> bool {
        self.refs
            .get(key.index, key.generation)
            .is_some_and(|r| r.container.is_some())
    }

    /// Whether `key` names a live reference, linked or not.
    pub fn contains_ref(&self, key: RefKey) -> bool {
        self.refs.contains(key.index, key.generation)
    }

    /// The container the reference is linked to, if any.
    pub fn container_of(&self, key: RefKey) -> Result<Option<ContainerKey>, LinkError> {
        let r = self.refs.get(key.index, key.generation).ok_or(key.stale())?;
        Ok(r.container.map(|idx| self.container_key(idx)))
    }

    /// Next sibling in the same container, or `None` at the chain end or
    /// when unlinked.
    pub fn next(&self, key: RefKey) -> Result<Option<RefKey>, LinkError> {
        let r = self.refs.get(key.index, key.generation).ok_or(key.stale())?;
        Ok(r.next.map(|idx| self.ref_key(idx)))
    }

    /// Previous sibling in the same container, or `None` at the chain
    /// head or when unlinked.
    pub fn prev(&self, key: RefKey) -> Result<Option<RefKey>, LinkError> {
        let r = self.refs.get(key.index, key.generation).ok_or(key.stale())?;
        Ok(r.prev.map(|idx| self.ref_key(idx)))
    }

    /// The reference's member payload.
    pub fn member(&self, key: RefKey) -> Result<&M, LinkError> {
        self.refs
            .get(key.index, key.generation)
            .map(|r| &r.member)
            .ok_or(key.stale())
    }

    /// The reference's member payload, mutably.
    pub fn member_mut(&mut self, key: RefKey) -> Result<&mut M, LinkError> {
        self.refs
            .get_mut(key.index, key.generation)
            .map(|r| &mut r.member)
            .ok_or(key.stale())
    }

    /// Number of live references, linked or not.
    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    // ── Internals ───────────────────────────────────────────────

    fn check_ref(&self, key: RefKey) -> Result<(), LinkError> {
        if self.refs.contains(key.index, key.generation) {
            Ok(())
        } else {
            Err(key.stale())
        }
    }

    /// Splice a live reference out of its chain. Returns whether it was
    /// linked.
    fn detach(&mut self, idx: u32) -> bool {
        let r = self.refs.live_mut(idx);
        let Some(container) = r.container.take() else {
            return false;
        };
        let prev = r.prev.take();
        let next = r.next.take();

        match prev {
            Some(p) => self.refs.live_mut(p).next = next,
            None => self.containers.live_mut(container).head = next,
        }
        if let Some(n) = next {
            self.refs.live_mut(n).prev = prev;
        }
        let c = self.containers.live_mut(container);
        debug_assert!(c.size > 0, "unlinking from an empty container");
        c.size -= 1;
        true
    }

    fn ref_key(&self, idx: u32) -> RefKey {
        RefKey::new(idx, self.refs.generation_of(idx))
    }

    fn container_key(&self, idx: u32) -> ContainerKey {
        ContainerKey::new(idx, self.containers.generation_of(idx))
    }
}

/// Iterator over a container's members, yielding each reference key
/// with its member payload.
pub struct Members<'a, C, M> {
    arena: &'a LinkArena<C, M>,
    cursor: Option<u32>,
    remaining: usize,
}

impl<'a, C, M> Iterator for Members<'a, C, M> {
    type Item = (RefKey, &'a M);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let r = self.arena.refs.live(idx);
        self.cursor = r.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some((self.arena.ref_key(idx), &r.member))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<C, M> ExactSizeIterator for Members<'_, C, M> {}

/// A membership reference that is destroyed on scope exit.
///
/// Created by [`LinkArena::scoped`]. Dropping the guard on any path,
/// including unwinding, unlinks and frees the reference. Call
/// [`into_key`](ScopedRef::into_key) to keep the reference alive past
/// the guard.
pub struct ScopedRef<'a, C, M> {
    arena: &'a mut LinkArena<C, M>,
    key: RefKey,
    released: bool,
}

impl<C, M> ScopedRef<'_, C, M> {
    /// The guarded reference's key.
    pub fn key(&self) -> RefKey {
        self.key
    }

    /// Link the guarded reference into `container`.
    pub fn link(&mut self, container: ContainerKey) -> Result<(), LinkError> {
        let key = self.key();
        self.arena.link(key, container)
    }

    /// Release the guard without destroying the reference.
    pub fn into_key(mut self) -> RefKey {
        self.released = true;
        self.key
    }
}

impl<C, M> Deref for ScopedRef<'_, C, M> {
    type Target = LinkArena<C, M>;

    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl<C, M> DerefMut for ScopedRef<'_, C, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.arena
    }
}

impl<C, M> Drop for ScopedRef<'_, C, M> {
    fn drop(&mut self) {
        if !self.released {
            // The guard's reference may already have been destroyed
            // through the arena; a stale key is fine here.
            let _ = self.arena.destroy_ref(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(arena: &LinkArena<&str, u32>, c: ContainerKey) -> Vec<u32> {
        arena.members(c).unwrap().map(|(_, m)| *m).collect()
    }

    #[test]
    fn link_and_unlink_track_size() {
        let mut arena = LinkArena::new();
        let cell = arena.insert_container("cell");
        let a = arena.create_ref(1u32);
        let b = arena.create_ref(2u32);

        assert!(!arena.is_valid(a));
        arena.link(a, cell).unwrap();
        arena.link(b, cell).unwrap();
        assert_eq!(arena.size(cell).unwrap(), 2);
        assert!(arena.is_valid(a));
        assert_eq!(chain(&arena, cell), vec![2, 1], "head insertion");

        assert!(arena.unlink(a).unwrap());
        assert_eq!(arena.size(cell).unwrap(), 1);
        assert!(!arena.unlink(a).unwrap(), "second unlink is a no-op");
        assert_eq!(arena.size(cell).unwrap(), 1);
    }

    #[test]
    fn sibling_traversal() {
        let mut arena = LinkArena::new();
        let cell = arena.insert_container("cell");
        let keys: Vec<_> = (0..3u32).map(|i| arena.create_ref(i)).collect();
        for &k in &keys {
            arena.link(k, cell).unwrap();
        }
        // Chain is 2 -> 1 -> 0.
        assert_eq!(arena.first(cell).unwrap(), Some(keys[2]));
        assert_eq!(arena.next(keys[2]).unwrap(), Some(keys[1]));
        assert_eq!(arena.next(keys[1]).unwrap(), Some(keys[0]));
        assert_eq!(arena.next(keys[0]).unwrap(), None);
        assert_eq!(arena.prev(keys[0]).unwrap(), Some(keys[1]));
        assert_eq!(arena.prev(keys[2]).unwrap(), None);

        // Remove the middle element; neighbours splice together.
        arena.unlink(keys[1]).unwrap();
        assert_eq!(arena.next(keys[2]).unwrap(), Some(keys[0]));
        assert_eq!(arena.prev(keys[0]).unwrap(), Some(keys[2]));
        assert_eq!(arena.next(keys[1]).unwrap(), None);
    }

    #[test]
    fn relink_moves_between_containers() {
        let mut arena = LinkArena::new();
        let a = arena.insert_container("a");
        let b = arena.insert_container("b");
        let r = arena.create_ref(7u32);

        arena.link(r, a).unwrap();
        arena.link(r, b).unwrap();
        assert_eq!(arena.size(a).unwrap(), 0);
        assert_eq!(arena.size(b).unwrap(), 1);
        assert_eq!(arena.container_of(r).unwrap(), Some(b));
        assert_eq!(arena.first(a).unwrap(), None);
    }

    #[test]
    fn relink_same_container_keeps_size() {
        let mut arena = LinkArena::new();
        let c = arena.insert_container("c");
        let x = arena.create_ref(1u32);
        let y = arena.create_ref(2u32);
        arena.link(x, c).unwrap();
        arena.link(y, c).unwrap();
        arena.link(x, c).unwrap();
        assert_eq!(arena.size(c).unwrap(), 2);
        assert_eq!(chain(&arena, c), vec![1, 2]);
    }

    #[test]
    fn removing_container_invalidates_members() {
        let mut arena = LinkArena::new();
        let c = arena.insert_container("doomed");
        let a = arena.create_ref(1u32);
        let b = arena.create_ref(2u32);
        arena.link(a, c).unwrap();
        arena.link(b, c).unwrap();

        assert_eq!(arena.remove_container(c).unwrap(), "doomed");
        assert!(!arena.is_valid(a));
        assert!(!arena.is_valid(b));
        assert_eq!(arena.container_of(a).unwrap(), None);
        assert_eq!(arena.next(b).unwrap(), None);
        assert!(matches!(arena.size(c), Err(LinkError::StaleContainer { .. })));

        // Members are still alive and can join a new container.
        let d = arena.insert_container("fresh");
        arena.link(a, d).unwrap();
        assert_eq!(arena.size(d).unwrap(), 1);
    }

    #[test]
    fn destroying_ref_unlinks_it() {
        let mut arena = LinkArena::new();
        let c = arena.insert_container("c");
        let a = arena.create_ref(1u32);
        let b = arena.create_ref(2u32);
        arena.link(a, c).unwrap();
        arena.link(b, c).unwrap();

        assert_eq!(arena.destroy_ref(b).unwrap(), 2);
        assert_eq!(arena.size(c).unwrap(), 1);
        assert_eq!(arena.first(c).unwrap(), Some(a));
        assert!(matches!(arena.unlink(b), Err(LinkError::StaleReference { .. })));
        assert!(!arena.is_valid(b));
    }

    #[test]
    fn stale_key_does_not_alias_reused_slot() {
        let mut arena: LinkArena<&str, u32> = LinkArena::new();
        let old = arena.create_ref(1);
        arena.destroy_ref(old).unwrap();
        let new = arena.create_ref(2);
        assert_eq!(new.index(), old.index());
        assert!(arena.member(old).is_err());
        assert_eq!(*arena.member(new).unwrap(), 2);

        let c_old = arena.insert_container("x");
        arena.remove_container(c_old).unwrap();
        let c_new = arena.insert_container("y");
        assert!(matches!(
            arena.link(new, c_old),
            Err(LinkError::StaleContainer { .. })
        ));
        arena.link(new, c_new).unwrap();
    }

    #[test]
    fn scoped_ref_unlinks_on_drop() {
        let mut arena = LinkArena::new();
        let c = arena.insert_container("c");
        {
            let mut guard = arena.scoped(5u32);
            guard.link(c).unwrap();
            assert_eq!(guard.size(c).unwrap(), 1);
        }
        assert_eq!(arena.size(c).unwrap(), 0);
        assert_eq!(arena.ref_count(), 0);
    }

    #[test]
    fn scoped_ref_unlinks_on_unwind() {
        let mut arena = LinkArena::new();
        let c = arena.insert_container("c");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut guard = arena.scoped(5u32);
            guard.link(c).unwrap();
            panic!("entity update failed");
        }));
        assert!(result.is_err());
        assert_eq!(arena.size(c).unwrap(), 0);
    }

    #[test]
    fn scoped_ref_into_key_keeps_reference() {
        let mut arena = LinkArena::new();
        let c = arena.insert_container("c");
        let key = {
            let mut guard = arena.scoped(5u32);
            guard.link(c).unwrap();
            guard.into_key()
        };
        assert!(arena.is_valid(key));
        assert_eq!(arena.size(c).unwrap(), 1);
    }

    #[test]
    fn member_payload_is_mutable() {
        let mut arena: LinkArena<(), String> = LinkArena::new();
        let r = arena.create_ref("orc".to_string());
        arena.member_mut(r).unwrap().push_str("-chief");
        assert_eq!(arena.member(r).unwrap(), "orc-chief");
        let c = arena.insert_container(());
        *arena.container_mut(c).unwrap() = ();
        assert_eq!(arena.container_count(), 1);
    }

    #[test]
    fn members_iterator_reports_exact_size() {
        let mut arena = LinkArena::new();
        let c = arena.insert_container("c");
        for i in 0..4u32 {
            let r = arena.create_ref(i);
            arena.link(r, c).unwrap();
        }
        let it = arena.members(c).unwrap();
        assert_eq!(it.len(), 4);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Link { r: usize, c: usize },
            Unlink { r: usize },
            Destroy { r: usize },
            DropContainer { c: usize },
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0usize..16, 0usize..4).prop_map(|(r, c)| Op::Link { r, c }),
                (0usize..16).prop_map(|r| Op::Unlink { r }),
                (0usize..16).prop_map(|r| Op::Destroy { r }),
                (0usize..4).prop_map(|c| Op::DropContainer { c }),
            ]
        }

        proptest! {
            #[test]
            fn sizes_match_actual_membership(ops in proptest::collection::vec(op(), 1..200)) {
                let mut arena: LinkArena<usize, usize> = LinkArena::new();
                let mut containers: Vec<ContainerKey> =
                    (0..4).map(|c| arena.insert_container(c)).collect();
                let mut refs: Vec<RefKey> = (0..16).map(|r| arena.create_ref(r)).collect();

                for op in ops {
                    match op {
                        Op::Link { r, c } => {
                            let _ = arena.link(refs[r], containers[c]);
                        }
                        Op::Unlink { r } => {
                            let _ = arena.unlink(refs[r]);
                        }
                        Op::Destroy { r } => {
                            let _ = arena.destroy_ref(refs[r]);
                            refs[r] = arena.create_ref(r);
                        }
                        Op::DropContainer { c } => {
                            let _ = arena.remove_container(containers[c]);
                            containers[c] = arena.insert_container(c);
                        }
                    }

                    for &c in &containers {
                        let linked = refs
                            .iter()
                            .filter(|&&r| arena.container_of(r).ok().flatten() == Some(c))
                            .count();
                        prop_assert_eq!(arena.size(c).unwrap(), linked);
                        prop_assert_eq!(arena.members(c).unwrap().count(), linked);
                    }
                }
            }
        }
    }
}
