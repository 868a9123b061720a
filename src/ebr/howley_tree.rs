//! Non-blocking internal binary search tree by Howley and Jones.
//!
//! Keys live in every node. Each node carries an `op` word whose low bits hold the
//! node's state and whose pointer names the descriptor of the change in flight, so any
//! thread that meets a flagged node can finish that change before moving on.
//! Deleting a node with two children copies its in-order successor's key into it
//! ("relocation") and then splices the successor out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_epoch::{unprotected, Atomic, Guard, Owned, Shared};

use super::concurrent_set::ConcurrentSet;

bitflags! {
    struct OpTag: usize {
        const NONE = 0usize;
        const MARK = 1usize;
        const CHILDCAS = 2usize;
        const RELOCATE = 3usize;
    }
}

/// Tag bit on a child pointer meaning "no child". The address part keeps whatever the
/// slot pointed to last, so two emptyings of the same slot never look alike.
const EMPTY: usize = 1;

const ONGOING: usize = 0;
const SUCCESSFUL: usize = 1;
const FAILED: usize = 2;

#[inline]
fn state<T>(op: Shared<'_, T>) -> OpTag {
    OpTag::from_bits_truncate(op.tag())
}

#[inline]
fn is_empty<T>(child: Shared<'_, T>) -> bool {
    child.tag() & EMPTY != 0
}

struct Node<K> {
    // Null only for the root sentinel, which is never compared against.
    key: Atomic<K>,
    // tag on low bits: {None, Mark, ChildCas, Relocate}
    op: Atomic<Operation<K>>,
    left: Atomic<Node<K>>,
    right: Atomic<Node<K>>,
}

enum Operation<K> {
    ChildCas {
        is_left: bool,
        expected: Atomic<Node<K>>,
        new: Atomic<Node<K>>,
    },
    Relocate {
        state: AtomicUsize,
        dest: Atomic<Node<K>>,
        dest_op: Atomic<Operation<K>>,
        remove_key: Atomic<K>,
        replace_key: Atomic<K>,
        /// Number of nodes that stopped holding this descriptor.
        releases: AtomicUsize,
    },
}

impl<K> Drop for Operation<K> {
    fn drop(&mut self) {
        // After a successful relocation the destination holds the successor's key cell,
        // so the overwritten one is owned by the descriptor.
        if let Operation::Relocate {
            state, remove_key, ..
        } = self
        {
            if *state.get_mut() == SUCCESSFUL {
                unsafe {
                    let key = remove_key.load(Ordering::Relaxed, unprotected());
                    if !key.is_null() {
                        drop(key.into_owned());
                    }
                }
            }
        }
    }
}

impl<K> Node<K> {
    fn new<'g>(key: Shared<'g, K>) -> Self {
        Self {
            key: Atomic::from(key),
            op: Atomic::null(),
            left: Atomic::from(Shared::null().with_tag(EMPTY)),
            right: Atomic::from(Shared::null().with_tag(EMPTY)),
        }
    }

    fn sentinel() -> Self {
        Self::new(Shared::null())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SearchResult {
    Found,
    NotFoundLeft,
    NotFoundRight,
    /// A search rooted below the true root met a flagged node at its root.
    Abort,
}

struct Cursor<'g, K> {
    pred: Shared<'g, Node<K>>,
    pred_op: Shared<'g, Operation<K>>,
    curr: Shared<'g, Node<K>>,
    curr_op: Shared<'g, Operation<K>>,
}

impl<'g, K> Cursor<'g, K> {
    fn new(root: Shared<'g, Node<K>>) -> Self {
        Self {
            pred: Shared::null(),
            pred_op: Shared::null(),
            curr: root,
            curr_op: Shared::null(),
        }
    }
}

pub struct HJBSTree<K> {
    root: Atomic<Node<K>>,
}

impl<K> Default for HJBSTree<K>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `node` gave its key cell away as the successor of a successful relocation.
///
/// # Safety
/// `op` is null or points to a live descriptor.
unsafe fn donated_key<K>(
    node: Shared<'_, Node<K>>,
    op: Shared<'_, Operation<K>>,
    guard: &Guard,
) -> bool {
    match op.as_ref() {
        Some(Operation::Relocate { state, dest, .. }) => {
            state.load(Ordering::Acquire) == SUCCESSFUL
                && dest.load(Ordering::Acquire, guard) != node.with_tag(0)
        }
        _ => false,
    }
}

/// Called once for every node that stops holding `op`, either because its `op` word
/// moved to another descriptor or because the node itself was retired.
///
/// A successful relocation is held by both its destination and the successor node,
/// every other descriptor by a single node.
///
/// # Safety
/// `op` is null or points to a descriptor that has not been retired yet.
unsafe fn release<'g, K>(op: Shared<'g, Operation<K>>, guard: &'g Guard) {
    let op = op.with_tag(0);
    match op.as_ref() {
        None => {}
        Some(Operation::ChildCas { .. }) => guard.defer_destroy(op),
        Some(Operation::Relocate {
            state, releases, ..
        }) => {
            let holders = if state.load(Ordering::Acquire) == SUCCESSFUL {
                2
            } else {
                1
            };
            if releases.fetch_add(1, Ordering::AcqRel) + 1 == holders {
                guard.defer_destroy(op);
            }
        }
    }
}

impl<K> Drop for HJBSTree<K> {
    fn drop(&mut self) {
        unsafe {
            let guard = unprotected();
            let mut ops = HashSet::new();
            let mut stack = vec![self.root.load(Ordering::Relaxed, guard)];

            while let Some(node) = stack.pop() {
                if is_empty(node) {
                    continue;
                }
                let node_ref = node.deref();
                stack.push(node_ref.left.load(Ordering::Relaxed, guard));
                stack.push(node_ref.right.load(Ordering::Relaxed, guard));

                let op = node_ref.op.load(Ordering::Relaxed, guard).with_tag(0);
                let key = node_ref.key.load(Ordering::Relaxed, guard);
                if !key.is_null() && !donated_key(node, op, guard) {
                    drop(key.into_owned());
                }
                if !op.is_null() {
                    ops.insert(op.as_raw());
                }
                drop(node.into_owned());
            }

            // A descriptor may be held by two reachable nodes.
            for op in ops {
                drop(Owned::from_raw(op as *mut Operation<K>));
            }
        }
    }
}

impl<K> HJBSTree<K>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self {
            root: Atomic::new(Node::sentinel()),
        }
    }

    /// Descends from `aux_root` looking for `key`.
    ///
    /// Starting from the true root, flagged nodes on the way are helped and the search
    /// restarts. Starting anywhere else, a flagged `aux_root` yields `Abort` so that the
    /// caller's retry loop deals with the race. A path is only reported once the last
    /// node left by a right step and the terminal node are both unchanged.
    fn find<'g>(
        &'g self,
        key: &K,
        aux_root: Shared<'g, Node<K>>,
        guard: &'g Guard,
    ) -> (SearchResult, Cursor<'g, K>) {
        let root = self.root.load(Ordering::Acquire, guard);

        'retry: loop {
            let mut cursor = Cursor::new(aux_root);
            let mut result = SearchResult::NotFoundRight;
            let aux_ref = unsafe { aux_root.deref() };
            cursor.curr_op = aux_ref.op.load(Ordering::Acquire, guard);

            if state(cursor.curr_op) != OpTag::NONE {
                if aux_root == root {
                    // The root only ever takes part in child CASes.
                    self.help_child_cas(cursor.curr_op, aux_root, guard);
                    trace_log!("find: helped root, restarting");
                    continue 'retry;
                } else {
                    trace_log!("find: flagged subtree root, aborting");
                    return (SearchResult::Abort, cursor);
                }
            }

            let mut next = aux_ref.right.load(Ordering::Acquire, guard);
            let mut last_right = aux_root;
            let mut last_right_op = cursor.curr_op;

            while !is_empty(next) {
                cursor.pred = cursor.curr;
                cursor.pred_op = cursor.curr_op;
                cursor.curr = next;

                let curr_ref = unsafe { cursor.curr.deref() };
                cursor.curr_op = curr_ref.op.load(Ordering::Acquire, guard);
                if state(cursor.curr_op) != OpTag::NONE {
                    self.help(
                        cursor.pred,
                        cursor.pred_op,
                        cursor.curr,
                        cursor.curr_op,
                        guard,
                    );
                    trace_log!("find: helped flagged node, restarting");
                    continue 'retry;
                }

                let curr_key = unsafe { curr_ref.key.load(Ordering::Acquire, guard).deref() };
                match key.cmp(curr_key) {
                    std::cmp::Ordering::Less => {
                        result = SearchResult::NotFoundLeft;
                        next = curr_ref.left.load(Ordering::Acquire, guard);
                    }
                    std::cmp::Ordering::Greater => {
                        result = SearchResult::NotFoundRight;
                        next = curr_ref.right.load(Ordering::Acquire, guard);
                        last_right = cursor.curr;
                        last_right_op = cursor.curr_op;
                    }
                    std::cmp::Ordering::Equal => {
                        result = SearchResult::Found;
                        break;
                    }
                }
            }

            if result != SearchResult::Found
                && last_right_op
                    != unsafe { last_right.deref() }
                        .op
                        .load(Ordering::Acquire, guard)
            {
                continue 'retry;
            }
            if unsafe { cursor.curr.deref() }
                .op
                .load(Ordering::Acquire, guard)
                != cursor.curr_op
            {
                continue 'retry;
            }
            return (result, cursor);
        }
    }

    pub fn contains(&self, key: &K, guard: &Guard) -> bool {
        let root = self.root.load(Ordering::Acquire, guard);
        self.find(key, root, guard).0 == SearchResult::Found
    }

    pub fn add(&self, key: K, guard: &Guard) -> bool {
        let root = self.root.load(Ordering::Acquire, guard);
        // The key cell is shared by every attempt and published with the winning node.
        let key = Owned::new(key).into_shared(unsafe { unprotected() });

        loop {
            let (result, cursor) = self.find(unsafe { key.deref() }, root, guard);
            if result == SearchResult::Found {
                unsafe { drop(key.into_owned()) };
                return false;
            }

            let curr_ref = unsafe { cursor.curr.deref() };
            let is_left = result == SearchResult::NotFoundLeft;
            let old = if is_left {
                curr_ref.left.load(Ordering::Acquire, guard)
            } else {
                curr_ref.right.load(Ordering::Acquire, guard)
            };

            let new_node = Owned::new(Node::new(key)).into_shared(unsafe { unprotected() });
            let cas_op = Owned::new(Operation::ChildCas {
                is_left,
                expected: Atomic::from(old),
                new: Atomic::from(new_node),
            })
            .into_shared(unsafe { unprotected() });

            match curr_ref.op.compare_exchange(
                cursor.curr_op,
                cas_op.with_tag(OpTag::CHILDCAS.bits()),
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            ) {
                Ok(_) => {
                    unsafe { release(cursor.curr_op, guard) };
                    self.help_child_cas(cas_op, cursor.curr, guard);
                    return true;
                }
                Err(_) => {
                    unsafe {
                        drop(cas_op.into_owned());
                        drop(new_node.into_owned());
                    }
                    trace_log!("add: lost the install race, retrying");
                }
            }
        }
    }

    pub fn remove(&self, key: &K, guard: &Guard) -> bool {
        let root = self.root.load(Ordering::Acquire, guard);

        loop {
            let (result, cursor) = self.find(key, root, guard);
            if result != SearchResult::Found {
                return false;
            }

            let curr_ref = unsafe { cursor.curr.deref() };
            if is_empty(curr_ref.right.load(Ordering::Acquire, guard))
                || is_empty(curr_ref.left.load(Ordering::Acquire, guard))
            {
                // Fewer than two children: mark, then splice out.
                if curr_ref
                    .op
                    .compare_exchange(
                        cursor.curr_op,
                        cursor.curr_op.with_tag(OpTag::MARK.bits()),
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                        guard,
                    )
                    .is_ok()
                {
                    self.help_marked(cursor.pred, cursor.pred_op, cursor.curr, guard);
                    return true;
                }
                trace_log!("remove: lost the mark race, retrying");
            } else {
                // Two children: move the in-order successor's key here.
                let (found, succ) = self.find(key, cursor.curr, guard);
                let remove_key = curr_ref.key.load(Ordering::Acquire, guard);
                if found == SearchResult::Abort
                    || curr_ref.op.load(Ordering::Acquire, guard) != cursor.curr_op
                {
                    continue;
                }

                let succ_ref = unsafe { succ.curr.deref() };
                let reloc_op = Owned::new(Operation::Relocate {
                    state: AtomicUsize::new(ONGOING),
                    dest: Atomic::from(cursor.curr),
                    dest_op: Atomic::from(cursor.curr_op),
                    remove_key: Atomic::from(remove_key),
                    replace_key: Atomic::from(succ_ref.key.load(Ordering::Acquire, guard)),
                    releases: AtomicUsize::new(0),
                })
                .into_shared(unsafe { unprotected() });

                match succ_ref.op.compare_exchange(
                    succ.curr_op,
                    reloc_op.with_tag(OpTag::RELOCATE.bits()),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                    guard,
                ) {
                    Ok(_) => {
                        unsafe { release(succ.curr_op, guard) };
                        if self.help_relocate(reloc_op, succ.pred, succ.pred_op, succ.curr, guard) {
                            return true;
                        }
                    }
                    Err(_) => unsafe { drop(reloc_op.into_owned()) },
                }
                trace_log!("remove: relocation failed, retrying");
            }
        }
    }

    fn help<'g>(
        &'g self,
        pred: Shared<'g, Node<K>>,
        pred_op: Shared<'g, Operation<K>>,
        curr: Shared<'g, Node<K>>,
        curr_op: Shared<'g, Operation<K>>,
        guard: &'g Guard,
    ) {
        match state(curr_op) {
            OpTag::CHILDCAS => self.help_child_cas(curr_op, curr, guard),
            OpTag::RELOCATE => {
                let _ = self.help_relocate(curr_op, pred, pred_op, curr, guard);
            }
            OpTag::MARK => self.help_marked(pred, pred_op, curr, guard),
            _ => {}
        }
    }

    fn help_child_cas<'g>(
        &'g self,
        op: Shared<'g, Operation<K>>,
        dest: Shared<'g, Node<K>>,
        guard: &'g Guard,
    ) {
        let op = op.with_tag(0);
        let (is_left, expected, new) = match unsafe { op.deref() } {
            Operation::ChildCas {
                is_left,
                expected,
                new,
            } => (
                *is_left,
                expected.load(Ordering::Acquire, guard),
                new.load(Ordering::Acquire, guard),
            ),
            _ => panic!("op is not pointing to a ChildCas record"),
        };

        let dest_ref = unsafe { dest.deref() };
        let child = if is_left {
            &dest_ref.left
        } else {
            &dest_ref.right
        };
        if child
            .compare_exchange(expected, new, Ordering::SeqCst, Ordering::SeqCst, guard)
            .is_ok()
            && !is_empty(expected)
        {
            // `expected` was a marked node and has just been spliced out.
            unsafe { self.retire_node(expected, guard) };
        }
        let _ = dest_ref.op.compare_exchange(
            op.with_tag(OpTag::CHILDCAS.bits()),
            op.with_tag(OpTag::NONE.bits()),
            Ordering::SeqCst,
            Ordering::SeqCst,
            guard,
        );
    }

    /// Returns whether the relocation described by `op` took effect.
    ///
    /// `curr` is the node flagged with `op` that the caller reached (the successor, or
    /// the destination when met during a search) and `pred`/`pred_op` its parent snapshot.
    fn help_relocate<'g>(
        &'g self,
        op: Shared<'g, Operation<K>>,
        pred: Shared<'g, Node<K>>,
        pred_op: Shared<'g, Operation<K>>,
        curr: Shared<'g, Node<K>>,
        guard: &'g Guard,
    ) -> bool {
        let op = op.with_tag(0);
        let (state, dest, dest_op, remove_key, replace_key) = match unsafe { op.deref() } {
            Operation::Relocate {
                state,
                dest,
                dest_op,
                remove_key,
                replace_key,
                ..
            } => (
                state,
                dest.load(Ordering::Acquire, guard),
                dest_op.load(Ordering::Acquire, guard),
                remove_key.load(Ordering::Acquire, guard),
                replace_key.load(Ordering::Acquire, guard),
            ),
            _ => panic!("op is not pointing to a Relocate record"),
        };
        let dest_ref = unsafe { dest.deref() };
        let relocate = op.with_tag(OpTag::RELOCATE.bits());

        let mut seen_state = state.load(Ordering::Acquire);
        if seen_state == ONGOING {
            let flagged = match dest_ref.op.compare_exchange(
                dest_op,
                relocate,
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            ) {
                Ok(_) => {
                    unsafe { release(dest_op, guard) };
                    true
                }
                Err(e) => e.current == relocate,
            };
            seen_state = if flagged {
                let _ = state.compare_exchange(
                    ONGOING,
                    SUCCESSFUL,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
                SUCCESSFUL
            } else {
                match state.compare_exchange(ONGOING, FAILED, Ordering::SeqCst, Ordering::SeqCst) {
                    Ok(_) => FAILED,
                    Err(current) => current,
                }
            };
        }

        if seen_state == SUCCESSFUL {
            let _ = dest_ref.key.compare_exchange(
                remove_key,
                replace_key,
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            );
            let _ = dest_ref.op.compare_exchange(
                relocate,
                op.with_tag(OpTag::NONE.bits()),
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            );
        }

        let result = seen_state == SUCCESSFUL;
        debug_log!(result, "relocation finished");
        if dest == curr {
            return result;
        }

        let cleared = if result { OpTag::MARK } else { OpTag::NONE };
        let _ = unsafe { curr.deref() }.op.compare_exchange(
            relocate,
            op.with_tag(cleared.bits()),
            Ordering::SeqCst,
            Ordering::SeqCst,
            guard,
        );
        if result {
            let pred_op = if dest == pred {
                op.with_tag(OpTag::NONE.bits())
            } else {
                pred_op
            };
            self.help_marked(pred, pred_op, curr, guard);
        }
        result
    }

    /// Swings `pred`'s pointer from the marked `curr` to `curr`'s only child, or to an
    /// empty slot when `curr` has none.
    fn help_marked<'g>(
        &'g self,
        pred: Shared<'g, Node<K>>,
        pred_op: Shared<'g, Operation<K>>,
        curr: Shared<'g, Node<K>>,
        guard: &'g Guard,
    ) {
        let curr_ref = unsafe { curr.deref() };
        let left = curr_ref.left.load(Ordering::Acquire, guard);
        let new_ref = if is_empty(left) {
            let right = curr_ref.right.load(Ordering::Acquire, guard);
            if is_empty(right) {
                curr.with_tag(EMPTY)
            } else {
                right
            }
        } else {
            left
        };

        let pred_ref = unsafe { pred.deref() };
        let cas_op = Owned::new(Operation::ChildCas {
            is_left: curr == pred_ref.left.load(Ordering::Acquire, guard),
            expected: Atomic::from(curr),
            new: Atomic::from(new_ref),
        })
        .into_shared(unsafe { unprotected() });

        match pred_ref.op.compare_exchange(
            pred_op,
            cas_op.with_tag(OpTag::CHILDCAS.bits()),
            Ordering::SeqCst,
            Ordering::SeqCst,
            guard,
        ) {
            Ok(_) => {
                unsafe { release(pred_op, guard) };
                self.help_child_cas(cas_op, pred, guard);
            }
            Err(_) => unsafe { drop(cas_op.into_owned()) },
        }
    }

    /// # Safety
    /// `node` was just unlinked by the caller's child CAS, which no other thread can win.
    unsafe fn retire_node<'g>(&'g self, node: Shared<'g, Node<K>>, guard: &'g Guard) {
        let node_ref = node.deref();
        let op = node_ref.op.load(Ordering::Acquire, guard);
        if !donated_key(node, op.with_tag(0), guard) {
            guard.defer_destroy(node_ref.key.load(Ordering::Acquire, guard));
        }
        release(op, guard);
        guard.defer_destroy(node);
    }
}

impl<K> ConcurrentSet<K> for HJBSTree<K>
where
    K: Ord,
{
    fn new() -> Self {
        HJBSTree::new()
    }

    fn contains(&self, key: &K, guard: &Guard) -> bool {
        self.contains(key, guard)
    }

    fn add(&self, key: K, guard: &Guard) -> bool {
        self.add(key, guard)
    }

    fn remove(&self, key: &K, guard: &Guard) -> bool {
        self.remove(key, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::{state, HJBSTree, Node, OpTag};
    use crate::ebr::concurrent_set;
    use crossbeam_epoch::{pin, Guard, Shared};
    use crossbeam_utils::thread;
    use std::sync::atomic::Ordering;

    /// In-order keys of the unmarked nodes. Only meaningful while no operation runs.
    fn keys<K: Ord + Clone>(tree: &HJBSTree<K>, guard: &Guard) -> Vec<K> {
        fn walk<K: Clone>(node: Shared<'_, Node<K>>, guard: &Guard, out: &mut Vec<K>) {
            if super::is_empty(node) {
                return;
            }
            let node_ref = unsafe { node.deref() };
            walk(node_ref.left.load(Ordering::Acquire, guard), guard, out);
            if state(node_ref.op.load(Ordering::Acquire, guard)) != OpTag::MARK {
                out.push(unsafe { node_ref.key.load(Ordering::Acquire, guard).deref() }.clone());
            }
            walk(node_ref.right.load(Ordering::Acquire, guard), guard, out);
        }

        let root = unsafe { tree.root.load(Ordering::Acquire, guard).deref() };
        let mut out = Vec::new();
        walk(root.right.load(Ordering::Acquire, guard), guard, &mut out);
        out
    }

    #[test]
    fn smoke_hjbst() {
        concurrent_set::tests::smoke::<HJBSTree<i32>>();
    }

    #[test]
    fn contended_hjbst() {
        concurrent_set::tests::contended::<HJBSTree<i32>>();
    }

    #[test]
    fn add_keeps_order() {
        let tree = HJBSTree::new();
        let guard = &pin();
        assert!(tree.add(10, guard));
        assert!(tree.add(20, guard));
        assert!(tree.add(5, guard));
        for k in [5, 10, 20] {
            assert!(tree.contains(&k, guard));
        }
        assert_eq!(keys(&tree, guard), vec![5, 10, 20]);
    }

    #[test]
    fn remove_leaf_then_absent() {
        let tree = HJBSTree::new();
        let guard = &pin();
        assert!(tree.add(10, guard));
        assert!(tree.remove(&10, guard));
        assert!(!tree.contains(&10, guard));
        assert!(!tree.remove(&10, guard));
        assert!(keys(&tree, guard).is_empty());
    }

    #[test]
    fn remove_with_two_children_relocates() {
        let tree = HJBSTree::new();
        let guard = &pin();
        for k in [10, 20, 5] {
            assert!(tree.add(k, guard));
        }
        assert!(tree.remove(&10, guard));
        assert!(!tree.contains(&10, guard));
        assert!(tree.contains(&5, guard));
        assert!(tree.contains(&20, guard));
        assert_eq!(keys(&tree, guard), vec![5, 20]);

        // The destination now carries the successor's key.
        let root = unsafe { tree.root.load(Ordering::Acquire, guard).deref() };
        let dest = unsafe { root.right.load(Ordering::Acquire, guard).deref() };
        assert_eq!(unsafe { *dest.key.load(Ordering::Acquire, guard).deref() }, 20);
    }

    #[test]
    fn duplicate_add_rejected() {
        let tree = HJBSTree::new();
        let guard = &pin();
        assert!(tree.add(7, guard));
        assert!(!tree.add(7, guard));
        assert_eq!(keys(&tree, guard), vec![7]);
    }

    #[test]
    fn relocation_with_deep_successor() {
        let tree = HJBSTree::new();
        let guard = &pin();
        for k in [50, 30, 80, 70, 90, 60, 65, 20] {
            assert!(tree.add(k, guard));
        }
        assert!(tree.remove(&50, guard));
        assert_eq!(keys(&tree, guard), vec![20, 30, 60, 65, 70, 80, 90]);
        assert!(tree.remove(&60, guard));
        assert!(tree.remove(&30, guard));
        assert_eq!(keys(&tree, guard), vec![20, 65, 70, 80, 90]);
        for k in [20, 65, 70, 80, 90] {
            assert!(tree.remove(&k, guard));
        }
        assert!(keys(&tree, guard).is_empty());
        assert!(tree.add(50, guard));
        assert_eq!(keys(&tree, guard), vec![50]);
    }

    #[test]
    fn child_cas_helper_is_idempotent() {
        let tree = HJBSTree::new();
        let guard = &pin();
        for k in [10, 20, 5] {
            assert!(tree.add(k, guard));
        }
        assert!(tree.remove(&10, guard));

        let root = tree.root.load(Ordering::Acquire, guard);
        let dest = unsafe { root.deref() }.right.load(Ordering::Acquire, guard);
        let dest_ref = unsafe { dest.deref() };
        let op = dest_ref.op.load(Ordering::Acquire, guard);
        assert_eq!(state(op), OpTag::NONE);
        let (left, right) = (
            dest_ref.left.load(Ordering::Acquire, guard),
            dest_ref.right.load(Ordering::Acquire, guard),
        );

        // Replaying the finished splice leaves everything as it was.
        tree.help_child_cas(op, dest, guard);
        tree.help_child_cas(op, dest, guard);
        tree.help(root, Shared::null(), dest, op, guard);
        assert_eq!(dest_ref.op.load(Ordering::Acquire, guard), op);
        assert_eq!(dest_ref.left.load(Ordering::Acquire, guard), left);
        assert_eq!(dest_ref.right.load(Ordering::Acquire, guard), right);
        assert_eq!(keys(&tree, guard), vec![5, 20]);
    }

    #[test]
    fn relocate_helper_is_idempotent() {
        let tree = HJBSTree::new();
        let guard = &pin();
        for k in [50, 30, 80, 70, 90, 60] {
            assert!(tree.add(k, guard));
        }

        // 60 is the successor of 50 and the left child of 70.
        let root = tree.root.load(Ordering::Acquire, guard);
        let dest = unsafe { root.deref() }.right.load(Ordering::Acquire, guard);
        let dest_ref = unsafe { dest.deref() };
        let n80 = dest_ref.right.load(Ordering::Acquire, guard);
        let n70 = unsafe { n80.deref() }.left.load(Ordering::Acquire, guard);
        let n70_ref = unsafe { n70.deref() };
        let n70_op = n70_ref.op.load(Ordering::Acquire, guard);
        let n60 = n70_ref.left.load(Ordering::Acquire, guard);
        assert_eq!(unsafe { *n60.deref().key.load(Ordering::Acquire, guard).deref() }, 60);

        assert!(tree.remove(&50, guard));
        let before = keys(&tree, guard);
        assert_eq!(before, vec![30, 60, 70, 80, 90]);

        let op = dest_ref.op.load(Ordering::Acquire, guard);
        assert_eq!(state(op), OpTag::NONE);
        let n70_children = (
            n70_ref.left.load(Ordering::Acquire, guard),
            n70_ref.right.load(Ordering::Acquire, guard),
        );

        // Successor side, destination side, then through the dispatcher.
        assert!(tree.help_relocate(op, n70, n70_op, n60, guard));
        assert!(tree.help_relocate(op, root, Shared::null(), dest, guard));
        tree.help(n70, n70_op, n60, op.with_tag(OpTag::RELOCATE.bits()), guard);
        let n60_op = unsafe { n60.deref() }.op.load(Ordering::Acquire, guard);
        assert_eq!(state(n60_op), OpTag::MARK);
        tree.help(n70, n70_op, n60, n60_op, guard);

        assert_eq!(dest_ref.op.load(Ordering::Acquire, guard), op);
        assert_eq!(unsafe { *dest_ref.key.load(Ordering::Acquire, guard).deref() }, 60);
        assert_eq!(n70_ref.left.load(Ordering::Acquire, guard), n70_children.0);
        assert_eq!(n70_ref.right.load(Ordering::Acquire, guard), n70_children.1);
        assert_eq!(keys(&tree, guard), before);
        assert!(!tree.contains(&50, guard));
        for k in before {
            assert!(tree.contains(&k, guard));
        }
    }

    #[test]
    fn racing_duplicate_adds() {
        for _ in 0..100 {
            let tree = &HJBSTree::new();
            let wins = thread::scope(|s| {
                let handles: Vec<_> = (0..2)
                    .map(|_| s.spawn(move |_| tree.add(7, &pin())))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|won| *won)
                    .count()
            })
            .unwrap();
            assert_eq!(wins, 1);
            assert!(tree.contains(&7, &pin()));
        }
    }

    #[test]
    fn concurrent_relocations_keep_order() {
        let tree = &HJBSTree::new();
        {
            let guard = &pin();
            for k in 0..512 {
                assert!(tree.add((k * 37) % 512, guard));
            }
        }
        thread::scope(|s| {
            for t in 0..8 {
                s.spawn(move |_| {
                    for k in (t..512).step_by(8) {
                        if k % 3 != 0 {
                            assert!(tree.remove(&k, &pin()));
                        }
                    }
                });
            }
        })
        .unwrap();

        let guard = &pin();
        let expected: Vec<i32> = (0..512).filter(|k| k % 3 == 0).collect();
        assert_eq!(keys(tree, guard), expected);
    }
}
