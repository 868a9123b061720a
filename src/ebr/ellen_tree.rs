//! Non-blocking external binary search tree by Ellen, Fatourou, Ruppert and van Breugel.
//!
//! Keys live only in leaves; internal nodes route. An insertion replaces a leaf with a
//! small subtree under an `IFLAG` on the parent, a deletion flags the grandparent
//! (`DFLAG`), marks the parent and splices the leaf's sibling into the grandparent.

use std::sync::atomic::Ordering;

use crossbeam_epoch::{unprotected, Atomic, CompareExchangeError, Guard, Owned, Shared};

use super::concurrent_set::ConcurrentSet;

bitflags! {
    struct UpdateTag: usize {
        const CLEAN = 0usize;
        const DFLAG = 1usize;
        const IFLAG = 2usize;
        const MARK = 3usize;
    }
}

/// Leaf keys. The two infinities are the sentinel leaves every search can end on.
#[derive(Clone, PartialEq, Eq, Ord, Debug)]
pub enum Key<K> {
    Fin(K),
    Inf1,
    Inf2,
}

impl<K> PartialOrd for Key<K>
where
    K: PartialOrd,
{
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Key::Fin(k1), Key::Fin(k2)) => k1.partial_cmp(k2),
            (Key::Fin(_), Key::Inf1) => Some(std::cmp::Ordering::Less),
            (Key::Fin(_), Key::Inf2) => Some(std::cmp::Ordering::Less),
            (Key::Inf1, Key::Fin(_)) => Some(std::cmp::Ordering::Greater),
            (Key::Inf1, Key::Inf1) => Some(std::cmp::Ordering::Equal),
            (Key::Inf1, Key::Inf2) => Some(std::cmp::Ordering::Less),
            (Key::Inf2, Key::Fin(_)) => Some(std::cmp::Ordering::Greater),
            (Key::Inf2, Key::Inf1) => Some(std::cmp::Ordering::Greater),
            (Key::Inf2, Key::Inf2) => Some(std::cmp::Ordering::Equal),
        }
    }
}

impl<K> PartialEq<K> for Key<K>
where
    K: PartialEq,
{
    fn eq(&self, rhs: &K) -> bool {
        match self {
            Key::Fin(k) => k == rhs,
            _ => false,
        }
    }
}

impl<K> Key<K>
where
    K: Ord,
{
    fn cmp(&self, rhs: &K) -> std::cmp::Ordering {
        match self {
            Key::Fin(k) => k.cmp(rhs),
            _ => std::cmp::Ordering::Greater,
        }
    }
}

struct Node<K> {
    key: Key<K>,
    is_leaf: bool,
    // tag on low bits: {Clean, DFlag, IFlag, Mark}
    update: Atomic<Update<K>>,
    left: Atomic<Node<K>>,
    right: Atomic<Node<K>>,
}

enum Update<K> {
    Insert {
        p: Atomic<Node<K>>,
        new_internal: Atomic<Node<K>>,
        leaf: Atomic<Node<K>>,
    },
    Delete {
        gp: Atomic<Node<K>>,
        p: Atomic<Node<K>>,
        l: Atomic<Node<K>>,
        pupdate: Atomic<Update<K>>,
    },
}

impl<K> Node<K> {
    fn internal(key: Key<K>, left: Self, right: Self) -> Self {
        Self {
            key,
            is_leaf: false,
            update: Atomic::null(),
            left: Atomic::new(left),
            right: Atomic::new(right),
        }
    }

    fn leaf(key: Key<K>) -> Self {
        Self {
            key,
            is_leaf: true,
            update: Atomic::null(),
            left: Atomic::null(),
            right: Atomic::null(),
        }
    }
}

struct Cursor<'g, K> {
    gp: Shared<'g, Node<K>>,
    p: Shared<'g, Node<K>>,
    l: Shared<'g, Node<K>>,
    pupdate: Shared<'g, Update<K>>,
    gpupdate: Shared<'g, Update<K>>,
}

impl<'g, K> Cursor<'g, K>
where
    K: Ord,
{
    fn new(root: Shared<'g, Node<K>>) -> Self {
        Self {
            gp: Shared::null(),
            p: Shared::null(),
            l: root,
            pupdate: Shared::null(),
            gpupdate: Shared::null(),
        }
    }

    /// Used by Insert, Delete and Find to traverse a branch of the BST.
    ///
    /// # Postconditions
    ///
    /// 1. l points to a Leaf node and p points to an Internal node
    /// 2. Either p → left has contained l (if k<p → key) or p → right has contained l (if k ≥ p → key)
    /// 3. p → update has contained pupdate
    /// 4. if l → key != Inf1, then the following three statements hold:
    ///     - gp points to an Internal node
    ///     - either gp → left has contained p (if k < gp → key) or gp → right has contained p (if k ≥ gp → key)
    ///     - gp → update has contained gpupdate
    #[inline]
    fn search(&mut self, key: &K, guard: &'g Guard) {
        loop {
            let l_node = unsafe { self.l.deref() };
            if l_node.is_leaf {
                break;
            }
            self.gp = self.p;
            self.p = self.l;
            self.gpupdate = self.pupdate;
            self.pupdate = l_node.update.load(Ordering::Acquire, guard);
            self.l = match l_node.key.cmp(key) {
                std::cmp::Ordering::Greater => l_node.left.load(Ordering::Acquire, guard),
                _ => l_node.right.load(Ordering::Acquire, guard),
            }
        }
    }
}

pub struct EFRBTree<K> {
    root: Atomic<Node<K>>,
}

impl<K> Default for EFRBTree<K>
where
    K: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for EFRBTree<K> {
    fn drop(&mut self) {
        unsafe {
            let root = self
                .root
                .load(Ordering::Relaxed, unprotected())
                .into_owned()
                .into_box();
            let mut stack = vec![
                root.left.load(Ordering::Relaxed, unprotected()),
                root.right.load(Ordering::Relaxed, unprotected()),
            ];

            while let Some(mut node) = stack.pop() {
                if node.is_null() {
                    continue;
                }

                let node_ref = node.deref_mut();

                stack.push(node_ref.left.load(Ordering::Relaxed, unprotected()));
                stack.push(node_ref.right.load(Ordering::Relaxed, unprotected()));
                let update = node_ref.update.load(Ordering::Relaxed, unprotected());
                if !update.is_null() {
                    drop(update.into_owned());
                }
                drop(node.into_owned());
            }
            let update = root.update.load(Ordering::Relaxed, unprotected());
            if !update.is_null() {
                drop(update.into_owned());
            }
        }
    }
}

impl<K> EFRBTree<K>
where
    K: Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            root: Atomic::new(Node::internal(
                Key::Inf2,
                Node::leaf(Key::Inf1),
                Node::leaf(Key::Inf2),
            )),
        }
    }

    /// Never helps: a flagged node on the path still routes correctly.
    pub fn find(&self, key: &K, guard: &Guard) -> bool {
        let mut cursor = Cursor::new(self.root.load(Ordering::Acquire, guard));
        cursor.search(key, guard);
        let l_node = unsafe { cursor.l.deref() };
        l_node.key == *key
    }

    pub fn insert(&self, key: &K, guard: &Guard) -> bool {
        loop {
            let mut cursor = Cursor::new(self.root.load(Ordering::Acquire, guard));
            cursor.search(key, guard);
            let l_node = unsafe { cursor.l.deref() };
            let p_node = unsafe { cursor.p.deref() };

            if l_node.key == *key {
                return false;
            }

            // Validate cursor: Is l a child of p?
            if cursor.l != p_node.left.load(Ordering::Acquire, guard)
                && cursor.l != p_node.right.load(Ordering::Acquire, guard)
            {
                continue;
            }

            if cursor.pupdate.tag() != UpdateTag::CLEAN.bits() {
                self.help(cursor.pupdate, guard);
                continue;
            }

            let new = Node::leaf(Key::Fin(key.clone()));
            let new_sibling = Node::leaf(l_node.key.clone());

            let (left, right) = match new.key.partial_cmp(&new_sibling.key) {
                Some(std::cmp::Ordering::Less) => (new, new_sibling),
                _ => (new_sibling, new),
            };

            let new_internal = Owned::new(Node::internal(
                // key field max(k, l → key)
                right.key.clone(),
                // two child fields equal to new and newSibling
                // (the one with the smaller key is the left child)
                left,
                right,
            ))
            .into_shared(unsafe { unprotected() });

            let op = Update::Insert {
                p: Atomic::from(cursor.p),
                new_internal: Atomic::from(new_internal),
                leaf: Atomic::from(cursor.l),
            };

            let new_pupdate = Owned::new(op)
                .into_shared(unsafe { unprotected() })
                .with_tag(UpdateTag::IFLAG.bits());

            match p_node.update.compare_exchange(
                cursor.pupdate,
                new_pupdate,
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            ) {
                Ok(_) => {
                    if !cursor.pupdate.is_null() {
                        unsafe {
                            guard.defer_destroy(cursor.pupdate);
                        }
                    }
                    self.help_insert(new_pupdate, guard);
                    return true;
                }
                Err(e) => {
                    unsafe {
                        let new_pupdate_failed = new_pupdate.into_owned().into_box();
                        if let Update::Insert { new_internal, .. } = *new_pupdate_failed {
                            let new_internal_failed = new_internal.into_owned().into_box();
                            drop(new_internal_failed.left.into_owned());
                            drop(new_internal_failed.right.into_owned());
                        }
                    }
                    trace_log!("insert: lost the IFLAG race, helping");
                    self.help(e.current, guard);
                }
            }
        }
    }

    pub fn delete(&self, key: &K, guard: &Guard) -> bool {
        loop {
            let mut cursor = Cursor::new(self.root.load(Ordering::Acquire, guard));
            cursor.search(key, guard);

            // Without a grandparent the leaf is Inf1, never a finite key.
            if cursor.gp.is_null() {
                return false;
            }

            let l_node = unsafe { cursor.l.deref() };
            if l_node.key != *key {
                return false;
            }

            let p_node = unsafe { cursor.p.deref() };
            let gp_node = unsafe { cursor.gp.deref() };

            // Validate cursor 1: Is l a child of p?
            if cursor.l != p_node.left.load(Ordering::Acquire, guard)
                && cursor.l != p_node.right.load(Ordering::Acquire, guard)
            {
                continue;
            }
            // Validate cursor 2: Is p a child of gp?
            if cursor.p != gp_node.left.load(Ordering::Acquire, guard)
                && cursor.p != gp_node.right.load(Ordering::Acquire, guard)
            {
                continue;
            }

            if cursor.gpupdate.tag() != UpdateTag::CLEAN.bits() {
                self.help(cursor.gpupdate, guard);
            } else if cursor.pupdate.tag() != UpdateTag::CLEAN.bits() {
                self.help(cursor.pupdate, guard);
            } else {
                let op = Update::Delete {
                    gp: Atomic::from(cursor.gp),
                    p: Atomic::from(cursor.p),
                    l: Atomic::from(cursor.l),
                    pupdate: Atomic::from(cursor.pupdate),
                };
                let new_update = Owned::new(op)
                    .into_shared(unsafe { unprotected() })
                    .with_tag(UpdateTag::DFLAG.bits());
                match gp_node.update.compare_exchange(
                    cursor.gpupdate,
                    new_update,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                    guard,
                ) {
                    Ok(_) => {
                        if !cursor.gpupdate.is_null() {
                            unsafe {
                                guard.defer_destroy(cursor.gpupdate);
                            }
                        }
                        if self.help_delete(new_update, guard) {
                            return true;
                        }
                        trace_log!("delete: parent changed under DFLAG, retrying");
                    }
                    Err(e) => {
                        unsafe { drop(new_update.into_owned()) };
                        trace_log!("delete: lost the DFLAG race, helping");
                        self.help(e.current, guard);
                    }
                }
            }
        }
    }

    fn help<'g>(&'g self, update: Shared<'g, Update<K>>, guard: &'g Guard) {
        match UpdateTag::from_bits_truncate(update.tag()) {
            UpdateTag::IFLAG => self.help_insert(update, guard),
            UpdateTag::MARK => self.help_marked(update, guard),
            UpdateTag::DFLAG => {
                let _ = self.help_delete(update, guard);
            }
            _ => {}
        }
    }

    fn help_delete<'g>(&'g self, op: Shared<'g, Update<K>>, guard: &'g Guard) -> bool {
        // Precondition: op points to a DInfo record (i.e., it is not ⊥)
        let op_ref = unsafe { op.deref() };
        if let Update::Delete { gp, p, pupdate, .. } = op_ref {
            let p_ref = unsafe { p.load(Ordering::Acquire, guard).deref() };
            let pupdate_sh = pupdate.load(Ordering::Acquire, guard);
            let new_op = op.with_tag(UpdateTag::MARK.bits());

            match p_ref.update.compare_exchange(
                pupdate_sh,
                new_op,
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            ) {
                Ok(_) => {
                    if !pupdate_sh.is_null() {
                        unsafe {
                            guard.defer_destroy(pupdate_sh);
                        }
                    }
                    // (prev value) = op → pupdate
                    self.help_marked(new_op, guard);
                    true
                }
                Err(e) => {
                    if e.current == new_op {
                        // (prev value) = <Mark, op>
                        self.help_marked(new_op, guard);
                        true
                    } else {
                        self.help(e.current, guard);
                        let _ = unsafe { gp.load(Ordering::Acquire, guard).deref() }
                            .update
                            .compare_exchange(
                                op.with_tag(UpdateTag::DFLAG.bits()),
                                op.with_tag(UpdateTag::CLEAN.bits()),
                                Ordering::SeqCst,
                                Ordering::SeqCst,
                                guard,
                            );
                        false
                    }
                }
            }
        } else {
            panic!("op is not pointing to a DInfo record")
        }
    }

    fn help_marked<'g>(&'g self, op: Shared<'g, Update<K>>, guard: &'g Guard) {
        // Precondition: op points to a DInfo record (i.e., it is not ⊥)
        let op_ref = unsafe { op.deref() };
        if let Update::Delete { gp, p, l, .. } = op_ref {
            // Set other to point to the sibling of the node to which op → l points
            let gp = gp.load(Ordering::Acquire, guard);
            let p = p.load(Ordering::Acquire, guard);
            let l = l.load(Ordering::Acquire, guard);

            let p_ref = unsafe { p.deref() };
            let other = if p_ref.right.load(Ordering::Acquire, guard) == l {
                &p_ref.left
            } else {
                &p_ref.right
            };
            // Splice the node to which op → p points out of the tree, replacing it by other
            let other_sh = other.load(Ordering::Acquire, guard);

            if self.cas_child(gp, p, other_sh, guard).is_ok() {
                unsafe {
                    guard.defer_destroy(p);
                    guard.defer_destroy(l);
                }
            }
            let _ = unsafe { gp.deref() }.update.compare_exchange(
                op.with_tag(UpdateTag::DFLAG.bits()),
                op.with_tag(UpdateTag::CLEAN.bits()),
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            );
        } else {
            panic!("op is not pointing to a DInfo record")
        }
    }

    fn help_insert<'g>(&'g self, op: Shared<'g, Update<K>>, guard: &'g Guard) {
        // Precondition: op points to an IInfo record (i.e., it is not ⊥)
        let op_ref = unsafe { op.deref() };
        if let Update::Insert {
            p,
            new_internal,
            leaf,
        } = op_ref
        {
            let p = p.load(Ordering::Acquire, guard);
            let new_internal = new_internal.load(Ordering::Acquire, guard);
            let leaf = leaf.load(Ordering::Acquire, guard);

            if self.cas_child(p, leaf, new_internal, guard).is_ok() {
                unsafe {
                    guard.defer_destroy(leaf);
                };
            }
            let p_ref = unsafe { p.deref() };
            let _ = p_ref.update.compare_exchange(
                op.with_tag(UpdateTag::IFLAG.bits()),
                op.with_tag(UpdateTag::CLEAN.bits()),
                Ordering::SeqCst,
                Ordering::SeqCst,
                guard,
            );
        } else {
            panic!("op is not pointing to an IInfo record")
        }
    }

    #[inline]
    fn cas_child<'g>(
        &'g self,
        parent: Shared<'g, Node<K>>,
        old: Shared<'g, Node<K>>,
        new: Shared<'g, Node<K>>,
        guard: &'g Guard,
    ) -> Result<Shared<'g, Node<K>>, CompareExchangeError<'g, Node<K>, Shared<'g, Node<K>>>> {
        // Precondition: parent points to an Internal node and new points to a Node (i.e., neither is ⊥)
        // This routine tries to change one of the child fields of the node that parent points to from old to new.
        let new_node = unsafe { new.deref() };
        let parent_node = unsafe { parent.deref() };
        let node_to_cas = if new_node.key < parent_node.key {
            &parent_node.left
        } else {
            &parent_node.right
        };
        node_to_cas.compare_exchange(old, new, Ordering::SeqCst, Ordering::SeqCst, guard)
    }
}

impl<K> ConcurrentSet<K> for EFRBTree<K>
where
    K: Ord + Clone,
{
    fn new() -> Self {
        EFRBTree::new()
    }

    fn contains(&self, key: &K, guard: &Guard) -> bool {
        self.find(key, guard)
    }

    fn add(&self, key: K, guard: &Guard) -> bool {
        self.insert(&key, guard)
    }

    fn remove(&self, key: &K, guard: &Guard) -> bool {
        self.delete(key, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::{EFRBTree, Key, Node, Update, UpdateTag};
    use crate::ebr::concurrent_set;
    use crossbeam_epoch::{pin, Guard, Shared};
    use crossbeam_utils::thread;
    use std::sync::atomic::Ordering;

    /// In-order keys of the finite leaves. Only meaningful while no operation runs.
    fn leaves<K: Clone>(tree: &EFRBTree<K>, guard: &Guard) -> Vec<K> {
        fn walk<K: Clone>(node: Shared<'_, Node<K>>, guard: &Guard, out: &mut Vec<K>) {
            let node_ref = unsafe { node.deref() };
            if node_ref.is_leaf {
                if let Key::Fin(k) = &node_ref.key {
                    out.push(k.clone());
                }
                return;
            }
            walk(node_ref.left.load(Ordering::Acquire, guard), guard, out);
            walk(node_ref.right.load(Ordering::Acquire, guard), guard, out);
        }

        let mut out = Vec::new();
        walk(tree.root.load(Ordering::Acquire, guard), guard, &mut out);
        out
    }

    #[test]
    fn smoke_efrb_tree() {
        concurrent_set::tests::smoke::<EFRBTree<i32>>();
    }

    #[test]
    fn contended_efrb_tree() {
        concurrent_set::tests::contended::<EFRBTree<i32>>();
    }

    #[test]
    fn insert_keeps_order() {
        let tree = EFRBTree::new();
        let guard = &pin();
        assert!(tree.insert(&10, guard));
        assert!(tree.insert(&20, guard));
        assert!(tree.insert(&5, guard));
        for k in [5, 10, 20] {
            assert!(tree.find(&k, guard));
        }
        assert_eq!(leaves(&tree, guard), vec![5, 10, 20]);
    }

    #[test]
    fn delete_then_absent() {
        let tree = EFRBTree::new();
        let guard = &pin();
        assert!(!tree.delete(&10, guard));
        assert!(tree.insert(&10, guard));
        assert!(tree.delete(&10, guard));
        assert!(!tree.find(&10, guard));
        assert!(!tree.delete(&10, guard));
        assert!(leaves(&tree, guard).is_empty());
    }

    #[test]
    fn delete_inner_key() {
        let tree = EFRBTree::new();
        let guard = &pin();
        for k in [10, 20, 5] {
            assert!(tree.insert(&k, guard));
        }
        assert!(tree.delete(&10, guard));
        assert!(!tree.find(&10, guard));
        assert!(tree.find(&5, guard));
        assert!(tree.find(&20, guard));
        assert!(!tree.insert(&20, guard));
        assert_eq!(leaves(&tree, guard), vec![5, 20]);
    }

    #[test]
    fn insert_helper_is_idempotent() {
        let tree = EFRBTree::new();
        let guard = &pin();
        assert!(tree.insert(&10, guard));

        // 10 < Inf2, so the insertion flagged the root.
        let root = unsafe { tree.root.load(Ordering::Acquire, guard).deref() };
        let update = root.update.load(Ordering::Acquire, guard);
        assert_eq!(update.tag(), UpdateTag::CLEAN.bits());
        let left = root.left.load(Ordering::Acquire, guard);

        tree.help_insert(update.with_tag(UpdateTag::IFLAG.bits()), guard);
        tree.help(update, guard);
        assert_eq!(root.update.load(Ordering::Acquire, guard), update);
        assert_eq!(root.left.load(Ordering::Acquire, guard), left);
        assert_eq!(leaves(&tree, guard), vec![10]);
    }

    #[test]
    fn marked_helper_is_idempotent() {
        let tree = EFRBTree::new();
        let guard = &pin();
        for k in [10, 20, 5] {
            assert!(tree.insert(&k, guard));
        }
        assert!(tree.delete(&5, guard));

        // The deletion's descriptor stays on the grandparent, cleaned.
        let mut node = tree.root.load(Ordering::Acquire, guard);
        let update = loop {
            let node_ref = unsafe { node.deref() };
            let update = node_ref.update.load(Ordering::Acquire, guard);
            if !update.is_null() && matches!(unsafe { update.deref() }, Update::Delete { .. })
            {
                break update;
            }
            node = node_ref.left.load(Ordering::Acquire, guard);
        };
        assert_eq!(update.tag(), UpdateTag::CLEAN.bits());

        tree.help_marked(update.with_tag(UpdateTag::MARK.bits()), guard);
        assert_eq!(leaves(&tree, guard), vec![10, 20]);
        assert!(tree.find(&10, guard));
        assert!(tree.find(&20, guard));
    }

    #[test]
    fn delete_helper_is_idempotent() {
        let tree = EFRBTree::new();
        let guard = &pin();
        for k in [10, 20, 5] {
            assert!(tree.insert(&k, guard));
        }
        assert!(tree.delete(&5, guard));

        let mut gp = tree.root.load(Ordering::Acquire, guard);
        let update = loop {
            let gp_ref = unsafe { gp.deref() };
            let update = gp_ref.update.load(Ordering::Acquire, guard);
            if !update.is_null() && matches!(unsafe { update.deref() }, Update::Delete { .. }) {
                break update;
            }
            gp = gp_ref.left.load(Ordering::Acquire, guard);
        };
        let gp_ref = unsafe { gp.deref() };
        let (left, right) = (
            gp_ref.left.load(Ordering::Acquire, guard),
            gp_ref.right.load(Ordering::Acquire, guard),
        );

        // The parent is still marked with the finished deletion.
        assert!(tree.help_delete(update.with_tag(UpdateTag::DFLAG.bits()), guard));
        tree.help(update.with_tag(UpdateTag::DFLAG.bits()), guard);
        assert_eq!(gp_ref.update.load(Ordering::Acquire, guard), update);
        assert_eq!(gp_ref.left.load(Ordering::Acquire, guard), left);
        assert_eq!(gp_ref.right.load(Ordering::Acquire, guard), right);
        assert_eq!(leaves(&tree, guard), vec![10, 20]);
        assert!(!tree.find(&5, guard));
    }

    #[test]
    fn concurrent_deletes_keep_order() {
        let tree = &EFRBTree::new();
        {
            let guard = &pin();
            for k in 0..512 {
                assert!(tree.insert(&((k * 37) % 512), guard));
            }
        }
        thread::scope(|s| {
            for t in 0..8 {
                s.spawn(move |_| {
                    for k in (t..512).step_by(8) {
                        if k % 3 != 0 {
                            assert!(tree.delete(&k, &pin()));
                        }
                    }
                });
            }
        })
        .unwrap();

        let guard = &pin();
        let expected: Vec<i32> = (0..512).filter(|k| k % 3 == 0).collect();
        assert_eq!(leaves(tree, guard), expected);
    }

    #[test]
    fn racing_duplicate_inserts() {
        for _ in 0..100 {
            let tree = &EFRBTree::new();
            let wins = thread::scope(|s| {
                let handles: Vec<_> = (0..2)
                    .map(|_| s.spawn(move |_| tree.insert(&7, &pin())))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|won| *won)
                    .count()
            })
            .unwrap();
            assert_eq!(wins, 1);
            assert!(tree.find(&7, &pin()));
        }
    }
}
