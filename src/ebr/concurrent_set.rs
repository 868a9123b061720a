use crossbeam_epoch::Guard;

/// A set that any number of threads may call concurrently without external locking.
///
/// Each call runs to a definite outcome: `add` is `false` iff the key was already
/// present and `remove` is `false` iff it was absent.
pub trait ConcurrentSet<K> {
    fn new() -> Self;
    fn contains(&self, key: &K, guard: &Guard) -> bool;
    fn add(&self, key: K, guard: &Guard) -> bool;
    fn remove(&self, key: &K, guard: &Guard) -> bool;
}
