pub mod concurrent_set;
pub mod ellen_tree;
pub mod howley_tree;

pub use self::concurrent_set::ConcurrentSet;
pub use self::ellen_tree::EFRBTree;
pub use self::howley_tree::HJBSTree;
