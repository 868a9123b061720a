//! Lock-free binary search trees.
//!
//! Two helping-based trees live in [`ebr`], both reclaimed with epoch-based
//! reclamation:
//!
//! - [`ebr::HJBSTree`]: keys live in every node; deleting a node with two children
//!   relocates its in-order successor's key into it (Howley and Jones).
//! - [`ebr::EFRBTree`]: keys live only in leaves; deleting removes a leaf together with
//!   its parent (Ellen, Fatourou, Ruppert and van Breugel).
//!
//! Every operation takes a pinned [`crossbeam_epoch::Guard`].

#[macro_use]
extern crate bitflags;

#[macro_use]
mod tracing_helpers;

pub mod ebr;
