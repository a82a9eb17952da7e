//! # Comment tree traversal
//!
//! Threads form an n-ary tree through `parent_id`. Storage backends look up
//! children one node at a time (usually with an `await` in between), so the
//! walk is a small state machine driven by the caller instead of a recursive
//! function:
//!
//! ```ignore
//! let mut walk = DescendantWalk::new(root);
//! while let Some(id) = walk.next_pending() {
//!     let children = repo_children(id).await?;
//!     walk.expand(id, children)?;
//! }
//! let descendants = walk.into_descendants();
//! ```
//!
//! Stack depth stays constant and a node reachable twice (a cycle or a shared
//! child in corrupt data) stops the walk with an error.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug)]
pub struct DescendantWalk {
    root: Uuid,
    pending: Vec<Uuid>,
    seen: HashSet<Uuid>,
    descendants: Vec<Uuid>,
}

impl DescendantWalk {
    pub fn new(root: Uuid) -> Self {
        let mut seen = HashSet::new();
        seen.insert(root);
        Self {
            root,
            pending: vec![root],
            seen,
            descendants: Vec::new(),
        }
    }

    /// Next node whose children must be looked up, in depth-first pre-order.
    pub fn next_pending(&mut self) -> Option<Uuid> {
        let id = self.pending.pop()?;
        if id != self.root {
            self.descendants.push(id);
        }
        Some(id)
    }

    /// Record the children of `parent` (in insertion order).
    pub fn expand(&mut self, parent: Uuid, children: Vec<Uuid>) -> Result<()> {
        for child in &children {
            if !self.seen.insert(*child) {
                log::warn!("cycle in comment tree: {} listed again under {}", child, parent);
                return Err(AppError::Internal(format!(
                    "comment tree under {} revisits {} (reached again from {})",
                    self.root, child, parent
                )));
            }
        }
        // Reversed so the first child is popped first.
        self.pending.extend(children.into_iter().rev());
        Ok(())
    }

    /// Every descendant of the root, parents before their replies.
    pub fn into_descendants(self) -> Vec<Uuid> {
        self.descendants
    }
}

/// Runs a full walk against a synchronous children lookup.
pub fn collect_descendants<F>(root: Uuid, mut children_of: F) -> Result<Vec<Uuid>>
where
    F: FnMut(Uuid) -> Result<Vec<Uuid>>,
{
    let mut walk = DescendantWalk::new(root);
    while let Some(id) = walk.next_pending() {
        let children = children_of(id)?;
        walk.expand(id, children)?;
    }
    Ok(walk.into_descendants())
}

/// Order in which a batch of tree nodes can be removed without ever leaving a
/// child pointing at an already-deleted parent: replies first, root last.
pub fn deletion_order(root: Uuid, descendants: &[Uuid]) -> Vec<Uuid> {
    let mut order: Vec<Uuid> = descendants.iter().rev().copied().collect();
    order.push(root);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::now_v7()).collect()
    }

    fn lookup(edges: &HashMap<Uuid, Vec<Uuid>>) -> impl FnMut(Uuid) -> Result<Vec<Uuid>> + '_ {
        move |id| Ok(edges.get(&id).cloned().unwrap_or_default())
    }

    #[test]
    fn leaf_has_no_descendants() {
        let root = Uuid::now_v7();
        let edges = HashMap::new();
        assert!(collect_descendants(root, lookup(&edges)).unwrap().is_empty());
    }

    #[test]
    fn walks_depth_first_preorder() {
        // a -> [b, c], b -> [d], d -> [e]
        let n = ids(5);
        let (a, b, c, d, e) = (n[0], n[1], n[2], n[3], n[4]);
        let edges = HashMap::from([(a, vec![b, c]), (b, vec![d]), (d, vec![e])]);

        let found = collect_descendants(a, lookup(&edges)).unwrap();
        assert_eq!(found, vec![b, d, e, c]);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let chain = ids(10_000);
        let edges: HashMap<Uuid, Vec<Uuid>> =
            chain.windows(2).map(|w| (w[0], vec![w[1]])).collect();

        let found = collect_descendants(chain[0], lookup(&edges)).unwrap();
        assert_eq!(found.len(), chain.len() - 1);
        assert_eq!(found.last(), chain.last());
    }

    #[test]
    fn self_reference_is_rejected() {
        let root = Uuid::now_v7();
        let edges = HashMap::from([(root, vec![root])]);
        let err = collect_descendants(root, lookup(&edges)).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn cycle_below_root_is_rejected() {
        let n = ids(3);
        let edges = HashMap::from([(n[0], vec![n[1]]), (n[1], vec![n[2]]), (n[2], vec![n[1]])]);
        assert!(collect_descendants(n[0], lookup(&edges)).is_err());
    }

    #[test]
    fn deletion_order_puts_replies_before_parents() {
        let n = ids(4);
        let order = deletion_order(n[0], &[n[1], n[2], n[3]]);
        assert_eq!(order, vec![n[3], n[2], n[1], n[0]]);
    }
}
