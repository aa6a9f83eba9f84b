//! Parent/child process hierarchy and subtree expansion.
//!
//! Used to filter a raw enumeration down to a requested subtree: the tree
//! is a parent-id to child-ids index, and `expand` computes the set of
//! processes reachable from a seed of requested ids.

use ahash::{AHashMap as HashMap, AHashSet as HashSet};

use crate::general::ProcessMap;

/// Parent-id to child-ids index.
pub type ProcessTree = HashMap<u32, Vec<u32>>;

/// Builds the parent to children index from a flat process map. A process
/// absent from the map is simply not indexed as anyone's child.
pub fn build_tree(processes: &ProcessMap) -> ProcessTree {
    let mut tree = ProcessTree::default();

    for (pid, general) in processes {
        tree.entry(general.parent_process_id).or_default().push(*pid);
    }

    tree
}

/// Expands `seeds` into the full set of reachable ids: every seed plus all
/// of its descendants. Ids already visited are not expanded again, so the
/// walk terminates even on degenerate hierarchies (pid reuse, cycles in
/// malformed data) and repeated calls yield the same set.
pub fn expand(seeds: &[u32], tree: &ProcessTree) -> HashSet<u32> {
    let mut selected = HashSet::default();
    let mut pending: Vec<u32> = seeds.to_vec();

    while let Some(pid) = pending.pop() {
        if selected.insert(pid) {
            if let Some(children) = tree.get(&pid) {
                pending.extend(children);
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::general::General;

    fn process(process_id: u32, parent_process_id: u32) -> General {
        General {
            process_id,
            parent_process_id,
            process_group_id: process_id,
            processor_utilization: 0.0,
            virtual_size: 0,
            resident_size: 0,
            processor_time: 0.0,
            elapsed_time: 0.0,
            command: String::new(),
            memory: None,
        }
    }

    /// A -> [B, C], B -> [D].
    fn fixture() -> ProcessMap {
        let mut processes = ProcessMap::default();
        for (pid, ppid) in [(1, 0), (2, 1), (3, 1), (4, 2)] {
            processes.insert(pid, process(pid, ppid));
        }
        processes
    }

    #[test]
    fn test_build_tree() {
        let tree = build_tree(&fixture());

        let mut children = tree[&1].clone();
        children.sort_unstable();
        assert_eq!(children, vec![2, 3]);
        assert_eq!(tree[&2], vec![4]);
        assert!(!tree.contains_key(&3));
        assert!(!tree.contains_key(&4));
    }

    #[test]
    fn test_expand_root_reaches_all_descendants() {
        let tree = build_tree(&fixture());
        let selected = expand(&[1], &tree);

        assert_eq!(selected, HashSet::from_iter([1, 2, 3, 4]));
    }

    #[test]
    fn test_expand_leaf_is_just_the_seed() {
        let tree = build_tree(&fixture());
        assert_eq!(expand(&[3], &tree), HashSet::from_iter([3]));
    }

    #[test]
    fn test_expand_unknown_seed_is_included() {
        let tree = build_tree(&fixture());
        assert_eq!(expand(&[99], &tree), HashSet::from_iter([99]));
    }

    #[test]
    fn test_expand_is_idempotent() {
        let tree = build_tree(&fixture());
        let first = expand(&[1, 2], &tree);
        let second = expand(&[1, 2], &tree);

        assert_eq!(first, second);
    }

    #[test]
    fn test_expand_terminates_on_cycles() {
        // Malformed hierarchy: 5 and 6 claim each other as parent.
        let mut processes = fixture();
        processes.insert(5, process(5, 6));
        processes.insert(6, process(6, 5));

        let tree = build_tree(&processes);
        let selected = expand(&[5], &tree);

        assert_eq!(selected, HashSet::from_iter([5, 6]));
    }
}
