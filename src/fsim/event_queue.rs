//! Levelized event queue for incremental propagation.
//!
//! One bucket per structural level, drained from the lowest non-empty
//! level up, with a per-node "scheduled" flag so a node is never queued
//! twice in the same pass. Level buckets are used here instead of a
//! heap keyed directly on node id because a transition fault's two
//! time-frame view reuses node ids across frames; the level is computed
//! with respect to that view rather than the raw id.

use crate::netlist::NodeId;

#[derive(Debug)]
pub struct EventQueue {
    levels: Vec<Vec<NodeId>>,
    scheduled: Vec<bool>,
    cursor: usize,
}

impl EventQueue {
    /// `nb_nodes` sizes the scheduled-flag table; `nb_levels` the bucket
    /// array (one more than the netlist's maximum level).
    pub fn new(nb_nodes: usize, nb_levels: usize) -> EventQueue {
        EventQueue {
            levels: vec![Vec::new(); nb_levels + 1],
            scheduled: vec![false; nb_nodes],
            cursor: 0,
        }
    }

    pub fn put(&mut self, node: NodeId, level: u32) {
        if self.scheduled[node.index()] {
            return;
        }
        self.scheduled[node.index()] = true;
        self.levels[level as usize].push(node);
        if (level as usize) < self.cursor {
            self.cursor = level as usize;
        }
    }

    pub fn get(&mut self) -> Option<NodeId> {
        while self.cursor < self.levels.len() {
            if let Some(node) = self.levels[self.cursor].pop() {
                self.scheduled[node.index()] = false;
                return Some(node);
            }
            self.cursor += 1;
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.cursor >= self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drains_non_decreasing_level() {
        let mut q = EventQueue::new(4, 5);
        q.put(NodeId(3), 3);
        q.put(NodeId(1), 1);
        q.put(NodeId(2), 1);
        assert_eq!(q.get(), Some(NodeId(2)));
        assert_eq!(q.get(), Some(NodeId(1)));
        assert_eq!(q.get(), Some(NodeId(3)));
        assert_eq!(q.get(), None);
    }

    #[test]
    fn test_dedups_within_pass() {
        let mut q = EventQueue::new(2, 2);
        q.put(NodeId(0), 0);
        q.put(NodeId(0), 0);
        assert_eq!(q.get(), Some(NodeId(0)));
        assert_eq!(q.get(), None);
    }
}
