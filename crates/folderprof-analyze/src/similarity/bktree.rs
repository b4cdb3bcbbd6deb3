//! BK-tree over 64-bit hashes under Hamming distance.

#[derive(Debug, Clone)]
struct Node {
    hash: u64,
    item: usize,
    /// (distance to this node, child node index)
    children: Vec<(u32, usize)>,
}

/// Metric tree stored in a flat node array.
#[derive(Debug, Clone, Default)]
pub struct BkTree {
    nodes: Vec<Node>,
}

fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

impl BkTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert `hash`, tagged with the caller's `item` index.
    pub fn insert(&mut self, hash: u64, item: usize) {
        let new_index = self.nodes.len();
        self.nodes.push(Node {
            hash,
            item,
            children: Vec::new(),
        });
        if new_index == 0 {
            return;
        }

        let mut current = 0;
        loop {
            let distance = hamming(self.nodes[current].hash, hash);
            let next = self.nodes[current]
                .children
                .iter()
                .find(|(d, _)| *d == distance)
                .map(|&(_, child)| child);
            match next {
                Some(child) => current = child,
                None => {
                    self.nodes[current].children.push((distance, new_index));
                    return;
                }
            }
        }
    }

    /// Items within `max_distance` of `hash`, as (item, distance), in item order.
    pub fn find_within(&self, hash: u64, max_distance: u32) -> Vec<(usize, u32)> {
        let mut found = Vec::new();
        if self.nodes.is_empty() {
            return found;
        }

        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let distance = hamming(node.hash, hash);
            if distance <= max_distance {
                found.push((node.item, distance));
            }
            let low = distance.saturating_sub(max_distance);
            let high = distance + max_distance;
            stack.extend(
                node.children
                    .iter()
                    .filter(|(d, _)| (low..=high).contains(d))
                    .map(|&(_, child)| child),
            );
        }
        found.sort_unstable();
        found
    }
}
