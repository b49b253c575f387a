//! Merge-tree construction and code lookup.
//!
//! # Algorithm
//!
//! 1. One leaf per byte value with a non-zero count
//! 2. Pop the two lightest nodes; the first becomes the left child and the
//!    second the right child of a new internal node carrying their summed weight
//! 3. Repeat until a single node, the root, remains
//!
//! # Tie-Breaking
//!
//! Nodes are ordered by `(weight, sequence)`. Leaves take their byte value as
//! sequence number and merged nodes take 256, 257, ... in creation order, so
//! the same frequencies always produce the same tree.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::bitio::BitBuffer;
use crate::error::ArgumentError;

/// Number of distinct byte values.
pub const ALPHABET_SIZE: usize = 256;

/// Occurrence count per byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; ALPHABET_SIZE],
}

impl FrequencyTable {
    /// Count every byte of `data` in one pass.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::default();
        for &byte in data {
            table.counts[byte as usize] += 1;
        }
        table
    }

    /// Build a table directly from counts.
    ///
    /// Merged weights saturate at `u64::MAX`, so counts near that limit still
    /// build a valid tree, though not necessarily an optimal one.
    pub fn from_counts(counts: [u64; ALPHABET_SIZE]) -> Self {
        Self { counts }
    }

    /// Occurrences of `byte`.
    pub fn count(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Number of byte values with a non-zero count.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&count| count > 0).count()
    }

    /// Sum of all counts, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }

    /// `(byte, count)` pairs with a non-zero count, in byte order.
    pub fn present(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(byte, &count)| (byte as u8, count))
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self {
            counts: [0; ALPHABET_SIZE],
        }
    }
}

/// A node of the prefix tree. Parents own their children exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(u8),
    Internal { left: Box<Node>, right: Box<Node> },
}

impl Node {
    /// Internal node owning `left` and `right`.
    pub fn internal(left: Node, right: Node) -> Self {
        Node::Internal {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// True for `Node::Leaf`.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

/// A complete prefix tree with at least one leaf.
///
/// Trees from `TreeBuilder` and `serializer::deserialize` hold each byte in at
/// most one leaf. Trees assembled by hand through `Tree::new` are not checked
/// until `validate` is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    root: Node,
}

impl Tree {
    /// Wrap `root` without checking it.
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// Root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Check that no byte value appears in two leaves.
    ///
    /// With distinct leaves there are at most 256 of them, so the height is
    /// at most 255 and the serialized form always deserializes.
    ///
    /// # Errors
    /// Returns `ArgumentError::DuplicateLeaf` for the first repeated byte in
    /// pre-order.
    pub fn validate(&self) -> std::result::Result<(), ArgumentError> {
        let mut seen = [false; ALPHABET_SIZE];
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf(byte) => {
                    if std::mem::replace(&mut seen[*byte as usize], true) {
                        return Err(ArgumentError::DuplicateLeaf(*byte));
                    }
                }
                Node::Internal { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        Ok(())
    }

    /// Code for `byte`: `0` per left descent, `1` per right descent.
    ///
    /// A tree that is a single leaf gives that leaf the one-bit code `0`.
    /// Returns `None` if no leaf holds `byte`.
    pub fn code(&self, byte: u8) -> Option<BitBuffer> {
        if let Node::Leaf(only) = self.root {
            return (only == byte).then(|| std::iter::once(false).collect());
        }
        let mut path = BitBuffer::new();
        find_path(&self.root, byte, &mut path).then_some(path)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf(_) => count += 1,
                Node::Internal { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        count
    }

    /// Edges on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack = vec![(&self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            match node {
                Node::Leaf(_) => height = height.max(depth),
                Node::Internal { left, right } => {
                    stack.push((left.as_ref(), depth + 1));
                    stack.push((right.as_ref(), depth + 1));
                }
            }
        }
        height
    }
}

fn find_path(node: &Node, byte: u8, path: &mut BitBuffer) -> bool {
    match node {
        Node::Leaf(value) => *value == byte,
        Node::Internal { left, right } => {
            for (bit, child) in [(false, left), (true, right)] {
                path.push_bit(bit);
                if find_path(child, byte, path) {
                    return true;
                }
                path.pop_bit();
            }
            false
        }
    }
}

/// Byte value to code mapping, filled one entry at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    entries: Vec<Option<BitBuffer>>,
}

impl CodeTable {
    /// Empty table with a slot per byte value.
    pub fn new() -> Self {
        Self {
            entries: vec![None; ALPHABET_SIZE],
        }
    }

    /// Cached code for `byte`, if one has been stored.
    pub fn get(&self, byte: u8) -> Option<&BitBuffer> {
        self.entries[byte as usize].as_ref()
    }

    /// Cached code for `byte`, computing and storing it on first use.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        byte: u8,
        compute: impl FnOnce() -> std::result::Result<BitBuffer, E>,
    ) -> std::result::Result<&BitBuffer, E> {
        let entry = &mut self.entries[byte as usize];
        let code = match entry.take() {
            Some(code) => code,
            None => compute()?,
        };
        let code: &BitBuffer = entry.insert(code);
        Ok(code)
    }

    /// Drop every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|entry| *entry = None);
    }

    /// Number of cached codes.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Node plus the bookkeeping used only while merging.
#[derive(Debug)]
struct Weighted {
    weight: u64,
    sequence: usize,
    node: Node,
}

impl Ord for Weighted {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.weight, self.sequence).cmp(&(other.weight, other.sequence))
    }
}

impl PartialOrd for Weighted {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Weighted {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Weighted {}

/// Runs the merge algorithm over a frequency table.
pub struct TreeBuilder;

impl TreeBuilder {
    /// Build the merge tree, or `None` when every count is zero.
    pub fn build(frequencies: &FrequencyTable) -> Option<Tree> {
        let mut heap: BinaryHeap<Reverse<Weighted>> = frequencies
            .present()
            .map(|(byte, count)| {
                Reverse(Weighted {
                    weight: count,
                    sequence: byte as usize,
                    node: Node::Leaf(byte),
                })
            })
            .collect();

        let mut next_sequence = ALPHABET_SIZE;
        loop {
            let Reverse(first) = heap.pop()?;
            let Some(Reverse(second)) = heap.pop() else {
                return Some(Tree::new(first.node));
            };

            heap.push(Reverse(Weighted {
                weight: first.weight.saturating_add(second.weight),
                sequence: next_sequence,
                node: Node::internal(first.node, second.node),
            }));
            next_sequence += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes_of(tree: &Tree, frequencies: &FrequencyTable) -> Vec<Vec<bool>> {
        frequencies
            .present()
            .map(|(byte, _)| tree.code(byte).unwrap().iter().collect())
            .collect()
    }

    fn code_string(tree: &Tree, byte: u8) -> String {
        tree.code(byte)
            .unwrap()
            .iter()
            .map(|bit| if bit { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn test_frequency_table() {
        let table = FrequencyTable::from_bytes(b"aaabbc");
        assert_eq!(table.count(b'a'), 3);
        assert_eq!(table.count(b'b'), 2);
        assert_eq!(table.count(b'c'), 1);
        assert_eq!(table.count(b'z'), 0);
        assert_eq!(table.distinct(), 3);
        assert_eq!(table.total(), 6);
        assert_eq!(
            table.present().collect::<Vec<_>>(),
            vec![(b'a', 3), (b'b', 2), (b'c', 1)]
        );
    }

    #[test]
    fn test_empty_table_builds_nothing() {
        assert!(TreeBuilder::build(&FrequencyTable::default()).is_none());
    }

    #[test]
    fn test_worked_example_shape() {
        let tree = TreeBuilder::build(&FrequencyTable::from_bytes(b"aaabbc")).unwrap();

        // c(1) and b(2) merge first; a(3) wins the tie against the merged node.
        let expected = Node::internal(
            Node::Leaf(b'a'),
            Node::internal(Node::Leaf(b'c'), Node::Leaf(b'b')),
        );
        assert_eq!(tree.root(), &expected);
        assert_eq!(code_string(&tree, b'a'), "0");
        assert_eq!(code_string(&tree, b'c'), "10");
        assert_eq!(code_string(&tree, b'b'), "11");
        assert!(tree.code(b'z').is_none());
    }

    #[test]
    fn test_single_symbol_gets_one_bit_code() {
        let tree = TreeBuilder::build(&FrequencyTable::from_bytes(b"xxxx")).unwrap();
        assert_eq!(tree.root(), &Node::Leaf(b'x'));
        assert_eq!(code_string(&tree, b'x'), "0");
        assert_eq!(tree.code(b'x').map(|code| code.len()), Some(1));
        assert_eq!(tree.height(), 0);
    }

    #[test]
    fn test_weighted_length_is_optimal() {
        // Frequencies from the OpenDSA Huffman chapter; the optimal
        // weighted path length is 785 whatever ties are chosen.
        let mut counts = [0u64; ALPHABET_SIZE];
        for (ch, count) in [
            (b'C', 32),
            (b'D', 42),
            (b'E', 120),
            (b'K', 7),
            (b'L', 42),
            (b'M', 24),
            (b'U', 37),
            (b'Z', 2),
        ] {
            counts[ch as usize] = count;
        }
        let table = FrequencyTable::from_counts(counts);
        let tree = TreeBuilder::build(&table).unwrap();

        let weighted: u64 = table
            .present()
            .map(|(byte, count)| count * tree.code(byte).unwrap().len() as u64)
            .sum();
        assert_eq!(weighted, 785);
        assert_eq!(tree.code(b'E').unwrap().len(), 1);
        assert_eq!(tree.leaf_count(), 8);
    }

    #[test]
    fn test_codes_are_prefix_free() {
        let data: Vec<u8> = (0..=255u8)
            .flat_map(|byte| std::iter::repeat(byte).take(byte as usize % 17 + 1))
            .collect();
        let frequencies = FrequencyTable::from_bytes(&data);
        let tree = TreeBuilder::build(&frequencies).unwrap();
        let codes = codes_of(&tree, &frequencies);
        assert_eq!(codes.len(), 256);
        assert_eq!(tree.leaf_count(), 256);

        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a), "code {i} is a prefix of code {j}");
                }
            }
        }
    }

    #[test]
    fn test_code_table_caches_once() {
        let tree = TreeBuilder::build(&FrequencyTable::from_bytes(b"mississippi")).unwrap();
        let mut table = CodeTable::new();
        assert!(table.is_empty());

        let mut calls = 0;
        for &byte in b"ssss" {
            let code = table
                .get_or_try_insert_with(byte, || {
                    calls += 1;
                    tree.code(byte).ok_or(ArgumentError::MissingCode(byte))
                })
                .unwrap();
            assert_eq!(Some(code), tree.code(byte).as_ref());
        }
        assert_eq!(calls, 1);
        assert_eq!(table.len(), 1);

        let missing = table.get_or_try_insert_with(b'z', || {
            tree.code(b'z').ok_or(ArgumentError::MissingCode(b'z'))
        });
        assert_eq!(missing, Err(ArgumentError::MissingCode(b'z')));
        assert!(table.get(b'z').is_none());

        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn test_validate_accepts_built_trees() {
        let data: Vec<u8> = (0..=255).collect();
        let tree = TreeBuilder::build(&FrequencyTable::from_bytes(&data)).unwrap();
        assert_eq!(tree.validate(), Ok(()));
        assert_eq!(Tree::new(Node::Leaf(7)).validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_repeated_byte() {
        let tree = Tree::new(Node::internal(
            Node::Leaf(b'q'),
            Node::internal(Node::Leaf(b'r'), Node::Leaf(b'q')),
        ));
        assert_eq!(tree.validate(), Err(ArgumentError::DuplicateLeaf(b'q')));
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let mut counts = [0u64; ALPHABET_SIZE];
        counts[0] = u64::MAX;
        counts[1] = u64::MAX;
        counts[2] = 1;
        let table = FrequencyTable::from_counts(counts);
        assert_eq!(table.total(), u64::MAX);

        let tree = TreeBuilder::build(&table).unwrap();
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.validate(), Ok(()));
    }

    #[test]
    fn test_build_is_deterministic() {
        let table = FrequencyTable::from_bytes(b"abcdefgh abcd ab a");
        assert_eq!(TreeBuilder::build(&table), TreeBuilder::build(&table));
    }

    #[test]
    fn test_skewed_counts_reach_full_depth() {
        // Fibonacci weights force a chain: every merge takes the previous root.
        let mut counts = [0u64; ALPHABET_SIZE];
        let (mut a, mut b) = (1u64, 1u64);
        for count in counts.iter_mut().take(40) {
            *count = a;
            (a, b) = (b, a + b);
        }
        let tree = TreeBuilder::build(&FrequencyTable::from_counts(counts)).unwrap();
        assert_eq!(tree.height(), 39);
        assert_eq!(tree.leaf_count(), 40);
    }
}
