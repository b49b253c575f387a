//! Pre-order tree serialization.
//!
//! ```text
//! Leaf:     1 b7 b6 b5 b4 b3 b2 b1 b0   (flag bit, then the byte MSB-first)
//! Internal: 0 <left subtree> <right subtree>
//! ```
//!
//! A tree with `n` leaves takes `10n - 1` bits, so the largest possible
//! serialization (256 leaves) is 2559 bits, or 320 bytes.

use crate::bitio::{BitBuffer, BitReader};
use crate::error::{FormatError, Result};
use crate::huffman::tree::{Node, Tree, ALPHABET_SIZE};

/// Deepest level any merge tree over 256 symbols can reach.
pub const MAX_DEPTH: usize = ALPHABET_SIZE - 1;

/// Largest serialized tree in bytes.
pub const MAX_SERIALIZED_BYTES: usize = (10 * ALPHABET_SIZE - 1).div_ceil(8);

/// Serialize `tree` in pre-order.
pub fn serialize(tree: &Tree) -> BitBuffer {
    let mut bits = BitBuffer::with_capacity(10 * tree.leaf_count());
    write_node(tree.root(), &mut bits);
    bits
}

fn write_node(node: &Node, bits: &mut BitBuffer) {
    match node {
        Node::Leaf(byte) => {
            bits.push_bit(true);
            bits.push_byte(*byte);
        }
        Node::Internal { left, right } => {
            bits.push_bit(false);
            write_node(left, bits);
            write_node(right, bits);
        }
    }
}

/// Rebuild a tree from its serialized bits.
///
/// An empty bit sequence stands for "no tree" (empty input) and yields `None`.
///
/// # Errors
/// - `FormatError::TruncatedTree` if the bits end before the tree is complete
/// - `FormatError::TrailingTreeBits` if bits remain after the root is complete
/// - `FormatError::DuplicateSymbol` if a byte value appears in two leaves
/// - `FormatError::TreeTooDeep` if nesting exceeds `MAX_DEPTH`
pub fn deserialize(bits: &BitBuffer) -> Result<Option<Tree>> {
    if bits.is_empty() {
        return Ok(None);
    }

    let mut parser = Parser {
        reader: bits.reader(),
        seen: [false; ALPHABET_SIZE],
    };
    let root = parser.node(0)?;

    let remaining = parser.reader.bits_remaining();
    if remaining > 0 {
        return Err(FormatError::TrailingTreeBits { remaining }.into());
    }
    Ok(Some(Tree::new(root)))
}

struct Parser<'a> {
    reader: BitReader<'a>,
    seen: [bool; ALPHABET_SIZE],
}

impl Parser<'_> {
    fn node(&mut self, depth: usize) -> Result<Node> {
        if depth > MAX_DEPTH {
            return Err(FormatError::TreeTooDeep { max: MAX_DEPTH }.into());
        }

        if self.bit()? {
            let byte = self.byte()?;
            if std::mem::replace(&mut self.seen[byte as usize], true) {
                return Err(FormatError::DuplicateSymbol(byte).into());
            }
            return Ok(Node::Leaf(byte));
        }

        let left = self.node(depth + 1)?;
        let right = self.node(depth + 1)?;
        Ok(Node::internal(left, right))
    }

    fn bit(&mut self) -> Result<bool> {
        let position = self.reader.position();
        self.reader
            .read_bit()
            .map_err(|_| FormatError::TruncatedTree { position }.into())
    }

    fn byte(&mut self) -> Result<u8> {
        let position = self.reader.position();
        self.reader
            .read_byte()
            .map_err(|_| FormatError::TruncatedTree { position }.into())
    }
}
