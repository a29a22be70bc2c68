//! Index-to-path codec.
//!
//! A record index is consumed `leaf_depth` bits at a time from the least
//! significant end. The first chunk is the record's position inside its
//! leaf directory (the on-disk basename is the full decimal index, so the
//! chunk itself never appears in the path). The next `tree_depth` chunks
//! name the directory levels, reversed so the most significant bits pick
//! the outermost directory.
//!
//! That ordering is what makes growth cheap: every index addressable at a
//! smaller depth has zeros in all the chunks a larger depth adds, so the
//! whole existing tree becomes the all-zero subtree of the deeper one.

/// Largest permitted `leaf_depth`; keeps chunk masks and leaf capacity
/// comfortably inside `u64`.
pub const MAX_LEAF_DEPTH: u32 = 32;

/// Split `index` into `tree_depth` directory segments, outermost first.
pub fn decompose(index: u64, leaf_depth: u32, tree_depth: u32) -> Vec<u64> {
    debug_assert!((1..=MAX_LEAF_DEPTH).contains(&leaf_depth));
    let mask = (1u64 << leaf_depth) - 1;
    // Drop the leaf-offset chunk; it is encoded by the basename.
    let mut value = index >> leaf_depth;
    let mut segments = Vec::with_capacity(tree_depth as usize);
    for _ in 0..tree_depth {
        segments.push(value & mask);
        value >>= leaf_depth;
    }
    segments.reverse();
    segments
}

/// Position of `index` inside its leaf directory.
pub fn leaf_offset(index: u64, leaf_depth: u32) -> u64 {
    index & ((1u64 << leaf_depth) - 1)
}

/// Bits needed to address `count` records: `ceil(log2(count))`, zero for
/// zero or one record.
pub fn bits_for(count: u64) -> u32 {
    if count <= 1 {
        0
    } else {
        64 - (count - 1).leading_zeros()
    }
}

/// Tree depth required to hold `count` records at the given `leaf_depth`.
///
/// One level of the address space is always held in reserve, so a store
/// never sits exactly at capacity and the outermost directory of a full
/// tree is still `0`.
pub fn required_depth(count: u64, leaf_depth: u32) -> u32 {
    bits_for(count).div_ceil(leaf_depth) + 1
}
