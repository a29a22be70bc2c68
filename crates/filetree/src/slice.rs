//! Lazy range views over a store.
//!
//! A [`TreeSlice`] only remembers the raw `start`/`stop`/`step` it was
//! built with. Bounds are resolved against the store's length when an
//! iterator is made, so a slice can be held, restarted, and iterated
//! several times, and each pass sees the store as it is then. Records are
//! fetched one at a time through [`crate::FileTree::get`]; nothing is
//! prefetched.

use crate::entry::TreeEntry;
use crate::error::Result;
use crate::tree::FileTree;

/// A slice of a store's index range. Built by [`FileTree::slice`].
///
/// Bound semantics follow sequence slicing conventions: negative values
/// count from the end, out-of-range bounds clamp, and a negative step
/// walks backwards with defaults swapped accordingly.
#[derive(Clone, Copy, Debug)]
pub struct TreeSlice<'t> {
    tree: &'t FileTree,
    start: Option<i64>,
    stop: Option<i64>,
    step: i64,
}

impl<'t> TreeSlice<'t> {
    /// `step` is checked by [`FileTree::slice`] before this runs.
    pub(crate) fn new(
        tree: &'t FileTree,
        start: Option<i64>,
        stop: Option<i64>,
        step: i64,
    ) -> Self {
        debug_assert!(step != 0);
        Self {
            tree,
            start,
            stop,
            step,
        }
    }

    /// Record indices this slice covers, resolved against the store's
    /// current length.
    pub fn indices(&self) -> IndexIter {
        let (start, count) = resolve(self.start, self.stop, self.step, self.tree.len());
        IndexIter {
            next: start,
            step: self.step,
            remaining: count,
        }
    }

    /// Fresh entry iterator over the slice.
    pub fn iter(&self) -> SliceIter<'t> {
        SliceIter {
            tree: self.tree,
            indices: self.indices(),
        }
    }
}

impl<'a, 't> IntoIterator for &'a TreeSlice<'t> {
    type Item = Result<TreeEntry>;
    type IntoIter = SliceIter<'t>;

    fn into_iter(self) -> SliceIter<'t> {
        self.iter()
    }
}

/// Iterator over the record indices of a slice.
#[derive(Clone, Debug)]
pub struct IndexIter {
    next: i64,
    step: i64,
    remaining: u64,
}

impl Iterator for IndexIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.next;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.next += self.step;
        }
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for IndexIter {}

/// Iterator over the record entries of a slice.
#[derive(Debug)]
pub struct SliceIter<'t> {
    tree: &'t FileTree,
    indices: IndexIter,
}

impl Iterator for SliceIter<'_> {
    type Item = Result<TreeEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        Some(self.tree.get(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl ExactSizeIterator for SliceIter<'_> {}

/// Resolve raw bounds to a concrete `(first index, count)` pair.
fn resolve(start: Option<i64>, stop: Option<i64>, step: i64, len: u64) -> (i64, u64) {
    debug_assert!(step != 0);
    // Record counts beyond i64 are not addressable through this API.
    let len = len as i64;
    let (default_start, default_stop) = if step > 0 { (0, len) } else { (len - 1, -1) };
    let adjust = |bound: Option<i64>, default: i64| match bound {
        None => default,
        Some(mut value) => {
            if value < 0 {
                value += len;
            }
            if value < 0 {
                if step < 0 {
                    -1
                } else {
                    0
                }
            } else if value >= len {
                if step < 0 {
                    len - 1
                } else {
                    len
                }
            } else {
                value
            }
        }
    };
    let start = adjust(start, default_start);
    let stop = adjust(stop, default_stop);
    let count = if step > 0 {
        if start >= stop {
            0
        } else {
            ((stop - start - 1) / step + 1) as u64
        }
    } else if start <= stop {
        0
    } else {
        ((start - stop - 1) / (-step) + 1) as u64
    };
    (start, count)
}

// ---- tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FileFormat;
    use crate::tree::{FileTree, TreeOptions};
    use crate::value::{Map, Payload};

    fn collect(start: Option<i64>, stop: Option<i64>, step: i64, len: u64) -> Vec<i64> {
        let (first, count) = resolve(start, stop, step, len);
        IndexIter {
            next: first,
            step,
            remaining: count,
        }
        .collect()
    }

    #[test]
    fn resolves_like_sequence_slicing() {
        assert_eq!(collect(None, None, 1, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(collect(Some(1), Some(4), 1, 5), vec![1, 2, 3]);
        assert_eq!(collect(Some(0), Some(3), 2, 5), vec![0, 2]);
        assert_eq!(collect(None, None, -1, 5), vec![4, 3, 2, 1, 0]);
        assert_eq!(collect(None, None, -2, 5), vec![4, 2, 0]);
        assert_eq!(collect(Some(3), Some(1), -1, 5), vec![3, 2]);
    }

    #[test]
    fn negative_bounds_count_from_the_end() {
        assert_eq!(collect(Some(-2), None, 1, 5), vec![3, 4]);
        assert_eq!(collect(None, Some(-3), 1, 5), vec![0, 1]);
        assert_eq!(collect(Some(-1), None, -1, 5), vec![4, 3, 2, 1, 0]);
        assert_eq!(collect(Some(4), Some(-6), -2, 5), vec![4, 2, 0]);
    }

    #[test]
    fn out_of_range_bounds_clamp() {
        assert_eq!(collect(Some(-10), Some(10), 1, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(collect(Some(10), None, 1, 5), Vec::<i64>::new());
        assert_eq!(collect(Some(10), Some(-10), -1, 5), vec![4, 3, 2, 1, 0]);
        assert_eq!(collect(None, Some(-6), -1, 5), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn empty_stores_yield_nothing() {
        assert_eq!(collect(None, None, 1, 0), Vec::<i64>::new());
        assert_eq!(collect(None, None, -1, 0), Vec::<i64>::new());
        assert_eq!(collect(Some(-3), Some(3), 1, 0), Vec::<i64>::new());
    }

    // ---- iteration over a real store ----

    fn store_of(count: u64) -> (tempfile::TempDir, FileTree) {
        let dir = tempfile::tempdir().unwrap();
        let options = TreeOptions {
            leaf_depth: 2,
            tree_depth: 2,
            ..TreeOptions::new(FileFormat::Json)
        };
        let tree = FileTree::create(dir.path(), options).unwrap();
        let entries: Vec<TreeEntry> = (0..count)
            .map(|i| {
                let mut map = Map::new();
                map.insert("i".into(), serde_json::json!(i));
                TreeEntry::new(Payload::Map(map))
            })
            .collect();
        tree.insert(&entries).unwrap();
        (dir, tree)
    }

    fn stored_index(entry: &TreeEntry) -> u64 {
        match entry.payload() {
            Payload::Map(map) => map["i"].as_u64().unwrap(),
            other => panic!("expected a map payload, got {}", other.kind()),
        }
    }

    #[test]
    fn slice_walks_records_lazily() {
        let (_dir, tree) = store_of(10);
        let slice = tree.slice(Some(2), Some(8), 3).unwrap();
        let got: Vec<u64> = slice
            .iter()
            .map(|entry| stored_index(&entry.unwrap()))
            .collect();
        assert_eq!(got, vec![2, 5]);
    }

    #[test]
    fn negative_step_walks_backwards() {
        let (_dir, tree) = store_of(6);
        let slice = tree.slice(None, None, -2).unwrap();
        let got: Vec<u64> = slice
            .iter()
            .map(|entry| stored_index(&entry.unwrap()))
            .collect();
        assert_eq!(got, vec![5, 3, 1]);
    }

    #[test]
    fn slices_restart_from_scratch() {
        let (_dir, tree) = store_of(4);
        let slice = tree.slice(None, Some(2), 1).unwrap();
        let first: Vec<u64> = slice
            .iter()
            .map(|entry| stored_index(&entry.unwrap()))
            .collect();
        let second: Vec<u64> = (&slice)
            .into_iter()
            .map(|entry| stored_index(&entry.unwrap()))
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![0, 1]);
    }

    #[test]
    fn slice_sees_records_appended_after_creation() {
        let (_dir, tree) = store_of(3);
        let slice = tree.slice(None, None, 1).unwrap();
        assert_eq!(slice.iter().count(), 3);

        let mut map = Map::new();
        map.insert("i".into(), serde_json::json!(3));
        tree.insert_one(&TreeEntry::new(Payload::Map(map))).unwrap();
        assert_eq!(slice.iter().count(), 4);
    }

    #[test]
    fn zero_step_is_rejected() {
        let (_dir, tree) = store_of(1);
        assert!(matches!(
            tree.slice(None, None, 0),
            Err(crate::error::TreeError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn indices_name_the_same_records() {
        let (_dir, tree) = store_of(7);
        let slice = tree.slice(Some(1), None, 2).unwrap();
        let indices: Vec<i64> = slice.indices().collect();
        assert_eq!(indices, vec![1, 3, 5]);
        assert_eq!(slice.iter().len(), indices.len());
    }
}
