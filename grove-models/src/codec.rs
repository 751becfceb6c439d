//! Model Codec
//! ---
//!
//! Fixed little-endian binary layout for trees and forests.  Integers are
//! 4 bytes, floats 8, booleans 1.
//!
//! ```text
//! tree    := max_depth:i32 min_samples_split:i32 histogram:bool max_bins:i32 node
//! node    := exists:bool                      (false: absent, nothing follows)
//!            is_leaf:bool feature:i32 threshold:f64 class:i32 node node
//! forest  := n_trees:i32 max_depth:i32 min_samples_split:i32 max_bins:i32 tree*
//! ```
//!
//! Leaves store feature `-1` and two absent children; internal nodes store
//! their majority class.  An unfitted tree is a lone absent root.
use std::io::{Read, Write};

use log::{debug, info};

use grove_core::model::SerDe;
use grove_core::{ModelError, Result};

use crate::params::{FeatureSubset, ForestParams, SplitMode, TreeParams, MAX_BINS, MAX_DEPTH};
use crate::trees::base::LEAF;
use crate::trees::{DecisionTree, Node, RandomForest};

fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<()> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_bool<W: Write>(w: &mut W, v: bool) -> Result<()> {
    write_u8(w, v as u8)
}

fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64<W: Write>(w: &mut W, v: f64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(ModelError::from_read)?;
    Ok(buf[0])
}

fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(ModelError::corrupt(format!("invalid bool byte {}", b))),
    }
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(ModelError::from_read)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(ModelError::from_read)?;
    Ok(f64::from_le_bytes(buf))
}

/// Reads a count that must be non-negative
fn read_count<R: Read>(r: &mut R, what: &str) -> Result<usize> {
    let v = read_i32(r)?;
    if v < 0 {
        return Err(ModelError::corrupt(format!("negative {}: {}", what, v)));
    }
    Ok(v as usize)
}

fn to_i32(what: &str, v: usize) -> Result<i32> {
    if v > i32::max_value() as usize {
        return Err(ModelError::InvalidParams(format!(
            "{} = {} does not fit in a 32-bit field",
            what, v
        )));
    }
    Ok(v as i32)
}

fn read_max_bins<R: Read>(r: &mut R) -> Result<usize> {
    let max_bins = read_count(r, "max_bins")?;
    if max_bins < 2 || max_bins > MAX_BINS {
        return Err(ModelError::corrupt(format!("max_bins out of range: {}", max_bins)));
    }
    Ok(max_bins)
}

fn write_node<W: Write>(w: &mut W, node: Option<&Node>) -> Result<()> {
    let node = match node {
        Some(node) => node,
        None => return write_bool(w, false),
    };
    write_bool(w, true)?;
    match node {
        Node::Leaf { class } => {
            write_bool(w, true)?;
            write_i32(w, LEAF)?;
            write_f64(w, 0.)?;
            write_i32(w, to_i32("class", *class as usize)?)?;
            write_node(w, None)?;
            write_node(w, None)
        }
        Node::Internal {
            feature,
            threshold,
            majority,
            left,
            right,
        } => {
            write_bool(w, false)?;
            write_i32(w, to_i32("feature index", *feature)?)?;
            write_f64(w, *threshold)?;
            write_i32(w, to_i32("class", *majority as usize)?)?;
            write_node(w, Some(left))?;
            write_node(w, Some(right))
        }
    }
}

fn read_max_depth<R: Read>(r: &mut R) -> Result<usize> {
    let max_depth = read_count(r, "max_depth")?;
    if max_depth > MAX_DEPTH {
        return Err(ModelError::corrupt(format!("max_depth out of range: {}", max_depth)));
    }
    Ok(max_depth)
}

/// Reads one node at `depth`; nodes deeper than `max_depth` are rejected
fn read_node<R: Read>(r: &mut R, depth: usize, max_depth: usize) -> Result<Option<Node>> {
    if !read_bool(r)? {
        return Ok(None);
    }
    if depth > max_depth {
        return Err(ModelError::corrupt(format!(
            "node at depth {} exceeds max_depth {}",
            depth, max_depth
        )));
    }

    let is_leaf = read_bool(r)?;
    let feature = read_i32(r)?;
    let threshold = read_f64(r)?;
    let class = read_count(r, "class")? as u32;
    let left = read_node(r, depth + 1, max_depth)?;
    let right = read_node(r, depth + 1, max_depth)?;

    if is_leaf {
        if feature != LEAF {
            return Err(ModelError::corrupt(format!("leaf with feature index {}", feature)));
        }
        if left.is_some() || right.is_some() {
            return Err(ModelError::corrupt("leaf with children"));
        }
        return Ok(Some(Node::leaf(class)));
    }
    if feature < 0 {
        return Err(ModelError::corrupt(format!("invalid feature index {}", feature)));
    }
    match (left, right) {
        (Some(left), Some(right)) => Ok(Some(Node::internal(
            feature as usize,
            threshold,
            class,
            left,
            right,
        ))),
        _ => Err(ModelError::corrupt("internal node missing a child")),
    }
}

impl SerDe for DecisionTree {
    fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let params = self.params();
        params.validate()?;
        write_i32(writer, to_i32("max_depth", params.max_depth)?)?;
        write_i32(writer, to_i32("min_samples_split", params.min_samples_split)?)?;
        write_bool(writer, params.split_mode == SplitMode::Histogram)?;
        write_i32(writer, to_i32("max_bins", params.max_bins)?)?;
        write_node(writer, self.root())
    }

    fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let max_depth = read_max_depth(reader)?;
        let min_samples_split = read_count(reader, "min_samples_split")?;
        let split_mode = if read_bool(reader)? {
            SplitMode::Histogram
        } else {
            SplitMode::Exact
        };
        let max_bins = read_max_bins(reader)?;
        let root = read_node(reader, 0, max_depth)?;

        let params = TreeParams {
            max_depth: max_depth,
            min_samples_split: min_samples_split,
            split_mode: split_mode,
            max_bins: max_bins,
            feature_subset: FeatureSubset::All,
        };
        let tree = DecisionTree::from_root(params, root);
        debug!("loaded tree with {} nodes", tree.n_nodes());
        Ok(tree)
    }
}

impl SerDe for RandomForest {
    fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        self.params().validate()?;
        let params = &self.params().tree;
        write_i32(writer, to_i32("n_trees", self.n_trees())?)?;
        write_i32(writer, to_i32("max_depth", params.max_depth)?)?;
        write_i32(writer, to_i32("min_samples_split", params.min_samples_split)?)?;
        write_i32(writer, to_i32("max_bins", params.max_bins)?)?;
        for tree in self.trees() {
            tree.save(writer)?;
        }
        Ok(())
    }

    fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let n_trees = read_count(reader, "n_trees")?;
        if n_trees == 0 {
            return Err(ModelError::corrupt("forest without trees"));
        }
        let max_depth = read_max_depth(reader)?;
        let min_samples_split = read_count(reader, "min_samples_split")?;
        let max_bins = read_max_bins(reader)?;

        // Capacity is a hint; the count itself is untrusted
        let mut trees = Vec::with_capacity(n_trees.min(1024));
        let mut split_mode = None;
        for i in 0..n_trees {
            let tree = DecisionTree::load(reader)?;
            let p = tree.params();
            if p.max_depth != max_depth
                || p.min_samples_split != min_samples_split
                || p.max_bins != max_bins
                || split_mode.map_or(false, |m| m != p.split_mode)
            {
                return Err(ModelError::corrupt(format!(
                    "tree {} header disagrees with forest header",
                    i
                )));
            }
            if !tree.is_fitted() {
                return Err(ModelError::corrupt(format!("tree {} has no root", i)));
            }
            split_mode = Some(p.split_mode);
            trees.push(tree);
        }

        let params = ForestParams {
            n_trees: n_trees,
            tree: TreeParams {
                max_depth: max_depth,
                min_samples_split: min_samples_split,
                split_mode: split_mode.unwrap_or(SplitMode::Exact),
                max_bins: max_bins,
                feature_subset: FeatureSubset::Sqrt,
            },
            parallel: false,
        };
        info!("loaded forest with {} trees", trees.len());
        Ok(RandomForest::from_trees(params, trees))
    }
}

#[cfg(test)]
mod codec_tests {
    use super::*;
    use grove_core::model::sampler::seeded;
    use grove_data::SampleMatrix;
    use rand::Rng;
    use std::io::Cursor;

    fn data(n: usize, seed: u64) -> (SampleMatrix, Vec<u32>) {
        let mut prng = seeded(seed);
        let mut rows = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let row: Vec<f64> = (0..5).map(|_| prng.gen::<f64>() * 4.).collect();
            y.push(((row[0] + row[3]) as u32 + (row[2] > 2.) as u32) % 3);
            rows.push(row);
        }
        (SampleMatrix::from_rows(&rows).unwrap(), y)
    }

    fn trained_tree(mode: SplitMode) -> DecisionTree {
        let (x, y) = data(300, 1);
        let mut tree = DecisionTree::new(TreeParams {
            max_depth: 7,
            min_samples_split: 2,
            split_mode: mode,
            max_bins: 64,
            feature_subset: FeatureSubset::All,
        });
        tree.fit(&x, &y, &mut seeded(2)).unwrap();
        tree
    }

    fn trained_forest() -> RandomForest {
        let (x, y) = data(300, 3);
        let mut forest = RandomForest::new(ForestParams {
            n_trees: 6,
            tree: TreeParams {
                max_depth: 6,
                min_samples_split: 3,
                split_mode: SplitMode::Histogram,
                max_bins: 40,
                feature_subset: FeatureSubset::Sqrt,
            },
            parallel: false,
        });
        forest.fit(&x, &y, &mut seeded(4)).unwrap();
        forest
    }

    fn to_bytes<S: SerDe>(model: &S) -> Vec<u8> {
        let mut buf = Vec::new();
        model.save(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_leaf_layout() {
        let tree = DecisionTree::from_root(TreeParams::default(), Some(Node::leaf(2)));
        let bytes = to_bytes(&tree);

        let mut expected = Vec::new();
        expected.extend_from_slice(&5i32.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.push(0);
        expected.extend_from_slice(&255i32.to_le_bytes());
        expected.extend_from_slice(&[1, 1]);
        expected.extend_from_slice(&(-1i32).to_le_bytes());
        expected.extend_from_slice(&0f64.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&[0, 0]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_tree_round_trip() {
        let (test_x, _) = data(200, 9);
        for &mode in &[SplitMode::Exact, SplitMode::Histogram] {
            let tree = trained_tree(mode);
            let bytes = to_bytes(&tree);
            let mut loaded = DecisionTree::load(&mut Cursor::new(&bytes)).unwrap();

            assert_eq!(loaded.root(), tree.root());
            assert_eq!(loaded.params().split_mode, mode);
            assert_eq!(loaded.predict(&test_x).unwrap(), tree.predict(&test_x).unwrap());

            loaded.flatten().unwrap();
            assert_eq!(loaded.predict(&test_x).unwrap(), tree.predict(&test_x).unwrap());
            assert_eq!(to_bytes(&loaded), bytes);
        }
    }

    #[test]
    fn test_unfitted_tree_round_trip() {
        let tree = DecisionTree::new(TreeParams::default());
        let bytes = to_bytes(&tree);
        assert_eq!(bytes.len(), 4 + 4 + 1 + 4 + 1);
        let loaded = DecisionTree::load(&mut Cursor::new(&bytes)).unwrap();
        assert!(!loaded.is_fitted());
        assert_eq!(loaded.params(), tree.params());
    }

    #[test]
    fn test_forest_round_trip() {
        let forest = trained_forest();
        let (test_x, _) = data(150, 10);
        let bytes = to_bytes(&forest);
        let mut loaded = RandomForest::load(&mut Cursor::new(&bytes)).unwrap();

        assert_eq!(loaded.n_trees(), 6);
        assert_eq!(loaded.params().tree.split_mode, SplitMode::Histogram);
        assert_eq!(loaded.params().tree.max_bins, 40);
        let expected = forest.predict(&test_x).unwrap();
        assert_eq!(loaded.predict(&test_x).unwrap(), expected);
        loaded.flatten().unwrap();
        assert_eq!(loaded.predict(&test_x).unwrap(), expected);
        assert_eq!(to_bytes(&loaded), bytes);
    }

    #[test]
    fn test_file_round_trip() {
        let forest = trained_forest();
        let (test_x, _) = data(50, 11);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.bin");

        forest.save_file(&path).unwrap();
        let loaded = RandomForest::load_file(&path).unwrap();
        assert_eq!(loaded.predict(&test_x).unwrap(), forest.predict(&test_x).unwrap());

        let tree = trained_tree(SplitMode::Exact);
        let path = dir.path().join("tree.bin");
        tree.save_file(&path).unwrap();
        assert_eq!(DecisionTree::load_file(&path).unwrap().root(), tree.root());
    }

    #[test]
    fn test_trailing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.bin");
        let mut bytes = to_bytes(&trained_forest());
        bytes.push(0);
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            RandomForest::load_file(&path),
            Err(ModelError::CorruptModel(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DecisionTree::load_file(dir.path().join("absent.bin")),
            Err(ModelError::Io(_))
        ));
    }

    #[test]
    fn test_truncated_streams() {
        let bytes = to_bytes(&trained_forest());
        for &len in &[0, 3, 16, 17, 30, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                matches!(
                    RandomForest::load(&mut Cursor::new(&bytes[..len])),
                    Err(ModelError::CorruptModel(_))
                ),
                "length {}",
                len
            );
        }
    }

    #[test]
    fn test_corrupt_nodes() {
        let base = to_bytes(&DecisionTree::from_root(
            TreeParams::default(),
            Some(Node::leaf(1)),
        ));
        let load = |bytes: &[u8]| DecisionTree::load(&mut Cursor::new(bytes));

        // Root exists byte is at offset 13
        let mut bad_bool = base.clone();
        bad_bool[13] = 7;
        assert!(matches!(load(&bad_bool[..]), Err(ModelError::CorruptModel(_))));

        // Leaf followed by a child
        let mut with_child = base[..base.len() - 2].to_vec();
        with_child.extend_from_slice(&base[13..]);
        with_child.push(0);
        assert!(matches!(load(&with_child[..]), Err(ModelError::CorruptModel(_))));

        // Internal node with an absent right child
        let mut missing = base[..13].to_vec();
        missing.extend_from_slice(&[1, 0]);
        missing.extend_from_slice(&0i32.to_le_bytes());
        missing.extend_from_slice(&0.5f64.to_le_bytes());
        missing.extend_from_slice(&0i32.to_le_bytes());
        missing.extend_from_slice(&base[13..]);
        missing.push(0);
        assert!(matches!(load(&missing[..]), Err(ModelError::CorruptModel(_))));

        // Negative class
        let mut negative = base.clone();
        negative[27..31].copy_from_slice(&(-3i32).to_le_bytes());
        assert!(matches!(load(&negative[..]), Err(ModelError::CorruptModel(_))));

        // Leaf records must carry the leaf marker as feature index
        for &feature in &[0i32, 3, -2] {
            let mut marked = base.clone();
            marked[15..19].copy_from_slice(&feature.to_le_bytes());
            assert!(matches!(load(&marked[..]), Err(ModelError::CorruptModel(_))));
        }
        assert!(load(&base[..]).is_ok());
    }

    #[test]
    fn test_depth_limit() {
        // A chain exactly as deep as the limit survives a round trip
        let mut node = Node::leaf(0);
        for d in 0..MAX_DEPTH {
            node = Node::internal(0, d as f64, 0, node, Node::leaf(1));
        }
        let params = TreeParams {
            max_depth: MAX_DEPTH,
            ..TreeParams::default()
        };
        let tree = DecisionTree::from_root(params, Some(node));
        assert_eq!(tree.depth(), MAX_DEPTH);
        let mut bytes = to_bytes(&tree);
        let loaded = DecisionTree::load(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(loaded.root(), tree.root());

        // A header beyond the limit is rejected before any node is read
        bytes[..4].copy_from_slice(&(MAX_DEPTH as i32 + 1).to_le_bytes());
        assert!(matches!(
            DecisionTree::load(&mut Cursor::new(&bytes)),
            Err(ModelError::CorruptModel(_))
        ));

        // Such a tree is never written either
        let deep = DecisionTree::new(TreeParams {
            max_depth: MAX_DEPTH + 1,
            ..TreeParams::default()
        });
        let mut buf = Vec::new();
        assert!(matches!(deep.save(&mut buf), Err(ModelError::InvalidParams(_))));
    }

    #[test]
    fn test_deep_training_round_trip() {
        // Alternating labels along one feature need one level per sample
        let rows: Vec<Vec<f64>> = (0..600).map(|i| vec![i as f64]).collect();
        let x = SampleMatrix::from_rows(&rows).unwrap();
        let y: Vec<u32> = (0..600).map(|i| i % 2).collect();

        let mut tree = DecisionTree::new(TreeParams {
            max_depth: 100_000,
            min_samples_split: 2,
            ..TreeParams::default()
        });
        assert!(matches!(
            tree.fit(&x, &y, &mut seeded(1)),
            Err(ModelError::InvalidParams(_))
        ));
        assert!(!tree.is_fitted());

        let mut tree = DecisionTree::new(TreeParams {
            max_depth: MAX_DEPTH,
            min_samples_split: 2,
            ..TreeParams::default()
        });
        tree.fit(&x, &y, &mut seeded(1)).unwrap();
        assert!(tree.depth() <= MAX_DEPTH);
        assert_eq!(tree.predict(&x).unwrap(), y);

        let loaded = DecisionTree::load(&mut Cursor::new(&to_bytes(&tree))).unwrap();
        assert_eq!(loaded.root(), tree.root());
        assert_eq!(loaded.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_node_deeper_than_header() {
        let tree = trained_tree(SplitMode::Exact);
        assert!(tree.depth() > 1);
        let mut bytes = to_bytes(&tree);
        bytes[..4].copy_from_slice(&1i32.to_le_bytes());
        assert!(matches!(
            DecisionTree::load(&mut Cursor::new(&bytes)),
            Err(ModelError::CorruptModel(_))
        ));
    }

    #[test]
    fn test_forest_header_mismatch() {
        let mut bytes = to_bytes(&trained_forest());

        // Claiming more trees than the stream holds
        let mut more = bytes.clone();
        more[..4].copy_from_slice(&7i32.to_le_bytes());
        assert!(matches!(
            RandomForest::load(&mut Cursor::new(&more)),
            Err(ModelError::CorruptModel(_))
        ));

        let mut none = bytes.clone();
        none[..4].copy_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            RandomForest::load(&mut Cursor::new(&none)),
            Err(ModelError::CorruptModel(_))
        ));

        // Forest min_samples_split disagreeing with its trees
        bytes[8..12].copy_from_slice(&9i32.to_le_bytes());
        assert!(matches!(
            RandomForest::load(&mut Cursor::new(&bytes)),
            Err(ModelError::CorruptModel(_))
        ));
    }

    #[test]
    fn test_unfitted_forest_is_not_saved() {
        let forest = RandomForest::new(ForestParams::default());
        let mut buf = Vec::new();
        assert!(matches!(forest.save(&mut buf), Err(ModelError::NotFitted)));
    }
}
