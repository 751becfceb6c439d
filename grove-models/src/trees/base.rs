use grove_core::model::Evaluator;

use super::node::Node;

/// `feature_index` value marking a leaf record
pub const LEAF: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
/// One fixed-size record of a flattened tree
pub struct FlatNode {
    /// Column tested by this record, `LEAF` for leaves
    pub feature_index: i32,

    /// Split value; unused for leaves
    pub threshold: f64,

    /// Leaf class, or the node's majority class for internal records
    pub predicted_class: u32,

    /// Distance from this record to its right child.  The left child is
    /// always the next record.
    pub right_child_offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
/// We encode trees as a flattened binary tree: one contiguous run of records
/// in pre-order (node, left subtree, right subtree).  Traversal only indexes
/// into the array and takes one branch per level.
pub struct FlatTree {
    nodes: Vec<FlatNode>,
}

impl FlatTree {
    /// Flattens a node graph.  Predictions are unchanged.
    pub fn from_node(root: &Node) -> Self {
        let mut nodes = Vec::with_capacity(root.n_nodes());
        emit(root, &mut nodes);
        FlatTree { nodes: nodes }
    }

    /// Records in pre-order
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true for a flattened tree
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Given a dense row, outputs the class of the leaf it lands in
    pub fn predict(&self, data: &[f64]) -> u32 {
        let mut index = 0usize;
        loop {
            let node = &self.nodes[index];
            if node.feature_index < 0 {
                return node.predicted_class;
            }
            index += if data[node.feature_index as usize] <= node.threshold {
                1
            } else {
                node.right_child_offset as usize
            };
        }
    }

    /// Rebuilds the pointer form
    pub fn to_node(&self) -> Node {
        rebuild(&self.nodes, 0)
    }
}

/// Appends `node` and its subtrees, returning the position it was written at
fn emit(node: &Node, out: &mut Vec<FlatNode>) -> usize {
    let pos = out.len();
    match node {
        Node::Leaf { class } => out.push(FlatNode {
            feature_index: LEAF,
            threshold: 0.,
            predicted_class: *class,
            right_child_offset: 0,
        }),
        Node::Internal {
            feature,
            threshold,
            majority,
            left,
            right,
        } => {
            out.push(FlatNode {
                feature_index: *feature as i32,
                threshold: *threshold,
                predicted_class: *majority,
                right_child_offset: 0,
            });
            emit(left, out);
            let right_pos = emit(right, out);
            out[pos].right_child_offset = (right_pos - pos) as u32;
        }
    }
    pos
}

fn rebuild(nodes: &[FlatNode], pos: usize) -> Node {
    let node = &nodes[pos];
    if node.feature_index < 0 {
        return Node::leaf(node.predicted_class);
    }
    Node::internal(
        node.feature_index as usize,
        node.threshold,
        node.predicted_class,
        rebuild(nodes, pos + 1),
        rebuild(nodes, pos + node.right_child_offset as usize),
    )
}

impl Evaluator<[f64], u32> for FlatTree {
    #[inline]
    fn evaluate(&self, payload: &[f64]) -> u32 {
        self.predict(payload)
    }
}
