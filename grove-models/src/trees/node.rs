use grove_core::model::Evaluator;

#[derive(Debug, Clone, PartialEq)]
/// A tree node.  Children are owned by their parent; a tree is its root node.
pub enum Node {
    /// Terminal node
    Leaf {
        /// Class returned for every sample reaching this leaf
        class: u32,
    },
    /// Binary split: samples with `row[feature] <= threshold` go left
    Internal {
        /// Column tested by this node
        feature: usize,
        /// Split value
        threshold: f64,
        /// Majority class of the samples that reached this node
        majority: u32,
        /// Subtree for `row[feature] <= threshold`
        left: Box<Node>,
        /// Subtree for `row[feature] > threshold`
        right: Box<Node>,
    },
}

impl Node {
    /// Returns a leaf predicting `class`
    pub fn leaf(class: u32) -> Self {
        Node::Leaf { class: class }
    }

    /// Returns an internal node over two subtrees
    pub fn internal(feature: usize, threshold: f64, majority: u32, left: Node, right: Node) -> Self {
        Node::Internal {
            feature: feature,
            threshold: threshold,
            majority: majority,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// True for leaves
    pub fn is_leaf(&self) -> bool {
        match self {
            Node::Leaf { .. } => true,
            Node::Internal { .. } => false,
        }
    }

    /// The leaf class, or the majority class for internal nodes
    pub fn predicted_class(&self) -> u32 {
        match *self {
            Node::Leaf { class } => class,
            Node::Internal { majority, .. } => majority,
        }
    }

    /// Walks the tree for one sample.  The row must be at least
    /// `required_features()` wide.
    pub fn predict(&self, row: &[f64]) -> u32 {
        match self {
            Node::Leaf { class } => *class,
            Node::Internal {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }

    /// Length of the longest root-to-leaf path; a lone leaf has depth 0
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Total number of nodes
    pub fn n_nodes(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal { left, right, .. } => 1 + left.n_nodes() + right.n_nodes(),
        }
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Smallest row width the splits can address, `max(feature) + 1`
    pub fn required_features(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal {
                feature,
                left,
                right,
                ..
            } => (feature + 1)
                .max(left.required_features())
                .max(right.required_features()),
        }
    }

    /// Largest class id stored anywhere in the tree
    pub fn max_class(&self) -> u32 {
        match self {
            Node::Leaf { class } => *class,
            Node::Internal {
                majority,
                left,
                right,
                ..
            } => (*majority).max(left.max_class()).max(right.max_class()),
        }
    }
}

impl Evaluator<[f64], u32> for Node {
    #[inline]
    fn evaluate(&self, payload: &[f64]) -> u32 {
        self.predict(payload)
    }
}

#[cfg(test)]
mod node_tests {
    use super::*;

    fn build_tree() -> Node {
        // x0 <= 0.5 ? (x1 <= 0.7 ? 0 : 1) : 2
        Node::internal(
            0,
            0.5,
            2,
            Node::internal(1, 0.7, 0, Node::leaf(0), Node::leaf(1)),
            Node::leaf(2),
        )
    }

    #[test]
    fn test_predict() {
        let tree = build_tree();

        // Should go left then right
        assert_eq!(tree.predict(&[0.4, 0.8]), 1);

        // Should go right
        assert_eq!(tree.predict(&[6., 0.1]), 2);

        // Should go left then left, testing lte
        assert_eq!(tree.predict(&[0.5, 0.7]), 0);
        assert_eq!(tree.evaluate(&[0.5, 0.7][..]), 0);
    }

    #[test]
    fn test_shape() {
        let tree = build_tree();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.required_features(), 2);
        assert_eq!(tree.max_class(), 2);
        assert_eq!(tree.predicted_class(), 2);
        assert!(!tree.is_leaf());

        let leaf = Node::leaf(4);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.depth(), 0);
        assert_eq!(leaf.required_features(), 0);
    }
}
