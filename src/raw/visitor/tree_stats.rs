use crate::{
    alloc::NodeAllocator,
    raw::{
        visitor::{LeafContext, NodeContext, Visitor},
        InnerNode16, InnerNode256, InnerNode4, InnerNode48, Leaf, NodeKind, RawTree,
    },
    KeyLoader,
};
use std::fmt;

/// A visitor of the radix tree which collects statistics about the tree, like
/// how many inner nodes of each type, how many leaves
#[derive(Debug)]
pub struct TreeStatsCollector {
    stats: TreeStats,
}

impl TreeStatsCollector {
    /// Run the tree stats collection on the given tree, then return the
    /// accumulated stats.
    pub(crate) fn collect<L: KeyLoader, A: NodeAllocator>(tree: &RawTree<L, A>) -> TreeStats {
        let mut collector = TreeStatsCollector {
            stats: TreeStats::default(),
        };

        tree.visit(&mut collector);

        collector.stats
    }

    fn record_inner_node(&mut self, ctx: NodeContext) {
        let kind = ctx.handle.kind;
        if self.stats.levels.len() <= ctx.level {
            self.stats.levels.resize(ctx.level + 1, LevelStats::default());
        }
        self.stats.levels[ctx.level].node_counts[kind.index()] += 1;
        self.stats.node_counts[kind.index()] += 1;
        self.stats.total_inner_node_bytes += kind.slot_size();
    }
}

impl Visitor for TreeStatsCollector {
    type Output = ();

    fn default_output(&self) -> Self::Output {}

    fn combine_output(&self, _: Self::Output, _: Self::Output) -> Self::Output {}

    fn visit_node4(&mut self, _: &InnerNode4, ctx: NodeContext) -> Self::Output {
        self.record_inner_node(ctx);
    }

    fn visit_node16(&mut self, _: &InnerNode16, ctx: NodeContext) -> Self::Output {
        self.record_inner_node(ctx);
    }

    fn visit_node48(&mut self, _: &InnerNode48, ctx: NodeContext) -> Self::Output {
        self.record_inner_node(ctx);
    }

    fn visit_node256(&mut self, _: &InnerNode256, ctx: NodeContext) -> Self::Output {
        self.record_inner_node(ctx);
    }

    fn visit_leaf(&mut self, leaf: Leaf<'_>, _: &[u8], ctx: LeafContext<'_>) -> Self::Output {
        if self.stats.levels.len() <= ctx.level {
            self.stats.levels.resize(ctx.level + 1, LevelStats::default());
        }
        self.stats.levels[ctx.level].leaf_count += 1;
        self.stats.leaf_count += 1;
        self.stats.row_count += leaf.len();
    }
}

/// Number of nodes found at one level of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelStats {
    node_counts: [usize; NodeKind::ALL.len()],
    leaf_count: usize,
}

impl LevelStats {
    /// Number of inner nodes of the given kind at this level.
    pub fn node_count(&self, kind: NodeKind) -> usize {
        self.node_counts[kind.index()]
    }

    /// Number of leaves at this level.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }
}

/// Collection of stats about the number of nodes types present in a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    node_counts: [usize; NodeKind::ALL.len()],
    levels: Vec<LevelStats>,
    leaf_count: usize,
    row_count: usize,
    total_inner_node_bytes: usize,
}

impl TreeStats {
    /// Number of inner nodes of the given kind present in the tree.
    pub fn node_count(&self, kind: NodeKind) -> usize {
        self.node_counts[kind.index()]
    }

    /// Number of [`InnerNode4`]s present in the tree.
    pub fn node4_count(&self) -> usize {
        self.node_count(NodeKind::Node4)
    }

    /// Number of [`InnerNode16`]s present in the tree.
    pub fn node16_count(&self) -> usize {
        self.node_count(NodeKind::Node16)
    }

    /// Number of [`InnerNode48`]s present in the tree.
    pub fn node48_count(&self) -> usize {
        self.node_count(NodeKind::Node48)
    }

    /// Number of [`InnerNode256`]s present in the tree.
    pub fn node256_count(&self) -> usize {
        self.node_count(NodeKind::Node256)
    }

    /// Number of inner nodes of any kind.
    pub fn inner_node_count(&self) -> usize {
        self.node_counts.iter().sum()
    }

    /// Number of leaves, which is the number of distinct keys.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Number of row ids stored in all leaves.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Bytes used by the reachable inner nodes. Abandoned slots in the arena
    /// are not counted.
    pub fn total_inner_node_bytes(&self) -> usize {
        self.total_inner_node_bytes
    }

    /// Breakdown of the nodes by level, the root being level 0.
    pub fn levels(&self) -> &[LevelStats] {
        &self.levels
    }

    /// Number of levels in the tree, counting the leaf level.
    pub fn height(&self) -> usize {
        self.levels.len()
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Node4: {}, Node16: {}, Node48: {}, Node256: {}, leaves: {}, rows: {}, inner node \
             bytes: {}",
            self.node4_count(),
            self.node16_count(),
            self.node48_count(),
            self.node256_count(),
            self.leaf_count,
            self.row_count,
            self.total_inner_node_bytes
        )?;
        for (level, stats) in self.levels.iter().enumerate() {
            writeln!(
                f,
                "[Level {level}] Node4: {}, Node16: {}, Node48: {}, Node256: {}, leaves: {}",
                stats.node_count(NodeKind::Node4),
                stats.node_count(NodeKind::Node16),
                stats.node_count(NodeKind::Node48),
                stats.node_count(NodeKind::Node256),
                stats.leaf_count
            )?;
        }
        Ok(())
    }
}
