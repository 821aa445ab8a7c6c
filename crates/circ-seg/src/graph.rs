use std::collections::{HashMap, HashSet};

use circ_ir::OpId;

/// Arena index of a [`SegNode`] inside its [`SegGraph`]. Ascending id order
/// is insertion order, which the dedup tie-break relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegId(pub(crate) u32);

impl SegId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Resolution of one `Select` operation to one of its value operands,
/// committed by a projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectChoice {
    pub select: OpId,
    pub chosen_index: u32,
}

/// One concrete path through the circuit: the verify context it belongs to,
/// the constraint operation that roots it there, and the select choices
/// resolved along the way (in encounter order).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionProjection {
    pub vi: OpId,
    pub root_in_vi: OpId,
    pub select_choices: Vec<SelectChoice>,
}

/// A shape-normalized syntactic node: ordered children plus book-keeping.
#[derive(Clone, Debug)]
pub struct SegNode {
    /// Human-readable debug tag (`vi_<v>_path<p>_opt<k>_node<n>`).
    pub debug_id: String,
    pub children: Vec<SegId>,
    /// This node is the top of at least one projection.
    pub is_root: bool,
    /// The projections this node is a root for.
    pub valid_for_contexts: Vec<InstructionProjection>,
    /// Cleared when two distinct circuit operations claim this node as
    /// their root shape.
    pub specializable: bool,
    /// Emit this subtree as a standalone function.
    pub fd: bool,
    pub inline_cost: u32,
    pub subtree_count: u32,
}

impl SegNode {
    fn new(debug_id: String) -> Self {
        Self {
            debug_id,
            children: Vec::new(),
            is_root: false,
            valid_for_contexts: Vec::new(),
            specializable: true,
            fd: false,
            inline_cost: 0,
            subtree_count: 0,
        }
    }
}

/// Arena-owned SEG. Nodes removed by dedup leave dead slots behind so
/// surviving ids stay stable.
#[derive(Default)]
pub struct SegGraph {
    pub(crate) slots: Vec<Option<SegNode>>,
    /// Circuit operation attached to each specializable node by
    /// [`SegGraph::specialize`].
    pub(crate) attached: HashMap<SegId, OpId>,
}

impl SegGraph {
    pub(crate) fn create(&mut self, debug_id: String) -> SegId {
        let id = SegId(u32::try_from(self.slots.len()).expect("SEG id space exhausted"));
        self.slots.push(Some(SegNode::new(debug_id)));
        id
    }

    pub fn node(&self, id: SegId) -> &SegNode {
        self.slots[id.index()]
            .as_ref()
            .expect("use of a deduplicated SEG node")
    }

    pub(crate) fn node_mut(&mut self, id: SegId) -> &mut SegNode {
        self.slots[id.index()]
            .as_mut()
            .expect("use of a deduplicated SEG node")
    }

    pub fn is_live(&self, id: SegId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.is_some())
    }

    /// Live node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = SegId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| SegId(i as u32))
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Structural shape fingerprint: child count, a separator, then the
    /// children's hashes. Identity-free on purpose: equal shapes from
    /// unrelated circuit operations hash alike.
    pub fn get_hash(&self, id: SegId) -> String {
        let node = self.node(id);
        let mut out = format!("{}|", node.children.len());
        for &child in &node.children {
            out.push_str(&self.get_hash(child));
        }
        out
    }

    /// Every live node, children before parents, deterministic in insertion
    /// order of the entry points.
    pub fn postorder(&self) -> Vec<SegId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for id in self.ids() {
            self.postorder_rec(id, &mut seen, &mut out);
        }
        out
    }

    fn postorder_rec(&self, id: SegId, seen: &mut HashSet<SegId>, out: &mut Vec<SegId>) {
        if !seen.insert(id) {
            return;
        }
        for i in 0..self.node(id).children.len() {
            self.postorder_rec(self.node(id).children[i], seen, out);
        }
        out.push(id);
    }

    /// Non-unique preorder of one subtree (shared nodes repeat, one visit
    /// per path), for tandem walks against the circuit.
    pub fn preorder(&self, root: SegId) -> Vec<SegId> {
        let mut out = Vec::new();
        self.preorder_rec(root, &mut out);
        out
    }

    fn preorder_rec(&self, id: SegId, out: &mut Vec<SegId>) {
        out.push(id);
        for i in 0..self.node(id).children.len() {
            self.preorder_rec(self.node(id).children[i], out);
        }
    }

    /// All `(projection, root node)` pairs belonging to `vi`, in insertion
    /// order. A verify context with no SEG roots is an invariant violation.
    pub fn get_nodes_by_vi(&self, vi: OpId) -> Vec<(InstructionProjection, SegId)> {
        let mut out = Vec::new();
        for id in self.ids() {
            let node = self.node(id);
            if !node.is_root {
                continue;
            }
            for proj in &node.valid_for_contexts {
                if proj.vi == vi {
                    out.push((proj.clone(), id));
                }
            }
        }
        assert!(
            !out.is_empty(),
            "no SEG roots recorded for verify instruction {}",
            vi.as_u32()
        );
        out
    }
}
