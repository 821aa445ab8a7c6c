use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::op::OpKind;

/// Arena index of an [`Operation`] inside its [`Circuit`].
///
/// Ids are stable for the lifetime of the node: slots are never reused, so an
/// id also serves as allocation identity (relevant for `Advice` leaves) and
/// as a deterministic ordering key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpId(pub(crate) u32);

impl OpId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// One node of the circuit DAG.
///
/// Operands are ordered; `users` is the reverse link set with one entry per
/// operand occurrence (a node that uses the same operand twice appears twice
/// in that operand's user list).
#[derive(Clone, Debug)]
pub struct Operation {
    pub kind: OpKind,
    /// Bit-width of the produced value. Essential, never inferred.
    pub size: u32,
    pub(crate) operands: Vec<OpId>,
    pub(crate) users: Vec<OpId>,
}

impl Operation {
    pub fn operands(&self) -> &[OpId] {
        &self.operands
    }

    pub fn users(&self) -> &[OpId] {
        &self.users
    }
}

/// A rooted DAG owning all of its operations.
///
/// The root is reachable from no one; every live node other than the root is
/// expected to be reachable from it once [`Circuit::remove_unused`] has run.
/// Mutation goes through the replace/destroy API so reverse user links stay
/// consistent.
#[derive(Debug)]
pub struct Circuit {
    slots: Vec<Option<Operation>>,
    root: OpId,
    ptr_size: u32,
}

impl Circuit {
    pub fn new(ptr_size: u32) -> Self {
        assert!(
            ptr_size == 32 || ptr_size == 64,
            "unsupported pointer width {ptr_size}"
        );
        let mut c = Self {
            slots: Vec::new(),
            root: OpId(0),
            ptr_size,
        };
        let root = c.create(OpKind::Root, 1);
        c.root = root;
        c
    }

    pub(crate) fn from_parts(ptr_size: u32, slots: Vec<Option<Operation>>, root: OpId) -> Self {
        Self {
            slots,
            root,
            ptr_size,
        }
    }

    pub fn ptr_size(&self) -> u32 {
        self.ptr_size
    }

    pub fn root(&self) -> OpId {
        self.root
    }

    pub fn create(&mut self, kind: OpKind, size: u32) -> OpId {
        let id = OpId(u32::try_from(self.slots.len()).expect("operation id space exhausted"));
        self.slots.push(Some(Operation {
            kind,
            size,
            operands: Vec::new(),
            users: Vec::new(),
        }));
        id
    }

    pub fn is_live(&self, id: OpId) -> bool {
        self.slots.get(id.index()).is_some_and(|s| s.is_some())
    }

    pub fn op(&self, id: OpId) -> &Operation {
        self.slots[id.index()]
            .as_ref()
            .expect("use of a removed operation")
    }

    fn op_mut(&mut self, id: OpId) -> &mut Operation {
        self.slots[id.index()]
            .as_mut()
            .expect("use of a removed operation")
    }

    pub fn kind(&self, id: OpId) -> &OpKind {
        &self.op(id).kind
    }

    pub fn size(&self, id: OpId) -> u32 {
        self.op(id).size
    }

    pub fn operands(&self, id: OpId) -> &[OpId] {
        &self.op(id).operands
    }

    pub fn operand(&self, id: OpId, idx: usize) -> OpId {
        self.op(id).operands[idx]
    }

    pub fn users(&self, id: OpId) -> &[OpId] {
        &self.op(id).users
    }

    /// Index width of a `Select` operation (width of its index operand).
    pub fn select_bits(&self, sel: OpId) -> u32 {
        debug_assert!(matches!(self.kind(sel), OpKind::Select));
        self.size(self.operand(sel, 0))
    }

    /// Stable human-readable handle for emitted source, e.g. `in_EAX_3`,
    /// `add_17`.
    pub fn handle_name(&self, id: OpId) -> String {
        format!("{}_{}", self.kind(id).handle_stem(), id.as_u32())
    }

    /// Live node ids in ascending (creation) order.
    pub fn ids(&self) -> impl Iterator<Item = OpId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| OpId(i as u32))
    }

    /// Live nodes whose kind satisfies `pred`, in creation order.
    pub fn ids_where<'a>(
        &'a self,
        pred: impl Fn(&OpKind) -> bool + 'a,
    ) -> impl Iterator<Item = OpId> + 'a {
        self.ids().filter(move |&id| pred(self.kind(id)))
    }

    pub fn verify_instructions(&self) -> Vec<OpId> {
        self.ids_where(|k| matches!(k, OpKind::VerifyInstruction))
            .collect()
    }

    pub fn find_input_reg(&self, name: &str) -> Option<OpId> {
        self.ids_where(|k| matches!(k, OpKind::InputRegister(r) if r == name))
            .next()
    }

    pub fn find_output_reg(&self, name: &str) -> Option<OpId> {
        self.ids_where(|k| matches!(k, OpKind::OutputRegister(r) if r == name))
            .next()
    }

    pub fn add_operand(&mut self, op: OpId, operand: OpId) {
        self.op_mut(op).operands.push(operand);
        self.op_mut(operand).users.push(op);
    }

    pub fn add_operands(&mut self, op: OpId, operands: &[OpId]) {
        for &o in operands {
            self.add_operand(op, o);
        }
    }

    /// Rewrites operand slot `idx` of `op` to `new`, keeping user lists in
    /// sync.
    pub fn replace_operand(&mut self, op: OpId, idx: usize, new: OpId) {
        let old = self.op(op).operands[idx];
        if old == new {
            return;
        }
        remove_one(&mut self.op_mut(old).users, op);
        self.op_mut(op).operands[idx] = new;
        self.op_mut(new).users.push(op);
    }

    /// Rewrites every use of `old` to `new` across the whole circuit.
    pub fn replace_all_uses_with(&mut self, old: OpId, new: OpId) {
        assert_ne!(old, new, "replace_all_uses_with on itself");
        let users = std::mem::take(&mut self.op_mut(old).users);
        for &user in &users {
            let n = self.op(user).operands.len();
            for idx in 0..n {
                if self.op(user).operands[idx] == old {
                    self.op_mut(user).operands[idx] = new;
                    self.op_mut(new).users.push(user);
                }
            }
        }
    }

    /// Drops every occurrence of `target` from `user`'s operand list.
    pub fn remove_all_operands(&mut self, user: OpId, target: OpId) {
        let before = self.op(user).operands.len();
        self.op_mut(user).operands.retain(|&o| o != target);
        let removed = before - self.op(user).operands.len();
        for _ in 0..removed {
            remove_one(&mut self.op_mut(target).users, user);
        }
    }

    /// Detaches `id` from its operands (it no longer counts as their user).
    ///
    /// Remaining users still reference the node; passes are expected to strip
    /// those references themselves, after which the node is orphaned and gets
    /// reclaimed by [`Circuit::remove_unused`].
    pub fn destroy(&mut self, id: OpId) {
        let operands = std::mem::take(&mut self.op_mut(id).operands);
        for o in operands {
            remove_one(&mut self.op_mut(o).users, id);
        }
    }

    /// Reachability sweep from the root: frees every node the root cannot
    /// reach and purges freed entries from surviving user lists. Idempotent.
    pub fn remove_unused(&mut self) -> usize {
        let reachable = self.reachable_set(self.root);
        let mut removed = 0usize;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !reachable.contains(&OpId(i as u32)) {
                *slot = None;
                removed += 1;
            }
        }
        if removed > 0 {
            for slot in self.slots.iter_mut().flatten() {
                slot.users.retain(|u| reachable.contains(u));
            }
        }
        removed
    }

    fn reachable_set(&self, from: OpId) -> HashSet<OpId> {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            for &o in self.operands(id) {
                if !seen.contains(&o) {
                    stack.push(o);
                }
            }
        }
        seen
    }

    /// Unique preorder walk of the subtree below `from` (deterministic in
    /// operand order; `from` itself is included).
    pub fn preorder_from(&self, from: OpId) -> Vec<OpId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.preorder_rec(from, &mut seen, &mut out);
        out
    }

    fn preorder_rec(&self, id: OpId, seen: &mut HashSet<OpId>, out: &mut Vec<OpId>) {
        if !seen.insert(id) {
            return;
        }
        out.push(id);
        for i in 0..self.operands(id).len() {
            self.preorder_rec(self.operand(id, i), seen, out);
        }
    }

    /// Unique postorder walk (children before parents).
    pub fn postorder_from(&self, from: OpId) -> Vec<OpId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.postorder_rec(from, &mut seen, &mut out);
        out
    }

    fn postorder_rec(&self, id: OpId, seen: &mut HashSet<OpId>, out: &mut Vec<OpId>) {
        if !seen.insert(id) {
            return;
        }
        for i in 0..self.operands(id).len() {
            self.postorder_rec(self.operand(id, i), seen, out);
        }
        out.push(id);
    }
}

fn remove_one(v: &mut Vec<OpId>, target: OpId) {
    if let Some(pos) = v.iter().position(|&x| x == target) {
        v.swap_remove(pos);
    }
}
