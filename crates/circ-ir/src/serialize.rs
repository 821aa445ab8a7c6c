use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::circuit::{Circuit, OpId, Operation};
use crate::op::OpKind;

/// Failure to read or write the serialized circuit format.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("malformed circuit document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node {node} references out-of-range operand {operand}")]
    BadOperandIndex { node: u32, operand: u32 },
    #[error("root index {0} is out of range")]
    BadRootIndex(u32),
    #[error("root index {0} does not name a Root operation")]
    RootKindMismatch(u32),
    #[error("unsupported pointer width {0}")]
    BadPointerWidth(u32),
}

/// On-disk document. Nodes are stored densely in id order; reverse user
/// links are derived, so only operand links are persisted.
#[derive(Serialize, Deserialize)]
struct CircuitDoc {
    ptr_size: u32,
    root: u32,
    nodes: Vec<NodeDoc>,
}

#[derive(Serialize, Deserialize)]
struct NodeDoc {
    kind: OpKind,
    size: u32,
    operands: Vec<u32>,
}

impl Circuit {
    /// Serializes the live nodes to JSON. Ids are compacted, so a
    /// round-tripped circuit is isomorphic but not id-identical.
    pub fn to_json<W: io::Write>(&self, w: W) -> Result<(), SerializeError> {
        let live: Vec<OpId> = self.ids().collect();
        let remap = |id: OpId| -> u32 {
            live.binary_search(&id)
                .expect("operand references a removed node") as u32
        };
        let nodes = live
            .iter()
            .map(|&id| NodeDoc {
                kind: self.kind(id).clone(),
                size: self.size(id),
                operands: self.operands(id).iter().map(|&o| remap(o)).collect(),
            })
            .collect();
        let doc = CircuitDoc {
            ptr_size: self.ptr_size(),
            root: remap(self.root()),
            nodes,
        };
        serde_json::to_writer_pretty(w, &doc)?;
        Ok(())
    }

    pub fn from_json<R: io::Read>(r: R) -> Result<Circuit, SerializeError> {
        let doc: CircuitDoc = serde_json::from_reader(r)?;
        if doc.ptr_size != 32 && doc.ptr_size != 64 {
            return Err(SerializeError::BadPointerWidth(doc.ptr_size));
        }
        let count = doc.nodes.len() as u32;
        if doc.root >= count {
            return Err(SerializeError::BadRootIndex(doc.root));
        }
        if !matches!(doc.nodes[doc.root as usize].kind, OpKind::Root) {
            return Err(SerializeError::RootKindMismatch(doc.root));
        }

        let mut slots: Vec<Option<Operation>> = doc
            .nodes
            .iter()
            .map(|n| {
                Some(Operation {
                    kind: n.kind.clone(),
                    size: n.size,
                    operands: n.operands.iter().map(|&o| OpId(o)).collect(),
                    users: Vec::new(),
                })
            })
            .collect();

        // Rebuild reverse user links, validating operand ranges as we go.
        for (i, node) in doc.nodes.iter().enumerate() {
            for &o in &node.operands {
                if o >= count {
                    return Err(SerializeError::BadOperandIndex {
                        node: i as u32,
                        operand: o,
                    });
                }
                slots[o as usize]
                    .as_mut()
                    .expect("slots are all live at load time")
                    .users
                    .push(OpId(i as u32));
            }
        }

        Ok(Circuit::from_parts(doc.ptr_size, slots, OpId(doc.root)))
    }
}
