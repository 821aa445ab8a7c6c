use std::io;

use crate::circuit::Circuit;
use crate::op::OpKind;

/// Writes the reachable part of the circuit as a GraphViz digraph.
///
/// `highlights` is a list of opcode names (as produced by
/// [`OpKind::name`]); matching nodes are filled red so a specific node
/// family can be spotted in large graphs.
pub fn print_dot<W: io::Write>(w: &mut W, c: &Circuit, highlights: &[String]) -> io::Result<()> {
    writeln!(w, "digraph circuit {{")?;
    writeln!(w, "  node [shape=box];")?;
    for id in c.preorder_from(c.root()) {
        let kind = c.kind(id);
        let label = match kind {
            OpKind::InputRegister(r) | OpKind::OutputRegister(r) => {
                format!("{}.{r} [{}]", kind.name(), c.size(id))
            }
            OpKind::Constant(bits) => format!("Constant.{bits} [{}]", c.size(id)),
            OpKind::Extract { high, low } => {
                format!("Extract.{low}.{high} [{}]", c.size(id))
            }
            other => format!("{} [{}]", other.name(), c.size(id)),
        };
        let highlight = highlights.iter().any(|h| h == &kind.name());
        if highlight {
            writeln!(
                w,
                "  n{} [label=\"{label}\", style=filled, fillcolor=red];",
                id.as_u32()
            )?;
        } else {
            writeln!(w, "  n{} [label=\"{label}\"];", id.as_u32())?;
        }
        for &o in c.operands(id) {
            writeln!(w, "  n{} -> n{};", id.as_u32(), o.as_u32())?;
        }
    }
    writeln!(w, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_nodes_edges_and_highlights() {
        let mut c = Circuit::new(64);
        let a = c.create(OpKind::InputRegister("EAX".into()), 32);
        let b = c.create(OpKind::OutputRegister("EAX".into()), 32);
        let rc = c.create(OpKind::RegConstraint, 1);
        c.add_operands(rc, &[a, b]);
        let vi = c.create(OpKind::VerifyInstruction, 1);
        c.add_operand(vi, rc);
        let root = c.root();
        c.add_operand(root, vi);

        let mut out = Vec::new();
        print_dot(&mut out, &c, &["RegConstraint".into()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("digraph circuit {"));
        assert!(text.contains("InputRegister.EAX [32]"));
        assert!(text.contains("fillcolor=red"));
        assert!(text.contains(&format!("n{} -> n{};", vi.as_u32(), rc.as_u32())));
    }
}
