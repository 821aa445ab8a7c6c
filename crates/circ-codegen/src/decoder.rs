//! Decoder synthesis: one function per verify context that pre-populates
//! the evaluation stack with instruction-specific operand handles and
//! dispatches into the shared semantics emitters.

use std::collections::{BTreeSet, HashMap};
use std::io;

use circ_ir::{Circuit, OpId};
use circ_seg::{preorder_with_choices, InstructionProjection, SegGraph, SegId};

use crate::ast::{
    BinOp, Expr, FunctionCall, FunctionDeclaration, FunctionDeclarationBuilder, Type, Var, VarDecl,
};
use crate::emit::FunctionTable;
use crate::printer::ExpressionPrinter;

/// `constexpr int MAX_SIZE_INSTR = <n>;`, the stack capacity every emitted
/// signature refers to, sized by the deepest verify context.
pub fn max_size_decl(max_size: u32) -> Expr {
    Expr::statement(Expr::assign(
        Expr::VarDecl(VarDecl(Var::typed(
            "MAX_SIZE_INSTR",
            Type::constexpr("int"),
        ))),
        Expr::Int(max_size as i64),
    ))
}

/// Phase-2 output: `decoder_for_vi<id>` for every verify context.
pub fn print_decoders<W: io::Write>(
    w: &mut W,
    circuit: &Circuit,
    g: &SegGraph,
    table: &FunctionTable,
) -> io::Result<()> {
    for vi in circuit.verify_instructions() {
        let decl = decoder_for_vi(circuit, g, table, vi);
        ExpressionPrinter::new(w).print(&Expr::FunctionDecl(decl))?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Builds one decoder body. Projections are grouped by the circuit
/// operation rooting them; a group with one projection emits its pushes
/// unconditionally, a group with several emits one select-guarded block per
/// projection.
pub fn decoder_for_vi(
    circuit: &Circuit,
    g: &SegGraph,
    table: &FunctionTable,
    vi: OpId,
) -> FunctionDeclaration {
    let mut body: Vec<Expr> = vec![
        Expr::statement(Expr::assign(
            Expr::VarDecl(VarDecl(Var::typed("stack_counter", Type::new("int")))),
            Expr::Int(0),
        )),
        Expr::statement(Expr::assign(
            Expr::VarDecl(VarDecl(Var::typed("stack_offset", Type::new("int")))),
            Expr::Int(0),
        )),
    ];

    // Group by root operation, keys in first-observation order.
    let mut keys: Vec<OpId> = Vec::new();
    let mut groups: HashMap<OpId, Vec<(InstructionProjection, SegId)>> = HashMap::new();
    for (proj, node) in g.get_nodes_by_vi(vi) {
        let key = proj.root_in_vi;
        if !groups.contains_key(&key) {
            keys.push(key);
        }
        groups.entry(key).or_default().push((proj, node));
    }

    for key in keys {
        let group = &groups[&key];
        if group.len() > 1 {
            check_choice_independence(circuit, group);
        }
        for (proj, node) in group {
            body.push(expression_for_projection(circuit, g, table, proj, *node));
        }
    }

    FunctionDeclarationBuilder::default()
        .ret_type(Type::new("void"))
        .name(format!("decoder_for_vi{}", vi.as_u32()))
        .body_extend(body)
        .make()
}

/// When a root has one projection per possible combination of its selects'
/// indices, the emitted guards are mutually exclusive and exhaustive. A
/// mismatch means some combinations share a shape (harmless, the guards
/// still partition), which is worth surfacing either way.
fn check_choice_independence(circuit: &Circuit, group: &[(InstructionProjection, SegId)]) {
    let mut selects: BTreeSet<OpId> = BTreeSet::new();
    for (proj, _) in group {
        for choice in &proj.select_choices {
            selects.insert(choice.select);
        }
    }
    let target: usize = selects
        .iter()
        .map(|&s| 1usize << circuit.select_bits(s))
        .product();
    if group.len() == target {
        tracing::debug!(
            "projection group over {} selects is independent ({} cases)",
            selects.len(),
            target
        );
    } else {
        tracing::warn!(
            "projection group covers {} of {} select-choice combinations",
            group.len(),
            target
        );
    }
}

/// The operand-push sequence and emitter call for one projection,
/// select-guarded when the projection committed any choices.
fn expression_for_projection(
    circuit: &Circuit,
    g: &SegGraph,
    table: &FunctionTable,
    proj: &InstructionProjection,
    node: SegId,
) -> Expr {
    // Tandem preorder walk: circuit operations (selects resolved) on one
    // side, SEG shape on the other. The zip is exact by the projection
    // invariant; each step pushes the operation's handle.
    let ops = preorder_with_choices(circuit, proj.root_in_vi, &proj.select_choices);
    let segs = g.preorder(node);
    assert_eq!(
        ops.len(),
        segs.len(),
        "projection walk diverged from SEG shape for {}",
        g.node(node).debug_id
    );

    let mut block: Vec<Expr> = ops
        .iter()
        .map(|&op| {
            Expr::statement(Expr::assign(
                Expr::index(Expr::id("stack"), Expr::id("stack_counter++")),
                Expr::id(circuit.handle_name(op)),
            ))
        })
        .collect();

    let emitter = table
        .for_node(g, node)
        .unwrap_or_else(|| {
            panic!(
                "emitting a decoder for unregistered SEG node {}",
                g.node(node).debug_id
            )
        })
        .function_name
        .clone();
    block.push(Expr::statement(Expr::Call(FunctionCall::new(
        emitter,
        vec![
            Expr::id("visitor"),
            Expr::id("stack"),
            Expr::id("&stack_offset"),
        ],
    ))));

    if proj.select_choices.is_empty() {
        return Expr::Block(block);
    }

    let mut guard: Option<Expr> = None;
    for choice in &proj.select_choices {
        let eq = Expr::binary(
            BinOp::Eq,
            Expr::id(format!("select_id_{}", choice.select.as_u32())),
            Expr::Int(choice.chosen_index as i64),
        );
        guard = Some(match guard {
            Some(prev) => Expr::binary(BinOp::LogicalAnd, prev, eq),
            None => eq,
        });
    }
    Expr::If(
        Box::new(guard.expect("choice list is non-empty")),
        Box::new(Expr::Block(block)),
    )
}
