//! Semantics-emitter synthesis: turning SEG subtrees into target-language
//! functions that replay an operation tree against an injected visitor,
//! consuming operand handles from a shared stack.

use std::collections::HashMap;
use std::io;

use circ_ir::Circuit;
use circ_seg::{SegGraph, SegId};

use crate::ast::{
    Expr, FunctionCall, FunctionDeclaration, FunctionDeclarationBuilder, Type, UnaryOp, Var,
    VarDecl,
};
use crate::printer::ExpressionPrinter;

/// Monotonic generated-name source; uniqueness is process-wide for the
/// duration of a compilation.
#[derive(Default)]
pub struct UniqueNameStorage {
    counter: u64,
}

impl UniqueNameStorage {
    pub fn next_name(&mut self) -> String {
        self.counter += 1;
        format!("generated_name_{}", self.counter)
    }
}

/// Emitter functions keyed by SEG structural hash. After dedup the hash is
/// in bijection with live nodes, so each SEG node owns at most one
/// declaration and every requester shares it.
#[derive(Default)]
pub struct FunctionTable {
    by_hash: HashMap<String, FunctionDeclaration>,
}

impl FunctionTable {
    pub fn for_node(&self, g: &SegGraph, node: SegId) -> Option<&FunctionDeclaration> {
        self.by_hash.get(&g.get_hash(node))
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

fn stack_offset_var() -> Var {
    Var::typed("stack_offset", Type::new("int*"))
}

fn visitor_var() -> Var {
    Var::typed("visitor", Type::new("const VisitorType&"))
}

fn stack_array_type(max_size: &Var) -> Type {
    Type::new(format!("const std::array<{}>&", max_size.name))
}

/// Converts a SEG node into target code.
///
/// Returns the lvalue holding the node's visitor result and the setup block
/// that must run before the lvalue is valid. Cheap nodes inline their setup
/// into the caller; nodes marked `fd` register a shared function declaration
/// on first request, and the returned setup collapses to a single call.
pub fn expr_for_node(
    table: &mut FunctionTable,
    names: &mut UniqueNameStorage,
    g: &SegGraph,
    node: SegId,
    stack: &Var,
    stack_offset_count: &mut i32,
    max_size: &Var,
) -> (Var, Vec<Expr>) {
    let mut setup: Vec<Expr> = Vec::new();
    let mut local_vars: Vec<Expr> = Vec::new();

    // The handle popped for this node rides in front of the children's
    // lvalues when calling the visitor.
    let pop_var = Var::new(names.next_name());
    local_vars.push(Expr::var(&pop_var));

    for i in 0..g.node(node).children.len() {
        let child = g.node(node).children[i];
        let (lvalue, child_setup) =
            expr_for_node(table, names, g, child, stack, stack_offset_count, max_size);
        local_vars.push(Expr::var(&lvalue));
        setup.extend(child_setup);
    }

    let offset_deref = Expr::Unary(UnaryOp::Deref, Box::new(Expr::var(&stack_offset_var())));
    *stack_offset_count += 1;
    setup.push(Expr::statement(Expr::assign(
        Expr::VarDecl(VarDecl(pop_var.clone())),
        Expr::index(Expr::var(stack), offset_deref.clone()),
    )));
    setup.push(Expr::statement(Expr::assign(
        offset_deref.clone(),
        Expr::binary(crate::ast::BinOp::Plus, offset_deref, Expr::Int(1)),
    )));

    let call_var = Var::new(names.next_name());
    setup.push(Expr::statement(Expr::assign(
        Expr::VarDecl(VarDecl(call_var.clone())),
        Expr::Call(FunctionCall::new("visitor.call", local_vars)),
    )));

    if !g.node(node).fd {
        return (call_var, setup);
    }

    let hash = g.get_hash(node);
    if !table.by_hash.contains_key(&hash) {
        let decl = FunctionDeclarationBuilder::default()
            .ret_type(Type::new("VisRetType"))
            .name(names.next_name())
            .arg(VarDecl(visitor_var()))
            .arg(VarDecl(Var::typed(stack.name.clone(), stack_array_type(max_size))))
            .arg(VarDecl(stack_offset_var()))
            .body_extend(setup.clone())
            .body_push(Expr::Return(Box::new(Expr::var(&call_var))))
            .make();
        table.by_hash.insert(hash.clone(), decl);
    }

    // The setup now lives inside the shared function; the caller only keeps
    // the call.
    let decl_name = table.by_hash[&hash].function_name.clone();
    let result_var = Var::new(names.next_name());
    let call = Expr::Call(FunctionCall::new(
        decl_name,
        vec![
            Expr::id("visitor"),
            Expr::var(stack),
            Expr::var(&stack_offset_var()),
        ],
    ));
    let caller_setup = vec![Expr::statement(Expr::assign(
        Expr::VarDecl(VarDecl(result_var.clone())),
        call,
    ))];
    (result_var, caller_setup)
}

/// Cost analysis plus per-context emitter registration: after this, every
/// SEG root (and every shared interior subtree worth outlining) has its
/// function declaration recorded in the returned table.
pub fn prepare(g: &mut SegGraph, circuit: &Circuit) -> FunctionTable {
    g.calculate_costs();

    let mut table = FunctionTable::default();
    let mut names = UniqueNameStorage::default();
    let stack = Var::new("stack");
    let max_size = Var::new("MAX_SIZE_INSTR");

    for vi in circuit.verify_instructions() {
        let mut counter = 0i32;
        for (_, node) in g.get_nodes_by_vi(vi) {
            let _ = expr_for_node(
                &mut table,
                &mut names,
                g,
                node,
                &stack,
                &mut counter,
                &max_size,
            );
        }
    }
    tracing::debug!("registered {} emitter functions", table.len());
    table
}

/// Phase-1 output: every registered emitter, in post-order DFS of the SEG
/// so callees are declared before their callers.
pub fn print_semantics_emitters<W: io::Write>(
    w: &mut W,
    g: &SegGraph,
    table: &FunctionTable,
) -> io::Result<()> {
    for id in g.postorder() {
        if let Some(decl) = table.for_node(g, id) {
            ExpressionPrinter::new(w).print(&Expr::FunctionDecl(decl.clone()))?;
            w.write_all(b"\n")?;
        }
    }
    Ok(())
}
