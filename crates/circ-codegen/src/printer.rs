//! Pretty-printer for the emission AST.
//!
//! The printer is pure: two equal trees produce byte-identical text.
//! Bracket pairs and separators are looked up per context rather than
//! hard-coded at the call sites.

use std::io;

use crate::ast::{
    BinOp, ConstructorDeclaration, Expr, FunctionCall, FunctionDeclaration, StructDef, Type,
    UnaryOp, Var, VarDecl,
};

/// Bracket pair wrapped around a printed region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardStyle {
    None,
    Parens,
    Square,
    Angled,
    /// `{ ... }` with the body on its own lines.
    Curly,
    /// `{ ... };` for struct/enum bodies.
    CurlyWithSemicolon,
    /// Leading `: ` for initializer lists and base clauses.
    SingleColon,
}

impl GuardStyle {
    fn open(self) -> &'static str {
        match self {
            GuardStyle::None => "",
            GuardStyle::Parens => "(",
            GuardStyle::Square => "[",
            GuardStyle::Angled => "<",
            GuardStyle::Curly | GuardStyle::CurlyWithSemicolon => "{\n",
            GuardStyle::SingleColon => ": ",
        }
    }

    fn close(self) -> &'static str {
        match self {
            GuardStyle::None => "",
            GuardStyle::Parens => ")",
            GuardStyle::Square => "]",
            GuardStyle::Angled => ">",
            GuardStyle::Curly => "\n}",
            GuardStyle::CurlyWithSemicolon => "\n};",
            GuardStyle::SingleColon => "",
        }
    }
}

/// Context an expression array is printed in; decides the guard and the
/// inter-element separator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExprStyle {
    FuncArgs,
    FuncBody,
    EnumBody,
    TemplateParams,
    StructMethods,
    StructVars,
    StructDerivations,
    StructMemberInit,
}

impl ExprStyle {
    fn guard(self) -> GuardStyle {
        match self {
            ExprStyle::FuncArgs => GuardStyle::Parens,
            ExprStyle::FuncBody => GuardStyle::Curly,
            ExprStyle::EnumBody => GuardStyle::Curly,
            ExprStyle::TemplateParams => GuardStyle::Angled,
            ExprStyle::StructMethods => GuardStyle::None,
            ExprStyle::StructVars => GuardStyle::None,
            ExprStyle::StructDerivations => GuardStyle::SingleColon,
            ExprStyle::StructMemberInit => GuardStyle::SingleColon,
        }
    }

    fn separator(self) -> &'static str {
        match self {
            ExprStyle::FuncArgs => ", ",
            // No `;` here: if-statements inside a body do not end with one.
            ExprStyle::FuncBody => "\n",
            ExprStyle::EnumBody => ",\n",
            ExprStyle::TemplateParams => ", ",
            ExprStyle::StructMethods => "\n",
            ExprStyle::StructVars => "\n",
            ExprStyle::StructDerivations => ", ",
            ExprStyle::StructMemberInit => ", ",
        }
    }
}

pub struct ExpressionPrinter<'w, W: io::Write> {
    out: &'w mut W,
}

impl<'w, W: io::Write> ExpressionPrinter<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self { out }
    }

    pub fn print(&mut self, e: &Expr) -> io::Result<()> {
        self.expr(e)
    }

    fn raw(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }

    fn guarded(&mut self, g: GuardStyle, f: impl FnOnce(&mut Self) -> io::Result<()>) -> io::Result<()> {
        self.raw(g.open())?;
        f(self)?;
        self.raw(g.close())
    }

    fn expr_array(&mut self, items: &[Expr], style: ExprStyle) -> io::Result<()> {
        self.guarded(style.guard(), |p| {
            for (i, item) in items.iter().enumerate() {
                p.expr(item)?;
                if i + 1 != items.len() {
                    p.raw(style.separator())?;
                }
            }
            Ok(())
        })
    }

    fn binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> io::Result<()> {
        self.guarded(GuardStyle::Parens, |p| {
            p.expr(lhs)?;
            p.raw(" ")?;
            p.raw(op.token())?;
            p.raw(" ")?;
            p.expr(rhs)
        })
    }

    fn type_(&mut self, t: &Type) -> io::Result<()> {
        if t.is_constexpr {
            self.raw("constexpr ")?;
        }
        if t.is_const {
            self.raw("const ")?;
        }
        if t.is_static {
            self.raw("static ")?;
        }
        self.raw(&t.name)?;
        if !t.template_parameters.is_empty() {
            self.expr_array(&t.template_parameters, ExprStyle::TemplateParams)?;
        }
        Ok(())
    }

    fn var_decl(&mut self, d: &VarDecl) -> io::Result<()> {
        self.type_(&d.0.ty)?;
        self.raw(" ")?;
        self.raw(&d.0.name)
    }

    fn call(&mut self, c: &FunctionCall) -> io::Result<()> {
        self.raw(&c.function_name)?;
        if !c.template_args.is_empty() {
            self.expr_array(&c.template_args, ExprStyle::TemplateParams)?;
        }
        self.expr_array(&c.args, ExprStyle::FuncArgs)
    }

    fn function_decl(&mut self, f: &FunctionDeclaration) -> io::Result<()> {
        self.type_(&f.ret)?;
        self.raw(" ")?;
        self.raw(&f.function_name)?;
        let args: Vec<Expr> = f.args.iter().map(|a| Expr::VarDecl(a.clone())).collect();
        self.expr_array(&args, ExprStyle::FuncArgs)?;
        self.raw("\n")?;
        self.expr_array(&f.body, ExprStyle::FuncBody)?;
        self.raw("\n")
    }

    fn constructor_decl(&mut self, c: &ConstructorDeclaration) -> io::Result<()> {
        self.raw(&c.function_name)?;
        let args: Vec<Expr> = c.args.iter().map(|a| Expr::VarDecl(a.clone())).collect();
        self.expr_array(&args, ExprStyle::FuncArgs)?;
        self.raw("\n")?;

        let mut inits: Vec<Expr> = Vec::new();
        for call in &c.init_calls {
            inits.push(Expr::Call(call.clone()));
        }
        for (member, value) in &c.member_inits {
            inits.push(Expr::Call(FunctionCall::new(member.clone(), vec![value.clone()])));
        }
        if !inits.is_empty() {
            self.expr_array(&inits, ExprStyle::StructMemberInit)?;
            self.raw("\n")?;
        }
        self.expr_array(&c.body, ExprStyle::FuncBody)?;
        self.raw("\n")
    }

    fn struct_decl(&mut self, s: &StructDef) -> io::Result<()> {
        if !s.template_typenames.is_empty() {
            self.raw("template ")?;
            let names: Vec<Expr> = s
                .template_typenames
                .iter()
                .map(|n| Expr::Id(format!("typename {n}")))
                .collect();
            self.expr_array(&names, ExprStyle::TemplateParams)?;
            self.raw("\n")?;
        }
        self.raw("struct ")?;
        self.raw(&s.name)?;
        if !s.derived_from.is_empty() {
            self.raw(" ")?;
            self.expr_array(&s.derived_from, ExprStyle::StructDerivations)?;
        }
        self.raw("\n")?;
        self.guarded(GuardStyle::CurlyWithSemicolon, |p| {
            let mut first = true;
            for ctor in &s.constructors {
                if !std::mem::take(&mut first) {
                    p.raw("\n")?;
                }
                p.constructor_decl(ctor)?;
            }
            for method in &s.methods {
                if !std::mem::take(&mut first) {
                    p.raw("\n")?;
                }
                p.function_decl(method)?;
            }
            for (decl, value) in &s.default_init_members {
                if !std::mem::take(&mut first) {
                    p.raw("\n")?;
                }
                p.var_decl(decl)?;
                p.raw(" = ")?;
                p.expr(value)?;
                p.raw(";")?;
            }
            for decl in &s.assign_init_members {
                if !std::mem::take(&mut first) {
                    p.raw("\n")?;
                }
                p.var_decl(decl)?;
                p.raw(";")?;
            }
            Ok(())
        })?;
        self.raw("\n")
    }

    fn expr(&mut self, e: &Expr) -> io::Result<()> {
        match e {
            Expr::Empty => Ok(()),
            Expr::Id(s) => self.raw(s),
            Expr::Int(v) => self.raw(&v.to_string()),
            Expr::BitLit(v) => self.raw(&format!("0b{v:064b}")),
            Expr::Var(Var { name, .. }) => self.raw(name),
            Expr::VarDecl(d) => self.var_decl(d),
            Expr::Unary(UnaryOp::BitNegate, inner) => {
                self.raw("~")?;
                self.guarded(GuardStyle::Parens, |p| p.expr(inner))
            }
            Expr::Unary(UnaryOp::Deref, inner) => {
                self.raw("(*")?;
                self.expr(inner)?;
                self.raw(")")
            }
            Expr::Unary(UnaryOp::CastUint64, inner) => {
                self.raw("static_cast<uint64_t>")?;
                self.guarded(GuardStyle::Parens, |p| p.expr(inner))
            }
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
            Expr::Index(base, idx) => {
                self.expr(base)?;
                self.guarded(GuardStyle::Square, |p| p.expr(idx))
            }
            Expr::Assign(lhs, rhs) => {
                self.expr(lhs)?;
                self.raw(" = ")?;
                self.expr(rhs)
            }
            Expr::Call(c) => self.call(c),
            Expr::Statement(inner) => {
                self.expr(inner)?;
                self.raw(";\n")
            }
            Expr::Return(inner) => {
                self.raw("return ")?;
                self.expr(inner)?;
                self.raw(";")
            }
            Expr::If(cond, body) => {
                self.raw("if ")?;
                self.guarded(GuardStyle::Parens, |p| p.expr(cond))?;
                self.raw(" ")?;
                self.guarded(GuardStyle::Curly, |p| p.expr(body))?;
                self.raw("\n")
            }
            Expr::IfElse {
                cond,
                then_body,
                else_body,
            } => {
                self.raw("if ")?;
                self.guarded(GuardStyle::Parens, |p| p.expr(cond))?;
                self.raw(" ")?;
                self.guarded(GuardStyle::Curly, |p| p.expr(then_body))?;
                self.raw(" else ")?;
                self.guarded(GuardStyle::Curly, |p| p.expr(else_body))?;
                self.raw("\n")
            }
            Expr::Block(items) => {
                for item in items {
                    self.expr(item)?;
                }
                Ok(())
            }
            Expr::FunctionDecl(f) => self.function_decl(f),
            Expr::ConstructorDecl(c) => self.constructor_decl(c),
            Expr::StructDecl(s) => self.struct_decl(s),
            Expr::EnumDecl(e) => {
                self.raw("enum class ")?;
                self.raw(&e.name)?;
                self.raw(" ")?;
                let variants: Vec<Expr> =
                    e.variants.iter().map(|v| Expr::Id(v.clone())).collect();
                self.expr_array(&variants, ExprStyle::EnumBody)?;
                self.raw("\n")
            }
            Expr::EnumValue { enum_name, variant } => {
                self.raw(enum_name)?;
                self.raw("::")?;
                self.raw(variant)
            }
        }
    }
}

/// Renders one expression to a string (test and diagnostics helper).
pub fn render(e: &Expr) -> String {
    let mut buf = Vec::new();
    ExpressionPrinter::new(&mut buf)
        .print(e)
        .expect("writing to a Vec cannot fail");
    String::from_utf8(buf).expect("printer emits UTF-8 only")
}
