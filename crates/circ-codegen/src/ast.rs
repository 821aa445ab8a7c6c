//! Target-language-independent expression/statement tree for the emitted
//! decoder source. The tree carries no layout decisions of its own; brackets
//! and separators are chosen by the printer's guard tables.

/// Binary operators, printed infix and parenthesized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Mul,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    Shl,
    Eq,
}

impl BinOp {
    pub fn token(self) -> &'static str {
        match self {
            BinOp::Plus => "+",
            BinOp::Mul => "*",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::LogicalAnd => "&&",
            BinOp::Shl => "<<",
            BinOp::Eq => "==",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    BitNegate,
    Deref,
    CastUint64,
}

/// A (possibly qualified) type name with optional template arguments.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Type {
    pub name: String,
    pub is_const: bool,
    pub is_static: bool,
    pub is_constexpr: bool,
    pub template_parameters: Vec<Expr>,
}

impl Type {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn auto() -> Self {
        Self::new("auto")
    }

    pub fn constexpr(name: impl Into<String>) -> Self {
        Self {
            is_constexpr: true,
            ..Self::new(name)
        }
    }
}

/// A named value. The type only surfaces when printed through [`VarDecl`].
#[derive(Clone, Debug, PartialEq)]
pub struct Var {
    pub name: String,
    pub ty: Type,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Type::auto(),
        }
    }

    pub fn typed(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Declaration site of a [`Var`]: prints as `type name`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl(pub Var);

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub function_name: String,
    pub args: Vec<Expr>,
    pub template_args: Vec<Expr>,
}

impl FunctionCall {
    pub fn new(function_name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            function_name: function_name.into(),
            args,
            template_args: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDeclaration {
    pub ret: Type,
    pub function_name: String,
    pub args: Vec<VarDecl>,
    pub body: Vec<Expr>,
}

/// Incremental construction of a [`FunctionDeclaration`].
#[derive(Default)]
pub struct FunctionDeclarationBuilder {
    ret: Type,
    function_name: String,
    args: Vec<VarDecl>,
    body: Vec<Expr>,
}

impl FunctionDeclarationBuilder {
    pub fn ret_type(mut self, ret: Type) -> Self {
        self.ret = ret;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    pub fn arg(mut self, arg: VarDecl) -> Self {
        self.args.push(arg);
        self
    }

    pub fn body_push(mut self, e: Expr) -> Self {
        self.body.push(e);
        self
    }

    pub fn body_extend(mut self, es: impl IntoIterator<Item = Expr>) -> Self {
        self.body.extend(es);
        self
    }

    pub fn make(self) -> FunctionDeclaration {
        FunctionDeclaration {
            ret: self.ret,
            function_name: self.function_name,
            args: self.args,
            body: self.body,
        }
    }
}

/// Constructor: a function declaration plus member-initializer list and
/// base-initializer calls.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstructorDeclaration {
    pub function_name: String,
    pub args: Vec<VarDecl>,
    pub init_calls: Vec<FunctionCall>,
    pub member_inits: Vec<(String, Expr)>,
    pub body: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub template_typenames: Vec<String>,
    pub derived_from: Vec<Expr>,
    pub constructors: Vec<ConstructorDeclaration>,
    pub methods: Vec<FunctionDeclaration>,
    /// Members carrying a default initializer (`T x = e;`).
    pub default_init_members: Vec<(VarDecl, Expr)>,
    /// Members declared bare (`T x;`).
    pub assign_init_members: Vec<VarDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<String>,
}

/// The expression/statement tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Empty,
    /// Verbatim identifier or token run.
    Id(String),
    Int(i64),
    /// 64-bit literal printed in binary.
    BitLit(u64),
    Var(Var),
    VarDecl(VarDecl),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `base[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `lhs = rhs` (unterminated; wrap in [`Expr::Statement`]).
    Assign(Box<Expr>, Box<Expr>),
    Call(FunctionCall),
    /// Terminated expression: `e;`.
    Statement(Box<Expr>),
    Return(Box<Expr>),
    If(Box<Expr>, Box<Expr>),
    IfElse {
        cond: Box<Expr>,
        then_body: Box<Expr>,
        else_body: Box<Expr>,
    },
    /// Statements printed back to back, no implicit braces.
    Block(Vec<Expr>),
    FunctionDecl(FunctionDeclaration),
    ConstructorDecl(ConstructorDeclaration),
    StructDecl(StructDef),
    EnumDecl(EnumDef),
    EnumValue {
        enum_name: String,
        variant: String,
    },
}

impl Expr {
    pub fn id(s: impl Into<String>) -> Expr {
        Expr::Id(s.into())
    }

    pub fn var(v: &Var) -> Expr {
        Expr::Var(v.clone())
    }

    pub fn assign(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Assign(Box::new(lhs), Box::new(rhs))
    }

    pub fn statement(e: Expr) -> Expr {
        Expr::Statement(Box::new(e))
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn index(base: Expr, idx: Expr) -> Expr {
        Expr::Index(Box::new(base), Box::new(idx))
    }
}
