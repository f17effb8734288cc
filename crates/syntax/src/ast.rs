#![allow(clippy::needless_lifetimes)]

use std::rc::Rc;

use beef::lean::Cow;
use span::{Span, Spanned};

use crate::block::BlockId;

pub type Ident<'src> = Spanned<Cow<'src, str>>;

pub type Stmt<'src> = Spanned<StmtKind<'src>>;
pub type Expr<'src> = Spanned<ExprKind<'src>>;

#[cfg_attr(test, derive(Debug))]
pub enum ExprKind<'src> {
  Literal(Literal<'src>),
  Unary(Box<Unary<'src>>),
  Operation(Box<Operation<'src>>),
  VarVal(Box<VarVal<'src>>),
  CallFunc(Box<CallFunc<'src>>),
}

#[cfg_attr(test, derive(Debug))]
pub enum Literal<'src> {
  Double(f64),
  String(Cow<'src, str>),
  Bool(bool),
  Null,
}

#[cfg_attr(test, derive(Debug))]
pub struct Unary<'src> {
  pub op: UnaryOp,
  pub operand: Expr<'src>,
}

#[cfg_attr(test, derive(Debug))]
#[derive(Clone, Copy)]
pub enum UnaryOp {
  Neg,
  Not,
}

#[cfg_attr(test, derive(Debug))]
pub struct Operation<'src> {
  pub op: BinaryOp,
  pub lhs: Expr<'src>,
  pub rhs: Expr<'src>,
}

#[cfg_attr(test, derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Neq,
  Lt,
  Gt,
  Le,
  Ge,
  And,
  Or,
}

/// A variable read; the block it was parsed in is kept so codegen can
/// resolve the name's offset through the lexical scope chain.
#[cfg_attr(test, derive(Debug))]
pub struct VarVal<'src> {
  pub name: Ident<'src>,
  pub block: BlockId,
}

#[cfg_attr(test, derive(Debug))]
pub struct CallFunc<'src> {
  pub name: Ident<'src>,
  pub args: Vec<Expr<'src>>,
  pub block: BlockId,
}

#[cfg_attr(test, derive(Debug))]
pub enum StmtKind<'src> {
  Print(Box<Expr<'src>>),
  VarDecl(Box<VarDecl<'src>>),
  /// An expression used for its side effect alone, e.g. a bare call
  /// statement `add(1, 2);`.
  Expr(Box<Expr<'src>>),
  Inside(Box<Inside<'src>>),
  If(Box<If<'src>>),
  While(Box<While<'src>>),
  For(Box<For<'src>>),
  Break,
  Return(Option<Box<Expr<'src>>>),
  /// Shared with the block tree's function map: the statement and the
  /// lookup table the evaluator walks to resolve a call both point at the
  /// same definition, so there is nothing to keep in sync.
  Function(Rc<Function<'src>>),
}

#[cfg_attr(test, derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum VarDeclKind {
  /// `var x = ...` — allocate a fresh stack slot in the current block.
  Declare,
  /// `x = ...` — resolve an existing slot through the scope chain and
  /// overwrite it.
  Assign,
}

#[cfg_attr(test, derive(Debug))]
pub struct VarDecl<'src> {
  pub name: Ident<'src>,
  pub kind: VarDeclKind,
  pub value: Option<Expr<'src>>,
  pub block: BlockId,
}

/// A block body, represented the way the source represents it: a
/// right-recursive chain where `chain` is everything parsed before `exec`.
/// Executing `chain` before `exec` reproduces source order even though each
/// node is built by appending to the front of what came before.
#[cfg_attr(test, derive(Debug))]
pub struct Inside<'src> {
  pub chain: Option<Stmt<'src>>,
  pub exec: Stmt<'src>,
}

#[cfg_attr(test, derive(Debug))]
pub struct If<'src> {
  pub cond: Expr<'src>,
  pub then: Option<Stmt<'src>>,
  pub otherwise: Option<Stmt<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub struct While<'src> {
  pub cond: Expr<'src>,
  pub body: Option<Stmt<'src>>,
}

#[cfg_attr(test, derive(Debug))]
pub struct For<'src> {
  pub init: Option<Stmt<'src>>,
  pub cond: Option<Expr<'src>>,
  pub iter: Option<Stmt<'src>>,
  pub body: Option<Stmt<'src>>,
}

/// `Function` only binds `name -> definition` when its statement runs; it
/// does not invoke anything. `body_block` is the function's own env block,
/// created at parse time with state `Func`, and is reused unchanged on every
/// call — there is no per-call closure environment beyond fresh parameter
/// offsets (see `CallFunc` in `eval`).
#[cfg_attr(test, derive(Debug))]
pub struct Function<'src> {
  pub name: Ident<'src>,
  pub params: Vec<Ident<'src>>,
  pub body: Option<Stmt<'src>>,
  pub body_block: BlockId,
  pub parent_block: BlockId,
}

pub fn lit_double<'src>(s: impl Into<Span>, v: f64) -> Expr<'src> {
  Expr::new(s, ExprKind::Literal(Literal::Double(v)))
}

pub fn lit_string<'src>(s: impl Into<Span>, v: Cow<'src, str>) -> Expr<'src> {
  Expr::new(s, ExprKind::Literal(Literal::String(v)))
}

pub fn lit_bool<'src>(s: impl Into<Span>, v: bool) -> Expr<'src> {
  Expr::new(s, ExprKind::Literal(Literal::Bool(v)))
}

pub fn lit_null<'src>(s: impl Into<Span>) -> Expr<'src> {
  Expr::new(s, ExprKind::Literal(Literal::Null))
}

pub fn expr_unary<'src>(s: impl Into<Span>, op: UnaryOp, operand: Expr<'src>) -> Expr<'src> {
  Expr::new(s, ExprKind::Unary(Box::new(Unary { op, operand })))
}

pub fn expr_operation<'src>(
  s: impl Into<Span>,
  op: BinaryOp,
  lhs: Expr<'src>,
  rhs: Expr<'src>,
) -> Expr<'src> {
  Expr::new(s, ExprKind::Operation(Box::new(Operation { op, lhs, rhs })))
}

pub fn expr_var_val<'src>(name: Ident<'src>, block: BlockId) -> Expr<'src> {
  Expr::new(name.span, ExprKind::VarVal(Box::new(VarVal { name, block })))
}

pub fn expr_call_func<'src>(
  s: impl Into<Span>,
  name: Ident<'src>,
  args: Vec<Expr<'src>>,
  block: BlockId,
) -> Expr<'src> {
  Expr::new(
    s,
    ExprKind::CallFunc(Box::new(CallFunc { name, args, block })),
  )
}

pub fn print_stmt<'src>(s: impl Into<Span>, expr: Expr<'src>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Print(Box::new(expr)))
}

pub fn expr_stmt<'src>(expr: Expr<'src>) -> Stmt<'src> {
  Stmt::new(expr.span, StmtKind::Expr(Box::new(expr)))
}

pub fn var_decl_stmt<'src>(
  s: impl Into<Span>,
  name: Ident<'src>,
  kind: VarDeclKind,
  value: Option<Expr<'src>>,
  block: BlockId,
) -> Stmt<'src> {
  Stmt::new(
    s,
    StmtKind::VarDecl(Box::new(VarDecl {
      name,
      kind,
      value,
      block,
    })),
  )
}

pub fn inside_stmt<'src>(chain: Option<Stmt<'src>>, exec: Stmt<'src>) -> Stmt<'src> {
  let start = chain.as_ref().map(|c| c.span.start).unwrap_or(exec.span.start);
  let end = exec.span.end;
  Stmt::new(start..end, StmtKind::Inside(Box::new(Inside { chain, exec })))
}

pub fn if_stmt<'src>(
  s: impl Into<Span>,
  cond: Expr<'src>,
  then: Option<Stmt<'src>>,
  otherwise: Option<Stmt<'src>>,
) -> Stmt<'src> {
  Stmt::new(
    s,
    StmtKind::If(Box::new(If {
      cond,
      then,
      otherwise,
    })),
  )
}

pub fn while_stmt<'src>(s: impl Into<Span>, cond: Expr<'src>, body: Option<Stmt<'src>>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::While(Box::new(While { cond, body })))
}

pub fn for_stmt<'src>(
  s: impl Into<Span>,
  init: Option<Stmt<'src>>,
  cond: Option<Expr<'src>>,
  iter: Option<Stmt<'src>>,
  body: Option<Stmt<'src>>,
) -> Stmt<'src> {
  Stmt::new(
    s,
    StmtKind::For(Box::new(For {
      init,
      cond,
      iter,
      body,
    })),
  )
}

pub fn break_stmt<'src>(s: impl Into<Span>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Break)
}

pub fn return_stmt<'src>(s: impl Into<Span>, value: Option<Expr<'src>>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Return(value.map(Box::new)))
}

pub fn function_stmt<'src>(s: impl Into<Span>, function: Rc<Function<'src>>) -> Stmt<'src> {
  Stmt::new(s, StmtKind::Function(function))
}
