//! Hand-rolled recursive-descent parser over a single-token lookahead
//! lexer, with precedence climbing for expressions (§4.2).

use std::rc::Rc;

use beef::lean::Cow;
use diag::{ErrorLog, Severity};
use span::{Span, Spanned};

use crate::ast::{self, BinaryOp, Ident, Stmt, UnaryOp, VarDeclKind};
use crate::block::{BlockId, BlockState, BlockTree};
use crate::lexer::{Lexer, Token, TokenKind};

pub fn parse<'src>(src: &'src str, errors: &mut ErrorLog) -> crate::Program<'src> {
  let mut parser = Parser {
    lex: Lexer::new(src),
    errors,
    blocks: BlockTree::new(),
    block: 0,
  };
  let root = parser.block;
  let body = parser.stmt_chain(TokenKind::Tok_Eof);
  debug_assert_eq!(parser.block, root);
  crate::Program {
    body,
    blocks: parser.blocks,
  }
}

struct Parser<'src, 'err> {
  lex: Lexer<'src>,
  errors: &'err mut ErrorLog,
  blocks: BlockTree<'src>,
  block: BlockId,
}

impl<'src, 'err> Parser<'src, 'err> {
  #[inline]
  fn current(&self) -> &Token {
    self.lex.current()
  }

  #[inline]
  fn previous(&self) -> &Token {
    self.lex.previous()
  }

  #[inline]
  fn bump(&mut self) -> Token {
    self.lex.bump()
  }

  #[inline]
  fn bump_if(&mut self, kind: TokenKind) -> bool {
    if self.current().is(kind) {
      self.bump();
      true
    } else {
      false
    }
  }

  fn error(&mut self, context: impl Into<String>, message: impl Into<String>, span: impl Into<Span>) {
    self
      .errors
      .push(diag::Diagnostic::new(context, message, Severity::Parse).spanned(span));
  }

  /// Consumes `kind`, or records a syntax error and skips ahead to the next
  /// statement boundary so parsing of later declarations can continue.
  fn expect(&mut self, kind: TokenKind, what: &str) -> Option<()> {
    if self.current().is(kind) {
      self.bump();
      Some(())
    } else {
      let tok = self.current().clone();
      self.error(
        "parser",
        format!("expected {what}, found {}", tok.kind.describe()),
        tok.span,
      );
      self.recover();
      None
    }
  }

  /// Skips tokens until the next statement boundary, so one broken
  /// statement doesn't take down every statement after it.
  fn recover(&mut self) {
    while !self.current().is(TokenKind::Tok_Semicolon)
      && !self.current().is(TokenKind::Brk_CurlyR)
      && !self.current().is(TokenKind::Tok_Eof)
    {
      self.bump();
    }
    self.bump_if(TokenKind::Tok_Semicolon);
  }

  fn ident(&mut self) -> Option<Ident<'src>> {
    if !self.current().is(TokenKind::Lit_Ident) {
      let tok = self.current().clone();
      self.error(
        "parser",
        format!("expected an identifier, found {}", tok.kind.describe()),
        tok.span,
      );
      self.recover();
      return None;
    }
    let tok = self.bump();
    let name = self.lex.lexeme(&tok);
    Some(Spanned::new(tok.span, Cow::from(name)))
  }

  fn child_block_state(&self, parent: BlockId) -> BlockState {
    match self.blocks.state(parent) {
      BlockState::Global => BlockState::Common,
      other => other,
    }
  }

  fn enter<T>(&mut self, block: BlockId, f: impl FnOnce(&mut Self) -> T) -> T {
    let saved = self.block;
    self.block = block;
    let result = f(self);
    self.block = saved;
    result
  }

  /// Runs `f` with the current block's state temporarily upgraded to the
  /// loop context (`Func -> FuncLoop`, anything else -> `Loop`), restoring
  /// it afterwards. Used for `while`/`for` bodies.
  fn with_loop_context<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
    let original = self.blocks.state(self.block);
    let upgraded = match original {
      BlockState::Func => BlockState::FuncLoop,
      _ => BlockState::Loop,
    };
    self.blocks.set_state(self.block, upgraded);
    let result = f(self);
    self.blocks.set_state(self.block, original);
    result
  }

  /// Parses a `{ statement* }` body as a new child block, leaving the
  /// parser positioned just after the closing `}`.
  fn block_body(&mut self) -> Option<Option<Stmt<'src>>> {
    self.expect(TokenKind::Brk_CurlyL, "`{`")?;
    let state = self.child_block_state(self.block);
    let block = self.blocks.child(self.block, state);
    let body = self.enter(block, |p| p.stmt_chain(TokenKind::Brk_CurlyR));
    self.expect(TokenKind::Brk_CurlyR, "`}`")?;
    Some(body)
  }

  fn stmt_chain(&mut self, terminator: TokenKind) -> Option<Stmt<'src>> {
    let mut chain = None;
    while !self.current().is(terminator) && !self.current().is(TokenKind::Tok_Eof) {
      if let Some(stmt) = self.stmt() {
        chain = Some(ast::inside_stmt(chain, stmt));
      }
    }
    chain
  }

  fn stmt(&mut self) -> Option<Stmt<'src>> {
    use TokenKind::*;
    self.check_recursion_limit()?;
    match self.current().kind {
      Kw_Print => self.print_stmt(),
      Kw_Var => self.var_stmt(),
      Kw_If => self.if_stmt(),
      Kw_While => self.while_stmt(),
      Kw_For => self.for_stmt(),
      Kw_Break => self.break_stmt(),
      Kw_Return => self.return_stmt(),
      Kw_Func => self.func_stmt(),
      Brk_CurlyL => self.block_body().flatten(),
      Lit_Ident => self.id_stmt(),
      _ => {
        let tok = self.current().clone();
        self.error(
          "parser",
          format!("unexpected {} at the start of a statement", tok.kind.describe()),
          tok.span,
        );
        self.recover();
        None
      }
    }
  }

  fn print_stmt(&mut self) -> Option<Stmt<'src>> {
    let start = self.bump().span;
    self.expect(TokenKind::Brk_ParenL, "`(`")?;
    let expr = self.expression()?;
    self.expect(TokenKind::Brk_ParenR, "`)`")?;
    let end = self.previous().span;
    self.bump_if(TokenKind::Tok_Semicolon);
    Some(ast::print_stmt(start.join(end), expr))
  }

  fn var_stmt(&mut self) -> Option<Stmt<'src>> {
    let start = self.bump().span;
    let name = self.ident()?;
    let value = if self.bump_if(TokenKind::Op_Equal) {
      Some(self.expression()?)
    } else {
      None
    };
    let end = value.as_ref().map(|v| v.span).unwrap_or(name.span);
    self.bump_if(TokenKind::Tok_Semicolon);
    Some(ast::var_decl_stmt(
      start.join(end),
      name,
      VarDeclKind::Declare,
      value,
      self.block,
    ))
  }

  fn id_stmt(&mut self) -> Option<Stmt<'src>> {
    let name = self.ident()?;
    if self.bump_if(TokenKind::Op_Equal) {
      let value = self.expression()?;
      let span = name.span.join(value.span);
      self.bump_if(TokenKind::Tok_Semicolon);
      Some(ast::var_decl_stmt(
        span,
        name,
        VarDeclKind::Assign,
        Some(value),
        self.block,
      ))
    } else if self.current().is(TokenKind::Brk_ParenL) {
      let call = self.call_expr(name)?;
      self.bump_if(TokenKind::Tok_Semicolon);
      Some(ast::expr_stmt(call))
    } else {
      let read = ast::expr_var_val(name.clone(), self.block);
      self.bump_if(TokenKind::Tok_Semicolon);
      Some(ast::expr_stmt(read))
    }
  }

  fn if_stmt(&mut self) -> Option<Stmt<'src>> {
    let start = self.bump().span;
    self.expect(TokenKind::Brk_ParenL, "`(`")?;
    let cond = self.expression()?;
    self.expect(TokenKind::Brk_ParenR, "`)`")?;
    let then = self.block_body()?;
    let mut end = self.previous().span;
    let otherwise = if self.bump_if(TokenKind::Kw_Else) {
      let body = self.block_body()?;
      end = self.previous().span;
      body
    } else {
      None
    };
    Some(ast::if_stmt(start.join(end), cond, then, otherwise))
  }

  fn while_stmt(&mut self) -> Option<Stmt<'src>> {
    let start = self.bump().span;
    self.expect(TokenKind::Brk_ParenL, "`(`")?;
    let cond = self.expression()?;
    self.expect(TokenKind::Brk_ParenR, "`)`")?;
    let body = self.with_loop_context(|p| p.block_body())?;
    let end = self.previous().span;
    Some(ast::while_stmt(start.join(end), cond, body))
  }

  fn for_stmt(&mut self) -> Option<Stmt<'src>> {
    let start = self.bump().span;
    self.expect(TokenKind::Brk_ParenL, "`(`")?;
    let init = if self.current().is(TokenKind::Tok_Semicolon) {
      None
    } else {
      self.for_clause_stmt()
    };
    self.bump_if(TokenKind::Tok_Semicolon);
    let cond = if self.current().is(TokenKind::Tok_Semicolon) {
      None
    } else {
      Some(self.expression()?)
    };
    self.expect(TokenKind::Tok_Semicolon, "`;`")?;
    let iter = if self.current().is(TokenKind::Brk_ParenR) {
      None
    } else {
      self.for_clause_stmt()
    };
    self.expect(TokenKind::Brk_ParenR, "`)`")?;
    let body = self.with_loop_context(|p| p.block_body())?;
    let end = self.previous().span;
    Some(ast::for_stmt(start.join(end), init, cond, iter, body))
  }

  /// `for`'s init/iter clauses are a `var` declaration or an identifier
  /// statement without the trailing `;`/block semantics of a full `stmt`.
  fn for_clause_stmt(&mut self) -> Option<Stmt<'src>> {
    if self.current().is(TokenKind::Kw_Var) {
      let start = self.bump().span;
      let name = self.ident()?;
      let value = if self.bump_if(TokenKind::Op_Equal) {
        Some(self.expression()?)
      } else {
        None
      };
      let end = value.as_ref().map(|v| v.span).unwrap_or(name.span);
      Some(ast::var_decl_stmt(
        start.join(end),
        name,
        VarDeclKind::Declare,
        value,
        self.block,
      ))
    } else {
      let name = self.ident()?;
      self.expect(TokenKind::Op_Equal, "`=`")?;
      let value = self.expression()?;
      let span = name.span.join(value.span);
      Some(ast::var_decl_stmt(
        span,
        name,
        VarDeclKind::Assign,
        Some(value),
        self.block,
      ))
    }
  }

  fn break_stmt(&mut self) -> Option<Stmt<'src>> {
    let tok = self.bump();
    match self.blocks.state(self.block) {
      BlockState::Loop | BlockState::FuncLoop => {}
      _ => self.error("break", "found in a block without loop", tok.span),
    }
    self.bump_if(TokenKind::Tok_Semicolon);
    Some(ast::break_stmt(tok.span))
  }

  fn return_stmt(&mut self) -> Option<Stmt<'src>> {
    let tok = self.bump();
    match self.blocks.state(self.block) {
      BlockState::Func | BlockState::FuncLoop => {}
      _ => self.error("return", "found in a block without func", tok.span),
    }
    let value = if self.current().is(TokenKind::Tok_Semicolon)
      || self.current().is(TokenKind::Brk_CurlyR)
      || self.current().is(TokenKind::Tok_Eof)
    {
      None
    } else {
      Some(self.expression()?)
    };
    let end = value.as_ref().map(|v| v.span).unwrap_or(tok.span);
    self.bump_if(TokenKind::Tok_Semicolon);
    Some(ast::return_stmt(tok.span.join(end), value))
  }

  fn func_stmt(&mut self) -> Option<Stmt<'src>> {
    let start = self.bump().span;
    if self.blocks.state(self.block) != BlockState::Global {
      self.error("func", "inside another other block", start);
    }
    let name = self.ident()?;
    if self.blocks.func_is_locally_bound(self.block, name.as_ref()) {
      self.error(
        name.as_ref().to_string(),
        "redefinition of function",
        name.span,
      );
    }
    self.expect(TokenKind::Brk_ParenL, "`(`")?;
    let mut params: Vec<Ident<'src>> = Vec::new();
    if !self.current().is(TokenKind::Brk_ParenR) {
      loop {
        let param = self.ident()?;
        if params.iter().any(|p| p.as_ref() == param.as_ref()) {
          self.error(
            param.as_ref().to_string(),
            "duplicate parameter name",
            param.span,
          );
        }
        params.push(param);
        if !self.bump_if(TokenKind::Tok_Comma) {
          break;
        }
      }
    }
    self.expect(TokenKind::Brk_ParenR, "`)`")?;
    self.expect(TokenKind::Brk_CurlyL, "`{`")?;
    let body_block = self.blocks.child(self.block, BlockState::Func);
    let parent_block = self.block;
    let body = self.enter(body_block, |p| p.stmt_chain(TokenKind::Brk_CurlyR));
    self.expect(TokenKind::Brk_CurlyR, "`}`")?;
    let end = self.previous().span;

    let function = Rc::new(ast::Function {
      name: name.clone(),
      params,
      body,
      body_block,
      parent_block,
    });
    self
      .blocks
      .func_set_offset(self.block, function.name.as_ref(), function.clone());
    Some(ast::function_stmt(start.join(end), function))
  }

  // --- expressions -------------------------------------------------------

  fn expression(&mut self) -> Option<ast::Expr<'src>> {
    self.check_recursion_limit()?;
    let lhs = self.unary()?;
    self.operation(MIN_PRECEDENCE, lhs)
  }

  /// Both `stmt` and `expression` recurse directly into themselves through
  /// nested blocks/parens, so a pathologically deep source can blow the
  /// native stack before any AST-level nesting limit would trip. Checked
  /// remaining stack space the same way the teacher's parser does, rather
  /// than threading an explicit depth counter through every recursive
  /// call.
  #[cfg(not(target_family = "wasm"))]
  fn check_recursion_limit(&mut self) -> Option<()> {
    const MINIMUM_STACK_REQUIRED: usize = 64_000;
    let ok = stacker::remaining_stack()
      .map(|available| available > MINIMUM_STACK_REQUIRED)
      .unwrap_or(true);
    if ok {
      Some(())
    } else {
      let span = self.current().span;
      self.error("parser", "nesting limit reached", span);
      None
    }
  }

  #[cfg(target_family = "wasm")]
  fn check_recursion_limit(&mut self) -> Option<()> {
    Some(())
  }

  /// Precedence-climbing loop: consumes operators binding at least as
  /// tightly as `prec_lhs`, recursing with `prec+1` when the operator that
  /// follows an RHS binds even tighter. The strict `<` comparison against
  /// `prec_lhs` and the `+1` on the recursive call are what make operators
  /// left-associative at equal precedence.
  fn operation(&mut self, prec_lhs: u8, mut lhs: ast::Expr<'src>) -> Option<ast::Expr<'src>> {
    loop {
      let Some(prec) = precedence(self.current().kind) else {
        return Some(lhs);
      };
      if prec < prec_lhs {
        return Some(lhs);
      }
      let op_tok = self.bump();
      let op = binary_op(op_tok.kind);
      let mut rhs = self.unary()?;
      if let Some(next_prec) = precedence(self.current().kind) {
        if next_prec > prec {
          rhs = self.operation(prec + 1, rhs)?;
        }
      }
      let span = lhs.span.join(rhs.span);
      lhs = ast::expr_operation(span, op, lhs, rhs);
    }
  }

  fn unary(&mut self) -> Option<ast::Expr<'src>> {
    match self.current().kind {
      TokenKind::Op_Bang => {
        let tok = self.bump();
        let operand = self.unary()?;
        let span = tok.span.join(operand.span);
        Some(ast::expr_unary(span, UnaryOp::Not, operand))
      }
      TokenKind::Op_Minus => {
        let tok = self.bump();
        let operand = self.unary()?;
        let span = tok.span.join(operand.span);
        Some(ast::expr_unary(span, UnaryOp::Neg, operand))
      }
      _ => self.primary(),
    }
  }

  fn primary(&mut self) -> Option<ast::Expr<'src>> {
    use TokenKind::*;
    let tok = self.current().clone();
    match tok.kind {
      Lit_Number => {
        self.bump();
        let lexeme = self.lex.lexeme(&tok);
        match lexeme.parse::<f64>() {
          Ok(value) => Some(ast::lit_double(tok.span, value)),
          Err(e) => {
            self.error("parser", format!("invalid number literal: {e}"), tok.span);
            None
          }
        }
      }
      Lit_String => {
        self.bump();
        let lexeme = self.lex.lexeme(&tok);
        let inner = &lexeme[1..lexeme.len() - 1];
        Some(ast::lit_string(tok.span, Cow::from(inner.to_owned())))
      }
      Kw_True => {
        self.bump();
        Some(ast::lit_bool(tok.span, true))
      }
      Kw_False => {
        self.bump();
        Some(ast::lit_bool(tok.span, false))
      }
      Kw_Null => {
        self.bump();
        Some(ast::lit_null(tok.span))
      }
      Brk_ParenL => {
        self.bump();
        let expr = self.expression()?;
        self.expect(Brk_ParenR, "`)`")?;
        Some(expr)
      }
      Lit_Ident => {
        let ident = self.ident()?;
        if self.current().is(Brk_ParenL) {
          self.call_expr(ident)
        } else {
          Some(ast::expr_var_val(ident, self.block))
        }
      }
      _ => {
        self.error(
          "parser",
          format!("expected an expression, found {}", tok.kind.describe()),
          tok.span,
        );
        self.recover();
        None
      }
    }
  }

  fn call_expr(&mut self, name: Ident<'src>) -> Option<ast::Expr<'src>> {
    let start = name.span;
    self.expect(TokenKind::Brk_ParenL, "`(`")?;
    let mut args = Vec::new();
    if !self.current().is(TokenKind::Brk_ParenR) {
      loop {
        args.push(self.expression()?);
        if !self.bump_if(TokenKind::Tok_Comma) {
          break;
        }
      }
    }
    self.expect(TokenKind::Brk_ParenR, "`)`")?;
    let end = self.previous().span;
    Some(ast::expr_call_func(start.join(end), name, args, self.block))
  }
}

const MIN_PRECEDENCE: u8 = 0;

fn precedence(kind: TokenKind) -> Option<u8> {
  use TokenKind::*;
  match kind {
    Op_AndAnd | Op_PipePipe => Some(3),
    Op_EqualEqual | Op_BangEqual | Op_Less | Op_More | Op_LessEqual | Op_MoreEqual => Some(5),
    Op_Plus | Op_Minus => Some(10),
    Op_Star | Op_Slash => Some(20),
    _ => None,
  }
}

fn binary_op(kind: TokenKind) -> BinaryOp {
  use TokenKind::*;
  match kind {
    Op_Plus => BinaryOp::Add,
    Op_Minus => BinaryOp::Sub,
    Op_Star => BinaryOp::Mul,
    Op_Slash => BinaryOp::Div,
    Op_EqualEqual => BinaryOp::Eq,
    Op_BangEqual => BinaryOp::Neq,
    Op_Less => BinaryOp::Lt,
    Op_More => BinaryOp::Gt,
    Op_LessEqual => BinaryOp::Le,
    Op_MoreEqual => BinaryOp::Ge,
    Op_AndAnd => BinaryOp::And,
    Op_PipePipe => BinaryOp::Or,
    _ => unreachable!("binary_op called with a non-operator token"),
  }
}
