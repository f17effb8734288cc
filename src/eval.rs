//! Tree-walking evaluator (§4.4's codegen contract realised directly over
//! the AST instead of compiled to bytecode first).
//!
//! Every expression pushes exactly one net value onto the shared
//! [`Calculus`] stack; operators are dispatched to `Calculus` methods that
//! pop their operands off that same stack, so the stack slots a variable
//! declaration leaves behind are addressed the same way whether they hold
//! a local or an intermediate value.

use std::rc::Rc;

use diag::ErrorLog;
use syntax::ast::{
  self, BinaryOp, CallFunc, Expr, ExprKind, For, Function, If, Literal, Stmt, StmtKind, Unary,
  UnaryOp, VarDecl, VarDeclKind, VarVal, While,
};
use syntax::block::BlockTree;

use crate::calculus::{Calculus, Value};

/// What a statement did to the surrounding control flow. Propagated up
/// through `Inside` chains so a `break`/`return` partway through a block
/// skips the rest of it.
pub enum Flow {
  Normal,
  Break,
  Return(Value),
}

/// Owns the value stack and the block tree built at parse time; walks the
/// AST against both. `'src` ties the evaluator to the lifetime of the
/// source text the parsed [`syntax::Program`] borrowed from.
pub struct Evaluator<'src> {
  calc: Calculus,
  blocks: BlockTree<'src>,
}

impl<'src> Evaluator<'src> {
  pub fn new(blocks: BlockTree<'src>) -> Self {
    Evaluator {
      calc: Calculus::new(),
      blocks,
    }
  }

  pub fn run(&mut self, body: &Option<Stmt<'src>>, errors: &mut ErrorLog) {
    if let Some(stmt) = body {
      self.exec_stmt(stmt, errors);
    }
  }

  /// Runs `body` in its own stack region: locals it declares are released
  /// when it finishes, regardless of how it finished. Used for `if`/`while`/
  /// `for` bodies, which own a dedicated AST field and so have somewhere to
  /// hang this on. A bare `{ ... }` used as a standalone statement has no
  /// such field (the parser splices its inner chain straight into the
  /// enclosing one) and so is not scoped this way; its locals live until the
  /// enclosing function call or program exits.
  fn exec_block(&mut self, body: &Option<Stmt<'src>>, errors: &mut ErrorLog) -> Flow {
    let base = self.calc.len();
    let flow = match body {
      Some(stmt) => self.exec_stmt(stmt, errors),
      None => Flow::Normal,
    };
    self.calc.truncate(base);
    flow
  }

  fn exec_stmt(&mut self, stmt: &Stmt<'src>, errors: &mut ErrorLog) -> Flow {
    match &**stmt {
      StmtKind::Print(expr) => {
        self.eval_expr(expr, errors);
        self.calc.print_top(errors);
        Flow::Normal
      }
      StmtKind::VarDecl(decl) => {
        self.exec_var_decl(decl, errors);
        Flow::Normal
      }
      StmtKind::Expr(expr) => {
        self.eval_expr(expr, errors);
        self.calc.pop_for(errors);
        Flow::Normal
      }
      StmtKind::Inside(inside) => {
        if let Some(chain) = &inside.chain {
          match self.exec_stmt(chain, errors) {
            Flow::Normal => {}
            other => return other,
          }
        }
        self.exec_stmt(&inside.exec, errors)
      }
      StmtKind::If(if_) => self.exec_if(if_, errors),
      StmtKind::While(while_) => self.exec_while(while_, errors),
      StmtKind::For(for_) => self.exec_for(for_, errors),
      StmtKind::Break => Flow::Break,
      StmtKind::Return(value) => {
        let result = match value {
          Some(expr) => {
            self.eval_expr(expr, errors);
            self.calc.pop_for(errors)
          }
          None => Value::Null,
        };
        Flow::Return(result)
      }
      // Binds name -> definition at parse time already (see
      // `Function`'s doc comment); nothing left to do at runtime.
      StmtKind::Function(_) => Flow::Normal,
    }
  }

  fn exec_var_decl(&mut self, decl: &VarDecl<'src>, errors: &mut ErrorLog) {
    match decl.kind {
      VarDeclKind::Declare => {
        let offset = self.calc.len();
        match &decl.value {
          Some(expr) => self.eval_expr(expr, errors),
          None => self.calc.push(Value::Null),
        }
        self.blocks.set_offset(decl.block, &decl.name, offset);
      }
      VarDeclKind::Assign => {
        match &decl.value {
          Some(expr) => self.eval_expr(expr, errors),
          None => self.calc.push(Value::Null),
        }
        let value = self.calc.pop_for(errors);
        match self.blocks.get_offset(decl.block, &decl.name) {
          Some(offset) => self.calc.set(offset, value),
          None => errors.runtime_error(decl.name.as_ref(), "undefined variable"),
        }
      }
    }
  }

  fn exec_if(&mut self, if_: &If<'src>, errors: &mut ErrorLog) -> Flow {
    self.eval_expr(&if_.cond, errors);
    let cond = self.calc.pop_for(errors);
    if cond.is_truthy() {
      self.exec_block(&if_.then, errors)
    } else {
      self.exec_block(&if_.otherwise, errors)
    }
  }

  fn exec_while(&mut self, while_: &While<'src>, errors: &mut ErrorLog) -> Flow {
    loop {
      self.eval_expr(&while_.cond, errors);
      let cond = self.calc.pop_for(errors);
      if !cond.is_truthy() {
        return Flow::Normal;
      }
      match self.exec_block(&while_.body, errors) {
        Flow::Normal => {}
        Flow::Break => return Flow::Normal,
        Flow::Return(v) => return Flow::Return(v),
      }
    }
  }

  fn exec_for(&mut self, for_: &For<'src>, errors: &mut ErrorLog) -> Flow {
    if let Some(init) = &for_.init {
      match self.exec_stmt(init, errors) {
        Flow::Normal => {}
        other => return other,
      }
    }
    loop {
      if let Some(cond) = &for_.cond {
        self.eval_expr(cond, errors);
        let cond = self.calc.pop_for(errors);
        if !cond.is_truthy() {
          return Flow::Normal;
        }
      }
      match self.exec_block(&for_.body, errors) {
        Flow::Normal => {}
        Flow::Break => return Flow::Normal,
        Flow::Return(v) => return Flow::Return(v),
      }
      if let Some(iter) = &for_.iter {
        match self.exec_stmt(iter, errors) {
          Flow::Normal => {}
          other => return other,
        }
      }
    }
  }

  /// Pushes exactly one value: the expression's result. Sub-expressions
  /// push their own operands first, in evaluation order, so the operator
  /// that follows finds them in the right place on the stack.
  fn eval_expr(&mut self, expr: &Expr<'src>, errors: &mut ErrorLog) {
    match &**expr {
      ExprKind::Literal(lit) => self.calc.push(match lit {
        Literal::Double(d) => Value::Double(*d),
        Literal::String(s) => Value::String(s.to_string()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
      }),
      ExprKind::Unary(unary) => self.eval_unary(unary, errors),
      ExprKind::Operation(op) => self.eval_operation(op, errors),
      ExprKind::VarVal(var) => self.eval_var_val(var, errors),
      ExprKind::CallFunc(call) => self.eval_call(call, errors),
    }
  }

  fn eval_unary(&mut self, unary: &Unary<'src>, errors: &mut ErrorLog) {
    self.eval_expr(&unary.operand, errors);
    match unary.op {
      UnaryOp::Neg => self.calc.neg_sign(errors),
      UnaryOp::Not => self.calc.logical_not(errors),
    }
  }

  /// `&&`/`||` always evaluate both sides (§9 open question: the original
  /// does not short-circuit, and this does not introduce it).
  fn eval_operation(&mut self, op: &ast::Operation<'src>, errors: &mut ErrorLog) {
    self.eval_expr(&op.lhs, errors);
    self.eval_expr(&op.rhs, errors);
    match op.op {
      BinaryOp::Add => self.calc.add(errors),
      BinaryOp::Sub => self.calc.sub(errors),
      BinaryOp::Mul => self.calc.mul(errors),
      BinaryOp::Div => self.calc.div(errors),
      BinaryOp::Eq => self.calc.eq(errors),
      BinaryOp::Neq => self.calc.neq(errors),
      BinaryOp::Lt => self.calc.lt(errors),
      BinaryOp::Gt => self.calc.gt(errors),
      BinaryOp::Le => self.calc.le(errors),
      BinaryOp::Ge => self.calc.ge(errors),
      BinaryOp::And => self.calc.and(errors),
      BinaryOp::Or => self.calc.or(errors),
    }
  }

  fn eval_var_val(&mut self, var: &VarVal<'src>, errors: &mut ErrorLog) {
    match self.blocks.get_offset(var.block, &var.name) {
      Some(offset) => {
        let value = self.calc.get(offset).cloned().unwrap_or(Value::Null);
        self.calc.push(value);
      }
      None => {
        errors.runtime_error(var.name.as_ref(), "undefined variable");
        self.calc.push(Value::Null);
      }
    }
  }

  /// Binds arguments into the callee's own env block and runs its body.
  ///
  /// Parameter offsets live in the same `offsets` map the callee's own
  /// local declarations use, and that map is rebound on every call rather
  /// than pushed onto a fresh per-call frame. A call that recurses before
  /// the outer call returns clobbers the outer call's parameter offsets —
  /// Cobalu functions are not reentrant. Nothing in the block/offset model
  /// this is built on implies per-call frames, so this is accepted as a
  /// limitation rather than worked around with call-frame machinery the
  /// language never asked for.
  fn eval_call(&mut self, call: &CallFunc<'src>, errors: &mut ErrorLog) {
    let def = match self.blocks.func_get_offset(call.block, &call.name) {
      Some(def) => def,
      None => {
        errors.runtime_error(call.name.as_ref(), "undefined function");
        self.calc.push(Value::Null);
        return;
      }
    };

    let base = self.calc.len();
    for arg in &call.args {
      self.eval_expr(arg, errors);
    }
    let pushed = self.calc.len() - base;

    self.bind_params(&def, base, pushed, errors);

    let result = match self.exec_stmt_opt(&def.body, errors) {
      Flow::Return(v) => v,
      Flow::Normal | Flow::Break => Value::Null,
    };

    self.calc.truncate(base);
    self.calc.push(result);
  }

  fn bind_params(&mut self, def: &Rc<Function<'src>>, base: usize, pushed: usize, errors: &mut ErrorLog) {
    let wanted = def.params.len();
    if pushed < wanted {
      for _ in pushed..wanted {
        self.calc.push(Value::Null);
      }
    } else if pushed > wanted {
      self.calc.truncate(base + wanted);
    }
    for (i, param) in def.params.iter().enumerate() {
      self.blocks.set_offset(def.body_block, param, base + i);
    }
    let _ = errors;
  }

  fn exec_stmt_opt(&mut self, body: &Option<Stmt<'src>>, errors: &mut ErrorLog) -> Flow {
    match body {
      Some(stmt) => self.exec_stmt(stmt, errors),
      None => Flow::Normal,
    }
  }
}
