pub mod ast;
pub mod block;
pub mod lexer;
pub mod parser;

use block::BlockTree;

/// The result of parsing a whole source file: its top-level statement chain
/// plus the block tree built alongside it. Both outlive parsing and are
/// handed to the evaluator together, since AST nodes only reference blocks
/// by id rather than owning them.
pub struct Program<'src> {
  pub body: Option<ast::Stmt<'src>>,
  pub blocks: BlockTree<'src>,
}

pub fn parse<'src>(src: &'src str, errors: &mut diag::ErrorLog) -> Program<'src> {
  parser::parse(src, errors)
}
