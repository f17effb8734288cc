//! The lexical block/scope tree.
//!
//! Blocks form a tree with non-owning parent back-references. Rather than
//! give children `Rc` handles to their parent (what the original did) or
//! reach for `Rc<RefCell<_>>` to get mutable shared ownership, the tree is
//! stored as an arena: blocks are addressed by [`BlockId`], a plain index
//! into a `Vec`, so there is no cycle to worry about and no interior
//! mutability needed at the node level.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Function;

pub type BlockId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
  Global,
  Func,
  FuncLoop,
  Loop,
  Common,
}

struct Block<'src> {
  parent: Option<BlockId>,
  state: BlockState,
  offsets: HashMap<String, usize>,
  funcs: HashMap<String, Rc<Function<'src>>>,
}

/// Owns every block created while parsing a single source. Blocks never
/// outlive the tree and are never removed from it.
pub struct BlockTree<'src> {
  blocks: Vec<Block<'src>>,
}

impl<'src> BlockTree<'src> {
  pub fn new() -> Self {
    BlockTree {
      blocks: vec![Block {
        parent: None,
        state: BlockState::Global,
        offsets: HashMap::new(),
        funcs: HashMap::new(),
      }],
    }
  }

  pub fn root(&self) -> BlockId {
    0
  }

  pub fn child(&mut self, parent: BlockId, state: BlockState) -> BlockId {
    self.blocks.push(Block {
      parent: Some(parent),
      state,
      offsets: HashMap::new(),
      funcs: HashMap::new(),
    });
    self.blocks.len() - 1
  }

  pub fn state(&self, id: BlockId) -> BlockState {
    self.blocks[id].state
  }

  pub fn set_state(&mut self, id: BlockId, state: BlockState) {
    self.blocks[id].state = state;
  }

  pub fn parent(&self, id: BlockId) -> Option<BlockId> {
    self.blocks[id].parent
  }

  /// Sets `name`'s offset in `id` to `stack_len`, the current size of the
  /// runtime value stack at the point of declaration, and returns it.
  pub fn set_offset(&mut self, id: BlockId, name: &str, stack_len: usize) -> usize {
    self.blocks[id].offsets.insert(name.to_owned(), stack_len);
    stack_len
  }

  /// Looks up `name` in `id`, then its parent, then its parent's parent, and
  /// so on. Returns `None` if no block in the chain binds it.
  ///
  /// The original walked into the parent, dropped that call's result, and
  /// fell through to indexing the local map — which auto-vivified a zero
  /// entry for names that were never declared locally. This returns the
  /// parent's answer directly instead of ignoring it.
  pub fn get_offset(&self, id: BlockId, name: &str) -> Option<usize> {
    let block = &self.blocks[id];
    if let Some(offset) = block.offsets.get(name) {
      return Some(*offset);
    }
    match block.parent {
      Some(parent) => self.get_offset(parent, name),
      None => None,
    }
  }

  /// True iff `name` is already bound in `id` itself (not the parent
  /// chain) — used for duplicate-declaration checks (function names,
  /// parameter names) where shadowing across blocks is allowed but
  /// redefinition within the same block is not.
  pub fn is_locally_bound(&self, id: BlockId, name: &str) -> bool {
    self.blocks[id].offsets.contains_key(name)
  }

  pub fn func_set_offset(&mut self, id: BlockId, name: &str, def: Rc<Function<'src>>) {
    self.blocks[id].funcs.insert(name.to_owned(), def);
  }

  pub fn func_get_offset(&self, id: BlockId, name: &str) -> Option<Rc<Function<'src>>> {
    let block = &self.blocks[id];
    if let Some(def) = block.funcs.get(name) {
      return Some(def.clone());
    }
    match block.parent {
      Some(parent) => self.func_get_offset(parent, name),
      None => None,
    }
  }

  pub fn func_is_locally_bound(&self, id: BlockId, name: &str) -> bool {
    self.blocks[id].funcs.contains_key(name)
  }
}

impl<'src> Default for BlockTree<'src> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_offset_walks_up_the_parent_chain() {
    let mut tree = BlockTree::new();
    let root = tree.root();
    tree.set_offset(root, "x", 0);
    let child = tree.child(root, BlockState::Common);
    assert_eq!(tree.get_offset(child, "x"), Some(0));
  }

  #[test]
  fn get_offset_does_not_auto_vivify_a_local_entry() {
    let mut tree = BlockTree::new();
    let root = tree.root();
    tree.set_offset(root, "x", 5);
    let child = tree.child(root, BlockState::Common);
    assert_eq!(tree.get_offset(child, "x"), Some(5));
    // the lookup must not have planted a zero entry locally
    assert!(!tree.is_locally_bound(child, "x"));
  }

  #[test]
  fn get_offset_returns_none_when_unbound_anywhere() {
    let tree = BlockTree::new();
    assert_eq!(tree.get_offset(tree.root(), "missing"), None);
  }

  #[test]
  fn shadowing_declares_a_new_local_offset() {
    let mut tree = BlockTree::new();
    let root = tree.root();
    tree.set_offset(root, "x", 0);
    let child = tree.child(root, BlockState::Common);
    tree.set_offset(child, "x", 3);
    assert_eq!(tree.get_offset(child, "x"), Some(3));
    assert_eq!(tree.get_offset(root, "x"), Some(0));
  }
}
