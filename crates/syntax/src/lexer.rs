#![allow(non_camel_case_types)]

use std::borrow::Borrow;
use std::mem::discriminant;
use std::ops::Range;

use logos::Logos;
use span::Span;

/// A single scanned token. Unlike the side-channel-buffer design this
/// replaces, the payload lives inline on the token's span: the parser slices
/// the lexeme out of the source immediately, so there is nothing left to
/// stomp on the next `bump`.
#[derive(Clone, Debug)]
pub struct Token {
  pub kind: TokenKind,
  pub span: Span,
}

impl Token {
  pub fn is(&self, kind: impl Borrow<TokenKind>) -> bool {
    discriminant(&self.kind) == discriminant(kind.borrow())
  }
}

/// Single-token-lookahead lexer: `current()` is always available, `bump()`
/// advances and returns what was previously current.
pub struct Lexer<'src> {
  src: &'src str,
  inner: logos::Lexer<'src, TokenKind>,
  previous: Token,
  current: Token,
  eof: Token,
}

impl<'src> Lexer<'src> {
  pub fn new(src: &'src str) -> Self {
    let end = src.len();
    let eof = Token {
      kind: TokenKind::Tok_Eof,
      span: (end..end).into(),
    };

    let mut lex = Self {
      src,
      inner: TokenKind::lexer(src),
      previous: eof.clone(),
      current: eof.clone(),
      eof,
    };
    lex.bump();
    lex
  }

  #[inline]
  pub fn previous(&self) -> &Token {
    &self.previous
  }

  #[inline]
  pub fn current(&self) -> &Token {
    &self.current
  }

  #[inline]
  pub fn lexeme(&self, token: &Token) -> &'src str {
    &self.src[Range::from(token.span)]
  }

  #[inline]
  pub fn bump(&mut self) -> Token {
    let next = self.next_token().unwrap_or_else(|| self.eof.clone());
    let consumed = std::mem::replace(&mut self.current, next);
    self.previous = consumed.clone();
    consumed
  }

  fn next_token(&mut self) -> Option<Token> {
    let lexer = &mut self.inner;
    while let Some(kind) = lexer.next() {
      let span = lexer.span().into();
      match kind {
        TokenKind::_Tok_Whitespace | TokenKind::_Tok_Comment => {}
        _ => return Some(Token { kind, span }),
      }
    }
    None
  }
}

#[derive(Clone, Copy, Debug, Logos, PartialEq, Eq)]
pub enum TokenKind {
  // Keywords
  #[token("var")]
  Kw_Var,
  #[token("print")]
  Kw_Print,
  #[token("if")]
  Kw_If,
  #[token("else")]
  Kw_Else,
  #[token("while")]
  Kw_While,
  #[token("for")]
  Kw_For,
  #[token("break")]
  Kw_Break,
  #[token("return")]
  Kw_Return,
  #[token("func")]
  Kw_Func,
  #[token("true")]
  Kw_True,
  #[token("false")]
  Kw_False,
  #[token("null")]
  Kw_Null,

  // Punctuation and brackets
  #[token("(")]
  Brk_ParenL,
  #[token(")")]
  Brk_ParenR,
  #[token("{")]
  Brk_CurlyL,
  #[token("}")]
  Brk_CurlyR,
  #[token(",")]
  Tok_Comma,
  #[token(";")]
  Tok_Semicolon,

  // Operators, longest-match-first so `==` doesn't lex as `=` `=`
  #[token("==")]
  Op_EqualEqual,
  #[token("=")]
  Op_Equal,
  #[token("!=")]
  Op_BangEqual,
  #[token("!")]
  Op_Bang,
  #[token("<=")]
  Op_LessEqual,
  #[token("<")]
  Op_Less,
  #[token(">=")]
  Op_MoreEqual,
  #[token(">")]
  Op_More,
  #[token("&&")]
  Op_AndAnd,
  #[token("||")]
  Op_PipePipe,
  #[token("+")]
  Op_Plus,
  #[token("-")]
  Op_Minus,
  #[token("*")]
  Op_Star,
  #[token("/")]
  Op_Slash,

  // Literals
  #[regex(r"[0-9]+(\.[0-9]+)?")]
  Lit_Number,
  #[regex(r#""([^"\\]|\\.)*""#)]
  Lit_String,
  #[regex("[A-Za-z_][A-Za-z0-9_]*")]
  Lit_Ident,

  #[doc(hidden)]
  #[regex(r"[ \t\n\r]+")]
  _Tok_Whitespace,
  #[doc(hidden)]
  #[regex(r"//[^\n]*")]
  _Tok_Comment,

  #[error]
  Tok_Error,
  Tok_Eof,
}

impl TokenKind {
  pub fn describe(self) -> &'static str {
    use TokenKind::*;
    match self {
      Kw_Var => "`var`",
      Kw_Print => "`print`",
      Kw_If => "`if`",
      Kw_Else => "`else`",
      Kw_While => "`while`",
      Kw_For => "`for`",
      Kw_Break => "`break`",
      Kw_Return => "`return`",
      Kw_Func => "`func`",
      Kw_True => "`true`",
      Kw_False => "`false`",
      Kw_Null => "`null`",
      Brk_ParenL => "`(`",
      Brk_ParenR => "`)`",
      Brk_CurlyL => "`{`",
      Brk_CurlyR => "`}`",
      Tok_Comma => "`,`",
      Tok_Semicolon => "`;`",
      Op_EqualEqual => "`==`",
      Op_Equal => "`=`",
      Op_BangEqual => "`!=`",
      Op_Bang => "`!`",
      Op_LessEqual => "`<=`",
      Op_Less => "`<`",
      Op_MoreEqual => "`>=`",
      Op_More => "`>`",
      Op_AndAnd => "`&&`",
      Op_PipePipe => "`||`",
      Op_Plus => "`+`",
      Op_Minus => "`-`",
      Op_Star => "`*`",
      Op_Slash => "`/`",
      Lit_Number => "a number",
      Lit_String => "a string",
      Lit_Ident => "an identifier",
      _Tok_Whitespace | _Tok_Comment => "whitespace",
      Tok_Error => "an invalid token",
      Tok_Eof => "end of input",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    let mut lex = Lexer::new(src);
    let mut out = Vec::new();
    loop {
      let tok = lex.bump();
      let is_eof = tok.is(TokenKind::Tok_Eof);
      out.push(tok.kind);
      if is_eof {
        break;
      }
    }
    out
  }

  #[test]
  fn lexes_keywords_and_identifiers() {
    use TokenKind::*;
    assert_eq!(
      kinds("var print if else while for break return func true false null x"),
      vec![
        Kw_Var, Kw_Print, Kw_If, Kw_Else, Kw_While, Kw_For, Kw_Break, Kw_Return, Kw_Func, Kw_True,
        Kw_False, Kw_Null, Lit_Ident, Tok_Eof,
      ]
    );
  }

  #[test]
  fn lexes_operators_longest_match_first() {
    use TokenKind::*;
    assert_eq!(
      kinds("== = != ! <= < >= > && || + - * /"),
      vec![
        Op_EqualEqual,
        Op_Equal,
        Op_BangEqual,
        Op_Bang,
        Op_LessEqual,
        Op_Less,
        Op_MoreEqual,
        Op_More,
        Op_AndAnd,
        Op_PipePipe,
        Op_Plus,
        Op_Minus,
        Op_Star,
        Op_Slash,
        Tok_Eof,
      ]
    );
  }

  #[test]
  fn skips_whitespace_and_line_comments() {
    use TokenKind::*;
    assert_eq!(
      kinds("x // a comment\n  y"),
      vec![Lit_Ident, Lit_Ident, Tok_Eof]
    );
  }

  #[test]
  fn lexes_number_and_string_literals() {
    use TokenKind::*;
    assert_eq!(
      kinds(r#"1 3.14 "hi""#),
      vec![Lit_Number, Lit_Number, Lit_String, Tok_Eof]
    );
  }

  #[test]
  fn illegal_character_becomes_error_token() {
    use TokenKind::*;
    assert_eq!(kinds("@"), vec![Tok_Error, Tok_Eof]);
  }

  #[test]
  fn lexer_is_deterministic() {
    let src = "var x = 1 + 2 * 3; print(x);";
    let a: Vec<_> = kinds(src);
    let b: Vec<_> = kinds(src);
    assert_eq!(a, b);
  }
}

