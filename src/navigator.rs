//! Traversal primitives over the flat token vector.
//!
//! There is no materialized syntax tree: the token list *is* the tree, and
//! these helpers walk it by index. Nested parenthesized groups are skipped
//! as single units when counting or stepping over arguments. None of these
//! routines emit output.
//!
//! The tokenizer guarantees balanced parentheses, so the scanning helpers
//! trust that invariant instead of re-validating every range.

use tracing::warn;

use crate::environment::{EvaluatorContext, EvaluatorScope, scope_name};
use crate::error::{GenerateError, GenerateResult};
use crate::tokenizer::{Token, TokenKind, token_kind_name};

/// Depth-tracking scan for the close paren matching `tokens[start]`.
///
/// Assumes balance; returns `tokens.len()` if the scan falls off the end.
fn scan_close_paren(tokens: &[Token], start: usize) -> usize {
  let mut depth = 0;
  for (offset, token) in tokens[start..].iter().enumerate() {
    match token.kind {
      TokenKind::OpenParen => depth += 1,
      TokenKind::CloseParen => depth -= 1,
      _ => {}
    }
    if depth == 0 {
      return start + offset;
    }
  }
  tokens.len()
}

/// Index of the close paren matching the open paren at `start`.
///
/// Misuse (pointing at anything but an open paren) is a hard error rather
/// than a warn-and-scan.
pub fn find_close_paren(tokens: &[Token], start: usize) -> GenerateResult<usize> {
  if tokens[start].kind != TokenKind::OpenParen {
    return Err(GenerateError::internal(format!(
      "find_close_paren must start on an open parenthesis, got {}",
      token_kind_name(tokens[start].kind)
    )));
  }
  Ok(scan_close_paren(tokens, start))
}

/// Index of the matching close paren, or `start` itself for a non-paren
/// expression (a lone symbol or string is its own end).
pub fn find_expression_end(tokens: &[Token], start: usize) -> usize {
  if tokens[start].kind != TokenKind::OpenParen {
    return start;
  }
  scan_close_paren(tokens, start)
}

/// Token index of the n-th top-level argument of the invocation at
/// `start`. Argument 0 is the invocation name; nested groups count as one.
pub fn get_argument(
  tokens: &[Token],
  start: usize,
  desired_argument: usize,
  end: usize,
) -> Option<usize> {
  let mut current_argument = 0;
  let mut i = start + 1;
  while i < end {
    if current_argument == desired_argument {
      return Some(i);
    }
    if tokens[i].kind == TokenKind::OpenParen {
      i = scan_close_paren(tokens, i);
    }
    i += 1;
    current_argument += 1;
  }
  None
}

/// Like [`get_argument`], but a missing argument is an error blamed on the
/// invocation's close paren.
pub fn get_expected_argument(
  message: &str,
  tokens: &[Token],
  start: usize,
  desired_argument: usize,
  end: usize,
) -> GenerateResult<usize> {
  get_argument(tokens, start, desired_argument, end)
    .ok_or_else(|| GenerateError::at_token(&tokens[end], format!("missing arguments: {message}")))
}

/// Count of top-level children including the invocation name.
pub fn get_num_arguments(tokens: &[Token], start: usize, end: usize) -> usize {
  let mut count = 0;
  let mut i = start + 1;
  while i < end {
    if tokens[i].kind == TokenKind::OpenParen {
      i = scan_close_paren(tokens, i);
    }
    i += 1;
    count += 1;
  }
  count
}

/// Arity check; the count includes the invocation name as argument zero.
pub fn expect_num_arguments(
  tokens: &[Token],
  start: usize,
  end: usize,
  expected: usize,
) -> GenerateResult<()> {
  let num_arguments = get_num_arguments(tokens, start, end);
  if num_arguments != expected {
    return Err(GenerateError::arity_at(
      &tokens[start],
      format!(
        "expected {expected} arguments, got {num_arguments} (counts include the invocation name)"
      ),
    ));
  }
  Ok(())
}

/// First token of the argument following the one starting at `current`.
pub fn get_next_argument(tokens: &[Token], current: usize) -> usize {
  let mut next = current;
  if tokens[current].kind == TokenKind::OpenParen {
    next = scan_close_paren(tokens, current);
  }
  next + 1
}

/// True iff the argument starting at `current` has no top-level successor
/// before `end`.
pub fn is_last_argument(tokens: &[Token], current: usize, end: usize) -> bool {
  get_next_argument(tokens, current) >= end
}

/// Skip a `(scope ...)` or `(block ...)` wrapper when the caller has
/// already opened its own block. Returns the index of the wrapper's first
/// inner token, or `start` unchanged when there is no wrapper.
pub fn block_absorb_scope(tokens: &[Token], start: usize) -> usize {
  if tokens[start].kind == TokenKind::OpenParen
    && matches!(tokens[start + 1].contents.as_str(), "scope" | "block")
  {
    return start + 2;
  }
  start
}

/// Symbols starting with `:`, `&`, or `'` are sentinels or placeholders,
/// not identifiers. Single-character `:` and `&` stay usable as names.
pub fn is_special_symbol(token: &Token) -> bool {
  if token.kind != TokenKind::Symbol {
    warn!(
      "is_special_symbol called on a {} token",
      token_kind_name(token.kind)
    );
    return false;
  }
  token.contents.len() > 1 && matches!(token.contents.as_bytes()[0], b':' | b'&' | b'\'')
}

/// Error unless `token` has the expected kind.
pub fn expect_token_kind(
  generator_name: &str,
  token: &Token,
  expected: TokenKind,
) -> GenerateResult<()> {
  if token.kind != expected {
    return Err(GenerateError::at_token(
      token,
      format!(
        "{generator_name} expected {}, but got {}",
        token_kind_name(expected),
        token_kind_name(token.kind)
      ),
    ));
  }
  Ok(())
}

/// Error if `index` has run past the invocation's close paren; used to
/// require that another argument follows.
pub fn expect_in_invocation(
  message: &str,
  tokens: &[Token],
  index: usize,
  end_invocation: usize,
) -> GenerateResult<()> {
  if index >= end_invocation {
    return Err(GenerateError::at_token(&tokens[end_invocation], message));
  }
  Ok(())
}

/// Error unless the context is in the expected scope.
pub fn expect_evaluator_scope(
  generator_name: &str,
  token: &Token,
  context: &EvaluatorContext,
  expected: EvaluatorScope,
) -> GenerateResult<()> {
  if context.scope != expected {
    return Err(GenerateError::scope_at(
      token,
      format!(
        "{generator_name} must be invoked in {} scope, but is in {} scope",
        scope_name(expected),
        scope_name(context.scope)
      ),
    ));
  }
  Ok(())
}

/// Error if the context is in the named forbidden scope.
pub fn require_scope_not(
  generator_name: &str,
  token: &Token,
  context: &EvaluatorContext,
  forbidden: EvaluatorScope,
) -> GenerateResult<()> {
  if context.scope == forbidden {
    return Err(GenerateError::scope_at(
      token,
      format!(
        "{generator_name} cannot be invoked in {} scope",
        scope_name(forbidden)
      ),
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  fn tokens_of(source: &str) -> Vec<Token> {
    tokenize(source, "test.psp").unwrap()
  }

  #[test]
  fn close_paren_matches_over_nesting() {
    let tokens = tokens_of("(a (b (c)) d)");
    assert_eq!(find_close_paren(&tokens, 0).unwrap(), tokens.len() - 1);
    assert_eq!(find_close_paren(&tokens, 2).unwrap(), 7);
    assert_eq!(find_close_paren(&tokens, 4).unwrap(), 6);
  }

  #[test]
  fn close_paren_rejects_non_paren_start() {
    let tokens = tokens_of("(a b)");
    assert!(find_close_paren(&tokens, 1).is_err());
  }

  #[test]
  fn expression_end_of_a_symbol_is_itself() {
    let tokens = tokens_of("(a b)");
    assert_eq!(find_expression_end(&tokens, 1), 1);
    assert_eq!(find_expression_end(&tokens, 0), 3);
  }

  #[test]
  fn arguments_walk_over_nested_groups() {
    let tokens = tokens_of("(name (x y) second third)");
    let end = find_close_paren(&tokens, 0).unwrap();

    assert_eq!(get_num_arguments(&tokens, 0, end), 4);
    assert_eq!(get_argument(&tokens, 0, 0, end), Some(1));
    assert_eq!(get_argument(&tokens, 0, 1, end), Some(2));
    assert_eq!(get_argument(&tokens, 0, 2, end), Some(6));
    assert_eq!(get_argument(&tokens, 0, 3, end), Some(7));
    assert_eq!(get_argument(&tokens, 0, 4, end), None);

    // NextArgument chains through the same indices getArgument reports
    let mut current = get_argument(&tokens, 0, 0, end).unwrap();
    for n in 1..4 {
      current = get_next_argument(&tokens, current);
      assert_eq!(Some(current), get_argument(&tokens, 0, n, end));
    }
    assert!(is_last_argument(&tokens, current, end));
    assert!(!is_last_argument(&tokens, 2, end));
  }

  #[test]
  fn empty_argument_list_has_only_the_name() {
    let tokens = tokens_of("(name)");
    let end = find_close_paren(&tokens, 0).unwrap();
    assert_eq!(get_num_arguments(&tokens, 0, end), 1);
    assert_eq!(get_argument(&tokens, 0, 1, end), None);
    assert!(get_expected_argument("expected argument", &tokens, 0, 1, end).is_err());
  }

  #[test]
  fn scope_wrappers_are_absorbed() {
    let tokens = tokens_of("(scope (do-thing))");
    assert_eq!(block_absorb_scope(&tokens, 0), 2);
    let tokens = tokens_of("(block x)");
    assert_eq!(block_absorb_scope(&tokens, 0), 2);
    let tokens = tokens_of("(while x)");
    assert_eq!(block_absorb_scope(&tokens, 0), 0);
    let tokens = tokens_of("plain");
    assert_eq!(block_absorb_scope(&tokens, 0), 0);
  }

  #[test]
  fn special_symbols_need_two_characters() {
    let tokens = tokens_of("&return 'name :keyword & : plain");
    assert!(is_special_symbol(&tokens[0]));
    assert!(is_special_symbol(&tokens[1]));
    assert!(is_special_symbol(&tokens[2]));
    assert!(!is_special_symbol(&tokens[3]));
    assert!(!is_special_symbol(&tokens[4]));
    assert!(!is_special_symbol(&tokens[5]));
  }

  #[test]
  fn non_symbols_are_never_special() {
    let tokens = tokens_of("(\"text\")");
    assert!(!is_special_symbol(&tokens[0]));
    assert!(!is_special_symbol(&tokens[1]));
  }

  #[test]
  fn arity_errors_blame_the_invocation() {
    let tokens = tokens_of("(f a b)");
    let end = find_close_paren(&tokens, 0).unwrap();
    assert!(expect_num_arguments(&tokens, 0, end, 3).is_ok());
    let err = expect_num_arguments(&tokens, 0, end, 2).unwrap_err();
    assert!(err.to_string().contains("expected 2 arguments, got 3"));
  }
}
