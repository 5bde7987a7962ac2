//! Reconstruction of previously-evaluated definitions.
//!
//! A recorded definition can be re-emitted in a different context with all
//! of its macro invocations already replaced by their recorded expansions.
//! Expansion sites are located by token *identity* (same shared vector,
//! same index), never by textual comparison, so a definition containing
//! two identical-looking invocations only expands the one the macro
//! runtime actually recorded.
//!
//! Also home to compile-time signature matching: checking a user-written
//! argument list against an expected token signature where `'name`
//! placeholders match any spelling.

use std::rc::Rc;

use tracing::warn;

use crate::environment::{EvaluatorEnvironment, MacroExpansion, ObjectDefinition, ObjectKind, object_kind_name};
use crate::error::{GenerateError, GenerateResult};
use crate::navigator::find_expression_end;
use crate::tokenizer::Token;

fn copy_tokens_with_expansions(
  tokens: &Rc<Vec<Token>>,
  start: usize,
  end_inclusive: usize,
  expansions: &[MacroExpansion],
  out: &mut Vec<Token>,
) {
  let mut current = start;
  while current <= end_inclusive {
    let matched = expansions
      .iter()
      .find(|expansion| expansion.at.refers_to(tokens, current));

    match matched {
      Some(expansion) => {
        if !expansion.tokens.is_empty() {
          out.reserve(expansion.tokens.len());
          // The expansion may itself contain recorded invocations
          copy_tokens_with_expansions(
            &expansion.tokens,
            0,
            expansion.tokens.len() - 1,
            expansions,
            out,
          );
        }
        // Skip the original invocation; the expansion replaced it
        current = find_expression_end(tokens, current) + 1;
      }
      None => {
        out.push(tokens[current].clone());
        current += 1;
      }
    }
  }
}

/// Copy a definition's token range with its macro expansions re-applied.
///
/// Only function and variable definitions record enough to be copied; for
/// any other kind this is a safety check, not a silent no-op.
pub fn clone_definition_with_expansions(
  definition: &ObjectDefinition,
) -> GenerateResult<Vec<Token>> {
  if !matches!(definition.kind, ObjectKind::Function | ObjectKind::Variable) {
    warn!(
      "definition copying is not supported for {} definitions; ensure the kind tracks its \
       macro expansions and records its invocation token before adding it here",
      object_kind_name(definition.kind)
    );
    return Err(GenerateError::unsupported(format!(
      "cannot copy a {} definition",
      object_kind_name(definition.kind)
    )));
  }

  let Some(invocation) = &definition.invocation else {
    return Err(GenerateError::unsupported(
      "definition did not record its invocation token, which copying requires",
    ));
  };

  let end = find_expression_end(&invocation.tokens, invocation.index);

  // The copy may grow or shrink depending on what the macros produced
  let mut out = Vec::with_capacity(end - invocation.index + 1);
  copy_tokens_with_expansions(
    &invocation.tokens,
    invocation.index,
    end,
    &definition.macro_expansions,
    &mut out,
  );
  Ok(out)
}

/// Check a user argument list against an expected compile-time function
/// signature. Expected Symbols starting with `'` are positional
/// placeholders whose spelling need not match.
pub fn compile_time_signature_matches(
  environment: &EvaluatorEnvironment,
  error_token: &Token,
  function_name: &str,
  expected_signature: &[Token],
) -> GenerateResult<()> {
  let Some(user_signature) = environment
    .compile_time_function_signatures
    .get(function_name)
  else {
    return Err(GenerateError::at_token(
      error_token,
      format!("no signature metadata recorded for {function_name}; internal code error"),
    ));
  };

  if user_signature.len() != expected_signature.len() {
    let blame = user_signature.first().unwrap_or(error_token);
    return Err(GenerateError::at_token(
      blame,
      format!(
        "arguments do not match the expected signature: {} tokens provided, {} expected",
        user_signature.len(),
        expected_signature.len()
      ),
    ));
  }

  for (user_token, expected_token) in user_signature.iter().zip(expected_signature) {
    // Placeholder names match any spelling
    if expected_token.contents.starts_with('\'') {
      continue;
    }
    if user_token.kind != expected_token.kind || user_token.contents != expected_token.contents {
      return Err(GenerateError::at_token(
        user_token,
        format!(
          "argument does not match the expected signature (wanted {}, ' = name need not match)",
          expected_token.contents
        ),
      ));
    }
  }

  Ok(())
}
