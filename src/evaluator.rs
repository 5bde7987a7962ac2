//! Dispatch of token expressions to generators.
//!
//! An invocation's name selects a generator from the environment's
//! registry; unknown names fall through to the function-invocation
//! generator so any `(some-function ...)` form emits a C call. Bare
//! symbols and strings evaluate to identifier references and string
//! literals.

use std::rc::Rc;

use crate::environment::{EvaluatorContext, EvaluatorEnvironment};
use crate::error::{GenerateError, GenerateResult};
use crate::generators::generate_function_invocation;
use crate::navigator::{expect_token_kind, get_next_argument, is_special_symbol};
use crate::output::{GeneratorOutput, OutputModifier, add_string_output};
use crate::tokenizer::{Token, TokenKind};

fn is_numeric_literal(contents: &str) -> bool {
  let bytes = contents.as_bytes();
  match bytes.first() {
    Some(b'0'..=b'9') => true,
    Some(b'-') => bytes.get(1).is_some_and(|c| c.is_ascii_digit()),
    _ => false,
  }
}

/// Evaluate the single expression starting at `start`.
pub fn evaluate(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  tokens: &Rc<Vec<Token>>,
  start: usize,
  output: &mut GeneratorOutput,
) -> GenerateResult<()> {
  let token = &tokens[start];
  match token.kind {
    TokenKind::OpenParen => {
      let name_token = &tokens[start + 1];
      expect_token_kind("invocation", name_token, TokenKind::Symbol)?;

      if let Some(&generator) = environment.generators.get(&name_token.contents) {
        return generator(environment, context, tokens, start, output);
      }
      generate_function_invocation(environment, context, tokens, start, output)
    }
    TokenKind::CloseParen => Err(GenerateError::internal(format!(
      "{}:{}:{}: evaluate started on a close parenthesis",
      token.file_name, token.line, token.column
    ))),
    TokenKind::Symbol => {
      if is_special_symbol(token) {
        return Err(GenerateError::at_token(
          token,
          format!("{} is a sentinel and cannot be evaluated on its own", token.contents),
        ));
      }
      // Numeric constants pass through untouched; identifiers get
      // lisp-case conversion at write time
      let modifiers = if is_numeric_literal(&token.contents) {
        OutputModifier::empty()
      } else {
        OutputModifier::CONVERT_VARIABLE_NAME
      };
      add_string_output(&mut output.source, token.contents.clone(), modifiers, token);
      Ok(())
    }
    TokenKind::String => {
      add_string_output(
        &mut output.source,
        format!("\"{}\"", token.contents),
        OutputModifier::empty(),
        token,
      );
      Ok(())
    }
  }
}

/// Evaluate every top-level sibling from `start` up to the enclosing close
/// paren (or end of input), inserting the context's delimiter template
/// between items.
pub fn evaluate_all(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  tokens: &Rc<Vec<Token>>,
  start: usize,
  output: &mut GeneratorOutput,
) -> GenerateResult<()> {
  let mut current = start;
  while current < tokens.len() && tokens[current].kind != TokenKind::CloseParen {
    if current != start
      && let Some(delimiter) = &context.delimiter_template
    {
      output.source.push(delimiter.instantiate(&tokens[current]));
    }

    evaluate(environment, context, tokens, current, output)?;
    current = get_next_argument(tokens, current);
  }
  Ok(())
}
