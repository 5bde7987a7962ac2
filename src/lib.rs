//! Crate root: wires together the generation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `tokenizer` performs lexical analysis and produces a flat token vector.
//! - `navigator` provides index-based traversal over that vector; the token
//!   list is the tree, and no intermediate AST is ever built.
//! - `evaluator` dispatches invocations to `generators`, which use the
//!   `signature`, `types`, and `statement` machinery to append emission
//!   records to a `GeneratorOutput`.
//! - `writer` serializes the source and header record sequences to C text.
//! - `environment` holds the state that outlives a single generation, and
//!   `cloner` can reconstruct recorded definitions with their macro
//!   expansions re-applied.
//! - `error` centralises the diagnostics shared by the other modules.

pub mod cloner;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod generators;
pub mod navigator;
pub mod output;
pub mod signature;
pub mod statement;
pub mod tokenizer;
pub mod types;
pub mod writer;

use std::rc::Rc;

use crate::environment::EvaluatorContext;
use crate::output::GeneratorOutput;
use crate::tokenizer::TokenKind;
use crate::writer::WriterSettings;

pub use crate::error::{GenerateError, GenerateResult};

/// The generated translation unit: C source text plus its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspiledOutput {
  pub source: String,
  pub header: String,
}

/// Transpile a source string into C source and header text.
pub fn transpile(source: &str, file_name: &str) -> GenerateResult<TranspiledOutput> {
  transpile_with_settings(source, file_name, &WriterSettings::default())
}

/// [`transpile`] with control over output formatting.
pub fn transpile_with_settings(
  source: &str,
  file_name: &str,
  settings: &WriterSettings,
) -> GenerateResult<TranspiledOutput> {
  let tokens = Rc::new(tokenizer::tokenize(source, file_name)?);
  let mut environment = generators::default_environment();
  let context = EvaluatorContext::module();
  let mut output = GeneratorOutput::default();

  let mut current = 0;
  while current < tokens.len() {
    if tokens[current].kind != TokenKind::OpenParen {
      return Err(GenerateError::at_token(
        &tokens[current],
        "only invocations can appear at module scope",
      ));
    }
    evaluator::evaluate(&mut environment, &context, &tokens, current, &mut output)?;
    current = navigator::find_expression_end(&tokens, current) + 1;
  }

  Ok(TranspiledOutput {
    source: writer::write_source(&output, settings),
    header: writer::write_header(&output, settings),
  })
}
