//! Table-driven statement emission.
//!
//! Most C constructs (control flow, operators, casts) share one emission
//! shape: a fixed sequence of keywords, punctuation, and evaluated
//! sub-expressions. A generator declares that sequence as an operation
//! array and this executor interprets it, which replaces dozens of
//! near-identical hand-written emitters. The `Splice` operation handles
//! variadic shapes by evaluating all remaining arguments with a custom
//! delimiter.

use std::rc::Rc;

use crate::environment::{EvaluatorContext, EvaluatorEnvironment, EvaluatorScope};
use crate::error::GenerateResult;
use crate::evaluator::{evaluate, evaluate_all};
use crate::navigator::{find_close_paren, get_argument, get_expected_argument};
use crate::output::{
  DelimiterTemplate, GeneratorOutput, OutputModifier, add_lang_token_output, add_string_output,
};
use crate::tokenizer::Token;
use crate::types::lower_type;

/// One step of a statement program.
///
/// Argument indices follow the invocation convention: 0 is the invocation
/// name, 1 is the first argument.
#[derive(Debug, Clone, Copy)]
pub enum CStatementOperation {
  /// Emit text followed by a space (and preceded by one mid-line).
  Keyword(&'static str),
  /// Emit text with no surrounding spaces.
  KeywordNoSpace(&'static str),
  OpenParen,
  CloseParen,
  OpenBlock,
  CloseBlock,
  OpenList,
  CloseList,
  /// Terminate the statement unless we are inside an expression.
  SmartEndStatement,
  /// Lower the argument as a type; arrays are not accepted here.
  TypeNoArray(usize),
  /// Evaluate the argument as an expression.
  Expression(usize),
  /// Like `Expression`, but absence is fine.
  ExpressionOptional(usize),
  /// Evaluate all arguments from the index on, comma-separated.
  ExpressionList(usize),
  /// Evaluate all arguments from the index on with a custom separator
  /// surrounded by spaces.
  Splice(usize, &'static str),
  /// `Splice` without the surrounding spaces.
  SpliceNoSpace(usize, &'static str),
  /// Evaluate all arguments from the index on as body statements.
  Body(usize),
}

/// Interpret `operations` against the invocation at `start`.
pub fn run_statement_program(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  tokens: &Rc<Vec<Token>>,
  start: usize,
  operations: &[CStatementOperation],
  output: &mut GeneratorOutput,
) -> GenerateResult<()> {
  let end = find_close_paren(tokens, start)?;
  let name_token = &tokens[start + 1];

  for operation in operations {
    match *operation {
      CStatementOperation::Keyword(keyword) => {
        add_string_output(
          &mut output.source,
          keyword,
          OutputModifier::SPACE_BEFORE | OutputModifier::SPACE_AFTER,
          name_token,
        );
      }
      CStatementOperation::KeywordNoSpace(keyword) => {
        add_string_output(&mut output.source, keyword, OutputModifier::empty(), name_token);
      }
      CStatementOperation::OpenParen => {
        add_lang_token_output(&mut output.source, OutputModifier::OPEN_PAREN, name_token);
      }
      CStatementOperation::CloseParen => {
        add_lang_token_output(&mut output.source, OutputModifier::CLOSE_PAREN, name_token);
      }
      CStatementOperation::OpenBlock => {
        add_lang_token_output(&mut output.source, OutputModifier::OPEN_BLOCK, name_token);
      }
      CStatementOperation::CloseBlock => {
        add_lang_token_output(&mut output.source, OutputModifier::CLOSE_BLOCK, name_token);
      }
      CStatementOperation::OpenList => {
        add_lang_token_output(&mut output.source, OutputModifier::OPEN_LIST, name_token);
      }
      CStatementOperation::CloseList => {
        add_lang_token_output(&mut output.source, OutputModifier::CLOSE_LIST, name_token);
      }
      CStatementOperation::SmartEndStatement => {
        if context.scope != EvaluatorScope::ExpressionsOnly {
          add_lang_token_output(&mut output.source, OutputModifier::END_STATEMENT, name_token);
        }
      }
      CStatementOperation::TypeNoArray(argument_index) => {
        let type_index =
          get_expected_argument("expected a type", tokens, start, argument_index, end)?;
        let mut type_output = Vec::new();
        let mut after_name_output = Vec::new();
        lower_type(tokens, type_index, false, &mut type_output, &mut after_name_output)?;
        output.source.append(&mut type_output);
      }
      CStatementOperation::Expression(argument_index) => {
        let expression_index =
          get_expected_argument("expected an expression", tokens, start, argument_index, end)?;
        let expression_context = context.with_scope(EvaluatorScope::ExpressionsOnly);
        evaluate(environment, &expression_context, tokens, expression_index, output)?;
      }
      CStatementOperation::ExpressionOptional(argument_index) => {
        let Some(expression_index) = get_argument(tokens, start, argument_index, end) else {
          continue;
        };
        let expression_context = context.with_scope(EvaluatorScope::ExpressionsOnly);
        evaluate(environment, &expression_context, tokens, expression_index, output)?;
      }
      CStatementOperation::ExpressionList(argument_index) => {
        // No arguments at all is fine: () in the output stays empty
        let Some(list_start) = get_argument(tokens, start, argument_index, end) else {
          continue;
        };
        let list_context = context.with_delimiter(
          EvaluatorScope::ExpressionsOnly,
          DelimiterTemplate::list_separator(),
        );
        evaluate_all(environment, &list_context, tokens, list_start, output)?;
      }
      CStatementOperation::Splice(argument_index, separator)
      | CStatementOperation::SpliceNoSpace(argument_index, separator) => {
        let spaced = matches!(operation, CStatementOperation::Splice(..));
        let list_start =
          get_expected_argument("expected expressions", tokens, start, argument_index, end)?;
        let splice_context = context.with_delimiter(
          EvaluatorScope::ExpressionsOnly,
          DelimiterTemplate::splice_separator(separator, spaced),
        );
        evaluate_all(environment, &splice_context, tokens, list_start, output)?;
      }
      CStatementOperation::Body(argument_index) => {
        let body_start =
          get_expected_argument("expected a body", tokens, start, argument_index, end)?;
        // Statements handle their own terminators; no delimiter
        let body_context = context.with_scope(EvaluatorScope::Body);
        evaluate_all(environment, &body_context, tokens, body_start, output)?;
      }
    }
  }

  Ok(())
}
