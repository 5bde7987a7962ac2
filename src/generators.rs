//! Builtin generators and the registry the evaluator dispatches through.
//!
//! Almost every C construct is declared as a short statement program; the
//! few that need real logic (`defun`, `var`, and the generic function-call
//! fallback) are hand-written using the same navigation and emission
//! helpers.

use std::cell::RefCell;
use std::rc::Rc;

use crate::environment::{
  EvaluatorContext, EvaluatorEnvironment, EvaluatorScope, ObjectDefinition, ObjectKind, TokenRef,
};
use crate::error::{GenerateError, GenerateResult};
use crate::evaluator::{evaluate, evaluate_all};
use crate::navigator::{
  block_absorb_scope, expect_evaluator_scope, expect_token_kind, find_close_paren, get_argument,
  get_expected_argument, get_num_arguments, is_last_argument, is_special_symbol, require_scope_not,
};
use crate::output::{
  DelimiterTemplate, GeneratorOutput, OutputModifier, add_lang_token_output, add_modifier_to_last,
  add_splice_output, add_string_output,
};
use crate::signature::{emit_arguments, emit_return_type, parse_function_signature};
use crate::statement::CStatementOperation::{
  Body, CloseBlock, CloseList, CloseParen, Expression, ExpressionList, ExpressionOptional,
  Keyword, KeywordNoSpace, OpenBlock, OpenList, OpenParen, SmartEndStatement, Splice,
  SpliceNoSpace, TypeNoArray,
};
use crate::statement::{CStatementOperation, run_statement_program};
use crate::tokenizer::{Token, TokenKind};
use crate::types::lower_type;

/// Statement programs, dispatched by invocation name.
///
/// Argument order convention: the primary operand is argument 1 and any
/// modifier comes after it, so `(set lvalue value)`, `(cast value type)`,
/// and `(at array index)` all lead with the thing being operated on.
static C_STATEMENT_TABLE: &[(&str, &[CStatementOperation])] = &[
  // Control flow
  (
    "if",
    &[
      Keyword("if"),
      OpenParen,
      Expression(1),
      CloseParen,
      OpenBlock,
      Body(2),
      CloseBlock,
    ],
  ),
  (
    "while",
    &[
      Keyword("while"),
      OpenParen,
      Expression(1),
      CloseParen,
      OpenBlock,
      Body(2),
      CloseBlock,
    ],
  ),
  ("return", &[Keyword("return"), ExpressionOptional(1), SmartEndStatement]),
  ("break", &[KeywordNoSpace("break"), SmartEndStatement]),
  ("continue", &[KeywordNoSpace("continue"), SmartEndStatement]),
  ("block", &[OpenBlock, Body(1), CloseBlock]),
  ("scope", &[OpenBlock, Body(1), CloseBlock]),
  // Assignment and access
  ("set", &[Expression(1), Keyword("="), Expression(2), SmartEndStatement]),
  ("field", &[SpliceNoSpace(1, "."), SmartEndStatement]),
  // (at array index) -> array[index]
  (
    "at",
    &[
      Expression(1),
      KeywordNoSpace("["),
      Expression(2),
      KeywordNoSpace("]"),
      SmartEndStatement,
    ],
  ),
  ("deref", &[KeywordNoSpace("*"), OpenParen, Expression(1), CloseParen]),
  ("addr", &[KeywordNoSpace("&"), OpenParen, Expression(1), CloseParen]),
  // Initializer lists
  ("array", &[OpenList, ExpressionList(1), CloseList]),
  // Type operations
  ("cast", &[OpenParen, TypeNoArray(2), CloseParen, Expression(1)]),
  ("sizeof", &[KeywordNoSpace("sizeof"), OpenParen, TypeNoArray(1), CloseParen]),
  // Unary operators
  ("not", &[KeywordNoSpace("!"), OpenParen, Expression(1), CloseParen]),
  ("negate", &[KeywordNoSpace("-"), OpenParen, Expression(1), CloseParen]),
  // Binary and variadic operators; parenthesized so nesting never relies
  // on C precedence
  ("+", &[OpenParen, Splice(1, "+"), CloseParen, SmartEndStatement]),
  ("-", &[OpenParen, Splice(1, "-"), CloseParen, SmartEndStatement]),
  ("*", &[OpenParen, Splice(1, "*"), CloseParen, SmartEndStatement]),
  ("/", &[OpenParen, Splice(1, "/"), CloseParen, SmartEndStatement]),
  ("%", &[OpenParen, Splice(1, "%"), CloseParen, SmartEndStatement]),
  ("=", &[OpenParen, Splice(1, "=="), CloseParen, SmartEndStatement]),
  ("!=", &[OpenParen, Splice(1, "!="), CloseParen, SmartEndStatement]),
  ("<", &[OpenParen, Splice(1, "<"), CloseParen, SmartEndStatement]),
  ("<=", &[OpenParen, Splice(1, "<="), CloseParen, SmartEndStatement]),
  (">", &[OpenParen, Splice(1, ">"), CloseParen, SmartEndStatement]),
  (">=", &[OpenParen, Splice(1, ">="), CloseParen, SmartEndStatement]),
  ("and", &[OpenParen, Splice(1, "&&"), CloseParen, SmartEndStatement]),
  ("or", &[OpenParen, Splice(1, "||"), CloseParen, SmartEndStatement]),
];

/// Dispatch a C-statement invocation to its operation table.
fn generate_c_statement(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  tokens: &Rc<Vec<Token>>,
  start: usize,
  output: &mut GeneratorOutput,
) -> GenerateResult<()> {
  let name_token = &tokens[start + 1];
  let operations = C_STATEMENT_TABLE
    .iter()
    .find(|(name, _)| *name == name_token.contents)
    .map(|(_, operations)| *operations)
    .ok_or_else(|| {
      GenerateError::internal(format!(
        "no statement program registered for {}",
        name_token.contents
      ))
    })?;
  run_statement_program(environment, context, tokens, start, operations, output)
}

/// `(defun name (arg type ... &return type) body...)`
///
/// Emits the declaration to the header, the definition to the source, and
/// splices a per-function body output kept alive by the environment.
pub fn generate_function_definition(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  tokens: &Rc<Vec<Token>>,
  start: usize,
  output: &mut GeneratorOutput,
) -> GenerateResult<()> {
  let end = find_close_paren(tokens, start)?;
  expect_evaluator_scope("defun", &tokens[start + 1], context, EvaluatorScope::Module)?;

  let name_index = get_expected_argument("expected a function name", tokens, start, 1, end)?;
  let name_token = &tokens[name_index];
  expect_token_kind("defun", name_token, TokenKind::Symbol)?;
  if is_special_symbol(name_token) {
    return Err(GenerateError::at_token(
      name_token,
      "function names must not be sentinels",
    ));
  }

  let args_index = get_expected_argument("expected an argument list", tokens, start, 2, end)?;
  expect_token_kind("defun", &tokens[args_index], TokenKind::OpenParen)?;
  let end_args_index = find_close_paren(tokens, args_index)?;

  let signature = parse_function_signature(tokens, args_index)?;

  if environment
    .object_definitions
    .insert(
      name_token.contents.clone(),
      ObjectDefinition::new(ObjectKind::Function, Some(TokenRef::new(tokens, start))),
    )
    .is_some()
  {
    return Err(GenerateError::at_token(
      name_token,
      format!("{} is already defined", name_token.contents),
    ));
  }

  emit_return_type(
    tokens,
    output,
    signature.return_type_start,
    start,
    end_args_index,
    true,
    true,
  )?;

  for buffer in [&mut output.source, &mut output.header] {
    add_string_output(
      buffer,
      name_token.contents.clone(),
      OutputModifier::CONVERT_FUNCTION_NAME,
      name_token,
    );
    add_lang_token_output(buffer, OutputModifier::OPEN_PAREN, name_token);
  }

  emit_arguments(tokens, output, &signature.arguments, true, true)?;

  for buffer in [&mut output.source, &mut output.header] {
    add_lang_token_output(buffer, OutputModifier::CLOSE_PAREN, name_token);
  }

  // The header only declares
  add_lang_token_output(&mut output.header, OutputModifier::END_STATEMENT, name_token);

  add_lang_token_output(&mut output.source, OutputModifier::OPEN_BLOCK, name_token);

  // The body generates into its own output, spliced between the braces.
  // The environment keeps it alive until the writer has run
  let body_output = Rc::new(RefCell::new(GeneratorOutput::default()));
  if let Some(body_start) = get_argument(tokens, start, 3, end) {
    let mut body_context = context.with_scope(EvaluatorScope::Body);
    body_context.definition_name = Some(name_token.clone());

    // A single (block ...) or (scope ...) wrapping the whole body would
    // emit doubled braces; we already opened ours
    let body_start = if is_last_argument(tokens, body_start, end) {
      block_absorb_scope(tokens, body_start)
    } else {
      body_start
    };
    evaluate_all(
      environment,
      &body_context,
      tokens,
      body_start,
      &mut body_output.borrow_mut(),
    )?;
  }
  add_splice_output(output, &body_output, name_token);
  environment.splice_outputs.push(body_output);

  add_lang_token_output(&mut output.source, OutputModifier::CLOSE_BLOCK, name_token);

  Ok(())
}

/// `(var name type)` or `(var name type initializer)`
pub fn generate_variable_declaration(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  tokens: &Rc<Vec<Token>>,
  start: usize,
  output: &mut GeneratorOutput,
) -> GenerateResult<()> {
  let end = find_close_paren(tokens, start)?;
  require_scope_not(
    "var",
    &tokens[start + 1],
    context,
    EvaluatorScope::ExpressionsOnly,
  )?;

  let num_arguments = get_num_arguments(tokens, start, end);
  if !(3..=4).contains(&num_arguments) {
    return Err(GenerateError::arity_at(
      &tokens[start],
      format!("var expects a name, a type, and an optional initializer; got {num_arguments} arguments (counts include the invocation name)"),
    ));
  }

  let name_index = get_expected_argument("expected a variable name", tokens, start, 1, end)?;
  let name_token = &tokens[name_index];
  expect_token_kind("var", name_token, TokenKind::Symbol)?;
  if is_special_symbol(name_token) {
    return Err(GenerateError::at_token(
      name_token,
      "variable names must not be sentinels",
    ));
  }

  let type_index = get_expected_argument("expected a type", tokens, start, 2, end)?;
  let mut type_output = Vec::new();
  let mut after_name_output = Vec::new();
  lower_type(tokens, type_index, true, &mut type_output, &mut after_name_output)?;
  add_modifier_to_last(&mut type_output, OutputModifier::SPACE_AFTER);

  output.source.append(&mut type_output);
  add_string_output(
    &mut output.source,
    name_token.contents.clone(),
    OutputModifier::CONVERT_VARIABLE_NAME,
    name_token,
  );
  output.source.append(&mut after_name_output);

  if let Some(initializer_index) = get_argument(tokens, start, 3, end) {
    add_string_output(
      &mut output.source,
      "=",
      OutputModifier::SPACE_BEFORE | OutputModifier::SPACE_AFTER,
      name_token,
    );
    let initializer_context = context.with_scope(EvaluatorScope::ExpressionsOnly);
    evaluate(environment, &initializer_context, tokens, initializer_index, output)?;
  }

  add_lang_token_output(&mut output.source, OutputModifier::END_STATEMENT, name_token);

  if context.scope == EvaluatorScope::Module
    && environment
      .object_definitions
      .insert(
        name_token.contents.clone(),
        ObjectDefinition::new(ObjectKind::Variable, Some(TokenRef::new(tokens, start))),
      )
      .is_some()
  {
    return Err(GenerateError::at_token(
      name_token,
      format!("{} is already defined", name_token.contents),
    ));
  }

  Ok(())
}

/// Fallback for invocations without a registered generator: a C call.
pub fn generate_function_invocation(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  tokens: &Rc<Vec<Token>>,
  start: usize,
  output: &mut GeneratorOutput,
) -> GenerateResult<()> {
  let end = find_close_paren(tokens, start)?;
  let name_token = &tokens[start + 1];

  add_string_output(
    &mut output.source,
    name_token.contents.clone(),
    OutputModifier::CONVERT_FUNCTION_NAME,
    name_token,
  );
  add_lang_token_output(&mut output.source, OutputModifier::OPEN_PAREN, name_token);

  if let Some(arguments_start) = get_argument(tokens, start, 1, end) {
    let arguments_context = context.with_delimiter(
      EvaluatorScope::ExpressionsOnly,
      DelimiterTemplate::list_separator(),
    );
    evaluate_all(environment, &arguments_context, tokens, arguments_start, output)?;
  }

  add_lang_token_output(&mut output.source, OutputModifier::CLOSE_PAREN, name_token);

  if context.scope != EvaluatorScope::ExpressionsOnly {
    add_lang_token_output(&mut output.source, OutputModifier::END_STATEMENT, name_token);
  }
  Ok(())
}

/// An environment with every builtin generator registered.
pub fn default_environment() -> EvaluatorEnvironment {
  let mut environment = EvaluatorEnvironment::new();
  environment
    .generators
    .insert("defun".to_string(), generate_function_definition);
  environment
    .generators
    .insert("var".to_string(), generate_variable_declaration);
  for (name, _) in C_STATEMENT_TABLE {
    environment
      .generators
      .insert(name.to_string(), generate_c_statement);
  }
  environment
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::evaluator::evaluate;
  use crate::writer::{WriterSettings, write_header, write_source};
  use pretty_assertions::assert_eq;

  fn generate(source: &str, scope: EvaluatorScope) -> (String, String) {
    let tokens = Rc::new(crate::tokenizer::tokenize(source, "test.psp").unwrap());
    let mut environment = default_environment();
    let context = EvaluatorContext::module().with_scope(scope);
    let mut output = GeneratorOutput::default();
    evaluate(&mut environment, &context, &tokens, 0, &mut output).unwrap();
    let settings = WriterSettings::default();
    (
      write_source(&output, &settings),
      write_header(&output, &settings),
    )
  }

  fn generate_err(source: &str, scope: EvaluatorScope) -> GenerateError {
    let tokens = Rc::new(crate::tokenizer::tokenize(source, "test.psp").unwrap());
    let mut environment = default_environment();
    let context = EvaluatorContext::module().with_scope(scope);
    let mut output = GeneratorOutput::default();
    evaluate(&mut environment, &context, &tokens, 0, &mut output).unwrap_err()
  }

  #[test]
  fn defun_declares_in_header_and_defines_in_source() {
    let (source, header) = generate(
      "(defun add (a int b int &return int) (return (+ a b)))",
      EvaluatorScope::Module,
    );
    assert_eq!(header, "int add(int a, int b);\n");
    assert_eq!(source, "int add(int a, int b) {\n    return (a + b);\n}\n");
  }

  #[test]
  fn defun_with_no_return_type_is_void() {
    let (source, header) = generate(
      "(defun shutdown-everything ())",
      EvaluatorScope::Module,
    );
    assert_eq!(header, "void shutdown_everything();\n");
    assert_eq!(source, "void shutdown_everything() {\n}\n");
  }

  #[test]
  fn defun_absorbs_a_single_block_body() {
    let (source, _) = generate(
      "(defun go () (block (do-first) (do-second)))",
      EvaluatorScope::Module,
    );
    assert_eq!(source, "void go() {\n    do_first();\n    do_second();\n}\n");
  }

  #[test]
  fn defun_requires_module_scope() {
    let err = generate_err("(defun f ())", EvaluatorScope::Body);
    assert!(err.to_string().contains("module"));
  }

  #[test]
  fn duplicate_definitions_are_rejected() {
    let tokens = Rc::new(
      crate::tokenizer::tokenize("(defun f ()) (defun f ())", "test.psp").unwrap(),
    );
    let mut environment = default_environment();
    let context = EvaluatorContext::module();
    let mut output = GeneratorOutput::default();
    evaluate(&mut environment, &context, &tokens, 0, &mut output).unwrap();
    let second = find_close_paren(&tokens, 0).unwrap() + 1;
    let err = evaluate(&mut environment, &context, &tokens, second, &mut output).unwrap_err();
    assert!(err.to_string().contains("already defined"));
  }

  #[test]
  fn var_declares_arrays_after_the_name() {
    let (source, _) = generate("(var xs ([] 10 float))", EvaluatorScope::Body);
    assert_eq!(source, "float xs[10];\n");
  }

  #[test]
  fn var_with_initializer() {
    let (source, _) = generate("(var total int (+ 1 2))", EvaluatorScope::Body);
    assert_eq!(source, "int total = (1 + 2);\n");
  }

  #[test]
  fn var_is_not_an_expression() {
    let err = generate_err("(var x int)", EvaluatorScope::ExpressionsOnly);
    assert!(err.to_string().contains("expressions-only"));
  }

  #[test]
  fn var_checks_arity() {
    let err = generate_err("(var x)", EvaluatorScope::Body);
    assert!(err.to_string().contains("var expects"));
  }

  #[test]
  fn calls_inside_expressions_have_no_terminator() {
    let (source, _) = generate(
      "(if (ready-to-go) (launch missile 2))",
      EvaluatorScope::Body,
    );
    assert_eq!(source, "if (ready_to_go()) {\n    launch(missile, 2);\n}\n");
  }

  #[test]
  fn initializer_lists_use_braces() {
    let (source, _) = generate("(var xs ([] 3 int) (array 1 2 3))", EvaluatorScope::Body);
    assert_eq!(source, "int xs[3] = {1, 2, 3};\n");
  }

  #[test]
  fn array_access_puts_the_index_in_brackets() {
    let (source, _) = generate("(at xs i)", EvaluatorScope::Body);
    assert_eq!(source, "xs[i];\n");

    let (source, _) = generate("(set (at xs 0) 5)", EvaluatorScope::Body);
    assert_eq!(source, "xs[0] = 5;\n");
  }

  #[test]
  fn deref_assigns_through_a_pointer() {
    let (source, _) = generate("(set (deref p) 7)", EvaluatorScope::Body);
    assert_eq!(source, "*(p) = 7;\n");
  }

  #[test]
  fn addr_takes_the_address_of_its_operand() {
    let (source, _) = generate("(var p (* int) (addr x))", EvaluatorScope::Body);
    assert_eq!(source, "int* p = &(x);\n");
  }

  #[test]
  fn negate_flips_the_sign() {
    let (source, _) = generate("(return (negate x))", EvaluatorScope::Body);
    assert_eq!(source, "return -(x);\n");
  }

  #[test]
  fn sizeof_lowers_its_type_argument() {
    let (source, _) = generate("(var n int (sizeof long-count))", EvaluatorScope::Body);
    assert_eq!(source, "int n = sizeof(long_count);\n");
  }

  #[test]
  fn inequality_comparison() {
    let (source, _) = generate("(if (!= a b) (bail))", EvaluatorScope::Body);
    assert_eq!(source, "if ((a != b)) {\n    bail();\n}\n");
  }

  #[test]
  fn ordering_comparisons() {
    let (source, _) = generate("(while (< i n) (step))", EvaluatorScope::Body);
    assert_eq!(source, "while ((i < n)) {\n    step();\n}\n");

    let (source, _) = generate("(var ok int (<= lo hi))", EvaluatorScope::Body);
    assert_eq!(source, "int ok = (lo <= hi);\n");

    let (source, _) = generate("(var above int (> x limit))", EvaluatorScope::Body);
    assert_eq!(source, "int above = (x > limit);\n");

    let (source, _) = generate("(var at-least int (>= x limit))", EvaluatorScope::Body);
    assert_eq!(source, "int at_least = (x >= limit);\n");
  }

  #[test]
  fn logical_operators_nest_with_parens() {
    let (source, _) = generate(
      "(if (and ready (or forced (not done))) (go))",
      EvaluatorScope::Body,
    );
    assert_eq!(source, "if ((ready && (forced || !(done)))) {\n    go();\n}\n");
  }

  #[test]
  fn equality_and_modulo() {
    let (source, _) = generate("(var even int (= (% n 2) 0))", EvaluatorScope::Body);
    assert_eq!(source, "int even = ((n % 2) == 0);\n");
  }

  #[test]
  fn subtraction_and_division() {
    let (source, _) = generate("(var span int (/ (- hi lo) 2))", EvaluatorScope::Body);
    assert_eq!(source, "int span = ((hi - lo) / 2);\n");
  }

  #[test]
  fn continue_terminates_like_break() {
    let (source, _) = generate(
      "(while (pending) (if (skip-this) (continue)) (handle))",
      EvaluatorScope::Body,
    );
    assert_eq!(
      source,
      "while (pending()) {\n    if (skip_this()) {\n        continue;\n    }\n    handle();\n}\n"
    );
  }

  #[test]
  fn scope_opens_a_bare_block() {
    let (source, _) = generate("(scope (tidy))", EvaluatorScope::Body);
    assert_eq!(source, "{\n    tidy();\n}\n");
  }
}
