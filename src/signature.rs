//! Function signature parsing and parameter-list emission.
//!
//! A signature is a parenthesized list of alternating parameter names and
//! type specifiers, optionally ending with `&return <type>`:
//!
//! ```text
//! (defun add (a int b int &return int) ...)
//! ```
//!
//! Parsing records token indices only; the types are lowered later when
//! the parameter list is emitted.

use crate::error::{GenerateError, GenerateResult};
use crate::navigator::{
  expect_in_invocation, expect_token_kind, find_close_paren, find_expression_end,
  is_special_symbol,
};
use crate::output::{
  EmissionRecord, GeneratorOutput, OutputModifier, add_lang_token_output, add_modifier_to_last,
  add_string_output,
};
use crate::tokenizer::{Token, TokenKind, token_kind_name};
use crate::types::lower_type;

/// Token indices for one parsed parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionArgumentTokens {
  pub name_index: usize,
  pub type_start_index: usize,
}

/// Result of walking one signature list.
#[derive(Debug, Clone, Default)]
pub struct ParsedSignature {
  pub arguments: Vec<FunctionArgumentTokens>,
  /// First token of the `&return` type; `None` means an implicit void.
  pub return_type_start: Option<usize>,
}

enum SignatureState {
  Name,
  Type,
  ReturnType,
}

/// Parse the signature list whose opening paren is at `args_index`.
pub fn parse_function_signature(
  tokens: &[Token],
  args_index: usize,
) -> GenerateResult<ParsedSignature> {
  let end_args_index = find_close_paren(tokens, args_index)?;

  let mut signature = ParsedSignature::default();
  let mut state = SignatureState::Name;
  let mut current_name_index = 0;

  let mut i = args_index + 1;
  while i < end_args_index {
    let current_token = &tokens[i];
    match state {
      SignatureState::ReturnType => {
        signature.return_type_start = Some(i);
        break;
      }
      SignatureState::Name => {
        if current_token.kind == TokenKind::Symbol && current_token.contents == "&return" {
          state = SignatureState::ReturnType;
          expect_in_invocation("&return expects a type", tokens, i + 1, end_args_index)?;
          i += 1;
          continue;
        }

        expect_token_kind("function signature", current_token, TokenKind::Symbol)?;
        current_name_index = i;
        state = SignatureState::Type;

        // A name introduces the expectation that a type follows
        expect_in_invocation("expected an argument type", tokens, i + 1, end_args_index)?;
        i += 1;
      }
      SignatureState::Type => {
        if current_token.kind == TokenKind::Symbol && is_special_symbol(current_token) {
          return Err(GenerateError::at_token(
            current_token,
            format!(
              "expected an argument type, but got the sentinel {}",
              current_token.contents
            ),
          ));
        }
        if current_token.kind != TokenKind::OpenParen && current_token.kind != TokenKind::Symbol {
          return Err(GenerateError::at_token(
            current_token,
            format!(
              "expected an argument type, got {}",
              token_kind_name(current_token.kind)
            ),
          ));
        }

        signature.arguments.push(FunctionArgumentTokens {
          name_index: current_name_index,
          type_start_index: i,
        });
        state = SignatureState::Name;

        // Skip the whole type declaration; it is lowered at emission time
        i = if current_token.kind == TokenKind::OpenParen {
          find_close_paren(tokens, i)? + 1
        } else {
          i + 1
        };
      }
    }
  }

  Ok(signature)
}

/// Emit the return type to the selected buffers.
///
/// `invocation_index` blames the defining invocation when the return type
/// is implicit. Arguments that appear after an explicit return type would
/// be silently ignored, so they fail the generation instead.
pub fn emit_return_type(
  tokens: &[Token],
  output: &mut GeneratorOutput,
  return_type_start: Option<usize>,
  invocation_index: usize,
  end_args_index: usize,
  to_source: bool,
  to_header: bool,
) -> GenerateResult<()> {
  let Some(return_type_start) = return_type_start else {
    // Implicit type; blame the invocation itself
    if to_source {
      add_string_output(
        &mut output.source,
        "void",
        OutputModifier::SPACE_AFTER,
        &tokens[invocation_index],
      );
    }
    if to_header {
      add_string_output(
        &mut output.header,
        "void",
        OutputModifier::SPACE_AFTER,
        &tokens[invocation_index],
      );
    }
    return Ok(());
  };

  let return_type_end = find_expression_end(tokens, return_type_start);
  if return_type_end + 1 < end_args_index {
    return Err(GenerateError::at_token(
      &tokens[return_type_end + 1],
      "arguments after the &return type would be ignored",
    ));
  }

  let mut type_output = Vec::new();
  let mut after_name_output = Vec::new();
  // Arrays cannot be return types; they must be pointers instead
  lower_type(
    tokens,
    return_type_start,
    false,
    &mut type_output,
    &mut after_name_output,
  )?;

  if let Some(record) = after_name_output.first() {
    let blame = record.blame();
    return Err(GenerateError::internal(format!(
      "{}:{}:{}: return type produced after-name output, which the parser should have rejected",
      blame.file_name, blame.line, blame.column
    )));
  }

  // The function name needs a space after its return type
  add_modifier_to_last(&mut type_output, OutputModifier::SPACE_AFTER);

  if to_source {
    output.source.extend(type_output.iter().cloned());
  }
  if to_header {
    output.header.extend(type_output.iter().cloned());
  }
  Ok(())
}

/// Emit the full parameter list (types, converted names, array suffixes,
/// separators) to the selected buffers.
pub fn emit_arguments(
  tokens: &[Token],
  output: &mut GeneratorOutput,
  arguments: &[FunctionArgumentTokens],
  to_source: bool,
  to_header: bool,
) -> GenerateResult<()> {
  for (argument_index, argument) in arguments.iter().enumerate() {
    let mut type_output = Vec::new();
    let mut after_name_output = Vec::new();
    lower_type(
      tokens,
      argument.type_start_index,
      true,
      &mut type_output,
      &mut after_name_output,
    )?;

    add_modifier_to_last(&mut type_output, OutputModifier::SPACE_AFTER);

    let name_token = &tokens[argument.name_index];
    if to_source {
      emit_one_argument(
        &mut output.source,
        &type_output,
        &after_name_output,
        name_token,
        argument_index + 1 < arguments.len(),
      );
    }
    if to_header {
      emit_one_argument(
        &mut output.header,
        &type_output,
        &after_name_output,
        name_token,
        argument_index + 1 < arguments.len(),
      );
    }
  }

  Ok(())
}

fn emit_one_argument(
  buffer: &mut Vec<EmissionRecord>,
  type_output: &[EmissionRecord],
  after_name_output: &[EmissionRecord],
  name_token: &Token,
  has_successor: bool,
) {
  buffer.extend(type_output.iter().cloned());
  add_string_output(
    buffer,
    name_token.contents.clone(),
    OutputModifier::CONVERT_VARIABLE_NAME,
    name_token,
  );
  buffer.extend(after_name_output.iter().cloned());
  if has_successor {
    add_lang_token_output(buffer, OutputModifier::LIST_SEPARATOR, name_token);
  }
}
