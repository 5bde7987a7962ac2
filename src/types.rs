//! Lowering of the type-specifier mini-language into C/C++ type syntax.
//!
//! A type expression produces *two* ordered emission sequences: the part
//! that precedes the identifier (`type_output`) and the part that follows
//! it (`after_name_output`, array subscripts only). The split exists
//! because C declarator syntax puts array bounds after the name:
//!
//! ```text
//! int              -> "int"
//! (* (const char)) -> "const char*"
//! (<> std::vector Token) -> "std::vector<Token>"
//! ([] 10 float)    -> "float" / "[10]"
//! (in std string)  -> "std::string"
//! ```
//!
//! Array brackets land in `after_name_output` in outer-to-inner order, so
//! `([] ([] 10 float))` lowers to `[]` `[10]` as C requires. The borrow
//! checker guarantees the two buffers are distinct.

use crate::error::{GenerateError, GenerateResult};
use crate::navigator::{
  expect_num_arguments, expect_token_kind, find_close_paren, get_expected_argument,
  get_next_argument, is_last_argument, is_special_symbol,
};
use crate::output::{EmissionRecord, OutputModifier, add_lang_token_output, add_string_output};
use crate::tokenizer::{Token, TokenKind};

/// Lower the type expression starting at `start` into the two buffers.
///
/// `allow_array` gates `[]` forms: arrays are only legal where a declarator
/// can carry after-name subscripts (variables and parameters, not return
/// types, template parameters, or scope components).
pub fn lower_type(
  tokens: &[Token],
  start: usize,
  allow_array: bool,
  type_output: &mut Vec<EmissionRecord>,
  after_name_output: &mut Vec<EmissionRecord>,
) -> GenerateResult<()> {
  if tokens[start].kind == TokenKind::Symbol {
    if is_special_symbol(&tokens[start]) {
      return Err(GenerateError::at_token(
        &tokens[start],
        "types must not be : keywords or & sentinels; a generator may be misinterpreting the \
         special symbol, or you have made a mistake",
      ));
    }

    add_string_output(
      type_output,
      tokens[start].contents.clone(),
      OutputModifier::CONVERT_TYPE_NAME,
      &tokens[start],
    );
    return Ok(());
  }

  expect_token_kind("type parser", &tokens[start], TokenKind::OpenParen)?;
  let type_invocation = &tokens[start + 1];
  expect_token_kind("type parser", type_invocation, TokenKind::Symbol)?;
  let end = find_close_paren(tokens, start)?;

  match type_invocation.contents.as_str() {
    "const" => {
      expect_num_arguments(tokens, start, end, 2)?;

      // Const-ness precedes whatever the inner type produces
      add_string_output(
        type_output,
        "const",
        OutputModifier::SPACE_AFTER,
        type_invocation,
      );

      let type_index = get_expected_argument("const requires a type", tokens, start, 1, end)?;
      lower_type(tokens, type_index, allow_array, type_output, after_name_output)
    }
    "*" | "&" => {
      expect_num_arguments(tokens, start, end, 2)?;

      let type_index = get_expected_argument("expected a type", tokens, start, 1, end)?;
      lower_type(tokens, type_index, allow_array, type_output, after_name_output)?;

      add_string_output(
        type_output,
        type_invocation.contents.clone(),
        OutputModifier::empty(),
        type_invocation,
      );
      Ok(())
    }
    "&&" | "rval-ref-to" => {
      expect_num_arguments(tokens, start, end, 2)?;

      let type_index = get_expected_argument("expected a type", tokens, start, 1, end)?;
      lower_type(tokens, type_index, allow_array, type_output, after_name_output)?;

      add_string_output(type_output, "&&", OutputModifier::empty(), type_invocation);
      Ok(())
    }
    "<>" => {
      let name_index = get_expected_argument("expected a template name", tokens, start, 1, end)?;
      lower_type(tokens, name_index, allow_array, type_output, after_name_output)?;

      add_string_output(type_output, "<", OutputModifier::empty(), type_invocation);
      let mut parameter = get_next_argument(tokens, name_index);
      while parameter < end {
        // Template parameters may nest arbitrarily but can never be
        // arrays; brackets would land in the wrong buffer
        lower_type(tokens, parameter, false, type_output, after_name_output)?;

        if !is_last_argument(tokens, parameter, end) {
          add_lang_token_output(
            type_output,
            OutputModifier::LIST_SEPARATOR,
            &tokens[parameter],
          );
        }
        parameter = get_next_argument(tokens, parameter);
      }
      add_string_output(type_output, ">", OutputModifier::empty(), type_invocation);
      Ok(())
    }
    "[]" => {
      if !allow_array {
        return Err(GenerateError::at_token(
          &tokens[start],
          "cannot declare an array in this context; you may need a pointer instead",
        ));
      }

      let first_arg_index =
        get_expected_argument("expected a type or an array size", tokens, start, 1, end)?;

      let size_is_first_argument = tokens[first_arg_index].kind == TokenKind::Symbol
        && tokens[first_arg_index]
          .contents
          .chars()
          .next()
          .is_some_and(|c| c.is_ascii_digit());

      let type_index = if size_is_first_argument {
        expect_num_arguments(tokens, start, end, 3)?;
        let type_index = get_expected_argument("expected the array type", tokens, start, 2, end)?;
        add_string_output(after_name_output, "[", OutputModifier::empty(), type_invocation);
        add_string_output(
          after_name_output,
          tokens[first_arg_index].contents.clone(),
          OutputModifier::empty(),
          &tokens[first_arg_index],
        );
        add_string_output(after_name_output, "]", OutputModifier::empty(), type_invocation);
        type_index
      } else {
        expect_num_arguments(tokens, start, end, 2)?;
        add_string_output(after_name_output, "[]", OutputModifier::empty(), type_invocation);
        first_arg_index
      };

      // The brackets are already appended: the element type may itself be
      // an array, whose subscripts must come after the current ones
      lower_type(tokens, type_index, true, type_output, after_name_output)
    }
    "in" => {
      let first_scope_index = get_expected_argument("expected a scope", tokens, start, 1, end)?;

      let mut component = first_scope_index;
      while component < end {
        // Scope components cannot be arrays either
        lower_type(tokens, component, false, type_output, after_name_output)?;

        if !is_last_argument(tokens, component, end) {
          add_string_output(
            type_output,
            "::",
            OutputModifier::empty(),
            &tokens[component],
          );
        }
        component = get_next_argument(tokens, component);
      }
      Ok(())
    }
    _ => Err(GenerateError::at_token(
      type_invocation,
      "unknown C/C++ type specifier",
    )),
  }
}
