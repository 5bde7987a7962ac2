//! Serialization of emission records into C/C++ text.
//!
//! The writer walks one buffer front to back, applying each record's
//! modifier flags: spacing, parentheses, brace blocks with indentation,
//! statement terminators, and identifier case conversion. Splice records
//! recurse into the referenced output's matching buffer. Records are
//! consumed in append order and never revisited.

use crate::output::{EmissionRecord, GeneratorOutput, OutputModifier};

/// Formatting knobs for the emitted text.
#[derive(Debug, Clone, Copy)]
pub struct WriterSettings {
  pub indent: &'static str,
}

impl Default for WriterSettings {
  fn default() -> Self {
    Self { indent: "    " }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputSide {
  Source,
  Header,
}

struct WriterState {
  text: String,
  indent_depth: usize,
}

impl WriterState {
  fn new() -> Self {
    Self {
      text: String::new(),
      indent_depth: 0,
    }
  }

  /// Append a fragment, indenting first when at the start of a line.
  fn emit(&mut self, fragment: &str, settings: &WriterSettings) {
    if self.text.ends_with('\n') {
      for _ in 0..self.indent_depth {
        self.text.push_str(settings.indent);
      }
    }
    self.text.push_str(fragment);
  }

  /// Insert a separating space unless the current position already
  /// provides one.
  fn ensure_space(&mut self) {
    if !self.text.is_empty() && !self.text.ends_with([' ', '\n', '(', '[', '{']) {
      self.text.push(' ');
    }
  }

  /// Statement punctuation binds to the last fragment, not to a space.
  fn trim_trailing_space(&mut self) {
    while self.text.ends_with(' ') && !self.text.ends_with("\n ") {
      self.text.pop();
    }
  }
}

fn is_conversion(modifiers: OutputModifier) -> bool {
  modifiers.intersects(
    OutputModifier::CONVERT_TYPE_NAME
      | OutputModifier::CONVERT_FUNCTION_NAME
      | OutputModifier::CONVERT_VARIABLE_NAME,
  )
}

/// Lisp-case identifiers become C identifiers. Scope and template
/// punctuation inside type names passes through untouched.
fn convert_identifier(text: &str) -> String {
  text.replace('-', "_")
}

fn write_records(
  records: &[EmissionRecord],
  side: OutputSide,
  state: &mut WriterState,
  settings: &WriterSettings,
) {
  for record in records {
    match record {
      EmissionRecord::Text { text, modifiers, .. } => {
        if modifiers.contains(OutputModifier::SPACE_BEFORE) {
          state.ensure_space();
        }
        let fragment = if is_conversion(*modifiers) {
          convert_identifier(text)
        } else {
          text.clone()
        };
        state.emit(&fragment, settings);
        if modifiers.contains(OutputModifier::SPACE_AFTER) {
          state.text.push(' ');
        }
      }
      EmissionRecord::LangToken { modifiers, .. } => {
        write_lang_token(*modifiers, state, settings);
      }
      EmissionRecord::Splice { output, .. } => {
        let spliced = output.borrow();
        let records = match side {
          OutputSide::Source => &spliced.source,
          OutputSide::Header => &spliced.header,
        };
        write_records(records, side, state, settings);
      }
    }
  }
}

fn write_lang_token(modifiers: OutputModifier, state: &mut WriterState, settings: &WriterSettings) {
  if modifiers.contains(OutputModifier::SPACE_BEFORE) {
    state.ensure_space();
  }
  if modifiers.contains(OutputModifier::OPEN_PAREN) {
    state.emit("(", settings);
  }
  if modifiers.contains(OutputModifier::CLOSE_PAREN) {
    state.trim_trailing_space();
    state.emit(")", settings);
  }
  if modifiers.contains(OutputModifier::OPEN_BLOCK) {
    state.ensure_space();
    state.emit("{", settings);
    state.text.push('\n');
    state.indent_depth += 1;
  }
  if modifiers.contains(OutputModifier::CLOSE_BLOCK) {
    state.indent_depth = state.indent_depth.saturating_sub(1);
    if !state.text.ends_with('\n') {
      state.text.push('\n');
    }
    state.emit("}", settings);
    state.text.push('\n');
  }
  if modifiers.contains(OutputModifier::OPEN_LIST) {
    state.emit("{", settings);
  }
  if modifiers.contains(OutputModifier::CLOSE_LIST) {
    state.emit("}", settings);
  }
  if modifiers.contains(OutputModifier::END_STATEMENT) {
    state.trim_trailing_space();
    state.emit(";", settings);
    state.text.push('\n');
  }
  if modifiers.contains(OutputModifier::LIST_SEPARATOR) {
    state.trim_trailing_space();
    state.emit(", ", settings);
  }
  if modifiers.contains(OutputModifier::SPACE_AFTER) {
    state.text.push(' ');
  }
}

/// Serialize the source-side emission sequence.
pub fn write_source(output: &GeneratorOutput, settings: &WriterSettings) -> String {
  let mut state = WriterState::new();
  write_records(&output.source, OutputSide::Source, &mut state, settings);
  state.text
}

/// Serialize the header-side emission sequence.
pub fn write_header(output: &GeneratorOutput, settings: &WriterSettings) -> String {
  let mut state = WriterState::new();
  write_records(&output.header, OutputSide::Header, &mut state, settings);
  state.text
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  use crate::output::{add_splice_output, add_string_output};
  use crate::tokenizer::tokenize;
  use pretty_assertions::assert_eq;

  fn blame() -> crate::tokenizer::Token {
    tokenize("x", "test.psp").unwrap().remove(0)
  }

  #[test]
  fn identifier_conversion_applies_only_when_flagged() {
    let blame = blame();
    let mut output = GeneratorOutput::default();
    add_string_output(
      &mut output.source,
      "do-thing",
      OutputModifier::CONVERT_FUNCTION_NAME,
      &blame,
    );
    add_string_output(
      &mut output.source,
      "-literal-",
      OutputModifier::empty(),
      &blame,
    );
    assert_eq!(
      write_source(&output, &WriterSettings::default()),
      "do_thing-literal-"
    );
  }

  #[test]
  fn type_names_keep_scope_punctuation() {
    let blame = blame();
    let mut output = GeneratorOutput::default();
    add_string_output(
      &mut output.source,
      "std::vector",
      OutputModifier::CONVERT_TYPE_NAME,
      &blame,
    );
    assert_eq!(write_source(&output, &WriterSettings::default()), "std::vector");
  }

  #[test]
  fn splices_resolve_into_the_matching_buffer() {
    let blame = blame();
    let mut output = GeneratorOutput::default();
    let spliced = Rc::new(RefCell::new(GeneratorOutput::default()));
    add_string_output(
      &mut spliced.borrow_mut().source,
      "spliced_source",
      OutputModifier::empty(),
      &blame,
    );
    add_string_output(
      &mut spliced.borrow_mut().header,
      "spliced_header",
      OutputModifier::empty(),
      &blame,
    );

    add_string_output(&mut output.source, "before_", OutputModifier::empty(), &blame);
    add_string_output(&mut output.header, "decl_", OutputModifier::empty(), &blame);
    add_splice_output(&mut output, &spliced, &blame);
    add_string_output(&mut output.source, "_after", OutputModifier::empty(), &blame);

    let settings = WriterSettings::default();
    assert_eq!(write_source(&output, &settings), "before_spliced_source_after");
    assert_eq!(write_header(&output, &settings), "decl_spliced_header");
  }

  #[test]
  fn indentation_follows_block_depth() {
    let blame = blame();
    let mut output = GeneratorOutput::default();
    add_string_output(
      &mut output.source,
      "while",
      OutputModifier::SPACE_AFTER,
      &blame,
    );
    write_lang_tokens(&mut output.source, OutputModifier::OPEN_PAREN, &blame);
    add_string_output(&mut output.source, "1", OutputModifier::empty(), &blame);
    write_lang_tokens(&mut output.source, OutputModifier::CLOSE_PAREN, &blame);
    write_lang_tokens(&mut output.source, OutputModifier::OPEN_BLOCK, &blame);
    add_string_output(&mut output.source, "spin", OutputModifier::empty(), &blame);
    write_lang_tokens(&mut output.source, OutputModifier::OPEN_PAREN, &blame);
    write_lang_tokens(&mut output.source, OutputModifier::CLOSE_PAREN, &blame);
    write_lang_tokens(&mut output.source, OutputModifier::END_STATEMENT, &blame);
    write_lang_tokens(&mut output.source, OutputModifier::CLOSE_BLOCK, &blame);

    assert_eq!(
      write_source(&output, &WriterSettings::default()),
      "while (1) {\n    spin();\n}\n"
    );
  }

  fn write_lang_tokens(
    buffer: &mut Vec<EmissionRecord>,
    modifiers: OutputModifier,
    blame: &crate::tokenizer::Token,
  ) {
    crate::output::add_lang_token_output(buffer, modifiers, blame);
  }
}
