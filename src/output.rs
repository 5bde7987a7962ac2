//! Emission records and the buffers generators append them to.
//!
//! Generators never build target-language text directly; they append
//! records describing text fragments, language punctuation, or deferred
//! splices of other outputs. The writer serializes the records later.
//! Buffers are append-only: records are never removed, reordered, or
//! rewritten once pushed.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use tracing::warn;

use crate::tokenizer::Token;

bitflags! {
  /// Flags that tell the writer how to surround or transform a record.
  ///
  /// Punctuation flags (parens, blocks, lists, statement ends, separators)
  /// are normally carried by text-less `LangToken` records; spacing and
  /// name-conversion flags decorate `Text` records.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct OutputModifier: u16 {
    const SPACE_BEFORE = 1 << 0;
    const SPACE_AFTER = 1 << 1;
    const CONVERT_TYPE_NAME = 1 << 2;
    const CONVERT_FUNCTION_NAME = 1 << 3;
    const CONVERT_VARIABLE_NAME = 1 << 4;
    const OPEN_PAREN = 1 << 5;
    const CLOSE_PAREN = 1 << 6;
    const OPEN_BLOCK = 1 << 7;
    const CLOSE_BLOCK = 1 << 8;
    const OPEN_LIST = 1 << 9;
    const CLOSE_LIST = 1 << 10;
    const END_STATEMENT = 1 << 11;
    const LIST_SEPARATOR = 1 << 12;
  }
}

/// One unit of deferred output.
///
/// Every record blames the token it was emitted for, so late-stage
/// diagnostics and source mapping can always point back into the input.
#[derive(Debug, Clone)]
pub enum EmissionRecord {
  /// A literal output fragment plus modifier flags.
  Text {
    text: String,
    modifiers: OutputModifier,
    blame: Token,
  },
  /// No text; the modifier flags are the content (e.g. `OPEN_BLOCK`).
  LangToken {
    modifiers: OutputModifier,
    blame: Token,
  },
  /// Inline another output at writer time.
  Splice {
    output: Rc<RefCell<GeneratorOutput>>,
    blame: Token,
  },
}

impl EmissionRecord {
  pub fn blame(&self) -> &Token {
    match self {
      EmissionRecord::Text { blame, .. }
      | EmissionRecord::LangToken { blame, .. }
      | EmissionRecord::Splice { blame, .. } => blame,
    }
  }
}

/// The two ordered emission sequences a generation run produces.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOutput {
  pub source: Vec<EmissionRecord>,
  pub header: Vec<EmissionRecord>,
}

/// Template for the record an evaluation inserts between list items.
#[derive(Debug, Clone)]
pub struct DelimiterTemplate {
  pub text: Option<String>,
  pub modifiers: OutputModifier,
}

impl DelimiterTemplate {
  /// A plain `,` separator.
  pub fn list_separator() -> Self {
    Self {
      text: None,
      modifiers: OutputModifier::LIST_SEPARATOR,
    }
  }

  /// A custom separator string, optionally surrounded by spaces.
  pub fn splice_separator(text: &str, spaced: bool) -> Self {
    let modifiers = if spaced {
      OutputModifier::SPACE_BEFORE | OutputModifier::SPACE_AFTER
    } else {
      OutputModifier::empty()
    };
    Self {
      text: Some(text.to_string()),
      modifiers,
    }
  }

  pub fn instantiate(&self, blame: &Token) -> EmissionRecord {
    match &self.text {
      Some(text) => EmissionRecord::Text {
        text: text.clone(),
        modifiers: self.modifiers,
        blame: blame.clone(),
      },
      None => EmissionRecord::LangToken {
        modifiers: self.modifiers,
        blame: blame.clone(),
      },
    }
  }
}

/// Append a text record.
pub fn add_string_output(
  buffer: &mut Vec<EmissionRecord>,
  text: impl Into<String>,
  modifiers: OutputModifier,
  blame: &Token,
) {
  buffer.push(EmissionRecord::Text {
    text: text.into(),
    modifiers,
    blame: blame.clone(),
  });
}

/// Append a pure lang-token record.
pub fn add_lang_token_output(
  buffer: &mut Vec<EmissionRecord>,
  modifiers: OutputModifier,
  blame: &Token,
) {
  buffer.push(EmissionRecord::LangToken {
    modifiers,
    blame: blame.clone(),
  });
}

/// Append a splice record referencing another output.
///
/// The marker goes to both the source and header buffers so relative
/// ordering is preserved no matter which sides the spliced output ends up
/// contributing to.
pub fn add_splice_output(
  output: &mut GeneratorOutput,
  splice: &Rc<RefCell<GeneratorOutput>>,
  blame: &Token,
) {
  output.source.push(EmissionRecord::Splice {
    output: Rc::clone(splice),
    blame: blame.clone(),
  });
  output.header.push(EmissionRecord::Splice {
    output: Rc::clone(splice),
    blame: blame.clone(),
  });
}

/// OR an additional modifier flag onto the last appended record.
///
/// Used e.g. to add a trailing space after a fully-lowered type. Splice
/// records accept no modifiers; the misuse is logged and ignored.
pub fn add_modifier_to_last(buffer: &mut [EmissionRecord], flag: OutputModifier) {
  match buffer.last_mut() {
    Some(EmissionRecord::Text { modifiers, .. })
    | Some(EmissionRecord::LangToken { modifiers, .. }) => {
      *modifiers |= flag;
    }
    Some(EmissionRecord::Splice { .. }) => {
      warn!("attempted to add modifier {flag:?} to a splice record");
    }
    None => {
      warn!("attempted to add modifier {flag:?} to an empty output buffer");
    }
  }
}
