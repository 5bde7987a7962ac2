//! Shared error utilities used across the generation pipeline.
//!
//! Diagnostics are kept lightweight on purpose – every fatal error is tied
//! to the token that caused it, and the error carries that token's
//! file/line/column so the host prints a single `file:line:column: message`
//! line per root cause.

use snafu::Snafu;

use crate::tokenizer::Token;

pub type GenerateResult<T> = Result<T, GenerateError>;

/// Fatal diagnostics produced during generation.
///
/// The variants mirror the kinds of failure the generators distinguish:
/// malformed input (`Syntax`), wrong argument counts (`Arity`), forms used
/// in a scope that forbids them (`Scope`), recognized forms applied to
/// object kinds we do not handle (`Unsupported`), and violated internal
/// preconditions (`Internal`).
#[derive(Debug, Snafu)]
pub enum GenerateError {
  #[snafu(display("{file_name}:{line}:{column}: error: {message}"))]
  Syntax {
    file_name: String,
    line: u32,
    column: u32,
    message: String,
  },

  #[snafu(display("{file_name}:{line}:{column}: error: {message}"))]
  Arity {
    file_name: String,
    line: u32,
    column: u32,
    message: String,
  },

  #[snafu(display("{file_name}:{line}:{column}: error: {message}"))]
  Scope {
    file_name: String,
    line: u32,
    column: u32,
    message: String,
  },

  #[snafu(display("error: {message}"))]
  Unsupported { message: String },

  #[snafu(display("internal error: {message}"))]
  Internal { message: String },
}

impl GenerateError {
  /// Syntax error anchored at a specific token.
  pub fn at_token(token: &Token, message: impl Into<String>) -> Self {
    Self::Syntax {
      file_name: token.file_name.to_string(),
      line: token.line,
      column: token.column,
      message: message.into(),
    }
  }

  /// Wrong number of arguments, blamed on the invocation.
  pub fn arity_at(token: &Token, message: impl Into<String>) -> Self {
    Self::Arity {
      file_name: token.file_name.to_string(),
      line: token.line,
      column: token.column,
      message: message.into(),
    }
  }

  /// Form invoked in a scope that forbids it.
  pub fn scope_at(token: &Token, message: impl Into<String>) -> Self {
    Self::Scope {
      file_name: token.file_name.to_string(),
      line: token.line,
      column: token.column,
      message: message.into(),
    }
  }

  pub fn unsupported(message: impl Into<String>) -> Self {
    Self::Unsupported {
      message: message.into(),
    }
  }

  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal {
      message: message.into(),
    }
  }
}
