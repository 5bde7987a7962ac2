//! Process-wide evaluator state and per-invocation context.
//!
//! One `EvaluatorEnvironment` owns everything that outlives a single
//! generation call: the generator registry, recorded object definitions,
//! compile-time function signatures, the unique-symbol counters, and the
//! splice outputs that must stay alive until the writer pass. All of it is
//! mutated on one thread through `&mut` threading; parallel generation
//! requires disjoint environments.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{GenerateError, GenerateResult};
use crate::output::{DelimiterTemplate, GeneratorOutput};
use crate::tokenizer::{Token, TokenKind};

/// Controls whether emitted statements get automatic terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorScope {
  Module,
  Body,
  ExpressionsOnly,
}

pub fn scope_name(scope: EvaluatorScope) -> &'static str {
  match scope {
    EvaluatorScope::Module => "module",
    EvaluatorScope::Body => "body",
    EvaluatorScope::ExpressionsOnly => "expressions-only",
  }
}

/// Context threaded through every generator call.
#[derive(Debug, Clone)]
pub struct EvaluatorContext {
  pub scope: EvaluatorScope,
  /// Name of the enclosing definition, when there is one. Keeps generated
  /// symbol names stable against edits elsewhere in the program.
  pub definition_name: Option<Token>,
  /// Record inserted between items when evaluating a delimited list.
  pub delimiter_template: Option<DelimiterTemplate>,
}

impl EvaluatorContext {
  pub fn module() -> Self {
    Self {
      scope: EvaluatorScope::Module,
      definition_name: None,
      delimiter_template: None,
    }
  }

  /// Same context, different scope, no delimiter carried over.
  pub fn with_scope(&self, scope: EvaluatorScope) -> Self {
    Self {
      scope,
      definition_name: self.definition_name.clone(),
      delimiter_template: None,
    }
  }

  pub fn with_delimiter(&self, scope: EvaluatorScope, delimiter: DelimiterTemplate) -> Self {
    Self {
      scope,
      definition_name: self.definition_name.clone(),
      delimiter_template: Some(delimiter),
    }
  }
}

/// Identity-carrying reference to one token in a shared token vector.
///
/// Two refs denote the same token iff their vectors are pointer-equal and
/// their indices match. This is the moral equivalent of comparing raw token
/// pointers, without the pointers.
#[derive(Debug, Clone)]
pub struct TokenRef {
  pub tokens: Rc<Vec<Token>>,
  pub index: usize,
}

impl TokenRef {
  pub fn new(tokens: &Rc<Vec<Token>>, index: usize) -> Self {
    Self {
      tokens: Rc::clone(tokens),
      index,
    }
  }

  pub fn token(&self) -> &Token {
    &self.tokens[self.index]
  }

  /// True when this ref denotes `tokens[index]` by identity.
  pub fn refers_to(&self, tokens: &Rc<Vec<Token>>, index: usize) -> bool {
    Rc::ptr_eq(&self.tokens, tokens) && self.index == index
  }
}

/// One macro invocation inside a definition and the tokens that replaced it.
#[derive(Debug, Clone)]
pub struct MacroExpansion {
  pub at: TokenRef,
  pub tokens: Rc<Vec<Token>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
  Function,
  Variable,
  Macro,
}

pub fn object_kind_name(kind: ObjectKind) -> &'static str {
  match kind {
    ObjectKind::Function => "function",
    ObjectKind::Variable => "variable",
    ObjectKind::Macro => "macro",
  }
}

/// A recorded top-level definition.
#[derive(Debug, Clone)]
pub struct ObjectDefinition {
  pub kind: ObjectKind,
  /// Opening paren of the original definition invocation.
  pub invocation: Option<TokenRef>,
  /// Expansions recorded by the macro runtime during prior evaluation.
  pub macro_expansions: Vec<MacroExpansion>,
  /// Per-definition counter for stable generated names.
  pub next_free_unique_symbol_num: u32,
}

impl ObjectDefinition {
  pub fn new(kind: ObjectKind, invocation: Option<TokenRef>) -> Self {
    Self {
      kind,
      invocation,
      macro_expansions: Vec::new(),
      next_free_unique_symbol_num: 0,
    }
  }
}

/// Generator entry point: `(environment, context, tokens, start, output)`,
/// where `start` indexes the invocation's opening paren.
pub type GeneratorFn = fn(
  &mut EvaluatorEnvironment,
  &EvaluatorContext,
  &Rc<Vec<Token>>,
  usize,
  &mut GeneratorOutput,
) -> GenerateResult<()>;

/// State shared by every generation in one run.
#[derive(Default)]
pub struct EvaluatorEnvironment {
  pub generators: FxHashMap<String, GeneratorFn>,
  pub object_definitions: FxHashMap<String, ObjectDefinition>,
  /// Expected signature tokens for compile-time functions, keyed by name.
  pub compile_time_function_signatures: FxHashMap<String, Rc<Vec<Token>>>,
  pub next_free_unique_symbol_num: u32,
  /// Outputs referenced by splice records; kept alive for the writer pass.
  pub splice_outputs: Vec<Rc<RefCell<GeneratorOutput>>>,
}

impl EvaluatorEnvironment {
  pub fn new() -> Self {
    Self::default()
  }
}

/// Generated names stay short enough to read in the output.
const MAX_UNIQUE_NAME_PREFIX_LEN: usize = 48;

fn minted_token(prefix: &str, number: u32, blame: &Token) -> GenerateResult<Token> {
  if prefix.len() > MAX_UNIQUE_NAME_PREFIX_LEN {
    return Err(GenerateError::internal(format!(
      "unique symbol prefix '{prefix}' exceeds {MAX_UNIQUE_NAME_PREFIX_LEN} bytes"
    )));
  }
  Ok(Token {
    kind: TokenKind::Symbol,
    contents: format!("{prefix}_{number}"),
    file_name: Rc::clone(&blame.file_name),
    line: blame.line,
    column: blame.column,
  })
}

/// Mint `"<prefix>_<N>"` from the environment-level counter.
pub fn make_unique_symbol(
  environment: &mut EvaluatorEnvironment,
  prefix: &str,
  blame: &Token,
) -> GenerateResult<Token> {
  let token = minted_token(prefix, environment.next_free_unique_symbol_num, blame)?;
  environment.next_free_unique_symbol_num += 1;
  Ok(token)
}

/// Mint a unique symbol scoped to the context's definition when possible.
///
/// Falls back to the environment counter when the context names no
/// definition or the definition is unknown.
pub fn make_context_unique_symbol(
  environment: &mut EvaluatorEnvironment,
  context: &EvaluatorContext,
  prefix: &str,
  blame: &Token,
) -> GenerateResult<Token> {
  let Some(definition_name) = &context.definition_name else {
    return make_unique_symbol(environment, prefix, blame);
  };

  let Some(definition) = environment
    .object_definitions
    .get_mut(&definition_name.contents)
  else {
    return make_unique_symbol(environment, prefix, blame);
  };

  let token = minted_token(prefix, definition.next_free_unique_symbol_num, blame)?;
  definition.next_free_unique_symbol_num += 1;
  Ok(token)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  fn blame() -> Token {
    tokenize("here", "test.psp").unwrap().remove(0)
  }

  #[test]
  fn global_minting_is_monotonic() {
    let mut environment = EvaluatorEnvironment::new();
    let blame = blame();
    let a = make_unique_symbol(&mut environment, "tmp", &blame).unwrap();
    let b = make_unique_symbol(&mut environment, "tmp", &blame).unwrap();
    let c = make_unique_symbol(&mut environment, "other", &blame).unwrap();
    assert_eq!(a.contents, "tmp_0");
    assert_eq!(b.contents, "tmp_1");
    assert_eq!(c.contents, "other_2");
    assert_eq!(a.kind, TokenKind::Symbol);
  }

  #[test]
  fn definition_scoped_minting_uses_the_definition_counter() {
    let mut environment = EvaluatorEnvironment::new();
    let blame = blame();
    environment.object_definitions.insert(
      "my-func".to_string(),
      ObjectDefinition::new(ObjectKind::Function, None),
    );

    let mut context = EvaluatorContext::module();
    context.definition_name = Some(Token {
      contents: "my-func".to_string(),
      ..blame.clone()
    });

    // Bump the global counter so a fallback would be visible
    make_unique_symbol(&mut environment, "unrelated", &blame).unwrap();

    let a = make_context_unique_symbol(&mut environment, &context, "tmp", &blame).unwrap();
    let b = make_context_unique_symbol(&mut environment, &context, "tmp", &blame).unwrap();
    assert_eq!(a.contents, "tmp_0");
    assert_eq!(b.contents, "tmp_1");

    // Unknown definition falls back to the environment counter
    context.definition_name = Some(Token {
      contents: "never-defined".to_string(),
      ..blame.clone()
    });
    let fallback = make_context_unique_symbol(&mut environment, &context, "tmp", &blame).unwrap();
    assert_eq!(fallback.contents, "tmp_1");
  }

  #[test]
  fn overlong_prefix_is_rejected() {
    let mut environment = EvaluatorEnvironment::new();
    let blame = blame();
    let prefix = "p".repeat(MAX_UNIQUE_NAME_PREFIX_LEN + 1);
    assert!(make_unique_symbol(&mut environment, &prefix, &blame).is_err());
  }

  #[test]
  fn token_ref_identity_requires_the_same_vector() {
    let tokens_a = Rc::new(tokenize("(x)", "test.psp").unwrap());
    let tokens_b = Rc::new(tokenize("(x)", "test.psp").unwrap());
    let reference = TokenRef::new(&tokens_a, 1);
    assert!(reference.refers_to(&tokens_a, 1));
    assert!(!reference.refers_to(&tokens_a, 0));
    assert!(!reference.refers_to(&tokens_b, 1));
    assert_eq!(reference.token().contents, "x");
  }
}
