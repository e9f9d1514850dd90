//! Finds `execute method "..."` calls in embedded text.

use std::fmt;

use crate::error::{Error, Result};
use crate::statement::lexer::{LogosTokenizer, Token, TokenKind, Tokenizer};

/// Offset of the action keyword from the `execute` token.
const ACTION_OFFSET: usize = 2;
/// Offset of the call target from the `execute` token.
const TARGET_OFFSET: usize = 4;

/// Tokens from an `execute` up to the end of its line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    pub tokens: Vec<Token>,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            f.write_str(&token.lit)?;
        }
        Ok(())
    }
}

/// Split a token stream into execute statements.
///
/// A statement opens at every `Execute` and closes at the next `Execute`,
/// `NewLine` or `Eof`. Tokens outside statements are dropped.
pub fn group_statements(tokens: Vec<Token>) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut current: Option<Statement> = None;

    for token in tokens {
        match token.kind {
            TokenKind::NewLine | TokenKind::Eof => {
                if let Some(stmt) = current.take() {
                    statements.push(stmt);
                }
            }
            TokenKind::Execute => {
                if let Some(stmt) = current.replace(Statement {
                    tokens: vec![token],
                }) {
                    statements.push(stmt);
                }
            }
            _ => {
                if let Some(stmt) = current.as_mut() {
                    stmt.tokens.push(token);
                }
            }
        }
    }
    if let Some(stmt) = current {
        statements.push(stmt);
    }

    statements
}

/// Normalise a quoted method target: `"BAR.jcl"` → `bar`.
/// Returns `None` for anything that is not a string constant.
fn literal_target(lit: &str) -> Option<String> {
    let inner = lit.strip_prefix('"')?.strip_suffix('"')?;
    let lower = inner.to_lowercase();
    Some(lower.strip_suffix(".jcl").unwrap_or(&lower).to_string())
}

/// Statement extractor over a pluggable [`Tokenizer`].
#[derive(Debug, Clone)]
pub struct MethodCallExtractor<T = LogosTokenizer> {
    tokenizer: T,
}

impl Default for MethodCallExtractor {
    fn default() -> Self {
        Self::new(LogosTokenizer)
    }
}

impl<T: Tokenizer> MethodCallExtractor<T> {
    pub fn new(tokenizer: T) -> Self {
        Self { tokenizer }
    }

    pub fn statements(&self, text: &str) -> Vec<Statement> {
        group_statements(self.tokenizer.tokenize(text))
    }

    /// Names of the methods `text` calls with a literal target.
    ///
    /// `unit` names the calling unit in diagnostics. An execute whose action
    /// keyword is outside the known vocabulary is an error.
    pub fn extract(&self, unit: &str, text: &str) -> Result<Vec<String>> {
        let mut methods = Vec::new();

        for stmt in self.statements(text) {
            let Some(start) = stmt.tokens.iter().position(|t| t.kind == TokenKind::Execute)
            else {
                continue;
            };
            let toks = &stmt.tokens[start..];
            let unhandled = |keyword: &str| Error::UnhandledStatement {
                unit: unit.to_string(),
                keyword: keyword.to_string(),
                statement: stmt.to_string(),
            };

            let Some(action) = toks.get(ACTION_OFFSET) else {
                return Err(unhandled(""));
            };

            match action.kind {
                TokenKind::Method => {
                    let Some(target) = toks.get(TARGET_OFFSET) else {
                        return Err(unhandled(&action.lit));
                    };
                    match literal_target(&target.lit) {
                        Some(name) => methods.push(name),
                        None => log::warn!(
                            "call from {unit} to variable method '{}' - skipping",
                            target.lit
                        ),
                    }
                }
                kind if kind.is_non_method_action() => {}
                _ => {
                    for (i, t) in toks.iter().enumerate() {
                        log::debug!("tok {i} is {:?} '{}'", t.kind, t.lit);
                    }
                    return Err(unhandled(&action.lit));
                }
            }
        }

        Ok(methods)
    }
}
