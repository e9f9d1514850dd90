//! Statement tokenizing and method call extraction for embedded text.

pub mod extractor;
pub mod lexer;

pub use extractor::{MethodCallExtractor, Statement};
pub use lexer::{LogosTokenizer, Token, TokenKind, Tokenizer};
