//! Tokenizer for the embedded method text.
//!
//! The extractor only relies on the [`Tokenizer`] trait; [`LogosTokenizer`]
//! is the built-in implementation. It knows just enough of the language to
//! find `execute` statements: keywords are case-insensitive, whitespace runs
//! are single tokens so positional lookups inside a statement stay stable.

use logos::Logos;

/// Token kinds produced by a [`Tokenizer`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    #[token("execute", ignore(case))]
    Execute,

    // Execute actions.
    #[token("export", ignore(case))]
    Export,
    #[token("task", ignore(case))]
    Task,
    #[token("form", ignore(case))]
    Form,
    #[token("formswap", ignore(case))]
    FormSwap,
    #[token("query", ignore(case))]
    Query,
    #[token("process", ignore(case))]
    Process,
    #[token("system", ignore(case))]
    System,
    #[token("report", ignore(case))]
    Report,
    #[token("reportpreview", ignore(case))]
    ReportPreview,
    #[token("shell", ignore(case))]
    Shell,
    #[token("command", ignore(case))]
    Command,
    #[token("import", ignore(case))]
    Import,
    #[token("emptydatabase", ignore(case))]
    EmptyDatabase,
    #[token("methodswap", ignore(case))]
    MethodSwap,
    #[token("methodsetup", ignore(case))]
    MethodSetup,
    #[token("optimisedatabase", ignore(case))]
    OptimiseDatabase,
    #[token("optimisetable", ignore(case))]
    OptimiseTable,
    #[token("optimisetableindexes", ignore(case))]
    OptimiseTableIndexes,
    #[token("optimisedatabaseindexes", ignore(case))]
    OptimiseDatabaseIndexes,
    #[token("optimisealldatabases", ignore(case))]
    OptimiseAllDatabases,
    #[token("optimisealldatabasesindexes", ignore(case))]
    OptimiseAllDatabasesIndexes,
    #[token("optimisedatabasehelper", ignore(case))]
    OptimiseDatabaseHelper,
    #[token("convertalldatabases", ignore(case))]
    ConvertAllDatabases,
    #[token("method", ignore(case))]
    Method,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[regex(r#""[^"\r\n]*""#)]
    StringConstant,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    #[regex(r"[ \t\x0C]+")]
    Whitespace,

    #[regex(r"\r?\n")]
    NewLine,

    #[regex(r#"[^A-Za-z0-9_ \t\x0C\r\n"]"#)]
    Punct,

    /// Input the lexer could not match, coalesced per run.
    Illegal,

    /// Always the last token of a stream.
    Eof,
}

impl TokenKind {
    /// Actions that may follow `execute`, other than `method`.
    pub fn is_non_method_action(&self) -> bool {
        matches!(
            self,
            Self::Export
                | Self::Task
                | Self::Form
                | Self::FormSwap
                | Self::Query
                | Self::Process
                | Self::System
                | Self::Report
                | Self::ReportPreview
                | Self::Shell
                | Self::Command
                | Self::Import
                | Self::EmptyDatabase
                | Self::MethodSwap
                | Self::MethodSetup
                | Self::OptimiseDatabase
                | Self::OptimiseTable
                | Self::OptimiseTableIndexes
                | Self::OptimiseDatabaseIndexes
                | Self::OptimiseAllDatabases
                | Self::OptimiseAllDatabasesIndexes
                | Self::OptimiseDatabaseHelper
                | Self::ConvertAllDatabases
        )
    }
}

/// A token with its literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lit: String,
}

impl Token {
    pub fn new(kind: TokenKind, lit: impl Into<String>) -> Self {
        Self {
            kind,
            lit: lit.into(),
        }
    }
}

/// Anything that can turn method text into a token stream ending in `Eof`.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// Default tokenizer backed by the `logos`-derived [`TokenKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogosTokenizer;

impl Tokenizer for LogosTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut lexer = TokenKind::lexer(text);
        let mut error_start: Option<usize> = None;

        while let Some(next) = lexer.next() {
            match next {
                Ok(kind) => {
                    if let Some(start) = error_start.take() {
                        let end = lexer.span().start;
                        tokens.push(Token::new(TokenKind::Illegal, &text[start..end]));
                    }
                    tokens.push(Token::new(kind, lexer.slice()));
                }
                Err(()) => {
                    if error_start.is_none() {
                        error_start = Some(lexer.span().start);
                    }
                }
            }
        }
        if let Some(start) = error_start {
            tokens.push(Token::new(TokenKind::Illegal, &text[start..]));
        }

        tokens.push(Token::new(TokenKind::Eof, ""));
        tokens
    }
}
