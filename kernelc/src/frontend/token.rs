use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Markers
    Eof,

    // Identifiers and literals
    /// foo
    Identifier,
    /// 42 or 1.5
    Number,
    /// "foo" or 'foo'
    String,

    // Punctuation
    /// @
    At,
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ,
    Comma,
    /// .
    Dot,
    /// ;
    Semicolon,
    /// :
    Colon,
    /// ?
    Question,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Bang,
    Tilde,
    Amp,
    Pipe,
    Caret,
    AmpAmp,
    PipePipe,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LessLess,
    GreaterGreater,
    /// == or ===
    EqualEqual,
    /// != or !==
    BangEqual,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    LessLessEqual,
    GreaterGreaterEqual,

    // Keywords
    KwBreak,
    KwClass,
    KwConst,
    KwContinue,
    KwDo,
    KwElse,
    KwExport,
    KwFalse,
    KwFor,
    KwFunction,
    KwIf,
    KwImport,
    KwLet,
    KwReturn,
    KwThis,
    KwTrue,
    KwVar,
    KwWhile,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "break" => TokenKind::KwBreak,
            "class" => TokenKind::KwClass,
            "const" => TokenKind::KwConst,
            "continue" => TokenKind::KwContinue,
            "do" => TokenKind::KwDo,
            "else" => TokenKind::KwElse,
            "export" => TokenKind::KwExport,
            "false" => TokenKind::KwFalse,
            "for" => TokenKind::KwFor,
            "function" => TokenKind::KwFunction,
            "if" => TokenKind::KwIf,
            "import" => TokenKind::KwImport,
            "let" => TokenKind::KwLet,
            "return" => TokenKind::KwReturn,
            "this" => TokenKind::KwThis,
            "true" => TokenKind::KwTrue,
            "var" => TokenKind::KwVar,
            "while" => TokenKind::KwWhile,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// The line number of the token.
    line: usize,
    /// The column number of the token.
    column: usize,
    /// The character location in the raw source string.
    start: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "loc(:{}:{})", self.line, self.column)
    }
}

impl Location {
    pub fn new(line: usize, column: usize, start: usize) -> Self {
        Self {
            line,
            column,
            start,
        }
    }
    pub fn line(&self) -> usize {
        self.line
    }
    pub fn column(&self) -> usize {
        self.column
    }
    pub fn start(&self) -> usize {
        self.start
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The kind of token, such as `const` (KwConst) or `vectorA` (Identifier).
    pub kind: TokenKind,
    /// The text of the token as it appears in the source.
    pub lexeme: String,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: String, location: Location) -> Self {
        Self {
            kind,
            lexeme,
            location,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} \"{}\" {}", self.kind, self.lexeme, self.location)
    }
}
