use crate::error::CompileError;
use crate::frontend::token::Location;
use crate::frontend::token::Token;
use crate::frontend::token::TokenKind;
use anyhow::Result;

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    /// Line and column at `start`.
    start_line: usize,
    start_column: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 0,
            column: 0,
            start_line: 0,
            start_column: 0,
        }
    }
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        c
    }
    fn peek(&self) -> char {
        self.peek_n(0)
    }
    fn peek_next(&self) -> char {
        self.peek_n(1)
    }
    fn peek_n(&self, n: usize) -> char {
        self.source.get(self.current + n).copied().unwrap_or('\0')
    }
    /// Consume the next character if it is `expected`.
    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.advance();
            true
        } else {
            false
        }
    }
    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }
    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = if kind == TokenKind::Eof {
            "".to_string()
        } else {
            self.lexeme()
        };
        let location = Location::new(self.start_line, self.start_column, self.start);
        self.tokens.push(Token::new(kind, lexeme, location));
    }
    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let sign = matches!(self.peek_next(), '+' | '-');
        let exponent_digit = if sign { self.peek_n(2) } else { self.peek_next() };
        if matches!(self.peek(), 'e' | 'E') && exponent_digit.is_ascii_digit() {
            self.advance();
            if sign {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        self.add_token(TokenKind::Number);
    }
    // Whether the character is a valid identifier start character.
    fn is_identifier_start(c: char) -> bool {
        c.is_alphabetic() || c == '_' || c == '$'
    }
    // Whether the character is a valid identifier character.
    fn is_identifier(c: char) -> bool {
        Scanner::is_identifier_start(c) || c.is_ascii_digit()
    }
    // Scan identifiers and keywords.
    fn identifier(&mut self) {
        while Scanner::is_identifier(self.peek()) {
            self.advance();
        }
        let lexeme = self.lexeme();
        let kind = TokenKind::keyword(&lexeme).unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }
    fn string(&mut self, quote: char) -> Result<()> {
        while self.peek() != quote && self.peek() != '\n' && !self.is_at_end() {
            if self.peek() == '\\' {
                self.advance();
            }
            self.advance();
        }
        if self.peek() != quote {
            return Err(self.error_here("Unterminated string"));
        }
        self.advance();
        self.add_token(TokenKind::String);
        Ok(())
    }
    fn line_comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }
    fn block_comment(&mut self) -> Result<()> {
        while !(self.peek() == '*' && self.peek_next() == '/') {
            if self.is_at_end() {
                return Err(self.error_here("Unterminated block comment"));
            }
            self.advance();
        }
        self.advance();
        self.advance();
        Ok(())
    }
    /// Add `with_equal` when the next character is `=`, otherwise `plain`.
    fn with_equal(&mut self, with_equal: TokenKind, plain: TokenKind) {
        let kind = if self.matches('=') { with_equal } else { plain };
        self.add_token(kind);
    }
    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            '{' => self.add_token(TokenKind::LBrace),
            '}' => self.add_token(TokenKind::RBrace),
            '[' => self.add_token(TokenKind::LBracket),
            ']' => self.add_token(TokenKind::RBracket),
            ',' => self.add_token(TokenKind::Comma),
            ';' => self.add_token(TokenKind::Semicolon),
            ':' => self.add_token(TokenKind::Colon),
            '?' => self.add_token(TokenKind::Question),
            '@' => self.add_token(TokenKind::At),
            '~' => self.add_token(TokenKind::Tilde),
            '.' if self.peek().is_ascii_digit() => self.number(),
            '.' => self.add_token(TokenKind::Dot),
            '+' if self.matches('+') => self.add_token(TokenKind::PlusPlus),
            '+' => self.with_equal(TokenKind::PlusEqual, TokenKind::Plus),
            '-' if self.matches('-') => self.add_token(TokenKind::MinusMinus),
            '-' => self.with_equal(TokenKind::MinusEqual, TokenKind::Minus),
            '*' => self.with_equal(TokenKind::StarEqual, TokenKind::Star),
            '%' => self.with_equal(TokenKind::PercentEqual, TokenKind::Percent),
            '^' => self.with_equal(TokenKind::CaretEqual, TokenKind::Caret),
            '/' if self.matches('/') => self.line_comment(),
            '/' if self.matches('*') => self.block_comment()?,
            '/' => self.with_equal(TokenKind::SlashEqual, TokenKind::Slash),
            '&' if self.matches('&') => self.add_token(TokenKind::AmpAmp),
            '&' => self.with_equal(TokenKind::AmpEqual, TokenKind::Amp),
            '|' if self.matches('|') => self.add_token(TokenKind::PipePipe),
            '|' => self.with_equal(TokenKind::PipeEqual, TokenKind::Pipe),
            '=' if self.matches('=') => {
                // `===` is treated as `==`.
                self.matches('=');
                self.add_token(TokenKind::EqualEqual);
            }
            '=' => self.add_token(TokenKind::Equal),
            '!' if self.matches('=') => {
                self.matches('=');
                self.add_token(TokenKind::BangEqual);
            }
            '!' => self.add_token(TokenKind::Bang),
            '<' if self.matches('<') => {
                self.with_equal(TokenKind::LessLessEqual, TokenKind::LessLess)
            }
            '<' => self.with_equal(TokenKind::LessEqual, TokenKind::Less),
            '>' if self.matches('>') => {
                self.with_equal(TokenKind::GreaterGreaterEqual, TokenKind::GreaterGreater)
            }
            '>' => self.with_equal(TokenKind::GreaterEqual, TokenKind::Greater),
            ' ' | '\r' | '\t' | '\n' => (),
            '"' | '\'' => self.string(c)?,
            s if s.is_ascii_digit() => self.number(),
            s if Scanner::is_identifier_start(s) => self.identifier(),
            _ => {
                let location = Location::new(self.start_line, self.start_column, self.start);
                let msg = format!("Scanning failed starting at: {}", c);
                return Err(self.error_at(&location, &msg));
            }
        }
        Ok(())
    }
    fn scan_tokens(&mut self) -> Result<()> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token()?;
        }
        self.start = self.current;
        self.start_line = self.line;
        self.start_column = self.column;
        self.add_token(TokenKind::Eof);
        Ok(())
    }
    fn error_at(&self, loc: &Location, msg: &str) -> anyhow::Error {
        let src: String = self.source.iter().collect();
        let message = Self::error(&src, loc, msg);
        anyhow::Error::new(CompileError::Syntax { message })
    }
    fn error_here(&self, msg: &str) -> anyhow::Error {
        let location = Location::new(self.start_line, self.start_column, self.start);
        self.error_at(&location, msg)
    }
    pub fn scan(src: &str) -> Result<Vec<Token>> {
        let mut scanner = Scanner::new(src);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }
    /// Render `msg` under the source line of `loc` with a caret.
    pub fn error(src: &str, loc: &Location, msg: &str) -> String {
        let lines = src.split('\n').collect::<Vec<&str>>();
        let n = loc.line().min(lines.len().saturating_sub(1));
        let prev_line = if n > 0 {
            let prev_n = n - 1;
            let prev = lines[prev_n];
            format!("\n{prev_n}  | {prev}")
        } else {
            "".to_string()
        };
        let line = lines.get(n).copied().unwrap_or("");
        let line_num_width = 4 + n.to_string().len();
        let err_indent = " ".repeat(loc.column() + line_num_width);
        format!("```{prev_line}\n{n}  | {line}\n{err_indent}^ {msg}\n```")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::scan(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_scanner() {
        let tokens = Scanner::scan("const AAA = 10.5;").unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].kind, TokenKind::KwConst);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "AAA");
        assert_eq!(tokens[1].location.column(), 6);
        assert_eq!(tokens[3].kind, TokenKind::Number);
        assert_eq!(tokens[3].lexeme, "10.5");
        assert_eq!(tokens[5].kind, TokenKind::Eof);

        use TokenKind::*;
        assert_eq!(
            kinds("a === b !== c <<= 1"),
            vec![Identifier, EqualEqual, Identifier, BangEqual, Identifier, LessLessEqual, Number, Eof]
        );
        assert_eq!(
            kinds("i++ += -- >= && ||"),
            vec![Identifier, PlusPlus, PlusEqual, MinusMinus, GreaterEqual, AmpAmp, PipePipe, Eof]
        );
        assert_eq!(kinds("@in @out data: float[];")[..3], [At, Identifier, At]);
        assert_eq!(kinds("1e3 .5"), vec![Number, Number, Eof]);
    }

    #[test]
    fn test_comments() {
        let src = "// header\nlet a = 1; /* inline\n comment */ a";
        let tokens = Scanner::scan(src).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::KwLet);
        assert_eq!(tokens[0].location.line(), 1);
        let last = &tokens[tokens.len() - 2];
        assert_eq!(last.lexeme, "a");
        assert_eq!(last.location.line(), 2);
        assert_eq!(last.location.column(), 12);
    }

    #[test]
    fn test_error() {
        let src = "let a = 1;\nlet b = #;";
        let err = Scanner::scan(src).unwrap_err();
        let err = err.downcast_ref::<CompileError>().unwrap();
        let CompileError::Syntax { message } = err else {
            panic!("expected a syntax error");
        };
        let lines = message.split('\n').collect::<Vec<&str>>();
        assert_eq!(lines[0], "```");
        assert_eq!(lines[1], "0  | let a = 1;");
        assert_eq!(lines[2], "1  | let b = #;");
        assert_eq!(lines[3], "             ^ Scanning failed starting at: #");
        assert_eq!(lines[4], "```");

        let err = Scanner::scan("let s = 'open").unwrap_err();
        assert!(err.to_string().contains("Unterminated string"));
    }
}
