use crate::ast::AssignmentOperator;
use crate::ast::BinaryOperator;
use crate::ast::ClassDeclaration;
use crate::ast::ClassMember;
use crate::ast::DeclarationKind;
use crate::ast::Declarator;
use crate::ast::Decorator;
use crate::ast::Expression;
use crate::ast::Field;
use crate::ast::FunctionDeclaration;
use crate::ast::Literal;
use crate::ast::LogicalOperator;
use crate::ast::Param;
use crate::ast::Program;
use crate::ast::Statement;
use crate::ast::UnaryOperator;
use crate::ast::UpdateOperator;
use crate::error::CompileError;
use crate::frontend::scanner::Scanner;
use crate::frontend::token::Token;
use crate::frontend::token::TokenKind;
use anyhow::Result;

/// Statements that are recognized but not supported by the compiler.
///
/// They are skipped as a whole and handed on as [Statement::Unknown].
const UNSUPPORTED_STATEMENTS: [&str; 4] = ["switch", "try", "throw", "with"];

/// Recursive descent parser for the kernel language.
pub struct Parser {
    src: String,
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
    pub fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    pub fn peek(&self) -> &Token {
        self.peek_n(0)
    }
    /// The token `n` positions ahead (the final `Eof` when past the end).
    pub fn peek_n(&self, n: usize) -> &Token {
        let index = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }
    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }
    fn check_word(&self, word: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Identifier && token.lexeme == word
    }
    pub fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }
    pub fn error(&self, token: &Token, msg: &str) -> anyhow::Error {
        let message = Scanner::error(&self.src, &token.location, msg);
        anyhow::Error::new(CompileError::Syntax { message })
    }
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            self.advance();
            Ok(self.previous().clone())
        } else {
            let token = self.peek();
            let msg = format!(
                "Expected {:?}, but got \"{}\" of kind {:?}",
                kind, token.lexeme, token.kind
            );
            Err(self.error(token, &msg))
        }
    }
    fn identifier(&mut self) -> Result<String> {
        Ok(self.expect(TokenKind::Identifier)?.lexeme)
    }
    fn semicolon(&mut self) {
        self.match_kinds(&[TokenKind::Semicolon]);
    }
    pub fn parse(src: &str) -> Result<Program> {
        let mut parser = Parser {
            src: src.to_string(),
            tokens: Scanner::scan(src)?,
            current: 0,
        };
        let mut body = vec![];
        while !parser.is_at_end() {
            body.push(parser.statement()?);
        }
        Ok(Program { body })
    }
}

/// Statements.
impl Parser {
    fn statement(&mut self) -> Result<Statement> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::KwExport => {
                self.advance();
                self.statement()
            }
            TokenKind::At | TokenKind::KwClass => self.class_declaration(),
            TokenKind::KwImport => self.import(),
            TokenKind::KwConst | TokenKind::KwLet | TokenKind::KwVar => {
                let declaration = self.variable_declaration()?;
                self.semicolon();
                Ok(declaration)
            }
            TokenKind::KwFunction => {
                self.advance();
                let function = self.function(vec![])?;
                Ok(Statement::FunctionDeclaration(function))
            }
            TokenKind::KwIf => self.if_statement(),
            TokenKind::KwFor => self.for_statement(),
            TokenKind::KwWhile => {
                self.advance();
                let test = self.parenthesized()?;
                let body = Box::new(self.statement()?);
                Ok(Statement::While { test, body })
            }
            TokenKind::KwDo => {
                self.advance();
                let body = Box::new(self.statement()?);
                self.expect(TokenKind::KwWhile)?;
                let test = self.parenthesized()?;
                self.semicolon();
                Ok(Statement::DoWhile { body, test })
            }
            TokenKind::KwBreak => {
                self.advance();
                self.semicolon();
                Ok(Statement::Break)
            }
            TokenKind::KwContinue => {
                self.advance();
                self.semicolon();
                Ok(Statement::Continue)
            }
            TokenKind::KwReturn => {
                self.advance();
                let argument = if self.check(TokenKind::Semicolon) || self.check(TokenKind::RBrace)
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.semicolon();
                Ok(Statement::Return(argument))
            }
            TokenKind::LBrace => Ok(Statement::Block(self.block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            TokenKind::Identifier if UNSUPPORTED_STATEMENTS.contains(&token.lexeme.as_str()) => {
                self.skip_unsupported()?;
                Ok(Statement::Unknown(token.lexeme))
            }
            _ => {
                let expression = self.expression()?;
                self.semicolon();
                Ok(Statement::Expression(expression))
            }
        }
    }
    /// Skip tokens up to the end of the current statement, including any
    /// braced bodies.
    fn skip_unsupported(&mut self) -> Result<()> {
        let start = self.advance().clone();
        let mut depth = 0;
        loop {
            let kind = self.peek().kind;
            match kind {
                TokenKind::Eof if depth > 0 => {
                    return Err(self.error(&start, "Unterminated statement"));
                }
                TokenKind::Eof => return Ok(()),
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => return Ok(()),
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        // `try { } catch { }` continues after the first block.
                        if !self.check_word("catch") && !self.check_word("finally") {
                            return Ok(());
                        }
                        continue;
                    }
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                _ => (),
            }
            self.advance();
        }
    }
    fn block(&mut self) -> Result<Vec<Statement>> {
        self.expect(TokenKind::LBrace)?;
        let mut body = vec![];
        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                let token = self.peek();
                return Err(self.error(token, "Expected '}' before end of file"));
            }
            body.push(self.statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(body)
    }
    fn parenthesized(&mut self) -> Result<Expression> {
        self.expect(TokenKind::LParen)?;
        let expression = self.expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(expression)
    }
    /// `import { a, b } from 'source'` or `import a from 'source'`.
    fn import(&mut self) -> Result<Statement> {
        self.expect(TokenKind::KwImport)?;
        let mut specifiers = vec![];
        if self.match_kinds(&[TokenKind::LBrace]) {
            while !self.check(TokenKind::RBrace) {
                specifiers.push(self.identifier()?);
                if !self.match_kinds(&[TokenKind::Comma]) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace)?;
        } else if self.check(TokenKind::Identifier) {
            specifiers.push(self.identifier()?);
        }
        if !specifiers.is_empty() {
            if !self.check_word("from") {
                let token = self.peek();
                return Err(self.error(token, "Expected 'from'"));
            }
            self.advance();
        }
        let source = self.expect(TokenKind::String)?;
        self.semicolon();
        Ok(Statement::Import {
            specifiers,
            source: unquote(&source.lexeme),
        })
    }
    /// `: float` or `: float[]`.
    fn annotation(&mut self) -> Result<Option<String>> {
        if !self.match_kinds(&[TokenKind::Colon]) {
            return Ok(None);
        }
        let mut name = self.identifier()?;
        while self.check(TokenKind::LBracket) && self.peek_n(1).kind == TokenKind::RBracket {
            self.advance();
            self.advance();
            name.push_str("[]");
        }
        Ok(Some(name))
    }
    /// Declaration without the trailing semicolon so that it can be reused
    /// as a `for` initializer.
    fn variable_declaration(&mut self) -> Result<Statement> {
        let kind = match self.advance().kind {
            TokenKind::KwConst => DeclarationKind::Const,
            TokenKind::KwLet => DeclarationKind::Let,
            _ => DeclarationKind::Var,
        };
        let mut declarators = vec![];
        loop {
            let name = self.identifier()?;
            let annotation = self.annotation()?;
            let init = if self.match_kinds(&[TokenKind::Equal]) {
                Some(self.assignment()?)
            } else {
                None
            };
            declarators.push(Declarator {
                name,
                annotation,
                init,
            });
            if !self.match_kinds(&[TokenKind::Comma]) {
                break;
            }
        }
        Ok(Statement::VariableDeclaration { kind, declarators })
    }
    fn decorators(&mut self) -> Result<Vec<Decorator>> {
        let mut decorators = vec![];
        while self.match_kinds(&[TokenKind::At]) {
            let name = self.identifier()?;
            let arguments = if self.check(TokenKind::LParen) {
                self.arguments()?
            } else {
                vec![]
            };
            decorators.push(Decorator { name, arguments });
        }
        Ok(decorators)
    }
    /// Function after the `function` keyword, also used for class methods.
    fn function(&mut self, decorators: Vec<Decorator>) -> Result<FunctionDeclaration> {
        let name = self.identifier()?;
        self.expect(TokenKind::LParen)?;
        let mut params = vec![];
        while !self.check(TokenKind::RParen) {
            let name = self.identifier()?;
            let annotation = self.annotation()?;
            params.push(Param { name, annotation });
            if !self.match_kinds(&[TokenKind::Comma]) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        let return_annotation = self.annotation()?;
        let body = self.block()?;
        Ok(FunctionDeclaration {
            name,
            params,
            return_annotation,
            body,
            decorators,
        })
    }
    fn class_declaration(&mut self) -> Result<Statement> {
        let decorators = self.decorators()?;
        self.match_kinds(&[TokenKind::KwExport]);
        self.expect(TokenKind::KwClass)?;
        let name = self.identifier()?;
        self.expect(TokenKind::LBrace)?;
        let mut members = vec![];
        while !self.match_kinds(&[TokenKind::RBrace]) {
            if self.is_at_end() {
                let token = self.peek();
                return Err(self.error(token, "Expected '}' to close the class"));
            }
            if self.match_kinds(&[TokenKind::Semicolon]) {
                continue;
            }
            let decorators = self.decorators()?;
            if self.peek_n(1).kind == TokenKind::LParen {
                members.push(ClassMember::Method(self.function(decorators)?));
                continue;
            }
            let name = self.identifier()?;
            let annotation = self.annotation()?;
            if self.check(TokenKind::Equal) {
                let token = self.peek();
                return Err(self.error(token, "Field initializers are not supported"));
            }
            self.semicolon();
            members.push(ClassMember::Field(Field {
                name,
                annotation,
                decorators,
            }));
        }
        Ok(Statement::ClassDeclaration(ClassDeclaration {
            name,
            decorators,
            members,
        }))
    }
    fn if_statement(&mut self) -> Result<Statement> {
        self.expect(TokenKind::KwIf)?;
        let test = self.parenthesized()?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.match_kinds(&[TokenKind::KwElse]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            test,
            consequent,
            alternate,
        })
    }
    fn for_statement(&mut self) -> Result<Statement> {
        self.expect(TokenKind::KwFor)?;
        self.expect(TokenKind::LParen)?;
        let init = match self.peek().kind {
            TokenKind::Semicolon => None,
            TokenKind::KwConst | TokenKind::KwLet | TokenKind::KwVar => {
                Some(Box::new(self.variable_declaration()?))
            }
            _ => Some(Box::new(Statement::Expression(self.expression()?))),
        };
        self.expect(TokenKind::Semicolon)?;
        let test = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.statement()?);
        Ok(Statement::For {
            init,
            test,
            update,
            body,
        })
    }
}

/// Expressions, from lowest to highest precedence.
impl Parser {
    pub fn expression(&mut self) -> Result<Expression> {
        self.assignment()
    }
    fn assignment(&mut self) -> Result<Expression> {
        let left = self.conditional()?;
        let operator = match self.peek().kind {
            TokenKind::Equal => AssignmentOperator::Assign,
            TokenKind::PlusEqual => AssignmentOperator::Compound(BinaryOperator::Add),
            TokenKind::MinusEqual => AssignmentOperator::Compound(BinaryOperator::Sub),
            TokenKind::StarEqual => AssignmentOperator::Compound(BinaryOperator::Mul),
            TokenKind::SlashEqual => AssignmentOperator::Compound(BinaryOperator::Div),
            TokenKind::PercentEqual => AssignmentOperator::Compound(BinaryOperator::Rem),
            TokenKind::AmpEqual => AssignmentOperator::Compound(BinaryOperator::BitAnd),
            TokenKind::PipeEqual => AssignmentOperator::Compound(BinaryOperator::BitOr),
            TokenKind::CaretEqual => AssignmentOperator::Compound(BinaryOperator::BitXor),
            TokenKind::LessLessEqual => AssignmentOperator::Compound(BinaryOperator::Shl),
            TokenKind::GreaterGreaterEqual => AssignmentOperator::Compound(BinaryOperator::Shr),
            _ => return Ok(left),
        };
        let token = self.advance().clone();
        if !matches!(
            left,
            Expression::Identifier(_) | Expression::Member { .. } | Expression::Unknown(_)
        ) {
            return Err(self.error(&token, "Invalid assignment target"));
        }
        let right = self.assignment()?;
        Ok(Expression::Assignment {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }
    fn conditional(&mut self) -> Result<Expression> {
        let test = self.logical_or()?;
        if !self.match_kinds(&[TokenKind::Question]) {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(TokenKind::Colon)?;
        let alternate = self.assignment()?;
        Ok(Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }
    fn logical(
        &mut self,
        kind: TokenKind,
        operator: LogicalOperator,
        next: fn(&mut Self) -> Result<Expression>,
    ) -> Result<Expression> {
        let mut left = next(self)?;
        while self.match_kinds(&[kind]) {
            let right = next(self)?;
            left = Expression::Logical {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }
    fn logical_or(&mut self) -> Result<Expression> {
        self.logical(TokenKind::PipePipe, LogicalOperator::Or, Self::logical_and)
    }
    fn logical_and(&mut self) -> Result<Expression> {
        self.logical(TokenKind::AmpAmp, LogicalOperator::And, Self::bit_or)
    }
    /// Left-associative binary operators of one precedence level.
    fn binary(
        &mut self,
        operators: &[(TokenKind, BinaryOperator)],
        next: fn(&mut Self) -> Result<Expression>,
    ) -> Result<Expression> {
        let mut left = next(self)?;
        loop {
            let kind = self.peek().kind;
            let Some((_, operator)) = operators.iter().find(|(k, _)| *k == kind) else {
                return Ok(left);
            };
            let operator = *operator;
            self.advance();
            let right = next(self)?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }
    fn bit_or(&mut self) -> Result<Expression> {
        self.binary(&[(TokenKind::Pipe, BinaryOperator::BitOr)], Self::bit_xor)
    }
    fn bit_xor(&mut self) -> Result<Expression> {
        self.binary(&[(TokenKind::Caret, BinaryOperator::BitXor)], Self::bit_and)
    }
    fn bit_and(&mut self) -> Result<Expression> {
        self.binary(&[(TokenKind::Amp, BinaryOperator::BitAnd)], Self::equality)
    }
    fn equality(&mut self) -> Result<Expression> {
        let operators = [
            (TokenKind::EqualEqual, BinaryOperator::Eq),
            (TokenKind::BangEqual, BinaryOperator::Ne),
        ];
        self.binary(&operators, Self::relational)
    }
    fn relational(&mut self) -> Result<Expression> {
        let operators = [
            (TokenKind::Less, BinaryOperator::Lt),
            (TokenKind::LessEqual, BinaryOperator::Le),
            (TokenKind::Greater, BinaryOperator::Gt),
            (TokenKind::GreaterEqual, BinaryOperator::Ge),
        ];
        self.binary(&operators, Self::shift)
    }
    fn shift(&mut self) -> Result<Expression> {
        let operators = [
            (TokenKind::LessLess, BinaryOperator::Shl),
            (TokenKind::GreaterGreater, BinaryOperator::Shr),
        ];
        self.binary(&operators, Self::additive)
    }
    fn additive(&mut self) -> Result<Expression> {
        let operators = [
            (TokenKind::Plus, BinaryOperator::Add),
            (TokenKind::Minus, BinaryOperator::Sub),
        ];
        self.binary(&operators, Self::multiplicative)
    }
    fn multiplicative(&mut self) -> Result<Expression> {
        let operators = [
            (TokenKind::Star, BinaryOperator::Mul),
            (TokenKind::Slash, BinaryOperator::Div),
            (TokenKind::Percent, BinaryOperator::Rem),
        ];
        self.binary(&operators, Self::unary)
    }
    fn unary(&mut self) -> Result<Expression> {
        let operator = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOperator::Not),
            TokenKind::Minus => Some(UnaryOperator::Neg),
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Tilde => Some(UnaryOperator::BitNot),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance();
            let argument = Box::new(self.unary()?);
            return Ok(Expression::Unary { operator, argument });
        }
        let update = match self.peek().kind {
            TokenKind::PlusPlus => Some(UpdateOperator::Increment),
            TokenKind::MinusMinus => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.advance();
            let argument = Box::new(self.unary()?);
            return Ok(Expression::Update {
                operator,
                prefix: true,
                argument,
            });
        }
        if self.check_word("typeof") || self.check_word("new") || self.check_word("delete") {
            let word = self.advance().lexeme.clone();
            self.unary()?;
            return Ok(Expression::Unknown(word));
        }
        self.postfix()
    }
    fn postfix(&mut self) -> Result<Expression> {
        let argument = self.call()?;
        let operator = match self.peek().kind {
            TokenKind::PlusPlus => UpdateOperator::Increment,
            TokenKind::MinusMinus => UpdateOperator::Decrement,
            _ => return Ok(argument),
        };
        self.advance();
        Ok(Expression::Update {
            operator,
            prefix: false,
            argument: Box::new(argument),
        })
    }
    fn arguments(&mut self) -> Result<Vec<Expression>> {
        self.expect(TokenKind::LParen)?;
        let mut arguments = vec![];
        while !self.check(TokenKind::RParen) {
            arguments.push(self.assignment()?);
            if !self.match_kinds(&[TokenKind::Comma]) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(arguments)
    }
    fn call(&mut self) -> Result<Expression> {
        let mut expression = self.primary()?;
        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    let arguments = self.arguments()?;
                    expression = Expression::Call {
                        callee: Box::new(expression),
                        arguments,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let property = self.identifier()?;
                    expression = Expression::Member {
                        object: Box::new(expression),
                        property: Box::new(Expression::Identifier(property)),
                        computed: false,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expression = Expression::Member {
                        object: Box::new(expression),
                        property: Box::new(property),
                        computed: true,
                    };
                }
                _ => return Ok(expression),
            }
        }
    }
    fn primary(&mut self) -> Result<Expression> {
        let token = self.advance().clone();
        let expression = match token.kind {
            TokenKind::Number => {
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| self.error(&token, "Invalid number"))?;
                Expression::Literal(Literal::Number(value))
            }
            TokenKind::String => Expression::Literal(Literal::String(unquote(&token.lexeme))),
            TokenKind::KwTrue => Expression::Literal(Literal::Boolean(true)),
            TokenKind::KwFalse => Expression::Literal(Literal::Boolean(false)),
            TokenKind::KwThis => Expression::This,
            TokenKind::Identifier => Expression::Identifier(token.lexeme),
            TokenKind::LParen => {
                let expression = self.expression()?;
                self.expect(TokenKind::RParen)?;
                expression
            }
            TokenKind::LBracket => {
                let mut elements = vec![];
                while !self.check(TokenKind::RBracket) {
                    elements.push(self.assignment()?);
                    if !self.match_kinds(&[TokenKind::Comma]) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Expression::Array(elements)
            }
            _ => {
                let msg = format!("Expected an expression, but got \"{}\"", token.lexeme);
                return Err(self.error(&token, &msg));
            }
        };
        Ok(expression)
    }
}

fn unquote(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix(|c| c == '"' || c == '\'')
        .and_then(|s| s.strip_suffix(|c| c == '"' || c == '\''))
        .unwrap_or(lexeme);
    inner.to_string()
}
