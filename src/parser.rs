use crate::ast::{BinaryOp, Expr, FunctionDecl, LogicalOp, Parameter, Program, Stmt, UnaryOp};
use crate::error::{LoxError, Span};
use crate::lexer::{Token, TokenType};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use std::rc::Rc;

/// Upper bound on both parameter lists and call arguments.
pub const MAX_ARITY: usize = 8;

/// How deep expressions, statements and blocks may nest inside each other.
pub const MAX_NESTING: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<LoxError>,
    function_depth: usize,
    nesting: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.end, t.span.end, t.span.line))
                .unwrap_or_else(|| Span::new(0, 0, 1));
            tokens.push(Token::new(TokenType::Eof, String::new(), None, span));
        }

        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
            function_depth: 0,
            nesting: 0,
        }
    }

    /// Parse the whole token stream. Syntax errors are collected; after each
    /// one the parser skips to the next statement boundary and carries on, so
    /// a single call reports every error it can find. Any error makes the
    /// whole program unusable.
    pub fn parse(&mut self) -> Result<Program, Vec<LoxError>> {
        self.current = 0;
        self.errors.clear();
        self.function_depth = 0;
        self.nesting = 0;

        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        tracing::debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_types(&[TokenType::Var]) {
            self.var_declaration()
        } else if self.match_types(&[TokenType::Fun]) {
            self.function("function")
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(error) => {
                self.errors.push(error);
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, LoxError> {
        let keyword_span = self.previous().span.clone();
        let name = self
            .consume(TokenType::Identifier, "Expected variable name.")?
            .lexeme
            .clone();

        let initializer = if self.match_types(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expected ';' after variable declaration.",
        )?;

        Ok(Stmt::Var {
            name,
            initializer,
            span: keyword_span.to(&self.previous().span),
        })
    }

    fn function(&mut self, kind: &str) -> Result<Stmt, LoxError> {
        let keyword_span = self.previous().span.clone();
        let name = self
            .consume(TokenType::Identifier, &format!("Expected {} name.", kind))?
            .lexeme
            .clone();
        self.consume(
            TokenType::LeftParen,
            &format!("Expected '(' after {} name.", kind),
        )?;

        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let span = self.peek().span.clone();
                    self.errors.push(LoxError::parse_error(
                        span,
                        format!("Can't have more than {} parameters.", MAX_ARITY),
                    ));
                }

                let param = self.consume(TokenType::Identifier, "Expected parameter name.")?;
                params.push(Parameter {
                    name: param.lexeme.clone(),
                    span: param.span.clone(),
                });

                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after parameters.")?;
        self.consume_with_help(
            TokenType::LeftBrace,
            &format!("Expected '{{' before {} body.", kind),
            "Function bodies are blocks: fun name(a, b) { ... }".to_string(),
        )?;

        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;
        let body = body?;

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            name,
            params,
            body,
            span: keyword_span.to(&self.previous().span),
        })))
    }

    fn statement(&mut self) -> Result<Stmt, LoxError> {
        self.nested("Statements nested too deeply.", Self::statement_kind)
    }

    fn statement_kind(&mut self) -> Result<Stmt, LoxError> {
        if self.match_types(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_types(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_types(&[TokenType::Print]) {
            self.print_statement()
        } else if self.match_types(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_types(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_types(&[TokenType::LeftBrace]) {
            let start_span = self.previous().span.clone();
            let statements = self.block()?;
            Ok(Stmt::Block {
                statements,
                span: start_span.to(&self.previous().span),
            })
        } else {
            self.expression_statement()
        }
    }

    /// Parses declarations up to and including the closing `}`; the opening
    /// brace has already been consumed.
    fn block(&mut self) -> Result<Vec<Stmt>, LoxError> {
        self.nested("Statements nested too deeply.", Self::block_body)
    }

    fn block_body(&mut self) -> Result<Vec<Stmt>, LoxError> {
        let mut statements = Vec::new();

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        self.consume_with_help(
            TokenType::RightBrace,
            "Expected '}' after block.",
            "Block statements must be closed with '}' after the opening '{'.".to_string(),
        )?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> Result<Stmt, LoxError> {
        let start_span = self.previous().span.clone();

        self.consume_with_help(
            TokenType::LeftParen,
            "Expected '(' after 'if'.",
            "If statements require parentheses around the condition: if (condition) ...".to_string(),
        )?;
        let condition = self.expression()?;
        self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after if condition.",
            "If conditions must be enclosed in parentheses: if (condition) ...".to_string(),
        )?;

        // An `else` binds to the nearest `if` that lacks one.
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_types(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        let end_span = match else_branch {
            Some(ref else_stmt) => else_stmt.span().clone(),
            None => then_branch.span().clone(),
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span: start_span.to(&end_span),
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, LoxError> {
        let start_span = self.previous().span.clone();

        self.consume(TokenType::LeftParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after while condition.")?;

        let body = Box::new(self.statement()?);
        let span = start_span.to(body.span());

        Ok(Stmt::While {
            condition,
            body,
            span,
        })
    }

    /// `for (init; cond; inc) body` becomes
    /// `{ init; while (cond) { body; inc; } }`.
    fn for_statement(&mut self) -> Result<Stmt, LoxError> {
        let start_span = self.previous().span.clone();

        self.consume(TokenType::LeftParen, "Expected '(' after 'for'.")?;

        let initializer = if self.match_types(&[TokenType::Semicolon]) {
            None
        } else if self.match_types(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(&TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if !self.check(&TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RightParen, "Expected ')' after for clauses.")?;

        let mut body = self.statement()?;
        let span = start_span.to(body.span());

        if let Some(increment) = increment {
            let increment_span = increment.span().clone();
            body = Stmt::Block {
                statements: vec![
                    body,
                    Stmt::Expression {
                        expr: increment,
                        span: increment_span,
                    },
                ],
                span: span.clone(),
            };
        }

        let condition = condition.unwrap_or_else(|| Expr::Literal {
            value: Value::Bool(true),
            span: start_span.clone(),
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
            span: span.clone(),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
                span,
            };
        }

        Ok(body)
    }

    fn print_statement(&mut self) -> Result<Stmt, LoxError> {
        let start_span = self.previous().span.clone();
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after value.")?;

        Ok(Stmt::Print {
            expr,
            span: start_span.to(&self.previous().span),
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, LoxError> {
        let span = self.previous().span.clone();

        if self.function_depth == 0 {
            self.errors.push(LoxError::parse_error_with_help(
                span.clone(),
                "Can't return from top-level code.".to_string(),
                "'return' is only allowed inside a function body.".to_string(),
            ));
        }

        let value = if !self.check(&TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after return value.")?;

        Ok(Stmt::Return { value, span })
    }

    fn expression_statement(&mut self) -> Result<Stmt, LoxError> {
        let start_span = self.peek().span.clone();
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after expression.")?;

        Ok(Stmt::Expression {
            expr,
            span: start_span.to(&self.previous().span),
        })
    }

    fn expression(&mut self) -> Result<Expr, LoxError> {
        self.nested("Expression nested too deeply.", Self::assignment)
    }

    fn assignment(&mut self) -> Result<Expr, LoxError> {
        let expr = self.or()?;

        if self.match_types(&[TokenType::Equal]) {
            let equals_span = self.previous().span.clone();
            let value = self.expression()?;

            if let Expr::Variable { name, span } = expr {
                return Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                    span,
                });
            }

            // Reported, but the parser is not lost: keep going with the left side.
            self.errors.push(LoxError::parse_error_with_help(
                equals_span,
                "Invalid assignment target.".to_string(),
                "Only variables can be assigned to. Example: 'x = 10;'".to_string(),
            ));
        }

        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.and()?;

        while self.match_types(&[TokenType::Or]) {
            let span = self.previous().span.clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.equality()?;

        while self.match_types(&[TokenType::And]) {
            let span = self.previous().span.clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, LoxError> {
        self.binary(
            Self::comparison,
            &[
                (TokenType::BangEqual, BinaryOp::NotEqual),
                (TokenType::EqualEqual, BinaryOp::Equal),
            ],
        )
    }

    fn comparison(&mut self) -> Result<Expr, LoxError> {
        self.binary(
            Self::term,
            &[
                (TokenType::Greater, BinaryOp::Greater),
                (TokenType::GreaterEqual, BinaryOp::GreaterEqual),
                (TokenType::Less, BinaryOp::Less),
                (TokenType::LessEqual, BinaryOp::LessEqual),
            ],
        )
    }

    fn term(&mut self) -> Result<Expr, LoxError> {
        self.binary(
            Self::factor,
            &[
                (TokenType::Minus, BinaryOp::Subtract),
                (TokenType::Plus, BinaryOp::Add),
            ],
        )
    }

    fn factor(&mut self) -> Result<Expr, LoxError> {
        self.binary(
            Self::unary,
            &[
                (TokenType::Slash, BinaryOp::Divide),
                (TokenType::Star, BinaryOp::Multiply),
            ],
        )
    }

    /// One left-associative precedence level: `operand (op operand)*`, folded
    /// in a loop.
    fn binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, LoxError>,
        operators: &[(TokenType, BinaryOp)],
    ) -> Result<Expr, LoxError> {
        let mut expr = operand(self)?;

        while let Some(operator) = self.match_operator(operators) {
            let span = self.previous().span.clone();
            let right = operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, LoxError> {
        if self.match_types(&[TokenType::Bang, TokenType::Minus]) {
            let operator = match self.previous().token_type {
                TokenType::Bang => UnaryOp::Not,
                _ => UnaryOp::Negate,
            };
            let span = self.previous().span.clone();
            let operand = self.nested("Expression nested too deeply.", Self::unary)?;

            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                span,
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr, LoxError> {
        let mut expr = self.primary()?;

        while self.match_types(&[TokenType::LeftParen]) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, LoxError> {
        let mut args = Vec::new();

        if !self.check(&TokenType::RightParen) {
            loop {
                if args.len() >= MAX_ARITY {
                    let span = self.peek().span.clone();
                    self.errors.push(LoxError::parse_error(
                        span,
                        format!("Can't have more than {} arguments.", MAX_ARITY),
                    ));
                }
                args.push(self.expression()?);

                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume_with_help(
            TokenType::RightParen,
            "Expected ')' after arguments.",
            "Function calls must be closed with ')' after the arguments. Example: f(a, b)".to_string(),
        )?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            span: paren.span.clone(),
        })
    }

    fn primary(&mut self) -> Result<Expr, LoxError> {
        let token = self.peek().clone();

        let expr = match token.token_type {
            TokenType::False => Expr::Literal {
                value: Value::Bool(false),
                span: token.span,
            },
            TokenType::True => Expr::Literal {
                value: Value::Bool(true),
                span: token.span,
            },
            TokenType::Nil => Expr::Literal {
                value: Value::Nil,
                span: token.span,
            },
            TokenType::Number | TokenType::String => Expr::Literal {
                value: token.literal.unwrap_or(Value::Nil),
                span: token.span,
            },
            TokenType::Identifier => Expr::Variable {
                name: token.lexeme,
                span: token.span,
            },
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                let end = self.consume_with_help(
                    TokenType::RightParen,
                    "Expected ')' after expression.",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'."
                        .to_string(),
                )?;
                return Ok(Expr::Grouping {
                    expr: Box::new(expr),
                    span: token.span.to(&end.span),
                });
            }
            _ => {
                let (found, help_msg) = match token.token_type {
                    TokenType::Eof => (
                        "end of input".to_string(),
                        "Reached end of input while expecting an expression.",
                    ),
                    TokenType::RightParen => (
                        "')'".to_string(),
                        "Found ')' without matching '('. Check for unbalanced parentheses.",
                    ),
                    TokenType::RightBrace => (
                        "'}'".to_string(),
                        "Found '}' without matching '{'. Check for unbalanced braces.",
                    ),
                    _ => (
                        format!("'{}'", token.lexeme),
                        "Expected a literal value, variable, or parenthesized expression here.",
                    ),
                };

                return Err(LoxError::parse_error_with_help(
                    self.error_span(),
                    format!("Expected expression, found {}.", found),
                    help_msg.to_string(),
                ));
            }
        };

        self.advance();
        Ok(expr)
    }

    /// Skip tokens until the start of what looks like the next statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    /// Run one recursive production one level deeper, failing with `message`
    /// once the nesting limit is reached.
    fn nested<T>(
        &mut self,
        message: &str,
        parse: fn(&mut Self) -> Result<T, LoxError>,
    ) -> Result<T, LoxError> {
        if self.nesting >= MAX_NESTING {
            return Err(LoxError::parse_error_with_help(
                self.error_span(),
                message.to_string(),
                format!("At most {} levels of nesting are allowed.", MAX_NESTING),
            ));
        }

        self.nesting += 1;
        let result = ensure_sufficient_stack(|| parse(self));
        self.nesting -= 1;
        result
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn match_operator(&mut self, operators: &[(TokenType, BinaryOp)]) -> Option<BinaryOp> {
        let (_, operator) = operators
            .iter()
            .find(|(token_type, _)| self.check(token_type))?;
        let operator = *operator;
        self.advance();
        Some(operator)
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            &self.peek().token_type == token_type
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Where to point an error about the current token. At end of input this
    /// is the character just after the last real token.
    fn error_span(&self) -> Span {
        if self.is_at_end() && self.current > 0 {
            let last_token = &self.tokens[self.current - 1];
            Span::single(last_token.span.end, last_token.span.line)
        } else {
            self.peek().span.clone()
        }
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token, LoxError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(LoxError::parse_error(self.error_span(), message.to_string()))
        }
    }

    fn consume_with_help(
        &mut self,
        token_type: TokenType,
        message: &str,
        help: String,
    ) -> Result<&Token, LoxError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(LoxError::parse_error_with_help(
                self.error_span(),
                message.to_string(),
                help,
            ))
        }
    }
}
