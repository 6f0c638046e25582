// src/parser.rs

use crate::ast::Term;
use crate::error::{ParseError, ParseErrorKind};
use crate::operators::{is_operator_char, Assoc, Operator, OperatorTable};

/// Largest literal accepted as a Church numeral.
pub const MAX_NUMERAL: usize = 65535;

/// One line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `Name = term` or `op = term`
    Definition { name: String, term: Term },
    /// `:op TOKEN PRECEDENCE left|right|none`
    OperatorDeclaration { token: String, operator: Operator },
    /// A term to normalize.
    Evaluation(Term),
}

// --- The Parser ---
pub struct Parser<'o> {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    operators: &'o OperatorTable,
}

impl<'o> Parser<'o> {
    pub fn new(input: &str, operators: &'o OperatorTable) -> Self {
        Parser {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            operators,
        }
    }

    fn current_char(&self) -> Option<char> { self.input.get(self.pos).copied() }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            while let Some(c) = self.current_char() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            // comments run to the end of the line
            if self.current_char() == Some('#') {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError { kind, line: self.line, col: self.col }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.current_char().is_none()
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.current_char() {
            Some(c) => Err(self.error(ParseErrorKind::UnexpectedChar(c))),
            None => Ok(()),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.current_char() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(self.error(ParseErrorKind::UnexpectedChar(c))),
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }

    // Save and restore, for the one place a statement needs lookahead.
    fn mark(&self) -> (usize, usize, usize) {
        (self.pos, self.line, self.col)
    }

    fn reset(&mut self, (pos, line, col): (usize, usize, usize)) {
        self.pos = pos;
        self.line = line;
        self.col = col;
    }

    pub fn parse(&mut self) -> Result<Term, ParseError> {
        let term = self.parse_expression(0)?;
        self.expect_end()?;
        Ok(term)
    }

    /// Parses one statement; `None` for a blank or comment-only line.
    pub fn parse_statement(&mut self) -> Result<Option<Statement>, ParseError> {
        if self.at_end() {
            return Ok(None);
        }
        if self.current_char() == Some(':') && self.peek_word_after_colon() == "op" {
            return self.parse_operator_declaration().map(Some);
        }

        let start = self.mark();
        if let Some(name) = self.try_definition_head() {
            let term = self.parse_expression(0)?;
            self.expect_end()?;
            return Ok(Some(Statement::Definition { name, term }));
        }
        self.reset(start);

        let term = self.parse()?;
        Ok(Some(Statement::Evaluation(term)))
    }

    fn peek_word_after_colon(&self) -> String {
        self.input[self.pos + 1..]
            .iter()
            .take_while(|c| c.is_alphabetic())
            .collect()
    }

    // `Name =` or `op =`; consumes the head on success.
    fn try_definition_head(&mut self) -> Option<String> {
        let name = match self.current_char() {
            Some(c) if c.is_uppercase() => self.read_identifier(),
            Some(c) if is_operator_char(c) => self.read_operator_token(),
            _ => return None,
        };
        self.skip_whitespace();
        let equals = self.read_operator_token();
        (!name.is_empty() && equals == "=").then_some(name)
    }

    fn parse_operator_declaration(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume ':'
        let keyword = self.read_identifier();
        if keyword != "op" {
            return Err(self.error(ParseErrorKind::InvalidSyntax(format!("Unknown command ':{}'", keyword))));
        }

        self.skip_whitespace();
        let token = self.read_operator_token();
        if token.is_empty() || token == "=" {
            return Err(self.error(ParseErrorKind::InvalidSyntax("Expected an operator token".to_string())));
        }

        self.skip_whitespace();
        let digits = self.read_digits();
        let precedence = digits
            .parse::<u8>()
            .map_err(|_| self.error(ParseErrorKind::InvalidNumber(digits.clone())))?;

        self.skip_whitespace();
        let assoc = match self.read_identifier().as_str() {
            "left" => Assoc::Left,
            "right" => Assoc::Right,
            "none" => Assoc::NonAssoc,
            other => {
                return Err(self.error(ParseErrorKind::InvalidSyntax(format!(
                    "Expected left, right or none, found '{}'",
                    other
                ))))
            }
        };
        self.expect_end()?;
        Ok(Statement::OperatorDeclaration { token, operator: Operator { precedence, assoc } })
    }

    // --- Terms ---

    /// Precedence climbing over the operator table. Application binds
    /// tighter than every operator.
    fn parse_expression(&mut self, min_precedence: u16) -> Result<Term, ParseError> {
        let mut lhs = self.parse_application()?;
        let mut last_nonassoc: Option<u16> = None;

        loop {
            self.skip_whitespace();
            match self.current_char() {
                Some(c) if is_operator_char(c) => {}
                _ => break,
            }

            let start = self.mark();
            let token = self.read_operator_token();
            let Some(operator) = self.operators.get(&token) else {
                self.reset(start);
                return Err(self.error(ParseErrorKind::UnknownOperator(token)));
            };
            let precedence = u16::from(operator.precedence);
            if precedence < min_precedence {
                self.reset(start);
                break;
            }
            if last_nonassoc == Some(precedence) {
                self.reset(start);
                return Err(self.error(ParseErrorKind::InvalidSyntax(format!(
                    "Operator '{}' cannot be chained",
                    token
                ))));
            }

            let next_min = match operator.assoc {
                Assoc::Left | Assoc::NonAssoc => precedence + 1,
                Assoc::Right => precedence,
            };
            let rhs = self.parse_expression(next_min)?;
            lhs = Term::operator(token, lhs, rhs);
            last_nonassoc = (operator.assoc == Assoc::NonAssoc).then_some(precedence);
        }
        Ok(lhs)
    }

    fn starts_atom(&self) -> bool {
        match self.current_char() {
            Some('(') | Some('\\') | Some('λ') | Some('"') => true,
            Some(c) => c.is_ascii_digit() || c.is_alphabetic(),
            None => false,
        }
    }

    // Juxtaposition, left associative. A lambda swallows the rest of the
    // expression, so it can only be the last argument.
    fn parse_application(&mut self) -> Result<Term, ParseError> {
        self.skip_whitespace();
        if !self.starts_atom() {
            return Err(match self.current_char() {
                Some(c) => self.error(ParseErrorKind::UnexpectedChar(c)),
                None => self.error(ParseErrorKind::UnexpectedEnd),
            });
        }

        let mut term = self.parse_atom()?;
        loop {
            self.skip_whitespace();
            if !self.starts_atom() {
                break;
            }
            let argument = self.parse_atom()?;
            term = Term::app(term, argument);
        }
        Ok(term)
    }

    fn parse_atom(&mut self) -> Result<Term, ParseError> {
        match self.current_char() {
            Some('(') => self.parse_parenthesized(),
            Some('\\') | Some('λ') => self.parse_lambda(),
            Some('"') => self.parse_string(),
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_uppercase() => Ok(Term::alias(self.read_identifier())),
            Some(c) if c.is_alphabetic() => Ok(Term::var(self.read_identifier())),
            Some(c) => Err(self.error(ParseErrorKind::UnexpectedChar(c))),
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }

    // `(term)` or `(op)`, the latter naming the operator's alias.
    fn parse_parenthesized(&mut self) -> Result<Term, ParseError> {
        self.advance(); // consume '('
        self.skip_whitespace();

        let start = self.mark();
        if self.current_char().map_or(false, is_operator_char) {
            let token = self.read_operator_token();
            self.skip_whitespace();
            if self.current_char() == Some(')') {
                self.advance();
                return Ok(Term::alias(token));
            }
            self.reset(start);
        }

        let term = self.parse_expression(0)?;
        self.expect_char(')')?;
        Ok(term)
    }

    fn parse_lambda(&mut self) -> Result<Term, ParseError> {
        self.advance(); // consume 'λ' or '\'
        let mut params = Vec::new();
        loop {
            self.skip_whitespace();
            match self.current_char() {
                Some('.') if !params.is_empty() => {
                    self.advance();
                    break;
                }
                Some(c) if c.is_alphabetic() && !c.is_uppercase() => params.push(self.read_identifier()),
                Some(c) => {
                    return Err(self.error(ParseErrorKind::InvalidSyntax(format!(
                        "Expected a variable or '.' in lambda, found '{}'",
                        c
                    ))))
                }
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            }
        }

        let body = self.parse_expression(0)?;
        Ok(params.into_iter().rev().fold(body, |body, param| Term::abs(param, body)))
    }

    fn parse_number(&mut self) -> Result<Term, ParseError> {
        let start_line = self.line;
        let start_col = self.col;
        let digits = self.read_digits();
        match digits.parse::<usize>() {
            Ok(n) if n <= MAX_NUMERAL => Ok(Term::church_numeral(n)),
            _ => Err(ParseError {
                kind: ParseErrorKind::InvalidNumber(digits),
                line: start_line,
                col: start_col,
            }),
        }
    }

    // "abc" is a pair list of byte numerals ending in \z.\x.\y.x
    fn parse_string(&mut self) -> Result<Term, ParseError> {
        self.advance(); // consume '"'
        let mut bytes = Vec::new();
        loop {
            let c = match self.current_char() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(c @ ('"' | '\\')) => c,
                        Some(c) => return Err(self.error(ParseErrorKind::UnexpectedChar(c))),
                        None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
                    }
                }
                Some(c) => c,
                None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            };
            let byte = u8::try_from(u32::from(c)).map_err(|_| {
                self.error(ParseErrorKind::InvalidSyntax(format!("'{}' does not fit in a byte", c)))
            })?;
            bytes.push(byte);
            self.advance();
        }

        let end = Term::abs("z", Term::abs("x", Term::abs("y", Term::var("x"))));
        Ok(bytes.into_iter().rev().fold(end, |rest, byte| {
            let pair = Term::app(Term::app(Term::var("s"), Term::church_numeral(usize::from(byte))), rest);
            Term::abs("s", pair)
        }))
    }

    // --- Lexemes ---

    fn read_identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '_' || c == '\'' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn read_operator_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.current_char() {
            if is_operator_char(c) {
                token.push(c);
                self.advance();
            } else {
                break;
            }
        }
        token
    }

    fn read_digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(c) = self.current_char() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        digits
    }
}

// Convenience functions for parsing
pub fn parse(input: &str, operators: &OperatorTable) -> Result<Term, ParseError> {
    Parser::new(input, operators).parse()
}

pub fn parse_statement(input: &str, operators: &OperatorTable) -> Result<Option<Statement>, ParseError> {
    Parser::new(input, operators).parse_statement()
}
