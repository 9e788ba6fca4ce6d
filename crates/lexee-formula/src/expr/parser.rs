//! Expression lexer and parser
//!
//! Lexing never fails: characters outside the grammar become
//! [`Token::Invalid`] so the identifier check can run over the whole input
//! before any parsing happens. Parsing is recursive descent:
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := unary (('*' | '/' | '%') unary)*
//! unary      := ('+' | '-') unary | power
//! power      := primary (('^' | '**') unary)?
//! primary    := number | ident | ident '(' args ')' | '(' expression ')'
//! ```

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::MAX_NESTING;
use lexee_core::{FormulaError, FormulaResult};

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `^` or `**`
    Power,
    LeftParen,
    RightParen,
    Comma,
    /// Character outside the grammar
    Invalid(char),
}

/// Split expression text into tokens
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer { input, pos: 0 }.run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            match self.scan_token() {
                Some(token) => tokens.push(token),
                None => return tokens,
            }
        }
    }

    fn scan_token(&mut self) -> Option<Token> {
        let c = self.peek_char()?;

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Power,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            ',' => Token::Comma,
            '*' => {
                self.advance();
                if self.peek_char() == Some('*') {
                    self.advance();
                    return Some(Token::Power);
                }
                return Some(Token::Star);
            }
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char_at(1).map_or(false, |d| d.is_ascii_digit())) =>
            {
                return Some(self.scan_number());
            }
            c if is_ident_start(c) => return Some(self.scan_identifier()),
            other => Token::Invalid(other),
        };

        self.advance();
        Some(token)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent only when digits follow, so `2e` stays a number and a name
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let digit_at = match self.peek_char_at(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_char_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.input[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Invalid(text.chars().next().unwrap_or('.')),
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self.peek_char().map_or(false, is_ident_continue) {
            self.advance();
        }
        Token::Ident(self.input[start..self.pos].to_string())
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `name` is a syntactically valid identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().map_or(false, is_ident_start) && chars.all(is_ident_continue)
}

/// Parse a token stream into an AST
pub fn parse(tokens: &[Token]) -> FormulaResult<Expr> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    if tokens.is_empty() {
        return Err(FormulaError::domain("expression is empty"));
    }
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(unexpected(token)),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Current `parse_unary` recursion depth
    depth: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(unexpected(token)),
            None => Err(FormulaError::domain("unexpected end of expression")),
        }
    }

    fn parse_expression(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
    }

    fn parse_term(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOperator::Multiply,
                Some(Token::Slash) => BinaryOperator::Divide,
                Some(Token::Percent) => BinaryOperator::Modulo,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    // Every nesting construct (sign, exponent, parentheses, call argument)
    // re-enters here, so this bounds the recursion depth.
    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        if self.depth > MAX_NESTING {
            return Err(FormulaError::domain(format!(
                "expression is nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let expr = self.parse_signed();
        self.depth -= 1;
        expr
    }

    fn parse_signed(&mut self) -> FormulaResult<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOperator::Minus,
            Some(Token::Plus) => UnaryOperator::Plus,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> FormulaResult<Expr> {
        let base = self.parse_primary()?;
        if self.eat(&Token::Power) {
            // Right-associative, and binds tighter than a leading minus
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOperator::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LeftParen) {
                    let args = self.parse_arguments()?;
                    Ok(Expr::Call {
                        name: name.clone(),
                        args,
                    })
                } else {
                    Ok(Expr::Name(name.clone()))
                }
            }
            Some(Token::LeftParen) => {
                let inner = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(inner)
            }
            Some(token) => Err(unexpected(token)),
            None => Err(FormulaError::domain("unexpected end of expression")),
        }
    }

    fn parse_arguments(&mut self) -> FormulaResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(&Token::RightParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RightParen)?;
            return Ok(args);
        }
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unexpected(token: &Token) -> FormulaError {
    let shown = match token {
        Token::Number(n) => n.to_string(),
        Token::Ident(name) => name.clone(),
        Token::Plus => "+".into(),
        Token::Minus => "-".into(),
        Token::Star => "*".into(),
        Token::Slash => "/".into(),
        Token::Percent => "%".into(),
        Token::Power => "^".into(),
        Token::LeftParen => "(".into(),
        Token::RightParen => ")".into(),
        Token::Comma => ",".into(),
        Token::Invalid(c) => c.to_string(),
    };
    FormulaError::domain(format!("unexpected '{}' in expression", shown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_str(input: &str) -> FormulaResult<Expr> {
        parse(&tokenize(input))
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("prix * (1 + taxe)"),
            vec![
                Token::Ident("prix".into()),
                Token::Star,
                Token::LeftParen,
                Token::Number(1.0),
                Token::Plus,
                Token::Ident("taxe".into()),
                Token::RightParen,
            ]
        );
        assert_eq!(tokenize("2 ** 3"), vec![Token::Number(2.0), Token::Power, Token::Number(3.0)]);
        assert_eq!(tokenize("1.5e3"), vec![Token::Number(1500.0)]);
        assert_eq!(
            tokenize("2e"),
            vec![Token::Number(2.0), Token::Ident("e".into())]
        );
    }

    #[test]
    fn test_tokenize_never_fails() {
        assert_eq!(
            tokenize("open('x')"),
            vec![
                Token::Ident("open".into()),
                Token::LeftParen,
                Token::Invalid('\''),
                Token::Ident("x".into()),
                Token::Invalid('\''),
                Token::RightParen,
            ]
        );
        assert_eq!(
            tokenize("__import__"),
            vec![Token::Ident("__import__".into())]
        );
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 => 1 + (2 * 3)
        let expr = parse_str("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOperator::Add,
                Expr::Number(1.0),
                binary(BinaryOperator::Multiply, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );
    }

    #[test]
    fn test_power_binds_tighter_than_minus() {
        let expr = parse_str("-2 ^ 2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOperator::Minus,
                operand: Box::new(binary(
                    BinaryOperator::Power,
                    Expr::Number(2.0),
                    Expr::Number(2.0)
                )),
            }
        );
    }

    #[test]
    fn test_calls() {
        let expr = parse_str("max(1, x)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                name: "max".into(),
                args: vec![Expr::Number(1.0), Expr::Name("x".into())],
            }
        );
        assert_eq!(expr.identifiers(), vec!["max", "x"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_str("(1 + 2"), Err(FormulaError::Domain(_))));
        assert!(matches!(parse_str("1 +"), Err(FormulaError::Domain(_))));
        assert!(matches!(parse_str("1 2"), Err(FormulaError::Domain(_))));
        assert!(matches!(parse_str(""), Err(FormulaError::Domain(_))));
        assert!(matches!(parse_str("1 ; 2"), Err(FormulaError::Domain(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse_str(&nested(MAX_NESTING)).unwrap(), Expr::Number(1.0));
        assert!(matches!(parse_str(&nested(MAX_NESTING + 1)), Err(FormulaError::Domain(_))));
        assert!(matches!(parse_str(&nested(2000)), Err(FormulaError::Domain(_))));

        let signs = |n: usize| format!("{}1", "-".repeat(n));
        assert!(parse_str(&signs(MAX_NESTING)).is_ok());
        assert!(matches!(parse_str(&signs(MAX_NESTING + 1)), Err(FormulaError::Domain(_))));
        assert!(matches!(parse_str(&signs(4000)), Err(FormulaError::Domain(_))));

        // Right-associative powers and call arguments nest too
        let powers = format!("2{}", "^1".repeat(MAX_NESTING + 1));
        assert!(matches!(parse_str(&powers), Err(FormulaError::Domain(_))));
        let calls = format!("{}1{}", "abs(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(matches!(parse_str(&calls), Err(FormulaError::Domain(_))));
    }

    #[test]
    fn test_long_flat_chain_is_not_nesting() {
        let text = format!("{}1", "1+".repeat(1000));
        assert!(parse_str(&text).is_ok());
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("taux_2"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("2x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
