//! Formula parser
//!
//! A recursive descent parser for the template formula mini-language with
//! proper operator precedence. References are `$KEY` tokens resolved against
//! the current student's row; there are no cell addresses or ranges.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};

/// Parse a formula string into an AST.
///
/// The leading `=` is optional and stripped.
///
/// # Example
/// ```rust
/// use rapor_formula::parse_formula;
///
/// let expr = parse_formula("=SUM($UTS, $UAS)").unwrap();
/// let expr = parse_formula("IF($NILAI >= 75, \"Lulus\", \"Mengulang\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<Expr> {
    let formula = formula.trim();
    let formula = formula.strip_prefix('=').unwrap_or(formula);

    let mut parser = FormulaParser::new(formula);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input (the parser keeps one token of
    // lookahead, so check the pending token rather than the raw position)
    if parser.current_token() != &Token::Eof {
        return Err(FormulaError::Parse(format!(
            "Unexpected characters after expression: '{:?}'",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    String(String),
    Field(String),     // $KEY reference
    Identifier(String), // Function name, or TRUE/FALSE

    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Comma,

    LeftParen,
    RightParen,

    Eof,
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Option<Token>,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: None,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.skip_whitespace();
        self.current_token = Some(self.scan_token());
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        if self.is_at_end() {
            return Token::Eof;
        }

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        // Single-character tokens
        match c {
            '+' => {
                self.advance();
                return Token::Plus;
            }
            '-' => {
                self.advance();
                return Token::Minus;
            }
            '*' => {
                self.advance();
                return Token::Star;
            }
            '/' => {
                self.advance();
                return Token::Slash;
            }
            '&' => {
                self.advance();
                return Token::Ampersand;
            }
            ',' => {
                self.advance();
                return Token::Comma;
            }
            '(' => {
                self.advance();
                return Token::LeftParen;
            }
            ')' => {
                self.advance();
                return Token::RightParen;
            }
            _ => {}
        }

        // One- and two-character comparison operators
        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::LessEqual;
            } else if self.peek_char() == Some('>') {
                self.advance();
                return Token::NotEqual;
            }
            return Token::LessThan;
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::GreaterEqual;
            }
            return Token::GreaterThan;
        }

        if c == '=' {
            self.advance();
            // Accept both '=' and '=='
            if self.peek_char() == Some('=') {
                self.advance();
            }
            return Token::Equal;
        }

        if c == '!' && self.peek_char_at(1) == Some('=') {
            self.advance();
            self.advance();
            return Token::NotEqual;
        }

        // String literal
        if c == '"' {
            return self.scan_string();
        }

        // $KEY reference
        if c == '$' {
            return self.scan_field();
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier (function name or boolean)
        if c.is_ascii_alphabetic() || c == '_' {
            return self.scan_identifier();
        }

        // Unknown character
        self.advance();
        Token::Eof
    }

    fn scan_string(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == '"' {
                // Check for escaped quote ("")
                if self.peek_char_at(1) == Some('"') {
                    s.push('"');
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            } else {
                s.push(c);
                self.advance();
            }
        }

        // Skip closing quote
        if self.peek_char() == Some('"') {
            self.advance();
        }

        Token::String(s)
    }

    fn scan_field(&mut self) -> Token {
        self.advance(); // Skip '$'
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Field(self.input[start..self.pos].to_uppercase())
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

        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        let num: f64 = num_str.parse().unwrap_or(0.0);
        Token::Number(num)
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier(self.input[start..self.pos].to_uppercase())
    }

    // === Helper methods ===

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
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Unary: -
    // 6. Primary: literals, $KEY references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<Expr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOp::Eq,
                Token::NotEqual => BinaryOp::Ne,
                Token::LessThan => BinaryOp::Lt,
                Token::LessEqual => BinaryOp::Le,
                Token::GreaterThan => BinaryOp::Gt,
                Token::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op: BinaryOp::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };

            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        if matches!(self.current_token(), Token::Minus) {
            self.consume();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }

        // Prefix plus (no-op)
        if matches!(self.current_token(), Token::Plus) {
            self.consume();
            return self.parse_unary();
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(Expr::number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(Expr::text(s))
            }

            Token::Field(key) => {
                self.consume();
                if key.is_empty() {
                    return Err(FormulaError::Parse("Empty $KEY reference".into()));
                }
                Ok(Expr::field(key))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => {
                self.consume();
                // Booleans fold to numbers; the value model has no boolean
                if name == "TRUE" && !matches!(self.current_token(), Token::LeftParen) {
                    return Ok(Expr::number(1.0));
                }
                if name == "FALSE" && !matches!(self.current_token(), Token::LeftParen) {
                    return Ok(Expr::number(0.0));
                }
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Err(FormulaError::Parse(format!(
                        "Unknown identifier '{}' (did you mean ${}?)",
                        name, name
                    )))
                }
            }

            _ => Err(FormulaError::Parse(format!(
                "Unexpected token: {:?}",
                self.current_token()
            ))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Expr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(Expr::Call { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("=42").unwrap(), Expr::number(42.0));
        assert_eq!(parse_formula("3.14").unwrap(), Expr::number(3.14));
        assert_eq!(parse_formula("=1e3").unwrap(), Expr::number(1000.0));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_formula("=\"Lulus\"").unwrap(), Expr::text("Lulus"));
        assert_eq!(
            parse_formula("=\"a \"\"b\"\"\"").unwrap(),
            Expr::text("a \"b\"")
        );
    }

    #[test]
    fn test_parse_field_ref() {
        assert_eq!(parse_formula("=$NILAI").unwrap(), Expr::field("NILAI"));
        // Keys are uppercased at parse time
        assert_eq!(parse_formula("$nilai_uts").unwrap(), Expr::field("NILAI_UTS"));
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        let expr = parse_formula("=1+2*3").unwrap();
        if let Expr::Binary { op, left, right } = expr {
            assert_eq!(op, BinaryOp::Add);
            assert_eq!(*left, Expr::number(1.0));
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
        } else {
            panic!("Expected Binary");
        }
    }

    #[test]
    fn test_parse_comparison_variants() {
        for (text, op) in [
            ("=$A=$B", BinaryOp::Eq),
            ("=$A==$B", BinaryOp::Eq),
            ("=$A<>$B", BinaryOp::Ne),
            ("=$A!=$B", BinaryOp::Ne),
            ("=$A>=$B", BinaryOp::Ge),
            ("=$A<$B", BinaryOp::Lt),
        ] {
            let expr = parse_formula(text).unwrap();
            assert!(
                matches!(expr, Expr::Binary { op: got, .. } if got == op),
                "wrong operator for {}",
                text
            );
        }
    }

    #[test]
    fn test_parse_unary_minus() {
        let expr = parse_formula("=-$A").unwrap();
        assert!(matches!(expr, Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_parse_function() {
        let expr = parse_formula("=SUM($A, $B, 10)").unwrap();
        if let Expr::Call { name, args } = expr {
            assert_eq!(name, "SUM");
            assert_eq!(args.len(), 3);
        } else {
            panic!("Expected Call");
        }
    }

    #[test]
    fn test_parse_nested_function() {
        let expr = parse_formula("=IF(AND($A>0,$B<100),RATA2($A,$B),0)").unwrap();
        if let Expr::Call { name, args } = expr {
            assert_eq!(name, "IF");
            assert_eq!(args.len(), 3);
        } else {
            panic!("Expected Call");
        }
    }

    #[test]
    fn test_parse_parentheses() {
        let expr = parse_formula("=($A+$B)/2").unwrap();
        if let Expr::Binary { op, left, .. } = expr {
            assert_eq!(op, BinaryOp::Div);
            assert!(matches!(*left, Expr::Binary { op: BinaryOp::Add, .. }));
        } else {
            panic!("Expected Binary");
        }
    }

    #[test]
    fn test_parse_concat() {
        let expr = parse_formula("=$NAMA & \" - \" & $KELAS").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Concat, .. }));
    }

    #[test]
    fn test_parse_booleans_fold_to_numbers() {
        assert_eq!(parse_formula("=TRUE").unwrap(), Expr::number(1.0));
        assert_eq!(parse_formula("=FALSE").unwrap(), Expr::number(0.0));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_formula("=1+2 x").is_err());
    }

    #[test]
    fn test_bare_identifier_rejected() {
        assert!(parse_formula("=NILAI").is_err());
    }
}
