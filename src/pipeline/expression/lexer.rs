//! Tokenizer for filter and computed-column expressions

use super::ExpressionError;

/// Delimiter around variable references: `:::age:::`
pub const VARIABLE_DELIMITER: &str = ":::";

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Variable(String),
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

/// Split an expression into tokens
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if starts_with(&chars, pos, VARIABLE_DELIMITER) {
            let start = pos + VARIABLE_DELIMITER.len();
            let end = find(&chars, start, VARIABLE_DELIMITER)
                .ok_or(ExpressionError::UnterminatedVariable { position: pos })?;
            let name: String = chars[start..end].iter().collect();
            if name.is_empty() {
                return Err(ExpressionError::UnexpectedCharacter {
                    character: ':',
                    position: pos,
                });
            }
            tokens.push(Token::Variable(name));
            pos = end + VARIABLE_DELIMITER.len();
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit()))
        {
            let (number, next) = read_number(&chars, pos)?;
            tokens.push(Token::Number(number));
            pos = next;
            continue;
        }

        if c == '"' || c == '\'' {
            let (text, next) = read_string(&chars, pos, c)?;
            tokens.push(Token::Str(text));
            pos = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            ('=', Some('=')) => {
                // `===` is accepted as a synonym for `==`
                let width = if chars.get(pos + 2) == Some(&'=') { 3 } else { 2 };
                (Token::EqEq, width)
            }
            ('!', Some('=')) => {
                let width = if chars.get(pos + 2) == Some(&'=') { 3 } else { 2 };
                (Token::NotEq, width)
            }
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            _ => {
                return Err(ExpressionError::UnexpectedCharacter {
                    character: c,
                    position: pos,
                })
            }
        };
        tokens.push(token);
        pos += width;
    }

    Ok(tokens)
}

fn starts_with(chars: &[char], pos: usize, pattern: &str) -> bool {
    let mut idx = pos;
    for p in pattern.chars() {
        if chars.get(idx) != Some(&p) {
            return false;
        }
        idx += 1;
    }
    true
}

fn find(chars: &[char], from: usize, pattern: &str) -> Option<usize> {
    (from..chars.len()).find(|&i| starts_with(chars, i, pattern))
}

fn read_number(chars: &[char], start: usize) -> Result<(f64, usize), ExpressionError> {
    let mut pos = start;
    while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
        pos += 1;
    }
    // Exponent part, e.g. 1.5e-3
    if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
        let mut exp = pos + 1;
        if exp < chars.len() && (chars[exp] == '+' || chars[exp] == '-') {
            exp += 1;
        }
        if exp < chars.len() && chars[exp].is_ascii_digit() {
            pos = exp;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    let literal: String = chars[start..pos].iter().collect();
    literal
        .parse::<f64>()
        .map(|n| (n, pos))
        .map_err(|_| ExpressionError::InvalidNumber { literal })
}

fn read_string(chars: &[char], start: usize, quote: char) -> Result<(String, usize), ExpressionError> {
    let mut text = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        match chars[pos] {
            '\\' if pos + 1 < chars.len() => {
                text.push(chars[pos + 1]);
                pos += 2;
            }
            c if c == quote => return Ok((text, pos + 1)),
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }
    Err(ExpressionError::UnterminatedString { position: start })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_variable_comparison() {
        let tokens = tokenize(":::age::: >= 30").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Variable("age".to_string()),
                Token::Ge,
                Token::Number(30.0)
            ]
        );
    }

    #[test]
    fn test_variable_names_may_contain_spaces() {
        let tokens = tokenize(":::body weight::: * 2").unwrap();
        assert_eq!(tokens[0], Token::Variable("body weight".to_string()));
    }

    #[test]
    fn test_strict_equality_is_accepted() {
        let tokens = tokenize("'a' === 'b' !== 1").unwrap();
        assert_eq!(tokens[1], Token::EqEq);
        assert_eq!(tokens[3], Token::NotEq);
    }

    #[test]
    fn test_exponent_literal() {
        let tokens = tokenize("1.5e-3").unwrap();
        assert_eq!(tokens, vec![Token::Number(0.0015)]);
    }

    #[test]
    fn test_unterminated_variable_is_error() {
        assert!(matches!(
            tokenize(":::age > 3"),
            Err(ExpressionError::UnterminatedVariable { .. })
        ));
    }

    #[test]
    fn test_assignment_and_brackets_are_rejected() {
        assert!(tokenize("a = 1").is_err());
        assert!(tokenize("x[0]").is_err());
        assert!(tokenize("a; b").is_err());
    }
}
