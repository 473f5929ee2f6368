//! Tokenizer. Whitespace between tokens is insignificant.

use serde_json::Value;
use tabula_algebra::CmpOp;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Identifier or keyword: letters, digits, `_` and `-`, not starting
    /// with a digit or `-`.
    Word(String),
    Str(String),
    Number(Value),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Op(CmpOp),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LexError {
    pub offset: usize,
    pub message: String,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let simple = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            '.' => Some(TokenKind::Dot),
            '=' => Some(TokenKind::Op(CmpOp::Eq)),
            _ => None,
        };
        if let Some(kind) = simple {
            chars.next();
            tokens.push(Token { kind, offset });
            continue;
        }

        let rest = &source[offset..];
        let (kind, len) = if let Some(op) = comparison(rest) {
            op
        } else if c == '"' {
            string_literal(rest).ok_or_else(|| LexError {
                offset,
                message: "unterminated string literal".to_string(),
            })?
        } else if c.is_ascii_digit() || (c == '-' && rest[1..].starts_with(|d: char| d.is_ascii_digit())) {
            number(rest)
        } else if c.is_alphabetic() || c == '_' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '-'))
                .unwrap_or(rest.len());
            (TokenKind::Word(rest[..len].to_string()), len)
        } else {
            return Err(LexError {
                offset,
                message: format!("unexpected character '{}'", c),
            });
        };

        tokens.push(Token { kind, offset });
        let end = offset + len;
        while chars.peek().is_some_and(|&(i, _)| i < end) {
            chars.next();
        }
    }
    Ok(tokens)
}

fn comparison(rest: &str) -> Option<(TokenKind, usize)> {
    let (op, len) = if rest.starts_with("<=") {
        (CmpOp::Le, 2)
    } else if rest.starts_with(">=") {
        (CmpOp::Ge, 2)
    } else if rest.starts_with("<>") {
        (CmpOp::Ne, 2)
    } else if rest.starts_with("!=") {
        (CmpOp::Ne, 2)
    } else if rest.starts_with('<') {
        (CmpOp::Lt, 1)
    } else if rest.starts_with('>') {
        (CmpOp::Gt, 1)
    } else {
        return None;
    };
    Some((TokenKind::Op(op), len))
}

/// JSON-style double-quoted string starting at `rest[0]`.
fn string_literal(rest: &str) -> Option<(TokenKind, usize)> {
    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => {
                let len = i + 1;
                let decoded: String = serde_json::from_str(&rest[..len]).ok()?;
                return Some((TokenKind::Str(decoded), len));
            }
            _ => {}
        }
    }
    None
}

fn number(rest: &str) -> (TokenKind, usize) {
    let bytes = rest.as_bytes();
    let mut len = usize::from(bytes[0] == b'-');
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    len += digits(len);
    let mut integral = true;
    if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) {
        integral = false;
        len += 1 + digits(len + 1);
    }
    if matches!(bytes.get(len), Some(b'e') | Some(b'E')) {
        let sign = usize::from(matches!(bytes.get(len + 1), Some(b'+') | Some(b'-')));
        let exp = digits(len + 1 + sign);
        if exp > 0 {
            integral = false;
            len += 1 + sign + exp;
        }
    }

    let text = &rest[..len];
    let value = match text.parse::<i64>() {
        Ok(i) if integral => Value::from(i),
        _ => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
    };
    (TokenKind::Number(value), len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            kinds("inner-join( A.s ,x>=-1.5)"),
            vec![
                TokenKind::Word("inner-join".into()),
                TokenKind::LParen,
                TokenKind::Word("A".into()),
                TokenKind::Dot,
                TokenKind::Word("s".into()),
                TokenKind::Comma,
                TokenKind::Word("x".into()),
                TokenKind::Op(CmpOp::Ge),
                TokenKind::Number(json!(-1.5)),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#""a \"b\", c""#), vec![TokenKind::Str("a \"b\", c".into())]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(tokenize("\"open").unwrap_err().offset, 0);
        assert_eq!(tokenize("a ; b").unwrap_err().offset, 2);
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(kinds("12 3e2 7."), vec![
            TokenKind::Number(json!(12)),
            TokenKind::Number(json!(300.0)),
            TokenKind::Number(json!(7)),
            TokenKind::Dot,
        ]);
    }
}
