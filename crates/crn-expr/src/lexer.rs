use crate::error::{ExprError, ExprResult};

const DELIMITERS: &str = "*+-/^()%";
const RESERVED: &str = "!@#$[]|&><{},=";

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token {
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Mult,
    Div,
    Pow,
    Mod,
    Number(f64),
    Name(String),
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::OpenParen => "'('".to_string(),
            Token::CloseParen => "')'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Mult => "'*'".to_string(),
            Token::Div => "'/'".to_string(),
            Token::Pow => "'^'".to_string(),
            Token::Mod => "'%'".to_string(),
            Token::Number(v) => format!("number {v:?}"),
            Token::Name(n) => format!("symbol \"{n}\""),
        }
    }
}

/// Token plus its byte offset in the source text.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Lexeme {
    pub token: Token,
    pub position: usize,
}

fn single(c: char) -> Option<Token> {
    Some(match c {
        '(' => Token::OpenParen,
        ')' => Token::CloseParen,
        '+' => Token::Plus,
        '-' => Token::Minus,
        '*' => Token::Mult,
        '/' => Token::Div,
        '^' => Token::Pow,
        '%' => Token::Mod,
        _ => return None,
    })
}

/// Splits `text` on whitespace and operator characters.
///
/// Words starting with a digit or '.' are numbers (with an optional signed
/// exponent, `1.5e-7`); every other word is a symbol or function name.
pub(crate) fn tokenize(text: &str) -> ExprResult<Vec<Lexeme>> {
    if let Some((position, ch)) = text.char_indices().find(|(_, c)| RESERVED.contains(*c)) {
        return Err(ExprError::ReservedCharacter { ch, position });
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (position, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if let Some(token) = single(c) {
            out.push(Lexeme { token, position });
            i += 1;
            continue;
        }

        let numeric = c.is_ascii_digit() || c == '.';
        let start = i;
        while i < chars.len() {
            let c = chars[i].1;
            if c.is_whitespace() || DELIMITERS.contains(c) {
                let exponent_sign = numeric
                    && (c == '+' || c == '-')
                    && i > start
                    && matches!(chars[i - 1].1, 'e' | 'E');
                if !exponent_sign {
                    break;
                }
            }
            i += 1;
        }
        let end = chars.get(i).map_or(text.len(), |(p, _)| *p);
        let word = &text[position..end];

        let token = if numeric {
            let value = word.parse::<f64>().map_err(|_| {
                ExprError::parse(format!("invalid number \"{word}\" at position {position}"))
            })?;
            Token::Number(value)
        } else {
            Token::Name(word.to_string())
        };
        out.push(Lexeme { token, position });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|l| l.token)
            .collect()
    }

    #[test]
    fn splits_on_operators_and_whitespace() {
        assert_eq!(
            tokens("k1 * (A+ 2)"),
            vec![
                Token::Name("k1".into()),
                Token::Mult,
                Token::OpenParen,
                Token::Name("A".into()),
                Token::Plus,
                Token::Number(2.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn scientific_notation_is_one_token() {
        assert_eq!(
            tokens("1.5e-7-x"),
            vec![Token::Number(1.5e-7), Token::Minus, Token::Name("x".into())]
        );
        assert_eq!(tokens("2E+3"), vec![Token::Number(2000.0)]);
    }

    #[test]
    fn symbol_may_end_in_e() {
        assert_eq!(
            tokens("rate-1"),
            vec![Token::Name("rate".into()), Token::Minus, Token::Number(1.0)]
        );
    }

    #[test]
    fn reserved_character_reports_position() {
        let err = tokenize("a + b = c").unwrap_err();
        assert_eq!(
            err,
            ExprError::ReservedCharacter {
                ch: '=',
                position: 6
            }
        );
    }

    #[test]
    fn malformed_number_is_rejected() {
        assert!(matches!(tokenize("2x"), Err(ExprError::Parse { .. })));
        assert!(matches!(tokenize("1.2.3"), Err(ExprError::Parse { .. })));
    }
}
