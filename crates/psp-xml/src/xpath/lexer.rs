#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Star,
    Literal(String),
    Number(f64),
    /// Name test or function name, possibly prefixed (`mods:title`, `mods:*`).
    Name(String),
    /// Axis name, consumed together with its trailing `::`.
    Axis(String),
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '/' => {
                if chars.get(pos + 1) == Some(&'/') {
                    tokens.push(Token::DoubleSlash);
                    pos += 2;
                } else {
                    tokens.push(Token::Slash);
                    pos += 1;
                }
            }
            '.' => {
                if chars.get(pos + 1) == Some(&'.') {
                    tokens.push(Token::DotDot);
                    pos += 2;
                } else if chars.get(pos + 1).is_some_and(char::is_ascii_digit) {
                    let (number, next) = read_number(&chars, pos)?;
                    tokens.push(Token::Number(number));
                    pos = next;
                } else {
                    tokens.push(Token::Dot);
                    pos += 1;
                }
            }
            '@' => {
                tokens.push(Token::At);
                pos += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                pos += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                pos += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                pos += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                pos += 1;
            }
            '!' => {
                if chars.get(pos + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    pos += 2;
                } else {
                    return Err(format!("unexpected character '!' at offset {pos}"));
                }
            }
            '<' | '>' => {
                let with_eq = chars.get(pos + 1) == Some(&'=');
                tokens.push(match (c, with_eq) {
                    ('<', true) => Token::LtEq,
                    ('<', false) => Token::Lt,
                    (_, true) => Token::GtEq,
                    (_, false) => Token::Gt,
                });
                pos += if with_eq { 2 } else { 1 };
            }
            '"' | '\'' => {
                let end = chars[pos + 1..]
                    .iter()
                    .position(|ch| *ch == c)
                    .ok_or_else(|| format!("unterminated string literal at offset {pos}"))?;
                let literal: String = chars[pos + 1..pos + 1 + end].iter().collect();
                tokens.push(Token::Literal(literal));
                pos += end + 2;
            }
            c if c.is_ascii_digit() => {
                let (number, next) = read_number(&chars, pos)?;
                tokens.push(Token::Number(number));
                pos = next;
            }
            c if is_name_start(c) => {
                let (name, next) = read_ncname(&chars, pos);
                pos = next;
                if chars.get(pos) == Some(&':') && chars.get(pos + 1) == Some(&':') {
                    tokens.push(Token::Axis(name));
                    pos += 2;
                } else if chars.get(pos) == Some(&':') && chars.get(pos + 1) == Some(&'*') {
                    tokens.push(Token::Name(format!("{name}:*")));
                    pos += 2;
                } else if chars.get(pos) == Some(&':')
                    && chars.get(pos + 1).is_some_and(|ch| is_name_start(*ch))
                {
                    let (local, next) = read_ncname(&chars, pos + 1);
                    tokens.push(Token::Name(format!("{name}:{local}")));
                    pos = next;
                } else {
                    tokens.push(Token::Name(name));
                }
            }
            other => return Err(format!("unexpected character '{other}' at offset {pos}")),
        }
    }
    Ok(tokens)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn read_ncname(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_name_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn read_number(chars: &[char], start: usize) -> Result<(f64, usize), String> {
    let mut end = start;
    let mut seen_dot = false;
    while end < chars.len() {
        match chars[end] {
            '0'..='9' => end += 1,
            '.' if !seen_dot && chars.get(end + 1) != Some(&'.') => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    let text: String = chars[start..end].iter().collect();
    text.parse::<f64>()
        .map(|number| (number, end))
        .map_err(|_| format!("invalid number '{text}'"))
}
