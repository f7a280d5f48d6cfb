use foundation::time::TimeSpan;

use crate::entity::NodeId;

/// Timed interpolation of one attribute of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub node: NodeId,
    pub attr: String,
    pub from: String,
    pub to: String,
    pub span: TimeSpan,
}

impl Transition {
    pub fn value_at(&self, progress: f64) -> String {
        interpolate_string(&self.from, &self.to, progress)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Number(&'a str),
}

/// Interpolates the numbers embedded in `a` and `b`.
///
/// The result uses `b` as template: its k-th number is blended with the k-th
/// number of `a`; numbers of `b` without a counterpart stay fixed.
/// `t <= 0` yields `a` and `t >= 1` yields `b` verbatim.
pub fn interpolate_string(a: &str, b: &str, t: f64) -> String {
    if t <= 0.0 {
        return a.to_string();
    }
    if t >= 1.0 {
        return b.to_string();
    }

    let from: Vec<f64> = tokenize(a)
        .into_iter()
        .filter_map(|tok| match tok {
            Token::Number(n) => n.parse().ok(),
            Token::Text(_) => None,
        })
        .collect();

    let mut out = String::with_capacity(b.len());
    let mut k = 0;
    for tok in tokenize(b) {
        match tok {
            Token::Text(s) => out.push_str(s),
            Token::Number(n) => {
                match (from.get(k), n.parse::<f64>()) {
                    (Some(x0), Ok(x1)) => out.push_str(&(x0 + (x1 - x0) * t).to_string()),
                    _ => out.push_str(n),
                }
                k += 1;
            }
        }
    }
    out
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let Some(end) = number_end(bytes, i) else {
            i += 1;
            continue;
        };
        if text_start < i {
            out.push(Token::Text(&s[text_start..i]));
        }
        out.push(Token::Number(&s[i..end]));
        i = end;
        text_start = end;
    }
    if text_start < bytes.len() {
        out.push(Token::Text(&s[text_start..]));
    }
    out
}

/// End of the number starting at `start`, if one starts there.
fn number_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if matches!(bytes.get(i), Some(b'-' | b'+')) {
        i += 1;
    }
    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i > int_start;
    if bytes.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if digits || j > frac_start {
            digits = true;
            i = j;
        }
    }
    if !digits {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'-' | b'+')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    Some(i)
}
