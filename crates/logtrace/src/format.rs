//! Renders a template against a list of decoded values.
//!
//! Supported syntax:
//!
//! - `{}` takes the next value, `{N}` takes value `N`
//! - `{{` and `}}` are literal braces
//! - `{:spec}` / `{N:spec}` where spec is `[[fill]align][width][type]`,
//!   align is one of `<`, `>`, `^` and type one of `x`, `X`, `o`, `b`
//!
//! Placeholders always render as `?` and ignore any format spec.

use crate::error::FormatError;
use crate::types::Value;

/// Widest padding a spec may ask for.
const MAX_WIDTH: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Decimal,
    LowerHex,
    UpperHex,
    Octal,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Spec {
    fill: char,
    align: Option<Align>,
    width: usize,
    radix: Radix,
}

impl Default for Spec {
    fn default() -> Self {
        Spec {
            fill: ' ',
            align: None,
            width: 0,
            radix: Radix::Decimal,
        }
    }
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

impl Spec {
    fn parse(s: &str) -> Result<Spec, FormatError> {
        let invalid = || FormatError::InvalidSpec(s.to_string());
        let mut spec = Spec::default();
        let mut rest = s;

        let mut chars = rest.chars();
        let first = chars.next();
        let second = chars.next();
        match (first, second.and_then(align_of)) {
            (Some(fill), Some(align)) => {
                spec.fill = fill;
                spec.align = Some(align);
                rest = &rest[fill.len_utf8() + 1..];
            }
            _ => {
                if let Some(align) = first.and_then(align_of) {
                    spec.align = Some(align);
                    rest = &rest[1..];
                }
            }
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 {
            spec.width = rest[..digits].parse().map_err(|_| invalid())?;
            if spec.width > MAX_WIDTH {
                return Err(invalid());
            }
            rest = &rest[digits..];
        }

        spec.radix = match rest {
            "" => Radix::Decimal,
            "x" => Radix::LowerHex,
            "X" => Radix::UpperHex,
            "o" => Radix::Octal,
            "b" => Radix::Binary,
            _ => return Err(invalid()),
        };
        Ok(spec)
    }
}

macro_rules! radix_fmt {
    ($v:expr, $radix:expr) => {
        match $radix {
            Radix::Decimal => format!("{}", $v),
            Radix::LowerHex => format!("{:x}", $v),
            Radix::UpperHex => format!("{:X}", $v),
            Radix::Octal => format!("{:o}", $v),
            Radix::Binary => format!("{:b}", $v),
        }
    };
}

fn write_value(
    out: &mut String,
    value: &Value,
    spec: &Spec,
    raw_spec: &str,
) -> Result<(), FormatError> {
    if value.is_placeholder() {
        out.push_str(Value::PLACEHOLDER_TOKEN);
        return Ok(());
    }
    if spec.radix != Radix::Decimal && !value.is_integer() {
        return Err(FormatError::InvalidSpec(raw_spec.to_string()));
    }

    let text = match value {
        Value::I8(v) => radix_fmt!(v, spec.radix),
        Value::I16(v) => radix_fmt!(v, spec.radix),
        Value::I32(v) => radix_fmt!(v, spec.radix),
        Value::I64(v) => radix_fmt!(v, spec.radix),
        Value::U8(v) => radix_fmt!(v, spec.radix),
        Value::U16(v) => radix_fmt!(v, spec.radix),
        Value::U32(v) => radix_fmt!(v, spec.radix),
        Value::U64(v) => radix_fmt!(v, spec.radix),
        other => other.to_string(),
    };

    let len = text.chars().count();
    if len >= spec.width {
        out.push_str(&text);
        return Ok(());
    }

    // Numbers default to right alignment, everything else to left.
    let align = spec.align.unwrap_or(if value.is_integer() {
        Align::Right
    } else {
        Align::Left
    });
    let pad = spec.width - len;
    let (before, after) = match align {
        Align::Left => (0, pad),
        Align::Right => (pad, 0),
        Align::Center => (pad / 2, pad - pad / 2),
    };
    out.extend(std::iter::repeat(spec.fill).take(before));
    out.push_str(&text);
    out.extend(std::iter::repeat(spec.fill).take(after));
    Ok(())
}

/// Renders `template` with `values`.
pub fn render(template: &str, values: &[Value]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + values.len() * 8);
    render_into(&mut out, template, values)?;
    Ok(out)
}

/// Like [`render`], appending to an existing buffer.
pub fn render_into(out: &mut String, template: &str, values: &[Value]) -> Result<(), FormatError> {
    let bytes = template.as_bytes();
    let mut next_arg = 0;
    let mut pos = 0;
    let mut literal_start = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' if bytes.get(pos + 1) == Some(&b'{') => {
                out.push_str(&template[literal_start..pos + 1]);
                pos += 2;
                literal_start = pos;
            }
            b'}' if bytes.get(pos + 1) == Some(&b'}') => {
                out.push_str(&template[literal_start..pos + 1]);
                pos += 2;
                literal_start = pos;
            }
            b'}' => return Err(FormatError::UnbalancedBrace(pos)),
            b'{' => {
                out.push_str(&template[literal_start..pos]);
                let close = template[pos..]
                    .find('}')
                    .map(|i| pos + i)
                    .ok_or(FormatError::UnbalancedBrace(pos))?;
                let field = &template[pos + 1..close];
                let (index, raw_spec) = match field.split_once(':') {
                    Some((index, spec)) => (index, spec),
                    None => (field, ""),
                };

                let index = if index.is_empty() {
                    let i = next_arg;
                    next_arg += 1;
                    i
                } else {
                    index
                        .parse::<usize>()
                        .map_err(|_| FormatError::InvalidSpec(field.to_string()))?
                };
                let spec = Spec::parse(raw_spec)?;
                let value = values.get(index).ok_or(FormatError::MissingArgument(index))?;
                write_value(out, value, &spec, raw_spec)?;

                pos = close + 1;
                literal_start = pos;
            }
            _ => pos += 1,
        }
    }
    out.push_str(&template[literal_start..]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_positional() {
        assert_eq!(render("value={}", &[Value::I64(42)]).unwrap(), "value=42");
        assert_eq!(
            render("a={}, b={}, c={}", &[Value::I32(1), Value::Placeholder, s("three")]).unwrap(),
            "a=1, b=?, c=three"
        );
    }

    #[test]
    fn test_explicit_index() {
        assert_eq!(render("{1} {0} {1}", &[s("a"), s("b")]).unwrap(), "b a b");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(render("{{}} {}", &[Value::Bool(true)]).unwrap(), "{} true");
        assert_eq!(render("no args", &[]).unwrap(), "no args");
    }

    #[test]
    fn test_specs() {
        assert_eq!(render("{:x}", &[Value::U32(255)]).unwrap(), "ff");
        assert_eq!(render("{:X}", &[Value::U8(171)]).unwrap(), "AB");
        assert_eq!(render("{:b}", &[Value::U8(5)]).unwrap(), "101");
        assert_eq!(render("{:o}", &[Value::U16(8)]).unwrap(), "10");
        assert_eq!(render("[{:5}]", &[Value::I16(-3)]).unwrap(), "[   -3]");
        assert_eq!(render("[{:5}]", &[s("ab")]).unwrap(), "[ab   ]");
        assert_eq!(render("[{:>5}]", &[s("ab")]).unwrap(), "[   ab]");
        assert_eq!(render("[{:*^6}]", &[s("ab")]).unwrap(), "[**ab**]");
        assert_eq!(render("[{:0>4x}]", &[Value::U8(10)]).unwrap(), "[000a]");
        assert_eq!(render("[{0:<3}]", &[Value::U8(1)]).unwrap(), "[1  ]");
    }

    #[test]
    fn test_placeholder_ignores_spec() {
        assert_eq!(render("[{:>5x}]", &[Value::Placeholder]).unwrap(), "[?]");
    }

    #[test]
    fn test_errors() {
        assert_matches!(render("{}", &[]), Err(FormatError::MissingArgument(0)));
        assert_matches!(render("{3}", &[Value::U8(1)]), Err(FormatError::MissingArgument(3)));
        assert_matches!(render("a {", &[]), Err(FormatError::UnbalancedBrace(2)));
        assert_matches!(render("a } b", &[]), Err(FormatError::UnbalancedBrace(2)));
        assert_matches!(render("{:x}", &[s("a")]), Err(FormatError::InvalidSpec(_)));
        assert_matches!(render("{:q}", &[Value::U8(1)]), Err(FormatError::InvalidSpec(_)));
        assert_matches!(render("{a}", &[Value::U8(1)]), Err(FormatError::InvalidSpec(_)));
    }

    #[test]
    fn test_width_is_bounded() {
        assert_eq!(render("{:65535}", &[s("a")]).unwrap().len(), 65535);
        assert_matches!(render("{:65536}", &[s("a")]), Err(FormatError::InvalidSpec(_)));
        assert_matches!(
            render("{:18446744073709551615}", &[Value::U8(1)]),
            Err(FormatError::InvalidSpec(_))
        );
        assert_matches!(
            render("{:99999999999999999999999}", &[Value::U8(1)]),
            Err(FormatError::InvalidSpec(_))
        );
    }
}
