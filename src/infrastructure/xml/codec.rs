//! Text encoding used for cell content inside table XML files.
//!
//! Characters XML cannot carry (most C0/C1 controls, U+FFFE, U+FFFF) and the
//! backslash itself are written as `\uXXXX`; runs of two or more spaces are
//! written as repeated ` ` so they survive whitespace normalization.

/// Escape a cell string and make it safe as XML character data
pub fn encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut spaces = 0usize;

    for c in text.chars() {
        if c == ' ' {
            spaces += 1;
            continue;
        }
        flush_spaces(&mut out, spaces);
        spaces = 0;

        if needs_unicode_escape(c) {
            out.push_str(&format!("\\u{:04X}", c as u32));
            continue;
        }
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    flush_spaces(&mut out, spaces);

    out
}

fn flush_spaces(out: &mut String, spaces: usize) {
    match spaces {
        0 => {}
        1 => out.push(' '),
        n => out.push_str(&"\\u0020".repeat(n)),
    }
}

fn needs_unicode_escape(c: char) -> bool {
    let code = c as u32;
    code == 0x5C
        || code <= 0x8
        || code == 0xB
        || code == 0xC
        || (0xE..=0x1F).contains(&code)
        || (0x7F..=0x9F).contains(&code)
        || code == 0xFFFE
        || code == 0xFFFF
}

/// Reverse the `\uXXXX` escapes of already entity-decoded text.
///
/// `\uuuu0020` and `\u+0020` forms are accepted. A UTF-16 surrogate pair
/// written as two escapes is combined; malformed escapes are kept verbatim.
pub fn decode(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match parse_escape(tail) {
            Some((unit, consumed)) => {
                let after = &tail[consumed..];
                match char::from_u32(unit) {
                    Some(c) => {
                        out.push(c);
                        rest = after;
                    }
                    None => match combine_surrogates(unit, after) {
                        Some((c, extra)) => {
                            out.push(c);
                            rest = &after[extra..];
                        }
                        None => {
                            out.push_str(&tail[..consumed]);
                            rest = after;
                        }
                    },
                }
            }
            None => {
                out.push('\\');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse `\u[u...][+]XXXX` at the start of `s`, returning the code unit and
/// the number of bytes consumed
fn parse_escape(s: &str) -> Option<(u32, usize)> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'\\' || bytes[1] != b'u' {
        return None;
    }
    let mut i = 2;
    while i < bytes.len() && bytes[i] == b'u' {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'+' {
        i += 1;
    }
    let digits = s.get(i..i + 4)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let unit = u32::from_str_radix(digits, 16).ok()?;
    Some((unit, i + 4))
}

fn combine_surrogates(high: u32, after: &str) -> Option<(char, usize)> {
    if !(0xD800..0xDC00).contains(&high) {
        return None;
    }
    let (low, consumed) = parse_escape(after)?;
    if !(0xDC00..0xE000).contains(&low) {
        return None;
    }
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).map(|c| (c, consumed))
}
