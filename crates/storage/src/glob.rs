//! Glob pattern matching for scans.
//!
//! Follows Redis `SCAN ... MATCH` rules, byte-wise:
//! - `*` any run of bytes, `?` any single byte
//! - `[abc]`, `[^abc]`, `[a-z]` byte classes
//! - `\x` matches `x` literally

/// Bytes with special meaning in a glob pattern.
pub const GLOB_META: [char; 5] = ['*', '?', '[', ']', '\\'];

/// True if `s` contains any glob metacharacter.
pub fn contains_glob_meta(s: &str) -> bool {
    s.contains(&GLOB_META[..])
}

/// Match `text` against the glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    match_from(pattern.as_bytes(), text.as_bytes())
}

fn match_from(mut p: &[u8], mut s: &[u8]) -> bool {
    while let Some(&c) = p.first() {
        match c {
            b'*' => {
                while p.len() > 1 && p[1] == b'*' {
                    p = &p[1..];
                }
                if p.len() == 1 {
                    return true;
                }
                let rest = &p[1..];
                return (0..=s.len()).any(|i| match_from(rest, &s[i..]));
            }
            b'?' => {
                if s.is_empty() {
                    return false;
                }
                p = &p[1..];
                s = &s[1..];
            }
            b'[' => {
                let Some(&ch) = s.first() else {
                    return false;
                };
                let (matched, consumed) = match_class(&p[1..], ch);
                if !matched {
                    return false;
                }
                p = &p[1 + consumed..];
                s = &s[1..];
            }
            b'\\' if p.len() >= 2 => {
                if s.first() != Some(&p[1]) {
                    return false;
                }
                p = &p[2..];
                s = &s[1..];
            }
            _ => {
                if s.first() != Some(&c) {
                    return false;
                }
                p = &p[1..];
                s = &s[1..];
            }
        }
    }
    s.is_empty()
}

/// Match one byte against a class body (the bytes after `[`).
///
/// Returns whether it matched and how many pattern bytes the class used,
/// including the closing `]`. An unterminated class runs to the end of the
/// pattern.
fn match_class(class: &[u8], ch: u8) -> (bool, usize) {
    let mut i = 0;
    let negate = class.first() == Some(&b'^');
    if negate {
        i += 1;
    }
    let mut matched = false;
    while i < class.len() && class[i] != b']' {
        if class[i] == b'\\' && i + 1 < class.len() {
            matched |= class[i + 1] == ch;
            i += 2;
        } else if i + 2 < class.len() && class[i + 1] == b'-' && class[i + 2] != b']' {
            let (lo, hi) = if class[i] <= class[i + 2] {
                (class[i], class[i + 2])
            } else {
                (class[i + 2], class[i])
            };
            matched |= lo <= ch && ch <= hi;
            i += 3;
        } else {
            matched |= class[i] == ch;
            i += 1;
        }
    }
    let consumed = if i < class.len() { i + 1 } else { i };
    (matched != negate, consumed)
}
