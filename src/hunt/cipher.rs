//! ROT13 letter rotation used to obfuscate data fragments.
//!
//! The rotation is an involution: applying it twice returns the input. Only ASCII
//! letters move; case is preserved and every other character passes through.

/// Rotate every ASCII letter 13 places, preserving case.
pub fn rot13(text: &str) -> String {
    text.chars().map(rotate_char).collect()
}

fn rotate_char(c: char) -> char {
    match c {
        'a'..='z' => (((c as u8 - b'a' + 13) % 26) + b'a') as char,
        'A'..='Z' => (((c as u8 - b'A' + 13) % 26) + b'A') as char,
        _ => c,
    }
}
