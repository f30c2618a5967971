//! RADIX-50 character coding, as used by DEC software to pack three
//! characters of a filename into one 16-bit word.
//!
//! The 40-symbol alphabet is: space, `A`-`Z`, `0`-`9`, `$`, `.`, and one
//! reserved code point rendered here as `?`.  The highest valid encoding
//! is `0o174777` (all three digits 39); words above that are not RADIX-50
//! and decode to an explicit invalid marker rather than garbage.

/// The highest word value that is a valid RADIX-50 encoding.
pub const RAD50_MAX: u16 = 0o174777;

const RADIX: u16 = 40;

fn digit_to_char(digit: u16) -> char {
    match digit {
        0 => ' ',
        1..=26 => (b'A' + (digit - 1) as u8) as char,
        27..=36 => (b'0' + (digit - 27) as u8) as char,
        37 => '$',
        38 => '.',
        _ => '?',
    }
}

fn char_to_digit(c: char) -> Option<u16> {
    match c {
        ' ' => Some(0),
        'A'..='Z' => Some(c as u16 - 'A' as u16 + 1),
        'a'..='z' => Some(c as u16 - 'a' as u16 + 1),
        '0'..='9' => Some(c as u16 - '0' as u16 + 27),
        '$' => Some(37),
        '.' => Some(38),
        '?' => Some(39),
        _ => None,
    }
}

/// Decode one word into its three characters, most significant first.
/// Returns None for words above `RAD50_MAX`.
pub fn decode_word(word: u16) -> Option<[char; 3]> {
    if word > RAD50_MAX {
        return None;
    }
    let mut w = word;
    let mut digits = [0u16; 3];
    for d in digits.iter_mut() {
        *d = w % RADIX;
        w /= RADIX;
    }
    // Digits come out least significant first; the encoded order is most
    // significant first.
    Some([
        digit_to_char(digits[2]),
        digit_to_char(digits[1]),
        digit_to_char(digits[0]),
    ])
}

/// Encode three characters into one word.  Used when synthesizing test
/// volumes.  Returns None if any character is outside the alphabet.
pub fn encode_word(chars: [char; 3]) -> Option<u16> {
    let mut word = 0u16;
    for c in chars.iter() {
        word = word * RADIX + char_to_digit(*c)?;
    }
    Some(word)
}

/// Decode a run of words into a name fragment.  Trailing spaces are
/// trimmed.  Each invalid word contributes `???`, keeping the three
/// characters per word that valid words contribute, so positions stay
/// aligned.  Returns None when every word is invalid, so callers can
/// distinguish "no name found" from "name is empty".
pub fn decode_name(words: &[u16]) -> Option<String> {
    let mut name = String::with_capacity(words.len() * 3);
    let mut any_valid = false;
    for w in words {
        match decode_word(*w) {
            Some(chars) => {
                any_valid = true;
                name.extend(chars.iter());
            }
            None => name.push_str("???"),
        }
    }
    if !any_valid {
        return None;
    }
    while name.ends_with(' ') {
        name.pop();
    }
    Some(name)
}

/// Encode a string as `count` words, padding with spaces.  Returns None
/// if the string is too long or contains characters outside the alphabet.
pub fn encode_name(name: &str, count: usize) -> Option<Vec<u16>> {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() > count * 3 {
        return None;
    }
    let mut words = Vec::with_capacity(count);
    for i in 0..count {
        let mut group = [' '; 3];
        for (j, g) in group.iter_mut().enumerate() {
            if let Some(c) = chars.get(i * 3 + j) {
                *g = *c;
            }
        }
        words.push(encode_word(group)?);
    }
    Some(words)
}
