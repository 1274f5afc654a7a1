//! Text clean-up applied to upstream content before it reaches the renderer

/// Symbols commonly found in arXiv titles and abstracts, mapped to ASCII
const ASCII_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2212}', "-"),
    ('\u{203A}', ">"),
    ('\u{2039}', "<"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{00D7}', "x"),
    ('\u{221E}', "inf"),
    ('\u{2248}', "~"),
    ('\u{2264}', "<="),
    ('\u{2265}', ">="),
    ('\u{03BC}', "u"),
    ('\u{03B1}', "alpha"),
    ('\u{03B2}', "beta"),
    ('\u{03B3}', "gamma"),
    ('\u{03B8}', "theta"),
];

/// Map known symbols to ASCII, drop any other non-ASCII character and
/// collapse whitespace
pub fn to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some((_, replacement)) = ASCII_REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            out.push_str(replacement);
        } else if c.is_ascii() {
            out.push(c);
        }
    }
    collapse_whitespace(&out)
}

/// Join whitespace runs (including newlines) into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
