use alloc::{string::String, vec::Vec};
use core::fmt;

/// A command line couldn't be split into words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    /// A quote was opened and never closed
    UnterminatedQuote(char),

    /// The input ended with an unquoted backslash
    DanglingEscape,
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SplitError::UnterminatedQuote(quote) => write!(f, "unterminated {quote} quote"),
            SplitError::DanglingEscape => write!(f, "trailing backslash with nothing to escape"),
        }
    }
}

impl core::error::Error for SplitError {}

#[derive(Clone, Copy)]
enum Quote {
    None,
    Single,
    Double,
}

/**
Split a line (or a whole file) into words the way a POSIX shell would, minus
expansions: whitespace separates words, single quotes preserve everything
literally, double quotes preserve everything except `\"` and `\\`, and a
backslash outside quotes escapes the next character. Adjacent quoted and
unquoted pieces join into one word, and `''` is an empty word.

```
use quarrel_lexer::split_words;

let words = split_words(r#"--name "Jane Doe" it\'s 'a b'c"#).unwrap();
assert_eq!(words, ["--name", "Jane Doe", "it's", "a bc"]);
```
*/
pub fn split_words(input: &str) -> Result<Vec<String>, SplitError> {
    let mut words = Vec::new();

    // `None` means we're between words. This is distinct from an empty word,
    // which can be produced by `''`.
    let mut word: Option<String> = None;
    let mut quote = Quote::None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::None => match c {
                c if c.is_whitespace() => words.extend(word.take()),
                '\'' => {
                    word.get_or_insert_default();
                    quote = Quote::Single;
                }
                '"' => {
                    word.get_or_insert_default();
                    quote = Quote::Double;
                }
                '\\' => {
                    let escaped = chars.next().ok_or(SplitError::DanglingEscape)?;
                    word.get_or_insert_default().push(escaped);
                }
                c => word.get_or_insert_default().push(c),
            },
            Quote::Single => match c {
                '\'' => quote = Quote::None,
                c => word.get_or_insert_default().push(c),
            },
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => {
                    let escaped = chars.next().ok_or(SplitError::UnterminatedQuote('"'))?;
                    let word = word.get_or_insert_default();

                    if !matches!(escaped, '"' | '\\') {
                        word.push('\\');
                    }
                    word.push(escaped);
                }
                c => word.get_or_insert_default().push(c),
            },
        }
    }

    match quote {
        Quote::None => {
            words.extend(word);
            Ok(words)
        }
        Quote::Single => Err(SplitError::UnterminatedQuote('\'')),
        Quote::Double => Err(SplitError::UnterminatedQuote('"')),
    }
}
