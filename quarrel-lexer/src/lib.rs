#![no_std]

/*!
Low-level token handling for `quarrel`. Takes care of the shapes a raw
command-line token can have (the `--` marker, prefixed option-like tokens,
plain words), `name=value` splitting, short clusters like `-vvv` or `-fVALUE`,
negative-number detection, and quote-aware splitting of whole command lines.

Nothing here knows about a grammar. Deciding whether `--verb` *is* a flag
requires the registered flags, and that happens in `quarrel` itself; this crate
only answers questions about the characters of a token. Usually this is too low
level to use directly.
*/

extern crate alloc;

mod words;

pub use words::{SplitError, split_words};

/// The token that switches a parse into positional-only mode. Only the first
/// occurrence is a marker; later ones are ordinary values.
pub const MARKER: &str = "--";

/**
The shape of a single raw token, relative to a set of prefix characters.

```
use quarrel_lexer::{Shape, classify};

assert_eq!(classify("--", "-"), Shape::Marker);
assert_eq!(classify("input.txt", "-"), Shape::Plain);
assert_eq!(classify("-", "-"), Shape::Plain);
assert!(matches!(classify("--name", "-"), Shape::Prefixed(p) if p.is_long()));
```
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a> {
    /// The literal `--`
    Marker,

    /// Empty, a lone prefix character, or something that doesn't start with
    /// a prefix character at all
    Plain,

    /// Starts with a prefix character and has at least one more character
    Prefixed(Prefixed<'a>),
}

/// A token that starts with a prefix character, like `-v`, `--name=x`, or
/// `+opt`. Whether it names a registered flag is decided elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefixed<'a> {
    token: &'a str,

    /// Byte length of the leading prefix: one character for short-style
    /// tokens, two for long-style tokens.
    prefix_len: usize,
    long: bool,
}

impl<'a> Prefixed<'a> {
    #[inline]
    #[must_use]
    pub fn token(&self) -> &'a str {
        self.token
    }

    /// True if the second character is also a prefix character (`--name`)
    #[inline]
    #[must_use]
    pub fn is_long(&self) -> bool {
        self.long
    }

    /// The prefix character this token starts with
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &'a str {
        let first = self.token.chars().next().map_or(0, char::len_utf8);
        &self.token[..first]
    }

    /**
    Split `--name=value` into `("--name", "value")`. The `=` is searched only
    after the leading prefix, so a token like `-=` never splits into an empty
    name.
    */
    #[must_use]
    pub fn split_value(&self) -> Option<(&'a str, &'a str)> {
        let body = &self.token[self.prefix_len..];
        split_once(body, b'=').map(|(name, value)| {
            let name_end = self.prefix_len + name.len();
            (&self.token[..name_end], value)
        })
    }

    /**
    For short-style tokens longer than two characters, split off the
    two-character head: `-fVALUE` becomes `("-f", "VALUE")` and `-vvv`
    becomes `("-v", "vv")`. Long-style tokens never have a short head.
    */
    #[must_use]
    pub fn short_head(&self) -> Option<(&'a str, &'a str)> {
        if self.long {
            return None;
        }

        let mut chars = self.token[self.prefix_len..].chars();
        let head = self.prefix_len + chars.next()?.len_utf8();

        match &self.token[head..] {
            "" => None,
            rest => Some((&self.token[..head], rest)),
        }
    }
}

/// Determine the [`Shape`] of a token, given the set of characters that can
/// start an option.
#[must_use]
pub fn classify<'a>(token: &'a str, prefix_chars: &str) -> Shape<'a> {
    if token == MARKER {
        return Shape::Marker;
    }

    let mut chars = token.chars();

    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if prefix_chars.contains(first) => {
            let long = prefix_chars.contains(second);
            let prefix_len = match long {
                true => first.len_utf8() + second.len_utf8(),
                false => first.len_utf8(),
            };

            Shape::Prefixed(Prefixed {
                token,
                prefix_len,
                long,
            })
        }
        _ => Shape::Plain,
    }
}

/**
True if the token looks like a negative number: `-1`, `-25`, `-1.5`, `-.5`.
Such tokens are treated as values rather than flags, unless the grammar itself
registers a flag of this shape.
*/
#[must_use]
pub fn is_negative_number(token: &str) -> bool {
    let Some(body) = token.strip_prefix('-') else {
        return false;
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    match body.split_once('.') {
        None => all_digits(body),
        Some((whole, fraction)) => {
            (whole.is_empty() || all_digits(whole)) && all_digits(fraction)
        }
    }
}

/// Split on the first instance of `delimiter`, which must be an ASCII byte
/// so that both halves stay on character boundaries.
#[must_use]
pub fn split_once(input: &str, delimiter: u8) -> Option<(&str, &str)> {
    debug_assert!(delimiter.is_ascii());

    memchr::memchr(delimiter, input.as_bytes()).map(|i| (&input[..i], &input[i + 1..]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    PositionalOnly,
}

/**
A cursor over the raw tokens of a single parse. It tracks the position and
whether the `--` marker has been consumed; everything else (which tokens are
flags, how many values a flag takes) is decided by the caller, which peeks,
classifies, and advances.

The cursor is `Copy`, so a caller can probe ahead with a copy and commit by
assigning the copy back.
*/
#[derive(Debug)]
pub struct Tokens<'arg, T> {
    state: State,
    tokens: &'arg [T],
    position: usize,
}

impl<T> Clone for Tokens<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Tokens<'_, T> {}

impl<'arg, T> Tokens<'arg, T>
where
    T: AsRef<str>,
{
    #[inline]
    #[must_use]
    pub fn new(tokens: &'arg [T]) -> Self {
        Self {
            state: State::Ready,
            tokens,
            position: 0,
        }
    }

    /// The next token, without consuming it
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<&'arg str> {
        self.tokens.get(self.position).map(AsRef::as_ref)
    }

    #[inline]
    pub fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Consume and return the next token
    #[inline]
    pub fn next_token(&mut self) -> Option<&'arg str> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    /// True once the `--` marker has been consumed
    #[inline]
    #[must_use]
    pub fn positional_only(&self) -> bool {
        matches!(self.state, State::PositionalOnly)
    }

    /**
    If the next token is the first `--` marker, consume it, switch to
    positional-only mode, and return true. Later `--` tokens are left alone,
    because after the first one they are ordinary values.
    */
    pub fn take_marker(&mut self) -> bool {
        match (self.state, self.peek()) {
            (State::Ready, Some(MARKER)) => {
                self.position += 1;
                self.state = State::PositionalOnly;
                true
            }
            _ => false,
        }
    }

    /// Consume every remaining token, verbatim
    pub fn take_rest(&mut self) -> &'arg [T] {
        let rest = self.tokens.get(self.position..).unwrap_or(&[]);
        self.position = self.tokens.len();
        rest
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes() {
        assert_eq!(classify("", "-"), Shape::Plain);
        assert_eq!(classify("-", "-"), Shape::Plain);
        assert_eq!(classify("value", "-"), Shape::Plain);
        assert_eq!(classify("--", "-+"), Shape::Marker);

        let Shape::Prefixed(short) = classify("-v", "-") else {
            panic!("-v should be prefixed");
        };
        assert!(!short.is_long());
        assert_eq!(short.prefix(), "-");

        let Shape::Prefixed(plus) = classify("++opt", "-+") else {
            panic!("++opt should be prefixed");
        };
        assert!(plus.is_long());
        assert_eq!(plus.prefix(), "+");

        assert_eq!(classify("+opt", "-"), Shape::Plain);
    }

    #[test]
    fn value_split() {
        let Shape::Prefixed(token) = classify("--name=a=b", "-") else {
            panic!("expected a prefixed token");
        };
        assert_eq!(token.split_value(), Some(("--name", "a=b")));

        let Shape::Prefixed(token) = classify("--name=", "-") else {
            panic!("expected a prefixed token");
        };
        assert_eq!(token.split_value(), Some(("--name", "")));

        let Shape::Prefixed(token) = classify("--name", "-") else {
            panic!("expected a prefixed token");
        };
        assert_eq!(token.split_value(), None);
    }

    #[test]
    fn short_heads() {
        let Shape::Prefixed(token) = classify("-fvalue", "-") else {
            panic!("expected a prefixed token");
        };
        assert_eq!(token.short_head(), Some(("-f", "value")));

        let Shape::Prefixed(token) = classify("-f", "-") else {
            panic!("expected a prefixed token");
        };
        assert_eq!(token.short_head(), None);

        let Shape::Prefixed(token) = classify("--flag", "-") else {
            panic!("expected a prefixed token");
        };
        assert_eq!(token.short_head(), None);
    }

    #[test]
    fn negative_numbers() {
        assert!(is_negative_number("-1"));
        assert!(is_negative_number("-250"));
        assert!(is_negative_number("-1.5"));
        assert!(is_negative_number("-.5"));

        assert!(!is_negative_number("-"));
        assert!(!is_negative_number("-x"));
        assert!(!is_negative_number("-1."));
        assert!(!is_negative_number("--1"));
        assert!(!is_negative_number("1"));
        assert!(!is_negative_number("-1e3"));
    }

    #[test]
    fn marker_is_taken_once() {
        let tokens = ["a", "--", "--", "b"];
        let mut cursor = Tokens::new(&tokens);

        assert!(!cursor.take_marker());
        assert_eq!(cursor.next_token(), Some("a"));
        assert!(cursor.take_marker());
        assert!(cursor.positional_only());

        // The second `--` is a value
        assert!(!cursor.take_marker());
        assert_eq!(cursor.next_token(), Some("--"));
        assert_eq!(cursor.take_rest(), &["b"]);
        assert!(cursor.is_empty());
        assert_eq!(cursor.peek(), None);
    }

    #[test]
    fn probing_with_a_copy() {
        let tokens = ["a", "b", "c"];
        let mut cursor = Tokens::new(&tokens);
        let mut probe = cursor;

        probe.advance();
        probe.advance();
        assert_eq!(cursor.position(), 0);

        cursor = probe;
        assert_eq!(cursor.peek(), Some("c"));
    }
}
