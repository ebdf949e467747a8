/*!
Token preprocessing, run once on the whole input before matching: argument
files named by tokens like `@args.txt` are read and spliced in place
(recursively), and comment tokens are dropped. Both stop at the first `--`.
*/

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use quarrel_lexer::{MARKER, SplitError, split_words};
use tracing::debug;

use crate::parser::ParserSettings;

/// Preprocessing failed on an argument file. The parser turns these into
/// diagnostics in its own language.
#[derive(Debug)]
pub(crate) enum Failure {
    Unreadable { path: PathBuf, source: io::Error },

    /// The file's contents couldn't be split into words
    Malformed { path: PathBuf, source: SplitError },

    /// The file names itself, directly or through other files
    Recursive { path: PathBuf },
}

struct Expander<'a> {
    settings: &'a ParserSettings,
    out: Vec<String>,

    // Files currently being expanded, outermost first
    stack: Vec<PathBuf>,
    positional_only: bool,
}

impl Expander<'_> {
    fn starts_with_any(token: &str, chars: &str) -> bool {
        token.chars().next().is_some_and(|c| chars.contains(c))
    }

    fn expand(&mut self, tokens: impl IntoIterator<Item = String>) -> Result<(), Failure> {
        for token in tokens {
            if self.positional_only {
                self.out.push(token);
            } else if token == MARKER {
                self.positional_only = true;
                self.out.push(token);
            } else if Self::starts_with_any(&token, &self.settings.fromfile_prefix_chars) {
                let mut chars = token.chars();
                chars.next();
                self.expand_file(Path::new(chars.as_str()))?;
            } else if !Self::starts_with_any(&token, &self.settings.comment_prefix_chars) {
                self.out.push(token);
            }
        }

        Ok(())
    }

    fn expand_file(&mut self, path: &Path) -> Result<(), Failure> {
        if self.stack.iter().any(|open| open == path) {
            return Err(Failure::Recursive {
                path: path.to_owned(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|source| Failure::Unreadable {
            path: path.to_owned(),
            source,
        })?;

        let mut words = Vec::new();
        for line in contents.lines() {
            words.extend(split_words(line).map_err(|source| Failure::Malformed {
                path: path.to_owned(),
                source,
            })?);
        }

        debug!(
            path = %path.display(),
            tokens = words.len(),
            depth = self.stack.len(),
            "expanding argument file"
        );

        self.stack.push(path.to_owned());
        let result = self.expand(words);
        self.stack.pop();
        result
    }
}

/// Expand argument files and strip comments, per the parser's settings
pub(crate) fn preprocess(
    settings: &ParserSettings,
    tokens: Vec<String>,
) -> Result<Vec<String>, Failure> {
    if settings.fromfile_prefix_chars.is_empty() && settings.comment_prefix_chars.is_empty() {
        return Ok(tokens);
    }

    let mut expander = Expander {
        settings,
        out: Vec::with_capacity(tokens.len()),
        stack: Vec::new(),
        positional_only: false,
    };

    expander.expand(tokens)?;
    Ok(expander.out)
}
