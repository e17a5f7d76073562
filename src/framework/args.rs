//! Cursor over the raw text following a command name.

use crate::framework::transformer::{TransformError, Transformer};

/// Remaining, not yet consumed, arguments of a command invocation.
#[derive(Clone, Debug)]
pub struct Args {
    raw: String,
    offset: usize,
}

impl Args {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            offset: 0,
        }
    }

    /// Everything not yet consumed, with surrounding whitespace removed.
    pub fn rest(&self) -> &str {
        self.raw[self.offset..].trim()
    }

    pub fn is_empty(&self) -> bool {
        self.rest().is_empty()
    }

    /// Consume everything that is left.
    pub fn take_rest(&mut self) -> String {
        let rest = self.rest().to_owned();
        self.offset = self.raw.len();
        rest
    }

    pub fn peek_token(&self) -> Result<Option<String>, TransformError> {
        Ok(scan_token(&self.raw[self.offset..])?.map(|(token, _)| token))
    }

    /// Next whitespace-delimited token.  A token opening with `"` runs until the closing quote and
    /// may contain whitespace.
    pub fn next_token(&mut self) -> Result<Option<String>, TransformError> {
        match scan_token(&self.raw[self.offset..])? {
            Some((token, consumed)) => {
                self.offset += consumed;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    /// Like `next_token`, but a missing token is an error naming what was expected.
    pub fn require_token(&mut self, expected: &'static str) -> Result<String, TransformError> {
        self.next_token()?
            .ok_or(TransformError::Missing { expected })
    }

    /// Run a transformer against the cursor.  Nothing is consumed if it fails.
    pub fn parse<T: Transformer>(&mut self, transformer: &T) -> Result<T::Output, TransformError> {
        let saved = self.offset;
        let result = transformer.transform(self);
        if result.is_err() {
            self.offset = saved;
        }
        result
    }

    /// Fails if anything is left over.
    pub fn finish(&self) -> Result<(), TransformError> {
        match self.peek_token() {
            Ok(None) => Ok(()),
            Ok(Some(found)) => Err(TransformError::TooManyArguments { found }),
            Err(err) => Err(err),
        }
    }
}

/// Returns the token at the start of `input` and how many bytes of `input` it spans.
fn scan_token(input: &str) -> Result<Option<(String, usize)>, TransformError> {
    let start = input.len() - input.trim_start().len();
    let trimmed = &input[start..];
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some(quoted) = trimmed.strip_prefix('"') {
        let end = quoted.find('"').ok_or(TransformError::UnclosedQuote)?;
        // opening quote + contents + closing quote
        return Ok(Some((quoted[..end].to_owned(), start + end + 2)));
    }

    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    Ok(Some((trimmed[..end].to_owned(), start + end)))
}
