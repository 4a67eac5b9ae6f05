//! Scanner for tag-delimited spans in model output.
//!
//! Model replies carry structured payloads between literal tags such as
//! `<AnswerInJson>...</AnswerInJson>`. The text is split into open-tag,
//! close-tag and text tokens, then a small state machine walks the tokens
//! either to capture the first span or to strip every span.
//!
//! Three nesting modes exist. [`Nesting::Flat`] pairs an opening tag with
//! the next closing tag; openings seen inside a span are ordinary text.
//! [`Nesting::Balanced`] tracks depth, so inner tag pairs are removed and
//! the outer span ends at its matching close. [`Nesting::Outermost`] runs
//! from the first opening tag to the last closing tag, keeping any tags in
//! between as text.

use thiserror::Error;

/// `<think>` reasoning leaked by some backends.
pub const THINK: Delimiters = Delimiters::new("<think>", "</think>", Nesting::Flat);

/// Primary answer payload. The payload may quote its own closing tag, so
/// the span ends at the last one.
pub const ANSWER: Delimiters =
    Delimiters::new("<AnswerInJson>", "</AnswerInJson>", Nesting::Outermost);

/// Payload of a JSON repair reply.
pub const FIX: Delimiters = Delimiters::new("<Json>", "</Json>", Nesting::Balanced);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    Flat,
    Balanced,
    Outermost,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("no {0} span found")]
    NotFound(&'static str),

    #[error("{0} span is never closed")]
    Unclosed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Text(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub struct Delimiters {
    open: &'static str,
    close: &'static str,
    nesting: Nesting,
}

impl Delimiters {
    pub const fn new(open: &'static str, close: &'static str, nesting: Nesting) -> Self {
        Self {
            open,
            close,
            nesting,
        }
    }

    pub fn open(&self) -> &'static str {
        self.open
    }

    pub fn close(&self) -> &'static str {
        self.close
    }

    /// Turn backslash-escaped tags (`\<Tag\>`, `\</Tag\>`) back into tags.
    pub fn unescape(&self, text: &str) -> String {
        text.replace(&escaped(self.open), self.open)
            .replace(&escaped(self.close), self.close)
    }

    /// Content of the first span, without its tags.
    pub fn capture(&self, text: &str) -> Result<String, SpanError> {
        if self.nesting == Nesting::Outermost {
            let tokens = self.tokens(text);
            let (start, end) = self.outermost(&tokens)?;
            return Ok(self.render(&tokens[start + 1..end]));
        }

        let mut depth = 0usize;
        let mut captured = String::new();

        for token in self.tokens(text) {
            match token {
                Token::Open if depth == 0 || self.nesting == Nesting::Balanced => depth += 1,
                Token::Open => captured.push_str(self.open),
                // stray close before any open
                Token::Close if depth == 0 => {}
                Token::Close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(captured);
                    }
                }
                Token::Text(t) if depth > 0 => captured.push_str(t),
                Token::Text(_) => {}
            }
        }

        if depth > 0 {
            Err(SpanError::Unclosed(self.open))
        } else {
            Err(SpanError::NotFound(self.open))
        }
    }

    /// Remove every closed span, tags included. An unclosed span and stray
    /// closing tags are left in place.
    pub fn strip(&self, text: &str) -> String {
        if self.nesting == Nesting::Outermost {
            let tokens = self.tokens(text);
            return match self.outermost(&tokens) {
                Ok((start, end)) => {
                    let mut out = self.render(&tokens[..start]);
                    out.push_str(&self.render(&tokens[end + 1..]));
                    out
                }
                Err(_) => text.to_string(),
            };
        }

        let mut depth = 0usize;
        let mut out = String::with_capacity(text.len());
        let mut pending = String::new();

        for token in self.tokens(text) {
            match token {
                Token::Text(t) if depth == 0 => out.push_str(t),
                Token::Close if depth == 0 => out.push_str(self.close),
                Token::Open if depth == 0 || self.nesting == Nesting::Balanced => {
                    depth += 1;
                    pending.push_str(self.open);
                }
                Token::Open => pending.push_str(self.open),
                Token::Text(t) => pending.push_str(t),
                Token::Close => {
                    depth -= 1;
                    if depth == 0 {
                        pending.clear();
                    } else {
                        pending.push_str(self.close);
                    }
                }
            }
        }

        if depth > 0 {
            out.push_str(&pending);
        }
        out
    }

    /// Indices of the first opening tag and the last closing tag after it.
    fn outermost(&self, tokens: &[Token<'_>]) -> Result<(usize, usize), SpanError> {
        let start = tokens
            .iter()
            .position(|t| *t == Token::Open)
            .ok_or(SpanError::NotFound(self.open))?;
        let end = tokens
            .iter()
            .rposition(|t| *t == Token::Close)
            .filter(|end| *end > start)
            .ok_or(SpanError::Unclosed(self.open))?;
        Ok((start, end))
    }

    fn render(&self, tokens: &[Token<'_>]) -> String {
        tokens
            .iter()
            .map(|token| match token {
                Token::Open => self.open,
                Token::Close => self.close,
                Token::Text(t) => *t,
            })
            .collect()
    }

    fn tokens<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        let mut rest = text;

        loop {
            let (index, token, len) = match (rest.find(self.open), rest.find(self.close)) {
                (None, None) => break,
                (Some(o), Some(c)) if c < o => (c, Token::Close, self.close.len()),
                (Some(o), _) => (o, Token::Open, self.open.len()),
                (None, Some(c)) => (c, Token::Close, self.close.len()),
            };
            if index > 0 {
                tokens.push(Token::Text(&rest[..index]));
            }
            tokens.push(token);
            rest = &rest[index + len..];
        }

        if !rest.is_empty() {
            tokens.push(Token::Text(rest));
        }
        tokens
    }
}

/// `<Tag>` -> `\<Tag\>`
fn escaped(tag: &str) -> String {
    format!("\\{}\\>", &tag[..tag.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_simple() {
        let text = "prefix <AnswerInJson>{\"a\":1}</AnswerInJson> suffix";
        assert_eq!(ANSWER.capture(text).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_flat_capture_first_span_only() {
        let text = "<think>one</think><think>two</think>";
        assert_eq!(THINK.capture(text).unwrap(), "one");
    }

    #[test]
    fn test_outermost_capture_runs_to_last_close() {
        let text = "<AnswerInJson>one</AnswerInJson><AnswerInJson>two</AnswerInJson> tail";
        assert_eq!(
            ANSWER.capture(text).unwrap(),
            "one</AnswerInJson><AnswerInJson>two"
        );
    }

    #[test]
    fn test_outermost_capture_keeps_quoted_close_tag() {
        let text = r#"<AnswerInJson>{"text":"wrap it in </AnswerInJson> tags"}</AnswerInJson>"#;
        assert_eq!(
            ANSWER.capture(text).unwrap(),
            r#"{"text":"wrap it in </AnswerInJson> tags"}"#
        );
    }

    #[test]
    fn test_outermost_close_before_open_is_unclosed() {
        assert_eq!(
            ANSWER.capture("</AnswerInJson> then <AnswerInJson>{}"),
            Err(SpanError::Unclosed("<AnswerInJson>"))
        );
    }

    #[test]
    fn test_outermost_strip() {
        let text = "a<AnswerInJson>x</AnswerInJson>y</AnswerInJson>b";
        assert_eq!(ANSWER.strip(text), "ab");
        assert_eq!(ANSWER.strip("a<AnswerInJson>open"), "a<AnswerInJson>open");
    }

    #[test]
    fn test_capture_missing_open() {
        assert_eq!(
            ANSWER.capture("just text </AnswerInJson>"),
            Err(SpanError::NotFound("<AnswerInJson>"))
        );
    }

    #[test]
    fn test_capture_unclosed() {
        assert_eq!(
            ANSWER.capture("<AnswerInJson>{\"a\":"),
            Err(SpanError::Unclosed("<AnswerInJson>"))
        );
    }

    #[test]
    fn test_flat_capture_keeps_inner_open_as_text() {
        let text = "<think>a<think>b</think>c</think>";
        assert_eq!(THINK.capture(text).unwrap(), "a<think>b");
    }

    #[test]
    fn test_balanced_capture_drops_nested_tags() {
        let text = "noise <Json>{\"a\":<Json>1</Json>}</Json> tail";
        assert_eq!(FIX.capture(text).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_unescape() {
        let text = r"\<AnswerInJson\>{}\</AnswerInJson\>";
        assert_eq!(ANSWER.unescape(text), "<AnswerInJson>{}</AnswerInJson>");
    }

    #[test]
    fn test_escaped_tags_are_not_tags_until_unescaped() {
        let text = r"\<Json\>{}\</Json\>";
        assert!(FIX.capture(text).is_err());
        assert_eq!(FIX.capture(&FIX.unescape(text)).unwrap(), "{}");
    }

    #[test]
    fn test_strip_pairs_first_open_with_next_close() {
        let text = "<think>a</think>keep<think>b</think>!";
        assert_eq!(THINK.strip(text), "keep!");
    }

    #[test]
    fn test_strip_flat_is_non_greedy() {
        let text = "<think>a<think>b</think>c</think>d";
        assert_eq!(THINK.strip(text), "c</think>d");
    }

    #[test]
    fn test_strip_leaves_unclosed_span() {
        let text = "before <think>never closed";
        assert_eq!(THINK.strip(text), text);
    }

    #[test]
    fn test_strip_without_tags_is_identity() {
        let text = "nothing to see";
        assert_eq!(THINK.strip(text), text);
    }

    #[test]
    fn test_balanced_strip_removes_nested() {
        let text = "x<Json>a<Json>b</Json>c</Json>y";
        assert_eq!(FIX.strip(text), "xy");
    }
}
