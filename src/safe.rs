//! Context-tagged safe strings
//!
//! Rendering only ever emits [`SafeString`]s: literal template text is safe
//! by construction, tag output is escaped into the output context unless it
//! is already safe for that context. Appending a value that is safe for a
//! *different* context escapes its text into the target context, so mixing
//! contexts never produces double escaping or unescaped leaks.

use std::fmt;

/// The sink a [`SafeString`] has been escaped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafeContext {
    Html,
    Url,
}

/// A string that is safe to emit into its [`SafeContext`] verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeString {
    context: SafeContext,
    text: String,
}

impl SafeString {
    /// Escape raw text into the given context.
    pub fn escape(context: SafeContext, raw: &str) -> Self {
        let text = match context {
            SafeContext::Html => html_escape(raw),
            SafeContext::Url => url_escape(raw),
        };
        Self { context, text }
    }

    /// Wrap text that is already safe for `context`, without escaping.
    pub fn from_safe(context: SafeContext, text: impl Into<String>) -> Self {
        Self {
            context,
            text: text.into(),
        }
    }

    pub fn context(&self) -> SafeContext {
        self.context
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Reverse the context's escaping, recovering the original text.
    pub fn unescape(&self) -> String {
        match self.context {
            SafeContext::Html => html_unescape(&self.text),
            SafeContext::Url => url_unescape(&self.text),
        }
    }

    /// Append another safe value. Same context appends verbatim; a foreign
    /// context has its (already escaped) text re-escaped into ours.
    pub fn push(&mut self, other: &SafeString) {
        if other.context == self.context {
            self.text.push_str(&other.text);
        } else {
            self.push_raw(other.as_str());
        }
    }

    /// Append raw text, escaping it into our context.
    pub fn push_raw(&mut self, raw: &str) {
        match self.context {
            SafeContext::Html => push_html_escaped(&mut self.text, raw),
            SafeContext::Url => self.text.push_str(&url_escape(raw)),
        }
    }

    /// Append text already known to be safe for our context.
    pub fn push_safe(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

impl fmt::Display for SafeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for SafeString {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl PartialEq<str> for SafeString {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for SafeString {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

/// Escape HTML special characters
pub(crate) fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    push_html_escaped(&mut out, s);
    out
}

fn push_html_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
}

fn html_unescape(s: &str) -> String {
    // &amp; last, so "&amp;lt;" round-trips to "&lt;"
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Form-urlencode raw text
pub(crate) fn url_escape(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn url_unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = &s[i + 1..i + 3];
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
