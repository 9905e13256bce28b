use std::fmt::{self, Display, Write};

/// # Message Buffer
///
/// Accumulates the text of a single log message. Every value appended is
/// rendered through its `Display` implementation and concatenated in call order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageBuffer {
    text: String,
}

impl MessageBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the textual form of `value`.
    ///
    /// A `Display` implementation that reports an error leaves whatever it
    /// managed to write in place; the append itself never fails.
    pub fn append<T: Display>(&mut self, value: T) -> &mut Self {
        let _ = write!(self.text, "{}", value);
        self
    }

    /// Appends pre-formatted arguments, as produced by `format_args!`.
    pub fn append_args(&mut self, args: fmt::Arguments<'_>) -> &mut Self {
        let _ = self.text.write_fmt(args);
        self
    }

    /// The text accumulated so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length of the accumulated text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Consumes the buffer and returns the accumulated text.
    pub fn into_string(self) -> String {
        self.text
    }
}

impl Write for MessageBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}

impl Display for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
