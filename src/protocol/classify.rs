//! Text message discrimination.
//!
//! Every text message is a JSON object carrying a short `"t"` tag.  The
//! classifier reads that tag without building a document: it walks the
//! top-level keys, skipping over nested values, and stops at the first
//! top-level `"t"` whose value is a string.  Keys and strings inside
//! `roads`, `labels` etc. are never inspected, so a street called
//! `"t":"vec"` cannot misroute a message.

/// Decodable text message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Vectorial map frame.
    Vector,
    /// Turn-by-turn navigation step.
    Nav,
    /// GPS speed / position.
    Gps,
    /// Google Maps notification step.
    Gmaps,
    /// Now-playing media state.
    Media,
    /// Phone notification.
    Notif,
}

impl MessageKind {
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"vec" => Some(Self::Vector),
            b"nav" => Some(Self::Nav),
            b"gps" => Some(Self::Gps),
            b"gmaps" => Some(Self::Gmaps),
            b"media" => Some(Self::Media),
            b"notif" => Some(Self::Notif),
            _ => None,
        }
    }
}

/// Classify a complete text message.  `None` for unknown, missing or
/// unreadable tags; those messages are ignored.
pub fn classify(text: &str) -> Option<MessageKind> {
    MessageKind::from_tag(find_tag(text.as_bytes())?)
}

/// Raw value of the top-level `"t"` string, escapes left as-is.
fn find_tag(bytes: &[u8]) -> Option<&[u8]> {
    let mut s = Scanner { bytes, pos: 0 };
    s.skip_ws();
    s.expect(b'{')?;
    loop {
        s.skip_ws();
        // Empty object or garbage where a key should be.
        if s.peek()? != b'"' {
            return None;
        }
        let key = s.string()?;
        s.skip_ws();
        s.expect(b':')?;
        s.skip_ws();
        if key == b"t" && s.peek()? == b'"' {
            return s.string();
        }
        s.skip_value()?;
        s.skip_ws();
        if s.next()? != b',' {
            return None;
        }
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn expect(&mut self, want: u8) -> Option<()> {
        (self.next()? == want).then_some(())
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Consume a string starting at the opening quote; returns the raw
    /// contents between the quotes.
    fn string(&mut self) -> Option<&'a [u8]> {
        self.expect(b'"')?;
        let start = self.pos;
        loop {
            match self.next()? {
                b'"' => return Some(&self.bytes[start..self.pos - 1]),
                b'\\' => {
                    self.next()?;
                }
                _ => {}
            }
        }
    }

    /// Skip one JSON value of any type, tracking bracket depth and
    /// string boundaries only.
    fn skip_value(&mut self) -> Option<()> {
        match self.peek()? {
            b'"' => self.string().map(|_| ()),
            b'{' | b'[' => {
                let mut depth = 0usize;
                loop {
                    match self.peek()? {
                        b'"' => {
                            self.string()?;
                            continue;
                        }
                        b'{' | b'[' => depth += 1,
                        b'}' | b']' => {
                            depth -= 1;
                            if depth == 0 {
                                self.pos += 1;
                                return Some(());
                            }
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
            }
            _ => {
                // Number, true, false, null.
                while !matches!(self.peek()?, b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r') {
                    self.pos += 1;
                }
                Some(())
            }
        }
    }
}
