use crate::banner::BannerBuffer;
use crate::patterns::{Cursor, HttpField, Matchers};

/// Raw context value signaling permanent completion.
///
/// Returned as-is (never re-packed with cursor or field bits) so callers can
/// test a stored context with a single equality check and free the
/// per-connection state instead of persisting it.
pub const DONE_CONTEXT: u32 = 0xFF;

const DONE_STATE: u8 = 0xFF;

/// The literal every HTTP response must begin with.
const SIGNATURE: &[u8; 5] = b"HTTP/";

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// Parser states. Each one resumes cleanly at a fragment boundary; the whole
/// machine suspends into the low byte of a packed context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Matching `HTTP/` case-insensitively, one position at a time (0..=4).
    Signature(u8),
    /// Version digits before the dot.
    Version,
    /// Digits after the dot, until whitespace.
    Code,
    /// Rest of the status line, up to the newline.
    Reason,
    /// Start of a header line.
    FieldStart,
    /// Keyword scan over the header-field vocabulary.
    FieldName,
    /// Whitespace after the colon, before the value.
    FieldColon,
    /// Header value bytes, up to the newline.
    FieldValue,
    /// Body scan over the HTML tag vocabulary.
    Content,
    /// Inside a matched tag, skipping to `>`.
    ContentTag,
    /// Tag text content, up to the next `<`.
    ContentField,
    /// Terminal; all further input is ignored.
    Done,
}

impl State {
    fn encode(self) -> u8 {
        match self {
            State::Signature(pos) => pos,
            State::Version => 5,
            State::Code => 6,
            State::Reason => 7,
            State::FieldStart => 8,
            State::FieldName => 9,
            State::FieldColon => 10,
            State::FieldValue => 11,
            State::Content => 12,
            State::ContentTag => 13,
            State::ContentField => 14,
            State::Done => DONE_STATE,
        }
    }

    /// Unrecognized state bytes decode to `Done`: a corrupted context
    /// terminates the connection's scan silently rather than misparsing.
    fn decode(byte: u8) -> State {
        match byte {
            0..=4 => State::Signature(byte),
            5 => State::Version,
            6 => State::Code,
            7 => State::Reason,
            8 => State::FieldStart,
            9 => State::FieldName,
            10 => State::FieldColon,
            11 => State::FieldValue,
            12 => State::Content,
            13 => State::ContentTag,
            14 => State::ContentField,
            _ => State::Done,
        }
    }
}

/// Outcome of handling one byte in a single-byte state: either the byte was
/// consumed, or the state changed and the same byte must be re-examined by
/// the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Consumed,
    Reconsume,
}

// ---------------------------------------------------------------------------
// Resume context
// ---------------------------------------------------------------------------

/// The parser's entire suspended execution state: which state to resume
/// into, which field's value is being extracted, and the keyword matcher's
/// suspended cursor. Packs into a single `u32` for callers that persist one
/// integer per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeState {
    state: State,
    field: u8,
    cursor: Cursor,
}

impl ResumeState {
    /// Start of response, no bytes consumed. Packs to `0`.
    pub const START: ResumeState = ResumeState {
        state: State::Signature(0),
        field: 0,
        cursor: Cursor(0),
    };

    /// Whether the scan has permanently finished for this connection.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Pack into the wire layout: bits [31:16] matcher cursor, [15:8] active
    /// field id, [7:0] state. A terminal state packs to exactly
    /// [`DONE_CONTEXT`].
    pub fn pack(self) -> u32 {
        if self.state == State::Done {
            return DONE_CONTEXT;
        }
        (self.cursor.bits() as u32) << 16
            | (self.field as u32) << 8
            | self.state.encode() as u32
    }

    /// Inverse of [`pack`]. `unpack(0)` is [`ResumeState::START`].
    ///
    /// [`pack`]: Self::pack
    pub fn unpack(ctx: u32) -> ResumeState {
        let state = State::decode((ctx & 0xFF) as u8);
        if state == State::Done {
            return ResumeState {
                state,
                field: 0,
                cursor: Cursor(0),
            };
        }
        ResumeState {
            state,
            field: ((ctx >> 8) & 0xFF) as u8,
            cursor: Cursor::from_bits((ctx >> 16) as u16),
        }
    }

    // ----- state machine --------------------------------------------------

    /// Consume the whole fragment, mutating this context and appending any
    /// extracted bytes to `banner`.
    fn advance(&mut self, m: &Matchers, data: &[u8], banner: &mut BannerBuffer) {
        let mut pos = 0;

        while pos < data.len() {
            match self.state {
                State::Done => break,

                // ----- keyword-scan states consume a variable run -----
                State::FieldName => self.scan_field_name(m, data, &mut pos),
                State::Content => self.scan_content(m, banner, data, &mut pos),

                // ----- bulk-scan paths for the body run states -----
                State::ContentTag => match data[pos..].iter().position(|&b| b == b'>') {
                    Some(n) => {
                        pos += n + 1;
                        self.state = State::ContentField;
                    }
                    None => pos = data.len(),
                },
                State::ContentField => match data[pos..].iter().position(|&b| b == b'<') {
                    Some(n) => {
                        banner.append(&data[pos..pos + n]);
                        pos += n + 1;
                        self.cursor = m.html_tags().start_cursor();
                        self.state = State::Content;
                    }
                    None => {
                        banner.append(&data[pos..]);
                        pos = data.len();
                    }
                },

                // ----- single-byte states -----
                _ => {
                    let byte = data[pos];
                    match self.step(m, banner, byte) {
                        Step::Consumed => pos += 1,
                        Step::Reconsume => {}
                    }
                }
            }
        }
    }

    /// Handle one byte in a single-byte state.
    fn step(&mut self, m: &Matchers, banner: &mut BannerBuffer, byte: u8) -> Step {
        match self.state {
            // ===================== STATUS LINE =====================
            State::Signature(pos) => {
                if byte.to_ascii_uppercase() == SIGNATURE[pos as usize] {
                    self.state = if pos == 4 {
                        State::Version
                    } else {
                        State::Signature(pos + 1)
                    };
                } else {
                    self.state = State::Done;
                }
                Step::Consumed
            }

            State::Version => {
                if byte == b'.' {
                    self.state = State::Code;
                } else if !byte.is_ascii_digit() {
                    self.state = State::Done;
                }
                Step::Consumed
            }

            State::Code => {
                if byte.is_ascii_whitespace() {
                    self.state = State::Reason;
                } else if !byte.is_ascii_digit() {
                    self.state = State::Done;
                }
                Step::Consumed
            }

            State::Reason => {
                // Known gap: a 1xx informational code is not detected here,
                // so the status line is not re-read after it.
                if byte == b'\n' {
                    self.state = State::FieldStart;
                }
                Step::Consumed
            }

            // ===================== HEADERS =====================
            State::FieldStart => match byte {
                b'\r' => Step::Consumed,
                b'\n' => {
                    // Blank line ends the header section.
                    self.cursor = m.html_tags().start_cursor();
                    self.state = State::Content;
                    Step::Consumed
                }
                _ => {
                    self.cursor = m.http_fields().line_cursor();
                    self.state = State::FieldName;
                    Step::Reconsume
                }
            },

            State::FieldColon => {
                if byte == b'\n' {
                    // Field with no value; nothing to emit.
                    self.state = State::FieldStart;
                    Step::Consumed
                } else if byte.is_ascii_whitespace() {
                    Step::Consumed
                } else {
                    let label = m.http_fields().label_for(self.field);
                    if !label.is_empty() {
                        emit_label(banner, label);
                        banner.append(b"\n");
                    }
                    self.state = State::FieldValue;
                    Step::Reconsume
                }
            }

            State::FieldValue => {
                match byte {
                    b'\r' => {}
                    b'\n' => self.state = State::FieldStart,
                    _ => match HttpField::from_id(self.field) {
                        HttpField::Server | HttpField::Location | HttpField::Via => {
                            banner.append(&[byte]);
                        }
                        HttpField::ContentLength => {
                            // The length value is discarded; body scanning is
                            // not framed by it. A non-digit ends the field.
                            if !byte.is_ascii_digit() {
                                self.field = HttpField::Incomplete as u8;
                            }
                        }
                        _ => {}
                    },
                }
                Step::Consumed
            }

            // Multi-byte and terminal states are dispatched in `advance`.
            State::FieldName
            | State::Content
            | State::ContentTag
            | State::ContentField
            | State::Done => unreachable!("handled by run or early-exit paths"),
        }
    }

    /// FIELD_NAME: delegate to the header-field matcher until a keyword
    /// boundary is recognized or the fragment runs out.
    fn scan_field_name(&mut self, m: &Matchers, data: &[u8], pos: &mut usize) {
        let fields = m.http_fields();
        let Some(id) = fields.search_next(&mut self.cursor, data, pos) else {
            return; // suspended mid-name; the cursor resumes next fragment
        };

        match HttpField::from_id(id) {
            HttpField::Newline => {
                // Header-less line; look for the next field.
                self.state = State::FieldStart;
            }
            HttpField::Unknown => {
                // The bare colon also terminates every named field, so check
                // whether a named keyword matched at this same position; the
                // named field wins over the generic colon.
                self.field = fields.peek_other_match(&self.cursor).unwrap_or(id);
                self.state = State::FieldColon;
            }
            _ => {
                self.field = id;
                self.state = State::FieldColon;
            }
        }
    }

    /// CONTENT: delegate to the HTML tag matcher; on a match emit the tag's
    /// label and move into the tag-skipping state.
    fn scan_content(
        &mut self,
        m: &Matchers,
        banner: &mut BannerBuffer,
        data: &[u8],
        pos: &mut usize,
    ) {
        let tags = m.html_tags();
        let Some(id) = tags.search_next(&mut self.cursor, data, pos) else {
            return;
        };

        let label = tags.label_for(id);
        if !label.is_empty() {
            emit_label(banner, label);
            banner.append(b":");
        }
        self.state = State::ContentTag;
    }
}

/// Append a field label, preceded by a newline separator when the banner
/// already holds earlier fields. No-op for empty labels (sentinel ids).
fn emit_label(banner: &mut BannerBuffer, label: &str) {
    if label.is_empty() {
        return;
    }
    if !banner.is_empty() {
        banner.append(b"\n");
    }
    banner.append(label.as_bytes());
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Advance the scan over one arriving fragment.
///
/// `ctx` is `0` for the first fragment of a response, or the value returned
/// by the previous call. Extracted bytes are appended to `banner`. The
/// returned context is [`DONE_CONTEXT`] once the scan has permanently
/// finished; feeding further fragments after that is a no-op.
///
/// The result is identical for any chunking of the same byte stream, so the
/// caller may deliver one byte or one megabyte per call.
pub fn scan_fragment(
    matchers: &Matchers,
    ctx: u32,
    data: &[u8],
    banner: &mut BannerBuffer,
) -> u32 {
    let mut resume = ResumeState::unpack(ctx);
    if resume.is_done() {
        return DONE_CONTEXT;
    }
    resume.advance(matchers, data, banner);
    resume.pack()
}

/// A small stateful wrapper owning the resume context for one connection.
///
/// # Usage
///
/// ```rust
/// use bannerscan::{BannerBuffer, BannerParser, Matchers};
///
/// let matchers = Matchers::compile().expect("pattern tables compile");
/// let mut banner = BannerBuffer::new(1024);
/// let mut parser = BannerParser::new(&matchers);
///
/// parser.feed(b"HTTP/1.1 200 OK\r\nSer", &mut banner);
/// parser.feed(b"ver: demo\r\n\r\n", &mut banner);
///
/// assert_eq!(banner.as_bytes(), b"Server\ndemo");
/// assert!(!parser.is_done());
/// ```
#[derive(Debug)]
pub struct BannerParser<'a> {
    matchers: &'a Matchers,
    ctx: u32,
}

impl<'a> BannerParser<'a> {
    /// Parser at the start of a fresh response.
    pub fn new(matchers: &'a Matchers) -> Self {
        BannerParser { matchers, ctx: 0 }
    }

    /// Rebuild a parser from a previously stored context value.
    pub fn resume(matchers: &'a Matchers, ctx: u32) -> Self {
        BannerParser { matchers, ctx }
    }

    /// Feed the next fragment of the response stream.
    pub fn feed(&mut self, data: &[u8], banner: &mut BannerBuffer) {
        self.ctx = scan_fragment(self.matchers, self.ctx, data, banner);
    }

    /// Whether the scan reached its terminal state; the context can be
    /// discarded and no further fragments need be delivered.
    pub fn is_done(&self) -> bool {
        self.ctx == DONE_CONTEXT
    }

    /// The packed context to persist between fragments.
    pub fn context(&self) -> u32 {
        self.ctx
    }

    /// Reset for a new response.
    pub fn reset(&mut self) {
        self.ctx = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_bytes_round_trip() {
        for byte in 0u8..=14 {
            assert_eq!(State::decode(byte).encode(), byte, "state byte {byte}");
        }
        assert_eq!(State::decode(DONE_STATE), State::Done);
    }

    #[test]
    fn unknown_state_byte_decodes_to_done() {
        assert_eq!(State::decode(15), State::Done);
        assert_eq!(State::decode(0xAB), State::Done);
    }

    #[test]
    fn context_zero_is_start() {
        assert_eq!(ResumeState::unpack(0), ResumeState::START);
        assert_eq!(ResumeState::START.pack(), 0);
    }

    #[test]
    fn context_round_trips_fields_and_cursor() {
        let rs = ResumeState {
            state: State::FieldValue,
            field: 5,
            cursor: Cursor::from_bits(0x1234),
        };
        let packed = rs.pack();
        assert_eq!(packed, 0x1234_05_0B);
        assert_eq!(ResumeState::unpack(packed), rs);
    }

    #[test]
    fn done_packs_to_raw_sentinel() {
        let rs = ResumeState {
            state: State::Done,
            field: 3,
            cursor: Cursor::from_bits(0xBEEF),
        };
        // Field and cursor bits are dropped so the sentinel tests equal.
        assert_eq!(rs.pack(), DONE_CONTEXT);
        assert!(ResumeState::unpack(DONE_CONTEXT).is_done());
    }

    #[test]
    fn done_context_is_stable_under_masking() {
        assert_eq!(DONE_CONTEXT & 0xFF, DONE_STATE as u32);
        assert_eq!(ResumeState::unpack(DONE_CONTEXT).pack(), DONE_CONTEXT);
    }
}
