use aho_corasick::automaton::{Automaton, StateID};
use aho_corasick::nfa::noncontiguous;
use aho_corasick::{Anchored, MatchKind};

use crate::error::PatternError;

// ---------------------------------------------------------------------------
// Symbolic ids
// ---------------------------------------------------------------------------

/// Symbolic ids for the HTTP header-field vocabulary.
///
/// `Incomplete` doubles as the "no active field" value stored in a resume
/// context. `Unknown` is the bare-colon match (an uninteresting header);
/// `Newline` is the bare line-feed match (a header-less line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HttpField {
    Incomplete = 0,
    Server = 1,
    ContentLength = 2,
    ContentType = 3,
    Via = 4,
    Location = 5,
    Unknown = 6,
    Newline = 7,
}

impl HttpField {
    /// Map a raw id byte (as stored in a resume context) back to a field.
    /// Unrecognized values collapse to `Incomplete`.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Server,
            2 => Self::ContentLength,
            3 => Self::ContentType,
            4 => Self::Via,
            5 => Self::Location,
            6 => Self::Unknown,
            7 => Self::Newline,
            _ => Self::Incomplete,
        }
    }
}

/// Symbolic ids for the HTML tag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HtmlTag {
    Incomplete = 0,
    Title = 1,
    Unknown = 2,
}

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// One recognizable keyword: the matchable text, the label emitted into the
/// banner when its field is extracted (empty for sentinel entries), the
/// symbolic id, and whether the keyword may only match at the start of the
/// current scan window (a header name must begin a line; the bare colon and
/// newline match anywhere).
#[derive(Debug, Clone, Copy)]
pub struct PatternEntry {
    pub keyword: &'static str,
    pub label: &'static str,
    pub id: u8,
    pub anchored: bool,
}

/// Header-field names of interest.
///
/// `Content-Length:` and `Content-Type:` have reserved ids and value-state
/// handling but are not registered here: enabling them would emit their
/// labels with no value into every banner, and length-framed body scanning
/// is not implemented.
pub const HTTP_FIELD_PATTERNS: &[PatternEntry] = &[
    PatternEntry {
        keyword: "Server:",
        label: "Server",
        id: HttpField::Server as u8,
        anchored: true,
    },
    PatternEntry {
        keyword: "Via:",
        label: "Via",
        id: HttpField::Via as u8,
        anchored: true,
    },
    PatternEntry {
        keyword: "Location:",
        label: "Location",
        id: HttpField::Location as u8,
        anchored: true,
    },
    PatternEntry {
        keyword: ":",
        label: "",
        id: HttpField::Unknown as u8,
        anchored: false,
    },
    PatternEntry {
        keyword: "\n",
        label: "",
        id: HttpField::Newline as u8,
        anchored: false,
    },
];

/// HTML tags of interest in the response body.
pub const HTML_TAG_PATTERNS: &[PatternEntry] = &[PatternEntry {
    keyword: "<title",
    label: "Title",
    id: HtmlTag::Title as u8,
    anchored: false,
}];

// ---------------------------------------------------------------------------
// Resumable multi-keyword matcher
// ---------------------------------------------------------------------------

/// Byte prepended to anchored keywords at compile time and injected at the
/// start of each scan window; it stands in for "beginning of line" inside the
/// automaton's alphabet.
const ANCHOR_BYTE: u8 = 0x01;

/// Anchored keywords can fit a 16-bit cursor only while the automaton stays
/// small; state ids of the noncontiguous NFA are dense indices bounded by the
/// total keyword bytes, so cap the table well below the cursor range.
const MAX_TABLE_BYTES: usize = (u16::MAX as usize) - 64;

/// Stream bytes equal to the anchor sentinel are remapped so input data can
/// never arm an anchored keyword mid-window. 0x02 appears in no keyword, so
/// it behaves like any other uninteresting byte.
#[inline]
fn sanitize(byte: u8) -> u8 {
    if byte == ANCHOR_BYTE { 0x02 } else { byte }
}

/// Suspended position of an in-progress keyword scan, packable into the
/// 16-bit slot of a resume context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(pub(crate) u16);

impl Cursor {
    /// Raw bits for context packing.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Rebuild a cursor from context bits.
    pub fn from_bits(bits: u16) -> Self {
        Cursor(bits)
    }
}

/// A compiled vocabulary: case-insensitive multi-keyword automaton plus the
/// entry table it was built from. Immutable after compilation and shared
/// read-only across all concurrent scans.
#[derive(Debug)]
pub struct PatternSet {
    automaton: noncontiguous::NFA,
    entries: &'static [PatternEntry],
    start: StateID,
}

impl PatternSet {
    /// Compile a vocabulary into a resumable matcher.
    ///
    /// # Errors
    ///
    /// Fails if the automaton cannot be built or the table is too large for
    /// its state ids to fit the 16-bit cursor slot. Callers treat failure as
    /// fatal; there is no recovery without valid pattern tables.
    pub fn compile(
        vocab: &'static str,
        entries: &'static [PatternEntry],
    ) -> Result<Self, PatternError> {
        let total: usize = entries.iter().map(|e| e.keyword.len() + 1).sum();
        if total > MAX_TABLE_BYTES {
            return Err(PatternError::TableTooLarge { vocab });
        }

        let keywords: Vec<Vec<u8>> = entries
            .iter()
            .map(|e| {
                let mut k = Vec::with_capacity(e.keyword.len() + 1);
                if e.anchored {
                    k.push(ANCHOR_BYTE);
                }
                k.extend_from_slice(e.keyword.as_bytes());
                k
            })
            .collect();

        let automaton = noncontiguous::Builder::new()
            .match_kind(MatchKind::Standard)
            .ascii_case_insensitive(true)
            .build(&keywords)
            .map_err(|e| PatternError::Compile {
                vocab,
                reason: e.to_string(),
            })?;

        let start = automaton
            .start_state(Anchored::No)
            .map_err(|e| PatternError::Compile {
                vocab,
                reason: e.to_string(),
            })?;

        Ok(PatternSet {
            automaton,
            entries,
            start,
        })
    }

    /// Cursor positioned at the automaton root (for unanchored windows).
    pub fn start_cursor(&self) -> Cursor {
        self.cursor_of(self.start)
    }

    /// Cursor for the start of a line: the root advanced over the anchor
    /// sentinel, so anchored keywords are matchable from here.
    pub fn line_cursor(&self) -> Cursor {
        let sid = self
            .automaton
            .next_state(Anchored::No, self.start, ANCHOR_BYTE);
        self.cursor_of(sid)
    }

    /// Consume bytes from `data[*pos..]`, advancing `*pos` and `cursor`,
    /// until some keyword's last byte is reached. Returns that keyword's id
    /// (the shortest keyword ending at the position — named fields that also
    /// end in a colon are retrievable via [`peek_other_match`]), or `None`
    /// when the slice is exhausted with no keyword completed; the cursor then
    /// carries the partial scan into the next fragment.
    ///
    /// [`peek_other_match`]: Self::peek_other_match
    pub fn search_next(&self, cursor: &mut Cursor, data: &[u8], pos: &mut usize) -> Option<u8> {
        let mut sid = self.sid_of(*cursor);
        while *pos < data.len() {
            let byte = sanitize(data[*pos]);
            *pos += 1;
            sid = self.automaton.next_state(Anchored::No, sid, byte);
            if self.automaton.is_match(sid) {
                *cursor = self.cursor_of(sid);
                return Some(self.primary_match(sid));
            }
        }
        *cursor = self.cursor_of(sid);
        None
    }

    /// After a successful [`search_next`], report the longest *other* keyword
    /// that also ends at the current position, if any. This is the
    /// disambiguation query: at the colon of `Server:` both the bare `:` and
    /// the named field match, and the named field must win.
    ///
    /// [`search_next`]: Self::search_next
    pub fn peek_other_match(&self, cursor: &Cursor) -> Option<u8> {
        let sid = self.sid_of(*cursor);
        if !self.automaton.is_match(sid) {
            return None;
        }
        let n = self.automaton.match_len(sid);
        if n < 2 {
            return None;
        }
        (0..n)
            .map(|i| self.entry_of(self.automaton.match_pattern(sid, i)))
            .max_by_key(|e| e.keyword.len())
            .map(|e| e.id)
    }

    /// Look up the table entry for a symbolic id.
    pub fn entry(&self, id: u8) -> Option<&PatternEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Label text for a symbolic id; empty for sentinel and unknown ids.
    pub fn label_for(&self, id: u8) -> &'static str {
        self.entry(id).map_or("", |e| e.label)
    }

    // ----- internal -------------------------------------------------------

    /// Of all keywords ending at this state, the shortest one's id.
    fn primary_match(&self, sid: StateID) -> u8 {
        let n = self.automaton.match_len(sid);
        (0..n)
            .map(|i| self.entry_of(self.automaton.match_pattern(sid, i)))
            .min_by_key(|e| e.keyword.len())
            .map(|e| e.id)
            .unwrap_or(0)
    }

    fn entry_of(&self, pid: aho_corasick::PatternID) -> &PatternEntry {
        &self.entries[pid.as_usize()]
    }

    fn cursor_of(&self, sid: StateID) -> Cursor {
        debug_assert!(sid.as_usize() <= u16::MAX as usize);
        Cursor(sid.as_usize() as u16)
    }

    fn sid_of(&self, cursor: Cursor) -> StateID {
        StateID::new(cursor.0 as usize).unwrap_or(self.start)
    }
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

/// Both compiled vocabularies. Built once at process start and shared by
/// reference with every scan; the value is immutable and `Send + Sync`, so no
/// per-connection copy or locking is needed.
#[derive(Debug)]
pub struct Matchers {
    http_fields: PatternSet,
    html_tags: PatternSet,
}

impl Matchers {
    /// Compile the built-in pattern tables.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if either table fails to compile. The scanner
    /// cannot operate without its tables, so callers should treat this as
    /// fatal at startup.
    pub fn compile() -> Result<Self, PatternError> {
        Ok(Matchers {
            http_fields: PatternSet::compile("http-fields", HTTP_FIELD_PATTERNS)?,
            html_tags: PatternSet::compile("html-tags", HTML_TAG_PATTERNS)?,
        })
    }

    /// The HTTP header-field vocabulary.
    pub fn http_fields(&self) -> &PatternSet {
        &self.http_fields
    }

    /// The HTML tag vocabulary.
    pub fn html_tags(&self) -> &PatternSet {
        &self.html_tags
    }
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn http_set() -> PatternSet {
        PatternSet::compile("http-fields", HTTP_FIELD_PATTERNS).expect("table compiles")
    }

    #[test]
    fn named_field_found_via_peek_at_colon() {
        let set = http_set();
        let mut cursor = set.line_cursor();
        let mut pos = 0;
        let id = set.search_next(&mut cursor, b"Server: nginx", &mut pos);
        assert_eq!(id, Some(HttpField::Unknown as u8));
        assert_eq!(pos, 7); // consumed through the colon
        assert_eq!(
            set.peek_other_match(&cursor),
            Some(HttpField::Server as u8)
        );
    }

    #[test]
    fn unknown_header_has_no_other_match() {
        let set = http_set();
        let mut cursor = set.line_cursor();
        let mut pos = 0;
        let id = set.search_next(&mut cursor, b"X-Custom: v", &mut pos);
        assert_eq!(id, Some(HttpField::Unknown as u8));
        assert_eq!(set.peek_other_match(&cursor), None);
    }

    #[test]
    fn anchored_keyword_needs_window_start() {
        let set = http_set();
        let mut cursor = set.line_cursor();
        let mut pos = 0;
        let id = set.search_next(&mut cursor, b"X-Server: v", &mut pos);
        assert_eq!(id, Some(HttpField::Unknown as u8));
        // "Server:" is mid-window here, so only the bare colon matched.
        assert_eq!(set.peek_other_match(&cursor), None);
    }

    #[test]
    fn scan_resumes_across_fragments() {
        let set = http_set();
        let mut cursor = set.line_cursor();

        let mut pos = 0;
        assert_eq!(set.search_next(&mut cursor, b"Serv", &mut pos), None);
        assert_eq!(pos, 4);

        let mut pos = 0;
        let id = set.search_next(&mut cursor, b"er: x", &mut pos);
        assert_eq!(id, Some(HttpField::Unknown as u8));
        assert_eq!(
            set.peek_other_match(&cursor),
            Some(HttpField::Server as u8)
        );
    }

    #[test]
    fn bare_newline_matches_anywhere() {
        let set = http_set();
        let mut cursor = set.line_cursor();
        let mut pos = 0;
        let id = set.search_next(&mut cursor, b"junk\n", &mut pos);
        assert_eq!(id, Some(HttpField::Newline as u8));
        assert_eq!(pos, 5);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let set = http_set();
        let mut cursor = set.line_cursor();
        let mut pos = 0;
        set.search_next(&mut cursor, b"sErVeR:", &mut pos);
        assert_eq!(
            set.peek_other_match(&cursor),
            Some(HttpField::Server as u8)
        );
    }

    #[test]
    fn anchor_sentinel_in_input_is_neutralized() {
        let set = http_set();
        let mut cursor = set.line_cursor();
        let mut pos = 0;
        // A raw 0x01 in the stream must not re-arm the anchor.
        let id = set.search_next(&mut cursor, b"X\x01Server: v", &mut pos);
        assert_eq!(id, Some(HttpField::Unknown as u8));
        assert_eq!(set.peek_other_match(&cursor), None);
    }

    #[test]
    fn html_title_matches_unanchored() {
        let set = PatternSet::compile("html-tags", HTML_TAG_PATTERNS).expect("table compiles");
        let mut cursor = set.start_cursor();
        let mut pos = 0;
        let id = set.search_next(&mut cursor, b"<html><head><title>", &mut pos);
        assert_eq!(id, Some(HtmlTag::Title as u8));
        assert_eq!(&b"<html><head><title>"[pos..], b">");
    }

    #[test]
    fn cursor_bits_round_trip() {
        let set = http_set();
        let cursor = set.line_cursor();
        assert_eq!(Cursor::from_bits(cursor.bits()), cursor);
    }

    #[test]
    fn labels_resolve_by_id() {
        let set = http_set();
        assert_eq!(set.label_for(HttpField::Server as u8), "Server");
        assert_eq!(set.label_for(HttpField::Unknown as u8), "");
        assert_eq!(set.label_for(HttpField::Newline as u8), "");
        assert_eq!(set.label_for(0xEE), "");
    }
}
