//! Transcript segmentation: raw deposition text → question/answer utterances.
//!
//! Segmentation runs in two stages:
//!
//! 1. **Line tagging** ([`tag_lines`]): walks the raw text keeping a running
//!    page counter and character offset. Page markers (`Page 12`, `- Page 12 -`,
//!    `[Page 12]`) and form feeds move the page counter and are dropped. Lines
//!    that open with a numbered speaker marker (`5 Q.`, `6. A:`) get their line
//!    number split off. Numbered markers that a PDF extractor ran together on
//!    one physical line (`1 Q. Were you there? 2 A. Yes.`) are split first.
//! 2. **Utterance assembly** ([`TranscriptSegmenter::assemble`]): a single-pass
//!    state machine. Question/answer markers close the open turn and start a new
//!    one; headers, banners, stage directions and dividers are dropped; anything
//!    else is continuation text of the open turn.
//!
//! # Speaker headers
//!
//! Headers such as `MR. SMITH:` do not say whether the speaker is asking or
//! answering. The decision is delegated to a [`SpeakerRoleResolver`]. The
//! default [`AlternationResolver`] is a best-effort heuristic and the main
//! source of misclassified turns: `THE ...` headers and headers naming the
//! witness are answers, otherwise a header following a question is an answer
//! and anything else is a question.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalysisError, Result};
use crate::types::{CitationAnchor, Role, Utterance};

/// Default speaker name for question turns with no examiner banner.
pub const DEFAULT_EXAMINER: &str = "EXAMINER";
/// Default speaker name for answer turns when the deponent is unknown.
pub const DEFAULT_WITNESS: &str = "WITNESS";

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static PAGE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\[(\-–—=*\s]*page(?:\s+(\S+?))?(?:\s+of\s+\d+)?[\])\-–—=*\s]*$")
        .expect("page marker pattern is valid")
});

static INLINE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s(\d{1,3})\s+[QA]\s*[.:]").expect("inline marker pattern is valid")
});

static NUMBERED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{1,4})(?:\.\s*|\s+)((?:[QA]\s*[.:]|QUESTION\s*:|ANSWER\s*:|THE\s+[A-Z]+\s*:|(?:MR|MS|MRS|MISS|DR)\.?\s+[A-Z][A-Za-z'\-]+\s*:).*)$",
    )
    .expect("numbered marker pattern is valid")
});

static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Q\s*[.:]|QUESTION\s*:)\s*(.*)$").expect("question pattern is valid")
});

static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:A\s*[.:]|ANSWER\s*:|THE\s+WITNESS\s*:)\s*(.*)$")
        .expect("answer pattern is valid")
});

static SPEAKER_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((?:MR|MS|MRS|MISS|DR)\.?\s+[A-Z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+)*|THE\s+[A-Z]+(?:\s+[A-Z]+)*|[A-Z][A-Z'\-]+(?:\s+[A-Z][A-Z'\-]+){0,3})\s*:\s*(.*)$",
    )
    .expect("speaker header pattern is valid")
});

static EXAMINER_BANNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:DIRECT\s+|CROSS[\s\-]+|REDIRECT\s+|RECROSS\s+|FURTHER\s+)?EXAMINATION\s+)?BY\s+((?:MR|MS|MRS|MISS|DR)\.?\s+[A-Z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+)*)\s*:?\s*$",
    )
    .expect("examiner banner pattern is valid")
});

static EXAMINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:DIRECT|CROSS|REDIRECT|RECROSS|FURTHER)[\s\-]+)*EXAMINATION\b[^a-z]*$")
        .expect("examination pattern is valid")
});

static DIVIDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\-_=*~.]{3,}$").expect("divider pattern is valid"));

static BARE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,4}$").expect("bare number pattern is valid"));

static CASE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:case|cause|civil\s+action|index)\s+(?:no|number)\b")
        .expect("case number pattern is valid")
});

static DEPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z]+\s+)*DEPOSITION\s+OF\s+([A-Z][A-Z.'\- ]*[A-Z.])\s*(?:,.*)?$")
        .expect("deponent pattern is valid")
});

static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s+(?:v|vs|V|VS)\.?\s+(.+)$").expect("caption pattern is valid")
});

static CONTINUATION_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s+(\S.*)$").expect("continuation pattern is valid"));

static COURT_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^IN\s+THE\s+.*\bCOURT\b").expect("court header pattern is valid")
});

static SECTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:APPEARANCES|INDEX|EXHIBITS|CERTIFICATE(?:\s+OF\s+[A-Z ]+)?|STIPULATIONS?)\s*:?$",
    )
    .expect("section header pattern is valid")
});

// Parentheticals that may run over several lines before their `)`.
static STAGE_DIRECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[(\[]\s*(?:whereupon|discussion|recess|off\s+the\s+record|on\s+the\s+record|brief|short|lunch|pause|break|proceedings)\b",
    )
    .expect("stage direction pattern is valid")
});

// ---------------------------------------------------------------------------
// Stage 1: line tagging
// ---------------------------------------------------------------------------

/// A non-empty transcript line with its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedLine {
    /// Page the line appears on (1 when no marker has been seen).
    pub page: u32,
    /// Transcript line number, only when it preceded a speaker marker.
    pub line_number: Option<u32>,
    /// Line text with the line number removed.
    pub text: String,
    /// Character offset of the first non-blank character in the raw text.
    pub char_offset: usize,
}

/// Outcome of testing a line against the page-marker pattern.
enum PageMarker {
    Page(u32),
    Malformed,
}

fn page_marker(line: &str) -> Option<PageMarker> {
    let caps = PAGE_MARKER_RE.captures(line)?;
    match caps.get(1).map(|m| m.as_str().parse::<u32>()) {
        Some(Ok(page)) if page > 0 => Some(PageMarker::Page(page)),
        _ => Some(PageMarker::Malformed),
    }
}

/// Split a physical line in front of every numbered inline marker.
///
/// Returns `(char_index, fragment)` pairs; the first fragment starts at 0.
fn split_inline_markers(line: &str) -> Vec<(usize, &str)> {
    let mut cuts = vec![0usize];
    for caps in INLINE_MARKER_RE.captures_iter(line) {
        let (Some(whole), Some(num)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // The marker must stand alone; the next marker may need the whitespace.
        if line[whole.end()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
        {
            cuts.push(num.start());
        }
    }
    cuts.push(line.len());

    cuts.windows(2)
        .map(|w| (line[..w[0]].chars().count(), &line[w[0]..w[1]]))
        .collect()
}

/// Stage 1: tag every content line with page, optional line number and offset.
///
/// Never fails: missing page markers leave lines on page 1 and malformed
/// markers are dropped without moving the page counter.
pub fn tag_lines(raw: &str) -> Vec<TaggedLine> {
    let mut tagged = Vec::new();
    let mut page: u32 = 1;
    let mut offset = 0usize;

    for physical in raw.split_inclusive('\n') {
        let mut piece_offset = offset;
        for (i, piece) in physical.split('\x0c').enumerate() {
            if i > 0 {
                page = page.saturating_add(1);
                piece_offset += 1;
            }
            let content = piece.trim_end_matches(['\n', '\r']);

            for (frag_index, fragment) in split_inline_markers(content) {
                let trimmed = fragment.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let leading_ws = fragment.chars().take_while(|c| c.is_whitespace()).count();
                let char_offset = piece_offset + frag_index + leading_ws;

                match page_marker(trimmed) {
                    Some(PageMarker::Page(n)) => {
                        page = n;
                        continue;
                    }
                    Some(PageMarker::Malformed) => {
                        warn!(char_offset, line = trimmed, "Malformed page marker ignored");
                        continue;
                    }
                    None => {}
                }

                let (line_number, text) = match NUMBERED_MARKER_RE.captures(trimmed) {
                    Some(caps) => {
                        let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                        let rest = caps.get(2).map_or(trimmed, |m| m.as_str());
                        (number, rest.to_string())
                    }
                    None => (None, trimmed.to_string()),
                };

                tagged.push(TaggedLine {
                    page,
                    line_number,
                    text,
                    char_offset,
                });
            }
            piece_offset += piece.chars().count();
        }
        offset += physical.chars().count();
    }

    tagged
}

// ---------------------------------------------------------------------------
// Speaker role resolution
// ---------------------------------------------------------------------------

/// Decides whether a speaker-name header opens a question or an answer.
pub trait SpeakerRoleResolver: Send + Sync {
    /// `previous` is the role of the immediately preceding utterance, if any.
    fn resolve(&self, speaker: &str, previous: Option<Role>) -> Role;
}

/// Heuristic resolver that assumes questions and answers alternate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternationResolver;

impl SpeakerRoleResolver for AlternationResolver {
    fn resolve(&self, speaker: &str, previous: Option<Role>) -> Role {
        let upper = speaker.trim().to_ascii_uppercase();
        if upper.starts_with("THE ") || upper.contains("WITNESS") {
            return Role::Answer;
        }
        match previous {
            Some(Role::Question) => Role::Answer,
            _ => Role::Question,
        }
    }
}

/// Resolver backed by known witness and attorney names, falling back to
/// [`AlternationResolver`] for unknown speakers.
#[derive(Debug, Clone, Default)]
pub struct NameRegistryResolver {
    witnesses: HashSet<String>,
    attorneys: HashSet<String>,
}

impl NameRegistryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_witness(mut self, name: &str) -> Self {
        self.witnesses.insert(normalize_speaker(name));
        self
    }

    pub fn with_attorney(mut self, name: &str) -> Self {
        self.attorneys.insert(normalize_speaker(name));
        self
    }
}

impl SpeakerRoleResolver for NameRegistryResolver {
    fn resolve(&self, speaker: &str, previous: Option<Role>) -> Role {
        let key = normalize_speaker(speaker);
        if self.witnesses.contains(&key) {
            Role::Answer
        } else if self.attorneys.contains(&key) {
            Role::Question
        } else {
            AlternationResolver.resolve(speaker, previous)
        }
    }
}

fn normalize_speaker(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.trim_end_matches('.'))
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

// ---------------------------------------------------------------------------
// Stage 2: utterance assembly
// ---------------------------------------------------------------------------

/// Header information picked up from dropped lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMetadata {
    pub deponent: Option<String>,
    pub case_caption: Option<String>,
}

/// Result of segmenting one transcript.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub utterances: Vec<Utterance>,
    pub metadata: TranscriptMetadata,
    /// Non-content lines dropped during assembly (headers, banners, preamble).
    pub dropped_lines: usize,
}

impl Segmentation {
    pub fn answers(&self) -> impl Iterator<Item = &Utterance> {
        self.utterances.iter().filter(|u| u.is_answer())
    }

    pub fn answer_count(&self) -> usize {
        self.answers().count()
    }

    pub fn question_count(&self) -> usize {
        self.utterances.len() - self.answer_count()
    }
}

/// How a line was classified by the assembly state machine.
enum LineKind {
    Opens {
        role: Role,
        speaker: Option<String>,
        text: String,
    },
    Header,
    Continuation,
}

struct OpenTurn {
    role: Role,
    speaker: String,
    lines: Vec<TaggedLine>,
}

impl OpenTurn {
    fn last_line_number(&self) -> Option<(u32, u32)> {
        self.lines
            .iter()
            .rev()
            .find_map(|l| l.line_number.map(|n| (l.page, n)))
    }
}

/// Mutable state of one assembly pass.
struct Assembler<'a> {
    document_id: &'a str,
    resolver: &'a dyn SpeakerRoleResolver,
    open: Option<OpenTurn>,
    last_emitted: Option<Role>,
    in_parenthetical: bool,
    examiner: Option<String>,
    output: Segmentation,
}

impl<'a> Assembler<'a> {
    fn previous_role(&self) -> Option<Role> {
        self.open.as_ref().map(|t| t.role).or(self.last_emitted)
    }

    fn feed(&mut self, line: &TaggedLine) {
        let in_parenthetical = self.in_parenthetical;
        let kind = self.classify(&line.text);

        // A speaker marker always ends an unclosed stage direction.
        if in_parenthetical {
            if matches!(kind, LineKind::Opens { .. }) {
                debug!(text = %line.text, "Speaker marker inside unclosed parenthetical");
                self.in_parenthetical = false;
            } else {
                if line.text.contains(')') {
                    self.in_parenthetical = false;
                }
                self.output.dropped_lines += 1;
                return;
            }
        }

        match kind {
            LineKind::Opens {
                role,
                speaker,
                text,
            } => {
                self.close();
                let speaker = speaker.unwrap_or_else(|| self.default_speaker(role));
                self.open = Some(OpenTurn {
                    role,
                    speaker,
                    lines: vec![TaggedLine {
                        text,
                        ..line.clone()
                    }],
                });
            }
            LineKind::Header => {
                self.output.dropped_lines += 1;
            }
            LineKind::Continuation => match self.open.as_mut() {
                Some(turn) => {
                    let mut line = line.clone();
                    if line.line_number.is_none() {
                        number_continuation(turn, &mut line);
                    }
                    turn.lines.push(line);
                }
                None => {
                    debug!(text = %line.text, "Dropping line before first speaker marker");
                    self.output.dropped_lines += 1;
                }
            },
        }
    }

    fn classify(&mut self, text: &str) -> LineKind {
        if let Some(caps) = QUESTION_RE.captures(text) {
            return LineKind::Opens {
                role: Role::Question,
                speaker: None,
                text: capture_text(&caps, 1),
            };
        }
        if let Some(caps) = ANSWER_RE.captures(text) {
            let speaker = text
                .trim_start()
                .starts_with("THE")
                .then(|| "THE WITNESS".to_string());
            return LineKind::Opens {
                role: Role::Answer,
                speaker,
                text: capture_text(&caps, 1),
            };
        }
        if self.is_non_content(text) {
            return LineKind::Header;
        }
        if let Some(caps) = SPEAKER_HEADER_RE.captures(text) {
            let speaker = capture_text(&caps, 1);
            let role = self.resolver.resolve(&speaker, self.previous_role());
            return LineKind::Opens {
                role,
                speaker: Some(speaker),
                text: capture_text(&caps, 2),
            };
        }
        if BARE_NUMBER_RE.is_match(text) {
            return LineKind::Header;
        }
        LineKind::Continuation
    }

    /// Case headers, examination banners, stage directions and dividers.
    ///
    /// Court captions are only recognized before the first turn opens; once
    /// testimony starts, an all-caps line is more likely an answer than a
    /// repeated caption.
    fn is_non_content(&mut self, text: &str) -> bool {
        if DIVIDER_RE.is_match(text) {
            return true;
        }
        if let Some(closer) = bracket_closer(text) {
            let body = text.trim_end_matches(['.', ' ']);
            if body.ends_with(closer) {
                return true;
            }
            if text.contains(closer) {
                return false;
            }
            // An unclosed aside inside a turn is testimony, not a stage direction.
            if self.open.is_none() || STAGE_DIRECTION_RE.is_match(text) {
                self.in_parenthetical = closer == ')';
                return true;
            }
            return false;
        }
        if let Some(caps) = EXAMINER_BANNER_RE.captures(text) {
            self.examiner = Some(capture_text(&caps, 1));
            return true;
        }
        if EXAMINATION_RE.is_match(text)
            || CASE_NUMBER_RE.is_match(text)
            || SECTION_HEADER_RE.is_match(text)
        {
            return true;
        }
        if let Some(caps) = DEPONENT_RE.captures(text) {
            let name = capture_text(&caps, 1);
            self.output.metadata.deponent.get_or_insert(name);
            return true;
        }
        if self.open.is_none() {
            if let Some(caption) = caption(text) {
                self.output.metadata.case_caption.get_or_insert(caption);
                return true;
            }
            if COURT_HEADER_RE.is_match(text) {
                return true;
            }
        }
        false
    }

    fn default_speaker(&self, role: Role) -> String {
        match role {
            Role::Question => self
                .examiner
                .clone()
                .unwrap_or_else(|| DEFAULT_EXAMINER.to_string()),
            Role::Answer => self
                .output
                .metadata
                .deponent
                .clone()
                .unwrap_or_else(|| DEFAULT_WITNESS.to_string()),
        }
    }

    /// Emit the open turn if it has any text.
    fn close(&mut self) {
        let Some(turn) = self.open.take() else {
            return;
        };
        let text = turn
            .lines
            .iter()
            .map(|l| l.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            debug!(role = %turn.role, "Skipping empty turn");
            return;
        }

        let first = &turn.lines[0];
        let (line_start, line_end) = match first.line_number {
            Some(start) => {
                let end = turn
                    .last_line_number()
                    .map_or(start, |(_, n)| n)
                    .max(start);
                (Some(start), Some(end))
            }
            None => (None, None),
        };
        let citation = match line_start {
            Some(start) => CitationAnchor::lines(first.page, start, line_end.unwrap_or(start)),
            None => CitationAnchor::offset(first.page, first.char_offset),
        };

        let index = self.output.utterances.len() + 1;
        self.output.utterances.push(Utterance {
            id: format!("{}-u{:04}", self.document_id, index),
            document_id: self.document_id.to_string(),
            page_number: first.page,
            line_start,
            line_end,
            role: turn.role,
            speaker: turn.speaker,
            text,
            citation,
        });
        self.last_emitted = Some(turn.role);
    }
}

/// Strip a sequential line number from a continuation line.
///
/// Fully numbered transcripts carry a number on every line. A continuation
/// line is numbered only when its leading integer is the next line on the
/// same page, or line 1 after a page break.
fn number_continuation(turn: &OpenTurn, line: &mut TaggedLine) {
    let Some((last_page, last_number)) = turn.last_line_number() else {
        return;
    };
    let Some(caps) = CONTINUATION_NUMBER_RE.captures(&line.text) else {
        return;
    };
    let Some(number) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
        return;
    };
    let sequential = (line.page == last_page && number == last_number + 1)
        || (line.page > last_page && number == 1);
    if sequential {
        line.line_number = Some(number);
        line.text = capture_text(&caps, 2);
    }
}

fn capture_text(caps: &regex::Captures<'_>, idx: usize) -> String {
    caps.get(idx)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn bracket_closer(text: &str) -> Option<char> {
    match text.chars().next() {
        Some('(') => Some(')'),
        Some('[') => Some(']'),
        _ => None,
    }
}

/// Whether a line has letters and none of them are lowercase.
fn is_shouted(text: &str) -> bool {
    text.chars().any(|c| c.is_alphabetic()) && !text.chars().any(|c| c.is_lowercase())
}

/// Recognize an all-caps case caption such as `JOHN DOE v. ACME CORP.`.
fn caption(text: &str) -> Option<String> {
    let caps = CAPTION_RE.captures(text)?;
    let left = caps.get(1)?.as_str().trim().trim_end_matches(',');
    let right = caps.get(2)?.as_str().trim();
    if is_shouted(left) && is_shouted(right) {
        Some(format!("{left} v. {right}"))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Turns raw transcript text into utterances. Deterministic for a given input.
pub struct TranscriptSegmenter {
    resolver: Box<dyn SpeakerRoleResolver>,
}

impl Default for TranscriptSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSegmenter {
    /// Segmenter using the [`AlternationResolver`] heuristic.
    pub fn new() -> Self {
        Self {
            resolver: Box::new(AlternationResolver),
        }
    }

    /// Segmenter with a custom speaker-header resolver.
    pub fn with_resolver(resolver: impl SpeakerRoleResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
        }
    }

    /// Segment `raw` into utterances owned by `document_id`.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::EmptyTranscript`] if `raw` has no text.
    /// - [`AnalysisError::NoAnswers`] if no answer turns were found.
    pub fn segment(&self, document_id: &str, raw: &str) -> Result<Segmentation> {
        if raw.trim().is_empty() {
            return Err(AnalysisError::EmptyTranscript);
        }

        let lines = tag_lines(raw);
        let segmentation = self.assemble(document_id, &lines);

        let answers = segmentation.answer_count();
        debug!(
            document_id,
            lines = lines.len(),
            utterances = segmentation.utterances.len(),
            answers,
            dropped = segmentation.dropped_lines,
            "Segmented transcript"
        );

        if answers == 0 {
            return Err(AnalysisError::NoAnswers {
                questions: segmentation.question_count(),
            });
        }
        Ok(segmentation)
    }

    /// Stage 2: assemble tagged lines into utterances without validation.
    pub fn assemble(&self, document_id: &str, lines: &[TaggedLine]) -> Segmentation {
        let mut assembler = Assembler {
            document_id,
            resolver: self.resolver.as_ref(),
            open: None,
            last_emitted: None,
            in_parenthetical: false,
            examiner: None,
            output: Segmentation::default(),
        };
        for line in lines {
            assembler.feed(line);
        }
        assembler.close();
        assembler.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(raw: &str) -> Segmentation {
        TranscriptSegmenter::new().segment("doc", raw).unwrap()
    }

    #[test]
    fn test_tag_lines_tracks_pages_and_numbers() {
        let raw = "Page 3\n5 Q. Where were you?\n6 A. At home.\n- Page 4 -\n1 Q. Alone?";
        let lines = tag_lines(raw);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].page, 3);
        assert_eq!(lines[0].line_number, Some(5));
        assert_eq!(lines[0].text, "Q. Where were you?");
        assert_eq!(lines[1].line_number, Some(6));
        assert_eq!(lines[2].page, 4);
        assert_eq!(lines[2].line_number, Some(1));
    }

    #[test]
    fn test_tag_lines_char_offsets() {
        let raw = "Q. One?\n  A. Two.";
        let lines = tag_lines(raw);
        assert_eq!(lines[0].char_offset, 0);
        assert_eq!(lines[1].char_offset, 10);
    }

    #[test]
    fn test_line_number_requires_marker() {
        let lines = tag_lines("12 the car was red");
        assert_eq!(lines[0].line_number, None);
        assert_eq!(lines[0].text, "12 the car was red");
    }

    #[test]
    fn test_digit_period_variant() {
        let lines = tag_lines("7. Q: Did you sign it?");
        assert_eq!(lines[0].line_number, Some(7));
        assert_eq!(lines[0].text, "Q: Did you sign it?");
    }

    #[test]
    fn test_inline_markers_split() {
        let lines = tag_lines("1 Q. Were you present? 2 A. Yes.");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Q. Were you present?");
        assert_eq!(lines[1].text, "A. Yes.");
        assert_eq!(lines[1].line_number, Some(2));
        assert_eq!(lines[1].char_offset, 23);
    }

    #[test]
    fn test_inline_marker_with_empty_text_still_splits() {
        let lines = tag_lines("1 Q. Were you there? 2 A. 3 Q. Next?");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text, "A.");
        assert_eq!(lines[2].text, "Q. Next?");
        assert_eq!(lines[2].line_number, Some(3));
    }

    #[test]
    fn test_inline_marker_needs_trailing_space() {
        let lines = tag_lines("Ask about exhibit 12 A.B. Smith signed");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_missing_page_marker_defaults_to_page_one() {
        let lines = tag_lines("Q. Hello?\nA. Hi.");
        assert!(lines.iter().all(|l| l.page == 1));
    }

    #[test]
    fn test_malformed_page_marker_keeps_page() {
        let lines = tag_lines("Page 2\nQ. First?\nPage ??\nA. Second.");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].page, 2);
    }

    #[test]
    fn test_form_feed_advances_page() {
        let lines = tag_lines("Q. First?\x0cA. Second.");
        assert_eq!(lines[0].page, 1);
        assert_eq!(lines[1].page, 2);
    }

    #[test]
    fn test_basic_alternation() {
        let seg = segment("Q. Did you see the car?\nA. Yes.\nQ. What color?\nA. Red.");
        let roles: Vec<Role> = seg.utterances.iter().map(|u| u.role).collect();
        assert_eq!(
            roles,
            vec![Role::Question, Role::Answer, Role::Question, Role::Answer]
        );
        assert_eq!(seg.utterances[3].text, "Red.");
        assert_eq!(seg.utterances[1].id, "doc-u0002");
    }

    #[test]
    fn test_continuation_lines_join() {
        let seg = segment("Q. Tell me what happened.\nA. I drove to\nthe office and\nparked.");
        assert_eq!(seg.utterances.len(), 2);
        assert_eq!(seg.utterances[1].text, "I drove to the office and parked.");
    }

    #[test]
    fn test_citation_uses_line_numbers() {
        let seg = segment("Page 12\n5 Q. Where?\n6 A. There.");
        let answer = &seg.utterances[1];
        assert_eq!(answer.page_number, 12);
        assert_eq!(answer.citation, CitationAnchor::line(12, 6));
    }

    #[test]
    fn test_sequential_continuation_numbers_extend_range() {
        let seg = segment("Page 12\n4 Q. Where?\n5 A. I went to\n6 the bank and\n7 then home.");
        let answer = &seg.utterances[1];
        assert_eq!(answer.text, "I went to the bank and then home.");
        assert_eq!(answer.citation, CitationAnchor::lines(12, 5, 7));
    }

    #[test]
    fn test_leading_number_matching_next_line_is_stripped() {
        // Indistinguishable from a numbered transcript line, so it is taken as one.
        let seg = segment("5 A. I lived at\n6 Main Street for years.");
        let answer = &seg.utterances[0];
        assert_eq!(answer.text, "I lived at Main Street for years.");
        assert_eq!(answer.citation, CitationAnchor::lines(1, 5, 6));
    }

    #[test]
    fn test_non_sequential_leading_number_is_text() {
        let seg = segment("5 A. I lived at\n42 Main Street for years.");
        assert_eq!(seg.utterances[0].text, "I lived at 42 Main Street for years.");
        assert_eq!(seg.utterances[0].citation, CitationAnchor::line(1, 5));
    }

    #[test]
    fn test_citation_falls_back_to_offset() {
        let seg = segment("Q. Where?\nA. There.");
        let answer = &seg.utterances[1];
        assert_eq!(answer.line_start, None);
        assert_eq!(answer.citation, CitationAnchor::offset(1, 10));
    }

    #[test]
    fn test_headers_are_dropped() {
        let raw = "\
IN THE SUPERIOR COURT OF THE STATE
JOHN DOE v. ACME CORPORATION
Case No. 2021-CV-0042
DEPOSITION OF JANE ROE
DIRECT EXAMINATION
BY MR. SMITH:
Q. State your name.
(Whereupon, Exhibit 4 was marked.)
A. Jane Roe.
-----------
Q. Where do you work?
A. Acme.";
        let seg = segment(raw);
        assert_eq!(seg.utterances.len(), 4);
        assert_eq!(seg.utterances[1].text, "Jane Roe.");
        assert_eq!(seg.utterances[0].speaker, "MR. SMITH");
        assert_eq!(seg.utterances[1].speaker, "JANE ROE");
        assert_eq!(seg.metadata.deponent.as_deref(), Some("JANE ROE"));
        assert_eq!(
            seg.metadata.case_caption.as_deref(),
            Some("JOHN DOE v. ACME CORPORATION")
        );
    }

    #[test]
    fn test_multiline_stage_direction_dropped() {
        let seg = segment("Q. Ready?\n(Whereupon, a short recess\nwas taken.)\nA. Yes.");
        assert_eq!(seg.utterances.len(), 2);
        assert_eq!(seg.utterances[0].text, "Ready?");
        assert_eq!(seg.utterances[1].text, "Yes.");
    }

    #[test]
    fn test_speaker_marker_ends_unclosed_stage_direction() {
        let seg = segment("Q. One?\nA. Yes.\n(Recess taken.\nQ. Two?\nA. No.\nQ. Three?\nA. Maybe.");
        assert_eq!(seg.utterances.len(), 6);
        assert_eq!(seg.utterances[1].text, "Yes.");
        assert_eq!(seg.utterances[2].text, "Two?");
        assert_eq!(seg.utterances[5].text, "Maybe.");
    }

    #[test]
    fn test_unclosed_aside_in_answer_is_continuation() {
        let seg = segment(
            "Q. When?\nA. I went there\n(I think it was Monday\nQ. Who drove?\nA. My brother drove.",
        );
        assert_eq!(seg.utterances.len(), 4);
        assert_eq!(seg.utterances[1].text, "I went there (I think it was Monday");
        assert_eq!(seg.utterances[2].text, "Who drove?");
        assert_eq!(seg.utterances[3].text, "My brother drove.");
    }

    #[test]
    fn test_all_caps_testimony_is_not_a_header() {
        let seg = segment(
            "A. I WENT TO THE\nCOURTHOUSE ON MAIN STREET\nAND THEN TO SECTION V OF THE BUILDING.",
        );
        assert_eq!(seg.utterances.len(), 1);
        assert_eq!(
            seg.utterances[0].text,
            "I WENT TO THE COURTHOUSE ON MAIN STREET AND THEN TO SECTION V OF THE BUILDING."
        );
        assert_eq!(seg.metadata.case_caption, None);
        assert_eq!(seg.dropped_lines, 0);
    }

    #[test]
    fn test_court_header_opens_its_own_turn() {
        let seg = segment("A. Yes.\nTHE COURT:\nStrike that answer from the record.");
        assert_eq!(seg.utterances.len(), 2);
        assert_eq!(seg.utterances[0].text, "Yes.");
        assert_eq!(seg.utterances[1].speaker, "THE COURT");
        assert_eq!(seg.utterances[1].text, "Strike that answer from the record.");
    }

    #[test]
    fn test_section_headers_dropped_mid_transcript() {
        let seg = segment("Q. Done?\nA. Yes.\nCERTIFICATE OF REPORTER\nSTIPULATIONS");
        assert_eq!(seg.utterances[1].text, "Yes.");
        assert_eq!(seg.dropped_lines, 2);
    }

    #[test]
    fn test_the_witness_header_is_answer() {
        let seg = segment("MR. SMITH: Were you there?\nTHE WITNESS: I was.");
        assert_eq!(seg.utterances[1].role, Role::Answer);
        assert_eq!(seg.utterances[1].speaker, "THE WITNESS");
    }

    #[test]
    fn test_speaker_header_alternation() {
        let seg = segment("MR. SMITH: Were you there?\nMS. ROE: Yes, I was.\nMR. SMITH: Thank you.");
        let roles: Vec<Role> = seg.utterances.iter().map(|u| u.role).collect();
        assert_eq!(roles, vec![Role::Question, Role::Answer, Role::Question]);
        assert_eq!(seg.utterances[1].speaker, "MS. ROE");
    }

    #[test]
    fn test_name_registry_resolver_overrides_alternation() {
        let segmenter = TranscriptSegmenter::with_resolver(
            NameRegistryResolver::new()
                .with_witness("Ms. Roe")
                .with_attorney("MR. SMITH"),
        );
        let raw = "A. Preliminary answer.\nMS. ROE: Still answering.\nMR. SMITH: Next question?";
        let seg = segmenter.segment("doc", raw).unwrap();
        let roles: Vec<Role> = seg.utterances.iter().map(|u| u.role).collect();
        assert_eq!(roles, vec![Role::Answer, Role::Answer, Role::Question]);
    }

    #[test]
    fn test_preamble_before_first_marker_dropped() {
        let seg = segment("Reported by Jane Court Reporter\nQ. Hi?\nA. Hello.");
        assert_eq!(seg.utterances.len(), 2);
        assert_eq!(seg.dropped_lines, 1);
    }

    #[test]
    fn test_empty_marker_turn_not_emitted() {
        let seg = segment("Q.\nQ. Real question?\nA. Real answer.");
        assert_eq!(seg.utterances.len(), 2);
        assert_eq!(seg.utterances[0].text, "Real question?");
    }

    #[test]
    fn test_questions_only_is_fatal() {
        let err = TranscriptSegmenter::new()
            .segment("doc", "Q. One?\nQ. Two?")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoAnswers { questions: 2 }));
    }

    #[test]
    fn test_empty_transcript_is_fatal() {
        let err = TranscriptSegmenter::new().segment("doc", "  \n ").unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyTranscript));
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let raw = "Page 1\n1 Q. A? 2 A. B.\n3 Q. C?\n4 A. D.";
        let a = segment(raw);
        let b = segment(raw);
        assert_eq!(a.utterances, b.utterances);
    }
}
