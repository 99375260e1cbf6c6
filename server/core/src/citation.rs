//! Citation anchors: construction, canonical formatting and parsing.
//!
//! Canonical forms:
//!
//! | Anchor | String |
//! |---|---|
//! | page 12, lines 5-8 | `p. 12:5-8` |
//! | page 12, line 5 | `p. 12:5` |
//! | page 12, char offset 340 | `p. 12 @340` |
//! | page 12 only | `p. 12` |
//!
//! Parsing is lenient and also accepts `12:5-8`, `pg. 12:5` and
//! `Page 12, lines 5-8`. Page and line values always round-trip; the exact
//! byte form does not.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::CitationAnchor;

static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:page|pg|p)\.?\s*)?(\d+)\s*(?:(?::|,\s*lines?\s*|\s+lines?\s+)\s*(\d+)(?:\s*[-–]\s*(\d+))?|@\s*(\d+))?\s*$",
    )
    .expect("citation pattern is valid")
});

/// Error returned when a citation string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CitationParseError {
    #[error("unrecognized citation format: '{0}'")]
    Format(String),
    #[error("citation number out of range in '{0}'")]
    OutOfRange(String),
    #[error("page number must be >= 1 in '{0}'")]
    ZeroPage(String),
}

impl CitationAnchor {
    /// Anchor covering a line range. `line_end` is clamped to `>= line_start`.
    pub fn lines(page: u32, line_start: u32, line_end: u32) -> Self {
        Self {
            page,
            line_start: Some(line_start),
            line_end: Some(line_end.max(line_start)),
            char_start: None,
        }
    }

    /// Anchor on a single line.
    pub fn line(page: u32, line: u32) -> Self {
        Self::lines(page, line, line)
    }

    /// Fallback anchor for unnumbered text.
    pub fn offset(page: u32, char_start: usize) -> Self {
        Self {
            page,
            line_start: None,
            line_end: None,
            char_start: Some(char_start),
        }
    }

    /// Page-only anchor.
    pub fn page(page: u32) -> Self {
        Self {
            page,
            line_start: None,
            line_end: None,
            char_start: None,
        }
    }
}

impl fmt::Display for CitationAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line_start, self.line_end, self.char_start) {
            (Some(start), Some(end), _) if end > start => {
                write!(f, "p. {}:{}-{}", self.page, start, end)
            }
            (Some(start), _, _) => write!(f, "p. {}:{}", self.page, start),
            (None, _, Some(offset)) => write!(f, "p. {} @{}", self.page, offset),
            (None, _, None) => write!(f, "p. {}", self.page),
        }
    }
}

impl FromStr for CitationAnchor {
    type Err = CitationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CITATION_RE
            .captures(s)
            .ok_or_else(|| CitationParseError::Format(s.to_string()))?;

        let number = |idx: usize| -> Result<Option<u32>, CitationParseError> {
            caps.get(idx)
                .map(|m| {
                    m.as_str()
                        .parse::<u32>()
                        .map_err(|_| CitationParseError::OutOfRange(s.to_string()))
                })
                .transpose()
        };

        let page = number(1)?.ok_or_else(|| CitationParseError::Format(s.to_string()))?;
        if page == 0 {
            return Err(CitationParseError::ZeroPage(s.to_string()));
        }

        if let Some(start) = number(2)? {
            let end = number(3)?.unwrap_or(start);
            return Ok(CitationAnchor::lines(page, start, end));
        }

        if let Some(m) = caps.get(4) {
            let offset = m
                .as_str()
                .parse::<usize>()
                .map_err(|_| CitationParseError::OutOfRange(s.to_string()))?;
            return Ok(CitationAnchor::offset(page, offset));
        }

        Ok(CitationAnchor::page(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_range() {
        assert_eq!(CitationAnchor::lines(12, 5, 8).to_string(), "p. 12:5-8");
    }

    #[test]
    fn test_format_single_line_and_fallbacks() {
        assert_eq!(CitationAnchor::line(3, 7).to_string(), "p. 3:7");
        assert_eq!(CitationAnchor::offset(1, 340).to_string(), "p. 1 @340");
        assert_eq!(CitationAnchor::page(9).to_string(), "p. 9");
    }

    #[test]
    fn test_round_trip_preserves_page_and_lines() {
        let anchor = CitationAnchor::lines(12, 5, 8);
        let parsed: CitationAnchor = anchor.to_string().parse().unwrap();
        assert_eq!(parsed.page, 12);
        assert_eq!(parsed.line_start, Some(5));
        assert_eq!(parsed.line_end, Some(8));
    }

    #[test]
    fn test_round_trip_offset_anchor() {
        let anchor = CitationAnchor::offset(4, 1234);
        let parsed: CitationAnchor = anchor.to_string().parse().unwrap();
        assert_eq!(parsed, anchor);
    }

    #[test]
    fn test_parse_lenient_forms() {
        let a: CitationAnchor = "12:5-8".parse().unwrap();
        assert_eq!(a, CitationAnchor::lines(12, 5, 8));

        let b: CitationAnchor = "Page 12, lines 5-8".parse().unwrap();
        assert_eq!(b, CitationAnchor::lines(12, 5, 8));

        let c: CitationAnchor = "pg. 7:3".parse().unwrap();
        assert_eq!(c, CitationAnchor::line(7, 3));

        let d: CitationAnchor = "page 2".parse().unwrap();
        assert_eq!(d, CitationAnchor::page(2));
    }

    #[test]
    fn test_line_end_clamped_to_start() {
        let anchor = CitationAnchor::lines(2, 10, 4);
        assert_eq!(anchor.line_end, Some(10));
        let parsed: CitationAnchor = "p. 2:10-4".parse().unwrap();
        assert_eq!(parsed.line_end, Some(10));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "exhibit A".parse::<CitationAnchor>(),
            Err(CitationParseError::Format(_))
        ));
        assert!(matches!(
            "p. 0:3".parse::<CitationAnchor>(),
            Err(CitationParseError::ZeroPage(_))
        ));
        assert!(matches!(
            "p. 99999999999:1".parse::<CitationAnchor>(),
            Err(CitationParseError::OutOfRange(_))
        ));
    }
}
