//! Version parsing, total ordering and version selectors.
//!
//! Ordering rules:
//! - Versions are split into parts on `.`, `-`, `_`, `+` and wherever digits
//!   and letters meet (`1.0rc1` is `1`, `0`, `rc`, `1`)
//! - Numeric parts compare as numbers and sort above any text part
//! - Text parts rank `dev` < other text (case-insensitive) < `rc` <
//!   `snapshot` < `final` < `ga` < `release` < `sp`
//! - When one version runs out of parts, an extra numeric part makes the
//!   longer version higher, `final`/`ga`/`release` count as absent, `sp`
//!   counts as higher and anything else as lower
//! - Versions still equal after that are ordered by their raw string

use std::cmp::Ordering;
use std::fmt;

/// A parsed version with a total order.
#[derive(Debug, Clone)]
pub struct Version {
    pub original: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Part {
    /// Digits without leading zeros, so runs of any length compare exactly.
    Numeric(String),
    Text(TextRank),
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
enum TextRank {
    Dev,
    Other(String),
    Rc,
    Snapshot,
    Final,
    Ga,
    Release,
    Sp,
}

impl Version {
    pub fn parse(version: &str) -> Self {
        Self {
            original: version.to_string(),
            parts: parse_parts(version),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    fn cmp_parts(&self, other: &Self) -> Ordering {
        let max_len = self.parts.len().max(other.parts.len());
        for i in 0..max_len {
            let ord = match (self.parts.get(i), other.parts.get(i)) {
                (None, None) => Ordering::Equal,
                (Some(p), None) => compare_to_absent(p),
                (None, Some(p)) => compare_to_absent(p).reverse(),
                (Some(a), Some(b)) => compare_parts(a, b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_parts(other)
            .then_with(|| self.original.cmp(&other.original))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Compare two raw version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

fn compare_to_absent(part: &Part) -> Ordering {
    match part {
        Part::Numeric(_) => Ordering::Greater,
        Part::Text(TextRank::Final | TextRank::Ga | TextRank::Release) => Ordering::Equal,
        Part::Text(TextRank::Sp) => Ordering::Greater,
        Part::Text(_) => Ordering::Less,
    }
}

fn compare_parts(a: &Part, b: &Part) -> Ordering {
    match (a, b) {
        (Part::Numeric(a), Part::Numeric(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
        (Part::Numeric(_), Part::Text(_)) => Ordering::Greater,
        (Part::Text(_), Part::Numeric(_)) => Ordering::Less,
        (Part::Text(a), Part::Text(b)) => a.cmp(b),
    }
}

fn parse_parts(version: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in version.chars() {
        if matches!(ch, '.' | '-' | '_' | '+') {
            flush(&mut current, &mut parts);
            continue;
        }
        let boundary = current
            .chars()
            .last()
            .is_some_and(|last| last.is_ascii_digit() != ch.is_ascii_digit());
        if boundary {
            flush(&mut current, &mut parts);
        }
        current.push(ch);
    }
    flush(&mut current, &mut parts);
    parts
}

fn flush(current: &mut String, parts: &mut Vec<Part>) {
    if !current.is_empty() {
        parts.push(classify(current));
        current.clear();
    }
}

fn classify(token: &str) -> Part {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        let digits = token.trim_start_matches('0');
        return Part::Numeric(if digits.is_empty() { "0" } else { digits }.to_string());
    }
    let lower = token.to_lowercase();
    let rank = match lower.as_str() {
        "dev" => TextRank::Dev,
        "rc" => TextRank::Rc,
        "snapshot" => TextRank::Snapshot,
        "final" => TextRank::Final,
        "ga" => TextRank::Ga,
        "release" => TextRank::Release,
        "sp" => TextRank::Sp,
        _ => TextRank::Other(lower),
    };
    Part::Text(rank)
}

/// A Maven-style version range.
///
/// Supports `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `]1.0,2.0[` and `[1.0]` (exact).
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse a range expression. Returns `None` for anything that is not one.
    pub fn parse(spec: &str) -> Option<Self> {
        let s = spec.trim();
        let open = s.chars().next()?;
        let close = s.chars().last()?;
        if s.len() < 2 || !matches!(open, '[' | '(' | ']') || !matches!(close, ']' | ')' | '[') {
            return None;
        }
        let open_inclusive = open == '[';
        let close_inclusive = close == ']';
        let inner = &s[1..s.len() - 1];

        let bound = |v: &str, inclusive: bool| {
            let v = v.trim();
            (!v.is_empty()).then(|| Bound {
                version: Version::parse(v),
                inclusive,
            })
        };

        match inner.split_once(',') {
            Some((lower, upper)) => Some(VersionRange {
                lower: bound(lower, open_inclusive),
                upper: bound(upper, close_inclusive),
            }),
            None => {
                let exact = bound(inner, true)?;
                Some(VersionRange {
                    lower: Some(exact.clone()),
                    upper: Some(exact),
                })
            }
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp_parts(&lower.version);
            if cmp == Ordering::Less || (!lower.inclusive && cmp == Ordering::Equal) {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp_parts(&upper.version);
            if cmp == Ordering::Greater || (!upper.inclusive && cmp == Ordering::Equal) {
                return false;
            }
        }
        true
    }
}

/// A requested version as written in a constraint.
#[derive(Debug, Clone)]
pub enum VersionSelector {
    Exact(Version),
    Range(VersionRange),
    /// `1.+`: any version starting with the text before `+`.
    Prefix(String),
    /// `+`: any version.
    Latest,
}

impl VersionSelector {
    pub fn parse(selector: &str) -> Self {
        let s = selector.trim();
        if s == "+" || s.eq_ignore_ascii_case("latest") {
            return VersionSelector::Latest;
        }
        if let Some(range) = VersionRange::parse(s) {
            return VersionSelector::Range(range);
        }
        match s.strip_suffix('+') {
            Some(prefix) if prefix.ends_with('.') => VersionSelector::Prefix(prefix.to_string()),
            _ => VersionSelector::Exact(Version::parse(s)),
        }
    }

    /// Whether the selector needs a version listing to pick a version.
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, VersionSelector::Exact(_))
    }

    pub fn accepts(&self, candidate: &str) -> bool {
        match self {
            VersionSelector::Exact(v) => v.original == candidate,
            VersionSelector::Range(range) => range.contains(&Version::parse(candidate)),
            VersionSelector::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            VersionSelector::Latest => true,
        }
    }

    /// The highest listed version this selector accepts and `rejected` does not.
    pub fn best_match<'a>(
        &self,
        listing: &'a [String],
        rejected: impl Fn(&str) -> bool,
    ) -> Option<&'a str> {
        listing
            .iter()
            .filter(|v| self.accepts(v.as_str()) && !rejected(v.as_str()))
            .max_by(|a, b| compare(a, b))
            .map(String::as_str)
    }
}
