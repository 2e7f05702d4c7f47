use std::cmp::Ordering;
use std::fmt;

/// One dot or hyphen delimited piece of a version string.
#[derive(Debug, Clone, Copy)]
struct Part<'a> {
    raw: &'a str,
    number: Option<u64>,
}

impl<'a> Part<'a> {
    fn new(raw: &'a str) -> Self {
        let number = if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            raw.parse::<u64>().ok()
        } else {
            None
        };

        Part { raw, number }
    }

    fn cmp_part(&self, other: &Part<'_>) -> Ordering {
        match (self.number, other.number) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => self.raw.cmp(other.raw),
        }
    }
}

fn parts(version: &str) -> impl Iterator<Item = Part<'_>> {
    version.split(['.', '-']).map(Part::new)
}

/// Compares two version strings part by part.
///
/// An empty left operand is always less than a non-empty right one. Only the
/// overlapping prefix of parts is compared, so `1.2` and `1.2.0` are equal.
pub fn compare(left: &str, right: &str) -> Ordering {
    match (left.is_empty(), right.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    for (l, r) in parts(left).zip(parts(right)) {
        let ordering = l.cmp_part(&r);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

pub fn is_wildcard(version: &str) -> bool {
    version.contains('*')
}

/// A dotted version pattern such as `1.4.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPattern {
    original: String,
    segments: Vec<String>,
}

impl VersionPattern {
    pub fn parse(pattern: &str) -> Self {
        let trimmed = pattern.trim();
        VersionPattern {
            original: trimmed.to_string(),
            segments: trimmed.split('.').map(|s| s.trim().to_string()).collect(),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Positional match up to the first `*` segment. A candidate with fewer
    /// segments than the pattern needs is not a match.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate: Vec<&str> = candidate.split('.').collect();

        for (idx, segment) in self.segments.iter().enumerate() {
            if segment == "*" {
                return true;
            }

            match candidate.get(idx) {
                Some(part) if *part == segment => {}
                _ => return false,
            }
        }

        true
    }

    /// Lexicographically greatest matching candidate.
    pub fn select<'a, I>(&self, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.matches(candidate))
            .max()
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
