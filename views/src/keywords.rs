use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// Keywords the election views filter on, in test order.
pub const ELECTION_KEYWORDS: [&str; 2] = ["auspol", "ausvotes"];

/// A compiled pattern that remembers how it was written, so it can be
/// rendered back as a JavaScript regex literal.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str, case_insensitive: bool) -> Result<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self {
            source: source.to_owned(),
            case_insensitive,
            regex,
        })
    }

    pub fn literal(word: &str) -> Result<Self> {
        Self::new(&regex::escape(word), true)
    }

    /// Case-insensitive match of any of `words`.
    pub fn any_of<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w.as_ref())).collect();
        Self::new(&format!("({})", alternatives.join("|")), true)
    }

    /// Parse a JavaScript regex literal such as `/auspol/i`. Only the `i` flag is understood.
    pub fn parse_js(literal: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::RegexLiteral {
            literal: literal.to_owned(),
            reason: reason.to_owned(),
        };
        let body = literal
            .strip_prefix('/')
            .ok_or_else(|| invalid("missing leading '/'"))?;
        let end = body.rfind('/').ok_or_else(|| invalid("missing closing '/'"))?;
        let (source, flags) = (&body[..end], &body[end + 1..]);
        if flags.chars().any(|c| c != 'i') {
            return Err(invalid("unsupported flags"));
        }
        Self::new(&source.replace("\\/", "/"), flags.contains('i'))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn to_js(&self) -> String {
        format!(
            "/{}/{}",
            self.source.replace('/', "\\/"),
            if self.case_insensitive { "i" } else { "" }
        )
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js())
    }
}

#[derive(Debug, Clone)]
pub struct Keywords {
    patterns: Vec<Pattern>,
}

impl Keywords {
    pub fn new<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = words
            .into_iter()
            .map(|w| Pattern::literal(w.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn from_patterns(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }

    /// Literal words first, then JavaScript regex literals such as `/scott ?morrison/i`.
    /// With neither, the election keywords are used.
    pub fn from_args<W, P>(words: &[W], literals: &[P]) -> Result<Self>
    where
        W: AsRef<str>,
        P: AsRef<str>,
    {
        if words.is_empty() && literals.is_empty() {
            return Ok(Self::election());
        }
        let mut patterns = Vec::with_capacity(words.len() + literals.len());
        for w in words {
            patterns.push(Pattern::literal(w.as_ref())?);
        }
        for l in literals {
            patterns.push(Pattern::parse_js(l.as_ref())?);
        }
        Ok(Self::from_patterns(patterns))
    }

    /// `auspol`, then `ausvotes`.
    pub fn election() -> Self {
        Self::new(ELECTION_KEYWORDS.iter()).expect("escaped literals always compile")
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Stops at the first matching pattern.
    pub fn any_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    pub fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a Pattern> + 'a {
        self.patterns.iter().filter(move |p| p.is_match(text))
    }

    /// e.g. `[/auspol/i, /ausvotes/i]`
    pub fn to_js(&self) -> String {
        let items: Vec<String> = self.patterns.iter().map(Pattern::to_js).collect();
        format!("[{}]", items.join(", "))
    }
}

impl Default for Keywords {
    fn default() -> Self {
        Self::election()
    }
}
