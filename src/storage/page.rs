use std::{fmt, str::FromStr};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SlugParseError {
    Empty,
    InvalidChar(char),
}

impl fmt::Display for SlugParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlugParseError::Empty => write!(f, "slug is empty"),
            SlugParseError::InvalidChar(c) => write!(f, "slug contains invalid character {c:?}"),
        }
    }
}

impl std::error::Error for SlugParseError {}

impl FromStr for Slug {
    type Err = SlugParseError;

    /// Slugs are stored verbatim, so only unreserved URL characters are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SlugParseError::Empty);
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')))
        {
            return Err(SlugParseError::InvalidChar(c));
        }
        Ok(Slug(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub slug: Slug,
    pub order_by: i64,
}
