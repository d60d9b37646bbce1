use crate::postal::{CODE_LENGTH, PREFIX_LENGTH};

/// A trimmed query, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SearchQuery {
    Empty,
    /// Six digits.
    PinCode(String),
    /// Three to five digits.
    PinPrefix(String),
    /// One or two digits: too short for postal lookup, searched as text.
    ShortNumber(String),
    /// More digits than a PIN code has.
    LongNumber(String),
    Text(String),
}

impl SearchQuery {
    /// Whitespace inside an otherwise numeric query is dropped, so
    /// `"110 001"` is a PIN code.
    pub(crate) fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        let numeric = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace());
        if !numeric {
            return Self::Text(trimmed.to_string());
        }
        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        match digits.len() {
            CODE_LENGTH => Self::PinCode(digits),
            n if n >= PREFIX_LENGTH && n < CODE_LENGTH => Self::PinPrefix(digits),
            n if n < PREFIX_LENGTH => Self::ShortNumber(digits),
            _ => Self::LongNumber(digits),
        }
    }

    pub(crate) const fn is_numeric(&self) -> bool {
        !matches!(self, Self::Empty | Self::Text(_))
    }

    /// Text handed to the fuzzy indexes, if this query is searched as text.
    pub(crate) fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::ShortNumber(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(SearchQuery::parse("   "), SearchQuery::Empty);
        assert_eq!(SearchQuery::parse(" 110001 "), SearchQuery::PinCode("110001".into()));
        assert_eq!(SearchQuery::parse("110 001"), SearchQuery::PinCode("110001".into()));
        assert_eq!(SearchQuery::parse("2080"), SearchQuery::PinPrefix("2080".into()));
        assert_eq!(SearchQuery::parse("12"), SearchQuery::ShortNumber("12".into()));
        assert_eq!(SearchQuery::parse("1100011"), SearchQuery::LongNumber("1100011".into()));
        assert_eq!(SearchQuery::parse(" New Delhi "), SearchQuery::Text("New Delhi".into()));
        assert_eq!(SearchQuery::parse("sector 21"), SearchQuery::Text("sector 21".into()));
    }

    #[test]
    fn test_numeric_queries() {
        assert!(SearchQuery::parse("12").is_numeric());
        assert_eq!(SearchQuery::parse("12").text(), Some("12"));
        assert!(SearchQuery::parse("110").text().is_none());
        assert!(!SearchQuery::parse("Lucknow").is_numeric());
    }
}
