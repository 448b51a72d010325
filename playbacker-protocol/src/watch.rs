use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Kind of server-side change announced on the watch channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// The catalog of setlist names changed.
    Setlists,
    /// Contents of the watched setlist changed.
    CurrentSetlist,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setlists => "setlists",
            Self::CurrentSetlist => "current_setlist",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown change category {:?}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Accepts the bare name as well as a JSON-quoted one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"') {
            "setlists" => Ok(Self::Setlists),
            "current_setlist" => Ok(Self::CurrentSetlist),
            other => Err(UnknownCategory(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_quoted_names() {
        assert_eq!("setlists".parse(), Ok(Category::Setlists));
        assert_eq!(" \"current_setlist\"\n".parse(), Ok(Category::CurrentSetlist));
        assert_eq!(
            "message".parse::<Category>(),
            Err(UnknownCategory("message".into()))
        );
    }

    #[test]
    fn serde_matches_display() {
        for category in [Category::Setlists, Category::CurrentSetlist] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category));
        }
    }
}
