use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// File extension used for value files in a store directory.
///
/// The extension only names files. Value bytes are stored verbatim whatever
/// the extension says.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueExt {
    /// `.json`
    Json,
    /// `.gob`
    #[default]
    Gob,
    /// `.html`
    Html,
    /// `.xml`
    Xml,
}

impl ValueExt {
    /// All supported extensions.
    pub const ALL: [ValueExt; 4] = [Self::Json, Self::Gob, Self::Html, Self::Xml];

    /// The dotted extension string, e.g. `".gob"`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => ".json",
            Self::Gob => ".gob",
            Self::Html => ".html",
            Self::Xml => ".xml",
        }
    }
}

impl fmt::Display for ValueExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueExt {
    type Err = TypeError;

    /// Only the dotted forms are accepted; `"gob"` or `".txt"` are errors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ext| ext.as_str() == s)
            .ok_or_else(|| TypeError::UnsupportedExtension(s.to_string()))
    }
}

impl TryFrom<String> for ValueExt {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueExt> for String {
    fn from(ext: ValueExt) -> Self {
        ext.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_extensions() {
        assert_eq!(".json".parse::<ValueExt>().unwrap(), ValueExt::Json);
        assert_eq!(".gob".parse::<ValueExt>().unwrap(), ValueExt::Gob);
        assert_eq!(".html".parse::<ValueExt>().unwrap(), ValueExt::Html);
        assert_eq!(".xml".parse::<ValueExt>().unwrap(), ValueExt::Xml);
    }

    #[test]
    fn rejects_unsupported_extensions() {
        for bad in ["", ".txt", "json", "gob", ".GOB"] {
            assert_eq!(
                bad.parse::<ValueExt>(),
                Err(TypeError::UnsupportedExtension(bad.to_string()))
            );
        }
    }

    #[test]
    fn serde_uses_dotted_string() {
        let json = serde_json::to_string(&ValueExt::Xml).unwrap();
        assert_eq!(json, "\".xml\"");
        let parsed: ValueExt = serde_json::from_str("\".json\"").unwrap();
        assert_eq!(parsed, ValueExt::Json);
        assert!(serde_json::from_str::<ValueExt>("\".txt\"").is_err());
    }
}
