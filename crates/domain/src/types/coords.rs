//! Data source coordinates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::HarvestError;

/// Location of a harvest store given as `server.database.schema`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSourceCoords {
    pub server: String,
    pub database: String,
    pub schema: String,
}

impl DataSourceCoords {
    /// Key used for checkpoints and skip entries recorded against this store
    pub fn key(&self) -> String {
        self.to_string()
    }
}

/// Check that `schema` is a plain identifier SQLite can attach under
fn is_valid_schema(schema: &str) -> bool {
    let mut chars = schema.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    valid_start
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !schema.eq_ignore_ascii_case("main")
        && !schema.eq_ignore_ascii_case("temp")
}

impl FromStr for DataSourceCoords {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [server, database, schema] = parts.as_slice() else {
            return Err(HarvestError::InvalidArgument(format!(
                "expected server.database.schema, found {s:?}"
            )));
        };

        if server.is_empty() || database.is_empty() || schema.is_empty() {
            return Err(HarvestError::InvalidArgument(format!(
                "empty component in data source {s:?}"
            )));
        }
        if !is_valid_schema(schema) {
            return Err(HarvestError::InvalidArgument(format!(
                "schema {schema:?} must be a plain identifier other than main or temp"
            )));
        }

        Ok(Self {
            server: (*server).to_string(),
            database: (*database).to_string(),
            schema: (*schema).to_string(),
        })
    }
}

impl fmt::Display for DataSourceCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.server, self.database, self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_components() {
        let coords: DataSourceCoords = "archive.caom.caom2".parse().unwrap();
        assert_eq!(coords.server, "archive");
        assert_eq!(coords.database, "caom");
        assert_eq!(coords.schema, "caom2");
        assert_eq!(coords.key(), "archive.caom.caom2");
    }

    #[test]
    fn test_rejects_wrong_component_count() {
        assert!("archive.caom".parse::<DataSourceCoords>().is_err());
        assert!("a.b.c.d".parse::<DataSourceCoords>().is_err());
        assert!("".parse::<DataSourceCoords>().is_err());
    }

    #[test]
    fn test_rejects_empty_components() {
        let err = "archive..caom2".parse::<DataSourceCoords>().unwrap_err();
        assert!(err.is_argument_error());
        assert!(".caom.caom2".parse::<DataSourceCoords>().is_err());
    }

    #[test]
    fn test_rejects_unsafe_schema_names() {
        assert!("archive.caom.caom-2".parse::<DataSourceCoords>().is_err());
        assert!("archive.caom.main".parse::<DataSourceCoords>().is_err());
        assert!("archive.caom.Temp".parse::<DataSourceCoords>().is_err());
        assert!("archive.caom.9lives".parse::<DataSourceCoords>().is_err());
    }
}
