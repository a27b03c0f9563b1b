//! Translation of the ISO-style node codes used in time series files to model node names.
use crate::input::input_err_msg;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// The file in the scenario data folder which overrides or extends the default names
pub const NODE_NAMES_FILE_NAME: &str = "node_names.csv";

/// Long names of European countries and North Sea offshore zones
const DEFAULT_NODE_NAMES: [(&str, &str); 47] = [
    ("AT", "Austria"),
    ("BA", "BosniaH"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("CH", "Switzerland"),
    ("CZ", "CzechR"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("EE", "Estonia"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "GreatBrit."),
    ("GR", "Greece"),
    ("HR", "Croatia"),
    ("HU", "Hungary"),
    ("IE", "Ireland"),
    ("IT", "Italy"),
    ("LT", "Lithuania"),
    ("LU", "Luxemb."),
    ("LV", "Latvia"),
    ("MK", "Macedonia"),
    ("NL", "Netherlands"),
    ("NO1", "NO1"),
    ("NO2", "NO2"),
    ("NO3", "NO3"),
    ("NO4", "NO4"),
    ("NO5", "NO5"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("RS", "Serbia"),
    ("SE", "Sweden"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("MF", "MorayFirth"),
    ("FF", "FirthofForth"),
    ("DB", "DoggerBank"),
    ("HS", "Hornsea"),
    ("OD", "OuterDowsing"),
    ("NF", "Norfolk"),
    ("EA", "EastAnglia"),
    ("BS", "Borssele"),
    ("HK", "HollandseeKust"),
    ("HB", "HelgoländerBucht"),
    ("NS", "Nordsøen"),
    ("UN", "UtsiraNord"),
];

#[derive(Deserialize)]
struct NodeNameRow {
    code: String,
    name: String,
}

/// Maps node codes to node names
#[derive(Debug, Clone, PartialEq)]
pub struct NodeNames(IndexMap<String, String>);

impl Default for NodeNames {
    fn default() -> Self {
        Self(
            DEFAULT_NODE_NAMES
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        )
    }
}

impl NodeNames {
    /// The default names, updated from `node_names.csv` in the scenario data folder if present
    pub fn from_dir(scenario_dir: &Path) -> Result<Self> {
        let mut names = Self::default();
        let file_path = scenario_dir.join(NODE_NAMES_FILE_NAME);
        if !file_path.is_file() {
            return Ok(names);
        }

        let mut reader =
            csv::Reader::from_path(&file_path).with_context(|| input_err_msg(&file_path))?;
        for row in reader.deserialize() {
            let row: NodeNameRow = row.with_context(|| input_err_msg(&file_path))?;
            names.0.insert(row.code.trim().into(), row.name.trim().into());
        }

        Ok(names)
    }

    /// The name for a code. Unknown codes are used as names unchanged.
    pub fn long_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.0.get(code).map_or(code, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_names() {
        let names = NodeNames::default();
        assert_eq!(names.long_name("DE"), "Germany");
        assert_eq!(names.long_name("NO3"), "NO3");
        assert_eq!(names.long_name("NodeA"), "NodeA");
    }

    #[test]
    fn test_names_from_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(NodeNames::from_dir(dir.path()).unwrap(), NodeNames::default());

        fs::write(
            dir.path().join(NODE_NAMES_FILE_NAME),
            "code,name\nGB,UnitedKingdom\nXX, Atlantis \n",
        )
        .unwrap();
        let names = NodeNames::from_dir(dir.path()).unwrap();
        assert_eq!(names.long_name("GB"), "UnitedKingdom");
        assert_eq!(names.long_name("XX"), "Atlantis");
        assert_eq!(names.long_name("FR"), "France");
    }
}
