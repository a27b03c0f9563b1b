//! Code for reading the `Sets_*` tab files.
use super::*;
use indexmap::IndexSet;

/// Sets as read from the tab files, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSets {
    /// Node names
    pub nodes: Vec<String>,
    /// Offshore node names
    pub offshore_nodes: Vec<String>,
    /// Generator names
    pub generators: Vec<String>,
    /// Technology names
    pub technologies: Vec<String>,
    /// Storage names
    pub storages: Vec<String>,
    /// Transmission line type names
    pub line_types: Vec<String>,
    /// `(from, to)` node pairs
    pub directional_links: Vec<(String, String)>,
    /// `(from, to, line type)` triples
    pub line_type_of_links: Vec<(String, String, String)>,
    /// `(node, generator)` pairs
    pub generators_of_node: Vec<(String, String)>,
    /// `(technology, generator)` pairs
    pub generators_of_technology: Vec<(String, String)>,
    /// `(node, storage)` pairs
    pub storages_of_node: Vec<(String, String)>,
    /// Thermal generator names
    pub thermal_generators: Vec<String>,
    /// Hydro generator names
    pub hydro_generators: Vec<String>,
    /// Reservoir hydro generator names
    pub reservoir_generators: Vec<String>,
    /// Dependent storage names
    pub dependent_storages: Vec<String>,
}

fn read_single(tab_dir: &Path, sheet: &str, column: &str) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = read_tab(&tab_dir.join(tab_file_name("Sets", sheet)), &[column])?;
    Ok(rows.into_iter().map(|(value,)| value).collect())
}

fn read_pairs(tab_dir: &Path, sheet: &str, columns: [&str; 2]) -> Result<Vec<(String, String)>> {
    read_tab(&tab_dir.join(tab_file_name("Sets", sheet)), &columns)
}

/// Read the raw sets from the tab folder.
///
/// `Sets_OffshoreNode.tab` is optional; all other files are required but may contain only a
/// header.
pub fn read_raw_sets(tab_dir: &Path) -> Result<RawSets> {
    let offshore_path = tab_dir.join(tab_file_name("Sets", "OffshoreNode"));
    let offshore_nodes: Vec<(String,)> =
        read_tab_optional(&offshore_path, &["Node"])?.unwrap_or_default();

    Ok(RawSets {
        nodes: read_single(tab_dir, "Node", "Node")?,
        offshore_nodes: offshore_nodes.into_iter().map(|(node,)| node).collect(),
        generators: read_single(tab_dir, "Generator", "Generator")?,
        technologies: read_single(tab_dir, "Technology", "Technology")?,
        storages: read_single(tab_dir, "Storage", "Storage")?,
        line_types: read_single(tab_dir, "LineType", "LineType")?,
        directional_links: read_pairs(tab_dir, "DirectionalLines", ["FromNode", "ToNode"])?,
        line_type_of_links: read_tab(
            &tab_dir.join(tab_file_name("Sets", "LineTypeOfDirectionalLines")),
            &["FromNode", "ToNode", "LineType"],
        )?,
        generators_of_node: read_pairs(tab_dir, "GeneratorsOfNode", ["Node", "Generator"])?,
        generators_of_technology: read_pairs(
            tab_dir,
            "GeneratorsOfTechnology",
            ["Technology", "Generator"],
        )?,
        storages_of_node: read_pairs(tab_dir, "StorageOfNodes", ["Node", "Storage"])?,
        thermal_generators: read_single(tab_dir, "ThermalGenerators", "Generator")?,
        hydro_generators: read_single(tab_dir, "HydroGenerator", "Generator")?,
        reservoir_generators: read_single(tab_dir, "HydroGeneratorWithReservoir", "Generator")?,
        dependent_storages: read_single(tab_dir, "DependentStorage", "Storage")?,
    })
}

/// Read and validate the sets from the tab folder
pub fn read_sets(tab_dir: &Path, north_sea: bool) -> Result<Sets> {
    let raw = read_raw_sets(tab_dir)?;
    Sets::from_raw(raw, north_sea).with_context(|| format!("Invalid sets in {}", tab_dir.display()))
}

/// Write sets to the tab folder in the form they are read
pub fn write_sets(tab_dir: &Path, sets: &Sets) -> Result<()> {
    let path = |sheet: &str| tab_dir.join(tab_file_name("Sets", sheet));
    let offshore: IndexSet<_> = sets.offshore_nodes.iter().collect();
    let onshore = sets.nodes.iter().filter(|node| !offshore.contains(node));

    write_tab(&path("Node"), &["Node"], onshore.map(|n| (n,)))?;
    write_tab(&path("OffshoreNode"), &["Node"], offshore.iter().map(|n| (n,)))?;
    write_tab(&path("Generator"), &["Generator"], sets.generators.iter().map(|g| (g,)))?;
    write_tab(&path("Technology"), &["Technology"], sets.technologies.iter().map(|t| (t,)))?;
    write_tab(&path("Storage"), &["Storage"], sets.storages.iter().map(|b| (b,)))?;
    write_tab(&path("LineType"), &["LineType"], sets.line_types.iter().map(|l| (l,)))?;
    write_tab(
        &path("DirectionalLines"),
        &["FromNode", "ToNode"],
        sets.directional_links.iter(),
    )?;
    write_tab(
        &path("LineTypeOfDirectionalLines"),
        &["FromNode", "ToNode", "LineType"],
        sets.line_type_of_link
            .iter()
            .map(|((from, to), line_type)| (from, to, line_type)),
    )?;
    write_tab(
        &path("GeneratorsOfNode"),
        &["Node", "Generator"],
        sets.generators_of_node.iter(),
    )?;
    write_tab(
        &path("GeneratorsOfTechnology"),
        &["Technology", "Generator"],
        sets.technology_of_generator
            .iter()
            .map(|(generator, technology)| (technology, generator)),
    )?;
    write_tab(
        &path("StorageOfNodes"),
        &["Node", "Storage"],
        sets.storages_of_node.iter(),
    )?;
    write_tab(
        &path("ThermalGenerators"),
        &["Generator"],
        sets.thermal_generators.iter().map(|g| (g,)),
    )?;
    write_tab(
        &path("HydroGenerator"),
        &["Generator"],
        sets.hydro_generators.iter().map(|g| (g,)),
    )?;
    write_tab(
        &path("HydroGeneratorWithReservoir"),
        &["Generator"],
        sets.reservoir_generators.iter().map(|g| (g,)),
    )?;
    write_tab(
        &path("DependentStorage"),
        &["Storage"],
        sets.dependent_storages.iter().map(|b| (b,)),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::raw_sets;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_then_read_sets(raw_sets: RawSets) {
        let sets = Sets::from_raw(raw_sets, false).unwrap();
        let dir = tempdir().unwrap();
        write_sets(dir.path(), &sets).unwrap();
        assert_eq!(read_sets(dir.path(), false).unwrap(), sets);
    }

    #[test]
    fn test_missing_sets_file() {
        let dir = tempdir().unwrap();
        assert!(read_raw_sets(dir.path()).is_err());
    }
}
