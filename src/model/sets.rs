//! The index sets of a model: nodes, generators, storages, transmission links and their subsets.
//!
//! Every set is an [`IndexSet`], so the position of an element is the dense index used for
//! parameter and variable tables, and the set maps an index back to its element for reporting.
use crate::id::{GeneratorID, LineTypeID, NodeID, StorageID, TechnologyID};
use crate::input::sets::RawSets;
use anyhow::{Context, Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

/// A pair of nodes. For directional links this is `(from, to)`.
pub type Link = (NodeID, NodeID);

/// The validated sets of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Sets {
    /// All nodes, including offshore nodes when enabled
    pub nodes: IndexSet<NodeID>,
    /// Offshore (North Sea) nodes. Empty unless the North Sea option is enabled.
    pub offshore_nodes: IndexSet<NodeID>,
    /// Offshore nodes left out of the model because the North Sea option is disabled.
    ///
    /// Input rows referring to these nodes are ignored.
    pub excluded_nodes: IndexSet<NodeID>,
    /// All generator types
    pub generators: IndexSet<GeneratorID>,
    /// All technologies
    pub technologies: IndexSet<TechnologyID>,
    /// All storage types
    pub storages: IndexSet<StorageID>,
    /// All transmission line types
    pub line_types: IndexSet<LineTypeID>,
    /// Links along which power can flow, in the given direction
    pub directional_links: IndexSet<Link>,
    /// Unordered node pairs with transmission capacity, in first-seen orientation
    pub arcs: IndexSet<Link>,
    /// The line type of each directional link
    pub line_type_of_link: IndexMap<Link, LineTypeID>,
    /// Generators available at each node
    pub generators_of_node: IndexSet<(NodeID, GeneratorID)>,
    /// The technology of each generator
    pub technology_of_generator: IndexMap<GeneratorID, TechnologyID>,
    /// Storage types available at each node
    pub storages_of_node: IndexSet<(NodeID, StorageID)>,
    /// Generators subject to ramping limits
    pub thermal_generators: IndexSet<GeneratorID>,
    /// Hydro generators, subject to the annual hydro cap of their node
    pub hydro_generators: IndexSet<GeneratorID>,
    /// Reservoir hydro generators, subject to seasonal inflow limits
    pub reservoir_generators: IndexSet<GeneratorID>,
    /// Storages whose power capacity is tied to their energy capacity
    pub dependent_storages: IndexSet<StorageID>,
    index: DerivedIndex,
}

/// Look-up tables computed once from the sets
#[derive(Debug, Clone, PartialEq, Default)]
struct DerivedIndex {
    /// `(node, generator)` pair indices at each node
    ng_of_node: Vec<Vec<usize>>,
    /// `(node, storage)` pair indices at each node
    nb_of_node: Vec<Vec<usize>>,
    /// `(node, generator)` pair indices for each `(node, technology)` combination present
    ng_of_node_technology: IndexMap<(usize, usize), Vec<usize>>,
    /// Directional links ending at each node
    links_into: Vec<Vec<usize>>,
    /// Directional links starting at each node
    links_out_of: Vec<Vec<usize>>,
    /// Arc index for each directional link
    arc_of_link: Vec<usize>,
    /// Node index for each `(node, generator)` pair
    node_of_ng: Vec<usize>,
    /// Generator index for each `(node, generator)` pair
    generator_of_ng: Vec<usize>,
    /// Technology index for each `(node, generator)` pair
    technology_of_ng: Vec<usize>,
    /// Node index for each `(node, storage)` pair
    node_of_nb: Vec<usize>,
    /// Storage index for each `(node, storage)` pair
    storage_of_nb: Vec<usize>,
}

fn collect_unique<T, I>(name: &str, items: I) -> Result<IndexSet<T>>
where
    T: std::hash::Hash + Eq + std::fmt::Debug,
    I: IntoIterator<Item = T>,
{
    let mut set = IndexSet::new();
    for item in items {
        let (_, replaced) = set.replace_full(item);
        if let Some(duplicate) = replaced {
            bail!("Duplicate entry {duplicate:?} in {name}");
        }
    }

    Ok(set)
}

fn check_member<T: std::hash::Hash + Eq + std::fmt::Display>(
    set: &IndexSet<T>,
    item: &T,
    set_name: &str,
) -> Result<()> {
    ensure!(set.contains(item), "{item} is not in {set_name}");
    Ok(())
}

/// Build unordered arcs from directional links, keeping the first-seen orientation
fn build_arcs(links: &IndexSet<Link>) -> IndexSet<Link> {
    let mut arcs = IndexSet::new();
    for (from, to) in links {
        if !arcs.contains(&(to.clone(), from.clone())) {
            arcs.insert((from.clone(), to.clone()));
        }
    }

    arcs
}

impl Sets {
    /// Validate raw sets and compute derived look-up tables.
    ///
    /// # Arguments
    ///
    /// * `raw` - Sets as read from the tab files
    /// * `north_sea` - Whether offshore nodes are part of the model. If not, offshore nodes and
    ///   any entries referring to them are dropped.
    pub fn from_raw(raw: RawSets, north_sea: bool) -> Result<Self> {
        let offshore: IndexSet<NodeID> = raw.offshore_nodes.into_iter().map(NodeID::from).collect();
        let (offshore_nodes, excluded_nodes) = if north_sea {
            (offshore, IndexSet::new())
        } else {
            if !offshore.is_empty() {
                debug!("Dropping {} offshore nodes", offshore.len());
            }
            (IndexSet::new(), offshore)
        };
        let keep_node = |node: &NodeID| !excluded_nodes.contains(node);

        let mut nodes = collect_unique(
            "Node",
            raw.nodes
                .into_iter()
                .map(NodeID::from)
                .filter(|node| keep_node(node)),
        )?;
        for node in &offshore_nodes {
            nodes.insert(node.clone());
        }
        ensure!(!nodes.is_empty(), "At least one node is required");

        let generators: IndexSet<GeneratorID> =
            collect_unique("Generator", raw.generators.into_iter().map(Into::into))?;
        let technologies: IndexSet<TechnologyID> =
            collect_unique("Technology", raw.technologies.into_iter().map(Into::into))?;
        let storages: IndexSet<StorageID> =
            collect_unique("Storage", raw.storages.into_iter().map(Into::into))?;
        let line_types: IndexSet<LineTypeID> =
            collect_unique("LineType", raw.line_types.into_iter().map(Into::into))?;

        let to_link = |(from, to): (String, String)| (NodeID::from(from), NodeID::from(to));
        let keep_link = |(from, to): &Link| keep_node(from) && keep_node(to);
        let directional_links = collect_unique(
            "DirectionalLines",
            raw.directional_links
                .into_iter()
                .map(to_link)
                .filter(|link| keep_link(link)),
        )?;
        for (from, to) in &directional_links {
            check_member(&nodes, from, "Node")?;
            check_member(&nodes, to, "Node")?;
            ensure!(from != to, "Link from {from} to itself");
        }
        let arcs = build_arcs(&directional_links);

        let mut line_type_of_link = IndexMap::new();
        for (from, to, line_type) in raw.line_type_of_links {
            let link = to_link((from, to));
            if !keep_link(&link) {
                continue;
            }
            let line_type = LineTypeID::from(line_type);
            check_member(&line_types, &line_type, "LineType")?;
            ensure!(
                directional_links.contains(&link),
                "Line type given for {} to {}, which is not a directional link",
                link.0,
                link.1
            );
            if line_type_of_link.insert(link.clone(), line_type).is_some() {
                bail!("Multiple line types for link {} to {}", link.0, link.1);
            }
        }

        let generators_of_node: IndexSet<(NodeID, GeneratorID)> = collect_unique(
            "GeneratorsOfNode",
            raw.generators_of_node
                .into_iter()
                .map(|(node, generator)| (NodeID::from(node), GeneratorID::from(generator)))
                .filter(|(node, _)| keep_node(node)),
        )?;
        for (node, generator) in &generators_of_node {
            check_member(&nodes, node, "Node")?;
            check_member(&generators, generator, "Generator")?;
        }

        let mut technology_of_generator = IndexMap::new();
        for (technology, generator) in raw.generators_of_technology {
            let technology = TechnologyID::from(technology);
            let generator = GeneratorID::from(generator);
            check_member(&technologies, &technology, "Technology")?;
            check_member(&generators, &generator, "Generator")?;
            if let Some(other) = technology_of_generator.insert(generator.clone(), technology) {
                bail!("Generator {generator} belongs to more than one technology (including {other})");
            }
        }
        for (node, generator) in &generators_of_node {
            ensure!(
                technology_of_generator.contains_key(generator),
                "Generator {generator} at node {node} has no technology"
            );
        }

        let storages_of_node: IndexSet<(NodeID, StorageID)> = collect_unique(
            "StorageOfNodes",
            raw.storages_of_node
                .into_iter()
                .map(|(node, storage)| (NodeID::from(node), StorageID::from(storage)))
                .filter(|(node, _)| keep_node(node)),
        )?;
        for (node, storage) in &storages_of_node {
            check_member(&nodes, node, "Node")?;
            check_member(&storages, storage, "Storage")?;
        }

        let generator_subset = |name: &str, items: Vec<String>| -> Result<IndexSet<GeneratorID>> {
            let subset = collect_unique(name, items.into_iter().map(GeneratorID::from))?;
            for generator in &subset {
                check_member(&generators, generator, "Generator")?;
            }
            Ok(subset)
        };
        let thermal_generators = generator_subset("ThermalGenerators", raw.thermal_generators)?;
        let hydro_generators = generator_subset("HydroGenerator", raw.hydro_generators)?;
        let reservoir_generators =
            generator_subset("HydroGeneratorWithReservoir", raw.reservoir_generators)?;
        for generator in &reservoir_generators {
            if !hydro_generators.contains(generator) {
                warn!("Reservoir generator {generator} is not listed as a hydro generator");
            }
        }

        let dependent_storages = collect_unique(
            "DependentStorage",
            raw.dependent_storages.into_iter().map(StorageID::from),
        )?;
        for storage in &dependent_storages {
            check_member(&storages, storage, "Storage")?;
        }

        let mut sets = Self {
            nodes,
            offshore_nodes,
            excluded_nodes,
            generators,
            technologies,
            storages,
            line_types,
            directional_links,
            arcs,
            line_type_of_link,
            generators_of_node,
            technology_of_generator,
            storages_of_node,
            thermal_generators,
            hydro_generators,
            reservoir_generators,
            dependent_storages,
            index: DerivedIndex::default(),
        };
        sets.index = sets.build_index()?;

        Ok(sets)
    }

    /// Dense positions of every member, for members already checked against their sets
    fn build_index(&self) -> Result<DerivedIndex> {
        let num_nodes = self.nodes.len();
        let mut index = DerivedIndex {
            ng_of_node: vec![Vec::new(); num_nodes],
            nb_of_node: vec![Vec::new(); num_nodes],
            links_into: vec![Vec::new(); num_nodes],
            links_out_of: vec![Vec::new(); num_nodes],
            ..Default::default()
        };

        for (ng, (node, generator)) in self.generators_of_node.iter().enumerate() {
            let n = self.node_index(node)?;
            let t = self
                .technologies
                .get_index_of(&self.technology_of_generator[generator])
                .with_context(|| format!("Unknown technology for generator {generator}"))?;
            index.ng_of_node[n].push(ng);
            index.ng_of_node_technology.entry((n, t)).or_default().push(ng);
            index.node_of_ng.push(n);
            index.generator_of_ng.push(
                self.generators
                    .get_index_of(generator)
                    .with_context(|| format!("Unknown generator {generator}"))?,
            );
            index.technology_of_ng.push(t);
        }

        for (nb, (node, storage)) in self.storages_of_node.iter().enumerate() {
            let n = self.node_index(node)?;
            index.nb_of_node[n].push(nb);
            index.node_of_nb.push(n);
            index.storage_of_nb.push(
                self.storages
                    .get_index_of(storage)
                    .with_context(|| format!("Unknown storage {storage}"))?,
            );
        }

        for (l, (from, to)) in self.directional_links.iter().enumerate() {
            index.links_out_of[self.node_index(from)?].push(l);
            index.links_into[self.node_index(to)?].push(l);
            index.arc_of_link.push(
                self.arc_index(from, to)
                    .with_context(|| format!("No arc joins {from} and {to}"))?,
            );
        }

        Ok(index)
    }

    fn node_index(&self, node: &NodeID) -> Result<usize> {
        self.nodes
            .get_index_of(node)
            .with_context(|| format!("Unknown node {node}"))
    }

    /// The index of the arc joining two nodes, in either orientation
    pub fn arc_index(&self, a: &NodeID, b: &NodeID) -> Option<usize> {
        self.arcs
            .get_index_of(&(a.clone(), b.clone()))
            .or_else(|| self.arcs.get_index_of(&(b.clone(), a.clone())))
    }

    /// The arc index of a directional link
    pub fn arc_of_link(&self, link: usize) -> usize {
        self.index.arc_of_link[link]
    }

    /// `(node, generator)` pair indices at the given node
    pub fn ng_of_node(&self, node: usize) -> &[usize] {
        &self.index.ng_of_node[node]
    }

    /// `(node, storage)` pair indices at the given node
    pub fn nb_of_node(&self, node: usize) -> &[usize] {
        &self.index.nb_of_node[node]
    }

    /// Iterate over `(node, technology)` index pairs which have generators, with the pair indices
    /// of those generators
    pub fn iter_node_technologies(&self) -> impl Iterator<Item = ((usize, usize), &[usize])> {
        self.index
            .ng_of_node_technology
            .iter()
            .map(|(key, ngs)| (*key, ngs.as_slice()))
    }

    /// Directional links ending at the given node
    pub fn links_into(&self, node: usize) -> &[usize] {
        &self.index.links_into[node]
    }

    /// Directional links starting at the given node
    pub fn links_out_of(&self, node: usize) -> &[usize] {
        &self.index.links_out_of[node]
    }

    /// Node index of a `(node, generator)` pair
    pub fn node_of_ng(&self, ng: usize) -> usize {
        self.index.node_of_ng[ng]
    }

    /// Generator index of a `(node, generator)` pair
    pub fn generator_of_ng(&self, ng: usize) -> usize {
        self.index.generator_of_ng[ng]
    }

    /// Technology index of a `(node, generator)` pair
    pub fn technology_of_ng(&self, ng: usize) -> usize {
        self.index.technology_of_ng[ng]
    }

    /// Node index of a `(node, storage)` pair
    pub fn node_of_nb(&self, nb: usize) -> usize {
        self.index.node_of_nb[nb]
    }

    /// Storage index of a `(node, storage)` pair
    pub fn storage_of_nb(&self, nb: usize) -> usize {
        self.index.storage_of_nb[nb]
    }

    /// The technology of a generator
    pub fn technology_of(&self, generator: &GeneratorID) -> Result<&TechnologyID> {
        self.technology_of_generator
            .get(generator)
            .with_context(|| format!("Generator {generator} has no technology"))
    }

    /// The index of the given line type for the directional link, if any
    pub fn line_type_of_link_index(&self, link: usize) -> Option<usize> {
        let link = self.directional_links.get_index(link)?;
        self.line_type_of_link
            .get(link)
            .and_then(|line_type| self.line_types.get_index_of(line_type))
    }

    /// The line type of an arc, looked up under either orientation
    pub fn line_type_of_arc(&self, arc: usize) -> Option<&LineTypeID> {
        let (a, b) = self.arcs.get_index(arc)?;
        self.line_type_of_link
            .get(&(a.clone(), b.clone()))
            .or_else(|| self.line_type_of_link.get(&(b.clone(), a.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, raw_sets};
    use rstest::rstest;

    #[rstest]
    fn test_from_raw(raw_sets: RawSets) {
        let sets = Sets::from_raw(raw_sets, false).unwrap();
        assert_eq!(sets.nodes.len(), 2);
        assert_eq!(sets.directional_links.len(), 2);
        assert_eq!(sets.arcs.len(), 1);
        assert_eq!(sets.arc_index(&"NodeB".into(), &"NodeA".into()), Some(0));
        assert_eq!(sets.arc_of_link(1), 0);
        assert_eq!(sets.links_into(1), [0]);
        assert_eq!(sets.links_out_of(1), [1]);
        assert_eq!(sets.ng_of_node(0), [0, 1]);
        assert_eq!(sets.technology_of_ng(1), 1);
        assert_eq!(sets.line_type_of_arc(0), Some(&"HVAC_OHL".into()));
    }

    #[rstest]
    fn test_offshore_nodes_dropped(mut raw_sets: RawSets) {
        raw_sets.offshore_nodes.push("NorthSea".into());
        raw_sets.nodes.push("NorthSea".into());
        raw_sets
            .directional_links
            .push(("NodeA".into(), "NorthSea".into()));

        let sets = Sets::from_raw(raw_sets.clone(), false).unwrap();
        assert!(!sets.nodes.contains("NorthSea"));
        assert!(sets.excluded_nodes.contains("NorthSea"));
        assert_eq!(sets.arcs.len(), 1);

        let sets = Sets::from_raw(raw_sets, true).unwrap();
        assert!(sets.nodes.contains("NorthSea"));
        assert_eq!(sets.arcs.len(), 2);
        assert!(sets.offshore_nodes.contains("NorthSea"));
    }

    #[rstest]
    fn test_generator_without_technology(mut raw_sets: RawSets) {
        raw_sets.generators_of_technology.pop();
        assert_error!(
            Sets::from_raw(raw_sets, false),
            "Generator Solar at node NodeA has no technology"
        );
    }

    #[rstest]
    fn test_generator_with_two_technologies(mut raw_sets: RawSets) {
        raw_sets
            .generators_of_technology
            .push(("Gas".into(), "Solar".into()));
        assert!(Sets::from_raw(raw_sets, false).is_err());
    }

    #[rstest]
    fn test_unknown_node_in_link(mut raw_sets: RawSets) {
        raw_sets
            .directional_links
            .push(("NodeA".into(), "Atlantis".into()));
        assert_error!(Sets::from_raw(raw_sets, false), "Atlantis is not in Node");
    }

    #[rstest]
    fn test_duplicate_node(mut raw_sets: RawSets) {
        raw_sets.nodes.push("NodeA".into());
        assert!(Sets::from_raw(raw_sets, false).is_err());
    }
}
