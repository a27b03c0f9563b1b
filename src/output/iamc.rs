//! Export of results in the IAMC time-series format.
//!
//! Each row gives one variable for one region with a column per period. Regions are the model's
//! nodes plus a `Europe` aggregate. Generator types are reported under standard IAMC labels
//! looked up in a taxonomy, which the run configuration can extend or override.
use super::summary::expected_production;
use crate::optimisation::Solution;
use crate::units::GJ_PER_MWH;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use itertools::iproduct;
use log::debug;
use std::fs;
use std::path::Path;

/// The folder, relative to the output directory, for the IAMC export
const IAMC_DIR_NAME: &str = "IAMC";

/// The output file name for the IAMC export
const IAMC_FILE_NAME: &str = "empire_iamc.csv";

/// The name of the aggregate region
const EUROPE: &str = "Europe";

/// Megatonnes per tonne
pub const MT_PER_T: f64 = 1e-6;

/// Exajoules per MWh (1 MWh = 3.6 GJ = 3.6·10⁻⁹ EJ)
pub const EJ_PER_MWH: f64 = 3.6e-9;

/// Gigawatts per megawatt
pub const GW_PER_MW: f64 = 1e-3;

/// 2010 US dollars per 2018 euro.
///
/// The 2018 average exchange rate (1.181 USD/EUR, ECB reference rate) deflated to 2010 with the
/// US GDP deflator (2010 = 100, 2018 = 110.4).
pub const USD2010_PER_EUR2018: f64 = 1.181 / 1.104;

/// Default mapping from generator names to IAMC technology labels
const DEFAULT_TAXONOMY: [(&str, &str); 30] = [
    ("Liginiteexisting", "Coal|Lignite|w/o CCS"),
    ("Lignite", "Coal|Lignite|w/o CCS"),
    ("LigniteCCSadv", "Coal|Lignite|w/ CCS"),
    ("Coalexisting", "Coal|Hard Coal|w/o CCS"),
    ("Coal", "Coal|Hard Coal|w/o CCS"),
    ("CoalCCSadv", "Coal|Hard Coal|w/ CCS"),
    ("Gasexisting", "Gas|CCGT|w/o CCS"),
    ("GasOCGT", "Gas|OCGT|w/o CCS"),
    ("GasCCGT", "Gas|CCGT|w/o CCS"),
    ("GasCCS", "Gas|CCGT|w/ CCS"),
    ("GasCCSadv", "Gas|CCGT|w/ CCS"),
    ("Oilexisting", "Oil|w/o CCS"),
    ("Nuclear", "Nuclear"),
    ("Wave", "Ocean"),
    ("Geo", "Geothermal"),
    ("Hydroregulated", "Hydro|Reservoir"),
    ("Hydrorun-of-the-river", "Hydro|Run of River"),
    ("Bioexisting", "Biomass|w/o CCS"),
    ("Bio10cofiringCoal", "Coal|Hard Coal|w/o CCS"),
    ("Bio10cofiringCoalCCS", "Coal|Hard Coal|w/ CCS"),
    ("Bio", "Biomass|w/o CCS"),
    ("BioCCS", "Biomass|w/ CCS"),
    ("Windonshore", "Wind|Onshore"),
    ("Windoffshore", "Wind|Offshore"),
    ("Windoffshoregrounded", "Wind|Offshore"),
    ("Windoffshorefloating", "Wind|Offshore"),
    ("Solar", "Solar|PV"),
    ("Solarexisting", "Solar|PV"),
    ("Waste", "Waste"),
    ("Gasexistingcogen", "Gas|CHP|w/o CCS"),
];

/// Maps generator names to IAMC technology labels
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy(IndexMap<String, String>);

impl Taxonomy {
    /// The default taxonomy with entries from the configuration added or replacing defaults
    pub fn new(overrides: &IndexMap<String, String>) -> Self {
        let mut labels: IndexMap<String, String> = DEFAULT_TAXONOMY
            .iter()
            .map(|(generator, label)| (generator.to_string(), label.to_string()))
            .collect();
        labels.extend(overrides.clone());

        Self(labels)
    }

    /// The label for a generator. Generators missing from the taxonomy keep their own name.
    pub fn label<'a>(&'a self, generator: &'a str) -> &'a str {
        match self.0.get(generator) {
            Some(label) => label,
            None => {
                debug!("No IAMC label for generator {generator}");
                generator
            }
        }
    }
}

/// The key of one IAMC row
type RowKey = (String, String, &'static str);

/// Accumulates values per region, variable and period
struct IamcTable {
    num_periods: usize,
    rows: IndexMap<RowKey, Vec<f64>>,
}

impl IamcTable {
    fn new(num_periods: usize) -> Self {
        Self {
            num_periods,
            rows: IndexMap::new(),
        }
    }

    /// Add a value to both the region's row and the European aggregate
    fn add(&mut self, region: &str, variable: &str, unit: &'static str, i: usize, value: f64) {
        for region in [region, EUROPE] {
            let row = self
                .rows
                .entry((region.to_string(), variable.to_string(), unit))
                .or_insert_with(|| vec![0.0; self.num_periods]);
            row[i] += value;
        }
    }

    /// Set the value of a single region's row
    fn set(&mut self, region: &str, variable: &str, unit: &'static str, i: usize, value: f64) {
        let row = self
            .rows
            .entry((region.to_string(), variable.to_string(), unit))
            .or_insert_with(|| vec![0.0; self.num_periods]);
        row[i] = value;
    }
}

/// Gather the IAMC variables from a solution
fn build_table(solution: &Solution, taxonomy: &Taxonomy) -> IamcTable {
    let model = solution.model();
    let sets = &model.sets;
    let params = solution.params();
    let vars = solution.variables();
    let dims = params.dims;
    let mut table = IamcTable::new(dims.periods);

    for (ng, i) in iproduct!(0..dims.node_generators, 0..dims.periods) {
        let (node, generator) = &sets.generators_of_node[ng];
        let g = sets.generator_of_ng(ng);
        let label = taxonomy.label(generator.as_str());
        let production = expected_production(solution, ng, i);

        table.add(
            node.as_str(),
            &format!("Capacity|Electricity|{label}"),
            "GW",
            i,
            solution.value(&vars.gen_installed, [ng, i]) * GW_PER_MW,
        );
        table.add(
            node.as_str(),
            &format!("Capacity Additions|Electricity|{label}"),
            "GW",
            i,
            solution.value(&vars.gen_inv, [ng, i]) * GW_PER_MW,
        );
        table.add(
            node.as_str(),
            &format!("Secondary Energy|Electricity|{label}"),
            "EJ/yr",
            i,
            production * EJ_PER_MWH,
        );
        table.add(
            node.as_str(),
            "Emissions|CO2|Energy|Supply|Electricity",
            "Mt CO2/yr",
            i,
            params.gen_emission_intensity[[g, i]] * production * MT_PER_T,
        );
    }

    for (nb, i) in iproduct!(0..dims.node_storages, 0..dims.periods) {
        let node = sets.nodes[sets.node_of_nb(nb)].as_str();
        table.add(
            node,
            "Capacity|Electricity|Storage Converter",
            "GW",
            i,
            solution.value(&vars.stor_pw_installed, [nb, i]) * GW_PER_MW,
        );
        table.add(
            node,
            "Capacity|Electricity|Storage Reservoir",
            "GWh",
            i,
            solution.value(&vars.stor_en_installed, [nb, i]) * GW_PER_MW,
        );
    }

    // Load-weighted average prices, per node and for the aggregate
    let mut weighted: IndexMap<(usize, usize), (f64, f64)> = IndexMap::new();
    for ((n, h, i, w), price) in solution.iter_prices() {
        let s = model.time_index.season_index_of_hour(h as u32 + 1);
        let load = params.season_scale[s] * params.scenario_probability[w] * params.load[[n, h, i, w]];
        for key in [(n, i), (dims.nodes, i)] {
            let (sum, total) = weighted.entry(key).or_default();
            *sum += price * load;
            *total += load;
        }
    }
    for ((n, i), (sum, total)) in weighted {
        if total <= 0.0 {
            continue;
        }
        let region = sets.nodes.get_index(n).map_or(EUROPE, |node| node.as_str());
        let price = sum / total * USD2010_PER_EUR2018 / GJ_PER_MWH;
        table.set(
            region,
            "Price|Secondary Energy|Electricity",
            "US$2010/GJ",
            i,
            price,
        );
    }

    table
}

/// Write results in IAMC format to `IAMC/empire_iamc.csv` in the output folder
pub fn write_iamc(output_dir: &Path, solution: &Solution) -> Result<()> {
    let config = &solution.model().config;
    let taxonomy = Taxonomy::new(&config.iamc.taxonomy);
    let table = build_table(solution, &taxonomy);

    let dir = output_dir.join(IAMC_DIR_NAME);
    fs::create_dir_all(&dir).with_context(|| format!("Could not create {}", dir.display()))?;
    let mut writer = csv::Writer::from_path(dir.join(IAMC_FILE_NAME))?;

    let mut header: Vec<String> = ["model", "scenario", "region", "variable", "unit"]
        .iter()
        .map(|col| col.to_string())
        .collect();
    header.extend(config.periods().map(|i| config.period_start_year(i).to_string()));
    writer.write_record(&header)?;

    for ((region, variable, unit), values) in &table.rows {
        let mut record = vec![
            config.iamc.model_name.clone(),
            config.iamc_scenario_name().to_string(),
            region.clone(),
            variable.clone(),
            unit.to_string(),
        ];
        record.extend(values.iter().map(ToString::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(())
}
