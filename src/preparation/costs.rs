//! Investment cost annuities and marginal generation costs.
use super::{DEFAULT_LIFETIME, DEFAULT_STORAGE_LIFETIME, Parameters};
use crate::finance::{annualised_cost, remaining_life_factor};
use crate::input::ParamMap;
use crate::model::Model;
use crate::units::{
    Dimensionless, EmissionsPerFuel, MoneyPerEmissions, MoneyPerEnergy, MoneyPerFuel,
    MoneyPerPower, heat_rate,
};
use anyhow::{Result, bail};
use std::hash::Hash;

/// Costs given per kW (or kWh) are converted to per MW (or MWh)
const PER_KW_TO_PER_MW: f64 = 1000.0;

/// Whether a technology is fitted with carbon capture and storage
pub fn is_ccs_technology(technology: &str) -> bool {
    technology.contains("CCS")
}

/// Discounted cost over the remaining horizon of one unit of capacity built in `period`.
///
/// `annual = annuity(wacc, lifetime)·capital + fixed_om`, multiplied by the sum of discount
/// factors over the years the asset is alive within the horizon.
pub fn period_investment_cost(
    model: &Model,
    capital_cost: f64,
    fixed_om_cost: f64,
    lifetime: f64,
    period: u32,
) -> f64 {
    let config = &model.config;
    let annual = annualised_cost(
        MoneyPerPower(capital_cost),
        MoneyPerPower(fixed_om_cost),
        Dimensionless(config.wacc),
        lifetime,
    );
    let life_factor = remaining_life_factor(
        Dimensionless(config.discount_rate),
        config.leap_years_investment,
        config.num_periods(),
        period,
        lifetime,
    );

    (annual * life_factor).value()
}

fn get_or<K: Hash + Eq>(map: &ParamMap<K>, key: &K, default: f64) -> f64 {
    map.get(key).copied().unwrap_or(default)
}

/// Set lifetimes and the discounted investment costs of generators, transmission and storage
pub fn prepare_investment_costs(params: &mut Parameters, model: &Model) -> Result<()> {
    let sets = &model.sets;
    let data = &model.data;
    let general = &data.general;

    for (g, generator) in sets.generators.iter().enumerate() {
        let lifetime = get_or(&data.generator.lifetime, generator, DEFAULT_LIFETIME);
        params.gen_lifetime[g] = lifetime;
        let is_ccs = sets
            .technology_of_generator
            .get(generator)
            .is_some_and(|t| is_ccs_technology(t.as_str()));
        let co2_content = get_or(&data.generator.co2_content, generator, 0.0);

        for i in model.config.periods() {
            let key = (generator.clone(), i);
            let capital = get_or(&data.generator.capital_cost, &key, 0.0);
            let fixed_om = get_or(&data.generator.fixed_om_cost, &key, 0.0);
            let mut cost =
                PER_KW_TO_PER_MW * period_investment_cost(model, capital, fixed_om, lifetime, i);
            if is_ccs {
                let efficiency = get_or(&data.generator.efficiency, &key, 1.0);
                cost += general.ccs_ts_fixed_cost
                    * general.ccs_removal_fraction
                    * co2_content
                    * heat_rate(Dimensionless(efficiency)).value();
            }
            params.gen_inv_cost[[g, i as usize - 1]] = cost;
        }
    }

    for (a, arc) in sets.arcs.iter().enumerate() {
        let lifetime = get_or(&data.transmission.lifetime, arc, DEFAULT_LIFETIME);
        params.trans_lifetime[a] = lifetime;
        let length = get_or(&data.transmission.length, arc, 0.0);
        let Some(line_type) = sets.line_type_of_arc(a) else {
            bail!("No line type given for the link between {} and {}", arc.0, arc.1);
        };

        for i in model.config.periods() {
            let key = (line_type.clone(), i);
            let capital = get_or(&data.transmission.type_capital_cost, &key, 0.0);
            let fixed_om = get_or(&data.transmission.type_fixed_om_cost, &key, 0.0);
            params.trans_inv_cost[[a, i as usize - 1]] =
                length * period_investment_cost(model, capital, fixed_om, lifetime, i);
        }
    }

    let storage = &data.storage;
    for (b, id) in sets.storages.iter().enumerate() {
        let lifetime = get_or(&storage.lifetime, id, DEFAULT_STORAGE_LIFETIME);
        params.stor_lifetime[b] = lifetime;

        for i in model.config.periods() {
            let key = (id.clone(), i);
            let cost = |capital: &ParamMap<_>, fixed_om: &ParamMap<_>| {
                PER_KW_TO_PER_MW
                    * period_investment_cost(
                        model,
                        get_or(capital, &key, 0.0),
                        get_or(fixed_om, &key, 0.0),
                        lifetime,
                        i,
                    )
            };
            params.stor_pw_inv_cost[[b, i as usize - 1]] =
                cost(&storage.power_capital_cost, &storage.power_fixed_om_cost);
            params.stor_en_inv_cost[[b, i as usize - 1]] =
                cost(&storage.energy_capital_cost, &storage.energy_fixed_om_cost);
        }
    }

    Ok(())
}

/// Components of the marginal cost of a generator in one period
#[derive(Debug, Clone, Copy)]
pub struct MarginalCostInputs {
    /// Electrical efficiency
    pub efficiency: Dimensionless,
    /// Fuel cost (EUR/GJ)
    pub fuel_cost: MoneyPerFuel,
    /// CO₂ content of the fuel (t/GJ)
    pub co2_content: EmissionsPerFuel,
    /// CO₂ price (EUR/t)
    pub co2_price: MoneyPerEmissions,
    /// Variable O&M cost (EUR/MWh)
    pub variable_om_cost: MoneyPerEnergy,
}

/// CCS characteristics applied to the marginal cost
#[derive(Debug, Clone, Copy)]
pub struct CcsInputs {
    /// Share of CO₂ captured
    pub removal_fraction: Dimensionless,
    /// Variable transport and storage cost of captured CO₂ (EUR/t)
    pub ts_variable_cost: MoneyPerEmissions,
}

/// The marginal cost of generation.
///
/// Without CCS: `(3.6/η)·(fuel + CO2Factor·CO2price) + VOM`. With CCS the captured share of CO₂
/// pays the transport and storage cost instead of the CO₂ price.
pub fn marginal_cost(inputs: &MarginalCostInputs, ccs: Option<&CcsInputs>) -> MoneyPerEnergy {
    let heat_rate = heat_rate(inputs.efficiency);
    let emissions = inputs.co2_content * heat_rate;
    let fuel = inputs.fuel_cost * heat_rate;

    let carbon = match ccs {
        None => inputs.co2_price * emissions,
        Some(ccs) => {
            let emitted = emissions * (Dimensionless(1.0) - ccs.removal_fraction);
            let captured = emissions * ccs.removal_fraction;
            inputs.co2_price * emitted + ccs.ts_variable_cost * captured
        }
    };

    fuel + carbon + inputs.variable_om_cost
}

/// Set marginal costs and emission intensities of generators
pub fn prepare_marginal_costs(params: &mut Parameters, model: &Model) {
    let sets = &model.sets;
    let data = &model.data;

    for (g, generator) in sets.generators.iter().enumerate() {
        let is_ccs = sets
            .technology_of_generator
            .get(generator)
            .is_some_and(|t| is_ccs_technology(t.as_str()));
        let co2_content = EmissionsPerFuel(get_or(&data.generator.co2_content, generator, 0.0));
        let variable_om_cost =
            MoneyPerEnergy(get_or(&data.generator.variable_om_cost, generator, 0.0));

        for i in model.config.periods() {
            let key = (generator.clone(), i);
            // With a cap in place, emissions are limited directly rather than priced
            let co2_price = if model.config.use_emission_cap {
                0.0
            } else {
                get_or(&data.general.co2_price, &i, 0.0)
            };
            let inputs = MarginalCostInputs {
                efficiency: Dimensionless(get_or(&data.generator.efficiency, &key, 1.0)),
                fuel_cost: MoneyPerFuel(get_or(&data.generator.fuel_cost, &key, 0.0)),
                co2_content,
                co2_price: MoneyPerEmissions(co2_price),
                variable_om_cost,
            };
            let ccs = is_ccs.then(|| CcsInputs {
                removal_fraction: Dimensionless(data.general.ccs_removal_fraction),
                ts_variable_cost: MoneyPerEmissions(get_or(
                    &data.generator.ccs_ts_variable_cost,
                    &i,
                    0.0,
                )),
            });

            params.gen_marginal_cost[[g, i as usize - 1]] =
                marginal_cost(&inputs, ccs.as_ref()).value();
            params.gen_emission_intensity[[g, i as usize - 1]] =
                (co2_content * heat_rate(inputs.efficiency)).value();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn inputs(co2_price: f64) -> MarginalCostInputs {
        MarginalCostInputs {
            efficiency: Dimensionless(0.4),
            fuel_cost: MoneyPerFuel(5.0),
            co2_content: EmissionsPerFuel(0.1),
            co2_price: MoneyPerEmissions(co2_price),
            variable_om_cost: MoneyPerEnergy(2.0),
        }
    }

    #[rstest]
    #[case(0.0, 9.0 * 5.0 + 2.0)]
    #[case(50.0, 9.0 * (5.0 + 0.1 * 50.0) + 2.0)]
    fn test_marginal_cost(#[case] co2_price: f64, #[case] expected: f64) {
        assert_approx_eq!(
            f64,
            marginal_cost(&inputs(co2_price), None).value(),
            expected,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_marginal_cost_ccs() {
        let ccs = CcsInputs {
            removal_fraction: Dimensionless(0.9),
            ts_variable_cost: MoneyPerEmissions(10.0),
        };
        let expected = 9.0 * (5.0 + 0.1 * 0.1 * 50.0 + 0.9 * 0.1 * 10.0) + 2.0;
        assert_approx_eq!(
            f64,
            marginal_cost(&inputs(50.0), Some(&ccs)).value(),
            expected,
            epsilon = 1e-9
        );
    }

    #[rstest]
    #[case("GasCCS", true)]
    #[case("CoalCCSadv", true)]
    #[case("GasCCGT", false)]
    fn test_is_ccs_technology(#[case] technology: &str, #[case] expected: bool) {
        assert_eq!(is_ccs_technology(technology), expected);
    }
}
