//! Unit newtypes for the physical and monetary quantities used by the planner.
//!
//! Power is in MW, energy in MWh, money in EUR and emissions in tonnes of CO₂ unless stated.

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            serde::Serialize,
            serde::Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from a f64 value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// The larger of two quantities
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                $name(iter.map(|x| x.0).sum())
            }
        }

        impl float_cmp::ApproxEq for $name {
            type Margin = float_cmp::F64Margin;

            fn approx_eq<T: Into<Self::Margin>>(self, other: Self, margin: T) -> bool {
                float_cmp::ApproxEq::approx_eq(self.0, other.0, margin)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

/// A dimensionless quantity (rates, fractions and factors).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    serde::Serialize,
    serde::Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Create a new dimensionless value
    pub const fn new(val: f64) -> Self {
        Self(val)
    }

    /// The underlying value
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Raise to an integer power
    pub fn powi(self, rhs: i32) -> Self {
        Self(self.0.powi(rhs))
    }

    /// Raise to a floating-point power
    pub fn powf(self, rhs: f64) -> Self {
        Self(self.0.powf(rhs))
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;
    fn mul(self, rhs: Dimensionless) -> Dimensionless {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;
    fn div(self, rhs: Dimensionless) -> Dimensionless {
        Dimensionless(self.0 / rhs.0)
    }
}

impl float_cmp::ApproxEq for Dimensionless {
    type Margin = float_cmp::F64Margin;

    fn approx_eq<T: Into<Self::Margin>>(self, other: Self, margin: T) -> bool {
        float_cmp::ApproxEq::approx_eq(self.0, other.0, margin)
    }
}

// Base quantities
unit_struct!(Money);
unit_struct!(Power);
unit_struct!(Energy);
unit_struct!(Hours);
unit_struct!(Emissions);
unit_struct!(Fuel);

// Derived quantities
unit_struct!(MoneyPerPower);
unit_struct!(MoneyPerEnergy);
unit_struct!(MoneyPerFuel);
unit_struct!(MoneyPerEmissions);
unit_struct!(FuelPerEnergy);
unit_struct!(EmissionsPerFuel);
unit_struct!(EmissionsPerEnergy);

impl_mul!(Power, Hours, Energy);
impl_mul!(MoneyPerPower, Power, Money);
impl_mul!(MoneyPerEnergy, Energy, Money);
impl_mul!(MoneyPerFuel, FuelPerEnergy, MoneyPerEnergy);
impl_mul!(MoneyPerEmissions, EmissionsPerEnergy, MoneyPerEnergy);
impl_mul!(EmissionsPerFuel, FuelPerEnergy, EmissionsPerEnergy);
impl_mul!(EmissionsPerEnergy, Energy, Emissions);

impl_div!(Money, Power, MoneyPerPower);
impl_div!(Money, Energy, MoneyPerEnergy);
impl_div!(Energy, Hours, Power);
impl_div!(Emissions, Energy, EmissionsPerEnergy);

/// GJ of primary fuel per MWh of electricity at 100% efficiency
pub const GJ_PER_MWH: f64 = 3.6;

/// Fuel input per unit of electricity output for a plant with the given efficiency
pub fn heat_rate(efficiency: Dimensionless) -> FuelPerEnergy {
    FuelPerEnergy(GJ_PER_MWH / efficiency.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_heat_rate() {
        assert_approx_eq!(FuelPerEnergy, heat_rate(Dimensionless(0.4)), FuelPerEnergy(9.0));
    }

    #[test]
    fn test_emissions_chain() {
        // 0.1 t/GJ at 50% efficiency over 10 MWh
        let rate = EmissionsPerFuel(0.1) * heat_rate(Dimensionless(0.5));
        assert_approx_eq!(Emissions, rate * Energy(10.0), Emissions(7.2));
    }

    #[test]
    fn test_power_times_hours() {
        assert_eq!(Power(100.0) * Hours(24.0), Energy(2400.0));
        assert_eq!(Energy(2400.0) / Hours(24.0), Power(100.0));
    }
}
