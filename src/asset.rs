//! Capital assets on a utility's rate base, tracked by vintage.
//!
//! Every year's capital spend becomes its own vintage, depreciated straight-line over its own
//! lifetime starting in the year it is placed in service. Once a vintage's lifetime has elapsed it
//! stops contributing depreciation.
use crate::units::{Dimensionless, Money};
use strum::Display;

/// What a vintage of capital was spent on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AssetCategory {
    /// The rate base at the start of the analysis
    Existing,
    /// Routine investment unrelated to leak-prone pipe or NPAs
    Baseline,
    /// Leak-prone pipe replacement
    Pipeline,
    /// Capitalised NPA program costs
    Npa,
    /// Distribution grid upgrades for new peak demand
    GridUpgrade,
    /// The gas utility's performance incentive
    Incentive,
}

/// A single vintage of capital
#[derive(Debug, Clone, PartialEq)]
pub struct Vintage {
    /// What the capital was spent on
    pub category: AssetCategory,
    /// The year the vintage was placed in service
    pub commission_year: u32,
    /// The capitalised amount
    pub cost: Money,
    /// Depreciation lifetime in years
    pub lifetime: u32,
}

impl Vintage {
    /// The annual straight-line depreciation of this vintage
    pub fn annual_depreciation(&self) -> Money {
        self.cost / Dimensionless(self.lifetime as f64)
    }

    /// Whether the vintage is still depreciating in `year`
    pub fn is_depreciating(&self, year: u32) -> bool {
        year >= self.commission_year && year - self.commission_year < self.lifetime
    }

    /// Depreciation charged in `year`
    pub fn depreciation(&self, year: u32) -> Money {
        if self.is_depreciating(year) {
            self.annual_depreciation()
        } else {
            Money(0.0)
        }
    }

    /// Depreciation charged from the commission year up to and including `year`
    pub fn accumulated_depreciation(&self, year: u32) -> Money {
        if year < self.commission_year {
            return Money(0.0);
        }

        let years = (year - self.commission_year + 1).min(self.lifetime);
        self.annual_depreciation() * Dimensionless(years as f64)
    }

    /// Book value at the end of `year`
    pub fn book_value(&self, year: u32) -> Money {
        if year < self.commission_year {
            return Money(0.0);
        }

        self.cost - self.accumulated_depreciation(year)
    }
}

/// The capital vintages making up a utility's rate base
#[derive(Debug, Clone, Default)]
pub struct AssetPool {
    vintages: Vec<Vintage>,
}

impl AssetPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new vintage in service.
    ///
    /// Zero-cost additions are ignored.
    pub fn add(
        &mut self,
        category: AssetCategory,
        commission_year: u32,
        cost: Money,
        lifetime: u32,
    ) {
        if cost == Money(0.0) {
            return;
        }

        self.vintages.push(Vintage {
            category,
            commission_year,
            cost,
            lifetime,
        });
    }

    /// Total depreciation charged in `year`
    pub fn depreciation(&self, year: u32) -> Money {
        self.vintages.iter().map(|v| v.depreciation(year)).sum()
    }

    /// Total book value at the end of `year`
    pub fn book_value(&self, year: u32) -> Money {
        self.vintages.iter().map(|v| v.book_value(year)).sum()
    }

    /// Iterate over the vintages in the pool
    pub fn iter(&self) -> impl Iterator<Item = &Vintage> {
        self.vintages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(2024, 0.0)]
    #[case(2025, 25.0)]
    #[case(2028, 25.0)]
    #[case(2029, 0.0)]
    fn test_vintage_depreciation(#[case] year: u32, #[case] expected: f64) {
        let vintage = Vintage {
            category: AssetCategory::Pipeline,
            commission_year: 2025,
            cost: Money(100.0),
            lifetime: 4,
        };
        assert_eq!(vintage.depreciation(year), Money(expected));
    }

    #[test]
    fn test_accumulated_depreciation_never_exceeds_cost() {
        let vintage = Vintage {
            category: AssetCategory::Npa,
            commission_year: 2025,
            cost: Money(1000.0),
            lifetime: 3,
        };
        for year in 2020..2040 {
            assert!(vintage.accumulated_depreciation(year) <= vintage.cost);
            assert!(vintage.book_value(year) >= Money(0.0));
        }
        assert_approx_eq!(Money, vintage.accumulated_depreciation(2039), vintage.cost);
    }

    #[test]
    fn test_pool_totals() {
        let mut pool = AssetPool::new();
        pool.add(AssetCategory::Existing, 2025, Money(100.0), 10);
        pool.add(AssetCategory::GridUpgrade, 2026, Money(50.0), 5);
        pool.add(AssetCategory::Baseline, 2026, Money(0.0), 5);
        assert_eq!(pool.iter().count(), 2);

        assert_eq!(pool.depreciation(2025), Money(10.0));
        assert_eq!(pool.depreciation(2026), Money(20.0));
        assert_eq!(pool.book_value(2025), Money(90.0));
        assert_eq!(pool.book_value(2026), Money(120.0));
    }
}
