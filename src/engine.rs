//! The utility financial engine.
//!
//! For one utility under one scenario, the engine rolls the rate base forward year by year, adding
//! each year's capital spend as a new vintage and charging depreciation on every vintage still
//! within its lifetime. The revenue requirement and volumetric tariff follow from the rate base.
use crate::asset::{AssetCategory, AssetPool};
use crate::finance::{capital_revenue_requirements, net_present_value, to_real_dollars};
use crate::params::{InputParams, SavingsBasis, WebParams};
use crate::scenario::{Scenario, ScenarioRun, Treatment, Utility};
use crate::time_series::{TimeSeriesParams, YearInputs};
use crate::units::{Dimensionless, Energy, KWH_PER_THERM, Money, MoneyPerEnergy, Power};
use crate::warning::ModelWarning;
use anyhow::{Context, Result};
use log::{debug, trace};

/// The financial state of a utility at the end of one year
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialYear {
    /// The calendar year
    pub year: u32,
    /// Capital placed in service this year, excluding baseline growth
    pub capital_additions: Money,
    /// Baseline (non-NPA, non-LPP) capital placed in service this year
    pub growth_term: Money,
    /// Depreciation charged this year
    pub depreciation_expense: Money,
    /// Rate base at the end of the year
    pub ratebase: Money,
    /// Leak-prone pipe replacement capitalised this year (gas only)
    pub lpp_spend: Money,
    /// NPA program cost carried by this utility this year, whether capitalised or expensed
    pub npa_spend: Money,
    /// Grid upgrade capital placed in service this year (electric only)
    pub grid_upgrade_spend: Money,
    /// Performance incentive capitalised this year (gas only)
    pub performance_incentive: Money,
    /// NPA costs expensed this year
    pub opex_additions: Money,
    /// Maintenance charged on the rate base
    pub maintenance_cost: Money,
    /// Fixed overhead costs
    pub fixed_overhead_costs: Money,
    /// Return earned on the rate base
    pub return_on_ratebase: Money,
    /// Total revenue the utility must recover this year
    pub revenue_requirement: Money,
    /// Revenue requirement in start-year dollars
    pub inflation_adjusted_revenue_requirement: Money,
    /// Rate base in start-year dollars
    pub inflation_adjusted_ratebase: Money,
    /// Number of customers
    pub num_users: u64,
    /// Total volumetric sales (therms for gas, kWh for electric)
    pub volumetric_sales: Energy,
    /// Revenue recovered through fixed charges
    pub fixed_charge_revenue: Money,
    /// Per-unit charge recovering the rest of the revenue requirement
    pub variable_tariff: MoneyPerEnergy,
    /// Share of the revenue requirement which is return on the rate base
    pub return_on_ratebase_pct: Dimensionless,
}

/// The results of running one utility under one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyFinancials {
    /// The utility
    pub utility: Utility,
    /// The scenario
    pub scenario: Scenario,
    /// One entry per year, in order
    pub years: Vec<FinancialYear>,
    /// Recoverable problems encountered
    pub warnings: Vec<ModelWarning>,
}

/// Capital and operating spend for one year, before recovery
#[derive(Debug, Default)]
struct YearSpend {
    /// New vintages: category, cost and lifetime
    additions: Vec<(AssetCategory, Money, u32)>,
    growth: Money,
    growth_lifetime: u32,
    lpp: Money,
    npa: Money,
    grid_upgrade: Money,
    incentive: Money,
    opex: Money,
    overheads: Money,
}

impl YearSpend {
    fn capital_additions(&self) -> Money {
        self.additions.iter().map(|(_, cost, _)| *cost).sum()
    }

    /// Carry the NPA program cost with the given treatment
    fn carry_npa(&mut self, treatment: Treatment, cost: Money, lifetime: u32) {
        self.npa = cost;
        match treatment {
            Treatment::Capex => self.additions.push((AssetCategory::Npa, cost, lifetime)),
            Treatment::Opex => self.opex += cost,
        }
    }
}

/// Rolls one utility's books forward under one scenario
struct Ledger<'a> {
    utility: Utility,
    run: &'a ScenarioRun,
    input: &'a InputParams,
    web: &'a WebParams,
    pool: AssetPool,
    ratebase: Money,
    /// Peak demand above grid headroom as of the previous year
    excess_peak: Power,
    warnings: Vec<ModelWarning>,
}

impl<'a> Ledger<'a> {
    fn new(
        utility: Utility,
        run: &'a ScenarioRun,
        input: &'a InputParams,
        web: &'a WebParams,
    ) -> Self {
        let (ratebase_init, lifetime) = match utility {
            Utility::Gas => (input.gas.ratebase_init, input.gas.default_depreciation_lifetime),
            Utility::Electric => (
                input.electric.ratebase_init,
                input.electric.default_depreciation_lifetime,
            ),
        };

        let mut pool = AssetPool::new();
        pool.add(AssetCategory::Existing, run.start_year, ratebase_init, lifetime);

        Self {
            utility,
            run,
            input,
            web,
            pool,
            ratebase: ratebase_init,
            excess_peak: Power(0.0),
            warnings: Vec::new(),
        }
    }

    /// Households converted by NPAs and by scattershot electrification so far in this scenario
    fn cumulative_converts(&self, year: &YearInputs) -> (u64, u64) {
        let npa = if self.run.scenario.has_npa() {
            year.cumulative_npa_converts
        } else {
            0
        };

        (npa, year.cumulative_scattershot_converts)
    }

    /// How this utility carries NPA costs in this scenario, if it carries them at all
    fn npa_treatment(&self) -> Option<Treatment> {
        if self.run.utility() != Some(self.utility) {
            return None;
        }

        Some(
            self.run
                .treatment()
                .unwrap_or(self.input.incentive.npa_cost_treatment),
        )
    }

    fn npa_cost(&self, year: &YearInputs) -> Money {
        if self.run.scenario.has_npa() {
            year.npa_cost_per_user() * Dimensionless(year.npa_converts as f64)
        } else {
            Money(0.0)
        }
    }

    fn gas_spend(&mut self, year: &YearInputs) -> YearSpend {
        let gas = &self.input.gas;
        let shared = &self.input.shared;
        let mut spend = YearSpend {
            growth: gas.ratebase_init
                * gas.baseline_non_lpp_ratebase_growth
                * year.construction_escalation,
            growth_lifetime: gas.non_lpp_depreciation_lifetime,
            overheads: year.gas_fixed_overhead_costs,
            ..YearSpend::default()
        };

        // Targeted NPAs let the utility skip replacing the pipe serving converted households
        let lpp_bau = year.gas_bau_lpp_costs;
        let mut lpp = lpp_bau;
        if self.run.scenario.has_npa() && !self.web.is_scattershot {
            let avoided = year.pipe_value_per_user * Dimensionless(year.npa_converts as f64);
            if avoided > lpp_bau {
                self.warnings.push(ModelWarning::AvoidedPipeExceedsSpend {
                    scenario: self.run.scenario,
                    year: year.year,
                    avoided,
                    lpp: lpp_bau,
                });
            }
            lpp = (lpp_bau - avoided).max(Money(0.0));
        }
        spend.lpp = lpp;
        spend.additions.push((
            AssetCategory::Pipeline,
            lpp,
            gas.pipeline_depreciation_lifetime,
        ));

        let npa_cost = self.npa_cost(year);
        if let Some(treatment) = self.npa_treatment() {
            spend.carry_npa(treatment, npa_cost, shared.npa_lifetime);
        }

        if self.run.scenario == Scenario::PerformanceIncentive {
            let incentive = self.performance_incentive(lpp_bau - lpp, npa_cost);
            spend.incentive = incentive;
            spend.additions.push((
                AssetCategory::Incentive,
                incentive,
                self.input.incentive.recovery_lifetime(shared),
            ));
        }

        spend
    }

    /// The incentive earned on this year's cohort of NPA projects
    fn performance_incentive(&self, avoided_capital: Money, npa_cost: Money) -> Money {
        let gas = &self.input.gas;
        let shared = &self.input.shared;
        let savings = match self.input.incentive.savings_basis {
            SavingsBasis::RevenueRequirement => net_present_value(
                capital_revenue_requirements(
                    avoided_capital,
                    gas.pipeline_depreciation_lifetime,
                    gas.ror,
                    gas.pipeline_maintenance_cost_pct,
                ),
                shared.npv_discount_rate,
            ),
            SavingsBasis::CapitalCost => avoided_capital,
        };

        (savings - npa_cost).max(Money(0.0)) * shared.performance_incentive_pct
    }

    fn electric_spend(&mut self, year: &YearInputs) -> YearSpend {
        let electric = &self.input.electric;
        let mut spend = YearSpend {
            growth: electric.ratebase_init
                * electric.baseline_non_npa_ratebase_growth
                * year.construction_escalation,
            growth_lifetime: electric.default_depreciation_lifetime,
            overheads: year.electric_fixed_overhead_costs,
            ..YearSpend::default()
        };

        // Peak demand from every electrified household, above what the grid can already carry
        let (npa, scattershot) = self.cumulative_converts(year);
        let households = Dimensionless((npa + scattershot) as f64);
        let winter_peak = households * electric.hp_peak_kw;
        let summer_peak = households
            * electric.aircon_peak_kw
            * (Dimensionless(1.0) - self.web.aircon_percent_adoption_pre_npa);
        let excess_peak = (winter_peak - self.web.peak_kw_winter_headroom)
            .max(summer_peak - self.web.peak_kw_summer_headroom)
            .max(Power(0.0));
        let new_peak = (excess_peak - self.excess_peak).max(Power(0.0));
        self.excess_peak = self.excess_peak.max(excess_peak);

        spend.grid_upgrade = year.distribution_cost_per_peak_kw * new_peak;
        spend.additions.push((
            AssetCategory::GridUpgrade,
            spend.grid_upgrade,
            electric.grid_upgrade_depreciation_lifetime,
        ));

        if let Some(treatment) = self.npa_treatment() {
            spend.carry_npa(treatment, self.npa_cost(year), self.input.shared.npa_lifetime);
        }

        spend
    }

    /// Customers and total volumetric sales for the year
    fn sales(&self, year: &YearInputs) -> (u64, Energy) {
        let gas = &self.input.gas;
        let (npa, scattershot) = self.cumulative_converts(year);
        match self.utility {
            Utility::Gas => {
                let users = gas.num_users_init.saturating_sub(npa + scattershot);
                let per_user =
                    gas.per_user_heating_need_therms + gas.per_user_water_heating_need_therms;
                (users, per_user * Dimensionless(users as f64))
            }
            Utility::Electric => {
                let electric = &self.input.electric;
                let users = electric.num_users_init;
                let base = electric.per_user_electric_need_kwh * Dimensionless(users as f64);
                let added = electrified_load_kwh(self.input)
                    * Dimensionless((npa + scattershot) as f64);
                (users, base + added)
            }
        }
    }

    fn step(&mut self, year: &YearInputs) -> FinancialYear {
        let spend = match self.utility {
            Utility::Gas => self.gas_spend(year),
            Utility::Electric => self.electric_spend(year),
        };

        for (category, cost, lifetime) in &spend.additions {
            self.pool.add(*category, year.year, *cost, *lifetime);
        }
        self.pool.add(
            AssetCategory::Baseline,
            year.year,
            spend.growth,
            spend.growth_lifetime,
        );

        let capital_additions = spend.capital_additions();
        let depreciation_expense = self.pool.depreciation(year.year);
        let mut ratebase = self.ratebase + capital_additions + spend.growth - depreciation_expense;
        if ratebase < Money(0.0) {
            self.warnings.push(ModelWarning::NegativeRatebase {
                scenario: self.run.scenario,
                utility: self.utility,
                year: year.year,
                value: ratebase,
            });
            ratebase = Money(0.0);
        }
        self.ratebase = ratebase;

        let (ror, maintenance_pct, fixed_charge) = match self.utility {
            Utility::Gas => (
                self.input.gas.ror,
                self.input.gas.pipeline_maintenance_cost_pct,
                self.input.gas.user_bill_fixed_charge,
            ),
            Utility::Electric => (
                self.input.electric.ror,
                self.input.electric.electric_maintenance_cost_pct,
                self.input.electric.user_bill_fixed_charge,
            ),
        };
        let return_on_ratebase = ratebase * ror;
        let maintenance_cost = ratebase * maintenance_pct;
        let revenue_requirement = return_on_ratebase
            + depreciation_expense
            + maintenance_cost
            + spend.overheads
            + spend.opex;

        let (num_users, volumetric_sales) = self.sales(year);
        let fixed_charge_revenue = fixed_charge * Dimensionless(num_users as f64);
        let variable_tariff = self.variable_tariff(
            year.year,
            revenue_requirement - fixed_charge_revenue,
            volumetric_sales,
        );
        let return_on_ratebase_pct = if revenue_requirement == Money(0.0) {
            Dimensionless(0.0)
        } else {
            return_on_ratebase / revenue_requirement
        };

        let real = |value| {
            to_real_dollars(
                value,
                year.year,
                self.run.start_year,
                self.input.shared.real_dollar_discount_rate,
            )
        };

        trace!(
            "{} {} {}: rate base {ratebase}, depreciation {depreciation_expense}, \
            revenue requirement {revenue_requirement}",
            self.run.scenario, self.utility, year.year
        );

        FinancialYear {
            year: year.year,
            capital_additions,
            growth_term: spend.growth,
            depreciation_expense,
            ratebase,
            lpp_spend: spend.lpp,
            npa_spend: spend.npa,
            grid_upgrade_spend: spend.grid_upgrade,
            performance_incentive: spend.incentive,
            opex_additions: spend.opex,
            maintenance_cost,
            fixed_overhead_costs: spend.overheads,
            return_on_ratebase,
            revenue_requirement,
            inflation_adjusted_revenue_requirement: real(revenue_requirement),
            inflation_adjusted_ratebase: real(ratebase),
            num_users,
            volumetric_sales,
            fixed_charge_revenue,
            variable_tariff,
            return_on_ratebase_pct,
        }
    }

    /// The per-unit charge needed to recover `to_recover` over `sales`, floored at zero
    fn variable_tariff(&mut self, year: u32, to_recover: Money, sales: Energy) -> MoneyPerEnergy {
        if sales <= Energy(0.0) {
            self.warnings.push(ModelWarning::NoVolumetricSales {
                scenario: self.run.scenario,
                utility: self.utility,
                year,
            });
            return MoneyPerEnergy(0.0);
        }

        let tariff = to_recover / sales;
        if tariff < MoneyPerEnergy(0.0) {
            self.warnings.push(ModelWarning::NegativeTariff {
                scenario: self.run.scenario,
                utility: self.utility,
                year,
                tariff,
            });
            return MoneyPerEnergy(0.0);
        }

        tariff
    }
}

/// The extra electricity used by one electrified household each year, in kWh
pub fn electrified_load_kwh(input: &InputParams) -> Energy {
    let gas = &input.gas;
    let electric = &input.electric;
    let therms = gas.per_user_heating_need_therms / electric.hp_efficiency
        + gas.per_user_water_heating_need_therms / electric.water_heater_efficiency;

    therms * Dimensionless(KWH_PER_THERM)
}

/// Run the financial engine for one utility under one scenario.
///
/// # Arguments
///
/// * `utility` - The utility to model
/// * `input` - Utility and shared assumptions
/// * `web` - NPA program sizing
/// * `ts` - Year-indexed inputs covering every year of `run`
/// * `run` - The scenario and analysis years
///
/// # Returns
///
/// One entry per year of `run`, or an error if `ts` does not cover the run's years.
pub fn run_scenario(
    utility: Utility,
    input: &InputParams,
    web: &WebParams,
    ts: &TimeSeriesParams,
    run: &ScenarioRun,
) -> Result<YearlyFinancials> {
    debug!(
        "Running {} scenario for {utility} utility ({}-{})",
        run.scenario,
        run.start_year,
        run.end_year - 1
    );

    let mut ledger = Ledger::new(utility, run, input, web);
    let years = run
        .years()
        .map(|year| {
            let inputs = ts
                .get(year)
                .with_context(|| format!("No time-series inputs for year {year}"))?;
            Ok(ledger.step(inputs))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(YearlyFinancials {
        utility,
        scenario: run.scenario,
        years,
        warnings: ledger.warnings,
    })
}
