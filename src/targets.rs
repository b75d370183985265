use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::{Kpi, Period};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub annual: f64,
    pub daily: f64,
}

impl Target {
    pub const fn new(annual: f64, daily: f64) -> Self {
        Self { annual, daily }
    }

    pub fn for_period(&self, period: Period) -> f64 {
        match period {
            Period::Daily => self.daily,
            Period::Ytd => self.annual,
        }
    }
}

/// Goals per KPI for one run. Built once and handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetRegistry {
    pub revenue: Target,
    pub distinct_products: Target,
    pub average_ticket: Target,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self {
            revenue: Target::new(1_650_000.0, 1_000.0),
            distinct_products: Target::new(120.0, 4.0),
            average_ticket: Target::new(500.0, 500.0),
        }
    }
}

impl TargetRegistry {
    pub fn get(&self, kpi: Kpi) -> &Target {
        match kpi {
            Kpi::Revenue => &self.revenue,
            Kpi::DistinctProducts => &self.distinct_products,
            Kpi::AverageTicket => &self.average_ticket,
        }
    }

    pub fn value(&self, kpi: Kpi, period: Period) -> f64 {
        self.get(kpi).for_period(period)
    }

    /// Parses a TOML override. Tables left out keep their default goals.
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let registry: TargetRegistry = toml::from_str(input)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read targets from {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid targets file {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        for kpi in Kpi::ALL {
            for period in Period::ALL {
                let value = self.value(kpi, period);
                if !value.is_finite() || value < 0.0 {
                    anyhow::bail!(
                        "{} {} target must be a non-negative number, got {value}",
                        kpi.display_name(),
                        period.label()
                    );
                }
            }
        }
        Ok(())
    }
}
