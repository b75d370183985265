use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub store_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub unit_price: f64,
}

/// One sale line. A single record counts as one transaction for the
/// average-ticket KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale_code: String,
    pub store_id: String,
    pub product_id: String,
    pub date: NaiveDate,
    pub quantity: u32,
    pub line_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailContact {
    pub store_id: String,
    pub manager_name: String,
    pub email: String,
}

impl EmailContact {
    pub fn first_name(&self) -> &str {
        self.manager_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.manager_name)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Period {
    Daily,
    Ytd,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Daily, Period::Ytd];

    pub fn label(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Ytd => "ytd",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Daily => f.write_str("DAILY"),
            Period::Ytd => f.write_str("YTD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    Revenue,
    DistinctProducts,
    AverageTicket,
}

impl Kpi {
    pub const ALL: [Kpi; 3] = [Kpi::Revenue, Kpi::DistinctProducts, Kpi::AverageTicket];

    pub fn display_name(self) -> &'static str {
        match self {
            Kpi::Revenue => "Revenue",
            Kpi::DistinctProducts => "Distinct Products",
            Kpi::AverageTicket => "Avg Ticket",
        }
    }

    pub fn is_currency(self) -> bool {
        !matches!(self, Kpi::DistinctProducts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PctOfTarget {
    pub revenue: Option<f64>,
    pub distinct_products: Option<f64>,
    pub average_ticket: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub store_id: String,
    pub period: Period,
    pub revenue: f64,
    pub distinct_products: usize,
    pub transactions: usize,
    pub average_ticket: f64,
    pub no_activity: bool,
    pub target_revenue: f64,
    pub target_products: f64,
    pub target_ticket: f64,
    pub pct_of_target: PctOfTarget,
}

impl KpiRecord {
    pub fn actual(&self, kpi: Kpi) -> f64 {
        match kpi {
            Kpi::Revenue => self.revenue,
            Kpi::DistinctProducts => self.distinct_products as f64,
            Kpi::AverageTicket => self.average_ticket,
        }
    }

    pub fn target(&self, kpi: Kpi) -> f64 {
        match kpi {
            Kpi::Revenue => self.target_revenue,
            Kpi::DistinctProducts => self.target_products,
            Kpi::AverageTicket => self.target_ticket,
        }
    }

    pub fn pct(&self, kpi: Kpi) -> Option<f64> {
        match kpi {
            Kpi::Revenue => self.pct_of_target.revenue,
            Kpi::DistinctProducts => self.pct_of_target.distinct_products,
            Kpi::AverageTicket => self.pct_of_target.average_ticket,
        }
    }
}

/// KPI records keyed by store and period. Ordered so iteration is stable.
pub type KpiSet = BTreeMap<(String, Period), KpiRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub store_id: String,
    pub revenue: f64,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub period: Period,
    pub entries: Vec<RankingEntry>,
}

impl Ranking {
    pub fn best(&self) -> Option<&RankingEntry> {
        self.entries.first()
    }

    pub fn worst(&self) -> Option<&RankingEntry> {
        self.entries.last()
    }

    /// Worst performers first.
    pub fn worst_first(&self) -> impl Iterator<Item = &RankingEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Opaque reference to an artifact written by a backup sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRow {
    pub kpi: Kpi,
    pub period: Period,
    pub actual: f64,
    pub target: f64,
    pub pct_of_target: Option<f64>,
    pub met_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerReport {
    pub store_id: String,
    pub store_name: String,
    pub date: NaiveDate,
    pub kpi_table: Vec<KpiRow>,
    pub attachment_ref: ArtifactRef,
}

impl ManagerReport {
    pub fn rows(&self, period: Period) -> impl Iterator<Item = &KpiRow> {
        self.kpi_table.iter().filter(move |row| row.period == period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub store_id: String,
    pub store_name: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveReport {
    pub date: NaiveDate,
    pub daily_ranking: Ranking,
    pub ytd_ranking: Ranking,
    pub store_names: BTreeMap<String, String>,
    pub attachment_refs: Vec<ArtifactRef>,
}

impl ExecutiveReport {
    pub fn ranking(&self, period: Period) -> &Ranking {
        match period {
            Period::Daily => &self.daily_ranking,
            Period::Ytd => &self.ytd_ranking,
        }
    }

    pub fn store_name<'a>(&'a self, store_id: &'a str) -> &'a str {
        self.store_names
            .get(store_id)
            .map(String::as_str)
            .unwrap_or(store_id)
    }

    pub fn best(&self, period: Period) -> Option<Highlight> {
        self.ranking(period).best().map(|entry| self.highlight(entry))
    }

    pub fn worst(&self, period: Period) -> Option<Highlight> {
        self.ranking(period).worst().map(|entry| self.highlight(entry))
    }

    fn highlight(&self, entry: &RankingEntry) -> Highlight {
        Highlight {
            store_id: entry.store_id.clone(),
            store_name: self.store_name(&entry.store_id).to_string(),
            revenue: entry.revenue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPayload {
    Manager(ManagerReport),
    Executive(ExecutiveReport),
}
