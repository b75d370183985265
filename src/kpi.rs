use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::models::{Kpi, KpiRecord, KpiSet, PctOfTarget, Period, Product, SaleRecord, Store};
use crate::targets::TargetRegistry;

/// Largest gap tolerated between a provided line revenue and quantity × unit price.
const RECONCILE_TOLERANCE: f64 = 0.005;

pub fn year_start(run_date: NaiveDate) -> NaiveDate {
    run_date - Duration::days(i64::from(run_date.ordinal0()))
}

pub fn ytd_window(run_date: NaiveDate) -> RangeInclusive<NaiveDate> {
    year_start(run_date)..=run_date
}

pub fn in_period(period: Period, date: NaiveDate, run_date: NaiveDate) -> bool {
    match period {
        Period::Daily => date == run_date,
        Period::Ytd => ytd_window(run_date).contains(&date),
    }
}

/// `actual / target`, or `None` when the target is zero.
pub fn pct_of(actual: f64, target: f64) -> Option<f64> {
    (target != 0.0).then(|| actual / target)
}

/// Total order over sale records, used to sum revenue in a fixed sequence
/// whatever order the rows arrive in.
fn canonical_order(a: &SaleRecord, b: &SaleRecord) -> Ordering {
    (&a.store_id, a.date, &a.sale_code, &a.product_id, a.quantity)
        .cmp(&(&b.store_id, b.date, &b.sale_code, &b.product_id, b.quantity))
        .then_with(|| a.line_revenue.total_cmp(&b.line_revenue))
}

#[derive(Debug, Default)]
struct Totals<'a> {
    revenue: f64,
    transactions: usize,
    products: BTreeSet<&'a str>,
}

#[derive(Debug, Clone)]
pub struct KpiEngine {
    targets: TargetRegistry,
}

impl KpiEngine {
    pub fn new(targets: TargetRegistry) -> Self {
        Self { targets }
    }

    /// Builds one record per store and period. Stores without sales in a
    /// window get a zeroed record flagged `no_activity`.
    pub fn compute(
        &self,
        sales: &[SaleRecord],
        products: &[Product],
        stores: &[Store],
        run_date: NaiveDate,
    ) -> Result<KpiSet, PipelineError> {
        validate_references(sales, products, stores)?;

        let mut totals: BTreeMap<(&str, Period), Totals> = BTreeMap::new();
        for store in stores {
            for period in Period::ALL {
                totals.insert((store.store_id.as_str(), period), Totals::default());
            }
        }

        let mut ordered: Vec<&SaleRecord> = sales.iter().collect();
        ordered.sort_by(|a, b| canonical_order(a, b));

        let mut in_window = 0usize;
        for sale in ordered {
            for period in Period::ALL {
                if !in_period(period, sale.date, run_date) {
                    continue;
                }
                if period == Period::Ytd {
                    in_window += 1;
                }
                if let Some(entry) = totals.get_mut(&(sale.store_id.as_str(), period)) {
                    entry.revenue += sale.line_revenue;
                    entry.transactions += 1;
                    entry.products.insert(sale.product_id.as_str());
                }
            }
        }

        let records: KpiSet = totals
            .into_iter()
            .map(|((store_id, period), totals)| {
                let record = self.record(store_id, period, &totals);
                debug!(
                    store_id,
                    %period,
                    revenue = record.revenue,
                    transactions = record.transactions,
                    no_activity = record.no_activity,
                    "computed kpis"
                );
                ((store_id.to_string(), period), record)
            })
            .collect();

        info!(
            %run_date,
            stores = stores.len(),
            sales_in_window = in_window,
            records = records.len(),
            "kpi computation finished"
        );
        Ok(records)
    }

    fn record(&self, store_id: &str, period: Period, totals: &Totals) -> KpiRecord {
        let revenue = totals.revenue;
        let distinct_products = totals.products.len();
        let no_activity = totals.transactions == 0;
        let average_ticket = if no_activity {
            0.0
        } else {
            revenue / totals.transactions as f64
        };

        let target_revenue = self.targets.value(Kpi::Revenue, period);
        let target_products = self.targets.value(Kpi::DistinctProducts, period);
        let target_ticket = self.targets.value(Kpi::AverageTicket, period);

        KpiRecord {
            store_id: store_id.to_string(),
            period,
            revenue,
            distinct_products,
            transactions: totals.transactions,
            average_ticket,
            no_activity,
            target_revenue,
            target_products,
            target_ticket,
            pct_of_target: PctOfTarget {
                revenue: pct_of(revenue, target_revenue),
                distinct_products: pct_of(distinct_products as f64, target_products),
                average_ticket: pct_of(average_ticket, target_ticket),
            },
        }
    }
}

/// Rejects any input that would make the KPIs untrustworthy.
pub fn validate_references(
    sales: &[SaleRecord],
    products: &[Product],
    stores: &[Store],
) -> Result<(), PipelineError> {
    if stores.is_empty() {
        return Err(PipelineError::integrity("store table is empty"));
    }
    if products.is_empty() {
        return Err(PipelineError::integrity("product table is empty"));
    }

    let mut store_ids = HashSet::new();
    for store in stores {
        if !store_ids.insert(store.store_id.as_str()) {
            return Err(PipelineError::integrity(format!(
                "duplicate store_id `{}`",
                store.store_id
            )));
        }
    }

    let mut prices: HashMap<&str, f64> = HashMap::new();
    for product in products {
        if !product.unit_price.is_finite() || product.unit_price <= 0.0 {
            return Err(PipelineError::integrity(format!(
                "product `{}` has non-positive unit price {}",
                product.product_id, product.unit_price
            )));
        }
        if prices
            .insert(product.product_id.as_str(), product.unit_price)
            .is_some()
        {
            return Err(PipelineError::integrity(format!(
                "duplicate product_id `{}`",
                product.product_id
            )));
        }
    }

    for sale in sales {
        if !store_ids.contains(sale.store_id.as_str()) {
            return Err(PipelineError::integrity(format!(
                "sale `{}` references unknown store `{}`",
                sale.sale_code, sale.store_id
            )));
        }
        let Some(unit_price) = prices.get(sale.product_id.as_str()) else {
            return Err(PipelineError::integrity(format!(
                "sale `{}` references unknown product `{}`",
                sale.sale_code, sale.product_id
            )));
        };
        if sale.quantity == 0 {
            return Err(PipelineError::integrity(format!(
                "sale `{}` has zero quantity",
                sale.sale_code
            )));
        }
        let expected = f64::from(sale.quantity) * unit_price;
        if !sale.line_revenue.is_finite()
            || (sale.line_revenue - expected).abs() > RECONCILE_TOLERANCE
        {
            return Err(PipelineError::integrity(format!(
                "sale `{}` line revenue {} does not match {} x {}",
                sale.sale_code, sale.line_revenue, sale.quantity, unit_price
            )));
        }
    }

    Ok(())
}
