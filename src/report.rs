use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::PipelineError;
use crate::models::{
    ArtifactRef, ExecutiveReport, Kpi, KpiRecord, KpiRow, ManagerReport, Period, Ranking, Store,
};

/// `met_target` is decided on the ratio when there is one, so a value exactly
/// at target counts as met.
pub fn kpi_row(record: &KpiRecord, kpi: Kpi) -> KpiRow {
    let actual = record.actual(kpi);
    let target = record.target(kpi);
    let pct_of_target = record.pct(kpi);
    let met_target = match pct_of_target {
        Some(pct) => pct >= 1.0,
        None => actual >= target,
    };

    KpiRow {
        kpi,
        period: record.period,
        actual,
        target,
        pct_of_target,
        met_target,
    }
}

/// Builds report payloads from computed records. Holds the store table so
/// each artifact can resolve names; a failed lookup only fails that artifact.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    stores: BTreeMap<String, Store>,
}

impl ReportAssembler {
    pub fn new(stores: &[Store]) -> Self {
        Self {
            stores: stores
                .iter()
                .map(|store| (store.store_id.clone(), store.clone()))
                .collect(),
        }
    }

    pub fn store(&self, store_id: &str) -> Result<&Store, PipelineError> {
        self.stores
            .get(store_id)
            .ok_or_else(|| PipelineError::missing_store(store_id))
    }

    pub fn build_manager_report(
        &self,
        store_id: &str,
        daily_kpi: &KpiRecord,
        ytd_kpi: &KpiRecord,
        run_date: NaiveDate,
        attachment_ref: ArtifactRef,
    ) -> Result<ManagerReport, PipelineError> {
        let store = self.store(store_id)?;

        for (record, period) in [(daily_kpi, Period::Daily), (ytd_kpi, Period::Ytd)] {
            if record.store_id != store_id || record.period != period {
                return Err(PipelineError::MissingReferenceData {
                    kind: "kpi record",
                    key: format!("{store_id}/{period}"),
                });
            }
        }

        let kpi_table = [daily_kpi, ytd_kpi]
            .into_iter()
            .flat_map(|record| Kpi::ALL.into_iter().map(move |kpi| kpi_row(record, kpi)))
            .collect();

        Ok(ManagerReport {
            store_id: store.store_id.clone(),
            store_name: store.name.clone(),
            date: run_date,
            kpi_table,
            attachment_ref,
        })
    }

    pub fn build_executive_report(
        &self,
        daily_ranking: &Ranking,
        ytd_ranking: &Ranking,
        run_date: NaiveDate,
        attachment_refs: Vec<ArtifactRef>,
    ) -> Result<ExecutiveReport, PipelineError> {
        let mut store_names = BTreeMap::new();
        for entry in daily_ranking.entries.iter().chain(&ytd_ranking.entries) {
            let store = self.store(&entry.store_id)?;
            store_names.insert(store.store_id.clone(), store.name.clone());
        }

        Ok(ExecutiveReport {
            date: run_date,
            daily_ranking: daily_ranking.clone(),
            ytd_ranking: ytd_ranking.clone(),
            store_names,
            attachment_refs,
        })
    }
}
