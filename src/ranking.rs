use tracing::debug;

use crate::models::{KpiSet, Period, Ranking, RankingEntry};

/// Orders the stores of one period by revenue, highest first. Equal revenue
/// falls back to `store_id` ascending, so every store gets its own rank.
pub fn rank(records: &KpiSet, period: Period) -> Ranking {
    let mut rows: Vec<(&str, f64)> = records
        .values()
        .filter(|record| record.period == period)
        .map(|record| (record.store_id.as_str(), record.revenue))
        .collect();

    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let entries: Vec<RankingEntry> = rows
        .into_iter()
        .enumerate()
        .map(|(index, (store_id, revenue))| RankingEntry {
            rank: index + 1,
            store_id: store_id.to_string(),
            revenue,
            period,
        })
        .collect();

    debug!(%period, stores = entries.len(), "ranking built");
    Ranking { period, entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::fixtures::*;
    use crate::models::{Kpi, KpiRecord, PctOfTarget};

    fn record(store_id: &str, period: Period, revenue: f64) -> KpiRecord {
        KpiRecord {
            store_id: store_id.to_string(),
            period,
            revenue,
            distinct_products: 0,
            transactions: 0,
            average_ticket: 0.0,
            no_activity: revenue == 0.0,
            target_revenue: 1000.0,
            target_products: 4.0,
            target_ticket: 500.0,
            pct_of_target: PctOfTarget::default(),
        }
    }

    fn set(records: Vec<KpiRecord>) -> KpiSet {
        records
            .into_iter()
            .map(|r| ((r.store_id.clone(), r.period), r))
            .collect()
    }

    #[test]
    fn ties_break_by_store_id() {
        let records = engine()
            .compute(&scenario_sales(), &products(), &stores(), run_date())
            .unwrap();
        let ranking = rank(&records, Period::Daily);

        let order: Vec<(usize, &str)> = ranking
            .entries
            .iter()
            .map(|e| (e.rank, e.store_id.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "S01"), (2, "S02"), (3, "S03")]);

        let met: Vec<bool> = ranking
            .entries
            .iter()
            .map(|e| records[&(e.store_id.clone(), Period::Daily)].actual(Kpi::Revenue) >= 1000.0)
            .collect();
        assert_eq!(met, vec![true, true, false]);
    }

    #[test]
    fn only_requested_period_is_ranked() {
        let records = set(vec![
            record("A", Period::Daily, 10.0),
            record("B", Period::Ytd, 500.0),
            record("A", Period::Ytd, 100.0),
        ]);
        let ranking = rank(&records, Period::Daily);
        assert_eq!(ranking.len(), 1);
        assert!(ranking.entries.iter().all(|e| e.period == Period::Daily));
    }

    #[test]
    fn idle_store_ranks_last() {
        let records = set(vec![
            record("A", Period::Daily, 0.0),
            record("B", Period::Daily, 20.0),
            record("C", Period::Daily, 5.0),
        ]);
        let ranking = rank(&records, Period::Daily);
        let worst = ranking.worst().unwrap();
        assert_eq!(worst.store_id, "A");
        assert_eq!(worst.rank, 3);
        assert_eq!(ranking.best().unwrap().store_id, "B");
    }

    #[test]
    fn ranks_are_contiguous_and_revenue_non_increasing() {
        let records = set(vec![
            record("D", Period::Ytd, 300.0),
            record("A", Period::Ytd, 300.0),
            record("C", Period::Ytd, 900.0),
            record("B", Period::Ytd, 0.0),
            record("E", Period::Ytd, 300.0),
        ]);
        let ranking = rank(&records, Period::Ytd);

        let ranks: Vec<usize> = ranking.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
        for pair in ranking.entries.windows(2) {
            assert!(pair[0].revenue >= pair[1].revenue);
            if pair[0].revenue == pair[1].revenue {
                assert!(pair[0].store_id < pair[1].store_id);
            }
        }
    }

    #[test]
    fn worst_first_reverses_order() {
        let records = set(vec![
            record("A", Period::Daily, 1.0),
            record("B", Period::Daily, 2.0),
            record("C", Period::Daily, 3.0),
        ]);
        let ranking = rank(&records, Period::Daily);
        let worst: Vec<&str> = ranking.worst_first().map(|e| e.store_id.as_str()).collect();
        assert_eq!(worst, vec!["A", "B", "C"]);
    }

    #[test]
    fn ranking_is_repeatable() {
        let records = engine()
            .compute(&scenario_sales(), &products(), &stores(), run_date())
            .unwrap();
        assert_eq!(rank(&records, Period::Ytd), rank(&records, Period::Ytd));
    }

    #[test]
    fn empty_input_gives_empty_ranking() {
        let ranking = rank(&KpiSet::new(), Period::Daily);
        assert!(ranking.is_empty());
        assert!(ranking.best().is_none());
    }
}
