use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{PipelineError, SinkError};
use crate::kpi::{ytd_window, KpiEngine};
use crate::loader::{Tables, BOARD_STORE_ID};
use crate::models::{
    ArtifactRef, EmailContact, ExecutiveReport, KpiRecord, KpiSet, ManagerReport, Period, Product,
    Ranking, ReportPayload, SaleRecord, Store,
};
use crate::ranking::rank;
use crate::render::{render_executive_report, render_manager_report};
use crate::report::ReportAssembler;
use crate::sink::{BackupSink, ExtractRow, MailSink, OutgoingMail, RankingRow};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub run_date: NaiveDate,
    pub email_from: String,
    pub sink_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Succeeded { reference: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactOutcome {
    pub artifact: String,
    pub store_id: Option<String>,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

impl ArtifactOutcome {
    fn succeeded(
        artifact: String,
        store_id: Option<&str>,
        reference: Option<&ArtifactRef>,
    ) -> Self {
        Self {
            artifact,
            store_id: store_id.map(str::to_string),
            status: ArtifactStatus::Succeeded {
                reference: reference.map(|r| r.to_string()),
            },
        }
    }

    fn failed(artifact: String, store_id: Option<&str>, reason: impl ToString) -> Self {
        Self {
            artifact,
            store_id: store_id.map(str::to_string),
            status: ArtifactStatus::Failed {
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ArtifactStatus::Failed { .. })
    }
}

/// Per-artifact result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub artifacts: Vec<ArtifactOutcome>,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.artifacts.iter().filter(|outcome| outcome.is_failed())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failed_stores(&self) -> BTreeSet<&str> {
        self.failures()
            .filter_map(|outcome| outcome.store_id.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub kpis: KpiSet,
    pub daily_ranking: Ranking,
    pub ytd_ranking: Ranking,
    pub payloads: Vec<ReportPayload>,
    pub summary: RunSummary,
}

/// Year-to-date sales lines of one store, shaped for the backup extract.
pub fn store_extract(
    store: &Store,
    sales: &[SaleRecord],
    products: &[Product],
    run_date: NaiveDate,
) -> Vec<ExtractRow> {
    let catalog: HashMap<&str, &Product> = products
        .iter()
        .map(|product| (product.product_id.as_str(), product))
        .collect();
    let window = ytd_window(run_date);

    sales
        .iter()
        .filter(|sale| sale.store_id == store.store_id && window.contains(&sale.date))
        .filter_map(|sale| {
            let product = catalog.get(sale.product_id.as_str())?;
            Some(ExtractRow {
                sale_code: sale.sale_code.clone(),
                date: sale.date.format("%Y/%m/%d").to_string(),
                product_name: product.name.clone(),
                store_name: store.name.clone(),
                quantity: sale.quantity,
                unit_price: product.unit_price,
            })
        })
        .collect()
}

pub fn ranking_rows(ranking: &Ranking, stores: &[Store]) -> Vec<RankingRow> {
    let names: HashMap<&str, &str> = stores
        .iter()
        .map(|store| (store.store_id.as_str(), store.name.as_str()))
        .collect();

    ranking
        .entries
        .iter()
        .map(|entry| RankingRow {
            rank: entry.rank,
            store_id: entry.store_id.clone(),
            store_name: names
                .get(entry.store_id.as_str())
                .copied()
                .unwrap_or(entry.store_id.as_str())
                .to_string(),
            revenue: entry.revenue,
        })
        .collect()
}

/// Runs a blocking sink call off the async workers with a deadline.
async fn call_sink<T, F>(operation: String, timeout: Duration, call: F) -> Result<T, SinkError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SinkError> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(SinkError::Aborted {
            operation,
            reason: join_error.to_string(),
        }),
        Err(_) => Err(SinkError::Timeout {
            operation,
            seconds: timeout.as_secs(),
        }),
    }
}

struct RunContext {
    config: RunConfig,
    tables: Tables,
    kpis: KpiSet,
    assembler: ReportAssembler,
    backup: Arc<dyn BackupSink>,
    mail: Arc<dyn MailSink>,
}

impl RunContext {
    fn kpi(&self, store_id: &str, period: Period) -> Result<&KpiRecord, PipelineError> {
        self.kpis
            .get(&(store_id.to_string(), period))
            .ok_or_else(|| PipelineError::MissingReferenceData {
                kind: "kpi record",
                key: format!("{store_id}/{period}"),
            })
    }

    async fn send(
        &self,
        to: &str,
        subject: String,
        body: String,
        attachments: Vec<ArtifactRef>,
    ) -> Result<(), SinkError> {
        let mail = OutgoingMail {
            from: self.config.email_from.clone(),
            to: to.to_string(),
            subject,
            body,
            attachments,
        };
        let sink = Arc::clone(&self.mail);
        call_sink(format!("mail to {to}"), self.config.sink_timeout, move || {
            sink.send(&mail)
        })
        .await
    }
}

async fn assemble_manager(
    ctx: &RunContext,
    store_id: &str,
) -> Result<ManagerReport, PipelineError> {
    let store = ctx.assembler.store(store_id)?.clone();
    let daily = ctx.kpi(&store.store_id, Period::Daily)?;
    let ytd = ctx.kpi(&store.store_id, Period::Ytd)?;

    let run_date = ctx.config.run_date;
    let rows = store_extract(&store, &ctx.tables.sales, &ctx.tables.products, run_date);
    let backup = Arc::clone(&ctx.backup);
    let extract_store = store.clone();
    let reference = call_sink(
        format!("backup of {}", store.store_id),
        ctx.config.sink_timeout,
        move || backup.save_store_extract(&extract_store, &rows, run_date),
    )
    .await?;

    ctx.assembler
        .build_manager_report(&store.store_id, daily, ytd, run_date, reference)
}

/// Backs up and assembles one store's one-pager, then mails it to every
/// directory contact of that store.
async fn manager_artifact(
    ctx: Arc<RunContext>,
    store_id: String,
    contacts: Vec<EmailContact>,
) -> (ArtifactOutcome, Option<ManagerReport>) {
    let artifact = format!("manager_report:{store_id}");

    let report = match assemble_manager(&ctx, &store_id).await {
        Ok(report) => report,
        Err(err) => {
            error!(%store_id, error = %err, "manager report skipped");
            return (ArtifactOutcome::failed(artifact, Some(&store_id), err), None);
        }
    };

    if contacts.is_empty() {
        let err = PipelineError::MissingReferenceData {
            kind: "recipient",
            key: store_id.clone(),
        };
        error!(%store_id, error = %err, "manager report not delivered");
        return (ArtifactOutcome::failed(artifact, Some(&store_id), err), Some(report));
    }

    let mut undelivered = Vec::new();
    for contact in &contacts {
        let rendered = render_manager_report(&report, contact.first_name());
        let sent = ctx
            .send(
                &contact.email,
                rendered.subject,
                rendered.body,
                vec![report.attachment_ref.clone()],
            )
            .await;
        match sent {
            Ok(()) => info!(%store_id, to = %contact.email, "manager report sent"),
            Err(err) => {
                error!(%store_id, error = %err, "manager report not delivered");
                undelivered.push(err.to_string());
            }
        }
    }

    let outcome = if undelivered.is_empty() {
        ArtifactOutcome::succeeded(artifact, Some(&store_id), Some(&report.attachment_ref))
    } else {
        ArtifactOutcome::failed(artifact, Some(&store_id), undelivered.join("; "))
    };
    (outcome, Some(report))
}

pub struct Pipeline {
    engine: KpiEngine,
    backup: Arc<dyn BackupSink>,
    mail: Arc<dyn MailSink>,
    config: RunConfig,
}

impl Pipeline {
    pub fn new(
        engine: KpiEngine,
        backup: Arc<dyn BackupSink>,
        mail: Arc<dyn MailSink>,
        config: RunConfig,
    ) -> Self {
        Self {
            engine,
            backup,
            mail,
            config,
        }
    }

    /// Computes, backs up, assembles and dispatches every artifact for the
    /// configured run date. Integrity errors abort before any output; all
    /// other failures are recorded per artifact.
    pub async fn run(&self, tables: Tables) -> Result<RunOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let run_date = self.config.run_date;
        let span = info_span!("run", %run_id, %run_date);

        async move {
            let kpis = self.engine.compute(
                &tables.sales,
                &tables.products,
                &tables.stores,
                run_date,
            )?;
            let daily_ranking = rank(&kpis, Period::Daily);
            let ytd_ranking = rank(&kpis, Period::Ytd);

            let ctx = Arc::new(RunContext {
                config: self.config.clone(),
                assembler: ReportAssembler::new(&tables.stores),
                kpis,
                tables,
                backup: Arc::clone(&self.backup),
                mail: Arc::clone(&self.mail),
            });

            let mut artifacts = Vec::new();
            let mut payloads = Vec::new();

            // Every reference store gets a one-pager; directory rows for
            // unknown stores still get an outcome so the gap is reported.
            let mut recipients: BTreeMap<String, Vec<EmailContact>> = ctx
                .tables
                .stores
                .iter()
                .map(|store| (store.store_id.clone(), Vec::new()))
                .collect();
            for contact in ctx.tables.manager_contacts() {
                let entry = recipients.entry(contact.store_id.clone()).or_default();
                if !entry.is_empty() {
                    warn!(store_id = %contact.store_id, email = %contact.email, "additional manager contact");
                }
                entry.push(contact.clone());
            }

            let mut tasks = JoinSet::new();
            for (store_id, contacts) in recipients {
                tasks.spawn(
                    manager_artifact(Arc::clone(&ctx), store_id, contacts).in_current_span(),
                );
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((outcome, report)) => {
                        artifacts.push(outcome);
                        if let Some(report) = report {
                            payloads.push(ReportPayload::Manager(report));
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "manager report task failed");
                        artifacts.push(ArtifactOutcome::failed(
                            "manager_report".to_string(),
                            None,
                            err,
                        ));
                    }
                }
            }

            let (executive, mut executive_outcomes) =
                self.executive_artifact(&ctx, &daily_ranking, &ytd_ranking).await;
            artifacts.append(&mut executive_outcomes);
            if let Some(report) = executive {
                payloads.push(ReportPayload::Executive(report));
            }

            artifacts.sort_by(|a, b| a.artifact.cmp(&b.artifact));
            payloads.sort_by_key(|payload| match payload {
                ReportPayload::Manager(report) => (0, report.store_id.clone()),
                ReportPayload::Executive(_) => (1, String::new()),
            });

            let summary = RunSummary {
                run_id,
                run_date,
                artifacts,
            };
            info!(
                artifacts = summary.artifacts.len(),
                failed = summary.failures().count(),
                "run finished"
            );

            Ok(RunOutput {
                kpis: ctx.kpis.clone(),
                daily_ranking,
                ytd_ranking,
                payloads,
                summary,
            })
        }
        .instrument(span)
        .await
    }

    async fn executive_artifact(
        &self,
        ctx: &RunContext,
        daily_ranking: &Ranking,
        ytd_ranking: &Ranking,
    ) -> (Option<ExecutiveReport>, Vec<ArtifactOutcome>) {
        let run_date = ctx.config.run_date;
        let mut outcomes = Vec::new();
        let mut references = Vec::new();

        for ranking in [daily_ranking, ytd_ranking] {
            let artifact = format!("ranking_backup:{}", ranking.period.label());
            let rows = ranking_rows(ranking, &ctx.tables.stores);
            let backup = Arc::clone(&ctx.backup);
            let period = ranking.period;
            let saved = call_sink(artifact.clone(), ctx.config.sink_timeout, move || {
                backup.save_ranking(period, &rows, run_date)
            })
            .await;

            match saved {
                Ok(reference) => {
                    outcomes.push(ArtifactOutcome::succeeded(artifact, None, Some(&reference)));
                    references.push(reference);
                }
                Err(err) => {
                    error!(%period, error = %err, "ranking backup failed");
                    outcomes.push(ArtifactOutcome::failed(artifact, None, err));
                }
            }
        }

        let artifact = "executive_report".to_string();
        let report = match ctx.assembler.build_executive_report(
            daily_ranking,
            ytd_ranking,
            run_date,
            references,
        ) {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "executive report skipped");
                outcomes.push(ArtifactOutcome::failed(artifact, None, err));
                return (None, outcomes);
            }
        };

        let Some(board) = ctx.tables.board_contact() else {
            let err = PipelineError::MissingReferenceData {
                kind: "recipient",
                key: BOARD_STORE_ID.to_string(),
            };
            error!(error = %err, "executive report not delivered");
            outcomes.push(ArtifactOutcome::failed(artifact, None, err));
            return (Some(report), outcomes);
        };

        let rendered = render_executive_report(&report);
        match ctx
            .send(
                &board.email,
                rendered.subject,
                rendered.body,
                report.attachment_refs.clone(),
            )
            .await
        {
            Ok(()) => {
                info!(to = %board.email, "executive report sent");
                outcomes.push(ArtifactOutcome::succeeded(artifact, None, None));
            }
            Err(err) => {
                error!(error = %err, "executive report not delivered");
                outcomes.push(ArtifactOutcome::failed(artifact, None, err));
            }
        }
        (Some(report), outcomes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::kpi::fixtures::*;
    use crate::targets::TargetRegistry;

    #[derive(Default)]
    struct MemoryBackup {
        saved: Mutex<Vec<String>>,
        fail_store: Option<String>,
    }

    impl BackupSink for MemoryBackup {
        fn save_store_extract(
            &self,
            store: &Store,
            rows: &[ExtractRow],
            _run_date: NaiveDate,
        ) -> Result<ArtifactRef, SinkError> {
            if self.fail_store.as_deref() == Some(store.store_id.as_str()) {
                return Err(SinkError::Backup {
                    artifact: store.store_id.clone(),
                    reason: "disk full".to_string(),
                });
            }
            let name = format!("{}:{}", store.store_id, rows.len());
            self.saved.lock().unwrap().push(name.clone());
            Ok(ArtifactRef::new(name))
        }

        fn save_ranking(
            &self,
            period: Period,
            rows: &[RankingRow],
            _run_date: NaiveDate,
        ) -> Result<ArtifactRef, SinkError> {
            let name = format!("{}:{}", period.label(), rows.len());
            self.saved.lock().unwrap().push(name.clone());
            Ok(ArtifactRef::new(name))
        }
    }

    #[derive(Default)]
    struct MemoryMail {
        sent: Mutex<Vec<OutgoingMail>>,
        reject: Option<String>,
        delay: Option<Duration>,
    }

    impl MailSink for MemoryMail {
        fn send(&self, mail: &OutgoingMail) -> Result<(), SinkError> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if self.reject.as_deref() == Some(mail.to.as_str()) {
                return Err(SinkError::Mail {
                    recipient: mail.to.clone(),
                    reason: "mailbox unavailable".to_string(),
                });
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    fn contact(store_id: &str, name: &str, email: &str) -> EmailContact {
        EmailContact {
            store_id: store_id.to_string(),
            manager_name: name.to_string(),
            email: email.to_string(),
        }
    }

    fn tables() -> Tables {
        Tables {
            stores: stores(),
            products: products(),
            sales: scenario_sales(),
            directory: vec![
                contact("S01", "Dana Reyes", "dana@example.com"),
                contact("S02", "Omar Haddad", "omar@example.com"),
                contact("S03", "Lee Park", "lee@example.com"),
                contact(BOARD_STORE_ID, "Board", "board@example.com"),
            ],
        }
    }

    fn pipeline(backup: Arc<MemoryBackup>, mail: Arc<MemoryMail>, timeout: Duration) -> Pipeline {
        Pipeline::new(
            KpiEngine::new(TargetRegistry::default()),
            backup,
            mail,
            RunConfig {
                run_date: run_date(),
                email_from: "reports@example.com".to_string(),
                sink_timeout: timeout,
            },
        )
    }

    #[tokio::test]
    async fn full_run_sends_every_report() {
        let backup = Arc::new(MemoryBackup::default());
        let mail = Arc::new(MemoryMail::default());
        let output = pipeline(backup.clone(), mail.clone(), Duration::from_secs(5))
            .run(tables())
            .await
            .unwrap();

        assert!(output.summary.is_success());
        assert_eq!(output.summary.artifacts.len(), 6);
        assert_eq!(output.payloads.len(), 4);
        assert!(matches!(output.payloads.last(), Some(ReportPayload::Executive(_))));

        let sent = mail.sent.lock().unwrap();
        assert_eq!(sent.len(), 4);
        let board = sent.iter().find(|m| m.to == "board@example.com").unwrap();
        assert_eq!(board.attachments.len(), 2);
        assert!(sent.iter().all(|m| m.from == "reports@example.com"));

        let saved = backup.saved.lock().unwrap();
        // S01 has three ytd lines, S02 one, S03 two.
        assert!(saved.contains(&"S01:3".to_string()));
        assert!(saved.contains(&"S03:2".to_string()));
        assert!(saved.contains(&"daily:3".to_string()));
    }

    #[tokio::test]
    async fn one_store_failure_does_not_stop_others() {
        let backup = Arc::new(MemoryBackup {
            fail_store: Some("S02".to_string()),
            ..Default::default()
        });
        let mail = Arc::new(MemoryMail {
            reject: Some("lee@example.com".to_string()),
            ..Default::default()
        });
        let output = pipeline(backup, mail.clone(), Duration::from_secs(5))
            .run(tables())
            .await
            .unwrap();

        assert!(!output.summary.is_success());
        let failed: Vec<&str> = output.summary.failed_stores().into_iter().collect();
        assert_eq!(failed, vec!["S02", "S03"]);

        let sent = mail.sent.lock().unwrap();
        assert!(sent.iter().any(|m| m.to == "dana@example.com"));
        assert!(sent.iter().any(|m| m.to == "board@example.com"));
    }

    #[tokio::test]
    async fn contact_for_unknown_store_is_isolated() {
        let mut tables = tables();
        tables
            .directory
            .push(contact("S77", "Ghost", "ghost@example.com"));
        let output = pipeline(
            Arc::new(MemoryBackup::default()),
            Arc::new(MemoryMail::default()),
            Duration::from_secs(5),
        )
        .run(tables)
        .await
        .unwrap();

        let failures: Vec<&ArtifactOutcome> = output.summary.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].store_id.as_deref(), Some("S77"));
        assert!(matches!(
            &failures[0].status,
            ArtifactStatus::Failed { reason } if reason.contains("missing reference data")
        ));
    }

    #[tokio::test]
    async fn store_without_contact_is_backed_up_and_reported_failed() {
        let mut tables = tables();
        tables.directory.retain(|c| c.store_id != "S02");
        let backup = Arc::new(MemoryBackup::default());
        let mail = Arc::new(MemoryMail::default());
        let output = pipeline(backup.clone(), mail.clone(), Duration::from_secs(5))
            .run(tables)
            .await
            .unwrap();

        assert!(!output.summary.is_success());
        let failed: Vec<&str> = output.summary.failed_stores().into_iter().collect();
        assert_eq!(failed, vec!["S02"]);
        let outcome = output
            .summary
            .artifacts
            .iter()
            .find(|outcome| outcome.artifact == "manager_report:S02")
            .unwrap();
        assert!(matches!(
            &outcome.status,
            ArtifactStatus::Failed { reason } if reason.contains("recipient")
        ));

        assert!(output.payloads.iter().any(|payload| matches!(
            payload,
            ReportPayload::Manager(report) if report.store_id == "S02"
        )));
        assert!(backup.saved.lock().unwrap().contains(&"S02:1".to_string()));
        assert_eq!(mail.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn repeated_contacts_share_one_store_artifact() {
        let mut tables = tables();
        tables
            .directory
            .push(contact("S01", "Sam Ortiz", "sam@example.com"));
        let backup = Arc::new(MemoryBackup::default());
        let mail = Arc::new(MemoryMail::default());
        let output = pipeline(backup.clone(), mail.clone(), Duration::from_secs(5))
            .run(tables)
            .await
            .unwrap();

        assert!(output.summary.is_success());
        let s01_outcomes = output
            .summary
            .artifacts
            .iter()
            .filter(|outcome| outcome.artifact == "manager_report:S01")
            .count();
        assert_eq!(s01_outcomes, 1);
        assert_eq!(output.payloads.len(), 4);

        let saved = backup.saved.lock().unwrap();
        assert_eq!(saved.iter().filter(|name| name.starts_with("S01:")).count(), 1);

        let sent = mail.sent.lock().unwrap();
        let recipients: BTreeSet<&str> = sent
            .iter()
            .filter(|m| m.subject.ends_with("Downtown"))
            .map(|m| m.to.as_str())
            .collect();
        assert_eq!(recipients, BTreeSet::from(["dana@example.com", "sam@example.com"]));
    }

    #[tokio::test]
    async fn integrity_error_aborts_before_any_output() {
        let mut tables = tables();
        tables.sales.push(SaleRecord {
            sale_code: "BAD".to_string(),
            store_id: "S01".to_string(),
            product_id: "P404".to_string(),
            date: run_date(),
            quantity: 1,
            line_revenue: 1.0,
        });
        let backup = Arc::new(MemoryBackup::default());
        let mail = Arc::new(MemoryMail::default());
        let result = pipeline(backup.clone(), mail.clone(), Duration::from_secs(5))
            .run(tables)
            .await;

        assert!(matches!(result, Err(PipelineError::DataIntegrity(_))));
        assert!(backup.saved.lock().unwrap().is_empty());
        assert!(mail.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_mail_sink_times_out() {
        let mail = Arc::new(MemoryMail {
            delay: Some(Duration::from_millis(300)),
            ..Default::default()
        });
        let output = pipeline(
            Arc::new(MemoryBackup::default()),
            mail,
            Duration::from_millis(20),
        )
        .run(tables())
        .await
        .unwrap();

        let failures: Vec<&ArtifactOutcome> = output.summary.failures().collect();
        assert_eq!(failures.len(), 4);
        assert!(failures.iter().all(|outcome| matches!(
            &outcome.status,
            ArtifactStatus::Failed { reason } if reason.contains("timed out")
        )));
        assert_eq!(output.payloads.len(), 4);
    }

    #[tokio::test]
    async fn missing_board_contact_fails_executive_only() {
        let mut tables = tables();
        tables.directory.retain(|c| c.store_id != BOARD_STORE_ID);
        let output = pipeline(
            Arc::new(MemoryBackup::default()),
            Arc::new(MemoryMail::default()),
            Duration::from_secs(5),
        )
        .run(tables)
        .await
        .unwrap();

        let failures: Vec<&str> = output
            .summary
            .failures()
            .map(|outcome| outcome.artifact.as_str())
            .collect();
        assert_eq!(failures, vec!["executive_report"]);
    }

    #[test]
    fn extract_covers_ytd_window_only() {
        let mut sales = scenario_sales();
        sales.push(sale("OLD", "S01", "P1", date(2023, 12, 31), 1));
        let store = &stores()[0];
        let rows = store_extract(store, &sales, &products(), run_date());
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.store_name == "Downtown"));
        assert!(rows.iter().any(|row| row.date == "2024/03/15"));
    }

    #[test]
    fn summary_serializes_status_inline() {
        let outcome =
            ArtifactOutcome::failed("manager_report:S01".to_string(), Some("S01"), "boom");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
        assert_eq!(json["store_id"], "S01");
    }
}
