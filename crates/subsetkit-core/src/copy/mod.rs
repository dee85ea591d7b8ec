//! # Copy Orchestration
//!
//! Drives a job through its states, strictly in sequence:
//!
//! ```text
//! Validating → [Dropping] → SettingUp → Sampling → Copying → Anonymizing
//!            → Transferring → [TearingDown] → Done
//! ```
//!
//! Any failure moves the job to `Failed` and returns the error. Validation
//! runs the sorter before anything is written, so a cyclic graph aborts with
//! no side effects. Every copy and transfer truncates its destination first,
//! which makes a rerun from scratch safe after a failure.

pub mod anonymize;
pub mod postgres;
pub mod report;
pub mod store;
pub mod transfer;

use std::fmt;

use crate::catalog::Catalog;
use crate::error::{Result, SubsetError};
use crate::filter::ConditionBuilder;
use crate::graph::dag::DependencyGraph;
use crate::graph::topo::{topological_sort, CopyOrder};
use crate::job::JobSpec;
use crate::sample::{KeySource, Sampler};
use crate::sql::qualified;

use self::report::{CopyReport, SampleReport, TableReport, TransferReport};
use self::store::{
    create_copy_table_sql, create_schema_sql, drop_schema_sql, insert_sql, truncate_table_sql,
    WorkingSchema,
};
use self::transfer::BulkTransfer;

/// Where a job is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Validating,
    Dropping,
    SettingUp,
    Sampling,
    Copying,
    Anonymizing,
    Transferring,
    TearingDown,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Validating => "validating",
            JobState::Dropping => "dropping working schema",
            JobState::SettingUp => "setting up",
            JobState::Sampling => "sampling",
            JobState::Copying => "copying",
            JobState::Anonymizing => "anonymizing",
            JobState::Transferring => "transferring",
            JobState::TearingDown => "tearing down",
            JobState::Done => "done",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The validated copy order: the sorted graph, followed by isolated tables
/// when the job copies them. Fails on a cycle.
pub fn resolve_order(
    job: &JobSpec,
    catalog: &Catalog,
    graph: &DependencyGraph,
) -> Result<CopyOrder> {
    let mut order = topological_sort(graph)?;
    if job.copy_isolated_tables {
        order.push_isolated(&graph.isolated(catalog.tables()));
    }
    tracing::info!(
        "Copy order ({} tables): {}",
        order.len(),
        order.tables.join(", ")
    );
    Ok(order)
}

/// Called on every state change, and per table within a state.
pub type Observer<'a> = &'a (dyn Fn(JobState, Option<&str>) + Send + Sync);

/// One run of a subsetting job.
pub struct CopyJob<'a, W, K, T> {
    job: &'a JobSpec,
    catalog: &'a Catalog,
    graph: DependencyGraph,
    store: &'a W,
    keys: &'a K,
    transfer: &'a T,
    state: JobState,
    observer: Option<Observer<'a>>,
}

impl<'a, W, K, T> CopyJob<'a, W, K, T>
where
    W: WorkingSchema,
    K: KeySource,
    T: BulkTransfer,
{
    pub fn new(
        job: &'a JobSpec,
        catalog: &'a Catalog,
        store: &'a W,
        keys: &'a K,
        transfer: &'a T,
    ) -> Self {
        Self {
            job,
            catalog,
            graph: DependencyGraph::from_catalog(catalog),
            store,
            keys,
            transfer,
            state: JobState::Pending,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Observer<'a>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Validate only: compute the copy order without touching any database.
    pub fn plan(&mut self) -> Result<CopyOrder> {
        let order = self.validate();
        if let Err(e) = &order {
            self.fail(e);
        }
        order
    }

    /// Run every state, start to finish.
    pub async fn run(&mut self) -> Result<CopyReport> {
        match self.run_states().await {
            Ok(report) => {
                self.enter(JobState::Done);
                Ok(report)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Transfer an already populated working schema to the target, without
    /// sampling or copying again.
    pub async fn transfer_only(&mut self) -> Result<Vec<TransferReport>> {
        let result = match self.validate() {
            Ok(order) => self.transfer_tables(&order).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(transfers) => {
                self.enter(JobState::Done);
                Ok(transfers)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn enter(&mut self, state: JobState) {
        tracing::info!("Job state: {} -> {}", self.state, state);
        self.state = state;
        self.notify(None);
    }

    fn fail(&mut self, error: &SubsetError) {
        tracing::error!("Job failed while {}: {}", self.state, error);
        self.state = JobState::Failed;
        self.notify(None);
    }

    fn notify(&self, table: Option<&str>) {
        if let Some(observer) = self.observer {
            observer(self.state, table);
        }
    }

    fn validate(&mut self) -> Result<CopyOrder> {
        self.enter(JobState::Validating);
        resolve_order(self.job, self.catalog, &self.graph)
    }

    async fn run_states(&mut self) -> Result<CopyReport> {
        let order = self.validate()?;

        if self.job.drop_schema {
            self.enter(JobState::Dropping);
            self.store
                .execute("(schema)", &drop_schema_sql(&self.job.working_schema))
                .await?;
        }

        self.enter(JobState::SettingUp);
        self.store
            .execute("(schema)", &create_schema_sql(&self.job.working_schema))
            .await?;

        self.enter(JobState::Sampling);
        let samples = self.sample_tables().await?;

        self.enter(JobState::Copying);
        let tables = self.copy_tables(&order).await?;

        self.enter(JobState::Anonymizing);
        let anonymized =
            anonymize::apply(self.store, &self.job.working_schema, &self.job.anonymize).await?;

        let transfers = self.transfer_tables(&order).await?;

        if self.job.drop_schema {
            self.enter(JobState::TearingDown);
            self.store
                .execute("(schema)", &drop_schema_sql(&self.job.working_schema))
                .await?;
        }

        Ok(CopyReport {
            order,
            samples,
            tables,
            anonymized,
            transfers,
        })
    }

    /// Read a table's max key from the source, only if its condition has a
    /// row window.
    async fn window_max_key(
        &self,
        builder: &ConditionBuilder<'_>,
        table: &str,
    ) -> Result<Option<i64>> {
        if builder.needs_max_key(table) {
            self.keys
                .max_key(table, self.job.primary_key_for(table))
                .await
        } else {
            Ok(None)
        }
    }

    async fn sample_tables(&self) -> Result<Vec<SampleReport>> {
        let builder = ConditionBuilder::new(&self.graph, self.job);
        let mut sampler = Sampler::new(self.keys, self.job.seed);
        let mut reports = Vec::new();

        for spec in self.job.samples() {
            self.notify(Some(spec.table.as_str()));
            let max_key = self.window_max_key(&builder, &spec.table).await?;
            let condition = builder.condition_clause(&spec.table, max_key);
            let keyset = sampler
                .materialize(
                    spec,
                    self.job.primary_key_for(&spec.table),
                    &self.job.keyset_table(&spec.table),
                    condition.as_deref(),
                )
                .await?;
            tracing::info!(
                "Sampled {}: {} of {} rows",
                keyset.table,
                keyset.size,
                keyset.target_size
            );
            reports.push(SampleReport {
                table: keyset.table,
                size: keyset.size,
                target_size: keyset.target_size,
                density: keyset.density,
            });
        }

        Ok(reports)
    }

    async fn copy_tables(&self, order: &CopyOrder) -> Result<Vec<TableReport>> {
        let builder = ConditionBuilder::new(&self.graph, self.job);
        let mut reports = Vec::with_capacity(order.len());

        for table in &order.tables {
            self.notify(Some(table.as_str()));
            let source = qualified(&self.job.source_schema, table);
            let copy = qualified(&self.job.working_schema, table);

            self.store
                .execute(table, &create_copy_table_sql(&copy, &source))
                .await?;
            let truncated = self.store.count_rows(table).await?;
            self.store.execute(table, &truncate_table_sql(&copy)).await?;

            let columns = self.store.table_columns(table).await?;
            if columns.is_empty() {
                return Err(SubsetError::UnknownTable {
                    table: table.clone(),
                    schema: self.job.working_schema.clone(),
                });
            }

            let max_key = self.window_max_key(&builder, table).await?;
            let filter = builder.build_where(table, max_key);
            let inserted = self
                .store
                .execute(table, &insert_sql(&copy, &source, &columns, filter.as_deref()))
                .await?;

            tracing::info!(
                "Copied {} rows into {} (truncated {})",
                inserted,
                copy,
                truncated
            );
            reports.push(TableReport {
                table: table.clone(),
                truncated,
                inserted,
            });
        }

        Ok(reports)
    }

    async fn transfer_tables(&mut self, order: &CopyOrder) -> Result<Vec<TransferReport>> {
        self.enter(JobState::Transferring);

        if let Some(sql) = &self.job.pre_copy_sql {
            tracing::info!("Running pre-copy statements");
            self.store.execute_script(sql).await?;
        }

        let mut reports = Vec::with_capacity(order.len());
        for table in &order.tables {
            self.notify(Some(table.as_str()));
            let columns = self.store.table_columns(table).await?;
            if columns.is_empty() {
                return Err(SubsetError::UnknownTable {
                    table: table.clone(),
                    schema: self.job.working_schema.clone(),
                });
            }
            reports.push(self.transfer.transfer(table, &columns).await?);
        }

        Ok(reports)
    }
}
