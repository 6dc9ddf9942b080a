//! Emulator service
//!
//! The core the server frontend drives: validates structural
//! preconditions, resolves the namespace, and dispatches admin and data
//! requests onto the registry and the mutation/read engines. Engine
//! errors pass through to the response unchanged: failures here reflect
//! malformed requests or absent resources, never transient conditions,
//! so nothing is retried.

use std::sync::Arc;

use bytes::Bytes;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TabletError};
use crate::mutation::{Mutation, MutationEngine};
use crate::protocol::{Request, Response, RowBlock};
use crate::read::filter::RowFilter;
use crate::read::{ReadEngine, RowSet, RowStream, SampleKey};
use crate::store::{GcRule, InstanceKey, Registry};

/// The emulator: all in-memory state plus the engines operating on it.
/// Dropping it releases every table of every namespace.
pub struct Emulator {
    registry: Registry,
    mutations: MutationEngine,
    reads: ReadEngine,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator {
    /// Emulator on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Emulator on an injected clock; tests use this for deterministic
    /// server-assigned timestamps and GC ages.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Registry::new(),
            mutations: MutationEngine::new(clock.clone()),
            reads: ReadEngine::new(clock),
        }
    }

    // =========================================================================
    // Admin operations
    // =========================================================================

    pub fn create_table(&self, ns: &InstanceKey, table: &str) -> Result<()> {
        check_table_name(table)?;
        self.registry.instance(ns).create_table(table)?;
        tracing::info!(namespace = %ns, table, "created table");
        Ok(())
    }

    pub fn delete_table(&self, ns: &InstanceKey, table: &str) -> Result<()> {
        check_table_name(table)?;
        self.registry.instance(ns).delete_table(table)?;
        tracing::info!(namespace = %ns, table, "deleted table");
        Ok(())
    }

    pub fn list_tables(&self, ns: &InstanceKey) -> Vec<String> {
        self.registry.instance(ns).list_tables()
    }

    pub fn create_column_family(
        &self,
        ns: &InstanceKey,
        table: &str,
        family: &str,
        rule: GcRule,
    ) -> Result<()> {
        check_table_name(table)?;
        check_family_name(family)?;
        let table = self.registry.instance(ns).get_table(table)?;
        table.create_family(family, rule)?;
        tracing::debug!(namespace = %ns, table = table.name(), family, "created column family");
        Ok(())
    }

    pub fn update_column_family(
        &self,
        ns: &InstanceKey,
        table: &str,
        family: &str,
        rule: GcRule,
    ) -> Result<()> {
        check_table_name(table)?;
        check_family_name(family)?;
        self.registry
            .instance(ns)
            .get_table(table)?
            .update_family(family, rule)
    }

    pub fn delete_column_family(&self, ns: &InstanceKey, table: &str, family: &str) -> Result<()> {
        check_table_name(table)?;
        check_family_name(family)?;
        self.registry
            .instance(ns)
            .get_table(table)?
            .delete_family(family)
    }

    pub fn drop_row_range(
        &self,
        ns: &InstanceKey,
        table: &str,
        prefix: Option<&[u8]>,
    ) -> Result<()> {
        check_table_name(table)?;
        self.registry
            .instance(ns)
            .get_table(table)?
            .drop_row_range(prefix);
        Ok(())
    }

    // =========================================================================
    // Data operations
    // =========================================================================

    pub fn apply(
        &self,
        ns: &InstanceKey,
        table: &str,
        row_key: &[u8],
        mutations: &[Mutation],
    ) -> Result<()> {
        check_table_name(table)?;
        check_row_key(row_key)?;
        let table = self.registry.instance(ns).get_table(table)?;
        self.mutations
            .apply(&table, &Bytes::copy_from_slice(row_key), mutations)
    }

    pub fn check_and_mutate(
        &self,
        ns: &InstanceKey,
        table: &str,
        row_key: &[u8],
        predicate: &RowFilter,
        true_mutations: &[Mutation],
        false_mutations: &[Mutation],
    ) -> Result<bool> {
        check_table_name(table)?;
        check_row_key(row_key)?;
        let table = self.registry.instance(ns).get_table(table)?;
        self.mutations.check_and_mutate(
            &table,
            &Bytes::copy_from_slice(row_key),
            predicate,
            true_mutations,
            false_mutations,
        )
    }

    pub fn read_rows(
        &self,
        ns: &InstanceKey,
        table: &str,
        rows: &RowSet,
        filter: Option<&RowFilter>,
        limit: u64,
    ) -> Result<RowStream> {
        check_table_name(table)?;
        let table = self.registry.instance(ns).get_table(table)?;
        self.reads.read_rows(table, rows, filter, limit)
    }

    pub fn sample_row_keys(&self, ns: &InstanceKey, table: &str) -> Result<Vec<SampleKey>> {
        check_table_name(table)?;
        let table = self.registry.instance(ns).get_table(table)?;
        Ok(self.reads.sample_row_keys(&table))
    }

    // =========================================================================
    // Protocol dispatch
    // =========================================================================

    /// Execute one decoded request against a namespace. `Hello` is a
    /// connection-level request and never reaches here.
    pub fn execute(&self, ns: &InstanceKey, request: Request) -> Response {
        let result = match request {
            Request::Hello { .. } => Err(TabletError::Protocol(
                "hello is only valid as the first request".to_string(),
            )),
            Request::Ping => return Response::Pong,
            Request::CreateTable { table } => self.create_table(ns, &table).map(|_| Response::Ok),
            Request::DeleteTable { table } => self.delete_table(ns, &table).map(|_| Response::Ok),
            Request::ListTables => Ok(Response::Tables {
                names: self.list_tables(ns),
            }),
            Request::CreateColumnFamily { table, family, rule } => self
                .create_column_family(ns, &table, &family, rule)
                .map(|_| Response::Ok),
            Request::UpdateColumnFamily { table, family, rule } => self
                .update_column_family(ns, &table, &family, rule)
                .map(|_| Response::Ok),
            Request::DeleteColumnFamily { table, family } => self
                .delete_column_family(ns, &table, &family)
                .map(|_| Response::Ok),
            Request::DropRowRange { table, prefix } => self
                .drop_row_range(ns, &table, prefix.as_deref())
                .map(|_| Response::Ok),
            Request::Apply {
                table,
                row_key,
                mutations,
            } => self
                .apply(ns, &table, &row_key, &mutations)
                .map(|_| Response::Ok),
            Request::CheckAndMutate {
                table,
                row_key,
                predicate,
                true_mutations,
                false_mutations,
            } => self
                .check_and_mutate(
                    ns,
                    &table,
                    &row_key,
                    &predicate,
                    &true_mutations,
                    &false_mutations,
                )
                .map(|matched| Response::Predicate { matched }),
            Request::ReadRows {
                table,
                rows,
                filter,
                limit,
            } => self
                .read_rows(ns, &table, &rows, filter.as_ref(), limit)
                .map(|stream| Response::Rows {
                    rows: stream.map(RowBlock::from).collect(),
                }),
            Request::SampleRowKeys { table } => self
                .sample_row_keys(ns, &table)
                .map(|samples| Response::Samples { samples }),
        };

        match result {
            Ok(response) => response,
            Err(err) => Response::error(&err),
        }
    }
}

// =============================================================================
// Structural validation
// =============================================================================

fn check_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TabletError::InvalidArgument(
            "table name must be non-empty".to_string(),
        ));
    }
    Ok(())
}

/// Family names are restricted to the portable identifier charset.
fn check_family_name(name: &str) -> Result<()> {
    let well_formed = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !well_formed {
        return Err(TabletError::InvalidArgument(format!(
            "malformed column family name {:?}",
            name
        )));
    }
    Ok(())
}

fn check_row_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(TabletError::InvalidArgument(
            "row key must be non-empty".to_string(),
        ));
    }
    Ok(())
}
