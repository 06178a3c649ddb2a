// crates/bulk-ingest-core/src/runtime/importer.rs
// ============================================================================
// Module: Bulk Ingest Importer
// Description: Applies validated rows under insert, update, or upsert.
// Purpose: Turn one validated batch into a single store transaction.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The importer opens one write transaction per call, builds uniqueness
//! indexes from the rows present at that moment, and applies rows in batch
//! order. Conflicts are recorded per row and never abort the call; a store
//! error does, and dropping the uncommitted transaction discards every staged
//! write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::core::batch::RowFailure;
use crate::core::batch::WriteMode;
use crate::core::identifiers::RowId;
use crate::core::schema::TableSchema;
use crate::core::schema::UniqueConstraint;
use crate::core::value::Row;
use crate::core::value::Value;
use crate::interfaces::StoreError;
use crate::interfaces::TableStore;
use crate::interfaces::WriteTxn;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of applying a validated batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Rows inserted or updated.
    pub imported: usize,
    /// Rows deleted by same-day replacement.
    pub replaced: usize,
    /// Conflict failures, in batch order.
    pub failures: Vec<RowFailure>,
}

/// Mutable view of the table while a batch is applied.
struct Applier<'s> {
    /// Schema of the destination table.
    schema: &'s TableSchema,
    /// Key constraint followed by unique column constraints.
    constraints: Vec<UniqueConstraint>,
    /// Position of the key constraint in `constraints`.
    key_index: Option<usize>,
    /// Per-constraint index from canonical key to owning row.
    indexes: Vec<HashMap<String, RowId>>,
    /// Current row values including staged writes.
    live: BTreeMap<RowId, Row>,
    /// Accumulated outcome.
    outcome: ApplyOutcome,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Applies `rows` to the schema's table in one transaction.
///
/// # Errors
///
/// Returns [`StoreError`] when the transaction cannot be opened, staged, or
/// committed. Nothing from this call is visible in that case.
pub fn apply_batch(
    store: &dyn TableStore,
    schema: &TableSchema,
    mode: WriteMode,
    rows: Vec<(usize, Row)>,
    today: Option<&str>,
) -> Result<ApplyOutcome, StoreError> {
    let mut txn = store.begin_write(&schema.name)?;
    let live: BTreeMap<RowId, Row> =
        txn.rows().iter().map(|row| (row.id, row.values.clone())).collect();
    let mut applier = Applier::new(schema, live);

    if schema.replace_same_day
        && let (Some(column), Some(today)) = (&schema.import_date_column, today)
    {
        applier.replace_day(txn.as_mut(), column, today)?;
    }
    applier.build_indexes();

    for (row_index, row) in rows {
        match mode {
            WriteMode::Insert => applier.insert(txn.as_mut(), row_index, row)?,
            WriteMode::Update => match applier.find_by_key(&row) {
                Some(id) => applier.update(txn.as_mut(), row_index, id, row)?,
                None => {
                    let reason = applier.missing_target(&row);
                    applier.outcome.failures.push(RowFailure::conflict(row_index, reason));
                }
            },
            WriteMode::Upsert => match applier.find_by_key(&row) {
                Some(id) => applier.update(txn.as_mut(), row_index, id, row)?,
                None => applier.insert(txn.as_mut(), row_index, row)?,
            },
        }
    }

    txn.commit()?;
    Ok(applier.outcome)
}

// ============================================================================
// SECTION: Applier
// ============================================================================

impl<'s> Applier<'s> {
    /// Creates an applier over the rows present at transaction start.
    fn new(schema: &'s TableSchema, live: BTreeMap<RowId, Row>) -> Self {
        let constraints = schema.unique_constraints();
        let key_index = constraints.iter().position(|constraint| constraint.is_key);
        let indexes = vec![HashMap::new(); constraints.len()];
        Self {
            schema,
            constraints,
            key_index,
            indexes,
            live,
            outcome: ApplyOutcome::default(),
        }
    }

    /// Deletes every row stamped with `today` in `column`.
    fn replace_day(
        &mut self,
        txn: &mut dyn WriteTxn,
        column: &str,
        today: &str,
    ) -> Result<(), StoreError> {
        let stale: Vec<RowId> = self
            .live
            .iter()
            .filter(|(_, row)| row.get(column).and_then(Value::as_str) == Some(today))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            txn.delete(id)?;
            self.live.remove(&id);
            self.outcome.replaced += 1;
        }
        Ok(())
    }

    /// Indexes every live row under each constraint.
    fn build_indexes(&mut self) {
        for (id, row) in &self.live {
            for (constraint, index) in self.constraints.iter().zip(self.indexes.iter_mut()) {
                if let Some(key) = constraint.key_of(row) {
                    index.insert(key, *id);
                }
            }
        }
    }

    /// Returns the row matching the key columns of `row`, if any.
    fn find_by_key(&self, row: &Row) -> Option<RowId> {
        let position = self.key_index?;
        let key = self.constraints[position].key_of(row)?;
        self.indexes[position].get(&key).copied()
    }

    /// Builds the reason for an update without a matching record.
    fn missing_target(&self, row: &Row) -> String {
        self.key_index.map_or_else(
            || "no key columns to match an existing record".to_string(),
            |position| {
                let constraint = &self.constraints[position];
                format!(
                    "no existing record matches key {} ({})",
                    constraint.label(),
                    constraint.describe(row)
                )
            },
        )
    }

    /// Returns a conflict reason when `row` collides with a row other than
    /// `owner`.
    fn collision(&self, row: &Row, owner: Option<RowId>) -> Option<String> {
        for (constraint, index) in self.constraints.iter().zip(&self.indexes) {
            let Some(key) = constraint.key_of(row) else {
                continue;
            };
            match index.get(&key) {
                Some(existing) if Some(*existing) != owner => {
                    return Some(format!(
                        "value for {} ({}) already exists",
                        constraint.label(),
                        constraint.describe(row)
                    ));
                }
                _ => {}
            }
        }
        None
    }

    /// Stages a new row.
    fn insert(
        &mut self,
        txn: &mut dyn WriteTxn,
        row_index: usize,
        row: Row,
    ) -> Result<(), StoreError> {
        let mut full = Row::new();
        for column in &self.schema.columns {
            full.insert(column.name.clone(), Value::Null);
        }
        full.extend(row);
        if let Some(reason) = self.collision(&full, None) {
            self.outcome.failures.push(RowFailure::conflict(row_index, reason));
            return Ok(());
        }
        let id = txn.insert(full.clone())?;
        self.index_row(id, &full);
        self.live.insert(id, full);
        self.outcome.imported += 1;
        Ok(())
    }

    /// Stages a merge of `row` into the existing row `id`.
    fn update(
        &mut self,
        txn: &mut dyn WriteTxn,
        row_index: usize,
        id: RowId,
        row: Row,
    ) -> Result<(), StoreError> {
        let Some(previous) = self.live.get(&id).cloned() else {
            return Err(StoreError::Corrupt(format!("indexed row {id} is not live")));
        };
        let mut merged = previous.clone();
        merged.extend(row);
        if let Some(reason) = self.collision(&merged, Some(id)) {
            self.outcome.failures.push(RowFailure::conflict(row_index, reason));
            return Ok(());
        }
        txn.replace(id, merged.clone())?;
        self.unindex_row(id, &previous);
        self.index_row(id, &merged);
        self.live.insert(id, merged);
        self.outcome.imported += 1;
        Ok(())
    }

    /// Adds `row` to every constraint index.
    fn index_row(&mut self, id: RowId, row: &Row) {
        for (constraint, index) in self.constraints.iter().zip(self.indexes.iter_mut()) {
            if let Some(key) = constraint.key_of(row) {
                index.insert(key, id);
            }
        }
    }

    /// Removes entries for `row` that still point at `id`.
    fn unindex_row(&mut self, id: RowId, row: &Row) {
        for (constraint, index) in self.constraints.iter().zip(self.indexes.iter_mut()) {
            if let Some(key) = constraint.key_of(row)
                && index.get(&key) == Some(&id)
            {
                index.remove(&key);
            }
        }
    }
}
