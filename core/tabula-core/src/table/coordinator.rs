//! Cross-column index coordination.
//!
//! A row touches every indexed column of its schema. These helpers apply
//! one row mutation across all of them and undo the completed part when a
//! later column fails, so the table sees a single all-or-nothing call.

use crate::error::{TabulaError, TabulaResult};
use crate::table::column::Column;
use crate::value::Blob;

fn wrap(op: &'static str, column: &Column, source: TabulaError) -> TabulaError {
    TabulaError::Index {
        op,
        column: column.name().to_string(),
        source: Box::new(source),
    }
}

fn composite(source: TabulaError, rollback: Option<TabulaError>) -> TabulaError {
    match rollback {
        None => source,
        Some(rollback) => TabulaError::RollbackFailed {
            source: Box::new(source),
            rollback: Box::new(rollback),
        },
    }
}

/// Registers `row` at `position` with every indexed column.
///
/// On the first failure every already-registered column is deleted again,
/// in reverse order. If a rollback step fails too, the composite error
/// carries both causes; the remaining steps are still attempted.
pub(crate) fn add_row(schema: &[Column], row: &[Blob], position: usize) -> TabulaResult<()> {
    for (i, col) in schema.iter().enumerate() {
        let Some(indexer) = col.indexer() else {
            continue;
        };
        if let Err(err) = indexer.add(&row[i], position) {
            let err = wrap("add", col, err);
            let mut rollback_err = None;
            for (j, done) in schema.iter().enumerate().take(i).rev() {
                let Some(done_indexer) = done.indexer() else {
                    continue;
                };
                if let Err(undo_err) = done_indexer.delete(&row[j], position) {
                    tracing::warn!(column = done.name(), error = %undo_err, "add rollback failed");
                    if rollback_err.is_none() {
                        rollback_err = Some(wrap("rollback delete", done, undo_err));
                    }
                }
            }
            return Err(composite(err, rollback_err));
        }
    }
    Ok(())
}

/// Re-keys `position` from `old_row` to `new_row` on every indexed column.
///
/// On the first failure every already-updated column is updated back, in
/// reverse order, with the same composite-error contract as [`add_row`].
pub(crate) fn update_row(
    schema: &[Column],
    old_row: &[Blob],
    new_row: &[Blob],
    position: usize,
) -> TabulaResult<()> {
    for (i, col) in schema.iter().enumerate() {
        let Some(indexer) = col.indexer() else {
            continue;
        };
        if let Err(err) = indexer.update(&old_row[i], &new_row[i], position) {
            let err = wrap("update", col, err);
            let mut rollback_err = None;
            for (j, done) in schema.iter().enumerate().take(i).rev() {
                let Some(done_indexer) = done.indexer() else {
                    continue;
                };
                if let Err(undo_err) = done_indexer.update(&new_row[j], &old_row[j], position) {
                    tracing::warn!(column = done.name(), error = %undo_err, "update rollback failed");
                    if rollback_err.is_none() {
                        rollback_err = Some(wrap("rollback update", done, undo_err));
                    }
                }
            }
            return Err(composite(err, rollback_err));
        }
    }
    Ok(())
}

/// Unregisters `row` at `position` from every indexed column.
///
/// On the first failure every already-deleted entry is re-added, in
/// reverse order, with the same composite-error contract as [`add_row`].
pub(crate) fn delete_row(schema: &[Column], row: &[Blob], position: usize) -> TabulaResult<()> {
    for (i, col) in schema.iter().enumerate() {
        let Some(indexer) = col.indexer() else {
            continue;
        };
        if let Err(err) = indexer.delete(&row[i], position) {
            let err = wrap("delete", col, err);
            let mut rollback_err = None;
            for (j, done) in schema.iter().enumerate().take(i).rev() {
                let Some(done_indexer) = done.indexer() else {
                    continue;
                };
                if let Err(undo_err) = done_indexer.add(&row[j], position) {
                    tracing::warn!(column = done.name(), error = %undo_err, "delete rollback failed");
                    if rollback_err.is_none() {
                        rollback_err = Some(wrap("rollback add", done, undo_err));
                    }
                }
            }
            return Err(composite(err, rollback_err));
        }
    }
    Ok(())
}
