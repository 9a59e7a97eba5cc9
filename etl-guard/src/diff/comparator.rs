//! The hash-join diff engine.

use super::keys::{canonical_floats, KeyEncoder, KeyIndex};
use super::result::{DiffResult, TARGET_SUFFIX};
use crate::error::{ErrorContext, EtlError, Result, TableSide};
use crate::log_diff_op;
use crate::logging::LogConfig;
use crate::schema::SchemaDiff;
use crate::table::{Column, LogicalType, Table};
use arrow::array::{BooleanArray, UInt32Array};
use arrow::compute::kernels::cmp::distinct;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// How repeated key values are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// The n-th source row holding a key is paired with the n-th target row
    /// holding it; surplus rows on either side are removed or added.
    #[default]
    Ordinal,
    /// Every source/target row pair sharing a key is compared, as in a
    /// relational inner join.
    Pairwise,
    /// Any duplicated key on either side fails with [`EtlError::DuplicateKeys`].
    Reject,
}

/// Configuration for a [`DataComparator`].
#[derive(Debug, Clone, Default)]
pub struct DiffConfig {
    pub duplicate_keys: DuplicateKeyPolicy,
    pub log: LogConfig,
}

impl DiffConfig {
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// Computes row-level differences between a source and a target table.
///
/// # Examples
///
/// ```rust
/// use etl_guard::diff::DataComparator;
/// use etl_guard::table::{Column, Table};
///
/// let source = Table::builder()
///     .column(Column::int64("id", [Some(1), Some(2)]))
///     .column(Column::utf8("email", [Some("a@x.com"), Some("b@x.com")]))
///     .build()
///     .unwrap();
/// let target = Table::builder()
///     .column(Column::int64("id", [Some(1), Some(3)]))
///     .column(Column::utf8("email", [Some("a@x.com"), Some("c@x.com")]))
///     .build()
///     .unwrap();
///
/// let diff = DataComparator::new().compare(&source, &target, &["id"], None, None).unwrap();
/// assert_eq!(diff.summary().to_string(), "1 added, 1 removed, 0 modified, 1 unchanged");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataComparator {
    config: DiffConfig,
}

impl DataComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DiffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Diffs `target` against `source` on `key_columns`.
    ///
    /// When `compare_columns` is `None`, every source column that also exists
    /// in the target is compared, keys excluded. `ignore_columns` is removed
    /// from either list. Two cells differ when exactly one is null or both are
    /// non-null and unequal. Repeated names in either list count once.
    #[instrument(skip(self, source, target), fields(
        source_rows = source.row_count(),
        target_rows = target.row_count()
    ))]
    pub fn compare(
        &self,
        source: &Table,
        target: &Table,
        key_columns: &[&str],
        compare_columns: Option<&[&str]>,
        ignore_columns: Option<&[&str]>,
    ) -> Result<DiffResult> {
        let keys = resolve_keys(source, target, key_columns)?;
        let columns =
            resolve_compare_columns(source, target, key_columns, compare_columns, ignore_columns)?;

        let key_types: Vec<LogicalType> = keys.iter().map(|(s, _)| s.logical_type()).collect();
        let encoder = KeyEncoder::new(&key_types)?;
        let source_keys: Vec<&Column> = keys.iter().map(|(s, _)| *s).collect();
        let target_keys: Vec<&Column> = keys.iter().map(|(_, t)| *t).collect();
        let source_rows = encoder
            .encode(&source_keys)
            .context("Failed to encode source keys")?;
        let target_rows = encoder
            .encode(&target_keys)
            .context("Failed to encode target keys")?;
        let source_index = KeyIndex::build(&source_rows);
        let target_index = KeyIndex::build(&target_rows);

        self.check_duplicates(TableSide::Source, source_index.duplicate_rows())?;
        self.check_duplicates(TableSide::Target, target_index.duplicate_rows())?;

        let pairwise = self.config.duplicate_keys == DuplicateKeyPolicy::Pairwise;
        let mut removed = Vec::new();
        let mut source_pairs = Vec::new();
        let mut target_pairs = Vec::new();
        for (si, key) in source_rows.iter().enumerate() {
            let si = si as u32;
            let matches = target_index.get(&key).unwrap_or_default();
            if pairwise {
                if matches.is_empty() {
                    removed.push(si);
                }
                for &ti in matches {
                    source_pairs.push(si);
                    target_pairs.push(ti);
                }
            } else {
                let nth = source_index.rank(&key, si).unwrap_or_default();
                match matches.get(nth) {
                    Some(&ti) => {
                        source_pairs.push(si);
                        target_pairs.push(ti);
                    }
                    None => removed.push(si),
                }
            }
        }
        let added: Vec<u32> = target_rows
            .iter()
            .enumerate()
            .map(|(ti, key)| (ti as u32, key))
            .filter(|(ti, key)| {
                if pairwise {
                    !source_index.contains(key)
                } else {
                    target_index.rank(key, *ti).unwrap_or_default()
                        >= source_index.occurrences(key)
                }
            })
            .map(|(ti, _)| ti)
            .collect();
        log_diff_op!(
            self.config.log,
            added = added.len(),
            removed = removed.len(),
            pairs = source_pairs.len(),
            "Key join completed"
        );

        let source_pairs = UInt32Array::from(source_pairs);
        let target_pairs = UInt32Array::from(target_pairs);

        let target_names = twin_names(source, &columns);
        let mut mask = BooleanArray::from(vec![false; source_pairs.len()]);
        let mut paired = Vec::with_capacity(keys.len() + 2 * columns.len());
        for (s, _) in &keys {
            paired.push(s.take(&source_pairs)?);
        }
        for ((s, t), twin) in columns.iter().zip(&target_names) {
            let left = s.take(&source_pairs)?;
            let right = t.take(&target_pairs)?;
            let differs = distinct_cells(&left, &right)?;
            log_diff_op!(
                self.config.log,
                column = s.name(),
                differing = differs.true_count(),
                "Column compared"
            );
            mask = arrow::compute::or(&mask, &differs)?;
            paired.push(left);
            paired.push(right.renamed(twin.clone()));
        }

        let modified_rows = Table::try_new(paired)?.filter(&mask)?;
        let result = DiffResult {
            added_rows: target.take_indices(&UInt32Array::from(added))?,
            removed_rows: source.take_indices(&UInt32Array::from(removed))?,
            unchanged_count: source_pairs.len() - modified_rows.row_count(),
            modified_rows,
            key_columns: keys.iter().map(|(s, _)| s.name().to_string()).collect(),
            compare_columns: columns.iter().map(|(s, _)| s.name().to_string()).collect(),
            target_columns: target_names,
        };

        info!(summary = %result.summary(), "Diff completed");
        Ok(result)
    }

    /// Name and type differences between the two tables, ignoring row data.
    pub fn compare_schemas(&self, source: &Table, target: &Table) -> SchemaDiff {
        SchemaDiff::between(&source.schema(), &target.schema())
    }

    fn check_duplicates(&self, side: TableSide, duplicates: usize) -> Result<()> {
        if duplicates == 0 {
            return Ok(());
        }
        match self.config.duplicate_keys {
            DuplicateKeyPolicy::Reject => Err(EtlError::DuplicateKeys { side, duplicates }),
            policy => {
                warn!(%side, duplicates, ?policy, "Duplicate keys found");
                Ok(())
            }
        }
    }
}

type ColumnPair<'a> = (&'a Column, &'a Column);

fn resolve_keys<'a>(
    source: &'a Table,
    target: &'a Table,
    key_columns: &[&str],
) -> Result<Vec<ColumnPair<'a>>> {
    if key_columns.is_empty() {
        return Err(EtlError::EmptyKeyColumns);
    }
    let mut seen = HashSet::new();
    key_columns
        .iter()
        .copied()
        .filter(|name| seen.insert(*name))
        .map(|name| {
            let s = source.column(name).ok_or_else(|| EtlError::KeyColumnNotFound {
                column: name.to_string(),
                side: TableSide::Source,
            })?;
            let t = target.column(name).ok_or_else(|| EtlError::KeyColumnNotFound {
                column: name.to_string(),
                side: TableSide::Target,
            })?;
            if s.logical_type() != t.logical_type() {
                return Err(EtlError::KeyTypeMismatch {
                    column: name.to_string(),
                    source_type: s.logical_type(),
                    target_type: t.logical_type(),
                });
            }
            Ok((s, t))
        })
        .collect()
}

fn resolve_compare_columns<'a>(
    source: &'a Table,
    target: &'a Table,
    key_columns: &[&str],
    compare_columns: Option<&[&str]>,
    ignore_columns: Option<&[&str]>,
) -> Result<Vec<ColumnPair<'a>>> {
    let ignored = ignore_columns.unwrap_or_default();
    let wanted = |name: &str| {
        !key_columns.iter().any(|k| *k == name) && !ignored.iter().any(|i| *i == name)
    };

    let columns: Vec<ColumnPair<'a>> = match compare_columns {
        Some(names) => {
            let mut seen = HashSet::new();
            names
                .iter()
                .copied()
                .filter(|name| wanted(*name) && seen.insert(*name))
                .map(|name| {
                    let s = source.column(name).ok_or_else(|| EtlError::column_not_found(name))?;
                    let t = target.column(name).ok_or_else(|| EtlError::column_not_found(name))?;
                    Ok((s, t))
                })
                .collect::<Result<_>>()?
        }
        None => source
            .columns()
            .iter()
            .filter(|c| wanted(c.name()))
            .filter_map(|s| target.column(s.name()).map(|t| (s, t)))
            .collect(),
    };

    if columns.is_empty() {
        return Err(EtlError::NoColumnsToCompare);
    }
    Ok(columns)
}

/// Target twin name for each compared column: `col_target`, with the suffix
/// repeated until it clashes with no source column and no earlier twin.
fn twin_names(source: &Table, columns: &[ColumnPair<'_>]) -> Vec<String> {
    let mut taken: HashSet<String> = source.column_names().into_iter().map(String::from).collect();
    columns
        .iter()
        .map(|(s, _)| {
            let mut name = format!("{}{TARGET_SUFFIX}", s.name());
            while taken.contains(&name) {
                name.push_str(TARGET_SUFFIX);
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// True where the two aligned columns differ, treating null as a value.
fn distinct_cells(left: &Column, right: &Column) -> Result<BooleanArray> {
    if left.logical_type() == right.logical_type() {
        let (l, r) = (canonical_floats(left.values()), canonical_floats(right.values()));
        return Ok(distinct(&l, &r)?);
    }
    Ok((0..left.len())
        .map(|row| Some(left.value(row) != right.value(row)))
        .collect())
}
