//! Splitting frames into groups.
use ahash::RandomState;
use glaredb_error::{DbError, Result};
use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use tracing::trace;

use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;
use crate::arrays::frame::Frame;
use crate::arrays::scalar::ScalarValue;
use crate::arrays::selection::SelectionVector;

/// Hash state for group keys. Seeded for deterministic hashing across runs.
const GROUP_HASH_STATE: RandomState = RandomState::with_seeds(0, 0, 0, 0);

/// Rows of a frame sharing a single grouping key.
#[derive(Debug, Clone)]
pub struct GroupPartition {
    key: Vec<ScalarValue>,
    /// Rows in the source frame belonging to this group, in source order.
    rows: SelectionVector,
    /// View over the source frame restricted to `rows`.
    members: Frame,
}

impl GroupPartition {
    pub fn key(&self) -> &[ScalarValue] {
        &self.key
    }

    pub fn rows(&self) -> &SelectionVector {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.num_rows()
    }

    pub fn members(&self) -> &Frame {
        &self.members
    }
}

/// Splits a frame into partitions by the values of some key columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Partitioner {
    /// Order partitions by key instead of by first occurrence.
    sort_groups: bool,
}

impl Partitioner {
    pub const fn new(sort_groups: bool) -> Self {
        Partitioner { sort_groups }
    }

    /// Partition the frame by the given key columns.
    ///
    /// Every row belongs to exactly one partition. Nulls are grouped together.
    pub fn partition(&self, frame: &Frame, group_by: &[&str]) -> Result<Vec<GroupPartition>> {
        if group_by.is_empty() {
            return Err(DbError::invalid_input(
                "At least one grouping column is required",
            ));
        }
        if let Some((idx, name)) = group_by
            .iter()
            .enumerate()
            .find(|(idx, name)| group_by[..*idx].contains(*name))
        {
            return Err(DbError::invalid_input(format!(
                "Grouping column '{name}' is listed more than once"
            ))
            .with_field("position", idx));
        }
        let key_columns = frame.columns_by_name(group_by)?;

        let mut lookup: HashMap<Vec<ScalarValue>, usize, RandomState> =
            HashMap::with_hasher(GROUP_HASH_STATE.clone());
        let mut groups: Vec<(Vec<ScalarValue>, SelectionVector)> = Vec::new();

        for row in 0..frame.num_rows() {
            let key = key_columns
                .iter()
                .map(|col| col.value(row))
                .collect::<Result<Vec<_>>>()?;

            match lookup.entry(key) {
                Entry::Occupied(ent) => groups[*ent.get()].1.push_location(row),
                Entry::Vacant(ent) => {
                    let mut rows = SelectionVector::empty();
                    rows.push_location(row);
                    groups.push((ent.key().clone(), rows));
                    ent.insert(groups.len() - 1);
                }
            }
        }

        if self.sort_groups {
            groups.sort_by(|a, b| a.0.cmp(&b.0));
        }

        trace!(num_groups = groups.len(), num_rows = frame.num_rows(), "partitioned frame");

        groups
            .into_iter()
            .map(|(key, rows)| {
                let members = frame.select_rows(&rows)?;
                Ok(GroupPartition { key, rows, members })
            })
            .collect()
    }
}

/// How per-group results get assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// One output row per group (group by + aggregate).
    Aggregate,
    /// One output row per input row, in the original row order (window
    /// "over" a partition).
    Window,
}

/// Grouping for a single evaluation.
#[derive(Debug, Clone)]
pub struct GroupContext {
    mode: GroupMode,
    partitions: Vec<GroupPartition>,
    num_rows: usize,
    key_names: Vec<String>,
    key_types: Vec<DataType>,
}

impl GroupContext {
    pub fn try_new(
        frame: &Frame,
        group_by: &[&str],
        mode: GroupMode,
        partitioner: &Partitioner,
    ) -> Result<Self> {
        let partitions = partitioner.partition(frame, group_by)?;
        let key_types = group_by
            .iter()
            .map(|name| frame.column(name).map(|col| col.datatype()))
            .collect::<Result<Vec<_>>>()?;

        Ok(GroupContext {
            mode,
            partitions,
            num_rows: frame.num_rows(),
            key_names: group_by.iter().map(|name| name.to_string()).collect(),
            key_types,
        })
    }

    pub fn mode(&self) -> GroupMode {
        self.mode
    }

    pub fn partitions(&self) -> &[GroupPartition] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Number of rows in the partitioned frame.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn key_names(&self) -> &[String] {
        &self.key_names
    }

    /// Build a frame with one row per partition holding the group keys, in
    /// partition order.
    pub fn key_frame(&self) -> Result<Frame> {
        let columns = self
            .key_names
            .iter()
            .zip(&self.key_types)
            .enumerate()
            .map(|(key_idx, (name, datatype))| {
                let values: Vec<_> = self
                    .partitions
                    .iter()
                    .map(|p| p.key[key_idx].clone())
                    .collect();
                Column::try_from_scalars(name.as_str(), Some(*datatype), &values)
            })
            .collect::<Result<Vec<_>>>()?;

        Frame::try_new(columns)
    }
}
