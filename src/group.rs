// Grouping utilities shared by the per-family transforms.
//
// Every container here is an IndexMap or IndexSet, so iteration order is the
// order in which a key was first seen while scanning rows top to bottom.

use crate::data::{DatasetRow, Scalar};
use indexmap::{IndexMap, IndexSet};

/// Distinct values of `field`, each once, in first-occurrence order
pub fn distinct_in_order(rows: &[DatasetRow], field: &str) -> Vec<Scalar> {
    let seen: IndexSet<&Scalar> = rows.iter().map(|row| row.value(field)).collect();
    seen.into_iter().cloned().collect()
}

/// Distinct values of `field` ordered by display text, compared in UTF-16 code units,
/// so `10` sorts before `2`. Null keys go last; keys with the same text keep
/// first-occurrence order.
pub fn sorted_distinct(rows: &[DatasetRow], field: &str) -> Vec<Scalar> {
    let mut keys = distinct_in_order(rows, field);
    keys.sort_by_cached_key(|key| (key.is_null(), key.to_string().encode_utf16().collect::<Vec<u16>>()));
    keys
}

/// Map each distinct key of `field` to the first row carrying it.
/// Later rows with the same key are ignored: first match wins.
pub fn group_first_match<'a>(rows: &'a [DatasetRow], field: &str) -> IndexMap<Scalar, &'a DatasetRow> {
    let mut groups: IndexMap<Scalar, &DatasetRow> = IndexMap::new();
    for row in rows {
        let key = row.value(field);
        if !groups.contains_key(key) {
            groups.insert(key.clone(), row);
        }
    }
    groups
}

/// Number of rows per distinct key of `field`, in first-occurrence order
pub fn count_by_key(rows: &[DatasetRow], field: &str) -> IndexMap<Scalar, usize> {
    let mut counts: IndexMap<Scalar, usize> = IndexMap::new();
    for row in rows {
        let key = row.value(field);
        match counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                counts.insert(key.clone(), 1);
            }
        }
    }
    counts
}

/// Two-way table over the distinct values of two fields
#[derive(Debug, Clone)]
pub struct CrossTab<'a> {
    pub x: Vec<Scalar>,
    pub y: Vec<Scalar>,
    cells: IndexMap<(Scalar, Scalar), &'a DatasetRow>,
}

impl<'a> CrossTab<'a> {
    /// First row matching the `(x, y)` pair
    pub fn first_match(&self, x: &Scalar, y: &Scalar) -> Option<&'a DatasetRow> {
        self.cells.get(&(x.clone(), y.clone())).copied()
    }

    /// Evaluate `cell` over the full Cartesian product, indexed `[y][x]`
    pub fn grid<F>(&self, mut cell: F) -> Vec<Vec<Scalar>>
    where
        F: FnMut(Option<&'a DatasetRow>) -> Scalar,
    {
        self.y
            .iter()
            .map(|y| self.x.iter().map(|x| cell(self.first_match(x, y))).collect())
            .collect()
    }

    pub fn cell_count(&self) -> usize {
        self.x.len() * self.y.len()
    }
}

/// Cross-tabulate `x_field` against `y_field`, keeping the first row per pair.
/// One pass over rows; lookups per cell are constant time.
pub fn cross_tabulate<'a>(rows: &'a [DatasetRow], x_field: &str, y_field: &str) -> CrossTab<'a> {
    let mut cells: IndexMap<(Scalar, Scalar), &DatasetRow> = IndexMap::new();
    for row in rows {
        let key = (row.value(x_field).clone(), row.value(y_field).clone());
        cells.entry(key).or_insert(row);
    }

    CrossTab {
        x: distinct_in_order(rows, x_field),
        y: distinct_in_order(rows, y_field),
        cells,
    }
}

/// Arithmetic mean of `field` over every row.
/// Missing or non-numeric entries make the result NaN; an empty slice is NaN too.
pub fn column_mean(rows: &[DatasetRow], field: &str) -> f64 {
    let sum: f64 = rows
        .iter()
        .map(|row| row.value(field).as_f64().unwrap_or(f64::NAN))
        .sum();
    sum / rows.len() as f64
}
