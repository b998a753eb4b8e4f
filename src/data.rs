use anyhow::{anyhow, Context, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;

static NULL: Scalar = Scalar::Null;

/// A single cell value. Rows are schemaless, so a field may hold any variant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Falsy values are null, false, 0, NaN and the empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Text(s) => !s.is_empty(),
        }
    }

    /// Parse a raw delimited-text cell
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Scalar::Null;
        }
        match trimmed {
            "true" => return Scalar::Bool(true),
            "false" => return Scalar::Bool(false),
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Scalar::Number(n),
            _ => Scalar::Text(cell.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::Bool(_) => 1,
            Scalar::Number(_) => 2,
            Scalar::Text(_) => 3,
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Number(a), Scalar::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Bool(b) => b.hash(state),
            Scalar::Number(n) => {
                // -0.0 == 0.0 and NaN == NaN must hash alike
                let canonical = if *n == 0.0 {
                    0.0f64
                } else if n.is_nan() {
                    f64::NAN
                } else {
                    *n
                };
                canonical.to_bits().hash(state);
            }
            Scalar::Text(s) => s.hash(state),
        }
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Number(a), Scalar::Number(b)) => a
                .partial_cmp(b)
                .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan())),
            (Scalar::Text(a), Scalar::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", format_number(*n)),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Integral values print without a fractional part
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One record of the dataset, keyed by field name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRow {
    fields: IndexMap<String, Scalar>,
}

impl DatasetRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Scalar>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Value of `field`, or null when the row does not carry it
    pub fn value(&self, field: &str) -> &Scalar {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for DatasetRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// The uploaded dataset. Row order is significant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetTable {
    rows: Vec<DatasetRow>,
}

impl DatasetTable {
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of field names seen across rows, in first-seen order
    pub fn columns(&self) -> Vec<String> {
        let seen: IndexSet<&str> = self
            .rows
            .iter()
            .flat_map(|row| row.fields().map(|(name, _)| name.as_str()))
            .collect();
        seen.into_iter().map(str::to_string).collect()
    }

    /// Values of one column across all rows (null where absent)
    pub fn column(&self, field: &str) -> Vec<Scalar> {
        self.rows.iter().map(|row| row.value(field).clone()).collect()
    }

    /// Create a table from a JSON array of objects, or an object wrapping one under "data"
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = match value {
            Value::Array(items) => items,
            Value::Object(obj) => obj
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| anyhow!("Input object must carry a \"data\" array of rows"))?,
            _ => return Err(anyhow!("Input data must be a JSON array of objects")),
        };

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;

            let mut row = DatasetRow::new();
            for (field, val) in obj {
                let scalar = match val {
                    Value::Null => Scalar::Null,
                    Value::Bool(b) => Scalar::Bool(*b),
                    Value::Number(n) => Scalar::Number(
                        n.as_f64()
                            .ok_or_else(|| anyhow!("Number out of range for field '{}'", field))?,
                    ),
                    Value::String(s) => Scalar::Text(s.clone()),
                    _ => return Err(anyhow!("Unsupported value type for field '{}'", field)),
                };
                row.insert(field.clone(), scalar);
            }
            rows.push(row);
        }

        Ok(Self { rows })
    }

    /// Read delimited text with a header row
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.is_empty() {
            anyhow::bail!("CSV input has no header row");
        }

        let mut rows = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
            let row: DatasetRow = headers
                .iter()
                .zip(record.iter())
                .map(|(h, cell)| (h.clone(), Scalar::from_cell(cell)))
                .collect();
            rows.push(row);
        }

        Ok(Self { rows })
    }

    /// Load a dataset file: `.csv` as delimited text, anything else as JSON rows
    pub fn load(path: &Path) -> Result<Self> {
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open dataset '{}'", path.display()))?;

        if is_csv {
            Self::from_csv_reader(file)
        } else {
            let value: Value = serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("Failed to parse JSON dataset '{}'", path.display()))?;
            Self::from_json(&value)
        }
    }
}

impl FromIterator<DatasetRow> for DatasetTable {
    fn from_iter<I: IntoIterator<Item = DatasetRow>>(iter: I) -> Self {
        Self { rows: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_rows() {
        let value = json!([
            {"region": "A", "sales": 10, "note": null},
            {"region": "B", "sales": 20.5}
        ]);
        let table = DatasetTable::from_json(&value).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].value("sales"), &Scalar::Number(10.0));
        assert_eq!(table.rows()[0].value("note"), &Scalar::Null);
        assert_eq!(table.rows()[1].value("note"), &Scalar::Null);
        assert_eq!(table.columns(), vec!["region", "sales", "note"]);
    }

    #[test]
    fn test_columns_union_of_ragged_rows() {
        let table = DatasetTable::new(vec![
            DatasetRow::new().with("b", 1.0),
            DatasetRow::new().with("a", 2.0).with("b", 3.0),
            DatasetRow::new().with("c", "x").with("a", 4.0),
        ]);
        assert_eq!(table.columns(), vec!["b", "a", "c"]);
        assert!(DatasetTable::default().columns().is_empty());
    }

    #[test]
    fn test_from_json_wrapped_data() {
        let value = json!({"data": [{"x": 1}]});
        let table = DatasetTable::from_json(&value).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_from_json_rejects_nested() {
        let value = json!([{"x": [1, 2]}]);
        let err = DatasetTable::from_json(&value).unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_from_csv() {
        let csv = "region,sales,flag\nA,10,true\nB,,false\nC,n/a,\n";
        let table = DatasetTable::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0].value("sales"), &Scalar::Number(10.0));
        assert_eq!(table.rows()[0].value("flag"), &Scalar::Bool(true));
        assert_eq!(table.rows()[1].value("sales"), &Scalar::Null);
        assert_eq!(table.rows()[2].value("sales"), &Scalar::Text("n/a".to_string()));
    }

    #[test]
    fn test_header_only_csv_is_empty() {
        let table = DatasetTable::from_csv_reader("x,y\n".as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_scalar_equality_is_strict_by_variant() {
        assert_ne!(Scalar::Number(1.0), Scalar::Text("1".to_string()));
        assert_eq!(Scalar::Number(0.0), Scalar::Number(-0.0));
        assert_eq!(Scalar::Number(f64::NAN), Scalar::Number(f64::NAN));
    }

    #[test]
    fn test_scalar_ordering() {
        let mut values = vec![
            Scalar::from("b"),
            Scalar::from(10.0),
            Scalar::Null,
            Scalar::from(2.0),
            Scalar::from("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Scalar::Null,
                Scalar::from(2.0),
                Scalar::from(10.0),
                Scalar::from("a"),
                Scalar::from("b"),
            ]
        );
    }

    #[test]
    fn test_display_and_truthiness() {
        assert_eq!(Scalar::from(10.0).to_string(), "10");
        assert_eq!(Scalar::from(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Null.to_string(), "null");
        assert!(!Scalar::from(0.0).is_truthy());
        assert!(!Scalar::from("").is_truthy());
        assert!(Scalar::from(3.0).is_truthy());
    }
}
