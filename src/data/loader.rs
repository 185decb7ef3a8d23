use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Row, Value};
use crate::error::{CleanError, Result};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// On-disk layouts a dataset can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Tsv,
    Json,
    Parquet,
}

impl InputFormat {
    /// Pick the format from the file extension; anything unknown is read as CSV.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "tsv" | "tab" => InputFormat::Tsv,
            "json" => InputFormat::Json,
            "parquet" | "pq" => InputFormat::Parquet,
            _ => InputFormat::Csv,
        }
    }
}

/// Load a tabular dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` (and unknown extensions) – comma-delimited with a header row
/// * `.tsv` / `.tab` – tab-delimited with a header row
/// * `.json` – `[{ "price": 50, "last_review": "2019-01-01", ... }, ...]`
/// * `.parquet` / `.pq` – flat scalar columns
pub fn load_file(path: &Path) -> Result<Dataset> {
    let format = InputFormat::from_path(path);
    log::debug!("loading {} as {format:?}", path.display());

    let dataset = match format {
        InputFormat::Csv => load_delimited(path, b',')?,
        InputFormat::Tsv => load_delimited(path, b'\t')?,
        InputFormat::Json => load_json(path)?,
        InputFormat::Parquet => load_parquet(path)?,
    };
    check_unique_columns(path, &dataset.columns)?;
    Ok(dataset)
}

fn check_unique_columns(path: &Path, columns: &[String]) -> Result<()> {
    for (i, col) in columns.iter().enumerate() {
        if columns[..i].contains(col) {
            return Err(CleanError::data_format(
                path,
                format!("duplicate column '{col}'"),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Delimited-text loader
// ---------------------------------------------------------------------------

/// Header row with column names, one record per line.  Every record must
/// have as many fields as the header.
fn load_delimited(path: &Path, delimiter: u8) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(file);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| CleanError::data_format(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.trim().is_empty()) {
        return Err(CleanError::data_format(path, "missing header row"));
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| CleanError::data_format(path, format!("row {row_no}: {e}")))?;
        rows.push(Row::from_text(record.iter()));
    }

    Ok(Dataset::new(columns, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`).  Columns are taken
/// in first-seen key order; a key missing from a record reads as null.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)?;
    let root: JsonValue =
        serde_json::from_str(&text).map_err(|e| CleanError::data_format(path, e))?;

    let records = root
        .as_array()
        .ok_or_else(|| CleanError::data_format(path, "expected top-level JSON array"))?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| {
            CleanError::data_format(path, format!("row {i} is not a JSON object"))
        })?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            let mut row = Row::new(
                columns
                    .iter()
                    .map(|col| obj.get(col).map_or(Value::Null, json_to_value))
                    .collect(),
            );
            // keep numbers verbatim so u64 ids survive the f64 fallback
            for (i, col) in columns.iter().enumerate() {
                if let Some(JsonValue::Number(n)) = obj.get(col) {
                    row.raw[i] = Some(n.to_string());
                }
            }
            row
        })
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).  Nested columns are rejected.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| CleanError::data_format(path, e))?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| CleanError::data_format(path, e))?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| CleanError::data_format(path, e))?;

        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_value(col, row))
                .collect::<std::result::Result<Vec<_>, String>>()
                .map_err(|e| CleanError::data_format(path, format!("row {row}: {e}")))?;
            let mut record = Row::new(cells);
            for (i, col) in batch.columns().iter().enumerate() {
                record.raw[i] = source_text(col, row);
            }
            rows.push(record);
        }
    }

    Ok(Dataset::new(columns, rows))
}

// -- Arrow helpers --

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> std::result::Result<Value, String> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        DataType::Int8 => Value::Integer(col.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => Value::Integer(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Integer(col.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => Value::Integer(col.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::UInt32 => Value::Integer(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(Value::Float(v as f64), Value::Integer)
        }
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => {
            let days = col.as_primitive::<arrow::datatypes::Date32Type>().value(row);
            days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(Value::Date)
                .ok_or_else(|| format!("date32 value {days} out of range"))?
        }
        DataType::Date64 => {
            let millis = col.as_primitive::<arrow::datatypes::Date64Type>().value(row);
            timestamp_value(DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc()))?
        }
        DataType::Timestamp(unit, _) => timestamp_value(match unit {
            TimeUnit::Second => DateTime::from_timestamp(
                col.as_primitive::<TimestampSecondType>().value(row),
                0,
            ),
            TimeUnit::Millisecond => DateTime::from_timestamp_millis(
                col.as_primitive::<TimestampMillisecondType>().value(row),
            ),
            TimeUnit::Microsecond => DateTime::from_timestamp_micros(
                col.as_primitive::<TimestampMicrosecondType>().value(row),
            ),
            TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(
                col.as_primitive::<TimestampNanosecondType>().value(row),
            )),
        }
        .map(|dt| dt.naive_utc()))?,
        other => return Err(format!("unsupported column type {other:?}")),
    };
    Ok(value)
}

/// Source text for cells whose `Value` cannot hold them exactly.
fn source_text(col: &ArrayRef, row: usize) -> Option<String> {
    match col.data_type() {
        DataType::UInt64 if !col.is_null(row) => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).is_err().then(|| v.to_string())
        }
        _ => None,
    }
}

/// Midnight timestamps collapse to plain dates.
fn timestamp_value(dt: Option<NaiveDateTime>) -> std::result::Result<Value, String> {
    let dt = dt.ok_or_else(|| "timestamp out of range".to_string())?;
    if dt.time() == chrono::NaiveTime::MIN {
        Ok(Value::Date(dt.date()))
    } else {
        Ok(Value::DateTime(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.CSV")), InputFormat::Csv);
        assert_eq!(InputFormat::from_path(Path::new("a.tsv")), InputFormat::Tsv);
        assert_eq!(InputFormat::from_path(Path::new("a.json")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("a.pq")), InputFormat::Parquet);
        assert_eq!(InputFormat::from_path(Path::new("sample")), InputFormat::Csv);
    }

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "sample.csv",
            "id,name,price,last_review\n1,Cozy loft,150,2019-05-21\n2,\"Big, sunny\",80.5,\n",
        );
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.columns, vec!["id", "name", "price", "last_review"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[0].cells[2], Value::Integer(150));
        assert_eq!(ds.rows[1].cells[1], Value::String("Big, sunny".into()));
        assert_eq!(ds.rows[1].cells[2], Value::Float(80.5));
        assert_eq!(ds.rows[1].cells[3], Value::Null);
    }

    #[test]
    fn test_csv_keeps_header_and_field_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "sample.csv", " id ,name\n12345678901234567890,2.50\n");
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.columns, vec![" id ", "name"]);
        assert_eq!(ds.rows[0].output_text(0), "12345678901234567890");
        assert_eq!(ds.rows[0].output_text(1), "2.50");
        assert_eq!(ds.rows[0].source_row, 0);
    }

    #[test]
    fn test_json_keeps_large_integers_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "ids.json", r#"[{"id": 12345678901234567890, "name": "x"}]"#);
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.rows[0].output_text(0), "12345678901234567890");
    }

    #[test]
    fn test_load_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "sample.tsv", "price\tlast_review\n10\t2019-01-01\n");
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.columns, vec!["price", "last_review"]);
        assert_eq!(ds.rows[0].cells[0], Value::Integer(10));
    }

    #[test]
    fn test_ragged_csv_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.csv", "a,b\n1,2,3\n");
        assert!(matches!(load_file(&path), Err(CleanError::DataFormat { .. })));
    }

    #[test]
    fn test_empty_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", "");
        assert!(matches!(load_file(&path), Err(CleanError::DataFormat { .. })));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "dup.csv", "price,price\n1,2\n");
        assert!(matches!(load_file(&path), Err(CleanError::DataFormat { .. })));
    }

    #[test]
    fn test_load_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "sample.json",
            r#"[{"price": 50, "last_review": "2019-01-01"}, {"price": 7.5, "extra": true}]"#,
        );
        let ds = load_file(&path).unwrap();
        assert_eq!(ds.columns, vec!["price", "last_review", "extra"]);
        assert_eq!(ds.rows[0].cells[2], Value::Null);
        assert_eq!(ds.rows[1].cells[0], Value::Float(7.5));
        assert_eq!(ds.rows[1].cells[1], Value::Null);
    }

    #[test]
    fn test_json_must_be_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.json", r#"{"price": 1}"#);
        assert!(matches!(load_file(&path), Err(CleanError::DataFormat { .. })));
        let path = write_file(&dir, "bad2.json", r#"[1, 2]"#);
        assert!(matches!(load_file(&path), Err(CleanError::DataFormat { .. })));
    }

    #[test]
    fn test_load_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("price", DataType::Float64, true),
            Field::new("neighbourhood", DataType::Utf8, false),
            Field::new("last_review", DataType::Date32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(Float64Array::from(vec![Some(99.0), None])),
                Arc::new(StringArray::from(vec!["Harlem", "SoHo"])),
                Arc::new(Date32Array::from(vec![Some(17_897), None])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.columns, vec!["id", "price", "neighbourhood", "last_review"]);
        assert_eq!(ds.rows[0].cells[1], Value::Float(99.0));
        assert_eq!(ds.rows[1].cells[1], Value::Null);
        assert_eq!(
            ds.rows[0].cells[3],
            Value::Date(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
        );
    }
}
