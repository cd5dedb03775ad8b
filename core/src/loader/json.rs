//! JSON Format Loader
//!
//! Supports several JSON layouts for one view:
//!
//! # Format 1: Simple array of arrays
//! ```json
//! [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
//! ```
//!
//! # Format 2: Object with a rows field
//! ```json
//! {"samples": [[1.0, 2.0], [3.0, 4.0]]}
//! ```
//! `"embeddings"` and `"vectors"` are accepted in place of `"samples"`.
//!
//! # Format 3: Array of objects with vector field
//! ```json
//! [{"vector": [1.0, 2.0], "id": "cell_1"}, ...]
//! ```
//!
//! And one layout holding both views:
//!
//! # Paired document
//! ```json
//! {"x": [[...], ...], "y": [[...], ...], "ids": ["a", ...]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::{DataLoader, LoaderError, PairedData, SampleData};

const ROW_FIELDS: [&str; 3] = ["samples", "embeddings", "vectors"];

/// JSON format loader
pub struct JsonLoader;

/// Format 3: Object with vector field
#[derive(Deserialize)]
struct VectorObject {
    vector: Vec<f32>,
    #[serde(default)]
    id: Option<String>,
}

/// Paired document
#[derive(Serialize, Deserialize)]
struct JsonPairedData {
    x: Vec<Vec<f32>>,
    y: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ids: Option<Vec<String>>,
}

fn read_value(path: &Path) -> Result<Value, LoaderError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn parse_rows(value: Value) -> Result<SampleData, LoaderError> {
    match &value {
        Value::Array(arr) if !arr.is_empty() => match &arr[0] {
            // Format 1: [[1.0, 2.0], ...]
            Value::Array(_) => Ok(SampleData::new(serde_json::from_value(value)?)),
            // Format 3: [{"vector": [...], "id": "..."}]
            Value::Object(_) => {
                let objects: Vec<VectorObject> = serde_json::from_value(value)?;
                let has_ids = objects.iter().any(|o| o.id.is_some());
                let (rows, ids): (Vec<_>, Vec<_>) = objects
                    .into_iter()
                    .map(|o| (o.vector, o.id.unwrap_or_default()))
                    .unzip();
                if has_ids {
                    Ok(SampleData::with_ids(rows, ids))
                } else {
                    Ok(SampleData::new(rows))
                }
            }
            _ => Err(LoaderError::InvalidFormat("Expected array of arrays or objects".into())),
        },
        Value::Array(_) => Err(LoaderError::EmptyData),
        // Format 2: object with a rows field
        Value::Object(obj) => {
            let rows = ROW_FIELDS
                .iter()
                .find_map(|field| obj.get(*field))
                .ok_or_else(|| {
                    LoaderError::InvalidFormat(
                        "Object must have a 'samples', 'embeddings' or 'vectors' field".into(),
                    )
                })?;
            let rows: Vec<Vec<f32>> = serde_json::from_value(rows.clone())?;
            let ids = obj
                .get("ids")
                .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok());
            Ok(SampleData { rows, ids })
        }
        _ => Err(LoaderError::InvalidFormat("Expected array or object".into())),
    }
}

impl JsonLoader {
    /// Load a paired `{"x": ..., "y": ...}` document
    pub fn load_paired(path: &Path) -> Result<PairedData, LoaderError> {
        let value = read_value(path)?;
        let is_paired = value.get("x").is_some() && value.get("y").is_some();
        if !is_paired {
            return Err(LoaderError::InvalidFormat(
                "Paired JSON must have 'x' and 'y' fields".into(),
            ));
        }
        let doc: JsonPairedData = serde_json::from_value(value)?;
        let x = SampleData { rows: doc.x, ids: doc.ids.clone() };
        let y = SampleData { rows: doc.y, ids: doc.ids };
        PairedData::new(x, y)
    }

    /// Write both views as a paired document
    pub fn write_paired<P: AsRef<Path>>(path: P, data: &PairedData) -> Result<(), LoaderError> {
        let writer = BufWriter::new(File::create(path)?);
        let doc = JsonPairedData {
            x: data.x.rows.clone(),
            y: data.y.rows.clone(),
            ids: data.x.ids.clone(),
        };
        serde_json::to_writer_pretty(writer, &doc)?;
        Ok(())
    }

    /// Write just the rows as a simple array
    pub fn write_simple<P: AsRef<Path>>(path: P, rows: &[Vec<f32>]) -> Result<(), LoaderError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, rows)?;
        writer.flush()?;
        Ok(())
    }
}

impl DataLoader for JsonLoader {
    fn load(&self, path: &Path) -> Result<SampleData, LoaderError> {
        let data = parse_rows(read_value(path)?)?;
        if data.is_empty() {
            return Err(LoaderError::EmptyData);
        }
        Ok(data)
    }

    fn supports(&self, path: &Path) -> bool {
        if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json")) {
            return true;
        }

        // Check if starts with [ or {
        if let Ok(mut file) = File::open(path) {
            let mut byte = [0u8; 1];
            if file.read_exact(&mut byte).is_ok() {
                return byte[0] == b'[' || byte[0] == b'{';
            }
        }

        false
    }

    fn format_name(&self) -> &'static str {
        "JSON"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let file = NamedTempFile::with_suffix(".json").unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn test_format1_simple_array() {
        let file = json_file(r#"[[1.0, 2.0], [3.0, 4.0]]"#);
        let data = JsonLoader.load(file.path()).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.dimension(), 2);
        assert_eq!(data.rows[0], vec![1.0, 2.0]);
    }

    #[test]
    fn test_format2_object_fields() {
        for field in ROW_FIELDS {
            let file = json_file(&format!(r#"{{"{field}": [[1.0], [2.0], [3.0]]}}"#));
            let data = JsonLoader.load(file.path()).unwrap();
            assert_eq!(data.len(), 3, "field {field}");
        }
    }

    #[test]
    fn test_format3_vector_objects() {
        let file = json_file(
            r#"[
            {"vector": [1.0, 2.0], "id": "a"},
            {"vector": [3.0, 4.0], "id": "b"}
        ]"#,
        );
        let data = JsonLoader.load(file.path()).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.ids, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_paired_round_trip() {
        let x = SampleData::with_ids(vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec!["p".into(), "q".into()]);
        let y = SampleData::with_ids(vec![vec![0.5], vec![0.25]], vec!["p".into(), "q".into()]);
        let pair = PairedData::new(x, y).unwrap();

        let file = NamedTempFile::with_suffix(".json").unwrap();
        JsonLoader::write_paired(file.path(), &pair).unwrap();
        let loaded = JsonLoader::load_paired(file.path()).unwrap();

        assert_eq!(loaded, pair);
    }

    #[test]
    fn test_paired_requires_both_views() {
        let file = json_file(r#"{"x": [[1.0]]}"#);
        assert!(matches!(JsonLoader::load_paired(file.path()), Err(LoaderError::InvalidFormat(_))));

        let file = json_file(r#"{"x": [[1.0]], "y": [[1.0], [2.0]]}"#);
        assert!(matches!(JsonLoader::load_paired(file.path()), Err(LoaderError::LengthMismatch { .. })));
    }

    #[test]
    fn test_write_simple() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let file = NamedTempFile::with_suffix(".json").unwrap();
        JsonLoader::write_simple(file.path(), &rows).unwrap();

        let loaded = JsonLoader.load(file.path()).unwrap();
        assert_eq!(loaded.rows, rows);
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(matches!(JsonLoader.load(json_file("[]").path()), Err(LoaderError::EmptyData)));
        assert!(matches!(JsonLoader.load(json_file(r#"{"rows": []}"#).path()), Err(LoaderError::InvalidFormat(_))));
        assert!(JsonLoader.load(json_file("42").path()).is_err());
    }

    #[test]
    fn test_supports() {
        let file = json_file("[[1.0]]");
        assert!(JsonLoader.supports(file.path()));
        assert_eq!(JsonLoader.format_name(), "JSON");
    }
}
