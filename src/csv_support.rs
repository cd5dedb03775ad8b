//! CSV output for the lmi CLI
//!
//! ## Pointwise MI
//!
//! ```csv
//! index,split,pmi
//! 0,train,
//! 1,validation,0.734812
//! ```
//!
//! Rows without an estimate keep an empty `pmi` cell.
//!
//! ## Embeddings
//!
//! ```csv
//! z_0,z_1,...
//! 0.123,0.456,...
//! ```

use anyhow::{Context, Result};
use nalgebra::DMatrix;
use std::collections::HashSet;
use std::path::Path;

use latentmi_core::{PointwiseMi, SplitIndices};

/// Rows to be written as a numeric table, with optional IDs
#[derive(Debug)]
pub struct CsvData {
    pub ids: Vec<Option<String>>,
    pub vectors: Vec<Vec<f32>>,
    pub dimension: usize,
}

impl CsvData {
    /// Check if any row has an ID
    pub fn has_ids(&self) -> bool {
        self.ids.iter().any(|id| id.is_some())
    }
}

/// Write rows to CSV format, header columns named `{prefix}_{i}`
pub fn write_csv(data: &CsvData, prefix: &str, include_header: bool) -> String {
    let mut output = String::new();

    let has_ids = data.has_ids();

    if include_header && !data.vectors.is_empty() {
        if has_ids {
            output.push_str("id,");
        }
        let dim_headers: Vec<String> = (0..data.dimension).map(|i| format!("{}_{}", prefix, i)).collect();
        output.push_str(&dim_headers.join(","));
        output.push('\n');
    }

    for (id, vector) in data.ids.iter().zip(data.vectors.iter()) {
        if has_ids {
            if let Some(id) = id {
                output.push_str(id);
            }
            output.push(',');
        }

        let values: Vec<String> = vector.iter().map(|v| format!("{:.6}", v)).collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

/// Convert an embedding matrix to CsvData
pub fn matrix_to_csv_data(m: &DMatrix<f32>, ids: Option<&[String]>) -> CsvData {
    let vectors: Vec<Vec<f32>> = (0..m.nrows())
        .map(|i| m.row(i).iter().copied().collect())
        .collect();

    let ids = match ids {
        Some(list) => list.iter().cloned().map(Some).collect(),
        None => vec![None; vectors.len()],
    };

    CsvData {
        ids,
        vectors,
        dimension: m.ncols(),
    }
}

/// Render pointwise MI with one line per input row
pub fn write_pmi_csv(pmi: &PointwiseMi, split: &SplitIndices, ids: Option<&[String]>) -> String {
    let validation: HashSet<usize> = split.test.iter().copied().collect();
    let mut output = String::new();

    output.push_str(if ids.is_some() { "index,id,split,pmi\n" } else { "index,split,pmi\n" });

    for (i, value) in pmi.iter().enumerate() {
        output.push_str(&i.to_string());
        output.push(',');
        if let Some(ids) = ids {
            output.push_str(ids.get(i).map(String::as_str).unwrap_or(""));
            output.push(',');
        }
        output.push_str(if validation.contains(&i) { "validation" } else { "train" });
        output.push(',');
        if let Some(v) = value {
            output.push_str(&format!("{:.6}", v));
        }
        output.push('\n');
    }

    output
}

/// Write both embedding matrices as `zx.csv` and `zy.csv` under `dir`
pub fn write_embeddings(
    dir: &Path,
    zx: &DMatrix<f32>,
    zy: &DMatrix<f32>,
    ids: Option<&[String]>,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for (name, m) in [("zx.csv", zx), ("zy.csv", zy)] {
        let path = dir.join(name);
        let content = write_csv(&matrix_to_csv_data(m, ids), "z", true);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_csv() {
        let data = CsvData {
            ids: vec![Some("doc_1".to_string()), Some("doc_2".to_string())],
            vectors: vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]],
            dimension: 3,
        };

        let output = write_csv(&data, "z", true);

        assert!(output.contains("id,z_0,z_1,z_2"));
        assert!(output.contains("doc_1,0.100000,0.200000,0.300000"));
        assert!(output.contains("doc_2,0.400000,0.500000,0.600000"));
    }

    #[test]
    fn test_write_csv_no_header() {
        let data = CsvData {
            ids: vec![None, None],
            vectors: vec![vec![0.1, 0.2], vec![0.3, 0.4]],
            dimension: 2,
        };

        let output = write_csv(&data, "z", false);

        assert!(!output.contains("z_"));
        assert_eq!(output, "0.100000,0.200000\n0.300000,0.400000\n");
    }

    #[test]
    fn test_matrix_to_csv_data() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let data = matrix_to_csv_data(&m, None);

        assert_eq!(data.vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(data.dimension, 2);
        assert!(!data.has_ids());
    }

    #[test]
    fn test_pmi_csv_leaves_missing_cells_empty() {
        let pmi = PointwiseMi(vec![None, Some(0.5), Some(-0.25)]);
        let split = SplitIndices { train: vec![0], test: vec![1, 2] };

        let output = write_pmi_csv(&pmi, &split, None);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "index,split,pmi");
        assert_eq!(lines[1], "0,train,");
        assert_eq!(lines[2], "1,validation,0.500000");
        assert_eq!(lines[3], "2,validation,-0.250000");
    }

    #[test]
    fn test_pmi_csv_with_ids() {
        let pmi = PointwiseMi(vec![Some(1.0)]);
        let split = SplitIndices { train: vec![], test: vec![0] };
        let ids = vec!["a".to_string()];

        let output = write_pmi_csv(&pmi, &split, Some(&ids));
        assert!(output.starts_with("index,id,split,pmi\n0,a,validation,1.000000"));
    }

    #[test]
    fn test_write_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let zx = DMatrix::from_row_slice(2, 1, &[0.5, 1.5]);
        let zy = DMatrix::from_row_slice(2, 1, &[2.0, 3.0]);

        write_embeddings(dir.path(), &zx, &zy, None).unwrap();

        let zx_text = std::fs::read_to_string(dir.path().join("zx.csv")).unwrap();
        assert_eq!(zx_text, "z_0\n0.500000\n1.500000\n");
        assert!(dir.path().join("zy.csv").exists());
    }
}
