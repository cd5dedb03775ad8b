//! CSV Format Loader
//!
//! **With header and id column:**
//! ```csv
//! id,dim_0,dim_1,dim_2
//! cell_001,0.123,0.456,0.789
//! ```
//!
//! **Plain numeric rows:**
//! ```csv
//! 0.123,0.456,0.789
//! 0.234,0.567,0.890
//! ```
//!
//! `.tsv` files are split on tabs instead of commas.

use std::fs;
use std::path::Path;

use super::{DataLoader, LoaderError, SampleData};

/// CSV format loader; `None` fields are auto-detected
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    pub has_header: Option<bool>,
    pub id_column: Option<usize>,
}

/// Heuristic: a first row where most of the leading fields are not numbers
/// is a header
pub fn detect_header(first_line: &str, delimiter: char) -> bool {
    let fields: Vec<&str> = first_line.split(delimiter).collect();
    let checked = fields.len().min(5);
    let non_numeric = fields
        .iter()
        .take(5)
        .filter(|f| f.trim().parse::<f64>().is_err())
        .count();
    non_numeric > checked / 2
}

/// The first column is an id column if its first data value is not a number
pub fn detect_id_column(lines: &[&str], has_header: bool, delimiter: char) -> Option<usize> {
    let first_row = lines.get(usize::from(has_header))?;
    let first_field = first_row.split(delimiter).next()?.trim();
    first_field.parse::<f64>().is_err().then_some(0)
}

impl CsvLoader {
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_id_column(mut self, column: usize) -> Self {
        self.id_column = Some(column);
        self
    }

    /// Parse CSV text
    pub fn parse(&self, content: &str, delimiter: char) -> Result<SampleData, LoaderError> {
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return Err(LoaderError::EmptyData);
        }

        let has_header = self.has_header.unwrap_or_else(|| detect_header(lines[0], delimiter));
        let id_col = self.id_column.or_else(|| detect_id_column(&lines, has_header, delimiter));

        let mut rows = Vec::new();
        let mut ids = Vec::new();
        let mut expected: Option<usize> = None;

        for (line_num, line) in lines.iter().enumerate().skip(usize::from(has_header)) {
            let mut values = Vec::new();
            for (col, field) in line.split(delimiter).map(str::trim).enumerate() {
                if Some(col) == id_col {
                    ids.push(field.to_string());
                    continue;
                }
                let value = field.parse::<f32>().map_err(|_| {
                    LoaderError::InvalidFormat(format!(
                        "Invalid number '{}' at line {}",
                        field,
                        line_num + 1
                    ))
                })?;
                values.push(value);
            }

            match expected {
                None => expected = Some(values.len()),
                Some(d) if d != values.len() => {
                    return Err(LoaderError::DimensionMismatch {
                        row: rows.len(),
                        expected: d,
                        got: values.len(),
                    });
                }
                _ => {}
            }
            rows.push(values);
        }

        if rows.is_empty() {
            return Err(LoaderError::EmptyData);
        }

        Ok(SampleData {
            rows,
            ids: id_col.map(|_| ids),
        })
    }
}

fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => '\t',
        _ => ',',
    }
}

impl DataLoader for CsvLoader {
    fn load(&self, path: &Path) -> Result<SampleData, LoaderError> {
        let content = fs::read_to_string(path)?;
        self.parse(&content, delimiter_for(path))
    }

    fn supports(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
            Some("csv") | Some("tsv") | Some("txt")
        )
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_header() {
        assert!(detect_header("id,dim_0,dim_1", ','));
        assert!(detect_header("a,b,c,d,e,f", ','));
        assert!(!detect_header("0.1,0.2,0.3", ','));
        assert!(!detect_header("1e-3\t-2.5", '\t'));
    }

    #[test]
    fn test_parse_simple() {
        let data = CsvLoader::default().parse("1.0,2.0,3.0\n4.0,5.0,6.0\n", ',').unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.dimension(), 3);
        assert!(data.ids.is_none());
    }

    #[test]
    fn test_parse_with_header_and_ids() {
        let content = "id,dim_0,dim_1\ncell_1,0.1,0.2\ncell_2,0.3,0.4\n";
        let data = CsvLoader::default().parse(content, ',').unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.dimension(), 2);
        assert_eq!(data.ids, Some(vec!["cell_1".to_string(), "cell_2".to_string()]));
        assert_eq!(data.rows[1], vec![0.3, 0.4]);
    }

    #[test]
    fn test_explicit_settings_override_detection() {
        // numeric first column treated as id when asked
        let data = CsvLoader::default()
            .with_header(false)
            .with_id_column(0)
            .parse("7,1.0\n8,2.0\n", ',')
            .unwrap();
        assert_eq!(data.dimension(), 1);
        assert_eq!(data.ids, Some(vec!["7".to_string(), "8".to_string()]));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let data = CsvLoader::default().parse("1,2\n\n3,4\n\n", ',').unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_error() {
        let err = CsvLoader::default().parse("1,2,3\n4,5\n", ',').unwrap_err();
        assert!(matches!(err, LoaderError::DimensionMismatch { row: 1, expected: 3, got: 2 }));
    }

    #[test]
    fn test_invalid_number_error() {
        let err = CsvLoader::default().with_header(false).parse("1,2\n3,abc\n", ',').unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(CsvLoader::default().parse("", ','), Err(LoaderError::EmptyData)));
        assert!(matches!(CsvLoader::default().parse("a,b\n", ','), Err(LoaderError::EmptyData)));
    }

    #[test]
    fn test_load_tsv() {
        let file = NamedTempFile::with_suffix(".tsv").unwrap();
        std::fs::write(file.path(), "0.5\t1.5\n2.5\t3.5\n").unwrap();
        let data = CsvLoader::default().load(file.path()).unwrap();
        assert_eq!(data.rows[1], vec![2.5, 3.5]);
        assert!(CsvLoader::default().supports(file.path()));
    }
}
