//! Delimited numeric tables with a header row.
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::{Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A fully numeric table. Column order matches `headers`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub data: Array2<f64>,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            data: self.data.select(Axis(0), rows),
        }
    }
}

/// `\t` for `.tsv`/`.txt` files, `,` otherwise.
pub fn infer_delimiter<P: AsRef<Path>>(path: P) -> u8 {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

/// Read every column of `path` as `f64`.
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .with_context(|| format!("Failed to open table: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read header row")?
        .clone();
    let n_cols = headers.len();
    if n_cols == 0 {
        return Err(anyhow!("Table {} has no columns", path.as_ref().display()));
    }

    let mut values = Vec::new();
    let mut n_rows = 0usize;
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        if record.len() != n_cols {
            return Err(anyhow!(
                "Row {} has {} field(s), expected {}",
                row_idx + 1,
                record.len(),
                n_cols
            ));
        }
        for (col_idx, field) in record.iter().enumerate() {
            let value = field.parse::<f64>().with_context(|| {
                format!(
                    "Invalid number '{}' in column '{}' at row {}",
                    field,
                    &headers[col_idx],
                    row_idx + 1
                )
            })?;
            values.push(value);
        }
        n_rows += 1;
    }

    let data = Array2::from_shape_vec((n_rows, n_cols), values)
        .context("Failed to assemble table matrix")?;
    Ok(Table {
        headers: headers.iter().map(|h| h.to_string()).collect(),
        data,
    })
}

/// Read a table and move `label_column` (default: the last column) to the end.
pub fn read_labeled_table<P: AsRef<Path>>(
    path: P,
    delimiter: u8,
    label_column: Option<&str>,
) -> Result<Table> {
    let table = read_table(&path, delimiter)?;
    if table.headers.len() < 2 {
        return Err(anyhow!(
            "Table {} needs at least one feature column and a label column",
            path.as_ref().display()
        ));
    }

    let last = table.headers.len() - 1;
    let label_idx = match label_column {
        Some(name) => table
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("Missing label column '{}'", name))?,
        None => last,
    };
    if label_idx == last {
        return Ok(table);
    }

    let order: Vec<usize> = (0..table.headers.len())
        .filter(|&i| i != label_idx)
        .chain(std::iter::once(label_idx))
        .collect();
    Ok(Table {
        headers: order.iter().map(|&i| table.headers[i].clone()).collect(),
        data: table.data.select(Axis(1), &order),
    })
}

/// Write `table` with its header row, creating parent directories.
pub fn write_table<P: AsRef<Path>>(path: P, table: &Table, delimiter: u8) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer
        .write_record(&table.headers)
        .context("Failed to write header row")?;
    for row in table.data.outer_iter() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .context("Failed to write row")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Shuffle rows with a seeded RNG and split them into train and test tables.
///
/// The test split holds `ceil((1 - train_fraction) * n)` rows; both splits
/// must end up non-empty.
pub fn train_test_split(table: &Table, train_fraction: f64, seed: u64) -> Result<(Table, Table)> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(anyhow!(
            "train_fraction must be strictly between 0 and 1, got {}",
            train_fraction
        ));
    }
    let n = table.n_rows();
    let n_test = ((1.0 - train_fraction) * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(anyhow!(
            "Cannot split {} row(s) with train_fraction {}: one side would be empty",
            n,
            train_fraction
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((table.select_rows(train_idx), table.select_rows(test_idx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_numeric_table() {
        let file = csv_file("a,b,y\n1,2,3\n4,5,6\n");
        let table = read_table(file.path(), b',').unwrap();
        assert_eq!(table.headers, vec!["a", "b", "y"]);
        assert_eq!(table.data.dim(), (2, 3));
        assert_eq!(table.data[[1, 2]], 6.0);
    }

    #[test]
    fn moves_label_to_the_end() {
        let file = csv_file("y,a,b\n3,1,2\n6,4,5\n");
        let table = read_labeled_table(file.path(), b',', Some("y")).unwrap();
        assert_eq!(table.headers, vec!["a", "b", "y"]);
        assert_eq!(table.data.row(0).to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn reports_bad_cells() {
        let file = csv_file("a,y\n1,oops\n");
        let err = read_table(file.path(), b',').unwrap_err();
        assert!(format!("{:#}", err).contains("oops"));

        let file = csv_file("a,y\n1,2\n");
        assert!(read_labeled_table(file.path(), b',', Some("target")).is_err());
    }

    #[test]
    fn split_is_seeded_and_disjoint() {
        let data = Array2::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f64);
        let table = Table {
            headers: vec!["x".to_string(), "y".to_string()],
            data,
        };
        let (train, test) = train_test_split(&table, 0.8, 42).unwrap();
        assert_eq!(train.n_rows(), 8);
        assert_eq!(test.n_rows(), 2);

        let (train2, _) = train_test_split(&table, 0.8, 42).unwrap();
        assert_eq!(train, train2);

        let mut firsts: Vec<f64> = train
            .data
            .column(0)
            .iter()
            .chain(test.data.column(0).iter())
            .copied()
            .collect();
        firsts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(firsts, (0..10).map(|i| (i * 2) as f64).collect::<Vec<_>>());

        assert!(train_test_split(&table, 1.0, 42).is_err());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("t.csv");
        let table = Table {
            headers: vec!["x".to_string(), "y".to_string()],
            data: ndarray::array![[0.5, 1.25], [-3.0, 1e-7]],
        };
        write_table(&path, &table, b',').unwrap();
        assert_eq!(read_table(&path, infer_delimiter(&path)).unwrap(), table);
    }
}
