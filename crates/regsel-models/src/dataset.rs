use ndarray::{s, ArrayView1, ArrayView2, Axis};

use crate::error::{Result, TrainerError};

/// Split a `(n, m)` table into features `[:, :-1]` and label `[:, -1]`.
pub fn split_features_label(table: ArrayView2<'_, f64>) -> Result<(ArrayView2<'_, f64>, ArrayView1<'_, f64>)> {
    let (n_rows, n_cols) = table.dim();
    if n_cols < 2 {
        return Err(TrainerError::data(
            "split_features_label",
            format!(
                "expected at least one feature column plus the label, got {} column(s)",
                n_cols
            ),
        ));
    }
    if n_rows == 0 {
        return Err(TrainerError::data("split_features_label", "table has no rows"));
    }
    let label_idx = n_cols - 1;
    let label = table.index_axis_move(Axis(1), label_idx);
    let features = table.slice_move(s![.., ..label_idx]);
    Ok((features, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn label_is_last_column() {
        let table = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let (x, y) = split_features_label(table.view()).unwrap();
        assert_eq!(x, array![[1.0, 2.0], [4.0, 5.0]]);
        assert_eq!(y, array![3.0, 6.0]);
    }

    #[test]
    fn needs_a_feature_column() {
        let table = array![[1.0], [2.0]];
        assert!(split_features_label(table.view()).is_err());
    }
}
