//! Forward-fill of missing cells.
//!
//! Two passes over the table: the first locates, per column, the first row
//! that holds a value and rejects the table if that row is not row zero; the
//! second copies the last seen value of each column into every missing cell.

use crate::error::NormalizeError;
use crate::types::FeatureValue;

pub(crate) fn forward_fill(
    columns: &[String],
    rows: &[Vec<FeatureValue>],
) -> Result<Vec<Vec<FeatureValue>>, NormalizeError> {
    let Some(first) = rows.first() else {
        return Err(NormalizeError::EmptyDataset);
    };
    if let Some(col) = first.iter().position(FeatureValue::is_missing) {
        return Err(NormalizeError::LeadingMissing {
            column: columns[col].clone(),
        });
    }

    let mut last_seen: Vec<&FeatureValue> = first.iter().collect();
    let mut filled = Vec::with_capacity(rows.len());
    for row in rows {
        let mut out = Vec::with_capacity(row.len());
        for (col, cell) in row.iter().enumerate() {
            if cell.is_missing() {
                out.push(last_seen[col].clone());
            } else {
                last_seen[col] = cell;
                out.push(cell.clone());
            }
        }
        filled.push(out);
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fills_from_nearest_earlier_row() {
        let rows = vec![
            vec![FeatureValue::Number(1.0), FeatureValue::from("x")],
            vec![FeatureValue::Missing, FeatureValue::from("y")],
            vec![FeatureValue::Missing, FeatureValue::Missing],
            vec![FeatureValue::Number(4.0), FeatureValue::Missing],
        ];
        let filled = forward_fill(&cols(&["A", "B"]), &rows).unwrap();

        let a: Vec<_> = filled.iter().map(|r| r[0].clone()).collect();
        let b: Vec<_> = filled.iter().map(|r| r[1].clone()).collect();
        assert_eq!(
            a,
            vec![1.0, 1.0, 1.0, 4.0]
                .into_iter()
                .map(FeatureValue::Number)
                .collect::<Vec<_>>()
        );
        assert_eq!(
            b,
            vec!["x", "y", "y", "y"]
                .into_iter()
                .map(FeatureValue::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn leading_missing_fails_fast() {
        let rows = vec![
            vec![FeatureValue::Number(1.0), FeatureValue::Missing],
            vec![FeatureValue::Number(2.0), FeatureValue::from("y")],
        ];
        let err = forward_fill(&cols(&["A", "B"]), &rows).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::LeadingMissing {
                column: "B".into()
            }
        );
    }

    #[test]
    fn empty_table_is_rejected() {
        assert_eq!(
            forward_fill(&cols(&["A"]), &[]).unwrap_err(),
            NormalizeError::EmptyDataset
        );
    }
}
