//! All-or-nothing validation of column-major row batches.

use super::{ColumnBatch, StorageError, StorageResult};
use crate::model::collection::Designator;
use crate::model::value::{Value, ValueKind};

/// Batch checked against a schema, columns reordered to schema order.
#[derive(Debug)]
pub struct ValidatedBatch<'a> {
    /// Number of rows the batch produces.
    pub len: usize,
    /// One column per designator, in registration order.
    pub columns: Vec<&'a [Value]>,
    /// Designator kinds after this batch is applied.
    pub kinds: Vec<Option<ValueKind>>,
}

impl ValidatedBatch<'_> {
    /// Values of batch row `position`, in registration order.
    pub fn row(&self, position: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| column[position].clone())
            .collect()
    }
}

/// Validates `batch` against `designators`.
///
/// # Errors
/// - `SchemaNotDefined` when the collection has no designators.
/// - `UnknownDesignator` for a key outside the schema.
/// - `MissingDesignator` when a designator has no column.
/// - `ColumnLengthMismatch` when columns differ in length.
/// - `TypeMismatch` when a non-null value contradicts the designator kind.
pub fn validate_batch<'a>(
    designators: &[Designator],
    batch: &'a ColumnBatch,
) -> StorageResult<ValidatedBatch<'a>> {
    if designators.is_empty() {
        return Err(StorageError::SchemaNotDefined);
    }

    if let Some(unknown) = batch
        .keys()
        .find(|key| !designators.iter().any(|designator| designator.id == **key))
    {
        return Err(StorageError::UnknownDesignator(*unknown));
    }

    let mut columns = Vec::with_capacity(designators.len());
    for designator in designators {
        let column = batch
            .get(&designator.id)
            .ok_or(StorageError::MissingDesignator(designator.id))?;
        columns.push(column.as_slice());
    }

    let len = columns[0].len();
    for (designator, column) in designators.iter().zip(&columns) {
        if column.len() != len {
            return Err(StorageError::ColumnLengthMismatch {
                designator: designator.id,
                expected: len,
                actual: column.len(),
            });
        }
    }

    let mut kinds = Vec::with_capacity(designators.len());
    for (designator, column) in designators.iter().zip(&columns) {
        let mut kind = designator.kind;
        for value in column.iter().filter(|value| !value.is_null()) {
            match kind {
                None => kind = Some(value.kind()),
                Some(expected) if expected != value.kind() => {
                    return Err(StorageError::TypeMismatch {
                        designator: designator.id,
                        expected,
                        actual: value.kind(),
                    });
                }
                Some(_) => {}
            }
        }
        kinds.push(kind);
    }

    Ok(ValidatedBatch {
        len,
        columns,
        kinds,
    })
}

#[cfg(test)]
mod tests {
    use super::validate_batch;
    use crate::model::collection::Designator;
    use crate::model::value::{Value, ValueKind};
    use crate::storage::{ColumnBatch, StorageError};

    fn designators() -> Vec<Designator> {
        vec![
            Designator {
                id: 0,
                name: "a".to_string(),
                kind: None,
            },
            Designator {
                id: 1,
                name: "b".to_string(),
                kind: Some(ValueKind::Text),
            },
        ]
    }

    #[test]
    fn reorders_columns_and_infers_kinds() {
        let mut batch = ColumnBatch::new();
        batch.insert(1, vec![Value::from("x"), Value::Null]);
        batch.insert(0, vec![Value::Null, Value::from(4)]);

        let validated = validate_batch(&designators(), &batch).expect("batch should validate");
        assert_eq!(validated.len, 2);
        assert_eq!(validated.row(1), vec![Value::from(4), Value::Null]);
        assert_eq!(
            validated.kinds,
            vec![Some(ValueKind::Integer), Some(ValueKind::Text)]
        );
    }

    #[test]
    fn rejects_unknown_and_missing_designators() {
        let mut unknown = ColumnBatch::new();
        unknown.insert(0, vec![]);
        unknown.insert(1, vec![]);
        unknown.insert(7, vec![]);
        let err = validate_batch(&designators(), &unknown).expect_err("unknown must fail");
        assert!(matches!(err, StorageError::UnknownDesignator(7)));

        let mut missing = ColumnBatch::new();
        missing.insert(0, vec![Value::from(1)]);
        let err = validate_batch(&designators(), &missing).expect_err("missing must fail");
        assert!(matches!(err, StorageError::MissingDesignator(1)));
    }

    #[test]
    fn rejects_mismatched_lengths_and_kinds() {
        let mut uneven = ColumnBatch::new();
        uneven.insert(0, vec![Value::from(1), Value::from(2)]);
        uneven.insert(1, vec![Value::from("x")]);
        let err = validate_batch(&designators(), &uneven).expect_err("uneven must fail");
        assert!(matches!(
            err,
            StorageError::ColumnLengthMismatch {
                designator: 1,
                expected: 2,
                actual: 1
            }
        ));

        let mut mistyped = ColumnBatch::new();
        mistyped.insert(0, vec![Value::from(1)]);
        mistyped.insert(1, vec![Value::from(2)]);
        let err = validate_batch(&designators(), &mistyped).expect_err("mistyped must fail");
        assert!(matches!(err, StorageError::TypeMismatch { designator: 1, .. }));
    }

    #[test]
    fn rejects_batches_before_schema() {
        let err = validate_batch(&[], &ColumnBatch::new()).expect_err("no schema must fail");
        assert!(matches!(err, StorageError::SchemaNotDefined));
    }
}
