use super::error::{RecordError, RecordResult};
use super::schema::RelSchema;
use super::value::Value;
use crate::file::PageId;

/// Slot identifier within a data page
pub type SlotId = usize;

/// Physical identifier for a record (page + slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

/// A single record (row) with typed values
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Create a new record
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Build a record for `schema`, checking the value count
    pub fn for_schema(schema: &RelSchema, values: Vec<Value>) -> RecordResult<Self> {
        if values.len() != schema.column_count() {
            return Err(RecordError::ArityMismatch {
                expected: schema.column_count(),
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Serialize record to `schema.record_size()` bytes.
    /// Format: [col0 data] [col1 data] ...
    pub fn serialize(&self, schema: &RelSchema) -> RecordResult<Vec<u8>> {
        if self.values.len() != schema.column_count() {
            return Err(RecordError::ArityMismatch {
                expected: schema.column_count(),
                actual: self.values.len(),
            });
        }

        let mut result = vec![0u8; schema.record_size()];
        let mut offset = 0;
        for (value, ct) in self.values.iter().zip(schema.column_types()) {
            let end = offset + ct.size();
            value.encode_into(ct, &mut result[offset..end])?;
            offset = end;
        }
        Ok(result)
    }

    /// Deserialize record from bytes according to schema
    pub fn deserialize(data: &[u8], schema: &RelSchema) -> RecordResult<Self> {
        if data.len() != schema.record_size() {
            return Err(RecordError::CorruptPage(format!(
                "expected {} record bytes, got {}",
                schema.record_size(),
                data.len()
            )));
        }

        let mut values = Vec::with_capacity(schema.column_count());
        let mut offset = 0;
        for ct in schema.column_types() {
            let end = offset + ct.size();
            values.push(Value::decode(&data[offset..end], ct)?);
            offset = end;
        }
        Ok(Record { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ColumnType;

    fn create_test_schema() -> RelSchema {
        RelSchema::new(
            "test",
            3,
            vec![ColumnType::Int, ColumnType::String(10), ColumnType::Float],
        )
        .unwrap()
    }

    #[test]
    fn test_record_serialization_layout() {
        let schema = create_test_schema();
        let record = Record::new(vec![
            Value::Int(42),
            Value::from("test"),
            Value::Float(3.25),
        ]);

        let bytes = record.serialize(&schema).unwrap();
        assert_eq!(bytes.len(), schema.record_size());
        assert_eq!(&bytes[0..4], &42i32.to_le_bytes());
        assert_eq!(&bytes[4..8], b"test");
        assert_eq!(&bytes[8..14], &[0u8; 6]);
        assert_eq!(&bytes[14..18], &3.25f32.to_le_bytes());

        let deserialized = Record::deserialize(&bytes, &schema).unwrap();
        assert_eq!(record, deserialized);
    }

    #[test]
    fn test_for_schema_arity() {
        let schema = create_test_schema();
        let result = Record::for_schema(&schema, vec![Value::Int(1)]);
        assert!(matches!(
            result,
            Err(RecordError::ArityMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_serialize_type_mismatch() {
        let schema = create_test_schema();
        let record = Record::new(vec![
            Value::from("not an int"),
            Value::from("x"),
            Value::Float(1.0),
        ]);
        assert!(matches!(
            record.serialize(&schema),
            Err(RecordError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_deserialize_wrong_length() {
        let schema = create_test_schema();
        let result = Record::deserialize(&[0u8; 3], &schema);
        assert!(matches!(result, Err(RecordError::CorruptPage(_))));
    }
}
