//! Pluggable encodings for session values

use serde_json::{Map, Value};

use crate::error::SessionError;
use crate::session::{SessionKey, SessionValues};

/// Converts session values to and from the byte payload kept in the store.
///
/// `deserialize` merges into `values` rather than replacing it.
pub trait SessionSerializer: Send + Sync + 'static {
    /// Encode session values
    fn serialize(&self, values: &SessionValues) -> Result<Vec<u8>, SessionError>;

    /// Decode a payload into `values`
    fn deserialize(&self, data: &[u8], values: &mut SessionValues) -> Result<(), SessionError>;
}

/// JSON encoding of session values.
///
/// Every key must be [`SessionKey::Text`]; the payload is a plain JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SessionSerializer for JsonSerializer {
    fn serialize(&self, values: &SessionValues) -> Result<Vec<u8>, SessionError> {
        let mut map = Map::with_capacity(values.len());
        for (key, value) in values {
            match key {
                SessionKey::Text(k) => {
                    map.insert(k.clone(), value.clone());
                }
                other => return Err(SessionError::UnsupportedKeyType(other.to_string())),
            }
        }
        Ok(serde_json::to_vec(&map)?)
    }

    fn deserialize(&self, data: &[u8], values: &mut SessionValues) -> Result<(), SessionError> {
        let map: Map<String, Value> = serde_json::from_slice(data)?;
        values.extend(map.into_iter().map(|(k, v)| (SessionKey::Text(k), v)));
        Ok(())
    }
}

/// MessagePack encoding of session values.
///
/// Compact, and keeps integer keys and the distinction between integer and
/// float numbers. Custom types are recovered by naming them at the read site,
/// e.g. `session.get::<Flash>("flash")`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackSerializer;

impl SessionSerializer for MsgPackSerializer {
    fn serialize(&self, values: &SessionValues) -> Result<Vec<u8>, SessionError> {
        Ok(rmp_serde::to_vec(values)?)
    }

    fn deserialize(&self, data: &[u8], values: &mut SessionValues) -> Result<(), SessionError> {
        let decoded: SessionValues = rmp_serde::from_slice(data)?;
        values.extend(decoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct FlashMessage {
        kind: i32,
        message: String,
    }

    fn sample_values() -> SessionValues {
        let mut values = SessionValues::new();
        values.insert("user".into(), json!("alice"));
        values.insert("visits".into(), json!(42));
        values.insert("ratio".into(), json!(0.5));
        values.insert("tags".into(), json!(["a", "b"]));
        values.insert(
            "flash".into(),
            serde_json::to_value(FlashMessage {
                kind: 42,
                message: "foo".to_string(),
            })
            .unwrap(),
        );
        values
    }

    #[test]
    fn test_json_round_trip() {
        let values = sample_values();
        let bytes = JsonSerializer.serialize(&values).unwrap();

        let mut decoded = SessionValues::new();
        JsonSerializer.deserialize(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_json_rejects_non_string_key() {
        let mut values = sample_values();
        values.insert(SessionKey::Int(1), json!(true));

        let err = JsonSerializer.serialize(&values).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedKeyType(k) if k == "1"));
    }

    #[test]
    fn test_json_deserialize_merges() {
        let mut values = SessionValues::new();
        values.insert("kept".into(), json!(1));
        values.insert("user".into(), json!("bob"));

        JsonSerializer
            .deserialize(br#"{"user":"alice"}"#, &mut values)
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[&SessionKey::from("kept")], json!(1));
        assert_eq!(values[&SessionKey::from("user")], json!("alice"));
    }

    #[test]
    fn test_json_invalid_payload() {
        let mut values = SessionValues::new();
        let err = JsonSerializer.deserialize(b"not json", &mut values).unwrap_err();
        assert!(matches!(err, SessionError::Serialization(_)));
    }

    #[test]
    fn test_msgpack_round_trip_with_int_keys() {
        let mut values = sample_values();
        values.insert(SessionKey::Int(-7), json!({"nested": [1, 2.5, null]}));
        values.insert(SessionKey::Int(1 << 40), json!(u64::MAX));

        let bytes = MsgPackSerializer.serialize(&values).unwrap();
        let mut decoded = SessionValues::new();
        MsgPackSerializer.deserialize(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, values);

        let flash: FlashMessage =
            serde_json::from_value(decoded[&SessionKey::from("flash")].clone()).unwrap();
        assert_eq!(flash.message, "foo");
    }

    #[test]
    fn test_msgpack_is_more_compact() {
        let values = sample_values();
        let json = JsonSerializer.serialize(&values).unwrap();
        let msgpack = MsgPackSerializer.serialize(&values).unwrap();
        assert!(msgpack.len() < json.len());
    }

    #[test]
    fn test_msgpack_invalid_payload() {
        let mut values = SessionValues::new();
        let err = MsgPackSerializer
            .deserialize(&[0xc1], &mut values)
            .unwrap_err();
        assert!(matches!(err, SessionError::Serialization(_)));
    }
}
