use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Length of a raw object id in bytes.
pub const OBJECT_ID_LEN: usize = 20;

/// Length of an object id rendered as hex.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the SHA-1 content address git assigns to an object. dagit
/// never recomputes it: loose objects get it from their storage path, packed
/// objects from the pack index. It serializes as a 40-character lowercase hex
/// string, which is also how it appears in tree entries, commits and refs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from raw hash bytes.
    pub const fn from_raw(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Create an `ObjectId` from a slice holding exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; OBJECT_ID_LEN] =
            bytes.try_into().map_err(|_| TypeError::InvalidLength {
                expected: OBJECT_ID_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self([0u8; OBJECT_ID_LEN])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OBJECT_ID_LEN]
    }

    /// The raw 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// First byte of the hash; selects the fan-out bucket in pack indexes.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 7 characters, as git abbreviates).
    pub fn short_hex(&self) -> String {
        let mut s = self.to_hex();
        s.truncate(7);
        s
    }

    /// Parse from a 40-digit hex string. Upper- and lowercase digits are
    /// accepted; the id is normalized to lowercase on output.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: OBJECT_ID_HEX_LEN,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_hex(SAMPLE).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
    }

    #[test]
    fn uppercase_hex_is_normalized() {
        let id = ObjectId::from_hex(&SAMPLE.to_uppercase()).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = ObjectId::from_hex("abc").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 40,
                actual: 3
            }
        );
    }

    #[test]
    fn non_hex_is_rejected() {
        let bad = "z".repeat(40);
        assert!(matches!(
            ObjectId::from_hex(&bad),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(ObjectId::from_slice(&[1u8; 19]).is_err());
        assert!(ObjectId::from_slice(&[1u8; 20]).is_ok());
    }

    #[test]
    fn null_is_all_zeros() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert_eq!(null.to_hex(), "0".repeat(40));
    }

    #[test]
    fn short_hex_is_7_chars() {
        let id = ObjectId::from_hex(SAMPLE).unwrap();
        assert_eq!(id.short_hex(), "ce01362");
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = ObjectId::from_hex(SAMPLE).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_via_from_str() {
        let id: ObjectId = SAMPLE.parse().unwrap();
        assert_eq!(id.first_byte(), 0xce);
    }

    proptest! {
        #[test]
        fn any_bytes_survive_hex(bytes in proptest::array::uniform20(any::<u8>())) {
            let id = ObjectId::from_raw(bytes);
            prop_assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
        }
    }
}
