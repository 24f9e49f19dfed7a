//! Hex encoding helpers for serde.
//!
//! All byte fields are rendered as `0x`-prefixed lowercase hex strings, the
//! way the beacon API encodes them. The prefix is optional on input.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn decode_prefixed<E: serde::de::Error>(s: &str) -> Result<Vec<u8>, E> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(E::custom)
}

/// Fixed-size byte arrays (`[u8; N]`).
pub mod fixed {
    use super::{decode_prefixed, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = decode_prefixed::<D::Error>(&s)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes")))
    }
}

/// Variable-length byte buffers.
pub mod bytes {
    use super::{decode_prefixed, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode_prefixed::<D::Error>(&s)
    }
}

/// `Vec<[u8; 32]>` as a list of hex strings (Merkle branches, field roots).
pub mod roots {
    use super::{decode_prefixed, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(data: &[[u8; 32]], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let hex_strings: Vec<String> = data.iter().map(|h| format!("0x{}", hex::encode(h))).collect();
        hex_strings.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_strings: Vec<String> = Vec::deserialize(deserializer)?;
        hex_strings
            .into_iter()
            .map(|s| {
                let bytes = decode_prefixed::<D::Error>(&s)?;
                bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
            })
            .collect()
    }
}
