use crate::parser::decoder::{Encoding, Predictor};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Frame types recognised in the binary stream, keyed by their marker byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameType {
    /// `I`: intra frame, absolute values
    Intra,
    /// `P`: inter frame, deltas against I/P history
    Inter,
    /// `S`: slow frame
    Slow,
    /// `G`: GPS frame
    Gps,
    /// `H`: GPS home frame
    GpsHome,
    /// `E`: event frame
    Event,
}

impl FrameType {
    pub const ALL: [FrameType; 6] = [
        FrameType::Intra,
        FrameType::Inter,
        FrameType::Slow,
        FrameType::Gps,
        FrameType::GpsHome,
        FrameType::Event,
    ];

    pub fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            b'I' => Some(FrameType::Intra),
            b'P' => Some(FrameType::Inter),
            b'S' => Some(FrameType::Slow),
            b'G' => Some(FrameType::Gps),
            b'H' => Some(FrameType::GpsHome),
            b'E' => Some(FrameType::Event),
            _ => None,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.as_bytes() {
            [byte] => Self::from_marker(*byte),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            FrameType::Intra => 'I',
            FrameType::Inter => 'P',
            FrameType::Slow => 'S',
            FrameType::Gps => 'G',
            FrameType::GpsHome => 'H',
            FrameType::Event => 'E',
        }
    }

    /// Frame type whose history slots this frame type reads and updates.
    /// P frames are deltas against I/P reconstructions, so both share I's slots.
    pub fn history_family(self) -> FrameType {
        match self {
            FrameType::Inter => FrameType::Intra,
            other => other,
        }
    }

    /// Main frames carry the flight-loop fields (`time`, `gyroADC[n]`, ...).
    pub fn is_main(self) -> bool {
        matches!(self, FrameType::Intra | FrameType::Inter)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

/// Field definition for a frame type
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldDefinition {
    pub name: String,
    pub signed: bool,
    pub predictor: Predictor,
    pub encoding: Encoding,
}

/// Ordered field definitions of one frame type
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameDefinition {
    pub fields: Vec<FieldDefinition>,
    /// Field names in definition order, shared with every decoded frame of this type
    pub field_names: Arc<[String]>,
}

impl FrameDefinition {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        let field_names: Arc<[String]> = fields.iter().map(|f| f.name.clone()).collect();
        Self {
            fields,
            field_names,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == name)
    }
}

/// Field definitions per frame type, fixed once the header is parsed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameTypeTable {
    definitions: BTreeMap<FrameType, FrameDefinition>,
}

impl FrameTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame_type: FrameType, definition: FrameDefinition) {
        self.definitions.insert(frame_type, definition);
    }

    pub fn get(&self, frame_type: FrameType) -> Option<&FrameDefinition> {
        self.definitions.get(&frame_type)
    }

    pub fn contains(&self, frame_type: FrameType) -> bool {
        self.definitions.contains_key(&frame_type)
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameType, &FrameDefinition)> {
        self.definitions.iter().map(|(t, d)| (*t, d))
    }
}

/// Free-form `H key:value` metadata, in first-seen order with last-value-wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a header value as an integer
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.trim().parse().ok()
    }

    /// Parse a comma-separated header value such as `motorOutput:48,2047`
    pub fn get_int_list(&self, key: &str) -> Option<Vec<i64>> {
        self.get(key)?
            .split(',')
            .map(|v| v.trim().parse().ok())
            .collect()
    }

    pub fn firmware_revision(&self) -> Option<&str> {
        self.get("Firmware revision")
    }

    pub fn board_info(&self) -> Option<&str> {
        self.get("Board information")
    }

    pub fn craft_name(&self) -> Option<&str> {
        self.get("Craft name")
    }

    pub fn data_version(&self) -> Option<i64> {
        self.get_int("Data version")
    }

    pub fn looptime(&self) -> Option<i64> {
        self.get_int("looptime")
    }
}

#[cfg(feature = "serde")]
impl Serialize for Headers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> serde::de::Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to values")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    headers.insert(key, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}
