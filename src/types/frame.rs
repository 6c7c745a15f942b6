use crate::types::header::{FrameType, FrameTypeTable};
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decoded frame data, one value per field definition in definition order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodedFrame {
    pub frame_type: FrameType,
    pub field_names: Arc<[String]>,
    pub values: Vec<i64>,
}

impl DecodedFrame {
    pub fn new(frame_type: FrameType, field_names: Arc<[String]>, values: Vec<i64>) -> Self {
        debug_assert_eq!(field_names.len(), values.len());
        Self {
            frame_type,
            field_names,
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.field_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field name/value pairs in definition order
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.field_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn timestamp_us(&self) -> Option<i64> {
        self.get("time")
    }

    pub fn loop_iteration(&self) -> Option<i64> {
        self.get("loopIteration")
    }
}

/// Frame statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameStats {
    pub i_frames: u32,
    pub p_frames: u32,
    pub s_frames: u32,
    pub g_frames: u32,
    pub h_frames: u32,
    pub e_frames: u32,
    pub total_frames: u32,
    pub total_bytes: u64,
    /// Number of resynchronization episodes
    pub resync_count: u32,
    /// Bytes skipped while resynchronizing
    pub skipped_bytes: u64,
}

impl FrameStats {
    pub fn record(&mut self, frame_type: FrameType) {
        match frame_type {
            FrameType::Intra => self.i_frames += 1,
            FrameType::Inter => self.p_frames += 1,
            FrameType::Slow => self.s_frames += 1,
            FrameType::Gps => self.g_frames += 1,
            FrameType::GpsHome => self.h_frames += 1,
            FrameType::Event => self.e_frames += 1,
        }
        self.total_frames += 1;
    }

    pub fn count(&self, frame_type: FrameType) -> u32 {
        match frame_type {
            FrameType::Intra => self.i_frames,
            FrameType::Inter => self.p_frames,
            FrameType::Slow => self.s_frames,
            FrameType::Gps => self.g_frames,
            FrameType::GpsHome => self.h_frames,
            FrameType::Event => self.e_frames,
        }
    }
}

/// The two most recent reconstructed values of one field
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldHistory {
    pub prev: Option<i64>,
    pub prev2: Option<i64>,
}

impl FieldHistory {
    pub fn new(prev: Option<i64>, prev2: Option<i64>) -> Self {
        Self { prev, prev2 }
    }

    pub fn push(&mut self, value: i64) {
        self.prev2 = self.prev;
        self.prev = Some(value);
    }
}

/// Per-field prediction history for one decode session.
///
/// Slots are grouped by history family (see [`FrameType::history_family`]):
/// a P-frame field reads and updates the same slot as the I-frame field of
/// the same name.
#[derive(Debug, Clone, Default)]
pub struct FrameHistory {
    slots: BTreeMap<FrameType, Vec<FieldHistory>>,
    slot_names: BTreeMap<FrameType, Vec<String>>,
    layout: BTreeMap<FrameType, Vec<usize>>,
}

impl FrameHistory {
    pub fn new(table: &FrameTypeTable) -> Self {
        let mut history = Self::default();
        for (frame_type, definition) in table.iter() {
            let family = frame_type.history_family();
            let names = history.slot_names.entry(family).or_default();
            let mut layout = Vec::with_capacity(definition.len());
            for name in definition.field_names.iter() {
                let slot = match names.iter().position(|n| n == name) {
                    Some(slot) => slot,
                    None => {
                        names.push(name.clone());
                        names.len() - 1
                    }
                };
                layout.push(slot);
            }
            history.layout.insert(frame_type, layout);
        }
        for (family, names) in &history.slot_names {
            history
                .slots
                .insert(*family, vec![FieldHistory::default(); names.len()]);
        }
        history
    }

    /// History of the field at `index` in `frame_type`'s definition
    pub fn field(&self, frame_type: FrameType, index: usize) -> FieldHistory {
        let family = frame_type.history_family();
        self.layout
            .get(&frame_type)
            .and_then(|layout| layout.get(index))
            .and_then(|&slot| self.slots.get(&family)?.get(slot))
            .copied()
            .unwrap_or_default()
    }

    /// Most recent value of a named field in a history family
    pub fn latest(&self, frame_type: FrameType, name: &str) -> Option<i64> {
        let family = frame_type.history_family();
        let slot = self.slot_names.get(&family)?.iter().position(|n| n == name)?;
        self.slots.get(&family)?.get(slot)?.prev
    }

    /// Push a fully decoded frame's values into history
    pub fn commit(&mut self, frame_type: FrameType, values: &[i64]) {
        let family = frame_type.history_family();
        let (Some(layout), Some(slots)) = (self.layout.get(&frame_type), self.slots.get_mut(&family))
        else {
            return;
        };
        for (&slot, &value) in layout.iter().zip(values) {
            if let Some(history) = slots.get_mut(slot) {
                history.push(value);
            }
        }
    }
}
