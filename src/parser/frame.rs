use crate::error::{BBLError, Result};
use crate::parser::decoder::{
    predict, predict_from_history, reconstruct, Encoding, PredictionContext, Predictor,
};
use crate::parser::stream::BBLDataStream;
use crate::types::{
    DecodedFrame, FieldDefinition, FrameDefinition, FrameHistory, FrameType, FrameTypeTable,
    Headers,
};
use log::trace;

/// Decodes the field payload of one frame against its definition.
///
/// Holds the header-derived values the context predictors need; all mutable
/// session state lives in the [`FrameHistory`] passed to [`FrameDecoder::decode`].
#[derive(Debug)]
pub struct FrameDecoder<'t> {
    table: &'t FrameTypeTable,
    minthrottle: Option<i64>,
    min_motor: Option<i64>,
}

impl<'t> FrameDecoder<'t> {
    pub fn new(table: &'t FrameTypeTable, headers: &Headers) -> Self {
        Self {
            table,
            minthrottle: headers.get_int("minthrottle"),
            min_motor: headers
                .get_int_list("motorOutput")
                .and_then(|outputs| outputs.first().copied()),
        }
    }

    pub fn table(&self) -> &'t FrameTypeTable {
        self.table
    }

    /// Decode one frame with `stream` positioned just after its marker byte.
    ///
    /// History is only updated when every field decoded; an error leaves it
    /// exactly as it was.
    pub fn decode(
        &self,
        frame_type: FrameType,
        stream: &mut BBLDataStream,
        history: &mut FrameHistory,
    ) -> Result<DecodedFrame> {
        let definition = self.table.get(frame_type).ok_or_else(|| {
            BBLError::InvalidFrame(format!("no field definitions for frame type '{frame_type}'"))
        })?;

        let field_count = definition.len();
        let mut values = vec![0i64; field_count];
        let mut group = [0i32; 8];
        let mut i = 0;

        while i < field_count {
            let field = &definition.fields[i];
            let count = match field.encoding {
                Encoding::Unsupported(id) => return Err(BBLError::InvalidEncoding(id)),
                Encoding::Tag8_8SVB => {
                    let count = definition.fields[i..]
                        .iter()
                        .take(8)
                        .take_while(|f| f.encoding == Encoding::Tag8_8SVB)
                        .count();
                    stream.read_tag8_8svb(&mut group, count)?;
                    count
                }
                Encoding::Tag2_3S32 => {
                    stream.read_tag2_3s32(&mut group)?;
                    field.encoding.group_size().min(field_count - i)
                }
                Encoding::Tag8_4S16 => {
                    stream.read_tag8_4s16(&mut group)?;
                    field.encoding.group_size().min(field_count - i)
                }
                _ => {
                    let decoded = read_field(stream, field)?;
                    values[i] = self.resolve(frame_type, definition, i, decoded, &values, history)?;
                    i += 1;
                    continue;
                }
            };

            for j in 0..count {
                values[i + j] = self.resolve(
                    frame_type,
                    definition,
                    i + j,
                    i64::from(group[j]),
                    &values,
                    history,
                )?;
            }
            i += count;
        }

        history.commit(frame_type, &values);
        trace!("Decoded {frame_type} frame: {values:?}");

        Ok(DecodedFrame::new(
            frame_type,
            definition.field_names.clone(),
            values,
        ))
    }

    /// Turn a decoded value into the field's absolute value
    fn resolve(
        &self,
        frame_type: FrameType,
        definition: &FrameDefinition,
        index: usize,
        decoded: i64,
        current: &[i64],
        history: &FrameHistory,
    ) -> Result<i64> {
        let field = &definition.fields[index];
        let field_history = history.field(frame_type, index);
        let base = match predict_from_history(field.predictor, field_history) {
            Some(base) => base,
            None => {
                let context = self.context(field, definition, index, current, history);
                predict(field.predictor, field_history, &context)?
            }
        };
        Ok(reconstruct(field.predictor, decoded, base))
    }

    fn context(
        &self,
        field: &FieldDefinition,
        definition: &FrameDefinition,
        index: usize,
        current: &[i64],
        history: &FrameHistory,
    ) -> PredictionContext {
        let mut context = PredictionContext {
            minthrottle: self.minthrottle,
            min_motor: self.min_motor,
            ..PredictionContext::default()
        };
        match field.predictor {
            Predictor::Motor0 => {
                // only fields decoded earlier in this frame are usable
                context.motor0 = definition
                    .position("motor[0]")
                    .filter(|&pos| pos < index)
                    .map(|pos| current[pos]);
            }
            Predictor::HomeCoord => {
                context.home_coord = home_field_name(&field.name)
                    .and_then(|home| history.latest(FrameType::GpsHome, &home));
            }
            Predictor::LastMainFrameTime => {
                context.last_main_frame_time = history.latest(FrameType::Intra, "time");
            }
            _ => {}
        }
        context
    }
}

/// Read one field whose encoding is not a packed group
fn read_field(stream: &mut BBLDataStream, field: &FieldDefinition) -> Result<i64> {
    let value = match field.encoding {
        Encoding::SignedVB => i64::from(stream.read_signed_vb()?),
        Encoding::UnsignedVB => {
            let raw = stream.read_unsigned_vb()?;
            if field.signed {
                i64::from(raw as i32)
            } else {
                i64::from(raw)
            }
        }
        Encoding::Neg14Bit => i64::from(stream.read_neg_14bit()?),
        Encoding::Null => 0,
        Encoding::Unsupported(id) => return Err(BBLError::InvalidEncoding(id)),
        Encoding::Tag8_8SVB | Encoding::Tag2_3S32 | Encoding::Tag8_4S16 => {
            return Err(BBLError::InvalidFrame(format!(
                "field '{}' uses a group encoding",
                field.name
            )))
        }
    };
    Ok(value)
}

/// `GPS_coord[n]` is predicted from `GPS_home[n]`
fn home_field_name(name: &str) -> Option<String> {
    let index = name.strip_prefix("GPS_coord[")?.strip_suffix(']')?;
    Some(format!("GPS_home[{index}]"))
}
