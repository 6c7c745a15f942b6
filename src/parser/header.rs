use crate::error::{BBLError, Result};
use crate::parser::decoder::{Encoding, Predictor};
use crate::types::{FieldDefinition, FrameDefinition, FrameType, FrameTypeTable, Headers};
use log::{debug, trace, warn};
use std::collections::{BTreeMap, BTreeSet};

const HEADER_PREFIX: &[u8] = b"H ";

/// Attribute lines seen so far for one frame type
#[derive(Debug, Default)]
struct AttributeLines {
    names: Option<Vec<String>>,
    signed: Option<Vec<bool>>,
    predictors: Option<Vec<Predictor>>,
    encodings: Option<Vec<Encoding>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Name,
    Signed,
    Predictor,
    Encoding,
}

impl Attribute {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "name" => Some(Attribute::Name),
            "signed" => Some(Attribute::Signed),
            "predictor" => Some(Attribute::Predictor),
            "encoding" => Some(Attribute::Encoding),
            _ => None,
        }
    }
}

/// Parsed text header of one log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub headers: Headers,
    pub frame_table: FrameTypeTable,
    /// Offset of the first byte of the binary frame stream
    pub binary_start: usize,
}

/// Find where the header block ends: the first line that does not start with `H `.
/// A trailing `H ` line without a newline belongs to the binary stream.
pub fn find_header_end(data: &[u8]) -> usize {
    let mut pos = 0;
    while data[pos..].starts_with(HEADER_PREFIX) {
        match data[pos..].iter().position(|&b| b == b'\n') {
            Some(newline) => pos += newline + 1,
            None => break,
        }
    }
    pos
}

/// Parse the header block at the start of `data`
pub fn parse_header(data: &[u8], default_schema: bool) -> Result<ParsedHeader> {
    let binary_start = find_header_end(data);
    if binary_start == 0 {
        return Err(BBLError::InvalidHeader("no header lines found".into()));
    }

    let header_text = String::from_utf8_lossy(&data[..binary_start]);
    let (headers, frame_table) = parse_headers_from_text(&header_text, default_schema)?;

    debug!(
        "Header: {} metadata entries, {} frame types, binary data at offset {}",
        headers.len(),
        frame_table.len(),
        binary_start
    );

    Ok(ParsedHeader {
        headers,
        frame_table,
        binary_start,
    })
}

/// Parse BBL headers from text into metadata and field definitions
pub fn parse_headers_from_text(
    header_text: &str,
    default_schema: bool,
) -> Result<(Headers, FrameTypeTable)> {
    let mut headers = Headers::new();
    let mut pending: BTreeMap<FrameType, AttributeLines> = BTreeMap::new();
    let mut line_count = 0;

    for line in header_text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix("H ") else {
            return Err(BBLError::InvalidHeader(format!(
                "line is not a header line: '{line}'"
            )));
        };
        line_count += 1;
        trace!("Processing header: {line}");

        let Some((key, value)) = body.split_once(':') else {
            return Err(BBLError::InvalidHeader(format!(
                "missing ':' in header line '{line}'"
            )));
        };
        let key = key.trim();
        let value = value.trim();

        match key.strip_prefix("Field ") {
            Some(selector) => parse_field_line(selector, value, &mut pending)?,
            None => headers.insert(key, value),
        }
    }

    if line_count == 0 {
        return Err(BBLError::InvalidHeader("no header lines found".into()));
    }

    let mut frame_table = build_frame_table(pending)?;

    if frame_table.is_empty() {
        if !default_schema {
            return Err(BBLError::InvalidHeader(
                "header contains no field definitions".into(),
            ));
        }
        warn!("Header has no field definitions, using the default main-frame schema");
        frame_table = default_frame_table();
    }

    Ok((headers, frame_table))
}

/// Parse `<tag> <attribute>` (or `<attribute> <tag>`) and its value list
fn parse_field_line(
    selector: &str,
    value: &str,
    pending: &mut BTreeMap<FrameType, AttributeLines>,
) -> Result<()> {
    let tokens: Vec<&str> = selector.split_whitespace().collect();
    let (frame_type, attribute) = match tokens.as_slice() {
        [a, b] => match (FrameType::from_tag(a), Attribute::parse(b)) {
            (Some(t), Some(attr)) => (t, attr),
            _ => match (Attribute::parse(a), FrameType::from_tag(b)) {
                (Some(attr), Some(t)) => (t, attr),
                _ => {
                    return Err(BBLError::InvalidHeader(format!(
                        "unrecognised field definition 'Field {selector}'"
                    )))
                }
            },
        },
        _ => {
            return Err(BBLError::InvalidHeader(format!(
                "unrecognised field definition 'Field {selector}'"
            )))
        }
    };

    if frame_type == FrameType::Event {
        return Err(BBLError::InvalidHeader(
            "event frames have a fixed layout and take no field definitions".into(),
        ));
    }

    let entries: Vec<&str> = if value.is_empty() {
        Vec::new()
    } else {
        value.split(',').map(str::trim).collect()
    };

    let lines = pending.entry(frame_type).or_default();
    match attribute {
        Attribute::Name => {
            lines.names = Some(entries.iter().map(|s| s.to_string()).collect());
        }
        Attribute::Signed => {
            let signed = entries
                .iter()
                .map(|s| match *s {
                    "0" => Ok(false),
                    "1" => Ok(true),
                    other => Err(BBLError::InvalidHeader(format!(
                        "invalid signed flag '{other}' for frame type '{frame_type}'"
                    ))),
                })
                .collect::<Result<Vec<bool>>>()?;
            lines.signed = Some(signed);
        }
        Attribute::Predictor => {
            let ids = parse_ids(&entries, frame_type, "predictor")?;
            lines.predictors = Some(ids.into_iter().map(Predictor::from_id).collect());
        }
        Attribute::Encoding => {
            let ids = parse_ids(&entries, frame_type, "encoding")?;
            lines.encodings = Some(ids.into_iter().map(Encoding::from_id).collect());
        }
    }
    Ok(())
}

fn parse_ids(entries: &[&str], frame_type: FrameType, attribute: &str) -> Result<Vec<u8>> {
    entries
        .iter()
        .map(|s| {
            s.parse::<u8>().map_err(|_| {
                BBLError::InvalidHeader(format!(
                    "invalid {attribute} value '{s}' for frame type '{frame_type}'"
                ))
            })
        })
        .collect()
}

fn build_frame_table(mut pending: BTreeMap<FrameType, AttributeLines>) -> Result<FrameTypeTable> {
    // P frames inherit field names and signedness from I frames when not given
    let (i_names, i_signed) = pending
        .get(&FrameType::Intra)
        .map(|i| (i.names.clone(), i.signed.clone()))
        .unwrap_or((None, None));
    if let Some(p) = pending.get_mut(&FrameType::Inter) {
        if p.names.is_none() {
            p.names = i_names;
        }
        if p.signed.is_none() {
            p.signed = i_signed;
        }
    }

    let mut table = FrameTypeTable::new();
    for (frame_type, lines) in pending {
        let incomplete = |missing| BBLError::IncompleteFieldDefinition {
            frame_type: frame_type.marker(),
            missing,
        };
        let names = lines.names.ok_or_else(|| incomplete("name"))?;
        let signed = lines.signed.ok_or_else(|| incomplete("signed"))?;
        let predictors = lines.predictors.ok_or_else(|| incomplete("predictor"))?;
        let encodings = lines.encodings.ok_or_else(|| incomplete("encoding"))?;

        for (attribute, found) in [
            ("signed", signed.len()),
            ("predictor", predictors.len()),
            ("encoding", encodings.len()),
        ] {
            if found != names.len() {
                return Err(BBLError::FieldCountMismatch {
                    frame_type: frame_type.marker(),
                    attribute,
                    expected: names.len(),
                    found,
                });
            }
        }

        // history slots are keyed by field name
        let mut seen = BTreeSet::new();
        if let Some(name) = names.iter().map(String::as_str).find(|name| !seen.insert(*name)) {
            return Err(BBLError::InvalidHeader(format!(
                "frame type '{frame_type}' defines field '{name}' more than once"
            )));
        }

        let fields: Vec<FieldDefinition> = names
            .into_iter()
            .zip(signed)
            .zip(predictors.into_iter().zip(encodings))
            .map(|((name, signed), (predictor, encoding))| FieldDefinition {
                name,
                signed,
                predictor,
                encoding,
            })
            .collect();

        debug!("Frame type '{frame_type}': {} fields", fields.len());
        table.insert(frame_type, FrameDefinition::new(fields));
    }

    Ok(table)
}

/// Main-frame layout assumed for logs whose header carries no field definitions
pub fn default_frame_table() -> FrameTypeTable {
    let mut fields = vec![
        FieldDefinition {
            name: "loopIteration".into(),
            signed: false,
            predictor: Predictor::Increment,
            encoding: Encoding::UnsignedVB,
        },
        FieldDefinition {
            name: "time".into(),
            signed: false,
            predictor: Predictor::StraightLine,
            encoding: Encoding::UnsignedVB,
        },
    ];
    for prefix in ["gyroADC", "accSmooth"] {
        for axis in 0..3 {
            fields.push(FieldDefinition {
                name: format!("{prefix}[{axis}]"),
                signed: true,
                predictor: Predictor::Zero,
                encoding: Encoding::SignedVB,
            });
        }
    }

    let definition = FrameDefinition::new(fields);
    let mut table = FrameTypeTable::new();
    table.insert(FrameType::Intra, definition.clone());
    table.insert(FrameType::Inter, definition);
    table
}
