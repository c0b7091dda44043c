//! ADIF text reader producing [`RawRecord`]s.
//!
//! Fields are `<NAME:LEN[:TYPE]>DATA`, records end with `<EOR>` and an optional
//! header ends with `<EOH>`. `LEN` counts characters. Anything outside a tag
//! and its data is ignored.

use std::path::Path;

use tracing::debug;

use crate::{error::AdifError, qso::RawRecord};

/// Parsed ADIF file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdifDocument {
    /// Header fields, empty when the file has none.
    pub header: RawRecord,
    /// QSO records in file order.
    pub records: Vec<RawRecord>,
}

/// Parses ADIF text.
pub fn parse(text: &str) -> Result<AdifDocument, AdifError> {
    let chars: Vec<char> = text.chars().collect();
    let mut doc = AdifDocument::default();
    let mut current = RawRecord::new();
    let mut pos = 0;

    while let Some(open) = find(&chars, pos, '<') {
        let close = find(&chars, open + 1, '>').ok_or(AdifError::UnterminatedTag(open))?;
        let tag: String = chars[open + 1..close].iter().collect();
        pos = close + 1;

        let mut parts = tag.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim().to_ascii_uppercase();
        let Some(len) = parts.next() else {
            match name.as_str() {
                "EOH" => doc.header = std::mem::take(&mut current),
                "EOR" => {
                    if !current.is_empty() {
                        doc.records.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            }
            continue;
        };

        let len: usize = len.trim().parse().map_err(|_| AdifError::BadLength {
            tag: tag.clone(),
            offset: open,
        })?;
        let Some(end) = pos.checked_add(len).filter(|end| *end <= chars.len()) else {
            return Err(AdifError::Truncated {
                field: name,
                offset: open,
            });
        };
        let value: String = chars[pos..end].iter().collect();
        pos = end;
        current.insert(name, value);
    }

    if !current.is_empty() {
        doc.records.push(current);
    }
    Ok(doc)
}

/// Reads and parses an ADIF file, decoding as Latin-1 when it is not UTF-8.
pub fn read_file(path: impl AsRef<Path>) -> Result<AdifDocument, AdifError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!(path = %path.display(), "not UTF-8, decoding as Latin-1");
            err.into_bytes().into_iter().map(char::from).collect()
        }
    };
    parse(&text)
}

fn find(chars: &[char], from: usize, needle: char) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|c| *c == needle)
        .map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_records() {
        let text = "WSJT-X ADIF Export<adif_ver:5>3.1.0\n<eoh>\n\
                    <call:5>K1ABC <band:3>20m <mode:3>FT8 <eor>\n\
                    <CALL:4>W1AW<BAND:3>40M<eor>";
        let doc = parse(text).expect("parse");
        assert_eq!(doc.header.get("ADIF_VER"), Some("3.1.0"));
        assert_eq!(doc.records.len(), 2);
        assert_eq!(doc.records[0].get("call"), Some("K1ABC"));
        assert_eq!(doc.records[1].get("BAND"), Some("40M"));
    }

    #[test]
    fn type_indicator_and_multibyte_data() {
        let doc = parse("<NAME:4:S>José<FREQ:6:N>14.074<eor>").expect("parse");
        assert_eq!(doc.records[0].get("NAME"), Some("José"));
        assert_eq!(doc.records[0].get("FREQ"), Some("14.074"));
    }

    #[test]
    fn truncated_data_is_an_error() {
        assert!(matches!(
            parse("<CALL:10>K1ABC"),
            Err(AdifError::Truncated { .. })
        ));
        assert!(matches!(parse("<CALL:x>K1ABC"), Err(AdifError::BadLength { .. })));
        assert!(matches!(parse("<CALL:5"), Err(AdifError::UnterminatedTag(0))));
    }

    #[test]
    fn oversized_length_is_truncation() {
        assert!(matches!(
            parse("<CALL:18446744073709551615>K1ABC<eor>"),
            Err(AdifError::Truncated { offset: 0, .. })
        ));
    }
}
