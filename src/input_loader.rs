use std::fs;
use std::path::Path;

use csv::{ByteRecord, StringRecord};
use log::{debug, info, warn};

use crate::error::InputError;
use crate::person::Person;

/// Loads people from a JSON array or a delimited file, detected by content.
pub fn load_people<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Vec<Person>, InputError> {
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)?;
    let people = parse_people(&bytes, delimiter)?;
    info!("Loaded {} records from {:?}", people.len(), path_ref);
    Ok(people)
}

/// JSON is tried first; otherwise the first record must have at least two fields.
///
/// Columns: first name, last name, occupation, public identifier, company id.
/// Only the first two are required. Short records, header rows and lines that
/// are not valid UTF-8 are skipped.
pub fn parse_people(bytes: &[u8], delimiter: u8) -> Result<Vec<Person>, InputError> {
    match serde_json::from_slice::<Vec<Person>>(bytes) {
        Ok(people) => return Ok(people),
        Err(e) => debug!("Input is not a JSON person list ({}), trying delimited text", e),
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = rdr.byte_records();
    let first = match records.next() {
        Some(record) => record?,
        None => return Err(InputError::UnknownFormat),
    };
    if first.len() < 2 {
        return Err(InputError::UnknownFormat);
    }

    let mut people = Vec::new();
    for result in std::iter::once(Ok(first)).chain(records) {
        let Some(record) = decode_record(result?) else {
            continue;
        };
        if record.len() < 2 || is_header(&record) {
            continue;
        }

        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        people.push(Person {
            first_name: field(0),
            last_name: field(1),
            occupation: field(2),
            public_identifier: field(3),
            company_id: field(4),
        });
    }
    Ok(people)
}

fn decode_record(record: ByteRecord) -> Option<StringRecord> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    match StringRecord::from_byte_record(record) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping line {}: {}", line, e.utf8_error());
            None
        }
    }
}

fn is_header(record: &StringRecord) -> bool {
    let matches = |i: usize, name: &str| {
        record
            .get(i)
            .is_some_and(|f| f.trim().eq_ignore_ascii_case(name))
    };
    matches(0, "firstname") && matches(1, "lastname")
}
