//! Best-effort cleanup of scraped names.
//!
//! Profile names carry titles, suffixes, middle names, emoji and the like.
//! The rules below are a heuristic tuned for username generation; they are
//! not guaranteed to produce a semantically correct surname.

use regex::Regex;

use crate::error::FormatError;
use crate::person::Person;

/// Characters at which a last name is cut off ("Smith, Jr.", "Doe (CPA)", "Roe | Sales").
const LAST_NAME_CUTS: [char; 4] = [',', '(', '|', '.'];

pub struct NameFormatter {
    first_name_filter: Regex,
    last_name_filter: Regex,
}

impl Default for NameFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl NameFormatter {
    pub fn new() -> Self {
        NameFormatter {
            first_name_filter: Regex::new(r"[^A-Za-z]+").expect("static first name pattern"),
            last_name_filter: Regex::new(r"[^A-Za-z ]+").expect("static last name pattern"),
        }
    }

    /// Returns `person` with cleaned first and last names. Other fields are untouched.
    pub fn normalize(&self, person: Person) -> Result<Person, FormatError> {
        let first_name = self.format_first_name(&person.first_name)?;
        let last_name = self.format_last_name(&person.last_name);

        Ok(Person {
            first_name,
            last_name,
            ..person
        })
    }

    /// First whitespace token, lower-cased, letters only.
    pub fn format_first_name(&self, raw: &str) -> Result<String, FormatError> {
        let token = raw.split_whitespace().next().ok_or(FormatError::MissingFirstName)?;
        let cleaned = self
            .first_name_filter
            .replace_all(&token.to_lowercase(), "")
            .into_owned();

        // "李" or "😀" leave nothing usable behind
        if cleaned.is_empty() {
            return Err(FormatError::MissingFirstName);
        }
        Ok(cleaned)
    }

    /// Longest token before the first cut character, lower-cased, letters only.
    pub fn format_last_name(&self, raw: &str) -> String {
        let head = match raw.find(LAST_NAME_CUTS) {
            Some(idx) => &raw[..idx],
            None => raw,
        };

        let mut longest = "";
        let mut longest_len = 0;
        for token in head.split_whitespace() {
            let len = token.chars().count();
            // strict > keeps the earliest token on ties
            if len > longest_len {
                longest = token;
                longest_len = len;
            }
        }

        self.last_name_filter
            .replace_all(&longest.to_lowercase(), "")
            .into_owned()
    }
}
