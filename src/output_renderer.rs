use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::RenderError;
use crate::person::Person;

pub const CSV_NAME_HEADER: [&str; 2] = ["firstname", "lastname"];
/// Same column order as the rows, so a `raw_csv` file loads back with `-i`.
pub const CSV_FULL_HEADER: [&str; 5] = ["firstname", "lastname", "occupation", "link", "companyid"];

/// How the final list is written out, chosen by the literal `-f` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// `""`: `first last` per line
    Plain,
    /// `"raw"`
    Raw,
    /// `"csv"`: title-cased names only
    Csv,
    /// `"raw_csv"`: every field
    RawCsv,
    Json,
    RawJson,
    /// Anything else, e.g. `{f}{last}@example.com`
    Template(String),
}

impl OutputFormat {
    /// Raw formats keep names exactly as scraped.
    pub fn normalizes_names(&self) -> bool {
        !matches!(self, OutputFormat::Raw | OutputFormat::RawCsv | OutputFormat::RawJson)
    }
}

impl FromStr for OutputFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" => OutputFormat::Plain,
            "raw" => OutputFormat::Raw,
            "csv" => OutputFormat::Csv,
            "raw_csv" => OutputFormat::RawCsv,
            "json" => OutputFormat::Json,
            "raw_json" => OutputFormat::RawJson,
            template => OutputFormat::Template(template.to_string()),
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Plain => "",
            OutputFormat::Raw => "raw",
            OutputFormat::Csv => "csv",
            OutputFormat::RawCsv => "raw_csv",
            OutputFormat::Json => "json",
            OutputFormat::RawJson => "raw_json",
            OutputFormat::Template(t) => t,
        };
        f.write_str(s)
    }
}

pub fn render(people: &[Person], format: &OutputFormat) -> Result<Vec<u8>, RenderError> {
    match format {
        OutputFormat::Plain | OutputFormat::Raw => Ok(render_lines(people)),
        OutputFormat::Csv => {
            let rows = people
                .iter()
                .map(|p| vec![title_case(&p.first_name), title_case(&p.last_name)]);
            write_csv(&CSV_NAME_HEADER, rows)
        }
        OutputFormat::RawCsv => {
            let rows = people.iter().map(|p| {
                vec![
                    p.first_name.clone(),
                    p.last_name.clone(),
                    p.occupation.clone(),
                    p.public_identifier.clone(),
                    p.company_id.clone(),
                ]
            });
            write_csv(&CSV_FULL_HEADER, rows)
        }
        OutputFormat::Json | OutputFormat::RawJson => Ok(serde_json::to_vec_pretty(people)?),
        OutputFormat::Template(template) => {
            let mut out = String::new();
            for p in people {
                out.push_str(&apply_template(template, p));
                out.push('\n');
            }
            Ok(out.into_bytes())
        }
    }
}

/// Substitutes `{f}`, `{first}`, `{l}` and `{last}`, in that order.
///
/// `{f}` and `{l}` are the first character of the name, or nothing when the name is empty.
pub fn apply_template(template: &str, person: &Person) -> String {
    template
        .replace("{f}", first_char(&person.first_name))
        .replace("{first}", &person.first_name)
        .replace("{l}", first_char(&person.last_name))
        .replace("{last}", &person.last_name)
}

fn first_char(s: &str) -> &str {
    match s.char_indices().nth(1) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn render_lines(people: &[Person]) -> Vec<u8> {
    let mut out = String::new();
    for p in people {
        out.push_str(&p.first_name);
        out.push(' ');
        out.push_str(&p.last_name);
        out.push('\n');
    }
    out.into_bytes()
}

fn write_csv<I>(header: &[&str], rows: I) -> Result<Vec<u8>, RenderError>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| RenderError::Flush(e.error().to_string()))
}

/// Upper-cases the first letter of every space-separated word.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}
