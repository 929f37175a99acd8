use std::io::{self, BufRead, Write};

use log::{info, warn};

use crate::error::{ResolveError, TransportError};
use crate::person::CompanyLookupResponse;
use crate::session::ApiClient;

pub const COMPANY_SEARCH_PATH: &str = "/voyager/api/search/blended";
pub const COMPANY_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyCandidate {
    /// Stable across pages: the first result of the second page is 10.
    pub index: usize,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Select(usize),
    More,
}

/// Picks a company among search results; the CLI asks the user, tests script it.
pub trait CompanyChooser {
    fn choose(&mut self, candidates: &[CompanyCandidate]) -> io::Result<Choice>;
}

pub fn company_query(name: &str, start: usize) -> String {
    // List(...) stays literal, only '>' is escaped
    format!(
        "count={}&filters=List(resultType-%3ECOMPANIES)&keywords={}&origin=GLOBAL_SEARCH_HEADER\
         &q=all&queryContext=List(spellCorrectionEnabled-%3Etrue)&start={}",
        COMPANY_PAGE_SIZE,
        urlencoding::encode(name),
        start
    )
}

/// Pages through company search results until the chooser settles on one.
pub fn resolve<C, H>(client: &C, name: &str, chooser: &mut H) -> Result<String, ResolveError>
where
    C: ApiClient + ?Sized,
    H: CompanyChooser + ?Sized,
{
    let mut start = 0;
    let mut seen: Vec<CompanyCandidate> = Vec::new();

    loop {
        let body = client.signed_get(COMPANY_SEARCH_PATH, &company_query(name, start))?;
        let response: CompanyLookupResponse =
            serde_json::from_slice(&body).map_err(TransportError::from)?;

        let page: Vec<CompanyCandidate> = response
            .data
            .elements
            .into_iter()
            .next()
            .map(|group| group.elements)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, e)| CompanyCandidate {
                index: start + i,
                id: e.company_id().to_string(),
                name: e.title.text,
            })
            .collect();

        if page.is_empty() {
            warn!("Company search for '{}' exhausted at {}", name, start);
            return Err(ResolveError::NotFound(name.to_string()));
        }

        seen.extend(page.iter().cloned());
        match chooser.choose(&page)? {
            Choice::Select(index) => {
                if let Some(c) = seen.iter().find(|c| c.index == index) {
                    info!("Using company {} - {}", c.id, c.name);
                    return Ok(c.id.clone());
                }
                warn!("Index {} is not in the list, fetching more", index);
            }
            Choice::More => {}
        }

        start += COMPANY_PAGE_SIZE;
    }
}

/// Interactive chooser: lists candidates on stderr and reads an index from stdin.
pub struct TerminalChooser<R, W> {
    input: R,
    output: W,
}

impl TerminalChooser<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        TerminalChooser {
            input: io::stdin().lock(),
            output: io::stderr(),
        }
    }
}

impl<R: BufRead, W: Write> TerminalChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalChooser { input, output }
    }
}

impl<R: BufRead, W: Write> CompanyChooser for TerminalChooser<R, W> {
    fn choose(&mut self, candidates: &[CompanyCandidate]) -> io::Result<Choice> {
        writeln!(self.output, "Choosing company:\n")?;
        for c in candidates {
            writeln!(self.output, "\t{}) {} - {}", c.index, c.id, c.name)?;
        }

        loop {
            write!(self.output, "\nEnter index (-1 for more): ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no company chosen"));
            }
            match line.trim().parse::<i64>() {
                Ok(i) if i >= 0 => return Ok(Choice::Select(i as usize)),
                Ok(_) => return Ok(Choice::More),
                Err(_) => writeln!(self.output, "Not a number: {}", line.trim())?,
            }
        }
    }
}
