//! Pagination driver for one (session, company) pairing.
//!
//! A worker stops after `empty_threshold` consecutive pages without a usable
//! record. The upstream `totalResultCount` is never consulted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::dedup::Aggregate;
use crate::delay_manager::RateLimit;
use crate::error::TransportError;
use crate::name_formatter::NameFormatter;
use crate::person::Person;

/// Anything that can produce one page of people for a company.
pub trait PageSource: Send + Sync {
    fn fetch_page(
        &self,
        company_id: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<Person>, TransportError>;

    fn label(&self) -> &str;
}

/// Run-wide stop request, checked before every fetch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlCursor {
    pub offset: usize,
    pub consecutive_empty_pages: u32,
}

/// Where a worker starts and how far it jumps, so workers sharing a company
/// interleave their windows instead of repeating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSlot {
    pub start_offset: usize,
    pub stride: usize,
}

impl WorkerSlot {
    /// Slot `index` of `sharing` workers on the same company. A zero page size counts as one.
    pub fn new(start: usize, page_size: usize, index: usize, sharing: usize) -> Self {
        let page_size = page_size.max(1);
        WorkerSlot {
            start_offset: start + index * page_size,
            stride: page_size * sharing.max(1),
        }
    }
}

/// Shared collaborators handed to every worker of a run.
pub struct WorkerContext<'a> {
    pub aggregate: &'a Aggregate,
    pub formatter: Option<&'a NameFormatter>,
    pub rate_limit: &'a dyn RateLimit,
    pub cancel: &'a CancelFlag,
    pub page_size: usize,
    pub empty_threshold: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub pages_fetched: usize,
    pub failed_fetches: usize,
    pub admitted: usize,
    pub duplicates: usize,
    pub unformattable: usize,
}

enum PageOutcome {
    Page(Vec<Person>),
    Failed,
    SessionLost,
}

enum WorkerState {
    Fetching,
    Evaluating(PageOutcome),
    Terminated,
}

pub struct CrawlWorker<'a, S: PageSource + ?Sized> {
    id: usize,
    source: &'a S,
    company_id: &'a str,
    stride: usize,
    page_size: usize,
    empty_threshold: u32,
    cursor: CrawlCursor,
    ctx: &'a WorkerContext<'a>,
    report: WorkerReport,
}

impl<'a, S: PageSource + ?Sized> CrawlWorker<'a, S> {
    pub fn new(
        id: usize,
        source: &'a S,
        company_id: &'a str,
        slot: WorkerSlot,
        ctx: &'a WorkerContext<'a>,
    ) -> Self {
        CrawlWorker {
            id,
            source,
            company_id,
            stride: slot.stride.max(1),
            page_size: ctx.page_size.max(1),
            empty_threshold: ctx.empty_threshold.max(1),
            cursor: CrawlCursor {
                offset: slot.start_offset,
                consecutive_empty_pages: 0,
            },
            ctx,
            report: WorkerReport::default(),
        }
    }

    /// Crawls until the empty-page streak, a lost session or cancellation ends it.
    pub fn run(mut self) -> WorkerReport {
        let mut state = WorkerState::Fetching;
        loop {
            state = match state {
                WorkerState::Fetching => self.fetch(),
                WorkerState::Evaluating(outcome) => self.evaluate(outcome),
                WorkerState::Terminated => break,
            };
        }

        info!(
            "Account {} ({}) finished company {}: {} pages, {} new people",
            self.id,
            self.source.label(),
            self.company_id,
            self.report.pages_fetched,
            self.report.admitted
        );
        self.report
    }

    fn fetch(&mut self) -> WorkerState {
        if self.cancelled() {
            return WorkerState::Terminated;
        }

        self.ctx.rate_limit.pause();
        if self.cancelled() {
            return WorkerState::Terminated;
        }
        self.report.pages_fetched += 1;

        let outcome = match self.source.fetch_page(
            self.company_id,
            self.cursor.offset,
            self.page_size,
        ) {
            Ok(people) => PageOutcome::Page(people),
            Err(e) if e.is_fatal() => {
                error!("Account {} ({}) lost its session: {}", self.id, self.source.label(), e);
                PageOutcome::SessionLost
            }
            Err(e) => {
                warn!(
                    "Error getting people for company {} at {}: {}",
                    self.company_id, self.cursor.offset, e
                );
                self.report.failed_fetches += 1;
                PageOutcome::Failed
            }
        };
        WorkerState::Evaluating(outcome)
    }

    fn cancelled(&self) -> bool {
        let cancelled = self.ctx.cancel.is_cancelled();
        if cancelled {
            info!("Account {} stopping: run cancelled", self.id);
        }
        cancelled
    }

    fn evaluate(&mut self, outcome: PageOutcome) -> WorkerState {
        let found = match outcome {
            PageOutcome::SessionLost => return WorkerState::Terminated,
            PageOutcome::Failed => 0,
            PageOutcome::Page(people) => self.admit_page(people),
        };

        self.cursor.offset += self.stride;
        if found == 0 {
            self.cursor.consecutive_empty_pages += 1;
            debug!(
                "Account {} empty page ({} of {})",
                self.id, self.cursor.consecutive_empty_pages, self.empty_threshold
            );
        } else {
            self.cursor.consecutive_empty_pages = 0;
        }

        if self.cursor.consecutive_empty_pages >= self.empty_threshold {
            WorkerState::Terminated
        } else {
            WorkerState::Fetching
        }
    }

    /// Returns how many records on the page had a first name.
    fn admit_page(&mut self, people: Vec<Person>) -> usize {
        let mut found = 0;
        for person in people.into_iter().filter(Person::has_first_name) {
            found += 1;
            info!(
                "Account {} found {} {} - {}",
                self.id, person.first_name, person.last_name, person.occupation
            );

            let person = match self.ctx.formatter {
                Some(formatter) => match formatter.normalize(person.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("Unable to format {} {}. {}", person.first_name, person.last_name, e);
                        self.report.unformattable += 1;
                        continue;
                    }
                },
                None => person,
            };

            if self.ctx.aggregate.try_insert(person) {
                self.report.admitted += 1;
            } else {
                self.report.duplicates += 1;
            }
        }
        found
    }
}
