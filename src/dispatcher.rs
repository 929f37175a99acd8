use std::thread;

use log::{error, info};

use crate::config::Config;
use crate::crawl_worker::{CancelFlag, CrawlWorker, PageSource, WorkerContext, WorkerReport, WorkerSlot};
use crate::dedup::Aggregate;
use crate::delay_manager::RateLimit;
use crate::name_formatter::NameFormatter;
use crate::person::Person;

/// One worker's assignment: which session crawls which company, from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub session: usize,
    pub company: usize,
    pub slot: WorkerSlot,
}

/// Every session crawls every company. Sessions on the same company split its
/// offset space into interleaved windows.
pub fn plan_pairings(sessions: usize, companies: usize, start: usize, page_size: usize) -> Vec<Pairing> {
    let mut plan = Vec::with_capacity(sessions * companies);
    for company in 0..companies {
        for session in 0..sessions {
            plan.push(Pairing {
                session,
                company,
                slot: WorkerSlot::new(start, page_size, session, sessions),
            });
        }
    }
    plan
}

pub struct Dispatcher<'a> {
    config: &'a Config,
    rate_limit: &'a dyn RateLimit,
    cancel: CancelFlag,
}

impl<'a> Dispatcher<'a> {
    pub fn new(config: &'a Config, rate_limit: &'a dyn RateLimit, cancel: CancelFlag) -> Self {
        Dispatcher {
            config,
            rate_limit,
            cancel,
        }
    }

    /// Runs one worker per pairing and blocks until all of them are done.
    ///
    /// A worker that dies only loses its own pages; the rest keep going.
    pub fn run<S: PageSource>(&self, sessions: &[S], companies: &[String]) -> Vec<Person> {
        let aggregate = Aggregate::new();
        let formatter = NameFormatter::new();
        let ctx = WorkerContext {
            aggregate: &aggregate,
            formatter: self.config.normalize_names().then_some(&formatter),
            rate_limit: self.rate_limit,
            cancel: &self.cancel,
            page_size: self.config.page_size,
            empty_threshold: self.config.empty_threshold,
        };

        let plan = plan_pairings(sessions.len(), companies.len(), self.config.start, self.config.page_size);
        info!(
            "Starting {} workers ({} sessions x {} companies)",
            plan.len(),
            sessions.len(),
            companies.len()
        );

        let reports: Vec<WorkerReport> = thread::scope(|scope| {
            let handles: Vec<_> = plan
                .iter()
                .enumerate()
                .map(|(id, pairing)| {
                    let source = &sessions[pairing.session];
                    let company_id = companies[pairing.company].as_str();
                    let slot = pairing.slot;
                    let ctx = &ctx;
                    scope.spawn(move || CrawlWorker::new(id, source, company_id, slot, ctx).run())
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .filter_map(|(id, handle)| match handle.join() {
                    Ok(report) => Some(report),
                    Err(_) => {
                        error!("Worker {} panicked; its results so far are kept", id);
                        None
                    }
                })
                .collect()
        });

        let pages: usize = reports.iter().map(|r| r.pages_fetched).sum();
        let failed: usize = reports.iter().map(|r| r.failed_fetches).sum();
        info!(
            "All workers finished: {} pages fetched ({} failed), {} unique people",
            pages,
            failed,
            aggregate.len()
        );

        aggregate.into_people()
    }
}
