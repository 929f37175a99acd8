use std::collections::HashSet;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::{error, info, warn};

use crate::company_resolver::{self, TerminalChooser};
use crate::config::{
    Config, DEFAULT_BASE_URL, DEFAULT_DELAY_SECS, DEFAULT_EMPTY_THRESHOLD, DEFAULT_PAGE_SIZE,
    DEFAULT_USER_AGENT,
};
use crate::crawl_worker::CancelFlag;
use crate::dedup::Aggregate;
use crate::delay_manager::Delay;
use crate::dispatcher::Dispatcher;
use crate::input_loader;
use crate::name_formatter::NameFormatter;
use crate::output_renderer::{self, OutputFormat};
use crate::person::Person;
use crate::session::{self, Credentials, Session};

#[derive(Debug, Parser)]
#[command(
    name = "people_scraper",
    version,
    about = "Collect employee names for a company and turn them into username lists"
)]
pub struct Args {
    /// Company ID (repeatable)
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<String>,

    /// Company name to look up interactively (repeatable)
    #[arg(long = "name", value_name = "NAME")]
    pub names: Vec<String>,

    /// Usernames, comma separated
    #[arg(short = 'u', long = "users", value_delimiter = ',', required_unless_present = "input")]
    pub usernames: Vec<String>,

    /// Passwords, comma separated, same order as the usernames
    #[arg(
        short = 'p',
        long = "passwords",
        value_delimiter = ',',
        env = "PEOPLE_SCRAPER_PASSWORDS",
        hide_env_values = true,
        required_unless_present = "input"
    )]
    pub passwords: Vec<String>,

    /// Format an existing JSON or delimited file instead of scraping
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Append output to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Seconds to wait before each request
    #[arg(short = 'd', long = "delay", default_value_t = DEFAULT_DELAY_SECS)]
    pub delay: u64,

    /// Extra random wait of up to this many seconds
    #[arg(long = "jitter", default_value_t = 0)]
    pub jitter: u64,

    /// csv, raw_csv, json, raw_json, raw, or a template like {f}{last}@example.com
    #[arg(short = 'f', long = "format")]
    pub format: Option<String>,

    /// Offset to start at
    #[arg(short = 's', long = "start", default_value_t = 0)]
    pub start: usize,

    /// Results per request
    #[arg(
        short = 'c',
        long = "count",
        default_value_t = DEFAULT_PAGE_SIZE as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub count: u64,

    #[arg(short = 'a', long = "user-agent", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Consecutive empty responses before a worker quits
    #[arg(
        short = 'e',
        long = "empty-threshold",
        default_value_t = DEFAULT_EMPTY_THRESHOLD,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub empty_threshold: u32,

    /// Input file delimiter
    #[arg(long = "delim", default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    #[arg(long = "base-url", default_value = DEFAULT_BASE_URL, hide = true)]
    pub base_url: String,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

impl Args {
    pub fn config(&self) -> Config {
        let format: OutputFormat = match self.format.as_deref().unwrap_or_default().parse() {
            Ok(f) => f,
            Err(never) => match never {},
        };
        Config {
            format,
            start: self.start,
            page_size: self.count as usize,
            empty_threshold: self.empty_threshold,
            delay: Duration::from_secs(self.delay),
            jitter: Duration::from_secs(self.jitter),
            user_agent: self.user_agent.clone(),
            base_url: self.base_url.clone(),
            delimiter: self.delimiter,
        }
    }
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single ASCII character, got '{}'", s)),
    }
}

pub fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = args.config();

    // 1. Formatting an existing file
    if let Some(input) = &args.input {
        let loaded = input_loader::load_people(input, config.delimiter)?;
        let people = prepare_people(loaded, config.normalize_names());
        return emit(&people, &config, args.output.as_deref());
    }

    if args.ids.is_empty() && args.names.is_empty() {
        return Err("--id or --name required".into());
    }

    // 2. Log in every account
    let sessions = login_all(&args.usernames, &args.passwords, &config)?;

    // 3. Work out which companies to crawl
    let companies = resolve_companies(&sessions[0], &args.ids, &args.names);
    if companies.is_empty() {
        return Err("Could not get any company id".into());
    }

    // 4. Crawl
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Interrupted, stopping workers after their current request...");
        handler_flag.cancel();
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let delay = Delay::new(config.delay, config.jitter);
    let people = Dispatcher::new(&config, &delay, cancel).run(&sessions, &companies);

    emit(&people, &config, args.output.as_deref())
}

fn login_all(usernames: &[String], passwords: &[String], config: &Config) -> Result<Vec<Session>, Box<dyn Error>> {
    if usernames.len() != passwords.len() {
        return Err("Please enter same number of usernames and passwords.".into());
    }

    let mut sessions = Vec::new();
    for (username, password) in usernames.iter().zip(passwords) {
        match session::authenticate(&Credentials::new(username, password), config) {
            Ok(s) => sessions.push(s),
            Err(e) => error!("{} Error logging in. - {}", username, e),
        }
    }

    if sessions.is_empty() {
        return Err("No valid users. Quitting...".into());
    }
    info!("{} of {} accounts logged in", sessions.len(), usernames.len());
    Ok(sessions)
}

fn resolve_companies(session: &Session, ids: &[String], names: &[String]) -> Vec<String> {
    let mut companies: Vec<String> = ids.to_vec();
    let mut chooser = TerminalChooser::stdio();

    for name in names {
        match company_resolver::resolve(session, name, &mut chooser) {
            Ok(id) => companies.push(id),
            Err(e) => error!("Could not get company id for '{}': {}", name, e),
        }
    }

    let mut seen = HashSet::new();
    companies.retain(|id| seen.insert(id.clone()));
    companies
}

/// Normalizes (when enabled) and deduplicates records loaded from a file.
pub fn prepare_people(loaded: Vec<Person>, normalize: bool) -> Vec<Person> {
    let formatter = NameFormatter::new();
    let aggregate: Aggregate = loaded
        .into_iter()
        .filter(Person::has_first_name)
        .filter_map(|p| {
            if !normalize {
                return Some(p);
            }
            match formatter.normalize(p.clone()) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Unable to format {} {}. {}", p.first_name, p.last_name, e);
                    None
                }
            }
        })
        .collect();
    aggregate.into_people()
}

fn emit(people: &[Person], config: &Config, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let bytes = output_renderer::render(people, &config.format)?;
    write_output(&bytes, output)?;
    if let Some(path) = output {
        info!("Wrote {} people to {:?}", people.len(), path);
    }
    Ok(())
}

/// Appends to `path` (created if missing), or writes to stdout.
pub fn write_output(bytes: &[u8], path: Option<&Path>) -> io::Result<()> {
    match path {
        Some(path) => {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(bytes)
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()
        }
    }
}
