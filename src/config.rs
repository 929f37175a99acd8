use std::time::Duration;

use crate::output_renderer::OutputFormat;

pub const DEFAULT_BASE_URL: &str = "https://www.linkedin.com";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.14; rv:70.0) Gecko/20100101 Firefox/70.0";
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_EMPTY_THRESHOLD: u32 = 3;
pub const DEFAULT_DELAY_SECS: u64 = 1;
pub const DEFAULT_DELIMITER: u8 = b',';

/// Settings for one run. Built once, then shared by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub format: OutputFormat,
    pub start: usize,
    pub page_size: usize,
    pub empty_threshold: u32,
    pub delay: Duration,
    pub jitter: Duration,
    pub user_agent: String,
    pub base_url: String,
    pub delimiter: u8,
}

impl Config {
    pub fn normalize_names(&self) -> bool {
        self.format.normalizes_names()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            format: OutputFormat::Plain,
            start: 0,
            page_size: DEFAULT_PAGE_SIZE,
            empty_threshold: DEFAULT_EMPTY_THRESHOLD,
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
            jitter: Duration::ZERO,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}
