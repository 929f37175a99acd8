pub mod cli;
pub mod company_resolver;
pub mod config;
pub mod crawl_worker;
pub mod dedup;
pub mod delay_manager;
pub mod dispatcher;
pub mod error;
pub mod input_loader;
pub mod logger;
pub mod name_formatter;
pub mod output_renderer;
pub mod page_fetcher;
pub mod person;
pub mod session;

// Exporting types for convenience
pub use config::Config;
pub use crawl_worker::{CancelFlag, CrawlWorker, PageSource};
pub use dedup::Aggregate;
pub use dispatcher::Dispatcher;
pub use name_formatter::NameFormatter;
pub use output_renderer::{render, OutputFormat};
pub use person::Person;
pub use session::{authenticate, ApiClient, Credentials, Session};
