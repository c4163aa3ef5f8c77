pub mod commands;
pub mod handlers;

pub use commands::{CLAP_STYLING, command_argument_builder};

// Re-export commonly used handler functions for convenience
pub use handlers::{load_urls_from_file, load_urls_from_source, parse_url_line};

// Re-export crawl functionality from linkmap-core
pub use linkmap_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path, generate_crawl_report,
};
