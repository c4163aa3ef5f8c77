pub mod config;
pub mod crawl;
pub mod error;
pub mod graph;

pub use config::{AppConfig, CrawlSettings, OutputFormat, OutputSettings};
pub use crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report};
pub use error::CoreError;
pub use graph::{LinkGraph, render_json, render_mermaid, write_graph};

use colored::Colorize;

const BANNER: &str = r#"
    ╔══════════════════════════════════════════════════════════╗
    ║  ██╗     ██╗███╗   ██╗██╗  ██╗███╗   ███╗ █████╗ ██████╗  ║
    ║  ██║     ██║████╗  ██║██║ ██╔╝████╗ ████║██╔══██╗██╔══██╗ ║
    ║  ██║     ██║██╔██╗ ██║█████╔╝ ██╔████╔██║███████║██████╔╝ ║
    ║  ██║     ██║██║╚██╗██║██╔═██╗ ██║╚██╔╝██║██╔══██║██╔═══╝  ║
    ║  ███████╗██║██║ ╚████║██║  ██╗██║ ╚═╝ ██║██║  ██║██║      ║
    ║  ╚══════╝╚═╝╚═╝  ╚═══╝╚═╝  ╚═╝╚═╝     ╚═╝╚═╝  ╚═╝╚═╝      ║
    ╚══════════════════════════════════════════════════════════╝
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan());
    println!(
        "    {} {}\n",
        "link graph crawler".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
