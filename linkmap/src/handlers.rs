use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use linkmap_core::config::{AppConfig, OutputFormat, expand_path, init_config, load_config};
use linkmap_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report};
use linkmap_core::graph::write_graph;
use linkmap_scanner::{CancellationToken, normalize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

// Helper functions for crawl handler

/// Collect seed URLs from `--url` values and an optional hosts file.
pub fn load_urls_from_source(urls: &[String], hosts_file: Option<&Path>) -> Result<Vec<String>> {
    let mut seeds: Vec<String> = urls.iter().filter_map(|url| parse_url_line(url.trim())).collect();

    if !urls.is_empty() && seeds.is_empty() {
        bail!("None of the --url values is a valid URL");
    }

    if let Some(path) = hosts_file {
        seeds.extend(load_urls_from_file(path)?);
    }

    Ok(seeds)
}

/// Load and parse URLs from a file, skipping blank lines and `#` comments
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed.
///
/// The returned seed has one trailing slash removed so it matches the form
/// links are recorded in.
pub fn parse_url_line(line: &str) -> Option<String> {
    if line.is_empty() {
        return None;
    }

    if Url::parse(line).is_ok() {
        return Some(normalize(line));
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(normalize(&with_scheme));
    }

    tracing::warn!("Skipping invalid URL '{}'", line);
    None
}

/// Crawl settings given on the command line; `None` and empty values leave
/// the config file's setting in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CrawlOverrides {
    pub seeds: Vec<String>,
    pub limit: Option<usize>,
    pub workers: Option<usize>,
    pub block: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub output: Option<String>,
    pub format: Option<OutputFormat>,
}

impl CrawlOverrides {
    pub fn from_matches(sub_matches: &ArgMatches) -> Result<Self> {
        let urls: Vec<String> = sub_matches
            .get_many::<String>("url")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let hosts_file = sub_matches
            .get_one::<PathBuf>("hosts-file")
            .map(|path| expand_path(&path.to_string_lossy()));

        let format = sub_matches
            .get_one::<String>("format")
            .map(|f| f.parse::<OutputFormat>())
            .transpose()?;

        Ok(Self {
            seeds: load_urls_from_source(&urls, hosts_file.as_deref())?,
            limit: sub_matches.get_one::<usize>("limit").copied(),
            workers: sub_matches.get_one::<usize>("threads").copied(),
            block: sub_matches
                .get_many::<String>("block")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            timeout_secs: sub_matches.get_one::<u64>("timeout").copied(),
            output: sub_matches.get_one::<String>("output").cloned(),
            format,
        })
    }

    /// Layer these overrides on top of `config`.
    pub fn apply(self, config: &mut AppConfig) {
        if !self.seeds.is_empty() {
            config.crawl.seeds = self.seeds;
        }
        if let Some(limit) = self.limit {
            config.crawl.limit = limit;
        }
        if let Some(workers) = self.workers {
            config.crawl.workers = workers;
        }
        if !self.block.is_empty() {
            config.crawl.block_list = self.block;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.crawl.timeout_secs = timeout_secs;
        }
        if let Some(output) = self.output {
            config.output.path = output;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
    }
}

/// Load the config file named by `--config`, or `./linkmap.toml`, and
/// apply command line overrides.
pub fn resolve_config(sub_matches: &ArgMatches) -> Result<AppConfig> {
    let config_path = sub_matches
        .get_one::<PathBuf>("config")
        .map(|path| expand_path(&path.to_string_lossy()));
    let mut config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    CrawlOverrides::from_matches(sub_matches)?.apply(&mut config);

    if config.crawl.seeds.is_empty() {
        bail!("No seed URLs: pass --url, --hosts-file or set crawl.seeds in the config file");
    }
    config.crawl.validate()?;
    Ok(config)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_crawl_plan(config: &AppConfig) {
    print_divider();
    println!(
        "{} Crawling from {} seed(s)",
        "→".blue(),
        config.crawl.seeds.len().to_string().bright_white()
    );
    for seed in &config.crawl.seeds {
        println!("  {} {}", "•".cyan(), seed.bright_white());
    }
    println!("{} Limit: {}", "→".blue(), config.crawl.limit);
    println!("{} Workers: {}", "→".blue(), config.crawl.workers);
    if config.crawl.block_list.is_empty() {
        println!("{} Block list: none", "→".blue());
    } else {
        println!(
            "{} Block list: {}",
            "→".blue(),
            config.crawl.block_list.join(", ").dimmed()
        );
    }
    println!(
        "{} Output: {} ({})",
        "→".blue(),
        config.output.path.bright_white(),
        config.output.format
    );
    print_divider();
    println!();
}

pub async fn handle_crawl(
    sub_matches: &ArgMatches,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let config = resolve_config(sub_matches)?;
    let show_progress = !quiet && !sub_matches.get_flag("no-progress");

    if !quiet {
        print_crawl_plan(&config);
    }

    let options = CrawlOptions::from_settings(&config.crawl, show_progress);
    let progress_callback: Option<CrawlProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            println!("{}", msg);
        }))
    };

    let outcome = execute_crawl(options, progress_callback, cancel)
        .await
        .context("Crawl failed")?;

    let output_path = expand_path(&config.output.path);
    write_graph(&outcome, &output_path, config.output.format)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if !quiet {
        if outcome.cancelled {
            println!("\n{} Crawl interrupted, partial graph saved\n", "⚠".yellow().bold());
        } else {
            println!("\n{} Crawl complete!\n", "✓".green().bold());
        }
        print!("{}", generate_crawl_report(&outcome));
    }

    println!(
        "{} Wrote {} links to {}",
        "✓".green().bold(),
        outcome.edges.len().to_string().cyan(),
        output_path.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_init_config(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(linkmap_core::config::CONFIG_FILE_NAME);
    let force = args.get_flag("force");

    let written = init_config(&expand_path(path), force)?;
    println!(
        "{} Configuration written: {}",
        "✓".green().bold(),
        written.display().to_string().bright_white()
    );
    Ok(())
}

/// Cancel `cancel` on the first Ctrl-C so the crawl can save what it has.
pub fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });
}

/// Install the tracing subscriber on stderr.
///
/// `RUST_LOG` wins over the verbosity flags.
pub fn init_tracing(verbose: u8, quiet: bool, log_format: &str) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = format!("linkmap={level},linkmap_core={level},linkmap_scanner={level}");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match log_format {
        "json" => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
