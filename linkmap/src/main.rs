use colored::Colorize;
use linkmap::command_argument_builder;
use linkmap::handlers::{handle_crawl, handle_init_config, init_tracing, spawn_interrupt_handler};
use linkmap_core::print_banner;
use linkmap_scanner::CancellationToken;

#[tokio::main]
async fn main() {
    let chosen_command = command_argument_builder().get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let log_format = chosen_command
        .get_one::<String>("log-format")
        .map(String::as_str)
        .unwrap_or("text");
    init_tracing(chosen_command.get_count("verbose"), quiet, log_format);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => {
            let cancel = CancellationToken::new();
            spawn_interrupt_handler(cancel.clone());
            handle_crawl(primary_command, quiet, cancel).await
        }
        Some(("init-config", primary_command)) => handle_init_config(primary_command),
        // No subcommand provided, just show the banner
        _ => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
