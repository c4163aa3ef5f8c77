use clap::{ArgAction, arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkmap")
        .about("Crawl from seed locations and map how pages link to each other")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            arg!(--"log-format" <FORMAT>)
                .required(false)
                .help("Log output format")
                .value_parser(["text", "json"])
                .default_value("text")
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl outward from one or more seed locations and write the discovered \
                link graph.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A seed URL to crawl from (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-l --"limit" <MAX_PAGES>)
                        .required(false)
                        .help("Maximum number of distinct locations to fetch [default: 20]")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async workers in the worker pool [default: 10]")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-b --"block" <PATTERN>)
                        .required(false)
                        .help(
                            "Never fetch locations containing PATTERN (repeatable; replaces the \
                        default block list)",
                        )
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("Read settings from this TOML file (default: ./linkmap.toml if present)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the link graph [default: flowchart.mermaid]"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Graph output format [default: mermaid]")
                        .value_parser(["mermaid", "json"]),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("HTTP request timeout in seconds [default: 10]")
                        .value_parser(clap::value_parser!(u64).range(1..)),
                )
                .arg(
                    arg!(--"no-progress")
                        .required(false)
                        .help("Disable the progress spinner")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("init-config")
                .about("Writes a default linkmap.toml configuration file")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Where to write the configuration file")
                        .default_value("linkmap.toml"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing configuration file")
                        .required(false),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn crawl_accepts_repeated_urls_and_blocks() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "linkmap", "crawl", "-u", "http://a", "-u", "http://b", "-b", "x.com", "-b",
                "y.com", "-l", "5",
            ])
            .unwrap();
        let (name, crawl) = matches.subcommand().unwrap();
        assert_eq!(name, "crawl");
        let urls: Vec<&String> = crawl.get_many::<String>("url").unwrap().collect();
        assert_eq!(urls, ["http://a", "http://b"]);
        assert_eq!(crawl.get_many::<String>("block").unwrap().count(), 2);
        assert_eq!(crawl.get_one::<usize>("limit"), Some(&5));
    }

    #[test]
    fn crawl_rejects_bad_values() {
        let cmd = command_argument_builder();
        assert!(
            cmd.clone()
                .try_get_matches_from(["linkmap", "crawl", "-f", "dot"])
                .is_err()
        );
        assert!(
            cmd.clone()
                .try_get_matches_from(["linkmap", "crawl", "--timeout", "0"])
                .is_err()
        );
        assert!(
            cmd.try_get_matches_from(["linkmap", "crawl", "-t", "many"])
                .is_err()
        );
    }

    #[test]
    fn global_flags() {
        let matches = command_argument_builder()
            .try_get_matches_from(["linkmap", "-q", "-vv", "--log-format", "json", "crawl"])
            .unwrap();
        assert!(matches.get_flag("quiet"));
        assert_eq!(matches.get_count("verbose"), 2);
        assert_eq!(
            matches.get_one::<String>("log-format").map(String::as_str),
            Some("json")
        );
    }
}
