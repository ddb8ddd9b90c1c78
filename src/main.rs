mod config;
mod editor;
mod error;
mod render;
mod wizard;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{Configuration, DEFAULT_CONFIG_FILE, Store};
use crate::editor::{LinkPatch, NewLink, Session, format_list};
use crate::error::LinkError;

fn cli() -> Command {
    Command::new("vantal-links")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Manage the link list behind the dashboard page")
        .long_about(
            "Manage the link list behind the dashboard page.\n\
             Run without a command to start the interactive wizard.",
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("Config file to edit")
                .default_value(DEFAULT_CONFIG_FILE)
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log debug output to stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(Command::new("list").about("Print links grouped by category"))
        .subcommand(
            Command::new("add")
                .about("Add a link")
                .arg(text_arg("label", "Display name").required(true))
                .arg(text_arg("target", "URL or local file path").required(true))
                .arg(text_arg("category", "Grouping on the page"))
                .arg(text_arg("description", "Short description"))
                .arg(text_arg("icon", "Font Awesome icon class")),
        )
        .subcommand(
            Command::new("edit")
                .about("Change fields of an existing link")
                .arg(id_arg())
                .arg(text_arg("label", "New display name"))
                .arg(text_arg("target", "New URL or local file path"))
                .arg(text_arg("category", "New category"))
                .arg(text_arg("description", "New description (empty clears it)"))
                .arg(text_arg("icon", "New icon class (empty clears it)")),
        )
        .subcommand(Command::new("delete").about("Remove a link").arg(id_arg()))
        .subcommand(
            Command::new("reorder")
                .about("Move a link to a new position within its category")
                .arg(id_arg())
                .arg(
                    Arg::new("order")
                        .long("order")
                        .value_name("N")
                        .help("New position; links at or after it shift down")
                        .required(true)
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(
            Command::new("render")
                .about("Write the static dashboard page")
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .value_name("FILE")
                        .default_value(render::DEFAULT_PAGE_FILE)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn text_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .value_name("ID")
        .help("Link id as shown by `list`")
        .required(true)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Editor failures carry their own code; anything else is a general failure.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<LinkError>().map_or(1, LinkError::exit_code)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let store = Store::new(&path);
    debug!(config = %path.display(), "using config file");

    match matches.subcommand() {
        Some(("list", _)) => {
            let config = load_read_only(&store)?;
            print!("{}", format_list(&config));
        }
        Some(("add", sub)) => {
            let new = NewLink {
                label: text(sub, "label").unwrap_or_default(),
                target: text(sub, "target").unwrap_or_default(),
                category: text(sub, "category"),
                description: text(sub, "description"),
                icon: text(sub, "icon"),
            };
            let label = new.label.clone();
            let id = persisted(open(&store)?.add(new))?;
            println!("Added '{}' ({id}).", label.trim());
        }
        Some(("edit", sub)) => {
            let id = id(sub);
            let patch = LinkPatch {
                label: text(sub, "label"),
                target: text(sub, "target"),
                category: text(sub, "category"),
                description: text(sub, "description"),
                icon: text(sub, "icon"),
            };
            persisted(open(&store)?.edit(&id, patch))?;
            println!("Updated {id}.");
        }
        Some(("delete", sub)) => {
            let removed = persisted(open(&store)?.delete(&id(sub)))?;
            println!("Removed '{}'.", removed.label);
        }
        Some(("reorder", sub)) => {
            let id = id(sub);
            let order = sub.get_one::<u32>("order").copied().unwrap_or_default();
            persisted(open(&store)?.reorder(&id, order))?;
            println!("Moved {id} to position {order}.");
        }
        Some(("render", sub)) => {
            let out = sub
                .get_one::<PathBuf>("out")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(render::DEFAULT_PAGE_FILE));
            let count = render::write_page(&path, &out)
                .with_context(|| format!("Failed to write page to {}", out.display()))?;
            println!("Wrote {} with {count} links.", out.display());
        }
        _ => {
            let mut session = open(&store)?;
            wizard::run(&mut session)?;
        }
    }
    Ok(())
}

fn open(store: &Store) -> Result<Session> {
    Session::open(store.clone())
        .with_context(|| format!("Failed to open {}", store.path().display()))
}

/// Loads without creating the file, so `list` has no side effects.
fn load_read_only(store: &Store) -> Result<Configuration> {
    if !store.path().exists() {
        return Ok(Configuration::default());
    }
    Ok(store.load()?)
}

/// Tells the operator when a change was applied but could not be written.
fn persisted<T>(result: error::Result<T>) -> Result<T> {
    result.map_err(|e| match e {
        LinkError::Io { .. } => anyhow::Error::new(e).context("change was not saved"),
        other => other.into(),
    })
}

fn text(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn id(matches: &ArgMatches) -> String {
    text(matches, "id").unwrap_or_default()
}
