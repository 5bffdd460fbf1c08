use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use roster_rs::{
    CardModel, CatalogClient, DetailsModel, Effect, LoadOutcome, RosterConfig, RosterController,
    SearchScope, UserIntent, ViewState,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "roster.toml";
const NO_RESULTS_TEXT: &str = "No characters found.";

#[derive(Parser, Debug)]
#[command(name = "roster-rs", about = "Browse a character catalog served as JSON", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file (defaults to ./roster.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the catalog endpoint.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Cards per page; 0 disables pagination.
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Match search terms against names only.
    #[arg(long, global = true)]
    name_only: bool,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Case-insensitive substring to search for.
    #[arg(short, long)]
    search: Option<String>,
    /// Occupation to restrict to ("all" disables).
    #[arg(short, long)]
    category: Option<String>,
    /// Number of pages to render.
    #[arg(long, default_value_t = 1)]
    pages: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List character cards.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show the details of one character.
    Show {
        /// Name (or part of it) to look up.
        #[arg(conflicts_with = "search")]
        name: Option<String>,
        /// Grid position to open instead of a name.
        #[arg(long, conflicts_with = "name")]
        position: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List the distinct occupations in the catalog.
    Categories,
    /// Print the card grid as an HTML fragment.
    Html {
        #[command(flatten)]
        filter: FilterArgs,
        /// Also print the details modal for this grid position.
        #[arg(long)]
        details: Option<usize>,
    },
    /// Interactive session driven by one action per line.
    Browse,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    let config = build_config(&cli)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(cli, config))
}

fn init_tracing(verbose: bool, as_json: bool) {
    let default_directive = if verbose { "roster_rs=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if as_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_config(cli: &Cli) -> Result<RosterConfig, Box<dyn Error>> {
    let file = match &cli.config {
        Some(path) if !path.exists() => {
            return Err(format!("config file {} does not exist", path.display()).into());
        }
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|path| path.exists()),
    };
    if let Some(path) = &file {
        debug!(path = %path.display(), "loading configuration file");
    }
    let mut config = RosterConfig::load(file.as_deref())?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    if cli.name_only {
        config.search_scope = SearchScope::NameOnly;
    }
    config.validate()?;
    Ok(config)
}

async fn execute(cli: Cli, config: RosterConfig) -> Result<(), Box<dyn Error>> {
    let client = CatalogClient::from_config(&config)?;
    let mut controller = RosterController::new(&config);
    let as_json = cli.json;

    if let Command::Browse = cli.command {
        return browse(&client, &mut controller, as_json).await;
    }

    if let LoadOutcome::Failed { message } = controller.reload(&client).await {
        return Err(message.into());
    }

    match cli.command {
        Command::List { filter } => {
            apply_filter(&mut controller, &filter);
            print_grid(&controller, as_json)
        }
        Command::Show {
            name,
            position,
            filter,
        } => handle_show(&mut controller, name, position, &filter, as_json),
        Command::Categories => print_categories(&controller.categories(), as_json),
        Command::Html { filter, details } => {
            apply_filter(&mut controller, &filter);
            handle_html(&mut controller, details)
        }
        Command::Browse => Ok(()),
    }
}

fn apply_filter(controller: &mut RosterController, filter: &FilterArgs) {
    if let Some(category) = &filter.category {
        controller.dispatch(UserIntent::SelectCategory(category.clone()));
    }
    if let Some(term) = &filter.search {
        controller.dispatch(UserIntent::Search(term.clone()));
    }
    for _ in 1..filter.pages.max(1) {
        if controller.dispatch(UserIntent::LoadMore) == Effect::None {
            break;
        }
    }
}

fn handle_show(
    controller: &mut RosterController,
    name: Option<String>,
    position: Option<usize>,
    filter: &FilterArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    apply_filter(controller, filter);
    let position = match (name, position) {
        (_, Some(position)) => {
            while controller.grid().len() <= position {
                if controller.dispatch(UserIntent::LoadMore) == Effect::None {
                    break;
                }
            }
            position
        }
        (Some(name), None) => {
            controller.dispatch(UserIntent::Search(name.clone()));
            let needle = name.trim().to_lowercase();
            controller
                .grid()
                .cards()
                .iter()
                .find(|card| card.name.to_lowercase().contains(&needle))
                .or_else(|| controller.grid().card(0))
                .map(|card| card.position)
                .ok_or_else(|| format!("No character matches {name:?}"))?
        }
        (None, None) => return Err("Provide a name or --position".into()),
    };

    match controller.dispatch(UserIntent::OpenDetails(position)) {
        Effect::ShowDetails(details) => {
            print_details(&details, as_json)?;
            Ok(())
        }
        _ => Err(format!("No character at position {position}").into()),
    }
}

fn handle_html(
    controller: &mut RosterController,
    details: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    println!("{}", controller.grid().to_html(NO_RESULTS_TEXT)?);
    if let Some(position) = details {
        match controller.dispatch(UserIntent::OpenDetails(position)) {
            Effect::ShowDetails(details) => println!("{}", details.to_html()?),
            _ => return Err(format!("No character at position {position}").into()),
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Intent(UserIntent),
    Stats,
    Show,
    Help,
    Quit,
}

fn parse_action(line: &str) -> Result<Action, String> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));
    let position = |rest: &str| {
        rest.parse::<usize>()
            .map_err(|_| format!("expected a card number, got {rest:?}"))
    };
    let action = match verb.to_lowercase().as_str() {
        "search" | "s" => Action::Intent(UserIntent::Search(rest.to_string())),
        "category" | "c" => Action::Intent(UserIntent::SelectCategory(if rest.is_empty() {
            roster_rs::ALL_CATEGORIES.to_string()
        } else {
            rest.to_string()
        })),
        "more" | "m" => Action::Intent(UserIntent::LoadMore),
        "open" | "o" => Action::Intent(UserIntent::OpenDetails(position(rest)?)),
        "close" => Action::Intent(UserIntent::CloseDetails),
        "broken" => Action::Intent(UserIntent::ImageFailed(position(rest)?)),
        "retry" | "r" => Action::Intent(UserIntent::Retry),
        "stats" => Action::Stats,
        "show" | "ls" | "" => Action::Show,
        "help" | "?" => Action::Help,
        "quit" | "exit" | "q" => Action::Quit,
        other => return Err(format!("unknown action {other:?}; type `help`")),
    };
    Ok(action)
}

async fn browse(
    client: &CatalogClient,
    controller: &mut RosterController,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    println!("Loading characters...");
    controller.reload(client).await;
    print_state(controller, as_json)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("roster> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let action = match parse_action(&line?) {
            Ok(action) => action,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        match action {
            Action::Quit => break,
            Action::Help => print_help(),
            Action::Stats => print_stats(controller, as_json)?,
            Action::Show => print_state(controller, as_json)?,
            Action::Intent(intent) => match controller.dispatch(intent) {
                Effect::None => {}
                Effect::Rerendered => print_state(controller, as_json)?,
                Effect::ShowDetails(details) => print_details(&details, as_json)?,
                Effect::Fetch(ticket) => {
                    println!("Loading characters...");
                    let result = client.load_catalog(ticket.url()).await;
                    controller.finish_load(ticket, result);
                    print_state(controller, as_json)?;
                }
            },
        }
    }
    Ok(())
}

fn print_help() {
    println!("Actions:");
    println!("  search <term>      filter by name, occupation or history");
    println!("  category <name>    filter by occupation (`category all` resets)");
    println!("  more               load the next page");
    println!("  open <n>           show card n");
    println!("  close              close the details view");
    println!("  broken <n>         mark the image of card n as failed");
    println!("  retry              reload the catalog");
    println!("  stats | show | help | quit");
}

fn print_state(controller: &RosterController, as_json: bool) -> Result<(), Box<dyn Error>> {
    match controller.state() {
        ViewState::Loading => println!("Loading characters..."),
        ViewState::Error { message } => {
            if as_json {
                println!("{}", serde_json::to_string_pretty(controller.state())?);
            } else {
                println!("{message}");
                println!("Type `retry` to try again.");
            }
        }
        ViewState::Idle | ViewState::NoResults => print_grid(controller, as_json)?,
    }
    Ok(())
}

fn print_grid(controller: &RosterController, as_json: bool) -> Result<(), Box<dyn Error>> {
    let grid = controller.grid();
    if as_json {
        let payload = json!({
            "query": controller.query(),
            "state": controller.state(),
            "stats": controller.stats(),
            "has_more": grid.load_more_visible(),
            "cards": grid.cards(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if grid.is_empty() {
        println!("{NO_RESULTS_TEXT}");
    } else {
        print_card_table(grid.cards());
    }
    print_stats(controller, false)?;
    if grid.load_more_visible() {
        println!("More characters available (`more`, or --pages {}).", grid.cursor() + 2);
    }
    Ok(())
}

fn print_stats(controller: &RosterController, as_json: bool) -> Result<(), Box<dyn Error>> {
    let stats = controller.stats();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "Showing {} of {} matching characters ({} loaded).",
            stats.displayed, stats.matched, stats.total
        );
    }
    Ok(())
}

fn print_card_table(cards: &[CardModel]) {
    let name_width = cards
        .iter()
        .map(|card| card.name.chars().count())
        .max()
        .unwrap_or(4)
        .max("NAME".len());
    println!("{:>4}  {:<name_width$}  {}", "#", "NAME", "OCCUPATION", name_width = name_width);
    println!("{:->4}  {:-<name_width$}  {}", "", "", "----------", name_width = name_width);
    for card in cards {
        println!(
            "{:>4}  {:<name_width$}  {}",
            card.position,
            card.name,
            card.occupation.as_deref().unwrap_or("-"),
            name_width = name_width
        );
    }
}

fn print_categories(categories: &[String], as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(categories)?);
        return Ok(());
    }
    if categories.is_empty() {
        println!("No occupations found.");
        return Ok(());
    }
    for category in categories {
        println!("{category}");
    }
    Ok(())
}

fn print_details(details: &DetailsModel, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(details)?);
    } else if stdout_is_tty() {
        render_markdown_block(&details.markdown());
    } else {
        println!("{}", details.alert_text());
    }
    Ok(())
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    let skin = MadSkin::default();
    let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
    println!("{formatted}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_intents() {
        assert_eq!(
            parse_action("search  homer simpson ").unwrap(),
            Action::Intent(UserIntent::Search("homer simpson".into()))
        );
        assert_eq!(
            parse_action("category").unwrap(),
            Action::Intent(UserIntent::SelectCategory("all".into()))
        );
        assert_eq!(parse_action("more").unwrap(), Action::Intent(UserIntent::LoadMore));
        assert_eq!(
            parse_action("open 3").unwrap(),
            Action::Intent(UserIntent::OpenDetails(3))
        );
        assert_eq!(parse_action("RETRY").unwrap(), Action::Intent(UserIntent::Retry));
        assert_eq!(parse_action("").unwrap(), Action::Show);
        assert_eq!(parse_action("q").unwrap(), Action::Quit);
    }

    #[test]
    fn rejects_bad_actions() {
        assert!(parse_action("open first").is_err());
        assert!(parse_action("dance").is_err());
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "roster-rs",
            "--endpoint",
            "http://localhost:1234/chars",
            "--page-size",
            "0",
            "--name-only",
            "list",
            "--search",
            "bart",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.endpoint, "http://localhost:1234/chars");
        assert_eq!(config.page_size(), None);
        assert_eq!(config.search_scope, SearchScope::NameOnly);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::parse_from([
            "roster-rs",
            "--config",
            "/nonexistent/roster.toml",
            "categories",
        ]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn show_name_and_search_conflict() {
        let err = Cli::try_parse_from(["roster-rs", "show", "homer", "--search", "ned"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        let by_position =
            Cli::try_parse_from(["roster-rs", "show", "--position", "2", "--search", "ned"]);
        assert!(by_position.is_ok());
        let with_category =
            Cli::try_parse_from(["roster-rs", "show", "homer", "--category", "all"]);
        assert!(with_category.is_ok());
    }
}
