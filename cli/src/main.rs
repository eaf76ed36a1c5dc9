use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

use clap::{Args, Parser, Subcommand};
use databind::gateway::http::DEFAULT_ENDPOINT;
use databind::{
    Button, ConfigError, DataError, DataSource, EventKind, FieldSet, Form, FormConfig, FormOutcome, Gateway,
    GatewayConfig, GatewayError, HttpGateway, ListView, TextBox, Tree, TreeError,
};
use tracing_subscriber::EnvFilter;

/// Element id the page registers its one data source under.
const SOURCE_ID: &str = "records";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid assignment {0:?}; expected field=value")]
    InvalidAssignment(String),
    #[error("gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("reload task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "databind", about = "List and create records through data-bound elements")]
struct Cli {
    /// Statement endpoint of a databind server.
    #[arg(long, global = true, env = "DATABIND_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a table and print one card per record.
    List(ListArgs),
    /// Submit one record through a form, then print the refreshed table.
    Create(CreateArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    table: String,

    #[arg(long, help = "Comma-separated fields shown on each card")]
    fields: String,
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    table: String,

    #[arg(long, help = "Comma-separated fields that must be non-empty")]
    required: Option<String>,

    #[arg(long, help = "Fields shown in the refreshed list; defaults to the assigned fields")]
    fields: Option<String>,

    #[arg(required = true, value_parser = parse_assignment, help = "field=value pairs")]
    values: Vec<(String, String)>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut out = io::stdout().lock();
    tokio::task::LocalSet::new().run_until(run(cli, &mut out)).await
}

async fn run(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    tracing::debug!(endpoint = %cli.endpoint, command = ?cli.command, "running command");
    match cli.command {
        Command::List(args) => run_list(&cli.endpoint, args, out).await,
        Command::Create(args) => run_create(&cli.endpoint, args, out).await,
    }
}

async fn run_list(endpoint: &str, args: ListArgs, out: &mut impl Write) -> Result<(), CliError> {
    let page = Page::new(endpoint, FieldSet::parse(&args.fields))?;
    page.open(&args.table).await?;
    print_cards(out, &page.list)
}

async fn run_create(endpoint: &str, args: CreateArgs, out: &mut impl Write) -> Result<(), CliError> {
    let shown = match &args.fields {
        Some(fields) => FieldSet::parse(fields),
        None => {
            let names: Vec<&str> = args.values.iter().map(|(name, _)| name.as_str()).collect();
            FieldSet::parse(&names.join(","))
        }
    };
    let page = Page::new(endpoint, shown)?;
    page.open(&args.table).await?;

    let mut config = FormConfig::for_source(SOURCE_ID);
    if let Some(required) = &args.required {
        config = config.required(required);
    }
    config.surface_config_errors = true;

    let form = Form::attach(&page.tree, page.tree.root(), config)?;
    for (name, value) in &args.values {
        TextBox::attach(&page.tree, form.node(), Some(name.as_str()))?.set_value(value);
    }
    Button::attach(&page.tree, form.node(), Some("Create"))?.press();

    match form.settled().await {
        Some(FormOutcome::Submitted(record)) => {
            writeln!(out, "submit {}", serde_json::to_string(&record)?)?;
            print_cards(out, &page.list)
        }
        Some(FormOutcome::Invalid(message) | FormOutcome::Failed(message)) => {
            writeln!(out, "error {message}")?;
            Err(CliError::Rejected(message))
        }
        Some(FormOutcome::Aborted(err)) => Err(err.into()),
        Some(FormOutcome::Busy) | None => Err(CliError::Rejected("no submission ran".to_owned())),
    }
}

fn print_cards(out: &mut impl Write, list: &ListView) -> Result<(), CliError> {
    let text = list.render_text();
    if !text.is_empty() {
        writeln!(out, "{text}")?;
    }
    writeln!(out, "({} records)", list.card_count())?;
    Ok(())
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim().to_owned(), value.to_owned())),
        _ => Err(CliError::InvalidAssignment(raw.to_owned()).to_string()),
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// A data source plus a list bound to it.
struct Page {
    tree: Tree,
    source: DataSource,
    list: ListView,
}

impl Page {
    fn new(endpoint: &str, fields: FieldSet) -> Result<Self, CliError> {
        let gateway: Rc<dyn Gateway> = Rc::new(HttpGateway::new(GatewayConfig { endpoint: endpoint.to_owned() })?);
        let tree = Tree::new();
        let source = DataSource::attach(&tree, tree.root(), SOURCE_ID, gateway)?;
        let list = ListView::attach(&tree, tree.root())?;
        list.bind(&source, fields)?;
        Ok(Self { tree, source, list })
    }

    /// Bind `table` and wait for its first load.
    ///
    /// The background reload only logs failures, so when it applies nothing
    /// the load is repeated here to return the error.
    async fn open(&self, table: &str) -> Result<(), CliError> {
        let loaded = Rc::new(Cell::new(false));
        let flag = Rc::clone(&loaded);
        let _watch = self
            .tree
            .subscribe(self.source.node(), EventKind::RecordsChanged, move |_| flag.set(true))?;

        if let Some(reload) = self.source.set_table(table)? {
            reload.await?;
        }
        if !loaded.get() {
            self.source.load_data().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
