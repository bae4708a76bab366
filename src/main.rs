use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use erpview::{
    config::Config,
    parse::{self, DelimiterMode, Document},
    view::{render_table, search, status_records, Binding, MAX_CELL_WIDTH},
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

/// View ERP tabular exports (fixed-width text or CSV) as a column-selectable table.
#[derive(Parser, Debug)]
#[command(name = "erpview", version)]
struct Cli {
    /// Config file; `./erpview.yaml` is used when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the export as a table
    Show(ShowArgs),
    /// Print which header column each logical field resolved to
    Fields(SourceArgs),
    /// Store a local file in the upload area, replacing any file of the same name
    Upload { file: PathBuf },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Local file or http(s) URL; defaults to the configured source URL
    source: Option<String>,

    /// How lines are split into columns
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Show or hide a column by 0-based index (repeatable)
    #[arg(long = "toggle", value_name = "INDEX")]
    toggles: Vec<usize>,

    /// Keep rows whose search field contains this text (case-insensitive)
    #[arg(long)]
    search: Option<String>,

    /// Logical field searched by --search (defaults to the configured one)
    #[arg(long)]
    field: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Print plant/document/description records instead of the table
    #[arg(long)]
    records: bool,

    #[arg(long, default_value_t = MAX_CELL_WIDTH)]
    max_width: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Explicit,
    Whitespace,
    Auto,
}

impl From<ModeArg> for DelimiterMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Explicit => DelimiterMode::Explicit,
            ModeArg::Whitespace => DelimiterMode::Whitespace,
            ModeArg::Auto => DelimiterMode::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Show(args) => show(&cfg, args).await,
        Command::Fields(args) => fields(&cfg, args).await,
        Command::Upload { file } => {
            let stored = cfg
                .file_store()
                .upload_file(&file)
                .await
                .with_context(|| format!("uploading {}", file.display()))?;
            println!("{} ({} bytes)", stored.key, stored.size_bytes);
            Ok(())
        }
    }
}

/// Fetch or read the export text and parse it.
async fn load_document(cfg: &Config, args: &SourceArgs) -> Result<Document> {
    let (text, name) = match args.source.as_deref() {
        Some(s) if s.starts_with("http://") || s.starts_with("https://") => {
            let url = Url::parse(s).with_context(|| format!("invalid URL `{s}`"))?;
            let text = cfg.relay()?.fetch_url(&url).await?;
            (text, url.path().to_string())
        }
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {path}"))?;
            (String::from_utf8_lossy(&bytes).into_owned(), path.to_string())
        }
        None => {
            let relay = cfg.relay()?;
            let name = relay
                .source()
                .map(|s| s.url().path().to_string())
                .unwrap_or_default();
            (relay.fetch_text().await?, name)
        }
    };

    let mode = match (args.mode, cfg.parse.mode) {
        (Some(m), _) => m.into(),
        (None, DelimiterMode::Auto) => DelimiterMode::from_file_name(&name),
        (None, m) => m,
    };
    info!(source = %name, ?mode, bytes = text.len(), "parsing export");
    parse::parse(&text, mode).with_context(|| format!("parsing {name}"))
}

async fn show(cfg: &Config, args: ShowArgs) -> Result<()> {
    let doc = load_document(cfg, &args.source).await?;
    let session = cfg.session();
    session.load(doc);

    let (snap, _) = session.view().context("no document loaded")?;
    for &i in &args.toggles {
        if i >= snap.document.column_count() {
            warn!(index = i, columns = snap.document.column_count(), "ignoring toggle past last column");
            continue;
        }
        session.toggle(i);
    }
    let (snap, selection) = session.view().context("no document loaded")?;

    if args.records {
        let records = status_records(snap.document.rows(), &snap.binding);
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let field = args.field.as_deref().unwrap_or(&cfg.view.search_field);
    let binding = snap.binding.binding(field);
    let query = args.search.as_deref().unwrap_or("");
    if binding == Binding::Unresolved && !query.trim().is_empty() {
        warn!(field, "search field not found in header; nothing can match");
    }
    let rows = search(snap.document.rows(), binding, query);
    let view = selection.project(snap.document.header(), rows);

    match args.format {
        Format::Table => print!("{}", render_table(&view, args.max_width)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}

async fn fields(cfg: &Config, args: SourceArgs) -> Result<()> {
    let doc = load_document(cfg, &args).await?;
    let session = cfg.session();
    let snap = session.load(doc);
    for (name, binding) in snap.binding.iter() {
        match binding {
            Binding::Column(i) => println!("{name}: {i} ({})", snap.document.header()[i]),
            Binding::Unresolved => println!("{name}: unresolved"),
        }
    }
    Ok(())
}
