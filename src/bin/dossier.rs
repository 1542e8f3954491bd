//! Dossier CLI: record coreference labels and query the constraint graph.
//!
//! Usage:
//!   dossier label <subcommand> [--db path]
//!   dossier fc <subcommand> [--db path]

use clap::{Args, Parser, Subcommand};
use dossier::config::Settings;
use dossier::{
    CorefValue, Cursor, DossierApi, DossierEngine, FeatureCollection, Label, LabelFetcher, Node,
    OpenStore, SqliteStore,
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dossier",
    version,
    about = "Coreference label store with must-link / cannot-link inference"
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and query labels
    Label {
        #[command(subcommand)]
        action: LabelAction,
    },
    /// Store and read feature collections
    Fc {
        #[command(subcommand)]
        action: FcAction,
    },
}

#[derive(Subcommand)]
enum LabelAction {
    /// Record a label between two content items
    Add {
        cid1: String,
        cid2: String,
        /// Who made the judgment
        #[arg(long)]
        annotator: String,
        #[arg(long)]
        subtopic1: Option<String>,
        #[arg(long)]
        subtopic2: Option<String>,
        /// Record a cannot-link judgment instead of must-link
        #[arg(long)]
        negative: bool,
    },
    /// List every stored label touching a node
    List {
        cid: String,
        #[arg(long)]
        subtopic: Option<String>,
    },
    /// Run a label query and print one page
    Query {
        #[command(flatten)]
        anchor: QueryArgs,
    },
    /// Verify graph invariants and list contradictions
    Check,
}

#[derive(Args)]
struct QueryArgs {
    cid: String,
    #[arg(long)]
    subtopic: Option<String>,
    /// connected, negative-inference, expanded or direct
    #[arg(long, default_value = "connected")]
    which: String,
    #[arg(long)]
    perpage: Option<usize>,
    /// Cursor token from a previous page
    #[arg(long)]
    after: Option<String>,
}

#[derive(Subcommand)]
enum FcAction {
    /// Store a feature collection read from a JSON file ("-" for stdin)
    Put { cid: String, file: PathBuf },
    /// Print a feature collection
    Get { cid: String },
    /// Print the resolved value of one feature
    Value { cid: String, name: String },
    /// Print a random feature collection
    Random,
}

/// Page as printed, with the cursor as an opaque token
#[derive(Serialize)]
struct PrintedPage {
    labels: Vec<Label>,
    next: Option<String>,
    has_more: bool,
    contradictions: Vec<dossier::Contradiction>,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_api(settings: &Settings) -> Result<DossierApi, String> {
    let store = SqliteStore::open(&settings.db_path)
        .map_err(|e| format!("Failed to open database: {}", e))?;
    let engine = DossierEngine::with_store(Arc::new(store));
    let replayed = engine
        .load_all()
        .map_err(|e| format!("Failed to load labels: {}", e))?;
    debug!(replayed, "engine ready");
    Ok(DossierApi::new(Arc::new(engine)))
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_label_add(
    api: &DossierApi,
    cid1: String,
    cid2: String,
    annotator: String,
    subtopic1: Option<String>,
    subtopic2: Option<String>,
    negative: bool,
) -> i32 {
    let value = if negative {
        CorefValue::Negative
    } else {
        CorefValue::Positive
    };
    let label = Label::new(
        Node::from_parts(cid1, subtopic1),
        Node::from_parts(cid2, subtopic2),
        annotator,
        value,
    );
    match api.add_label(label) {
        Ok(outcome) => {
            if let Some(c) = &outcome.contradiction {
                eprintln!(
                    "Warning: label {} recorded but contradicts existing constraints ({:?})",
                    outcome.seq, c.kind
                );
            }
            print_json(&outcome)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_label_list(api: &DossierApi, cid: String, subtopic: Option<String>) -> i32 {
    match api.labels_touching(&Node::from_parts(cid, subtopic)) {
        Ok(labels) => print_json(&labels),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_label_query(api: &DossierApi, args: QueryArgs) -> i32 {
    let mut fetcher = LabelFetcher::new().cid(args.cid).which(args.which);
    if let Some(subtopic) = args.subtopic {
        fetcher = fetcher.subtopic(subtopic);
    }
    if let Some(perpage) = args.perpage {
        fetcher = fetcher.perpage(perpage);
    }
    if let Some(token) = args.after {
        match Cursor::decode(&token) {
            Ok(cursor) => fetcher = fetcher.after(cursor),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }

    let page = match api.query(&fetcher) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let next = match page.cursor.as_ref().map(Cursor::encode).transpose() {
        Ok(next) => next,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    print_json(&PrintedPage {
        labels: page.labels,
        next,
        has_more: page.has_more,
        contradictions: page.contradictions,
    })
}

fn cmd_label_check(api: &DossierApi) -> i32 {
    if let Err(e) = api.verify() {
        eprintln!("Error: {}", e);
        return 1;
    }
    match api.contradictions() {
        Ok(contradictions) if contradictions.is_empty() => {
            println!("Constraint graph consistent; no contradictions.");
            0
        }
        Ok(contradictions) => print_json(&contradictions),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn read_feature_collection(file: &Path) -> Result<FeatureCollection, String> {
    let text = if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("cannot read stdin: {}", e))?;
        text
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| format!("cannot read '{}': {}", file.display(), e))?
    };
    serde_json::from_str(&text).map_err(|e| format!("invalid feature collection: {}", e))
}

fn cmd_fc_put(api: &DossierApi, cid: &str, file: &Path) -> i32 {
    let fc = match read_feature_collection(file) {
        Ok(fc) => fc,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match api.fc_put(cid, fc) {
        Ok(()) => {
            println!("Stored feature collection for '{}'", cid);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_fc_get(api: &DossierApi, cid: &str) -> i32 {
    match api.fc_get(cid) {
        Ok(Some(fc)) => print_json(&fc),
        Ok(None) => {
            eprintln!("Error: no feature collection for '{}'", cid);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_fc_value(api: &DossierApi, cid: &str, name: &str) -> i32 {
    match api.feature_value(cid, name) {
        Ok(value) => print_json(&value),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_fc_random(api: &DossierApi) -> i32 {
    match api.fc_random() {
        Ok(Some(pair)) => print_json(&pair),
        Ok(None) => {
            eprintln!("Error: no feature collections stored");
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings.with_overrides(cli.db, cli.log_level),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&settings.log_level);

    let api = match open_api(&settings) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Label { action } => match action {
            LabelAction::Add {
                cid1,
                cid2,
                annotator,
                subtopic1,
                subtopic2,
                negative,
            } => cmd_label_add(&api, cid1, cid2, annotator, subtopic1, subtopic2, negative),
            LabelAction::List { cid, subtopic } => cmd_label_list(&api, cid, subtopic),
            LabelAction::Query { anchor } => cmd_label_query(&api, anchor),
            LabelAction::Check => cmd_label_check(&api),
        },
        Commands::Fc { action } => match action {
            FcAction::Put { cid, file } => cmd_fc_put(&api, &cid, &file),
            FcAction::Get { cid } => cmd_fc_get(&api, &cid),
            FcAction::Value { cid, name } => cmd_fc_value(&api, &cid, &name),
            FcAction::Random => cmd_fc_random(&api),
        },
    };
    std::process::exit(code);
}
