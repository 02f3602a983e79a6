//! Binary entry point for the dynasty catalog CLI.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use dynasty::{
    catalog::{Model, Series, Tech},
    demo::demo_dataset,
    graph::{NodeKey, NodeKind},
    persist::{export::export_models_csv, FlatFile},
    query::{CatalogStats, ModelDetail, ModelFilter, SeriesOverview, TechUsage},
    server::{self, ServerOptions},
    store::{Catalog, CatalogOptions, VerifyReport},
    types::{ModelId, SeriesId, TableKind, TechId},
};
use serde::Serialize;

use config::{default_data_path, CliConfig};
use ui::{format_duration, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "dynasty",
    version,
    about = "Browse and edit the BYD model catalog and its knowledge graph",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "DYNASTY_DATA",
        help = "Catalog data file (overrides the config file)"
    )]
    data: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "DYNASTY_CONFIG",
        help = "CLI config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(long, global = true, value_enum, help = "Color theme for text output")]
    theme: Option<Theme>,

    #[arg(short, long, global = true, help = "Plain output without decorations")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct AddModelCmd {
    #[arg(long, help = "Model id (default: next free id from 9000)")]
    id: Option<ModelId>,

    #[arg(long)]
    name: String,

    #[arg(long = "series", value_name = "SERIES_ID")]
    series_id: SeriesId,

    #[arg(long, help = "Price in 10k CNY; must be positive")]
    price: f64,

    #[arg(long = "range", value_name = "KM", default_value_t = 0.0)]
    range_km: f64,

    #[arg(long = "energy", value_name = "TYPE", help = "Energy type such as EV or PHEV")]
    energy_type: String,

    #[arg(long = "body", value_name = "TYPE", default_value = "")]
    body_type: String,

    #[arg(long, default_value_t = 5)]
    seats: u32,

    #[arg(long = "year", value_name = "YEAR", default_value = "")]
    launch_year: String,

    #[arg(
        long = "tech",
        value_name = "TECH_ID",
        action = ArgAction::Append,
        help = "Technology id (repeatable); at least one unless --deferred"
    )]
    tech_ids: Vec<TechId>,

    #[arg(long, help = "Insert without technologies; bind them later with `link`")]
    deferred: bool,
}

#[derive(Args, Debug)]
struct ServeCmd {
    #[arg(long, value_name = "HOST", help = "Bind address host [default: 127.0.0.1]")]
    host: Option<IpAddr>,

    #[arg(long, value_name = "PORT", help = "Bind port [default: 8080]")]
    port: Option<u16>,

    #[arg(long, value_name = "DIR", help = "Directory of static front-end assets")]
    assets: Option<PathBuf>,

    #[arg(
        long = "allow-origin",
        value_name = "ORIGIN",
        action = ArgAction::Append,
        help = "CORS origin to allow (repeatable, `*` for any)"
    )]
    allow_origins: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    #[command(about = "Print the effective config file")]
    Show,
    #[command(about = "Set a config key (data_file, brand_label, strict_reload, theme, server.*)")]
    Set { key: String, value: String },
    #[command(about = "Print the config file location")]
    Path,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "List models, cheapest first")]
    List {
        #[arg(long = "series", value_name = "SERIES_ID")]
        series_id: Option<SeriesId>,
        #[arg(long = "energy", value_name = "TYPE")]
        energy_type: Option<String>,
    },

    #[command(about = "List series with model counts")]
    Series,

    #[command(about = "List technologies with the models using them")]
    Techs,

    #[command(about = "Show one model with its series and technologies")]
    Show {
        #[arg(value_name = "MODEL_ID")]
        id: ModelId,
    },

    #[command(about = "Search model, series and technology names")]
    Search {
        #[arg(value_name = "KEYWORD")]
        keyword: String,
    },

    #[command(about = "Print the brand → series → model → tech tree")]
    Tree,

    #[command(about = "Walk the knowledge graph from a node")]
    Traverse {
        #[arg(value_enum)]
        kind: NodeKindArg,
        #[arg(default_value_t = 0)]
        id: i64,
        #[arg(long, help = "Depth-first instead of breadth-first")]
        depth_first: bool,
    },

    #[command(about = "Catalog and graph statistics")]
    Stats,

    #[command(about = "Add a series")]
    AddSeries {
        #[arg(long)]
        id: Option<SeriesId>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        intro: String,
    },

    #[command(about = "Add a technology")]
    AddTech {
        #[arg(long, help = "Tech id (default: next free id from 200)")]
        id: Option<TechId>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        intro: String,
    },

    #[command(about = "Add a model")]
    AddModel(AddModelCmd),

    #[command(about = "Bind a technology to a model")]
    Link {
        #[arg(value_name = "MODEL_ID")]
        model_id: ModelId,
        #[arg(value_name = "TECH_ID")]
        tech_id: TechId,
    },

    #[command(about = "Check referential integrity and graph consistency")]
    Verify,

    #[command(about = "Export the joined model listing as CSV")]
    Export {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    #[command(about = "Replace the catalog with the built-in demo lineup")]
    SeedDemo {
        #[arg(long, help = "Overwrite a non-empty catalog")]
        force: bool,
    },

    #[command(about = "Serve the JSON HTTP API")]
    Serve(ServeCmd),

    #[command(about = "Inspect or edit the CLI config", subcommand)]
    Config(ConfigCmd),

    #[command(about = "Print shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum NodeKindArg {
    Brand,
    Series,
    Model,
    Tech,
}

impl NodeKindArg {
    fn key(self, id: i64) -> NodeKey {
        match self {
            NodeKindArg::Brand => NodeKey::BRAND,
            NodeKindArg::Series => NodeKey::series(id),
            NodeKindArg::Model => NodeKey::model(id),
            NodeKindArg::Tech => NodeKey::tech(id),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let default_filter = match (&cli.command, cli.quiet) {
        (Command::Serve(_), _) => "info",
        (_, true) => "error",
        (_, false) => "warn",
    };
    server::install_tracing_subscriber(default_filter);

    let mut config = CliConfig::load(cli.config.clone())?;
    let theme = cli.theme.or_else(|| config.theme()).unwrap_or(Theme::Auto);
    let ui = Ui::new(theme, cli.quiet);
    let format = cli.format;

    let command = match cli.command {
        Command::Config(cmd) => return run_config(cmd, &mut config, &ui),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "dynasty", &mut std::io::stdout());
            return Ok(());
        }
        other => other,
    };

    let data_path = cli
        .data
        .or_else(|| config.data_file().cloned())
        .unwrap_or_else(default_data_path);
    let mut options = CatalogOptions {
        strict_reload: config.strict_reload(),
        ..CatalogOptions::default()
    };
    if let Some(label) = config.brand_label() {
        options.brand_label = label.to_string();
    }
    let catalog = Catalog::open(FlatFile::new(&data_path), options)?;
    let store = catalog.store();

    match command {
        Command::List {
            series_id,
            energy_type,
        } => {
            let filter = ModelFilter {
                series_id,
                energy_type,
            };
            let models = store.list_models(&filter);
            emit(format, &models, || print_models(&ui, "Models", &models))?;
        }
        Command::Series => {
            let overview = store.series_overview();
            emit(format, &overview, || print_series(&ui, &overview))?;
        }
        Command::Techs => {
            let usage = store.tech_usage();
            emit(format, &usage, || print_techs(&ui, &usage))?;
        }
        Command::Show { id } => {
            let detail = store.model_detail(id)?;
            emit(format, &detail, || print_detail(&ui, &detail))?;
        }
        Command::Search { keyword } => {
            if keyword.trim().is_empty() {
                return Err("search keyword must not be empty".into());
            }
            let models = store.search_models(&keyword);
            emit(format, &models, || {
                print_models(&ui, &format!("Models matching '{keyword}'"), &models)
            })?;
        }
        Command::Tree => {
            let tree = build_tree(&catalog);
            emit(format, &tree, || print_tree(&tree))?;
        }
        Command::Traverse {
            kind,
            id,
            depth_first,
        } => {
            let start = kind.key(id);
            let order = if depth_first {
                store.traverse_depth_first(start)
            } else {
                store.traverse_breadth_first(start)
            };
            let visited: Vec<VisitedNode> = order
                .into_iter()
                .map(|key| VisitedNode {
                    key: key.to_string(),
                    kind: key.kind,
                    label: store.node_label(key).unwrap_or_default(),
                })
                .collect();
            if visited.is_empty() {
                ui.warn(&format!("node {start} does not exist"));
            }
            emit(format, &visited, || {
                ui.list(
                    &format!(
                        "{} from {start}",
                        if depth_first { "Depth-first" } else { "Breadth-first" }
                    ),
                    visited
                        .iter()
                        .enumerate()
                        .map(|(step, node)| format!("{:>3}. {} {}", step + 1, node.key, node.label)),
                )
            })?;
        }
        Command::Stats => {
            let stats = store.stats();
            emit(format, &stats, || print_stats(&ui, &stats))?;
        }
        Command::AddSeries { id, name, intro } => {
            let id = id.unwrap_or_else(|| store.next_id(TableKind::Series, 1));
            catalog.add_series(Series::new(id, name, intro))?;
            let outcome = serde_json::json!({ "series_id": id });
            emit(format, &outcome, || ui.success(&format!("series {id} added")))?;
        }
        Command::AddTech { id, name, intro } => {
            let id = id.unwrap_or_else(|| store.next_id(TableKind::Tech, 200));
            catalog.add_tech(Tech::new(id, name, intro))?;
            let outcome = serde_json::json!({ "tech_id": id });
            emit(format, &outcome, || ui.success(&format!("tech {id} added")))?;
        }
        Command::AddModel(cmd) => {
            let id = cmd
                .id
                .unwrap_or_else(|| store.next_id(TableKind::Model, 9000));
            let model = Model {
                id,
                name: cmd.name.clone(),
                series_id: cmd.series_id,
                price: cmd.price,
                range_km: cmd.range_km,
                energy_type: cmd.energy_type.clone(),
                body_type: cmd.body_type.clone(),
                seats: cmd.seats,
                launch_year: cmd.launch_year.clone(),
            };
            if cmd.deferred {
                catalog.add_model_deferred(model)?;
                for tech_id in &cmd.tech_ids {
                    catalog.link(id, *tech_id)?;
                }
            } else {
                catalog.add_model(model, &cmd.tech_ids)?;
            }
            let detail = store.model_detail(id)?;
            emit(format, &detail, || {
                ui.success(&format!("model {id} added"));
                print_detail(&ui, &detail);
            })?;
        }
        Command::Link { model_id, tech_id } => {
            let created = catalog.link(model_id, tech_id)?;
            let outcome = serde_json::json!({
                "model_id": model_id,
                "tech_id": tech_id,
                "created": created,
            });
            emit(format, &outcome, || {
                if created {
                    ui.success(&format!("model {model_id} now uses tech {tech_id}"));
                } else {
                    ui.info(&format!("model {model_id} already uses tech {tech_id}"));
                }
            })?;
        }
        Command::Verify => {
            let report = store.verify();
            emit(format, &report, || print_verify(&ui, &report))?;
            if !report.success {
                std::process::exit(2);
            }
        }
        Command::Export { out } => {
            let task = ui.task(format!("exporting models to {}", out.display()));
            let models = store.list_models(&ModelFilter::default());
            let rows = export_models_csv(&out, &models)?;
            let elapsed = task.finish();
            let outcome = serde_json::json!({ "path": out.display().to_string(), "rows": rows });
            emit(format, &outcome, || {
                ui.success(&format!(
                    "exported {rows} models to {} in {}",
                    out.display(),
                    format_duration(elapsed)
                ))
            })?;
        }
        Command::SeedDemo { force } => {
            if !force && store.stats().model_count > 0 {
                return Err(format!(
                    "{} already holds models; pass --force to replace them",
                    data_path.display()
                )
                .into());
            }
            let task = ui.task("seeding demo catalog");
            let summary = store.reload(&demo_dataset())?;
            catalog.save()?;
            task.finish();
            emit(format, &summary, || {
                ui.success(&format!(
                    "seeded {} series, {} techs, {} models into {}",
                    summary.series,
                    summary.techs,
                    summary.models,
                    data_path.display()
                ))
            })?;
        }
        Command::Serve(cmd) => {
            let defaults = ServerOptions::default();
            let section = config.server();
            let options = ServerOptions {
                host: cmd.host.or(section.host).unwrap_or(defaults.host),
                port: cmd.port.or(section.port).unwrap_or(defaults.port),
                assets_dir: cmd.assets.or_else(|| section.assets.clone()),
                allow_origins: if cmd.allow_origins.is_empty() {
                    section.allow_origins.clone()
                } else {
                    cmd.allow_origins
                },
            };
            if let Err(err) = server::serve(Arc::new(catalog), options).await {
                eprintln!("server terminated: {err}");
                return Err(err.into());
            }
        }
        Command::Config(_) | Command::Completions { .. } => {}
    }

    Ok(())
}

fn run_config(cmd: ConfigCmd, config: &mut CliConfig, ui: &Ui) -> Result<(), Box<dyn Error>> {
    match cmd {
        ConfigCmd::Show => print!("{}", config.render()?),
        ConfigCmd::Set { key, value } => {
            config.set(&key, &value)?;
            let path = config.persist()?;
            ui.success(&format!("{key} updated in {}", path.display()));
        }
        ConfigCmd::Path => match config.path() {
            Some(path) => println!("{}", path.display()),
            None => return Err("no config directory found".into()),
        },
    }
    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct VisitedNode {
    key: String,
    kind: NodeKind,
    label: String,
}

#[derive(Debug, Serialize)]
struct TreeSeries {
    #[serde(flatten)]
    series: SeriesOverview,
    models: Vec<ModelDetail>,
}

#[derive(Debug, Serialize)]
struct Tree {
    brand: String,
    series: Vec<TreeSeries>,
}

fn build_tree(catalog: &Catalog) -> Tree {
    let store = catalog.store();
    store.read(|engine| Tree {
        brand: store.options().brand_label.clone(),
        series: engine
            .series_overview()
            .into_iter()
            .map(|overview| {
                let models = engine
                    .series_models(overview.series.id)
                    .into_iter()
                    .filter_map(|id| engine.model_detail(id))
                    .collect();
                TreeSeries {
                    series: overview,
                    models,
                }
            })
            .collect(),
    })
}

fn print_tree(tree: &Tree) {
    println!("{}", tree.brand);
    let series_count = tree.series.len();
    for (index, entry) in tree.series.iter().enumerate() {
        let last_series = index + 1 == series_count;
        let (branch, stem) = if last_series {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        println!(
            "{branch}{} ({} models)",
            entry.series.series.name, entry.series.model_count
        );
        let model_count = entry.models.len();
        for (model_index, detail) in entry.models.iter().enumerate() {
            let twig = if model_index + 1 == model_count {
                "└── "
            } else {
                "├── "
            };
            let techs = if detail.techs.is_empty() {
                String::new()
            } else {
                format!("  [{}]", detail.techs.join(", "))
            };
            println!("{stem}{twig}{}{techs}", detail.model.name);
        }
    }
}

fn model_row(detail: &ModelDetail) -> Vec<String> {
    let model = &detail.model;
    vec![
        model.id.to_string(),
        model.name.clone(),
        detail.series_name.clone(),
        format!("{:.2}", model.price),
        format!("{:.0}", model.range_km),
        model.energy_type.clone(),
        model.body_type.clone(),
        model.seats.to_string(),
        model.launch_year.clone(),
    ]
}

fn print_models(ui: &Ui, title: &str, models: &[ModelDetail]) {
    let rows: Vec<Vec<String>> = models.iter().map(model_row).collect();
    ui.table(
        title,
        &[
            "ID", "Name", "Series", "Price(万)", "Range(km)", "Energy", "Body", "Seats", "Year",
        ],
        &rows,
    );
}

fn print_series(ui: &Ui, overview: &[SeriesOverview]) {
    let rows: Vec<Vec<String>> = overview
        .iter()
        .map(|entry| {
            vec![
                entry.series.id.to_string(),
                entry.series.name.clone(),
                entry.model_count.to_string(),
                entry.series.intro.clone(),
            ]
        })
        .collect();
    ui.table("Series", &["ID", "Name", "Models", "Intro"], &rows);
}

fn print_techs(ui: &Ui, usage: &[TechUsage]) {
    let rows: Vec<Vec<String>> = usage
        .iter()
        .map(|entry| {
            vec![
                entry.tech.id.to_string(),
                entry.tech.name.clone(),
                entry.model_ids.len().to_string(),
                entry.tech.intro.clone(),
            ]
        })
        .collect();
    ui.table("Technologies", &["ID", "Name", "Models", "Intro"], &rows);
}

fn print_detail(ui: &Ui, detail: &ModelDetail) {
    let model = &detail.model;
    ui.section(
        &format!("{} (#{})", model.name, model.id),
        [
            ("series", format!("{} (#{})", detail.series_name, model.series_id)),
            ("price", format!("{:.2} 万元", model.price)),
            ("range", format!("{:.0} km", model.range_km)),
            ("energy", model.energy_type.clone()),
            ("body", model.body_type.clone()),
            ("seats", model.seats.to_string()),
            ("launched", model.launch_year.clone()),
        ],
    );
    ui.list(
        "Technologies",
        detail
            .tech_ids
            .iter()
            .zip(&detail.techs)
            .map(|(id, name)| format!("{name} (#{id})")),
    );
}

fn print_stats(ui: &Ui, stats: &CatalogStats) {
    let price = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
    ui.section(
        "Catalog",
        [
            ("series", stats.series_count.to_string()),
            ("models", stats.model_count.to_string()),
            ("techs", stats.tech_count.to_string()),
            ("associations", stats.association_count.to_string()),
            ("EV", stats.ev_count.to_string()),
            ("PHEV", stats.phev_count.to_string()),
            ("min price", price(stats.min_price)),
            ("max price", price(stats.max_price)),
        ],
    );
    ui.section(
        "Graph",
        [
            ("nodes", stats.node_count.to_string()),
            ("edges", stats.edge_count.to_string()),
        ],
    );
    ui.list(
        "Energy types",
        stats
            .energy_breakdown
            .iter()
            .map(|row| format!("{}: {}", row.energy_type, row.count)),
    );
}

fn print_verify(ui: &Ui, report: &VerifyReport) {
    let counts = &report.counts;
    ui.section(
        "Verify",
        [
            ("success", report.success.to_string()),
            ("series", counts.series.to_string()),
            ("techs", counts.techs.to_string()),
            ("models", counts.models.to_string()),
            ("associations", counts.associations.to_string()),
            ("nodes", counts.nodes.to_string()),
            ("edges", counts.edges.to_string()),
        ],
    );
    ui.list(
        "Findings",
        report
            .findings
            .iter()
            .map(|finding| format!("{:?}: {}", finding.severity, finding.message)),
    );
}
