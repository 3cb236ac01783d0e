//! Binary entry point for the pagelens command line tool.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use pagelens::inspect::{
    density_map_report, heap_page_report, index_bloat_report, index_page_report, load_snapshot,
    table_health_report, DensityMapReport, HeapPageReport, IndexBloatReport, IndexPageReport,
    TableHealthReport,
};
use pagelens::types::snapshot::{
    DensityMapRecord, HeapPageSnapshot, IndexPageSnapshot, IndexStatsRecord, TableDetailRecord,
};
use pagelens::{decode_key, ByteOrder, DecodedKey, HealthPolicy, KeyLayout, KeyWidth};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use config::CliConfig;
use ui::{Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "pagelens",
    version,
    about = "Inspect page snapshots of tables and indexes",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for reports"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "PAGELENS_CONFIG",
        help = "Config file (defaults to the user config directory)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, help = "Colour theme for text output")]
    theme: Option<ThemeArg>,

    #[arg(long, short, global = true, help = "Plain output without icons or spinners")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct KeyLayoutArgs {
    #[arg(
        long,
        value_enum,
        default_value_t = WidthArg::Auto,
        help = "Key width in bytes"
    )]
    width: WidthArg,

    #[arg(
        long,
        value_enum,
        default_value_t = ByteOrderArg::Little,
        help = "Byte order of the hex tokens"
    )]
    byte_order: ByteOrderArg,
}

impl From<KeyLayoutArgs> for KeyLayout {
    fn from(args: KeyLayoutArgs) -> Self {
        KeyLayout {
            width: args.width.into(),
            order: args.byte_order.into(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Decode hex key bytes into an integer")]
    DecodeKey {
        #[command(flatten)]
        layout: KeyLayoutArgs,

        #[arg(value_name = "HEX", help = "Hex byte tokens, e.g. 01 00 00 00")]
        bytes: Vec<String>,
    },

    #[command(about = "Report layout and version chains of a heap page snapshot")]
    HeapPage {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    #[command(about = "Report keys and fill of an index page snapshot")]
    IndexPage {
        #[command(flatten)]
        layout: KeyLayoutArgs,

        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    #[command(about = "Estimate index bloat from index statistics")]
    IndexBloat {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    #[command(about = "Report dead-tuple health of a table")]
    TableHealth {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    #[command(about = "Summarise a per-page density map")]
    DensityMap {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    #[command(subcommand, about = "Inspect or create the config file")]
    Config(ConfigCmd),

    #[command(about = "Print shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    #[command(about = "Print the effective configuration")]
    Show,
    #[command(about = "Print the config file path")]
    Path,
    #[command(about = "Write a config file holding the defaults")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Plain => Theme::Plain,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum WidthArg {
    Auto,
    #[value(name = "2")]
    Two,
    #[value(name = "4")]
    Four,
}

impl From<WidthArg> for KeyWidth {
    fn from(width: WidthArg) -> Self {
        match width {
            WidthArg::Auto => KeyWidth::Auto,
            WidthArg::Two => KeyWidth::Int2,
            WidthArg::Four => KeyWidth::Int4,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ByteOrderArg {
    Little,
    Big,
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(order: ByteOrderArg) -> Self {
        match order {
            ByteOrderArg::Little => ByteOrder::Little,
            ByteOrderArg::Big => ByteOrder::Big,
        }
    }
}

#[derive(Debug, Serialize)]
struct DecodeKeyOutput {
    input: String,
    layout: KeyLayout,
    key: DecodedKey,
    display: String,
}

#[derive(Debug, Serialize)]
struct ConfigOutput<'a> {
    path: Option<&'a Path>,
    theme: Option<&'static str>,
    policy: &'a HealthPolicy,
}

fn main() {
    install_tracing_subscriber();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn install_tracing_subscriber() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .try_init();
    });
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Completions must work even with a broken config file.
    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "pagelens", &mut io::stdout());
        return Ok(());
    }

    let mut config = CliConfig::load(cli.config.clone())?;
    let theme = cli.theme.or(config.theme()).unwrap_or(ThemeArg::Auto);
    let ui = Ui::new(theme.into(), cli.quiet);
    let policy = *config.policy();

    match cli.command {
        Command::DecodeKey { layout, bytes } => {
            let input = bytes.join(" ");
            let layout = KeyLayout::from(layout);
            let key = decode_key(&input, layout);
            let output = DecodeKeyOutput {
                display: key.to_string(),
                input,
                layout,
                key,
            };
            emit(cli.format, &output, || print_decoded_key(&ui, &output))?;
        }
        Command::HeapPage { path } => {
            let snapshot: HeapPageSnapshot = load_with_spinner(&ui, cli.format, &path)?;
            let report = heap_page_report(&snapshot, &policy);
            emit(cli.format, &report, || print_heap_page(&ui, &report))?;
        }
        Command::IndexPage { layout, path } => {
            let snapshot: IndexPageSnapshot = load_with_spinner(&ui, cli.format, &path)?;
            let report = index_page_report(&snapshot, layout.into(), &policy);
            emit(cli.format, &report, || print_index_page(&ui, &report))?;
        }
        Command::IndexBloat { path } => {
            let stats: IndexStatsRecord = load_with_spinner(&ui, cli.format, &path)?;
            let report = index_bloat_report(&stats, &policy);
            emit(cli.format, &report, || print_index_bloat(&ui, &report))?;
        }
        Command::TableHealth { path } => {
            let detail: TableDetailRecord = load_with_spinner(&ui, cli.format, &path)?;
            let report = table_health_report(&detail, &policy);
            emit(cli.format, &report, || print_table_health(&ui, &report))?;
        }
        Command::DensityMap { path } => {
            let map: DensityMapRecord = load_with_spinner(&ui, cli.format, &path)?;
            let report = density_map_report(&map, &policy);
            emit(cli.format, &report, || print_density_map(&ui, &report))?;
        }
        Command::Config(cmd) => run_config(cmd, &mut config, &ui, cli.format)?,
        Command::Completions { .. } => {}
    }

    Ok(())
}

fn run_config(
    cmd: ConfigCmd,
    config: &mut CliConfig,
    ui: &Ui,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        ConfigCmd::Show => {
            let output = ConfigOutput {
                path: config.path(),
                theme: config.theme().map(theme_name),
                policy: config.policy(),
            };
            emit(format, &output, || {
                match config.to_toml() {
                    Ok(text) => print!("{text}"),
                    Err(err) => ui.warn(&err.to_string()),
                }
            })?;
        }
        ConfigCmd::Path => match config.path() {
            Some(path) => println!("{}", path.display()),
            None => return Err("no config directory found; pass --config".into()),
        },
        ConfigCmd::Init { force } => {
            let path = config.init(force)?;
            ui.success(&format!("wrote default config to {}", path.display()));
        }
    }
    Ok(())
}

fn theme_name(theme: ThemeArg) -> &'static str {
    match theme {
        ThemeArg::Auto => "auto",
        ThemeArg::Light => "light",
        ThemeArg::Dark => "dark",
        ThemeArg::Plain => "plain",
    }
}

fn load_with_spinner<T: DeserializeOwned>(
    ui: &Ui,
    format: OutputFormat,
    path: &Path,
) -> Result<T, Box<dyn Error>> {
    if format == OutputFormat::Json {
        return Ok(load_snapshot(path)?);
    }
    let task = ui.task(format!("Loading {}", path.display()));
    let snapshot = load_snapshot(path)?;
    task.finish();
    Ok(snapshot)
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

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn print_decoded_key(ui: &Ui, output: &DecodeKeyOutput) {
    let kind = match output.key {
        DecodedKey::Int(_) => "integer",
        DecodedKey::UnboundedLow => "unbounded low",
        DecodedKey::Raw(_) => "raw",
    };
    ui.section(
        "Key",
        [
            ("input", output.input.clone()),
            ("kind", kind.to_string()),
            ("value", output.display.clone()),
        ],
    );
}

fn print_heap_page(ui: &Ui, report: &HeapPageReport) {
    ui.section(
        &format!("Heap page {}", report.page_id),
        [
            ("page size", report.page_size.to_string()),
            ("used bytes", report.used_bytes.to_string()),
            ("free bytes", report.free_bytes.to_string()),
            ("density", percent(report.metrics.density)),
            ("tuples", report.tuple_count.to_string()),
            ("live", report.live_count.to_string()),
            ("dead", report.dead_count.to_string()),
            ("dead pointers", report.dead_line_pointers.to_string()),
            ("hot", report.hot_count.to_string()),
            ("fill", report.fill.to_string()),
            ("tier", report.tier.to_string()),
        ],
    );
    ui.spacer();
    ui.list(
        "Version chains",
        report.chains.iter().map(|chain| {
            let path = chain
                .slots
                .iter()
                .map(|slot| slot.to_string())
                .collect::<Vec<_>>()
                .join(" → ");
            if chain.truncated {
                format!("{path} → …")
            } else {
                path
            }
        }),
    );
    if report.chains.is_empty() {
        ui.info("no version chains on this page");
    }
    if report.chains.iter().any(|chain| chain.truncated) {
        ui.warn("some chains were cut at the hop limit");
    }
    ui.list(
        "Tuples",
        report.tuples.iter().map(|tuple| {
            let state = if tuple.is_live { "live" } else { "dead" };
            let xmax = tuple
                .xmax
                .map(|xid| xid.to_string())
                .unwrap_or_else(|| "-".into());
            let next = tuple
                .next_version
                .map(|ptr| ptr.to_string())
                .unwrap_or_else(|| "?".into());
            format!(
                "lp {:>3} {state:<4} {} len={} xmin={} xmax={xmax} next={next}{}",
                tuple.slot.0,
                tuple.flags,
                tuple.item_len,
                tuple.xmin,
                if tuple.is_hot { " hot" } else { "" }
            )
        }),
    );
}

fn print_index_page(ui: &Ui, report: &IndexPageReport) {
    let high_key = report
        .high_key
        .as_ref()
        .map(|key| key.to_string())
        .unwrap_or_else(|| "+∞".into());
    let range = match (report.min_key, report.max_key) {
        (Some(min), Some(max)) => format!("{min} .. {max}"),
        _ => "-".into(),
    };
    ui.section(
        &format!("Index page {}", report.page_id),
        [
            ("kind", format!("{:?}", report.kind).to_lowercase()),
            ("level", report.level.to_string()),
            ("high key", high_key),
            ("key range", range),
            ("live", report.live_count.to_string()),
            ("dead", report.dead_count.to_string()),
            ("density", percent(report.metrics.density)),
            ("fill", report.fill.to_string()),
            ("tier", report.tier.to_string()),
        ],
    );
    ui.spacer();
    ui.list(
        "Items",
        report.items.iter().map(|item| {
            let pointer = item
                .pointer
                .map(|ptr| ptr.to_string())
                .unwrap_or_else(|| "?".into());
            format!(
                "#{:<3} key={} ptr={pointer}{}",
                item.offset,
                item.key,
                if item.dead { " dead" } else { "" }
            )
        }),
    );
}

fn print_index_bloat(ui: &Ui, report: &IndexBloatReport) {
    ui.section(
        "Index bloat",
        [
            ("tree level", report.tree_level.to_string()),
            ("size", report.index_size.to_string()),
            ("pages", report.total_pages.to_string()),
            ("leaf pages", report.leaf_pages.to_string()),
            ("empty pages", report.empty_pages.to_string()),
            ("deleted pages", report.deleted_pages.to_string()),
            ("avg leaf density", percent(report.avg_leaf_density)),
            ("estimated bloat", percent(report.assessment.estimated_bloat_pct)),
            ("wasted bytes", report.assessment.wasted_bytes.to_string()),
        ],
    );
    ui.spacer();
    ui.verdict(report.severity, report.label, report.advice);
}

fn print_table_health(ui: &Ui, report: &TableHealthReport) {
    let title = if report.schema.is_empty() {
        report.name.clone()
    } else {
        format!("{}.{}", report.schema, report.name)
    };
    ui.section(
        &format!("Table {title}"),
        [
            ("size", report.size.to_string()),
            ("pages", report.total_pages.to_string()),
            ("tuples", report.tuple_count.to_string()),
            ("dead tuples", report.dead_tuple_count.to_string()),
            ("dead ratio", percent(report.dead_ratio)),
            ("reclaimable bytes", report.reclaimable_bytes.to_string()),
            ("free", percent(report.free_percent)),
            ("fill tier", report.fill_tier.to_string()),
        ],
    );
    ui.spacer();
    ui.verdict(report.severity, report.label, report.advice);
}

fn print_density_map(ui: &Ui, report: &DensityMapReport) {
    match report {
        DensityMapReport::Index(index) => {
            ui.section(
                &format!("Index {}", index.index_name),
                [
                    ("pages", index.total_pages.to_string()),
                    ("leaf pages", index.leaf_pages.to_string()),
                    ("avg leaf density", percent(index.avg_leaf_density)),
                    ("live items", index.live_items.to_string()),
                    ("dead items", index.dead_items.to_string()),
                    (
                        "rebuilt leaf pages",
                        format!(
                            "~{} ({} reclaimable)",
                            index.rebuild.optimal_leaf_pages, index.rebuild.reclaimable_pages
                        ),
                    ),
                ],
            );
            ui.spacer();
            ui.bars("Leaf density", index.histogram.labelled());
        }
        DensityMapReport::Heap(heap) => {
            ui.section(
                &format!("Table {}", heap.table_name),
                [
                    ("pages", heap.total_pages.to_string()),
                    ("scanned pages", heap.scanned_pages.to_string()),
                    ("avg density", percent(heap.avg_density)),
                    ("live tuples", heap.live_tuples.to_string()),
                    ("dead tuples", heap.dead_tuples.to_string()),
                ],
            );
            ui.spacer();
            ui.bars("Page density", heap.histogram.labelled());
        }
    }
}
