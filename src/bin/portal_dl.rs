use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use portal_download_engine::app::App;
use portal_download_engine::catalog::{CatalogClient, CatalogHttpClient, SnapshotCatalog};
use portal_download_engine::config::{ConfigLoader, ResolvedConfig};
use portal_download_engine::drawer::{DrawerCoordinator, DrawerKind};
use portal_download_engine::error::PortalError;
use portal_download_engine::output::{JsonOutput, OutputMode, ResolveResult, TextOutput};
use portal_download_engine::probe::{HttpSizeProbe, SizeProbe};

#[derive(Parser)]
#[command(name = "portal-dl")]
#[command(about = "Resolve cryo-ET portal run-page addresses to downloadable artifacts")]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Resolve the download target a run-page address selects")]
    Resolve(ResolveArgs),
    #[command(about = "List the annotation table rows of a run page")]
    Rows(PageArgs),
    #[command(about = "Show drawer state after applying an action to the address")]
    Drawer(DrawerArgs),
    #[command(about = "Print the full derived view of a run page")]
    View(PageArgs),
}

#[derive(Args, Clone)]
struct PageArgs {
    /// Run id as it appears in `/runs/<id>`.
    run: String,

    /// Query string of the run-page address.
    #[arg(long, default_value = "")]
    query: String,

    /// Read run pages from a JSON export instead of the catalog API.
    #[arg(long)]
    snapshot: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Probe the size of single-file artifacts over HTTPS.
    #[arg(long)]
    probe: bool,
}

#[derive(Args)]
struct DrawerArgs {
    #[command(flatten)]
    page: PageArgs,

    #[arg(long, value_enum)]
    open: Option<DrawerArg>,

    #[arg(long, value_enum)]
    close: Option<DrawerArg>,

    #[arg(long)]
    tab: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DrawerArg {
    Dataset,
    Run,
    Annotation,
    Tomogram,
}

impl From<DrawerArg> for DrawerKind {
    fn from(value: DrawerArg) -> Self {
        match value {
            DrawerArg::Dataset => DrawerKind::Dataset,
            DrawerArg::Run => DrawerKind::Run,
            DrawerArg::Annotation => DrawerKind::Annotation,
            DrawerArg::Tomogram => DrawerKind::Tomogram,
        }
    }
}

struct NopProbe;

impl SizeProbe for NopProbe {
    fn probe(&self, _transfer_path: &str) -> Result<u64, PortalError> {
        Err(PortalError::SizeProbe("probing disabled".to_string()))
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PortalError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PortalError) -> u8 {
    match error {
        PortalError::RunNotFound(_)
        | PortalError::InvalidRunId(_)
        | PortalError::InvalidTomogramId(_)
        | PortalError::InvalidAnnotationId(_) => 2,
        PortalError::CatalogHttp(_)
        | PortalError::CatalogStatus { .. }
        | PortalError::CatalogQuery(_)
        | PortalError::SizeProbe(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Resolve(args) => run_resolve(&config, args, output_mode),
        Command::Rows(args) => run_rows(&config, args, output_mode),
        Command::Drawer(args) => run_drawer(&config, args, output_mode),
        Command::View(args) => run_view(&config, args),
    }
}

fn catalog_for(
    config: &ResolvedConfig,
    args: &PageArgs,
) -> Result<Box<dyn CatalogClient>, PortalError> {
    match &args.snapshot {
        Some(path) => Ok(Box::new(SnapshotCatalog::from_path(path)?)),
        None => Ok(Box::new(CatalogHttpClient::new(&config.api_url)?)),
    }
}

fn run_resolve(
    config: &ResolvedConfig,
    args: ResolveArgs,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let catalog = catalog_for(config, &args.page)?;
    let probe: Box<dyn SizeProbe> = if args.probe {
        Box::new(HttpSizeProbe::new()?)
    } else {
        Box::new(NopProbe)
    };
    let mut app = App::new(config, catalog, probe, &args.page.run, &args.page.query);
    if let Some(ticket) = app.refresh()? {
        if args.probe {
            app.run_probe(&ticket);
        }
    }
    let view = app.view()?;
    let result = ResolveResult {
        address: view.address,
        selection: view.selection,
        file_size: view.download.file_size,
        descriptor: view.download.descriptor,
    };
    match output_mode {
        OutputMode::Json => JsonOutput::print_resolve(&result).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_resolve(&result),
    }
    Ok(())
}

fn run_rows(config: &ResolvedConfig, args: PageArgs, output_mode: OutputMode) -> miette::Result<()> {
    let catalog = catalog_for(config, &args)?;
    let mut app = App::new(config, catalog, NopProbe, &args.run, &args.query);
    app.refresh()?;
    let view = app.view()?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_rows(&view.rows).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_rows(&view.rows),
    }
    Ok(())
}

fn run_drawer(
    config: &ResolvedConfig,
    args: DrawerArgs,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let catalog = catalog_for(config, &args.page)?;
    let mut app = App::new(config, catalog, NopProbe, &args.page.run, &args.page.query);
    app.refresh()?;

    if let Some(kind) = args.close {
        app.close_drawer(kind.into());
    }
    if let Some(kind) = args.open {
        app.open_drawer(kind.into(), args.tab.as_deref());
    } else if let Some(tab) = args.tab.as_deref() {
        if let Some(kind) = DrawerCoordinator::open_drawer(app.address()) {
            app.set_drawer_tab(kind, tab);
        }
    }

    let records = DrawerCoordinator::records(app.address());
    match output_mode {
        OutputMode::Json => JsonOutput::print_drawers(&records).into_diagnostic()?,
        OutputMode::Text => {
            println!("address: ?{}", app.address().to_query());
            TextOutput::print_drawers(&records);
        }
    }
    Ok(())
}

fn run_view(config: &ResolvedConfig, args: PageArgs) -> miette::Result<()> {
    let catalog = catalog_for(config, &args)?;
    let mut app = App::new(config, catalog, NopProbe, &args.run, &args.query);
    app.refresh()?;
    JsonOutput::print_view(&app.view()?).into_diagnostic()?;
    Ok(())
}
