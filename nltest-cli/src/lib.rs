//! nltest CLI

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use tracing_subscriber::EnvFilter;

use nltest_core::deps::{check_tools, required_tools};
use nltest_core::generator::{win_vs, BitWidth};
use nltest_core::install::{self, InstallOptions, DEFAULT_BUILD_TYPE, DEFAULT_VS_YEAR};
use nltest_core::manifest::ToolboxManifest;
use nltest_core::output::{write_json_pretty, write_ndjson};
use nltest_core::platform::{HostPlatform, InstallTask};
use nltest_core::populate::{PopulateReport, Populator};

/// Overrides `--year` when the flag is absent.
pub const YEAR_VAR: &str = "NLTEST_VS_YEAR";
/// Overrides `--bits` when the flag is absent.
pub const BITS_VAR: &str = "NLTEST_BITS";

/// CLI entrypoint for nltest.
#[derive(Debug, Parser)]
#[command(
    name = "nltest",
    version,
    about = "Build and toolbox staging for the nonlinear systems test suite"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run an install task (defaults to the host's task)
    Install(InstallArgs),
    /// Print the CMake configure command for a Visual Studio toolchain
    Generator(GeneratorArgs),
    /// Show how the host is classified
    Platform(PlatformArgs),
    /// Rebuild the toolbox source tree from the project sources
    Populate(PopulateArgs),
}

#[derive(Debug, Args, Default)]
struct InstallArgs {
    /// Task to run instead of the host default (linux, osx, windows)
    #[arg(long = "task")]
    task: Option<String>,

    /// Target bit width (x86 or x64)
    #[arg(long = "bits")]
    bits: Option<String>,

    /// Visual Studio year for install_windows
    #[arg(long = "year")]
    year: Option<String>,

    /// CMake source directory
    #[arg(long = "source-dir", default_value = ".", value_hint = ValueHint::DirPath)]
    source_dir: PathBuf,

    /// CMake build directory
    #[arg(long = "build-dir", default_value = "build", value_hint = ValueHint::DirPath)]
    build_dir: PathBuf,

    /// CMake build type / configuration
    #[arg(long = "build-type", default_value = DEFAULT_BUILD_TYPE)]
    build_type: String,

    /// Print the commands without running them
    #[arg(long = "dry-run", action = ArgAction::SetTrue)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct GeneratorArgs {
    /// Target bit width (x86 or x64)
    #[arg(long = "bits", default_value = "x64")]
    bits: String,

    /// Visual Studio year (2010, 2012, 2013, 2015, 2017, 2019)
    #[arg(long = "year")]
    year: String,
}

#[derive(Debug, Args)]
struct PlatformArgs {
    /// Classify this identifier instead of the running host
    #[arg(long = "host")]
    host: Option<String>,

    /// Emit JSON
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct PopulateArgs {
    /// Toolbox directory to rebuild
    #[arg(long = "toolbox-dir", default_value = ".", value_hint = ValueHint::DirPath)]
    toolbox_dir: PathBuf,

    /// Project root holding src/, submodules/ and the licenses (default: parent of the toolbox)
    #[arg(long = "project-root", value_hint = ValueHint::DirPath)]
    project_root: Option<PathBuf>,

    /// TOML layout replacing the built-in one
    #[arg(long = "manifest", value_hint = ValueHint::FilePath)]
    manifest: Option<PathBuf>,

    /// Emit the report as a single JSON object
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit one JSON line per copy rule
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        None => run_install(InstallArgs {
            source_dir: PathBuf::from("."),
            build_dir: PathBuf::from("build"),
            build_type: DEFAULT_BUILD_TYPE.to_string(),
            ..InstallArgs::default()
        }),
        Some(Command::Install(args)) => run_install(args),
        Some(Command::Generator(args)) => run_generator(args),
        Some(Command::Platform(args)) => run_platform(args),
        Some(Command::Populate(args)) => run_populate(args),
    }
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run_install(args: InstallArgs) -> Result<()> {
    let host = HostPlatform::detect();
    let task = select_task(&host, args.task.as_deref())?;
    let opts = install_options(&args, env_value(BITS_VAR), env_value(YEAR_VAR))?;

    if !args.dry_run {
        check_tools(&required_tools(task))?;
    }

    let steps = install::plan(task, &opts)?;
    let rendered = install::execute(task, &steps, args.dry_run)?;

    if args.dry_run {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "# {task}")?;
        for line in rendered {
            writeln!(handle, "{line}")?;
        }
    }
    Ok(())
}

fn select_task(host: &HostPlatform, requested: Option<&str>) -> Result<InstallTask> {
    match requested {
        Some(raw) => raw.parse(),
        None => {
            tracing::info!(
                host = %host.identifier,
                task = %host.default_task,
                "using host default task"
            );
            Ok(host.default_task)
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn install_options(
    args: &InstallArgs,
    env_bits: Option<String>,
    env_year: Option<String>,
) -> Result<InstallOptions> {
    let bits = match args.bits.clone().or(env_bits) {
        Some(raw) => raw.parse::<BitWidth>()?,
        None => BitWidth::X64,
    };
    let year = args
        .year
        .clone()
        .or(env_year)
        .unwrap_or_else(|| DEFAULT_VS_YEAR.to_string());

    Ok(InstallOptions {
        source_dir: args.source_dir.clone(),
        build_dir: args.build_dir.clone(),
        bits,
        year,
        build_type: args.build_type.clone(),
    })
}

fn run_generator(args: GeneratorArgs) -> Result<()> {
    let bits: BitWidth = args.bits.parse()?;
    let inv = win_vs(bits, &args.year)
        .ok_or_else(|| anyhow!("no CMake generator for Visual Studio {}", args.year))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{inv}")?;
    Ok(())
}

fn run_platform(args: PlatformArgs) -> Result<()> {
    let host = match args.host {
        Some(id) => HostPlatform::from_identifier(id),
        None => HostPlatform::detect(),
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&host, &mut handle)?;
    } else {
        write_platform(&host, &mut handle)?;
    }
    Ok(())
}

fn write_platform(host: &HostPlatform, mut w: impl Write) -> Result<()> {
    writeln!(w, "host:         {}", host.identifier)?;
    writeln!(w, "kind:         {:?}", host.kind)?;
    writeln!(w, "default task: {}", host.default_task)?;
    Ok(())
}

fn build_populator(args: &PopulateArgs) -> Result<Populator> {
    let manifest = match &args.manifest {
        Some(path) => ToolboxManifest::load(path)?,
        None => ToolboxManifest::default(),
    };
    let project_root = args
        .project_root
        .clone()
        .unwrap_or_else(|| args.toolbox_dir.join(".."));

    if !args.toolbox_dir.is_dir() {
        return Err(anyhow!(
            "toolbox directory does not exist: {}",
            args.toolbox_dir.display()
        ));
    }

    Ok(Populator::new(manifest, project_root, args.toolbox_dir.clone()))
}

fn run_populate(args: PopulateArgs) -> Result<()> {
    let populator = build_populator(&args)?;
    let report = populator
        .run()
        .with_context(|| format!("populating {}", args.toolbox_dir.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.ndjson {
        write_ndjson(&report.rules, &mut handle)?;
    } else if args.json {
        write_json_pretty(&report, &mut handle)?;
    } else {
        write_summary(&report, &mut handle)?;
    }
    Ok(())
}

fn write_summary(report: &PopulateReport, mut w: impl Write) -> Result<()> {
    for rule in &report.rules {
        let what = rule.pattern.as_deref().unwrap_or("(tree)");
        writeln!(
            w,
            "{:>4}  {}/{}  ->  {}",
            rule.files.len(),
            rule.source.display(),
            what,
            rule.destination.display()
        )?;
    }
    if !report.removed_artifacts.is_empty() {
        writeln!(w, "removed {} stale artifact(s)", report.removed_artifacts.len())?;
    }
    writeln!(
        w,
        "copied {} file(s) into {}",
        report.copied_files(),
        report.toolbox_dir.display()
    )?;
    Ok(())
}
