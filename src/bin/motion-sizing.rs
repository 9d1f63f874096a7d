use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use motion_sizing::{CancelToken, JsonIo, Outcome, SizingConfig, SizingReport, SizingService};

#[derive(Parser, Debug)]
#[command(name = "motion-sizing", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Size every data set of a batch file, then its camera.
    Size(SizeArgs),
    /// Re-size only the camera, starting from previously written outputs.
    Camera(CameraArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Batch configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Log per-stage detail (repeat for per-frame detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
struct SizeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Run on a single worker thread.
    #[arg(long)]
    power_saving: bool,

    /// Worker thread count (defaults to min(32, cores + 4)).
    #[arg(long)]
    threads: Option<usize>,

    /// Write a `.log` next to every output, not only failed ones.
    #[arg(long)]
    log: bool,
}

#[derive(Args, Debug)]
struct CameraArgs {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Size(args) => cmd_size(args),
        Command::Camera(args) => cmd_camera(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(args: &CommonArgs) -> anyhow::Result<SizingConfig> {
    let config = SizingConfig::load(&args.config)
        .with_context(|| format!("load batch '{}'", args.config.display()))?;
    config.validate()?;
    Ok(config)
}

fn cmd_size(args: SizeArgs) -> anyhow::Result<()> {
    init_tracing(args.common.verbose);
    let mut config = load_config(&args.common)?;
    if args.power_saving {
        config.worker.power_saving = true;
    }
    if args.threads.is_some() {
        config.worker.threads = args.threads;
    }
    if args.log {
        config.write_log = true;
    }
    run(&config, false)
}

fn cmd_camera(args: CameraArgs) -> anyhow::Result<()> {
    init_tracing(args.common.verbose);
    let config = load_config(&args.common)?;
    if config.camera.is_none() {
        anyhow::bail!("batch '{}' has no camera section", args.common.config.display());
    }
    run(&config, true)
}

fn run(config: &SizingConfig, camera_only: bool) -> anyhow::Result<()> {
    let io = JsonIo { pretty: true };
    let mut job = config
        .load_job(&io, camera_only)
        .context("load batch inputs")?;
    let service = SizingService::new(config.options(camera_only), &io)?;

    let report = match service.run(&mut job, &CancelToken::new()) {
        Ok(report) => report,
        Err(e) if e.is_interrupted() => {
            eprintln!("sizing interrupted; nothing was written");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    print_report(&report);

    let failed = report.failed();
    if failed > 0 {
        anyhow::bail!("{failed} output(s) failed");
    }
    Ok(())
}

fn print_report(report: &SizingReport) {
    for ds in &report.data_sets {
        match &ds.outcome {
            Outcome::Written(p) => eprintln!("wrote {}", p.display()),
            Outcome::Failed(msg) => eprintln!("No.{} failed: {msg}", ds.index + 1),
            Outcome::Untouched => {}
        }
    }
    if let Some(cam) = &report.camera {
        match &cam.outcome {
            Outcome::Written(p) => eprintln!("wrote {}", p.display()),
            Outcome::Failed(msg) => eprintln!("camera failed: {msg}"),
            Outcome::Untouched => {}
        }
    }
    if report.skipped_steps() {
        eprintln!(
            "some steps were skipped ({}/{})",
            report.steps_done, report.steps_total
        );
    }
}
