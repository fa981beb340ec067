use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colored::Colorize;
use gitreport::areas::repository::Repository;
use gitreport::config::{ReportConfig, ReportOptions};
use gitreport::errors::ReportError;
use gitreport::logging::setup_logger;
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "gitreport",
    version = "0.1.0",
    about = "Report the files every commit created, deleted or changed",
    long_about = "For each repository, writes <name>-LQ<token>.txt listing the commits \
    selected by the filters and, per commit, the files that differ from its first parent. \
    The token encodes the filters, so passing the report name to --query reproduces it.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[arg(
        long,
        help = "Reuse the filters of an earlier report, given its token or file name"
    )]
    query: Option<String>,
    #[arg(long, help = "Walk every reference instead of HEAD")]
    all: bool,
    #[arg(long, help = "Only commits newer than this duration, e.g. 36h or 2weeks")]
    since: Option<String>,
    #[arg(long, help = "Only commits authored at or after this date")]
    from: Option<String>,
    #[arg(long, help = "Only commits authored at or before this date [default: now]")]
    to: Option<String>,
    #[arg(long, help = "Only commits whose author email matches this regex")]
    author: Option<String>,
    #[arg(long = "ref", help = "Branch, tag, remote branch or commit to start from")]
    reference: Option<String>,
    #[arg(long, help = "Directory the reports are written to [default: .]")]
    output: Option<PathBuf>,
    #[arg(index = 1, help = "Repositories to report on")]
    repositories: Vec<PathBuf>,
    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

impl From<Cli> for ReportOptions {
    fn from(cli: Cli) -> Self {
        ReportOptions {
            query: cli.query,
            all: cli.all,
            since: cli.since,
            from: cli.from,
            to: cli.to,
            author: cli.author,
            reference: cli.reference,
            output: cli.output,
            repositories: cli.repositories,
        }
    }
}

fn run(config: &ReportConfig) -> anyhow::Result<()> {
    for path in config.repositories() {
        let repository = Repository::open(path)?;
        let report_path = repository.write_report(config.query(), config.output_dir())?;

        println!("{}", report_path.display().to_string().green());
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logger(cli.verbosity.tracing_level_filter());
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let result = ReportConfig::try_new(cli.into(), chrono::Utc::now())
        .map_err(anyhow::Error::from)
        .and_then(|config| run(&config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {:#}", "error:".red().bold(), error);
            let code = error
                .downcast_ref::<ReportError>()
                .map_or(1, ReportError::exit_code);
            ExitCode::from(code)
        }
    }
}
