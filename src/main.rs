mod console;
mod output;

use anyhow::{bail, Context};
use clap::Parser;
use console::ConsoleOperator;
use coursescribe_summarize::OpenAiSummarizer;
use coursescribe_walker::{
    Config, CourseWalker, EokaDriver, EventSink, Operator, Params, Summarizer, Unattended,
    WalkEvent, WalkOutcome, WalkReport,
};
use output::OutputSink;
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "coursescribe")]
#[command(about = "Walk a video course in the browser and save every lecture transcript")]
#[command(version)]
struct Cli {
    /// Config file to run
    config: Option<PathBuf>,

    /// Course URL to walk with default settings (instead of a config file)
    #[arg(long, conflicts_with = "config")]
    url: Option<String>,

    /// Stop after this many transcripts (0 = whole course)
    #[arg(long)]
    max_lectures: Option<usize>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run in headless mode (overrides config). Nobody can answer prompts.
    #[arg(long)]
    headless: bool,

    /// Summarize each transcript
    #[arg(long)]
    summarize: bool,

    /// API key for summaries (defaults to OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without running
    #[arg(long)]
    check: bool,

    /// Print walk events as JSON lines
    #[arg(long)]
    json: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = load_config(&cli)?;

    if let Some(max) = cli.max_lectures {
        config.max_lectures = max;
    }
    if let Some(ref dir) = cli.output {
        config.output_dir = dir.display().to_string();
    }
    if cli.headless {
        config.browser.headless = true;
    }
    if cli.summarize {
        config.summary.enabled = true;
    }
    if let Some(key) = cli.api_key.clone() {
        config.summary.api_key = Some(key);
    }
    if config.summary.enabled && config.summary.api_key.is_none() {
        config.summary.api_key = std::env::var("OPENAI_API_KEY").ok();
    }

    if cli.check {
        print_check(&config);
        return Ok(());
    }

    let summarizer = if config.summary.enabled {
        summarizer(&config).await
    } else {
        None
    };

    let operator: Box<dyn Operator> = if config.browser.headless {
        Box::new(Unattended)
    } else {
        Box::new(ConsoleOperator)
    };

    if !cli.json {
        println!("Walking: {}", config.course_url);
    }

    let output_dir = config.output_dir.clone();
    let (events, mut rx) = EventSink::channel();

    // The worker owns the browser; this task only prints what it reports.
    let worker = tokio::spawn(async move {
        let (browser, driver) = EokaDriver::launch(&config.browser).await?;
        let mut walker = CourseWalker::new(&driver, operator.as_ref(), &config, events)?;
        if let Some(ref summarizer) = summarizer {
            walker = walker.with_summarizer(summarizer as &dyn Summarizer);
        }

        let report = match walker.open().await {
            Ok(()) => Some(walker.walk().await),
            Err(e) => {
                warn!("Could not open {}: {}", config.course_url, e);
                None
            }
        };
        browser.close().await?;
        Ok::<_, coursescribe_walker::Error>(report)
    });

    while let Some(event) = rx.recv().await {
        if cli.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }
    }

    let Some(report) = worker.await.context("walk task panicked")?? else {
        bail!("could not open the course");
    };

    let written = OutputSink::new(&output_dir).write(&report)?;
    if !cli.json {
        print_result(&report, written.transcripts, written.summaries, &written.dir);
    }

    if !report.succeeded() {
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(ref path) = cli.config {
        let params = Params::from_args(&cli.params)?;
        let config = Config::load_with_params(path, &params)
            .with_context(|| format!("loading {}", path.display()))?;
        return Ok(config);
    }
    if let Some(ref url) = cli.url {
        return Ok(Config::for_course(url.clone())?);
    }
    bail!("either a config file or --url is required")
}

/// Summarizer with a checked key, or `None` so the walk goes on without summaries.
async fn summarizer(config: &Config) -> Option<OpenAiSummarizer> {
    let summarizer = match OpenAiSummarizer::new(&config.summary) {
        Ok(s) => s,
        Err(e) => {
            warn!("Summaries disabled: {}", e);
            return None;
        }
    };
    match summarizer.validate_key().await {
        Ok(()) => Some(summarizer),
        Err(e) => {
            warn!("API key rejected, continuing without summaries: {}", e);
            None
        }
    }
}

fn print_check(config: &Config) {
    println!("Config valid: {}", config.course_url);
    let max = if config.max_lectures == 0 {
        "all".to_string()
    } else {
        config.max_lectures.to_string()
    };
    println!("  Lectures: {}", max);
    println!("  Output: {}", config.output_dir);
    println!("  Headless: {}", config.browser.headless);
    println!("  Next-lecture strategies: {}", config.selectors.next_control.len());
    println!("  Transcript strategies: {}", config.selectors.transcript.len());
    if config.summary.enabled {
        let key = if config.summary.api_key.is_some() {
            ""
        } else {
            " (no API key)"
        };
        println!("  Summaries: {}{}", config.summary.model, key);
    }
    if let Some(ref screenshot) = config.diagnostics.screenshot {
        println!("  Failure screenshot: {}", screenshot);
    }
}

fn print_event(event: &WalkEvent) {
    match event {
        WalkEvent::Status { message } => println!("{}", message),
        WalkEvent::Progress { current, max, .. } => {
            if let Some(max) = max {
                println!("  {}/{} transcripts", current, max);
            }
        }
        WalkEvent::LectureSkipped { title } => println!("- already done: {}", title),
        WalkEvent::TranscriptMissing { title } => println!("✗ no transcript: {}", title),
        WalkEvent::LectureCompleted {
            title,
            lines,
            summarized,
        } => {
            let summary = if *summarized { " + summary" } else { "" };
            println!("✓ {} ({} lines{})", title, lines, summary);
        }
        // prompts are printed by the console operator; the rest is in the final result
        WalkEvent::State { .. }
        | WalkEvent::AwaitingOperator { .. }
        | WalkEvent::Success { .. }
        | WalkEvent::Error { .. }
        | WalkEvent::Done => {}
    }
}

fn print_result(report: &WalkReport, transcripts: usize, summaries: usize, dir: &std::path::Path) {
    println!();
    match &report.outcome {
        WalkOutcome::Completed(termination) => {
            println!("✓ Success ({:?})", termination);
        }
        WalkOutcome::Failed { error, snapshot } => {
            println!("✗ Failed");
            println!("  Error: {}", error);
            if let Some(path) = snapshot {
                println!("  Screenshot: {}", path.display());
            }
        }
    }
    println!("  Course: {}", report.course_title);
    println!("  Transcripts: {}", transcripts);
    if summaries > 0 {
        println!("  Summaries: {}", summaries);
    }
    if transcripts > 0 {
        println!("  Saved to: {}", dir.display());
    }
}
