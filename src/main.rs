use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use dayflow::balance::{self, WorkLifeBalance};
use dayflow::builder::{BuildOutcome, IntentSource, ScheduleBuilder};
use dayflow::config::AppConfig;
use dayflow::llm::ParsedDay;
use dayflow::model::DailySchedule;
use dayflow::session::{Script, Session};
use dayflow::stats::{EnergyNote, PlanStats};
use dayflow::{ical, layout, logging, suggest, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LlmFailurePolicy {
    /// On any LLM/cache error, fall back to local extraction.
    Fallback,
    /// On any LLM/cache error, return an error.
    Error,
}

#[derive(Debug, Args, Clone)]
struct LlmArgs {
    /// Ask an OpenRouter model to turn the description into blocks.
    ///
    /// Requires `--features llm` unless you provide an existing `--llm-cache` file.
    #[arg(long)]
    llm: bool,

    /// OpenRouter model name (overrides the config file).
    #[arg(long, requires = "llm")]
    llm_model: Option<String>,

    /// Optional JSON cache path for the parsed day.
    ///
    /// If the file exists, it is used and no network requests are made.
    /// If the file does not exist, it is written after a successful fetch.
    /// Note: the cache contains your description text.
    #[arg(long, value_name = "PATH", requires = "llm")]
    llm_cache: Option<PathBuf>,

    /// What to do if the LLM request or cache load fails.
    #[arg(long, value_enum, default_value_t = LlmFailurePolicy::Fallback, requires = "llm")]
    llm_on_error: LlmFailurePolicy,
}

#[derive(Debug, Parser)]
#[command(name = "dayflow")]
#[command(about = "Build, lay out and edit a conflict-free daily schedule", long_about = None)]
struct Cli {
    /// JSON config file (defaults are used for anything it leaves out)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a schedule (JSON) from a free-form description of the day
    Plan {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output schedule file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Fill idle gaps between blocks with free time
        #[arg(long)]
        fill_gaps: bool,

        /// Do not add lunch, meditation or sleep on your behalf
        #[arg(long)]
        no_recommendations: bool,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Print the lane layout of a schedule (JSON)
    Layout {
        /// Schedule file (JSON)
        #[arg(long, value_name = "PATH")]
        schedule: PathBuf,
    },

    /// Print balance, score and suggestions for a schedule (JSON)
    Score {
        /// Schedule file (JSON)
        #[arg(long, value_name = "PATH")]
        schedule: PathBuf,
    },

    /// Replay a script of pointer/keyboard input against a schedule
    Edit {
        /// Schedule file (JSON)
        #[arg(long, value_name = "PATH")]
        schedule: PathBuf,

        /// Input script (JSON)
        #[arg(long, value_name = "PATH")]
        script: PathBuf,

        /// Output schedule file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Disable console edit trace output
        #[arg(long)]
        no_trace: bool,
    },

    /// Export a schedule as an iCalendar (.ics) file
    Export {
        /// Schedule file (JSON)
        #[arg(long, value_name = "PATH")]
        schedule: PathBuf,

        /// Calendar date of the schedule (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,

        /// Output .ics file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmCacheFile {
    version: u32,
    model: String,
    text: String,
    day: ParsedDay,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreReport {
    total_hours: f64,
    work_life_balance: WorkLifeBalance,
    optimization_score: u8,
    suggestions: Vec<String>,
    longest_work_stretch: u32,
    largest_gap: u32,
    stats: PlanStats,
    energy: Vec<EnergyNote>,
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn emit(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => write_output(path, contents),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

fn load_schedule(path: &Path) -> Result<DailySchedule> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("failed to parse schedule JSON")
}

fn build_schedule(
    text: &str,
    builder: &ScheduleBuilder,
    config: &AppConfig,
    llm: &LlmArgs,
) -> Result<BuildOutcome> {
    if !llm.llm {
        let schedule = builder.build_local(text)?;
        return Ok(BuildOutcome {
            schedule,
            source: IntentSource::Fallback,
        });
    }

    let model = llm
        .llm_model
        .clone()
        .unwrap_or_else(|| config.llm.model.clone());

    let has_existing_cache = llm.llm_cache.as_ref().map(|p| p.exists()).unwrap_or(false);
    if !has_existing_cache && !cfg!(feature = "llm") {
        return Err(anyhow!(
            "LLM support is disabled (build with --features llm), or provide an existing --llm-cache file"
        ));
    }

    let parsed = load_or_fetch_parsed_day(text, &model, config, llm);
    if let (Err(err), LlmFailurePolicy::Error) = (&parsed, llm.llm_on_error) {
        return Err(anyhow!("{err:#}"));
    }

    Ok(builder.build_from_parsed(text, parsed)?)
}

fn load_or_fetch_parsed_day(
    text: &str,
    model: &str,
    config: &AppConfig,
    llm: &LlmArgs,
) -> Result<ParsedDay> {
    if let Some(cache_path) = &llm.llm_cache {
        if cache_path.exists() {
            let cached = load_llm_cache(cache_path)?;
            if cached.text != text {
                return Err(anyhow!(
                    "LLM cache text does not match input; delete the cache or choose another path"
                ));
            }
            return Ok(cached.day);
        }
    }

    let day = fetch_openrouter_day(text, model, config)?;

    if let Some(cache_path) = &llm.llm_cache {
        let cache = LlmCacheFile {
            version: 1,
            model: model.to_string(),
            text: text.to_string(),
            day: day.clone(),
        };
        let json = serde_json::to_string_pretty(&cache).context("failed to serialize LLM cache")?;
        write_output(cache_path, &json)?;
    }

    Ok(day)
}

fn load_llm_cache(path: &Path) -> Result<LlmCacheFile> {
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let cache: LlmCacheFile =
        serde_json::from_str(&json).context("failed to parse LLM cache JSON")?;

    if cache.version != 1 {
        return Err(anyhow!(
            "unsupported LLM cache version {}; expected 1",
            cache.version
        ));
    }

    Ok(cache)
}

#[cfg(feature = "llm")]
fn fetch_openrouter_day(text: &str, model: &str, config: &AppConfig) -> Result<ParsedDay> {
    use dayflow::llm::openrouter::OpenRouterIntentParser;
    use dayflow::llm::IntentParser;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async {
        let parser = OpenRouterIntentParser::from_config(&config.llm)?.with_model(model);
        parser
            .parse_day(text)
            .await
            .context("OpenRouter parse_day failed")
    })
}

#[cfg(not(feature = "llm"))]
fn fetch_openrouter_day(_text: &str, _model: &str, _config: &AppConfig) -> Result<ParsedDay> {
    Err(anyhow!(
        "LLM support is disabled (build with --features llm), or provide an existing --llm-cache file"
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Plan {
            input,
            output,
            fill_gaps,
            no_recommendations,
            llm,
        } => {
            let text = read_input(&input)?;
            let mut builder_config = config.builder.clone();
            builder_config.fill_gaps |= fill_gaps;
            builder_config.add_recommendations &= !no_recommendations;
            let builder = ScheduleBuilder::new(builder_config)?;

            let outcome = build_schedule(&text, &builder, &config, &llm)?;
            let schedule = outcome.schedule;

            let stats = schedule.stats();
            eprintln!(
                "Planned: {} blocks ({:?}), {:.1} h scheduled, score {}, productivity {}, balance {}",
                schedule.len(),
                outcome.source,
                schedule.total_hours(),
                schedule.optimization_score(),
                stats.productivity_score,
                stats.balance_score
            );

            let json =
                serde_json::to_string_pretty(&schedule).context("failed to serialize schedule")?;
            emit(output.as_deref(), &json)?;
        }
        Command::Layout { schedule } => {
            let schedule = load_schedule(&schedule)?;
            let events = layout::compute_layout(schedule.blocks(), &config.layout);
            eprintln!(
                "Layout: {} events, up to {} lanes",
                events.len(),
                layout::max_lane_count(&events)
            );
            let json = serde_json::to_string_pretty(&events).context("failed to serialize layout")?;
            println!("{json}");
        }
        Command::Score { schedule } => {
            let schedule = load_schedule(&schedule)?;
            let metrics = schedule.metrics();
            let report = ScoreReport {
                total_hours: schedule.total_hours(),
                work_life_balance: balance::work_life_balance(&metrics),
                optimization_score: balance::optimization_score(&metrics),
                suggestions: suggest::suggestion_messages(&metrics),
                longest_work_stretch: metrics.longest_work_stretch,
                largest_gap: metrics.largest_gap,
                stats: schedule.stats(),
                energy: schedule.energy_notes(),
            };
            let json = serde_json::to_string_pretty(&report).context("failed to serialize score")?;
            println!("{json}");
        }
        Command::Edit {
            schedule,
            script,
            output,
            no_trace,
        } => {
            let schedule = load_schedule(&schedule)?;
            let script_json = read_input(&script)?;
            let script: Script =
                serde_json::from_str(&script_json).context("failed to parse script JSON")?;

            let mut session = Session::new(
                config.layout.clone(),
                config.editor.clone(),
                &config.session,
            );
            session.load(schedule);

            let (records, summary) = session.replay(&script);
            if !no_trace {
                for event in trace::session_console_trace(&records) {
                    trace::print_trace_line(&event.line);
                }
            }
            eprintln!(
                "Replayed: {} steps, {} edits applied, {} rejected, {:.1} s virtual time",
                summary.steps,
                summary.applied,
                summary.rejected,
                summary.elapsed_ms as f64 / 1000.0
            );

            let schedule = session
                .into_schedule()
                .context("session ended without a schedule")?;
            let json =
                serde_json::to_string_pretty(&schedule).context("failed to serialize schedule")?;
            emit(output.as_deref(), &json)?;
        }
        Command::Export {
            schedule,
            date,
            output,
        } => {
            let schedule = load_schedule(&schedule)?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let ics = ical::export_ics(&schedule, date, &Local, Utc::now())?;
            info!(target: "dayflow::ical", events = schedule.len(), %date, "calendar exported");
            match output {
                Some(path) => write_output(&path, &ics)?,
                None => print!("{ics}"),
            }
        }
    }

    Ok(())
}
