mod reports;
mod source;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use flightscore_core::{
    FlightSession, FlightSource, GroupSelection, MissingPolicy, ScoreProperties, VersionSelector,
    is_valid_version, version::normalize_version_key,
};
use reports::VersionRow;
use source::FileSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Coloured terminal output
    Console,
    /// Machine-readable JSON
    Json,
    /// Markdown tables
    Markdown,
    /// Comma-separated values
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "flightscore", version = "0.1.0")]
#[command(about = "Score tables, version coverage and flight totals for judged flights")]
struct Args {
    /// Flight document (JSON) to read
    file: String,

    /// List every scoring version found in the flight and exit
    #[arg(long)]
    versions: bool,

    /// Check that every manoeuvre carries VERSION (exit code 2 if not)
    #[arg(long, value_name = "VERSION")]
    check: Option<String>,

    /// Print flight totals per version instead of the score table
    #[arg(long)]
    totals: bool,

    /// Write the basic projection of the flight document as JSON
    #[arg(long)]
    basic: bool,

    /// Scoring version to read, or "all" for every valid version
    #[arg(long = "select", default_value = "all")]
    select: VersionSelector,

    /// Score group: intra, inter, positioning, total, or all
    #[arg(long, default_value = "total")]
    group: GroupSelection,

    /// Missing-score policy for an explicit version: raise, zero, or nan
    #[arg(long, default_value = "zero")]
    missing: MissingPolicy,

    /// Difficulty level the scores were computed at
    #[arg(long, default_value_t = 3)]
    difficulty: u8,

    /// Read truncated scores
    #[arg(long)]
    truncate: bool,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    const fn props(&self) -> ScoreProperties {
        ScoreProperties::new(self.difficulty, self.truncate)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.report == ReportFormat::Console && args.output.is_none() {
        announce_banner();
    }

    let flight = FileSource::default()
        .load_flight(&args.file)
        .with_context(|| format!("loading flight {}", args.file))?;
    log::info!(
        "loaded {} manoeuvres from {}",
        flight.mans.len(),
        args.file
    );

    let mut output_target = OutputTarget::new(args.output.clone())?;
    let passed = run(&args, &flight, &mut output_target)?;
    output_target.flush_inner()?;

    if !passed {
        std::process::exit(2);
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner() {
    println!("{}", "✈️  Flightscore".bright_cyan().bold());
    println!("{}", "===============".cyan());
}

/// Write the requested report; returns `false` when a version check fails.
fn run(args: &Args, flight: &FlightSession, out: &mut dyn Write) -> Result<bool> {
    if args.versions {
        write_versions(args, flight, out)?;
        return Ok(true);
    }
    if let Some(version) = args.check.as_deref() {
        return check_version(args, flight, version, out);
    }
    if args.basic {
        writeln!(out, "{}", flight.basic().to_json_pretty()?)?;
        return Ok(true);
    }
    if args.totals {
        write_totals(args, flight, out)?;
        return Ok(true);
    }
    write_scores(args, flight, out)?;
    Ok(true)
}

fn version_rows(flight: &FlightSession) -> Vec<VersionRow> {
    let valid = flight.all_valid_versions();
    valid
        .iter()
        .map(|version| (version.clone(), true))
        .chain(
            flight
                .all_versions()
                .into_iter()
                .filter(|version| !is_valid_version(version))
                .map(|version| (version, false)),
        )
        .map(|(version, valid)| VersionRow {
            coverage: flight
                .mans
                .iter()
                .filter(|m| m.history.contains_key(&version))
                .count(),
            manoeuvres: flight.mans.len(),
            version,
            valid,
        })
        .collect()
}

fn write_versions(args: &Args, flight: &FlightSession, out: &mut dyn Write) -> Result<()> {
    let rows = version_rows(flight);
    match args.report {
        ReportFormat::Console => reports::write_console_versions(out, &rows)?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &rows)?;
            writeln!(out)?;
        }
        ReportFormat::Markdown => reports::write_markdown_versions(out, &rows)?,
        ReportFormat::Csv => reports::write_csv_versions(out, &rows)?,
    }
    Ok(())
}

fn check_version(
    args: &Args,
    flight: &FlightSession,
    version: &str,
    out: &mut dyn Write,
) -> Result<bool> {
    let complete = flight.check_version(version);
    match args.report {
        ReportFormat::Json => {
            let payload = serde_json::json!({ "version": version, "complete": complete });
            serde_json::to_writer_pretty(&mut *out, &payload)?;
            writeln!(out)?;
        }
        ReportFormat::Csv => writeln!(out, "version,complete\n{version},{complete}")?,
        ReportFormat::Console | ReportFormat::Markdown => {
            if complete {
                writeln!(out, "✅ every manoeuvre has version {version}")?;
            } else {
                let missing: Vec<&str> = flight
                    .mans
                    .iter()
                    .filter(|m| !m.history.contains_key(normalize_version_key(version)))
                    .map(|m| m.name.as_str())
                    .collect();
                writeln!(
                    out,
                    "❌ version {version} missing for: {}",
                    missing.join(", ")
                )?;
            }
        }
    }
    Ok(complete)
}

fn write_totals(args: &Args, flight: &FlightSession, out: &mut dyn Write) -> Result<()> {
    let props = args.props();
    let totals = flight.total_score(Some(&props), &args.select);
    let schedule = flight.schedule();
    match args.report {
        ReportFormat::Console => reports::write_console_totals(out, &schedule, &totals)?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &totals)?;
            writeln!(out)?;
        }
        ReportFormat::Markdown => reports::write_markdown_totals(out, &schedule, &totals)?,
        ReportFormat::Csv => reports::write_csv_totals(out, &totals)?,
    }
    Ok(())
}

fn write_scores(args: &Args, flight: &FlightSession, out: &mut dyn Write) -> Result<()> {
    let props = args.props();
    let table = match &args.select {
        VersionSelector::Explicit(version) => flight
            .get_scores(version, Some(&props), args.group, args.missing)
            .with_context(|| format!("reading scores for version {version}"))?,
        VersionSelector::AllValid => {
            if args.missing != MissingPolicy::Zero {
                log::warn!(
                    "missing policy {} only applies to an explicit version; gaps are zero-filled",
                    args.missing
                );
            }
            flight.create_score_df(Some(&props), args.group, &args.select)?
        }
    };
    let schedule = flight.schedule();
    let title = format!("Scores ({}, {props})", args.select);
    match args.report {
        ReportFormat::Console => reports::write_console_table(out, &title, &schedule, &table)?,
        ReportFormat::Json => reports::write_json_table(out, &schedule, &table)?,
        ReportFormat::Markdown => reports::write_markdown_table(out, &title, &schedule, &table)?,
        ReportFormat::Csv => reports::write_csv_table(out, &table)?,
    }
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightscore_core::{ManoeuvreRecord, ScheduleRef, Score, ScoreSnapshot};

    fn base_args() -> Args {
        Args {
            file: "flight.json".to_string(),
            versions: false,
            check: None,
            totals: false,
            basic: false,
            select: VersionSelector::AllValid,
            group: GroupSelection::default(),
            missing: MissingPolicy::Zero,
            difficulty: 3,
            truncate: false,
            report: ReportFormat::Csv,
            output: None,
            verbose: false,
        }
    }

    fn snapshot(total: f64) -> ScoreSnapshot {
        ScoreSnapshot::single(
            ScoreProperties::default(),
            Score {
                total,
                ..Score::default()
            },
        )
    }

    fn sample_flight() -> FlightSession {
        let schedule = ScheduleRef::new("f3a", "p25");
        let m1 = ManoeuvreRecord::new("M1", "1", 2.0, schedule.clone())
            .with_snapshot("1.0", snapshot(8.5))
            .unwrap();
        let m2 = ManoeuvreRecord::new("M2", "2", 3.0, schedule)
            .with_snapshot("1.0", snapshot(7.0))
            .unwrap()
            .with_snapshot("2.0", snapshot(7.5))
            .unwrap()
            .with_snapshot("junk tag", snapshot(1.0))
            .unwrap();
        FlightSession::new(true, vec![m1, m2])
    }

    fn run_to_string(args: &Args) -> (bool, String) {
        let mut buf: Vec<u8> = Vec::new();
        let passed = run(args, &sample_flight(), &mut buf).unwrap();
        (passed, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn default_run_writes_all_version_table() {
        let (passed, text) = run_to_string(&base_args());
        assert!(passed);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["manoeuvre,1.0,2.0", "M1,8.500,0.000", "M2,7.000,7.500"]);
    }

    #[test]
    fn explicit_version_with_nan_policy() {
        let args = Args {
            select: VersionSelector::explicit("2.0"),
            missing: MissingPolicy::Nan,
            ..base_args()
        };
        let (_, text) = run_to_string(&args);
        assert!(text.contains("M1,NaN"));
        assert!(text.contains("M2,7.500"));
    }

    #[test]
    fn explicit_version_with_raise_policy_fails() {
        let args = Args {
            select: VersionSelector::explicit("2.0"),
            missing: MissingPolicy::Raise,
            ..base_args()
        };
        let mut buf: Vec<u8> = Vec::new();
        let err = run(&args, &sample_flight(), &mut buf).unwrap_err();
        assert!(format!("{err:#}").contains("version 2.0 not found in manoeuvre M1"));
    }

    #[test]
    fn totals_are_k_factored() {
        let args = Args {
            totals: true,
            ..base_args()
        };
        let (_, text) = run_to_string(&args);
        assert!(text.contains("1.0,38"));
        assert!(text.contains("2.0,22.5"));
    }

    #[test]
    fn version_listing_flags_malformed_tags() {
        let args = Args {
            versions: true,
            ..base_args()
        };
        let (_, text) = run_to_string(&args);
        assert!(text.contains("1.0,true,2,2"));
        assert!(text.contains("2.0,true,1,2"));
        assert!(text.contains("junk tag,false,1,2"));
    }

    #[test]
    fn check_reports_failure() {
        let args = Args {
            check: Some("v2.0".to_string()),
            report: ReportFormat::Console,
            ..base_args()
        };
        let (passed, text) = run_to_string(&args);
        assert!(!passed);
        assert!(text.contains("M1"));

        let args = Args {
            check: Some("1.0".to_string()),
            ..base_args()
        };
        assert!(run_to_string(&args).0);
    }

    #[test]
    fn basic_output_drops_nothing_from_history() {
        let args = Args {
            basic: true,
            ..base_args()
        };
        let (_, text) = run_to_string(&args);
        let parsed = FlightSession::from_json(&text).unwrap();
        assert_eq!(parsed, sample_flight().basic());
    }

    #[test]
    fn output_target_writes_to_file() {
        let temp = std::env::temp_dir().join("flightscore-output-target.csv");
        let mut target = OutputTarget::new(Some(temp.clone())).unwrap();
        run(&base_args(), &sample_flight(), &mut target).unwrap();
        target.flush_inner().unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.starts_with("manoeuvre,1.0,2.0"));
    }
}
