//! seqstudy-runner: headless runner for the sequencing x accountability study.
//!
//! Usage:
//!   seqstudy-runner power --sims 300 --teams 6 --meetings 4 --items 5 --alpha 0.05
//!   seqstudy-runner power --config power.json --db runs.db --parallel
//!   seqstudy-runner curve --teams-grid 4,6,8,10
//!   seqstudy-runner agenda | turns | describe | regress
//!   seqstudy-runner all --out-dir ./out

mod output;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use seqstudy_core::{
    agenda::{generate_agenda_dataset, AgendaDatasetConfig},
    config::{PowerConfig, StudyDesign},
    descriptives::describe_by_condition,
    power::{run_power_analysis, run_power_curve, PowerReport},
    regression::fit_agenda_dataset,
    report::{render_fit_table, render_power_summary},
    store::StudyStore,
    turns::{generate_turns, TurnDatasetConfig},
};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const REPLICATES_CSV: &str = "data/synthetic/power_simulation_results_study1.csv";
const POWER_CURVE_CSV: &str = "fig/power_curve_study1.csv";
const POWER_SUMMARY_TXT: &str = "fig/power_simulation_summary_study1.txt";
const POWER_SUMMARY_JSON: &str = "fig/power_summary_study1.json";
const AGENDA_CSV: &str = "data/synthetic/study1_agenda_items_synthetic_full.csv";
const TURNS_CSV: &str = "data/synthetic/study1_turns_labeled_synthetic.csv";
const COEFFICIENTS_CSV: &str = "fig/regression_results_synthetic.csv";
const REGRESSION_TXT: &str = "fig/regression_summary_synthetic.txt";
const RUN_LOG: &str = "fig/run_all_log.txt";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("power");
    let out_dir = PathBuf::from(
        args.windows(2)
            .find(|w| w[0] == "--out-dir")
            .map(|w| w[1].as_str())
            .unwrap_or("."),
    );

    match command {
        "power"    => cmd_power(&args, &out_dir),
        "curve"    => cmd_curve(&args, &out_dir),
        "agenda"   => cmd_agenda(&args, &out_dir),
        "turns"    => cmd_turns(&args, &out_dir),
        "describe" => cmd_describe(&args),
        "regress"  => cmd_regress(&args, &out_dir),
        "all"      => cmd_all(&args, &out_dir),
        other      => bail!("Unknown command: {other}"),
    }
}

fn power_config(args: &[String]) -> Result<PowerConfig> {
    let mut config = match find_arg(args, "--config") {
        Some(path) => PowerConfig::load(path)?,
        None => PowerConfig::default(),
    };
    config.n_replicates = parse_arg(args, "--sims", config.n_replicates);
    config.design.n_teams = parse_arg(args, "--teams", config.design.n_teams);
    config.design.n_meetings_per_team =
        parse_arg(args, "--meetings", config.design.n_meetings_per_team);
    config.design.n_items_per_meeting =
        parse_arg(args, "--items", config.design.n_items_per_meeting);
    config.alpha = parse_arg(args, "--alpha", config.alpha);
    config.seed_offset = parse_arg(args, "--seed-offset", config.seed_offset);
    config.parallel = config.parallel || args.iter().any(|a| a == "--parallel");
    Ok(config)
}

fn cmd_power(args: &[String], out_dir: &Path) -> Result<()> {
    let config = power_config(args)?;
    println!("seqstudy-runner: power simulation");
    println!("  sims:      {}", config.n_replicates);
    println!("  teams:     {}", config.design.n_teams);
    println!("  meetings:  {}", config.design.n_meetings_per_team);
    println!("  items:     {}", config.design.n_items_per_meeting);
    println!("  alpha:     {}", config.alpha);
    println!();

    let report = run_power_analysis(&config)?;
    let summary_text = render_power_summary(&report.summary);

    output::write_file(
        &out_dir.join(REPLICATES_CSV),
        &output::replicates_csv(&report.replicates, &config.tracked),
    )?;
    output::write_file(
        &out_dir.join(POWER_CURVE_CSV),
        &output::summary_csv(std::slice::from_ref(&report.summary)),
    )?;
    output::write_file(&out_dir.join(POWER_SUMMARY_TXT), &summary_text)?;
    output::write_file(
        &out_dir.join(POWER_SUMMARY_JSON),
        &serde_json::to_string_pretty(&report.summary)?,
    )?;

    if let Some(db) = find_arg(args, "--db") {
        persist_report(db, &report)?;
    }

    println!("{summary_text}");
    println!("Saved detailed results to {}", out_dir.join(REPLICATES_CSV).display());
    println!("Saved aggregate power table to {}", out_dir.join(POWER_CURVE_CSV).display());
    println!("Saved text summary to {}", out_dir.join(POWER_SUMMARY_TXT).display());

    if report.summary.degenerate {
        log::warn!("No replicate converged; power values are undefined");
    }
    Ok(())
}

fn cmd_curve(args: &[String], out_dir: &Path) -> Result<()> {
    let base = power_config(args)?;
    let grid = find_arg(args, "--teams-grid").unwrap_or("4,6,8,10");
    let designs = grid
        .split(',')
        .map(|t| {
            let n_teams = t.trim().parse().with_context(|| format!("Bad team count '{t}'"))?;
            Ok(StudyDesign { n_teams, ..base.design })
        })
        .collect::<Result<Vec<_>>>()?;

    let reports = run_power_curve(&base, &designs)?;
    let summaries: Vec<_> = reports.into_iter().map(|r| r.summary).collect();
    let csv = output::summary_csv(&summaries);
    output::write_file(&out_dir.join(POWER_CURVE_CSV), &csv)?;
    print!("{csv}");
    Ok(())
}

fn agenda_config(args: &[String]) -> AgendaDatasetConfig {
    let mut config = AgendaDatasetConfig::default();
    config.seed = parse_arg(args, "--seed", config.seed);
    config.design.n_teams = parse_arg(args, "--teams", config.design.n_teams);
    config.design.n_meetings_per_team =
        parse_arg(args, "--meetings", config.design.n_meetings_per_team);
    config.design.n_items_per_meeting =
        parse_arg(args, "--items", config.design.n_items_per_meeting);
    config
}

fn cmd_agenda(args: &[String], out_dir: &Path) -> Result<()> {
    let items = generate_agenda_dataset(&agenda_config(args))?;
    let path = out_dir.join(AGENDA_CSV);
    output::write_file(&path, &output::agenda_csv(&items))?;
    println!("Wrote {} synthetic rows to {}", items.len(), path.display());
    Ok(())
}

fn cmd_turns(args: &[String], out_dir: &Path) -> Result<()> {
    let mut config = TurnDatasetConfig::default();
    config.seed = parse_arg(args, "--seed", config.seed);
    let turns = generate_turns(&config)?;
    let path = out_dir.join(TURNS_CSV);
    output::write_file(&path, &output::turns_csv(&turns))?;
    println!("Wrote {} synthetic turns to {}", turns.len(), path.display());
    Ok(())
}

fn cmd_describe(args: &[String]) -> Result<()> {
    let items = generate_agenda_dataset(&agenda_config(args))?;
    println!("Descriptives by condition x accountability:");
    println!(
        "{:<12} {:>3} {:>5} {:>12} {:>12} {:>9} {:>8}",
        "condition", "acc", "n", "talk_share", "crit_turns", "override", "safety"
    );
    for c in describe_by_condition(&items) {
        println!(
            "{:<12} {:>3} {:>5} {:>12.3} {:>12.3} {:>9.3} {:>8.3}",
            c.sequence_condition.label(),
            u8::from(c.accountability),
            c.n_items,
            c.mean_junior_talk_share,
            c.mean_junior_critical_turns,
            c.override_rate,
            c.mean_psych_safety
        );
    }
    Ok(())
}

fn describe_step(args: &[String], _out_dir: &Path) -> Result<()> {
    cmd_describe(args)
}

fn cmd_regress(args: &[String], out_dir: &Path) -> Result<()> {
    let items = generate_agenda_dataset(&agenda_config(args))?;
    let fit = fit_agenda_dataset(&items)?;
    let table = render_fit_table(&fit);
    println!("{table}");
    output::write_file(&out_dir.join(REGRESSION_TXT), &table)?;
    output::write_file(&out_dir.join(COEFFICIENTS_CSV), &output::coefficients_csv(&fit))?;
    println!("Saved coefficient table to {}", out_dir.join(COEFFICIENTS_CSV).display());
    Ok(())
}

/// Full synthetic pipeline. A failing step is logged and the rest still run.
fn cmd_all(args: &[String], out_dir: &Path) -> Result<()> {
    let log_path = out_dir.join(RUN_LOG);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let mut log_f = File::create(&log_path)
        .with_context(|| format!("Cannot open {}", log_path.display()))?;
    writeln!(log_f, "Run-all synthetic pipeline log")?;
    writeln!(log_f, "================================")?;
    writeln!(log_f, "Started at (UTC): {}", Utc::now().to_rfc3339())?;

    type Step = fn(&[String], &Path) -> Result<()>;
    let steps: [(&str, Step); 5] = [
        ("agenda", cmd_agenda as Step),
        ("describe", describe_step as Step),
        ("regress", cmd_regress as Step),
        ("power", cmd_power as Step),
        ("turns", cmd_turns as Step),
    ];
    for (name, step) in steps {
        writeln!(log_f, "\n[{}] Running: {name}", Utc::now().to_rfc3339())?;
        match step(args, out_dir) {
            Ok(()) => writeln!(log_f, "  -> OK")?,
            Err(e) => {
                log::error!("step {name} failed: {e:#}");
                writeln!(log_f, "  -> FAILED: {e:#}")?;
            }
        }
    }

    writeln!(log_f, "\nFinished at (UTC): {}", Utc::now().to_rfc3339())?;
    Ok(())
}

fn persist_report(db: &str, report: &PowerReport) -> Result<()> {
    let store = StudyStore::open(db)?;
    store.migrate()?;
    let now = Utc::now();
    let run_id = format!("power-{}", now.format("%Y%m%dT%H%M%S%.3f"));
    store.insert_power_run(&run_id, env!("CARGO_PKG_VERSION"), &now.to_rfc3339(), report)?;
    log::info!("Saved run {run_id} to {db}");
    Ok(())
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
