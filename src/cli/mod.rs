//! cardio-xai CLI Module
//!
//! One subcommand per pipeline stage, plus an interactive launcher.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, Write};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::explainability::AttributionReporter;
use crate::preprocessing::Preprocessor;
use crate::stability::StabilityStage;
use crate::text::{TextDemo, TextOutcome};
use crate::training::{ModelKind, Trainer};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<20} {}", muted(key), val.white());
}

fn wait_enter() {
    println!();
    println!("  {}", dim("press enter to continue"));
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cardio-xai")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart-disease classifiers with SHAP, LIME and stability reports")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Clean the raw dataset
    Preprocess,
    /// Split, scale and train all classifiers
    Train,
    /// SHAP summary and waterfall plots
    Shap,
    /// LIME explanation of one test instance
    Lime,
    /// Explanation stability under input noise
    Stability,
    /// Explain the built-in demo sentence
    TextDemo,
    /// Interactive text monitor on stdin
    TextChat,
    /// Preprocess, train, shap, lime and stability in order
    RunAll,
}

pub fn run_command(command: Commands, config: &PipelineConfig) -> anyhow::Result<()> {
    match command {
        Commands::Preprocess => cmd_preprocess(config),
        Commands::Train => cmd_train(config),
        Commands::Shap => cmd_shap(config),
        Commands::Lime => cmd_lime(config),
        Commands::Stability => cmd_stability(config),
        Commands::TextDemo => cmd_text_demo(config),
        Commands::TextChat => cmd_text_chat(config),
        Commands::RunAll => cmd_run_all(config),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_preprocess(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Preprocess");

    step_run(&format!("Cleaning {}", config.paths.raw_data.display()));
    let start = Instant::now();
    let report = Preprocessor::new(config).run()?;
    step_done(&format!("{:?}", start.elapsed()));

    kv("Rows before", &report.rows_before.to_string());
    kv("Rows after", &report.rows_after.to_string());
    kv("Dropped", &report.dropped_rows.to_string());
    for (label, count) in &report.label_counts {
        kv(&format!("Label {}", label), &count.to_string());
    }
    step_ok(&format!("Saved → {}", config.paths.cleaned_data.display()));
    println!();
    Ok(())
}

pub fn cmd_train(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Train");

    step_run("Training classifiers");
    let start = Instant::now();
    let report = Trainer::new(config).run()?;
    step_done(&format!("{:?}", start.elapsed()));

    kv("Train rows", &report.n_train.to_string());
    kv("Test rows", &report.n_test.to_string());
    println!();
    println!("  {:<24} {:>10} {:>10}", muted("Model"), muted("Accuracy"), muted("Time"));
    println!("  {}", dim(&"─".repeat(46)));
    for model in &report.models {
        println!(
            "  {:<24} {:>10.4} {:>9.2}s",
            model.name, model.metrics.accuracy, model.training_time_secs
        );
    }
    println!("  {}", dim(&"─".repeat(46)));

    let best = ModelKind::ALL
        .iter()
        .filter_map(|k| report.accuracy_of(*k).map(|a| (*k, a)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    if let Some((kind, accuracy)) = best {
        println!();
        println!("  {} {} {} {:.4}", ok("best"), kind.to_string().white().bold(), muted("accuracy:"), accuracy);
    }

    step_ok(&format!("Models saved → {}", config.paths.models_dir.display()));
    println!();
    Ok(())
}

pub fn cmd_shap(config: &PipelineConfig) -> anyhow::Result<()> {
    section("SHAP");

    step_run("Explaining test set");
    let start = Instant::now();
    let report = AttributionReporter::new(config).run_shap()?;
    step_done(&format!("{:?}", start.elapsed()));

    let top = report.random_forest.top_features(5).join(", ");
    kv("Top RF features", &top);
    if let Some(c) = report.rf_local.dominant_feature() {
        kv("Instance 0 driver", &format!("{} ({:+.4})", c.feature_name, c.contribution));
    }
    for plot in &report.plots {
        step_ok(&plot.display().to_string());
    }
    println!();
    Ok(())
}

pub fn cmd_lime(config: &PipelineConfig) -> anyhow::Result<()> {
    section("LIME");

    step_run(&format!("Explaining instance {}", config.lime.instance_index));
    let start = Instant::now();
    let report = AttributionReporter::new(config).run_lime()?;
    step_done(&format!("{:?}", start.elapsed()));

    let explanation = &report.explanation;
    kv("Class", &explanation.class_name);
    kv("Model probability", &format!("{:.4}", explanation.model_prediction));
    kv("Surrogate R²", &format!("{:.4}", explanation.score));
    for (name, weight) in explanation.as_list() {
        let value = format!("{:+.4}", weight);
        let value = if weight > 0.0 { value.green() } else { value.red() };
        println!("  {:<20} {}", muted(name), value);
    }
    step_ok(&report.plot.display().to_string());
    println!();
    Ok(())
}

pub fn cmd_stability(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Stability");

    step_run("Perturbing and re-explaining");
    let start = Instant::now();
    let report = StabilityStage::new(config).run()?;
    step_done(&format!("{:?}", start.elapsed()));

    println!("  {:<10} {:>12} {:>20}", muted("Noise σ"), muted("Mean ρ"), muted("95% interval"));
    println!("  {}", dim(&"─".repeat(46)));
    for point in &report.curve.points {
        let interval = point
            .interval
            .map(|(lo, hi)| format!("[{:.3}, {:.3}]", lo, hi))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<10} {:>12.4} {:>20}", point.noise_level, point.mean_correlation, interval);
    }
    step_ok(&report.plot.display().to_string());
    println!();
    Ok(())
}

pub fn cmd_text_demo(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Text Demo");

    let demo = TextDemo::new(config)?;
    kv("Sentence", &config.text.demo_sentence);
    let (outcome, plot) = demo.run_once()?;
    match outcome {
        TextOutcome::Explained(explanation) => {
            kv("P(urgent)", &format!("{:.4}", explanation.probability));
            for token in &explanation.tokens {
                let value = format!("{:+.4}", token.attribution);
                let value = if token.attribution > 0.0 { value.red() } else { value.blue() };
                println!("  {:<20} {}", muted(&token.token), value);
            }
        }
        TextOutcome::NoKnownTokens => {
            println!("  {}", "No known words in the demo sentence".yellow());
        }
    }
    if let Some(plot) = plot {
        step_ok(&plot.display().to_string());
    }
    println!();
    Ok(())
}

pub fn cmd_text_chat(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Text Monitor");

    let demo = TextDemo::new(config)?;
    let stdin = io::stdin();
    let explained = demo.run_interactive(stdin.lock(), io::stdout())?;
    step_ok(&format!("{} sentences explained", explained));
    println!();
    Ok(())
}

pub fn cmd_run_all(config: &PipelineConfig) -> anyhow::Result<()> {
    cmd_preprocess(config)?;
    cmd_train(config)?;
    cmd_shap(config)?;
    cmd_lime(config)?;
    cmd_stability(config)
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "cardio-xai".truecolor(120, 170, 255).bold());
    println!("       {}", dim(&format!("explainable heart-disease risk  ·  v{}  ·  rust", env!("CARGO_PKG_VERSION"))));
    println!();
}

fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("cardio-xai", "Interactive launcher (default)"),
        ("cardio-xai preprocess", "Clean data/heart_disease.csv"),
        ("cardio-xai train", "Train and persist the classifiers"),
        ("cardio-xai shap", "SHAP plots for all models"),
        ("cardio-xai lime", "LIME plot for test instance 0"),
        ("cardio-xai stability", "Noise-stability curve"),
        ("cardio-xai text-demo", "Explain the demo sentence"),
        ("cardio-xai text-chat", "Interactive text monitor"),
        ("cardio-xai run-all", "Every tabular stage in order"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<32} {}", cmd.white(), muted(desc));
    }
    println!();
    println!("  {}", dim("set RUST_LOG=cardio_xai=debug for detailed logs"));
    println!();
}

pub fn cmd_interactive(config: &PipelineConfig) -> anyhow::Result<()> {
    use dialoguer::{Select, theme::ColorfulTheme};

    print_banner();

    let theme = ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    };

    let stages = [
        ("Preprocess            clean the raw table", Commands::Preprocess),
        ("Train                 fit and save the classifiers", Commands::Train),
        ("SHAP                  summary + waterfall plots", Commands::Shap),
        ("LIME                  local surrogate for instance 0", Commands::Lime),
        ("Stability             rank correlation under noise", Commands::Stability),
        ("Text Demo             explain the demo sentence", Commands::TextDemo),
        ("Text Chat             interactive text monitor", Commands::TextChat),
        ("Run All               every tabular stage", Commands::RunAll),
    ];

    loop {
        let mut items: Vec<&str> = stages.iter().map(|(label, _)| *label).collect();
        items.push("Help                  commands");
        items.push("Exit");

        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("What would you like to do")
            .items(&items)
            .default(0)
            .interact_opt()?;

        match sel {
            Some(i) if i < stages.len() => {
                if let Err(e) = run_command(stages[i].1, config) {
                    println!();
                    println!("  {} {}", "error".red().bold(), e);
                }
                wait_enter();
            }
            Some(i) if i == stages.len() => {
                show_help();
                wait_enter();
            }
            _ => {
                println!();
                println!("  {}", dim("goodbye"));
                println!();
                break;
            }
        }
    }

    Ok(())
}
