use colored::*;

use crate::nutrition::AggregateResult;
use crate::sanitize;

/// Logs are opt-in via RUST_LOG; `default_level` applies when it is unset.
pub fn init_logging(default_level: log::LevelFilter) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(default_level);
    }
    let _ = builder.try_init();
}

pub fn header(provider: &str, model: &str, samples: usize) {
    println!(
        "{} {} | {} | {}",
        ">>".bold(),
        "nutrisnap".bold(),
        format!("{provider}/{model}").cyan(),
        format!("{samples} samples").dimmed()
    );
}

fn row(label: &str, value: f64, unit: &str) -> String {
    format!("  {:<10} {:>8} {}", label, format!("{value:.1}"), unit)
}

/// Plain-text summary of one aggregate, one line per field.
pub fn summary_lines(result: &AggregateResult) -> Vec<String> {
    vec![
        row("calories", result.calories(), "kcal"),
        row("protein", result.protein_g(), "g"),
        row("fat", result.fat_g(), "g"),
        row("carbs", result.carbs_g(), "g"),
        row("sugar", result.sugar_g(), "g"),
        row("fiber", result.fiber_g(), "g"),
        format!("  {:<10} {:>8.2}", "satiety", result.satiety_index()),
    ]
}

pub fn aggregate(result: &AggregateResult) {
    let used = result.samples_used();
    let requested = result.samples_requested();
    let tally = format!("{used}/{requested} samples");
    let tally = if used == requested {
        tally.green()
    } else {
        tally.yellow()
    };

    println!("\n{} {}", "●".blue().bold(), tally);
    for line in summary_lines(result) {
        println!("{line}");
    }
}

pub fn error(msg: impl AsRef<str>) {
    let safe = sanitize::sanitize_for_log(msg.as_ref());
    eprintln!("{} {}", "✗".red().bold(), safe.red());
}
