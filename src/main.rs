use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;

use climbrs::climb_match::ClimbMatch;
use climbrs::load::{OvertrainingAssessment, Priority, RiskStatus, SignalSeverity};
use climbrs::logging::{init_logging, log_error};
use climbrs::projection::PerformanceProjection;
use climbrs::training_plan::{ScheduledDay, TrainingProgram};
use climbrs::{
    parse_instant, read_json_file, Activity, AppConfig, ClimbDescriptor, ClimbRsError, FitnessMetric,
    MatchRating, NutritionProfile, TimeRange, TrainingEngine, UserCapabilities,
};

/// climbrs - climb-focused training analytics
///
/// Assesses overtraining risk, projects fitness trends, matches athletes
/// against climbs and generates periodized climb programs.
#[derive(Parser)]
#[command(name = "climbrs")]
#[command(version)]
#[command(about = "Climb training analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Evaluate as of this instant (RFC 3339 or YYYY-MM-DD) instead of now
    #[arg(long, global = true, value_name = "INSTANT")]
    now: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess overtraining risk from recent activities
    Assess {
        /// JSON array of activities
        #[arg(short, long)]
        activities: PathBuf,

        /// JSON nutrition profile
        #[arg(short, long)]
        nutrition: Option<PathBuf>,
    },

    /// Project a fitness metric over a history range
    Project {
        /// Metric id (ftp, vo2max, power_weight, threshold_hr, endurance)
        #[arg(short, long, default_value = "ftp")]
        metric: String,

        /// History range in months (1, 3, 6 or 12)
        #[arg(short = 'r', long)]
        months: Option<u32>,

        /// JSON array of activities counted in the range
        #[arg(short, long)]
        activities: Option<PathBuf>,

        /// Seed for progression noise, overriding the config
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score how well an athlete suits a climb
    Match {
        /// JSON athlete capabilities
        #[arg(short, long)]
        athlete: PathBuf,

        /// JSON climb descriptor
        #[arg(short = 'l', long)]
        climb: PathBuf,
    },

    /// Generate a periodized program for a climb
    Plan {
        /// JSON athlete capabilities
        #[arg(short, long)]
        athlete: PathBuf,

        /// JSON climb descriptor
        #[arg(short = 'l', long)]
        climb: PathBuf,
    },

    /// Show or initialize the configuration file
    Config {
        /// Write the default configuration if no file exists
        #[arg(long)]
        init: bool,

        /// Print the config file path only
        #[arg(long)]
        path: bool,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ClimbRsError>() {
                Some(err) => {
                    log_error(err);
                    eprintln!("{} {}", "Error:".red().bold(), err.user_message());
                }
                None => eprintln!("{} {:#}", "Error:".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // An explicit --config must load; the default location may be absent
    let (config_path, mut config) = match &cli.config {
        Some(path) => (path.clone(), AppConfig::load_from_file(path)?),
        None => (AppConfig::default_config_path(), AppConfig::load_or_default()),
    };
    let config_exists = config_path.exists();

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    let now = resolve_now(cli.now.as_deref())?;

    match cli.command {
        Commands::Assess { activities, nutrition } => {
            let activities: Vec<Activity> = read_json_file(&activities)?;
            let nutrition: Option<NutritionProfile> = nutrition.as_deref().map(read_json_file).transpose()?;

            let engine = TrainingEngine::from_config(&config);
            let assessment = engine.assess_overtraining(&activities, nutrition.as_ref(), now);
            info!(status = %assessment.status, signals = assessment.signals.len(), "Assessment complete");

            if cli.json {
                print_json(&assessment)?;
            } else {
                print_assessment(&assessment);
            }
        }

        Commands::Project { metric, months, activities, seed } => {
            let metric: FitnessMetric = metric.parse()?;
            let range = match months {
                Some(months) => TimeRange::from_months(months)?,
                None => config.projection.default_range()?,
            };
            let activities: Vec<Activity> = match activities {
                Some(path) => read_json_file(&path)?,
                None => Vec::new(),
            };
            if seed.is_some() {
                config.projection.jitter_seed = seed;
            }

            let engine = TrainingEngine::from_config(&config);
            let projection = engine.project_performance(metric, &activities, range, now);
            info!(metric = %metric, current = projection.current, "Projection complete");

            if cli.json {
                print_json(&projection)?;
            } else {
                print_projection(metric, &projection);
            }
        }

        Commands::Match { athlete, climb } => {
            let capabilities: UserCapabilities = read_json_file(&athlete)?;
            let climb: ClimbDescriptor = read_json_file(&climb)?;

            let engine = TrainingEngine::from_config(&config);
            let result = engine.match_climb(&capabilities, &climb);
            info!(climb = %climb.name, score = result.match_score, "Match complete");

            if cli.json {
                print_json(&result)?;
            } else {
                print_match(&climb, &result);
            }
        }

        Commands::Plan { athlete, climb } => {
            let capabilities: UserCapabilities = read_json_file(&athlete)?;
            let climb: ClimbDescriptor = read_json_file(&climb)?;

            let engine = TrainingEngine::from_config(&config);
            let program = engine.generate_program(&capabilities, &climb, now);
            info!(id = %program.id, weeks = program.duration_weeks, "Program generated");

            if cli.json {
                print_json(&program)?;
            } else {
                print_program(&program);
            }
        }

        Commands::Config { init, path } => {
            if path {
                println!("{}", config_path.display());
            } else if init {
                if config_exists {
                    println!("{} {}", "Config already exists:".yellow(), config_path.display());
                } else {
                    config.save_to_file(&config_path)?;
                    println!("{} {}", "✓ Wrote default config to".green(), config_path.display());
                }
            } else {
                let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
                println!("{}", format!("# {}", config_path.display()).dimmed());
                println!("{}", rendered);
            }
        }
    }

    Ok(())
}

fn resolve_now(value: Option<&str>) -> Result<DateTime<Utc>> {
    match value {
        Some(value) => parse_instant(value).with_context(|| format!("Invalid --now value: {}", value)),
        None => Ok(Utc::now()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn colored_status(status: RiskStatus) -> ColoredString {
    match status {
        RiskStatus::Optimal => status.to_string().green().bold(),
        RiskStatus::Warning => status.to_string().yellow().bold(),
        RiskStatus::Critical => status.to_string().red().bold(),
    }
}

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Signal")]
    title: String,
    #[tabled(rename = "Details")]
    description: String,
}

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Recommendation")]
    title: String,
    #[tabled(rename = "Details")]
    description: String,
}

fn print_assessment(assessment: &OvertrainingAssessment) {
    let metrics = &assessment.metrics;
    println!("{}", "Overtraining assessment".cyan().bold());
    println!(
        "  Status: {}  Recovery score: {}",
        colored_status(assessment.status),
        assessment.recovery_score
    );
    println!(
        "  ACWR: {:.2}  Volume: {:.0} min (prev {:.0} min, {:+}%)  Intense: {}  Rest days: {}",
        metrics.acwr,
        metrics.current_volume_minutes,
        metrics.previous_volume_minutes,
        metrics.volume_trend_pct,
        metrics.intense_sessions,
        metrics.rest_days
    );

    if !assessment.signals.is_empty() {
        let rows = assessment
            .signals
            .iter()
            .map(|s| SignalRow {
                severity: match s.severity {
                    SignalSeverity::Critical => "critical".red().to_string(),
                    SignalSeverity::Warning => "warning".yellow().to_string(),
                    SignalSeverity::Info => "info".blue().to_string(),
                },
                title: s.title.clone(),
                description: s.description.clone(),
            })
            .collect();
        println!("{}", render_table::<SignalRow>(rows));
    }

    let rows = assessment
        .recommendations
        .iter()
        .map(|r| RecommendationRow {
            priority: match r.priority {
                Priority::High => "high".red().to_string(),
                Priority::Medium => "medium".yellow().to_string(),
                Priority::Low => "low".green().to_string(),
            },
            title: r.title.clone(),
            description: r.description.clone(),
        })
        .collect();
    println!("{}", render_table::<RecommendationRow>(rows));
}

#[derive(Tabled)]
struct ProgressionRow {
    #[tabled(rename = "Week of")]
    date: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn print_projection(metric: FitnessMetric, projection: &PerformanceProjection) {
    println!("{}", format!("{} projection", metric).cyan().bold());
    println!(
        "  Current: {:.1} {}  Level: {} ({}/{})  Sessions in range: {}",
        projection.current,
        metric.unit(),
        projection.performance_level.label.bold(),
        projection.performance_level.index,
        projection.performance_level.max,
        projection.sessions_in_range
    );

    let rows = projection
        .progression
        .iter()
        .map(|p| ProgressionRow {
            date: p.date.to_string(),
            value: format!("{:.1}", p.value),
        })
        .collect();
    println!("{}", render_table::<ProgressionRow>(rows));

    for future in &projection.future_projections {
        println!("  +{} days: {:.1} {}", future.days_ahead, future.value, metric.unit());
    }
    for event in &projection.key_events {
        println!(
            "  {} {} {:.1} ({:+.1}%)",
            "★".yellow(),
            event.date,
            event.value,
            event.improvement_pct
        );
    }
    for benchmark in &projection.benchmarks {
        println!(
            "  vs {}: {:.1} ({:+.1}%)",
            benchmark.category, benchmark.value, benchmark.difference_pct
        );
    }
}

fn colored_rating(rating: MatchRating) -> ColoredString {
    match rating {
        MatchRating::Accessible => rating.to_string().green().bold(),
        MatchRating::Moderate => rating.to_string().cyan().bold(),
        MatchRating::Challenging => rating.to_string().yellow().bold(),
        MatchRating::VeryHard => rating.to_string().red().bold(),
    }
}

fn print_match(climb: &ClimbDescriptor, result: &ClimbMatch) {
    println!("{}", format!("{} ({})", climb.name, climb.difficulty).cyan().bold());
    println!(
        "  Score: {}/100  Rating: {}  W/kg: {:.2}  Estimated ascent: {} min",
        result.match_score,
        colored_rating(result.rating),
        result.ftp_per_kg,
        result.estimated_minutes
    );
    let b = &result.breakdown;
    println!(
        "  Power {} + experience {} + hours {} + strength {} {} limiting factors",
        b.power_tier, b.experience, b.weekly_hours, b.strength_training, b.limiting_factors
    );
}

#[derive(Tabled)]
struct PhaseRow {
    #[tabled(rename = "Phase")]
    name: String,
    #[tabled(rename = "Weeks")]
    weeks: u32,
    #[tabled(rename = "Weekly TSS")]
    weekly_tss: String,
    #[tabled(rename = "Key workouts")]
    key_workouts: String,
}

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "Day")]
    day: &'static str,
    #[tabled(rename = "Workout")]
    workout: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
    #[tabled(rename = "TSS")]
    tss: String,
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn print_program(program: &TrainingProgram) {
    let climb = &program.climb_characteristics;
    println!("{}", format!("{} program {}", climb.name, program.id).cyan().bold());
    println!(
        "  {} weeks to {}  Match: {}/100 ({})",
        program.duration_weeks,
        program.target_date,
        climb.match_score,
        colored_rating(climb.rating)
    );

    let rows = program
        .phases
        .iter()
        .map(|p| PhaseRow {
            name: p.name.clone(),
            weeks: p.duration_weeks,
            weekly_tss: p.weekly_tss.to_string(),
            key_workouts: p
                .key_workouts
                .iter()
                .map(|w| w.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    println!("{}", render_table::<PhaseRow>(rows));

    let rows = program
        .weekly_schedule
        .iter()
        .map(|(day, entry)| {
            let day = WEEKDAYS[usize::from(day.saturating_sub(1)).min(6)];
            match entry {
                ScheduledDay::Workout(w) => ScheduleRow {
                    day,
                    workout: w.name.clone(),
                    zone: w
                        .intervals
                        .first()
                        .map(|i| format!("{} {}", i.zone, i.zone.description()))
                        .unwrap_or_else(|| "-".to_string()),
                    minutes: w.duration_min.to_string(),
                    tss: w.tss.to_string(),
                },
                ScheduledDay::Rest => ScheduleRow {
                    day,
                    workout: "Rest".dimmed().to_string(),
                    zone: "-".to_string(),
                    minutes: "-".to_string(),
                    tss: "-".to_string(),
                },
            }
        })
        .collect();
    println!("{}", render_table::<ScheduleRow>(rows));
    println!(
        "  Planned per week: {} min, {} TSS",
        program.weekly_planned_minutes(),
        program.weekly_planned_tss()
    );
}
