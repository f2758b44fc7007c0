use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use of_api::HttpTransport;
use of_app::{
    AppConfig, AppError, AppResult, PollEvent, ProgressPoller, Session, Wizard, flow_service,
    parse_bound, project_service,
};
use of_core::{
    CsvId, FeatureImportance, FlowId, FlowRoute, Goal, GoalPatch, Histogram, MAX_DISPLAY_BINS,
    OptimizationGoal, ProjectId, PropertyType, Role, SurrogateCase, TrainingStage,
};
use of_store::selectors;
use tracing_subscriber::EnvFilter;

type Api = Session<HttpTransport>;

#[derive(Parser)]
#[command(name = "optiflow")]
#[command(about = "OptiFlow CLI - prescriptive optimization client", long_about = None)]
struct Cli {
    /// Path to a YAML config file (defaults to ./optiflow.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL, overrides config and environment
    #[arg(long, global = true)]
    api: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage projects
    #[command(subcommand)]
    Projects(ProjectCommands),
    /// Manage uploaded datasets
    #[command(subcommand)]
    Datasets(DatasetCommands),
    /// Manage flows of a project
    #[command(subcommand)]
    Flows(FlowsCommands),
    /// Work on a single flow
    Flow {
        flow_id: FlowId,
        /// Project that owns the flow
        #[arg(long)]
        project: ProjectId,
        #[command(subcommand)]
        command: FlowCommands,
    },
    /// Drive the flow wizard through a route like /projects/1/flows/5/set-goals
    #[command(subcommand)]
    Wizard(WizardCommands),
}

#[derive(Subcommand)]
enum ProjectCommands {
    List,
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    Edit {
        project_id: ProjectId,
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    Delete {
        project_id: ProjectId,
    },
}

#[derive(Subcommand)]
enum DatasetCommands {
    List {
        project_id: ProjectId,
    },
    /// Upload a CSV file
    Upload {
        project_id: ProjectId,
        path: PathBuf,
    },
    Delete {
        project_id: ProjectId,
        csv_id: CsvId,
    },
}

#[derive(Subcommand)]
enum FlowsCommands {
    List {
        project_id: ProjectId,
    },
    Add {
        project_id: ProjectId,
        name: String,
    },
    Rename {
        flow_id: FlowId,
        name: String,
    },
    Delete {
        flow_id: FlowId,
    },
}

#[derive(Subcommand)]
enum FlowCommands {
    /// List datasets referenced by the flow
    Datasets,
    /// Reference datasets from the flow
    Attach {
        #[arg(required = true)]
        csv_ids: Vec<CsvId>,
    },
    /// Show property types and roles
    Properties,
    /// Assign a role (environmental, controllable, output)
    Classify { property: String, role: Role },
    /// Show the property pool with a role removed (local only)
    Declassify { property: String },
    /// Change a property's data type
    SetType {
        property: String,
        property_type: PropertyType,
    },
    /// Print a property's distribution
    Histogram { property: String },
    /// Show or change an optimization goal
    Goal {
        property: String,
        /// New goal, e.g. "maximize" or "fit-to-range"
        #[arg(long)]
        set: Option<Goal>,
        #[arg(long)]
        min: Option<String>,
        #[arg(long)]
        max: Option<String>,
    },
    /// Show the priority order, or save a new one
    Priorities { order: Vec<String> },
    /// Start model training and watch its progress
    Train,
    /// Watch training progress
    Watch,
    /// Show surrogate model performance
    Performance,
    /// Show optimization recommendations
    Results,
}

#[derive(Subcommand)]
enum WizardCommands {
    /// Enter a step and summarize it
    Show { route: FlowRoute },
    /// Save the step and move to the next one
    Next { route: FlowRoute },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), cli.api.as_deref())?;
    let session = Session::connect(config)?;

    match cli.command {
        Commands::Projects(cmd) => match cmd {
            ProjectCommands::List => cmd_projects(&session),
            ProjectCommands::Add { name, description } => {
                let project = project_service::add_project(&session, &name, &description)?;
                println!("✓ Created project {} ({})", project.project_id, project.name);
                Ok(())
            }
            ProjectCommands::Edit {
                project_id,
                name,
                description,
            } => {
                project_service::edit_project(&session, project_id, &name, &description)?;
                println!("✓ Updated project {}", project_id);
                Ok(())
            }
            ProjectCommands::Delete { project_id } => {
                project_service::delete_project(&session, project_id)?;
                println!("✓ Deleted project {}", project_id);
                Ok(())
            }
        },
        Commands::Datasets(cmd) => match cmd {
            DatasetCommands::List { project_id } => cmd_datasets(&session, project_id),
            DatasetCommands::Upload { project_id, path } => cmd_upload(&session, project_id, &path),
            DatasetCommands::Delete { project_id, csv_id } => {
                project_service::delete_csv_file(&session, project_id, csv_id)?;
                println!("✓ Deleted dataset {}", csv_id);
                Ok(())
            }
        },
        Commands::Flows(cmd) => match cmd {
            FlowsCommands::List { project_id } => cmd_flows(&session, project_id),
            FlowsCommands::Add { project_id, name } => {
                let flow = flow_service::add_flow(&session, project_id, &name)?;
                println!("✓ Created flow {} ({})", flow.flow_id, flow.name);
                Ok(())
            }
            FlowsCommands::Rename { flow_id, name } => {
                flow_service::edit_flow(&session, flow_id, &name)?;
                println!("✓ Renamed flow {}", flow_id);
                Ok(())
            }
            FlowsCommands::Delete { flow_id } => {
                flow_service::delete_flow(&session, flow_id)?;
                println!("✓ Deleted flow {}", flow_id);
                Ok(())
            }
        },
        Commands::Flow {
            flow_id,
            project,
            command,
        } => cmd_flow(&session, project, flow_id, command),
        Commands::Wizard(cmd) => match cmd {
            WizardCommands::Show { route } => cmd_wizard(session, route, false),
            WizardCommands::Next { route } => cmd_wizard(session, route, true),
        },
    }
}

fn cmd_projects(session: &Api) -> AppResult<()> {
    let projects = project_service::fetch_projects(session)?;
    if projects.is_empty() {
        println!("No projects found");
        return Ok(());
    }
    println!("Projects:");
    for project in projects {
        let created = project
            .created_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "  {:>4}  {}  {}  {}",
            project.project_id, project.name, created, project.description
        );
    }
    Ok(())
}

fn cmd_datasets(session: &Api, project_id: ProjectId) -> AppResult<()> {
    let datasets = project_service::fetch_csv_files_by_project(session, project_id)?;
    if datasets.is_empty() {
        println!("No datasets in project {}", project_id);
        return Ok(());
    }
    println!("Datasets in project {}:", project_id);
    for d in datasets {
        println!(
            "  {:>4}  {}  rows={}  bytes={}",
            d.csv_id,
            d.file_name,
            d.rows.map(|r| r.to_string()).unwrap_or_else(|| "?".to_string()),
            d.size.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string()),
        );
    }
    Ok(())
}

fn cmd_upload(session: &Api, project_id: ProjectId, path: &Path) -> AppResult<()> {
    println!("Uploading {}", path.display());
    let dataset = project_service::upload_csv_path(session, project_id, path)?;
    println!("✓ Uploaded as dataset {} ({})", dataset.csv_id, dataset.file_name);
    Ok(())
}

fn cmd_flows(session: &Api, project_id: ProjectId) -> AppResult<()> {
    let flows = flow_service::fetch_flows_by_project(session, project_id)?;
    if flows.is_empty() {
        println!("No flows in project {}", project_id);
        return Ok(());
    }
    println!("Flows in project {}:", project_id);
    for flow in flows {
        println!("  {:>4}  {}  [{}]", flow.flow_id, flow.name, flow.progress);
    }
    Ok(())
}

fn cmd_flow(
    session: &Api,
    project_id: ProjectId,
    flow_id: FlowId,
    command: FlowCommands,
) -> AppResult<()> {
    flow_service::open_flow(session, project_id, flow_id)?;

    match command {
        FlowCommands::Datasets => {
            let datasets = flow_service::fetch_flow_datasets(session, flow_id)?;
            println!("Datasets of flow {}:", flow_id);
            for d in datasets {
                println!("  {:>4}  {}", d.csv_id, d.file_name);
            }
            Ok(())
        }
        FlowCommands::Attach { csv_ids } => {
            flow_service::add_csv_to_flow(session, flow_id, &csv_ids)?;
            println!("✓ Attached {} dataset(s)", csv_ids.len());
            Ok(())
        }
        FlowCommands::Properties => {
            load_properties(session, flow_id)?;
            print_properties(session, flow_id);
            Ok(())
        }
        FlowCommands::Classify { property, role } => {
            flow_service::save_property_categories(session, flow_id, &[(property.clone(), role)])?;
            println!("✓ {} is now {}", property, role);
            Ok(())
        }
        FlowCommands::Declassify { property } => {
            load_properties(session, flow_id)?;
            flow_service::remove_category(session, flow_id, &property);
            print_properties(session, flow_id);
            Ok(())
        }
        FlowCommands::SetType {
            property,
            property_type,
        } => {
            flow_service::save_property_types(session, flow_id, &[(property.clone(), property_type)])?;
            println!("✓ {} is now {}", property, property_type);
            Ok(())
        }
        FlowCommands::Histogram { property } => {
            let histogram = flow_service::fetch_property_histograms(session, flow_id, &property)?;
            print_histogram(&property, &histogram);
            Ok(())
        }
        FlowCommands::Goal {
            property,
            set,
            min,
            max,
        } => cmd_goal(session, flow_id, &property, set, min.as_deref(), max.as_deref()),
        FlowCommands::Priorities { order } => cmd_priorities(session, flow_id, order),
        FlowCommands::Train => {
            flow_service::create_model(session, flow_id)?;
            println!("✓ Training started for flow {}", flow_id);
            watch_progress(session, flow_id)
        }
        FlowCommands::Watch => watch_progress(session, flow_id),
        FlowCommands::Performance => cmd_performance(session, flow_id),
        FlowCommands::Results => {
            let results = flow_service::fetch_search_result(session, flow_id)?;
            println!("Recommendations for flow {}:", flow_id);
            for r in results {
                println!("  {}", r.column_name);
                println!("    current:     {}", format_series(&r.ground_truth));
                println!("    recommended: {}", format_series(&r.predicted));
                if let Some(rate) = r.average_change_rate {
                    println!("    avg change:  {:+.2}%", rate);
                }
            }
            Ok(())
        }
    }
}

fn load_properties(session: &Api, flow_id: FlowId) -> AppResult<()> {
    flow_service::fetch_flow_properties(session, flow_id)?;
    let has_types = session
        .flows()
        .select(|s| s.entry(flow_id).is_some_and(|e| e.types.is_some()));
    if !has_types {
        flow_service::fetch_property_types(session, flow_id)?;
    }
    Ok(())
}

fn print_properties(session: &Api, flow_id: FlowId) {
    let snapshot = session.flows().snapshot();
    let Some(entry) = snapshot.entry(flow_id) else {
        return;
    };
    if let Some(types) = &entry.types {
        println!("Types:");
        for (ty, names) in types.iter() {
            println!("  {:<12} {}", ty, names.join(", "));
        }
    }
    if let Some(roles) = &entry.roles {
        println!("Roles:");
        for (role, names) in roles.iter() {
            println!("  {:<14} {}", role, names.join(", "));
        }
    }
    println!(
        "Unassigned: {}",
        selectors::unassigned_properties(entry).join(", ")
    );
}

fn print_histogram(property: &str, histogram: &Histogram) {
    let (shown, truncated) = histogram.truncated(MAX_DISPLAY_BINS);
    let peak = shown.counts.iter().copied().fold(0.0_f64, f64::max);
    println!("{} (n={})", property, histogram.total());
    for (center, count) in shown.bin_centers().iter().zip(&shown.counts) {
        let width = if peak > 0.0 {
            ((count / peak) * 40.0).round() as usize
        } else {
            0
        };
        println!("  {:>12.4} | {} {}", center, "#".repeat(width), count);
    }
    if truncated {
        println!("  ... showing first {} bins", MAX_DISPLAY_BINS);
    }
}

fn cmd_goal(
    session: &Api,
    flow_id: FlowId,
    property: &str,
    set: Option<Goal>,
    min: Option<&str>,
    max: Option<&str>,
) -> AppResult<()> {
    load_properties(session, flow_id)?;
    let current = flow_service::fetch_optimization_data(session, flow_id, property)?;

    if set.is_none() && min.is_none() && max.is_none() {
        print_goal(property, &current);
        return Ok(());
    }

    let patch = GoalPatch {
        goal: set,
        minimum_value: min.map(parse_bound).transpose()?,
        maximum_value: max.map(parse_bound).transpose()?,
        order: None,
    };
    let mut goal = current;
    goal.apply(&patch);
    flow_service::post_optimization_data(session, flow_id, property, &goal)?;
    println!("✓ Saved");
    print_goal(property, &goal);
    Ok(())
}

fn print_goal(property: &str, goal: &OptimizationGoal) {
    let bound = |v: Option<f64>| v.map(|v| format!("{v}")).unwrap_or_else(|| "-".to_string());
    println!(
        "{}: {}  min={}  max={}  order={}",
        property,
        goal.goal,
        bound(goal.minimum_value),
        bound(goal.maximum_value),
        goal.order.map(|o| o.to_string()).unwrap_or_else(|| "-".to_string())
    );
}

fn cmd_priorities(session: &Api, flow_id: FlowId, order: Vec<String>) -> AppResult<()> {
    if !order.is_empty() {
        flow_service::post_optimization_order(session, flow_id, &order)?;
        println!("✓ Saved priority order");
        for (i, name) in order.iter().enumerate() {
            println!("  {}. {}", i + 1, name);
        }
        return Ok(());
    }

    load_properties(session, flow_id)?;
    let targets = session
        .flows()
        .select(|s| s.entry(flow_id).map(selectors::goal_targets).unwrap_or_default());
    for (name, _) in &targets {
        flow_service::fetch_optimization_data(session, flow_id, name)?;
    }
    flow_service::initialize_priorities(session, flow_id);

    let snapshot = session.flows().snapshot();
    let Some(entry) = snapshot.entry(flow_id) else {
        return Ok(());
    };
    println!("Priorities of flow {}:", flow_id);
    for (i, name) in entry.priorities.iter().flatten().enumerate() {
        let role = entry.role_of(name).map(Role::as_str).unwrap_or("-");
        let goal = entry
            .optimization
            .get(name)
            .map(|g| g.goal.label())
            .unwrap_or("-");
        println!("  {}. {}  ({}, {})", i + 1, name, role, goal);
    }
    Ok(())
}

fn watch_progress(session: &Api, flow_id: FlowId) -> AppResult<()> {
    let started = Instant::now();
    let poller = ProgressPoller::start(session.clone(), flow_id, session.config().poll_interval());
    let mut last = TrainingStage::NotStarted;

    while let Ok(event) = poller.events().recv() {
        match event {
            PollEvent::Progress(stage) => {
                last = last.max(stage);
                render_progress(last, started.elapsed());
            }
            PollEvent::Error(message) => {
                clear_progress_line();
                eprintln!("  poll failed: {}", message);
            }
            PollEvent::Completed => break,
        }
    }
    clear_progress_line();

    if last.is_terminal() {
        println!("✓ Training complete ({:.1}s)", started.elapsed().as_secs_f64());
        Ok(())
    } else {
        Err(AppError::PollingStopped)
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_progress(stage: TrainingStage, elapsed: Duration) {
    let width = 24usize;
    let filled = usize::from(stage.progress()) * width / 6;
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    print!(
        "\r[{}] {}  elapsed={:.1}s",
        bar,
        stage,
        elapsed.as_secs_f64()
    );
    let _ = io::stdout().flush();
}

fn cmd_performance(session: &Api, flow_id: FlowId) -> AppResult<()> {
    let importance = flow_service::fetch_surrogate_feature_importance(session, flow_id)?;
    let metrics = flow_service::fetch_surrogate_matric(session, flow_id)?;
    let cases = flow_service::fetch_surrogate_result(session, flow_id)?;

    println!("Feature importance:");
    for item in FeatureImportance::ranked(&importance) {
        println!("  {:<20} {:.4}", item.column_name, item.importance);
    }
    println!("Model fit:");
    for m in &metrics {
        println!("  {:<20} R²={:.4}  RMSE={:.4}", m.column_name, m.r_squared, m.rmse);
    }
    print_cases("Best predictions:", &SurrogateCase::best_cases(&cases, 3));
    print_cases("Worst predictions:", &SurrogateCase::worst_cases(&cases, 3));
    Ok(())
}

fn print_cases(title: &str, cases: &[SurrogateCase]) {
    if cases.is_empty() {
        return;
    }
    println!("{}", title);
    for c in cases {
        println!(
            "  #{:<3} {:<20} actual={:.4}  predicted={:.4}",
            c.rank, c.column_name, c.ground_truth, c.predicted
        );
    }
}

fn format_series(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    parts.join(", ")
}

fn cmd_wizard(session: Api, route: FlowRoute, advance: bool) -> AppResult<()> {
    let mut wizard = Wizard::enter(session, route)?;
    if advance {
        let step = wizard.advance()?;
        println!("✓ Moved to {}", step.title());
    }

    let route = wizard.route();
    println!("{}", route);
    println!(
        "Step {}/{}: {}",
        route.step.index() + 1,
        of_core::WizardStep::ALL.len(),
        route.step.title()
    );

    let snapshot = wizard.snapshot();
    if let Some(entry) = snapshot.entry(route.flow_id) {
        println!("  flow:      {} {}", entry.flow.flow_id, entry.flow.name);
        println!("  datasets:  {}", entry.flow.datasets.len());
        println!("  training:  {}", entry.flow.progress);
        let targets = selectors::goal_targets(entry);
        if !targets.is_empty() {
            let names: Vec<&str> = targets.iter().map(|(n, _)| n.as_str()).collect();
            println!("  targets:   {}", names.join(", "));
        }
        if let Some(order) = &entry.priorities {
            println!("  priority:  {}", order.join(" > "));
        }
    }
    Ok(())
}
