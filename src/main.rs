use anyhow::{bail, Context, Result};
use chartplan::config::{AppConfig, PlanConfig};
use chartplan::descriptor::{ServiceResponse, VisualizationDescriptor};
use chartplan::profile::{describe, DatasetProfile};
use chartplan::render::{PlotRenderer, Renderer};
use chartplan::session::{Panel, QueryPanels, Session, MISSING_VARIABLES_NOTICE};
use chartplan::{parser, ChartPlan, Compiler, DatasetTable, OutputFormat, RenderOptions};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chartplan")]
#[command(about = "Compile chart descriptors against tabular data into renderable plans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile one descriptor and print the plan as JSON
    Compile(CompileArgs),
    /// Compile one descriptor and render it to an image
    Render(RenderArgs),
    /// Compile a suggestion list or query response into panels
    Batch(BatchArgs),
    /// Print a column profile as a table
    Describe {
        #[arg(long)]
        profile: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Dataset file (.csv or JSON rows); `-` reads CSV from stdin
    #[arg(long)]
    data: String,
    /// Column profile JSON
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Config JSON with `plan` and `render` sections
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompileArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Shorthand such as 'bar(region, sales) "Sales by region"'
    #[arg(long, conflicts_with = "descriptor_file")]
    descriptor: Option<String>,
    /// Descriptor JSON as returned by the suggestion service
    #[arg(long)]
    descriptor_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    compile: CompileArgs,
    #[arg(long, short)]
    output: PathBuf,
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    title: Option<String>,
}

#[derive(Args, Debug)]
struct BatchArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Suggestion array or query response JSON
    #[arg(long = "input")]
    descriptors: PathBuf,
    /// Render every chart panel into this directory
    #[arg(long)]
    render_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Svg,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Svg => OutputFormat::Svg,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Compile(args) => {
            let config = load_config(args.input.config.as_deref())?;
            let plan = compile_one(&args, config.plan)?;
            print_json(&plan)
        }
        Command::Render(args) => run_render(args),
        Command::Batch(args) => run_batch(args),
        Command::Describe { profile } => {
            let profile = DatasetProfile::load(&profile)?;
            println!("{}", describe(&profile));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn load_dataset(input: &InputArgs) -> Result<(DatasetTable, Option<DatasetProfile>)> {
    let table = if input.data == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read CSV from stdin")?;
        DatasetTable::from_csv_reader(text.as_bytes())?
    } else {
        DatasetTable::load(Path::new(&input.data))?
    };

    let profile = input
        .profile
        .as_deref()
        .map(DatasetProfile::load)
        .transpose()?;

    Ok((table, profile))
}

fn read_descriptor(args: &CompileArgs) -> Result<VisualizationDescriptor> {
    match (&args.descriptor, &args.descriptor_file) {
        (Some(shorthand), _) => parser::parse(shorthand),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read descriptor '{}'", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse descriptor '{}'", path.display()))
        }
        (None, None) => bail!("Either --descriptor or --descriptor-file is required"),
    }
}

fn compile_one(args: &CompileArgs, plan_config: PlanConfig) -> Result<ChartPlan> {
    let (table, profile) = load_dataset(&args.input)?;
    let descriptor = read_descriptor(args)?;

    let compiler = Compiler::new(plan_config);
    match compiler.compile(&table, &descriptor, profile.as_ref()) {
        Ok(plan) => {
            if let Some(message) = plan.fallback_message() {
                info!(fallback = message, "descriptor compiled to a fallback plan");
            }
            Ok(plan)
        }
        Err(e) => bail!("{}: {}", MISSING_VARIABLES_NOTICE, e),
    }
}

fn run_render(args: RenderArgs) -> Result<()> {
    let config = load_config(args.compile.input.config.as_deref())?;
    let plan = compile_one(&args.compile, config.plan)?;

    let mut options = config.render;
    if let Some(format) = args.format {
        options.format = format.into();
    } else if let Some(ext) = args.output.extension().and_then(|e| e.to_str()) {
        if ext.eq_ignore_ascii_case("svg") {
            options.format = OutputFormat::Svg;
        }
    }
    options.width = args.width.unwrap_or(options.width);
    options.height = args.height.unwrap_or(options.height);
    if args.title.is_some() {
        options.title = args.title;
    }

    write_rendered(&plan, &options, &args.output)
}

fn write_rendered(plan: &ChartPlan, options: &RenderOptions, path: &Path) -> Result<()> {
    let bytes = PlotRenderer
        .render(plan, options)
        .context("Failed to render plot")?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write '{}'", path.display()))?;
    info!(path = %path.display(), "wrote chart");
    Ok(())
}

#[derive(Serialize)]
#[serde(untagged)]
enum BatchOutput {
    Suggestions(Vec<Panel>),
    Query(QueryPanels),
}

fn run_batch(args: BatchArgs) -> Result<()> {
    let config = load_config(args.input.config.as_deref())?;
    let (table, profile) = load_dataset(&args.input)?;
    let mut session = Session::new(Compiler::new(config.plan.clone()));
    session.load(table, profile);

    let text = std::fs::read_to_string(&args.descriptors)
        .with_context(|| format!("Failed to read '{}'", args.descriptors.display()))?;
    let response: ServiceResponse = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse '{}'", args.descriptors.display()))?;

    let output = match response {
        ServiceResponse::Suggestions(list) => BatchOutput::Suggestions(session.compile_suggestions(&list)?),
        ServiceResponse::Query(query) => BatchOutput::Query(session.compile_query(&query)?),
    };

    if let Some(dir) = &args.render_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create '{}'", dir.display()))?;
        let panels: Vec<&Panel> = match &output {
            BatchOutput::Suggestions(panels) => panels.iter().collect(),
            BatchOutput::Query(q) => std::iter::once(&q.primary).chain(&q.alternatives).collect(),
        };
        for (n, panel) in panels.iter().enumerate() {
            if let Some(plan) = panel.outcome.plan() {
                let path = dir.join(format!("panel_{}.{}", n, config.render.format.extension()));
                write_rendered(plan, &config.render, &path)?;
            }
        }
    }

    print_json(&output)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
