use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use bgen_qc_inputs::assemble::{Assembler, GenerateResult};
use bgen_qc_inputs::catalog::{CatalogClient, DxCatalogClient, DxToolStatus};
use bgen_qc_inputs::config::{SettingsFile, SettingsLoader};
use bgen_qc_inputs::error::InputsError;
use bgen_qc_inputs::inputs::{DEFAULT_WORKFLOW, InputConfiguration};
use bgen_qc_inputs::output::JsonOutput;

#[derive(Parser)]
#[command(name = "bgen-qc-inputs")]
#[command(about = "Generate dxCompiler inputs for the bgens_qc workflow from files on DNAnexus")]
#[command(version, author)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Look up files and write the inputs JSON (default)")]
    Generate(GenerateArgs),
    #[command(about = "Print the workflow input template with type descriptors")]
    Template(TemplateArgs),
    #[command(about = "Check that dx is installed and logged in")]
    Check,
}

#[derive(Args, Clone)]
struct GenerateArgs {
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    #[arg(long)]
    data_path: Option<String>,

    #[arg(long)]
    sample_folder: Option<String>,

    #[arg(long)]
    phenotype_folder: Option<String>,

    #[arg(long)]
    phenotype_file: Option<String>,

    #[arg(long)]
    output_prefix: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    plink2_options: Option<String>,

    #[arg(long)]
    workflow: Option<String>,

    #[arg(long)]
    output: Option<String>,

    #[arg(long, value_name = "SECS")]
    query_timeout: Option<u64>,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct TemplateArgs {
    #[arg(long, default_value = DEFAULT_WORKFLOW)]
    workflow: String,
}

#[derive(Serialize)]
struct CheckResult {
    dx: Option<String>,
    dx_version: Option<String>,
    user: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<InputsError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &InputsError) -> u8 {
    match error {
        InputsError::InvalidSetting { .. }
        | InputsError::ConfigRead(_)
        | InputsError::ConfigParse(_)
        | InputsError::EmptyResultSet { .. } => 2,
        InputsError::MissingTool(_)
        | InputsError::QueryLaunch { .. }
        | InputsError::QueryFailed { .. }
        | InputsError::QueryTimeout { .. }
        | InputsError::MalformedOutput { .. }
        | InputsError::NotLoggedIn(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Generate(args)) => run_generate(args, cli.json),
        Some(Commands::Template(args)) => run_template(args),
        Some(Commands::Check) => run_check(cli.json),
        None => run_generate(cli.generate, cli.json),
    }
}

fn run_generate(args: GenerateArgs, json: bool) -> miette::Result<()> {
    let overrides = SettingsFile {
        data_path: args.data_path,
        sample_folder: args.sample_folder,
        phenotype_folder: args.phenotype_folder,
        phenotype_file: args.phenotype_file,
        output_prefix: args.output_prefix,
        plink2_options: args.plink2_options,
        workflow: args.workflow,
        output: args.output,
        query_timeout_secs: args.query_timeout,
    };
    let settings = SettingsLoader::resolve(args.config.as_deref(), overrides)?;

    let catalog = DxCatalogClient::new().with_timeout(settings.query_timeout);
    let assembler = Assembler::new(catalog);

    if args.dry_run {
        let document = assembler.assemble(&settings)?;
        JsonOutput::print_document(&document).into_diagnostic()?;
        return Ok(());
    }

    let result = assembler.assemble_and_write(&settings)?;
    if json {
        JsonOutput::print_json(&result).into_diagnostic()?;
    } else {
        print_generate_summary(&result);
    }
    Ok(())
}

fn run_template(args: TemplateArgs) -> miette::Result<()> {
    let template = InputConfiguration::template(&args.workflow);
    JsonOutput::print_template(&template).into_diagnostic()
}

fn run_check(json: bool) -> miette::Result<()> {
    let client = DxCatalogClient::new();
    if let DxToolStatus::Missing { message } = client.tool_status() {
        tracing::warn!("{message}");
        return Err(InputsError::MissingTool("dx".to_string()).into());
    }
    let info = client.tool_info();
    let user = client.whoami()?;
    let result = CheckResult {
        dx: info.dx,
        dx_version: info.dx_version,
        user,
    };
    if json {
        JsonOutput::print_json(&result).into_diagnostic()?;
    } else {
        println!("dx: {}", result.dx.as_deref().unwrap_or("-"));
        println!("version: {}", result.dx_version.as_deref().unwrap_or("unknown"));
        println!("logged in as: {}", result.user);
    }
    Ok(())
}

fn print_generate_summary(result: &GenerateResult) {
    let green = "\x1b[32m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}{} inputs{reset}", result.workflow);
    println!("{green}bgen files: {}{reset}", result.bgen_files);
    println!("{green}sample files: {}{reset}", result.sample_files);
    match &result.keep_file {
        Some(uri) => println!("{green}keep file: {uri}{reset}"),
        None => println!("keep file: none"),
    }
    if let Some(path) = &result.output {
        println!("{cyan}written to {path}{reset}");
    }
}
