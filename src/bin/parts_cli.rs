use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use teslaparts_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    models::TeslaModel,
    services::{
        catalog_import::{preview::PreviewResponse, ImportPreviewService},
        categories::{CategoryNode, CategoryService},
        category_setup::{hierarchy::HierarchyDefinition, CategorySetupService},
        product_import::ProductImportService,
    },
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    match cli.command {
        Commands::Preview(args) => handle_preview(&config, args, cli.json)?,
        Commands::Import(args) => handle_import(&config, args, cli.json).await?,
        Commands::SetupCategories(args) => handle_setup(&config, args, cli.json).await?,
        Commands::Tree => handle_tree(&config, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "parts-cli",
    about = "Tesla parts catalog import and category tools",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a spreadsheet and show what would be imported
    Preview(FileArgs),
    /// Parse a spreadsheet and write its valid rows to the catalog
    Import(FileArgs),
    /// Create the category hierarchy for a model
    SetupCategories(SetupArgs),
    /// Print the category tree
    Tree,
}

#[derive(Args)]
struct FileArgs {
    #[arg(help = "Spreadsheet to read (.csv, .xlsx or .xls)")]
    file: PathBuf,
    #[arg(long, value_parser = parse_model, help = "Skip detection and use this model (e.g. MODEL_Y)")]
    model: Option<TeslaModel>,
    #[arg(long, action = ArgAction::SetTrue, help = "List every row, not just the failing ones")]
    all_rows: bool,
}

#[derive(Args)]
struct SetupArgs {
    #[arg(long, value_parser = parse_model, default_value = "MODEL_3", help = "Model whose hierarchy to create")]
    model: TeslaModel,
    #[arg(long, help = "JSON file with a custom hierarchy ({\"roots\": [...]})")]
    hierarchy: Option<PathBuf>,
}

fn parse_model(raw: &str) -> Result<TeslaModel, String> {
    TeslaModel::parse_override(raw)
        .ok_or_else(|| format!("unknown model '{raw}'; expected MODEL_3, MODEL_Y, MODEL_S or MODEL_X"))
}

async fn connect(config: &AppConfig) -> Result<Arc<DbPool>> {
    let db_pool = db::establish_connection_from_app_config(config)
        .await
        .context("failed to connect to database")?;
    db::run_migrations(&db_pool)
        .await
        .context("failed to run migrations")?;
    Ok(Arc::new(db_pool))
}

fn read_preview(config: &AppConfig, args: &FileArgs) -> Result<PreviewResponse> {
    let bytes = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", args.file.display()))?;
    debug!(%filename, size = bytes.len(), "Read spreadsheet");

    let service = ImportPreviewService::new(config.import.clone());
    Ok(service.preview(filename, &bytes, args.model)?)
}

fn handle_preview(config: &AppConfig, args: FileArgs, json: bool) -> Result<()> {
    let preview = read_preview(config, &args)?;
    if json {
        return print_json(&preview);
    }
    render_preview(&preview, args.all_rows);
    Ok(())
}

async fn handle_import(config: &AppConfig, args: FileArgs, json: bool) -> Result<()> {
    let preview = read_preview(config, &args)?;
    if !json {
        render_preview(&preview, args.all_rows);
    }

    let db = connect(config).await?;
    let service = ProductImportService::new(
        db.clone(),
        CategoryService::new(db),
        config.import.clone(),
    );
    let report = service
        .commit(preview.data)
        .await
        .context("failed to commit rows")?;

    if json {
        return print_json(&report);
    }
    println!(
        "Committed: {} created, {} updated, {} failed, {} without a category",
        report.created, report.updated, report.failed, report.uncategorized
    );
    for error in &report.errors {
        println!("  ! {}", error);
    }
    Ok(())
}

async fn handle_setup(config: &AppConfig, args: SetupArgs, json: bool) -> Result<()> {
    let hierarchy = args
        .hierarchy
        .as_ref()
        .map(|path| -> Result<HierarchyDefinition> {
            let raw = fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_slice(&raw)
                .with_context(|| format!("{} is not a valid hierarchy", path.display()))
        })
        .transpose()?;

    let db = connect(config).await?;
    let service = CategorySetupService::new(CategoryService::new(db));
    let report = service
        .setup(args.model, hierarchy)
        .await
        .context("category setup failed")?;

    if json {
        print_json(&report)
    } else {
        println!("{}", report.message);
        Ok(())
    }
}

async fn handle_tree(config: &AppConfig, json: bool) -> Result<()> {
    let db = connect(config).await?;
    let tree = CategoryService::new(db)
        .tree()
        .await
        .context("failed to load categories")?;

    if json {
        return print_json(&tree);
    }
    if tree.is_empty() {
        println!("No categories yet; run `parts-cli setup-categories`");
    }
    for node in &tree {
        render_node(node, 0);
    }
    Ok(())
}

fn render_preview(preview: &PreviewResponse, all_rows: bool) {
    println!(
        "{}: {} rows, {} valid, {} with errors",
        preview.filename, preview.total_rows, preview.valid_rows, preview.error_rows
    );
    println!(
        "Model: {} (source {:?}, confidence {:?}{})",
        preview.detected_model,
        preview.detection.source,
        preview.detection.confidence,
        if preview.detection.needs_confirmation() {
            ", please confirm"
        } else {
            ""
        }
    );
    println!(
        "Prices: {} parsed, {} unparseable",
        preview.price_parsing_stats.successes, preview.price_parsing_stats.errors
    );

    for row in preview.preview.iter().filter(|row| all_rows || row.has_errors) {
        let marker = if row.has_errors { "!" } else { "-" };
        println!(
            "{} row {} • {} • {} • {} • {}",
            marker, row.row_number, row.row.sku, row.row.name, row.row.price, row.row.category
        );
        for error in &row.errors {
            println!("    {}", error);
        }
    }
}

fn render_node(node: &CategoryNode, depth: usize) {
    println!(
        "{}{} ({})",
        "  ".repeat(depth),
        node.category.name,
        node.category.slug
    );
    for child in &node.children {
        render_node(child, depth + 1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
