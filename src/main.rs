use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

use siteforge::extractor::{self, DataExtractor, YamlFileExtractor};
use siteforge::processor::IntermediaryProcessor;
use siteforge::renderer::{JinjaEngine, SiteProcessor};
use siteforge::rules::RulesConfig;

/// Site inventory processing utility for deployment manifest generation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the site for which the intermediary is generated
    #[arg(short, long)]
    site: String,

    /// Path to the extracted site data YAML file
    #[arg(short = 'x', long)]
    extracted_data: Option<PathBuf>,

    /// Path to site-specific configuration overrides YAML file
    #[arg(short = 'c', long)]
    site_configuration: Option<PathBuf>,

    /// Path to an existing intermediary file to render manifests from
    #[arg(short, long)]
    intermediary: Option<PathBuf>,

    /// Dump the generated intermediary file
    #[arg(short = 'g', long)]
    generate_intermediary: bool,

    /// Directory in which the intermediary file is created
    #[arg(long, default_value = "./")]
    intermediary_dir: PathBuf,

    /// Generate manifests from the intermediary document
    #[arg(short = 'm', long)]
    generate_manifests: bool,

    /// Path to the directory containing manifest templates
    #[arg(short, long)]
    template_dir: Option<PathBuf>,

    /// Directory in which rendered manifests are placed
    #[arg(long, default_value = "./")]
    manifest_dir: PathBuf,

    /// JSON schema used to validate the intermediary document
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Rules file overriding the packaged design rules
    #[arg(long)]
    rules: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting siteforge");
    info!("Site: {}", args.site);

    if !(args.generate_intermediary || args.generate_manifests) {
        bail!("one of --generate-intermediary or --generate-manifests must be given");
    }
    if args.generate_manifests && args.template_dir.is_none() {
        bail!("--template-dir is required when --generate-manifests is given");
    }

    // Load design rules: packaged defaults unless a rules file is given
    let rules = match &args.rules {
        Some(path) => {
            info!("Loading design rules from: {:?}", path);
            RulesConfig::from_file(path)?
        }
        None => RulesConfig::load_default()?,
    };

    let document = if let Some(intermediary) = &args.intermediary {
        info!("Loading intermediary from user provided input");
        let file = File::open(intermediary).wrap_err_with(|| {
            format!("Failed to open intermediary file '{}'", intermediary.display())
        })?;
        serde_yaml::from_reader(file)?
    } else {
        let Some(extracted_data) = &args.extracted_data else {
            bail!("--extracted-data is required unless --intermediary is given");
        };

        // Extract data into the site model
        let data_extractor = YamlFileExtractor::new(&args.site, extracted_data);
        let mut data = data_extractor.extract()?;

        // Apply any site configuration provided by the user
        if let Some(site_configuration) = &args.site_configuration {
            extractor::apply_additional_config(&mut data, site_configuration)?;
        }

        let schema = args
            .schema
            .as_deref()
            .map(load_schema)
            .transpose()?;

        // Apply design rules to the extracted data
        info!("Apply design rules to the extracted data");
        let mut processor = IntermediaryProcessor::new(&args.site, data);
        processor.generate_intermediary(&rules, schema.as_ref())?;

        if let Some(genesis) = processor.genesis_node() {
            info!("Genesis node: {}", genesis.name);
        }

        if args.generate_intermediary {
            let outfile = processor.dump_intermediary_file(&args.intermediary_dir)?;
            info!("Generated intermediary file: {}", outfile.display());
        }

        processor.to_document()
    };

    if args.generate_manifests {
        if let Some(template_dir) = &args.template_dir {
            info!("Generating site manifests");
            let site_processor = SiteProcessor::new(document, &args.manifest_dir, JinjaEngine);
            let site_root = site_processor.render_templates(template_dir)?;
            info!("Generated site manifests at {}", site_root.display());
        }
    }

    info!("Siteforge execution completed");
    Ok(())
}

/// Load a schema document; JSON schemas are valid YAML, so both forms load
fn load_schema(path: &Path) -> Result<serde_json::Value> {
    info!("Loading intermediary schema from: {:?}", path);
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open schema file '{}'", path.display()))?;
    let schema: serde_yaml::Value = serde_yaml::from_reader(file)?;
    serde_json::to_value(schema).wrap_err("Schema could not be converted to JSON")
}
