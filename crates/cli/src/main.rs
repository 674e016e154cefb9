//! CLI tool for filling PowerPoint templates from spreadsheet rows.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deckfill_core::config::parse_mappings;
use deckfill_core::{
    apply_replacements, build_mapping_table, build_replacements, detect_tokens, FillOptions,
    FontSize, MappingStore, Palette, Rgb, TokenSyntax,
};
use deckfill_pptx::PptxPackage;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "mapping_config.json";

/// Fill PowerPoint templates with data from a spreadsheet row.
#[derive(Parser, Debug)]
#[command(name = "deckfill")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the placeholders used in a template
    Detect {
        /// Template file (.pptx)
        template: PathBuf,

        /// Look for [name] tokens instead of {{name}}
        #[arg(short, long)]
        brackets: bool,
    },

    /// Show or replace the placeholder to column mappings
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },

    /// Fill a template from one spreadsheet row
    Generate {
        /// Template file (.pptx)
        #[arg(short, long)]
        template: PathBuf,

        /// Spreadsheet with a header row (.xlsx, .xls, .ods)
        #[arg(short, long)]
        data: PathBuf,

        /// Zero-based data row to use
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        row_index: i64,

        /// Output file (default: <template>_filled.pptx next to the template)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Mapping configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        #[command(flatten)]
        style: StyleArgs,
    },
}

/// Coloring and sizing applied while filling.
#[derive(clap::Args, Debug)]
struct StyleArgs {
    /// Color for name values, as RRGGBB
    #[arg(long)]
    name_color: Option<Rgb>,

    /// Color for missing-field warnings, as RRGGBB
    #[arg(long)]
    warning_color: Option<Rgb>,

    /// Placeholder holding a person's name (repeatable; replaces the defaults)
    #[arg(long = "name-placeholder")]
    name_placeholders: Vec<String>,

    /// Largest font size in points for text boxes on the first slide
    #[arg(long, conflicts_with = "no_title_clamp")]
    title_max_size: Option<f64>,

    /// Leave first-slide font sizes alone
    #[arg(long)]
    no_title_clamp: bool,
}

impl StyleArgs {
    fn fill_options(&self) -> FillOptions {
        let defaults = Palette::default();
        let palette = Palette {
            name_color: self.name_color.unwrap_or(defaults.name_color),
            warning_color: self.warning_color.unwrap_or(defaults.warning_color),
        };
        let mut options = FillOptions::new().with_palette(palette);
        if !self.name_placeholders.is_empty() {
            options = options.with_name_placeholders(self.name_placeholders.iter().cloned());
        }
        if self.no_title_clamp {
            options = options.with_title_max_font_size(None);
        } else if let Some(points) = self.title_max_size {
            options = options.with_title_max_font_size(Some(FontSize::from_points(points)));
        }
        options
    }
}

#[derive(Subcommand, Debug)]
enum MappingAction {
    /// Print the current mappings as JSON
    Show {
        /// Mapping configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Replace the mappings with a JSON document (`-` reads stdin)
    Set {
        /// Mapping configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// JSON file of the form {"mappings": [...]}
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match args.command {
        Command::Detect { template, brackets } => {
            let syntax = if brackets {
                TokenSyntax::Bracket
            } else {
                TokenSyntax::Brace
            };
            for name in detect(&template, syntax)? {
                println!("{}", name);
            }
        }
        Command::Mapping { action } => match action {
            MappingAction::Show { config } => show_mappings(&config)?,
            MappingAction::Set { config, input } => set_mappings(&config, &input)?,
        },
        Command::Generate {
            template,
            data,
            row_index,
            output,
            config,
            style,
        } => {
            let options = style.fill_options();
            let output_path = output.unwrap_or_else(|| default_output_path(&template));

            let filled = generate(&template, &data, row_index, &config, &options)?;
            write_atomic(&output_path, &filled)?;
            if args.verbose {
                eprintln!("Written to: {}", output_path.display());
            }
            println!("{}", output_path.display());
        }
    }

    Ok(())
}

/// Open a template, rejecting anything that is not a .pptx.
fn open_template(path: &Path) -> Result<PptxPackage> {
    let is_pptx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pptx"));
    if !is_pptx {
        bail!(deckfill_core::Error::UnsupportedFormat(format!(
            "Template must be a .pptx file: {}",
            path.display()
        )));
    }

    let bytes = fs::read(path).with_context(|| format!("Failed to open {}", path.display()))?;
    PptxPackage::from_bytes(&bytes)
        .with_context(|| format!("Failed to parse template {}", path.display()))
}

fn detect(template: &Path, syntax: TokenSyntax) -> Result<Vec<String>> {
    let package = open_template(template)?;
    let document = package.document();
    log::debug!("Scanning {} slides", document.slides.len());
    Ok(detect_tokens(&document, syntax))
}

fn show_mappings(config: &Path) -> Result<()> {
    let mappings = MappingStore::new(config)
        .load()
        .with_context(|| format!("Failed to load {}", config.display()))?;
    let json = serde_json::to_string_pretty(&serde_json::json!({ "mappings": mappings }))?;
    println!("{}", json);
    Ok(())
}

fn set_mappings(config: &Path, input: &Path) -> Result<()> {
    let content = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read mappings from stdin")?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?
    };

    let mappings = parse_mappings(&content)?;
    MappingStore::new(config)
        .save(&mappings)
        .with_context(|| format!("Failed to write {}", config.display()))?;
    log::info!("Saved {} mappings to {}", mappings.len(), config.display());
    Ok(())
}

/// Run one fill request and return the filled package bytes.
fn generate(
    template: &Path,
    data: &Path,
    row_index: i64,
    config: &Path,
    options: &FillOptions,
) -> Result<Vec<u8>> {
    log::debug!("Using row index: {}", row_index);

    let table = deckfill_sheet::load_table(data)
        .with_context(|| format!("Failed to load {}", data.display()))?;
    log::debug!("Excel loaded: {} rows, columns: {:?}", table.len(), table.columns);
    let row = table.row(row_index)?;

    let configured = MappingStore::new(config)
        .load()
        .with_context(|| format!("Failed to load {}", config.display()))?;
    let mapping = build_mapping_table(&configured, row.columns());
    let replacements = build_replacements(&row, &mapping);
    for replacement in &replacements {
        log::debug!(
            "{} (column '{}') -> {:?}",
            replacement.placeholder,
            mapping.column(&replacement.placeholder).unwrap_or_default(),
            replacement.text
        );
    }

    let mut package = open_template(template)?;
    let mut document = package.document();
    let report = apply_replacements(&mut document, &replacements, options);
    log::debug!("{:?}", report);
    package.store(&document)?;

    Ok(package.to_bytes()?)
}

/// Determine the output path for a filled template.
fn default_output_path(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("generated");

    let output_filename = format!("{}_filled.pptx", stem);

    match template.parent() {
        Some(parent) => parent.join(output_filename),
        None => PathBuf::from(output_filename),
    }
}

/// Write through a temporary file in the destination directory, so the
/// output either appears complete or not at all.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
            parent.to_path_buf()
        }
        _ => PathBuf::from("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    file.persist(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    Ok(())
}
