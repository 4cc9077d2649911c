use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{ArgAction, Parser};
use time::OffsetDateTime;
use tracing::{info, warn};

use form8949::{
    bundle::bundle,
    config::{Config, OutputFormat, TemplateConfig},
    export::{csv_file_name, write_tax_software_csv},
    form::{generate_form_documents, FallbackRenderer, FormBox, FormOptions, TemplateOverlayRenderer},
    get_transactions, logging,
    summary::{compute_summary, print_summary, print_transaction_details},
    template::{fetch_template, read_template},
    Result,
};

#[derive(Parser)]
#[command(name = "form8949", version)]
#[command(about = "Convert a Bitwave actions export into IRS Form 8949")]
struct Cli {
    /// Bitwave actions export (CSV, XLSX or XLS)
    input: PathBuf,

    /// Tax year to report; defaults to the year of the latest sale
    #[arg(short, long)]
    year: Option<i32>,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Checkbox ticked at the top of each part
    #[arg(long = "box", value_enum)]
    form_box: Option<FormBox>,

    /// Name shown on the return (PDF only)
    #[arg(long)]
    name: Option<String>,

    /// Social security number (PDF only)
    #[arg(long)]
    ssn: Option<String>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Settings file; `form8949.toml` is read when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local copy of the blank IRS form to fill instead of downloading it
    #[arg(long)]
    template: Option<PathBuf>,

    /// List every sale after the summary (first 100)
    #[arg(long)]
    details: bool,

    /// Never download the IRS form
    #[arg(long)]
    offline: bool,

    /// Download timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags take precedence over the settings file.
    fn merge(&self, mut config: Config) -> Config {
        config.tax_year = self.year.or(config.tax_year);
        config.format = self.format.unwrap_or(config.format);
        config.form_box = self.form_box.unwrap_or(config.form_box);
        if let Some(name) = &self.name {
            config.taxpayer.name = name.clone();
        }
        if let Some(ssn) = &self.ssn {
            config.taxpayer.ssn = ssn.clone();
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir.clone();
        }
        if self.template.is_some() {
            config.template.path = self.template.clone();
        }
        if let Some(timeout) = self.timeout {
            config.template.timeout_secs = timeout;
        }
        config
    }
}

fn template_renderer(
    tax_year: i32,
    template: &TemplateConfig,
    offline: bool,
) -> Option<TemplateOverlayRenderer> {
    if !template.enabled {
        return None;
    }
    let bytes = match &template.path {
        Some(path) => read_template(path),
        None if offline => return None,
        None => fetch_template(tax_year, Duration::from_secs(template.timeout_secs)),
    };
    match bytes {
        Ok(bytes) => Some(TemplateOverlayRenderer::new(bytes)),
        Err(e) => {
            warn!("Could not load the IRS form: {:#}; drawing the form instead", e);
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = cli.merge(Config::load(cli.config.as_deref())?);
    let (tax_year, transactions) = get_transactions(&cli.input, config.tax_year)
        .with_context(|| format!("failed to process {}", cli.input.display()))?;
    print_summary(&compute_summary(&transactions, tax_year));
    if cli.details {
        print_transaction_details(&transactions)?;
    }

    let output_dir = config.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    match config.format {
        OutputFormat::Csv => {
            let path = output_dir.join(csv_file_name(tax_year));
            write_tax_software_csv(&transactions, &path)?;
            println!("\nWrote {}", path.display());
        }
        OutputFormat::Pdf => {
            let renderer = FallbackRenderer::new(template_renderer(
                tax_year,
                &config.template,
                cli.offline,
            ));
            let options = FormOptions {
                tax_year,
                taxpayer: config.taxpayer.clone(),
                form_box: config.form_box,
                generated_on: OffsetDateTime::now_utc().date(),
            };
            let documents = generate_form_documents(&transactions, &options, &renderer)?;
            info!("Generated {} PDF file(s)", documents.len());
            if let Some(output) = bundle(documents, tax_year)? {
                let path = output.write_to(&output_dir)?;
                println!("\nWrote {}", path.display());
            }
        }
    }

    Ok(())
}
