//! Rapor CLI - template, document and import tool

use anyhow::{bail, Context, Result};
use calamine::{open_workbook, DataType, Reader, Xlsx};
use clap::{Parser, Subcommand};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rapor_artifact::{generate, Cohort, DocumentContext, Student};
use rapor_core::{
    import_from_sheet, MemoryStore, RaporRecord, RaporTemplate, RecordStore, RombelRef, Semester,
};
use rapor_formula::Engine;
use rapor_protocol::{
    compose_message, extract_payload, merge_payload, post_webhook, send_hybrid, wa_link,
    SubmissionPayload,
};

#[derive(Parser)]
#[command(name = "rapor")]
#[command(
    author,
    version,
    about = "Report-card template, document and import tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a spreadsheet as a template and output it as JSON
    ImportSheet {
        /// Input spreadsheet file (xlsx)
        input: PathBuf,

        /// Template id
        #[arg(long, default_value = "imported")]
        id: String,

        /// Template display name (default: file stem)
        #[arg(long)]
        name: Option<String>,

        /// Output template JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a template's field keys and formulas
    Validate {
        /// Template JSON file
        template: PathBuf,
    },

    /// Generate a self-contained interactive HTML document
    Generate {
        /// Template JSON file
        template: PathBuf,

        /// Student roster JSON file (array of students)
        #[arg(long)]
        students: PathBuf,

        /// Class-group id (one-group document)
        #[arg(long)]
        rombel_id: Option<i64>,

        /// Class-group name (one-group document)
        #[arg(long)]
        rombel_name: Option<String>,

        /// Tier name; generates one document spanning every class-group
        #[arg(long, conflicts_with_all = ["rombel_id", "rombel_name"])]
        jenjang: Option<String>,

        /// Institution name
        #[arg(long, default_value = "")]
        lembaga: String,

        /// Academic year, e.g. 2024/2025
        #[arg(long, default_value = "")]
        tahun_ajaran: String,

        /// Term: Ganjil or Genap
        #[arg(long)]
        semester: Option<String>,

        /// Homeroom teacher name
        #[arg(long, default_value = "")]
        wali_kelas: String,

        /// Webhook endpoint baked into the document's send action
        #[arg(long)]
        webhook: Option<String>,

        /// Destination number for the text channel
        #[arg(long)]
        wa_number: Option<String>,

        /// Output HTML file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a pasted submission and merge it into a store file
    ImportPaste {
        /// Text file containing the pasted message
        input: PathBuf,

        /// Store JSON file, created if missing
        #[arg(long)]
        store: PathBuf,
    },

    /// Deliver a payload JSON over the webhook and/or text channel
    Send {
        /// Payload JSON file
        payload: PathBuf,

        /// Webhook endpoint to POST to
        #[arg(long)]
        webhook: Option<String>,

        /// Destination number for the text channel link
        #[arg(long)]
        wa_number: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::ImportSheet {
            input,
            id,
            name,
            output,
        } => import_sheet(&input, &id, name.as_deref(), output.as_deref()),
        Commands::Validate { template } => validate(&template),
        Commands::Generate {
            template,
            students,
            rombel_id,
            rombel_name,
            jenjang,
            lembaga,
            tahun_ajaran,
            semester,
            wali_kelas,
            webhook,
            wa_number,
            output,
        } => generate_document(GenerateArgs {
            template,
            students,
            rombel_id,
            rombel_name,
            jenjang,
            lembaga,
            tahun_ajaran,
            semester,
            wali_kelas,
            webhook,
            wa_number,
            output,
        }),
        Commands::ImportPaste { input, store } => import_paste(&input, &store),
        Commands::Send {
            payload,
            webhook,
            wa_number,
        } => send(&payload, webhook.as_deref(), wa_number.as_deref()),
    }
}

// === Sheet import ===

fn import_sheet(
    input: &Path,
    id: &str,
    name: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let mut workbook: Xlsx<_> = open_workbook(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;

    let worksheets = workbook.worksheets();
    let (sheet_name, range) = worksheets
        .first()
        .context("Workbook contains no worksheets")?;
    debug!("reading worksheet '{}' from '{}'", sheet_name, input.display());

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    let template_name = name
        .map(str::to_string)
        .or_else(|| input.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| sheet_name.clone());

    // Merge ranges are not read back from xlsx; re-apply them in the editor
    let template = import_from_sheet(id, template_name, &rows, &[])
        .with_context(|| format!("Failed to import '{}'", input.display()))?;

    write_json_output(&template, output)?;
    eprintln!(
        "Imported {} rows x {} columns from '{}'",
        template.row_count,
        template.col_count,
        input.display()
    );
    Ok(())
}

/// Render one spreadsheet cell as the text the normalizer consumes
fn cell_to_string(value: &DataType) -> String {
    match value {
        DataType::Empty => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Int(n) => n.to_string(),
        DataType::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        DataType::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        other => other.to_string(),
    }
}

// === Validation ===

fn validate(path: &Path) -> Result<()> {
    let template = read_template(path)?;
    template
        .validate_keys()
        .context("Template keys are invalid")?;

    let engine = Engine::from_template(&template).context("Template formulas do not compile")?;
    let compiled = engine.compiled();

    println!("Template: \"{}\" ({})", template.name, template.id);
    println!("Grid: {} rows x {} columns", template.row_count, template.col_count);
    println!("Row formulas: {}", compiled.row_formulas.len());
    println!("Rankings: {}", compiled.rankings.len());
    Ok(())
}

// === Document generation ===

struct GenerateArgs {
    template: PathBuf,
    students: PathBuf,
    rombel_id: Option<i64>,
    rombel_name: Option<String>,
    jenjang: Option<String>,
    lembaga: String,
    tahun_ajaran: String,
    semester: Option<String>,
    wali_kelas: String,
    webhook: Option<String>,
    wa_number: Option<String>,
    output: Option<PathBuf>,
}

fn generate_document(args: GenerateArgs) -> Result<()> {
    let template = read_template(&args.template)?;
    let students: Vec<Student> = read_json(&args.students)
        .with_context(|| format!("Failed to read roster '{}'", args.students.display()))?;

    let cohort = match (args.jenjang, args.rombel_id, args.rombel_name) {
        (Some(tier), _, _) => Cohort::jenjang(tier, students),
        (None, Some(id), Some(name)) => Cohort::rombel(id, name, students),
        _ => bail!("Provide either --jenjang or both --rombel-id and --rombel-name"),
    };

    let ctx = DocumentContext {
        nama_lembaga: args.lembaga,
        tahun_ajaran: args.tahun_ajaran,
        semester: args.semester.as_deref().map(parse_semester).transpose()?,
        wali_kelas: args.wali_kelas,
        webhook_url: args.webhook,
        wa_number: args.wa_number,
        ..Default::default()
    };

    let html = generate(&template, &cohort, &ctx).context("Failed to generate document")?;

    if let Some(output_path) = args.output.as_deref() {
        std::fs::write(output_path, &html)
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!(
            "Wrote document for {} students to '{}'",
            cohort.students.len(),
            output_path.display()
        );
    } else {
        io::stdout()
            .write_all(html.as_bytes())
            .context("Failed to write to stdout")?;
    }
    Ok(())
}

fn parse_semester(text: &str) -> Result<Semester> {
    match text {
        "Ganjil" => Ok(Semester::Ganjil),
        "Genap" => Ok(Semester::Genap),
        other => bail!("Unknown semester '{}' (expected Ganjil or Genap)", other),
    }
}

// === Paste import ===

/// On-disk shape of the JSON-file-backed record store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    templates: Vec<String>,
    #[serde(default)]
    roster: HashMap<i64, RombelRef>,
    #[serde(default)]
    records: Vec<RaporRecord>,
}

fn import_paste(input: &Path, store_path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;
    let payload: SubmissionPayload =
        extract_payload(&text).context("No valid submission found in the pasted text")?;

    let mut file: StoreFile = if store_path.exists() {
        read_json(store_path)
            .with_context(|| format!("Failed to read store '{}'", store_path.display()))?
    } else {
        info!("store '{}' does not exist, starting empty", store_path.display());
        StoreFile::default()
    };
    debug!(
        "loaded store with {} records, {} templates",
        file.records.len(),
        file.templates.len()
    );

    // A fresh store accepts whatever template the first paste declares
    if file.templates.is_empty() {
        file.templates.push(payload.meta.template_id.clone());
    }

    let mut store = MemoryStore::new();
    for t in &file.templates {
        store.add_template(t.clone());
    }
    for (santri_id, rombel) in &file.roster {
        store.assign_rombel(*santri_id, rombel.clone());
    }
    for record in file.records.drain(..) {
        store.upsert(record);
    }

    let outcome = merge_payload(&payload, &mut store);

    file.records = store.into_records();
    file.records.sort_by_key(|r| r.santri_id);
    write_json(&file, store_path)?;

    println!("Merged {} records into '{}'", outcome.success_count, store_path.display());
    for error in &outcome.errors {
        eprintln!("error: {}", error);
    }
    if !outcome.errors.is_empty() {
        bail!("{} of {} records failed", outcome.errors.len(), payload.records.len());
    }
    Ok(())
}

// === Delivery ===

fn send(payload_path: &Path, webhook: Option<&str>, wa_number: Option<&str>) -> Result<()> {
    let payload: SubmissionPayload = read_json(payload_path)
        .with_context(|| format!("Failed to read payload '{}'", payload_path.display()))?;

    match (webhook, wa_number) {
        (Some(url), Some(_)) => {
            let link = send_hybrid(url, wa_number, &payload)
                .context("Hybrid delivery failed at the webhook stage")?;
            eprintln!("Webhook delivered; open the backup link:");
            println!("{}", link);
        }
        (Some(url), None) => {
            post_webhook(url, &payload).context("Webhook delivery failed")?;
            eprintln!("Webhook delivered to {}", url);
        }
        (None, _) => {
            let message = compose_message(&payload, false)?;
            println!("{}", wa_link(wa_number, &message));
        }
    }
    Ok(())
}

// === IO helpers ===

fn read_template(path: &Path) -> Result<RaporTemplate> {
    read_json(path).with_context(|| format!("Failed to read template '{}'", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in '{}'", path.display()))
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write '{}'", path.display()))
}

fn write_json_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(path) = output {
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
    } else {
        io::stdout()
            .write_all(json.as_bytes())
            .context("Failed to write to stdout")?;
        println!();
    }
    Ok(())
}
