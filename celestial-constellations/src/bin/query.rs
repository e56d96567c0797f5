use celestial_constellations::query::Catalog;
use celestial_constellations::ConstellationRecord;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "query-constellations")]
#[command(about = "Inspect constellation catalogs")]
struct Cli {
    /// Path to the catalog file
    #[arg(long)]
    catalog: PathBuf,

    /// Print query timing
    #[arg(long, global = true)]
    timing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print catalog information and build metadata
    Info,
    /// List every constellation
    List {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Look up one constellation by IAU identifier
    Get {
        /// IAU identifier, e.g. cma
        iau_id: String,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Look up one constellation by primary key
    Pk {
        /// Primary key (1-based build order)
        pk: u64,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let catalog = Catalog::open(&cli.catalog)?;
    let start = cli.timing.then(Instant::now);

    match cli.command {
        Commands::Info => {
            println!("{}", catalog.info());
            if let Ok(meta) = std::fs::metadata(catalog.path()) {
                println!("File size: {} bytes", meta.len());
            }
        }
        Commands::List { format } => {
            let records = catalog.iter()?.collect::<Result<Vec<_>, _>>()?;
            print_records(&records, &format, false)?;
        }
        Commands::Get { iau_id, format } => {
            let record = catalog.get(&iau_id)?;
            print_records(std::slice::from_ref(&record), &format, true)?;
        }
        Commands::Pk { pk, format } => {
            let record = catalog.get_by_pk(pk)?;
            print_records(std::slice::from_ref(&record), &format, true)?;
        }
    }

    if let Some(start_time) = start {
        eprintln!(
            "Query completed in {:.2} ms",
            start_time.elapsed().as_secs_f64() * 1000.0
        );
    }
    Ok(())
}

fn print_records(
    records: &[ConstellationRecord],
    format: &OutputFormat,
    detail: bool,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(records, detail),
        OutputFormat::Json => print_json(records)?,
        OutputFormat::Csv => print_csv(records),
    }
    Ok(())
}

fn print_table(records: &[ConstellationRecord], detail: bool) {
    for record in records {
        let pk = record
            .primary_key
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}: {:<4} {:<22} RA={:>11.6}° Dec={:+10.6}° Stars={:3} Lines={:3} Vertices={}",
            pk,
            record.iau_id,
            record.display_name,
            record.center_ra,
            record.center_dec,
            record.star_hip_ids.len(),
            record.star_hip_lines.len(),
            record.boundary.vertices().len()
        );
        if detail {
            let ids: Vec<String> = record.star_hip_ids.iter().map(|id| id.to_string()).collect();
            println!("      HIP ids: {}", ids.join(" "));
            for [a, b] in &record.star_hip_lines {
                println!("      line {} - {}", a, b);
            }
            for (ra, dec) in record.boundary.vertices() {
                println!("      vertex RA={:.6}° Dec={:+.6}°", ra, dec);
            }
        }
    }

    if records.is_empty() {
        println!("Catalog is empty.");
    } else if !detail {
        println!("\nTotal records: {}", records.len());
    }
}

#[derive(serde::Serialize)]
struct JsonRecord<'a> {
    pk: Option<u64>,
    iau_id: &'a str,
    name: &'a str,
    ra: f64,
    dec: f64,
    constellation_id: &'a str,
    star_hip_ids: Vec<u32>,
    star_hip_lines: &'a [[u32; 2]],
    boundary: Vec<[f64; 2]>,
}

fn print_json(records: &[ConstellationRecord]) -> anyhow::Result<()> {
    let rows: Vec<JsonRecord> = records
        .iter()
        .map(|r| JsonRecord {
            pk: r.primary_key,
            iau_id: &r.iau_id,
            name: &r.display_name,
            ra: r.center_ra,
            dec: r.center_dec,
            constellation_id: &r.constellation_id,
            star_hip_ids: r.star_hip_ids.iter().copied().collect(),
            star_hip_lines: &r.star_hip_lines,
            boundary: r.boundary.vertices().iter().map(|&(ra, dec)| [ra, dec]).collect(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn print_csv(records: &[ConstellationRecord]) {
    println!("pk,iau_id,name,ra,dec,stars,lines,vertices");
    for r in records {
        println!(
            "{},{},\"{}\",{},{},{},{},{}",
            r.primary_key.map(|k| k.to_string()).unwrap_or_default(),
            r.iau_id,
            r.display_name,
            r.center_ra,
            r.center_dec,
            r.star_hip_ids.len(),
            r.star_hip_lines.len(),
            r.boundary.vertices().len()
        );
    }
}
