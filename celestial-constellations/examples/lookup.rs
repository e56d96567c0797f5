use celestial_constellations::query::Catalog;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .expect("Usage: lookup <constellations.parquet> [iau_id]");
    let iau_id = args.next().unwrap_or_else(|| "cma".to_string());

    let catalog = Catalog::open(&path)?;
    println!("{}\n", catalog.info());

    let record = catalog.get(&iau_id)?;
    println!(
        "{} ({}) label at RA {:.6}°  Dec {:+.6}°",
        record.display_name, record.iau_id, record.center_ra, record.center_dec,
    );
    println!(
        "  {} stars, {} lines, {} boundary vertices",
        record.star_hip_ids.len(),
        record.star_hip_lines.len(),
        record.boundary.vertices().len(),
    );
    for [a, b] in &record.star_hip_lines {
        println!("  HIP {:>6} - HIP {:>6}", a, b);
    }

    Ok(())
}
