//! Synthetic constellation data set shared by the integration tests.
//!
//! Mirrors the layout of the real inputs: 89 entries (Serpens split into
//! `se1` and `se2`), one boundary file per entry with a header line, and
//! Canis Major drawn with its real Hipparcos line pairs.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

pub const CONSTELLATION_IDS: [&str; 89] = [
    "and", "ant", "aps", "aql", "aqr", "ara", "ari", "aur", "boo", "cae", "cam", "cap", "car",
    "cas", "cen", "cep", "cet", "cha", "cir", "cma", "cmi", "cnc", "col", "com", "cra", "crb",
    "crt", "cru", "crv", "cvn", "cyg", "del", "dor", "dra", "equ", "eri", "for", "gem", "gru",
    "her", "hor", "hya", "hyi", "ind", "lac", "leo", "lep", "lib", "lmi", "lup", "lyn", "lyr",
    "men", "mic", "mon", "mus", "nor", "oct", "oph", "ori", "pav", "peg", "per", "phe", "pic",
    "psa", "psc", "pup", "pyx", "ret", "scl", "sco", "sct", "se1", "se2", "sex", "sge", "sgr",
    "tau", "tel", "tra", "tri", "tuc", "uma", "umi", "vel", "vir", "vol", "vul",
];

pub const CANIS_MAJOR_LINES: [[u32; 2]; 10] = [
    [32349, 33160],
    [33160, 34045],
    [34045, 33347],
    [33347, 34444],
    [34444, 35904],
    [34444, 33579],
    [33579, 33152],
    [33152, 31592],
    [32349, 30324],
    [30324, 31592],
];

pub fn canis_major_stars() -> BTreeSet<u32> {
    BTreeSet::from([
        35904, 33152, 33347, 31592, 33160, 33579, 34444, 30324, 34045, 32349,
    ])
}

/// Display name written for `id`.
pub fn display_name(id: &str) -> String {
    match id {
        "cma" => "Canis Major".to_string(),
        other => format!("Constellation {}", other.to_uppercase()),
    }
}

fn hip_lines(index: usize, id: &str) -> Vec<[u32; 2]> {
    if id == "cma" {
        return CANIS_MAJOR_LINES.to_vec();
    }
    let base = 1000 + index as u32 * 10;
    vec![[base, base + 1], [base + 1, base + 2], [base + 2, base]]
}

/// Square boundary spanning half an hour of RA and five degrees of Dec.
pub fn boundary_text(index: usize, id: &str) -> String {
    let hour = index % 24;
    let dec = -80.0 + index as f64 * 1.5;
    let code = id.to_uppercase();
    format!(
        "RA (HMS) DEC (deg) CONST\n\
         {h:02} 00 00.0000| {d0:.7}|{c}\n\
         {h:02} 30 00.0000| {d0:.7}|{c}\n\
         {h:02} 30 00.0000| {d1:.7}|{c}\n\
         {h:02} 00 00.0000| {d1:.7}|{c}\n",
        h = hour,
        d0 = dec,
        d1 = dec + 5.0,
        c = code
    )
}

/// Write `constellations.json` and `boundaries/` for `ids` under `root/data`.
pub fn write_dataset(root: &Path, ids: &[&str]) -> PathBuf {
    let data = root.join("data");
    let boundaries = data.join("boundaries");
    fs::create_dir_all(&boundaries).unwrap();

    let mut doc = Map::new();
    for (index, id) in ids.iter().enumerate() {
        doc.insert(
            id.to_string(),
            json!({
                "name": display_name(id),
                "ra": index as f64 * 4.0,
                "dec": -80.0 + index as f64 * 1.5 + 2.5,
                "hip_lines": hip_lines(index, id),
            }),
        );
        fs::write(boundaries.join(format!("{}.txt", id)), boundary_text(index, id)).unwrap();
    }
    fs::write(
        data.join("constellations.json"),
        serde_json::to_string_pretty(&Value::Object(doc)).unwrap(),
    )
    .unwrap();
    data
}

/// The full 89-entry data set under `root/data`.
pub fn write_standard_dataset(root: &Path) -> PathBuf {
    write_dataset(root, &CONSTELLATION_IDS)
}

/// Replace one boundary file with raw `content`.
pub fn overwrite_boundary(data: &Path, id: &str, content: &str) {
    fs::write(data.join("boundaries").join(format!("{}.txt", id)), content).unwrap();
}
