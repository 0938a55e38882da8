use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::affinity::{AffinityTables, FoodAdjustment, pirate_index};
use crate::error::DatasetError;
use crate::round_record::{ArenaOutcome, POSITIONS, RawRound};

pub const HISTORY_COLUMNS: [&str; 27] = [
    "round",
    "arena",
    "pirate1",
    "pirate2",
    "pirate3",
    "pirate4",
    "fa1",
    "fa2",
    "fa3",
    "fa4",
    "pfa1",
    "pfa2",
    "pfa3",
    "pfa4",
    "nfa1",
    "nfa2",
    "nfa3",
    "nfa4",
    "opening_odds1",
    "opening_odds2",
    "opening_odds3",
    "opening_odds4",
    "closing_odds1",
    "closing_odds2",
    "closing_odds3",
    "closing_odds4",
    "winner",
];

#[derive(Debug, Clone)]
pub struct HistorySummary {
    pub path: PathBuf,
    pub rounds_read: usize,
    pub rows: usize,
    pub digest: String,
}

/// Builds the canonical wide table: every resolved arena of every round, sorted by
/// (round, arena). Rounds are processed in parallel; the final sort makes the result
/// independent of scheduling.
pub fn assemble_history(
    rounds: &[RawRound],
    tables: &AffinityTables,
) -> Result<Vec<ArenaOutcome>, DatasetError> {
    let per_round = rounds
        .par_iter()
        .map(|round| round.arena_outcomes(tables))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows: Vec<ArenaOutcome> = per_round.into_iter().flatten().collect();
    rows.sort_by_key(|row| (row.round, row.arena));

    let before = rows.len();
    rows.dedup_by_key(|row| (row.round, row.arena));
    if rows.len() != before {
        warn!(
            dropped = before - rows.len(),
            "duplicate (round, arena) rows dropped; keeping the first file's copy"
        );
    }
    Ok(rows)
}

/// Reads every `*.json` round file below `dir`. Files are visited in path order so
/// duplicate rounds resolve the same way on every run.
pub fn load_raw_rounds(dir: &Path) -> Result<Vec<RawRound>> {
    let mut paths = Vec::new();
    collect_json_files(dir, &mut paths)?;
    paths.sort();
    debug!(files = paths.len(), dir = %dir.display(), "raw round files found");

    paths
        .par_iter()
        .map(|path| {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read round file {}", path.display()))?;
            serde_json::from_str::<RawRound>(&raw)
                .with_context(|| format!("parse round file {}", path.display()))
        })
        .collect()
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read raw round dir {}", dir.display()))?;
    for entry in entries {
        let path = entry.context("read dir entry")?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

/// Raw rounds on disk -> wide table CSV. Returns what was written and its digest.
pub fn build_history_file(
    raw_dir: &Path,
    out_path: &Path,
    tables: &AffinityTables,
) -> Result<HistorySummary> {
    let rounds = load_raw_rounds(raw_dir)?;
    let rows = assemble_history(&rounds, tables).context("assemble wide table")?;
    let digest = save_history(out_path, &rows)?;
    info!(
        rounds = rounds.len(),
        rows = rows.len(),
        digest = %digest,
        path = %out_path.display(),
        "history written"
    );
    Ok(HistorySummary {
        path: out_path.to_path_buf(),
        rounds_read: rounds.len(),
        rows: rows.len(),
        digest,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryCsvRow {
    round: u32,
    arena: u8,
    pirate1: u8,
    pirate2: u8,
    pirate3: u8,
    pirate4: u8,
    fa1: i32,
    fa2: i32,
    fa3: i32,
    fa4: i32,
    pfa1: i32,
    pfa2: i32,
    pfa3: i32,
    pfa4: i32,
    nfa1: i32,
    nfa2: i32,
    nfa3: i32,
    nfa4: i32,
    opening_odds1: f64,
    opening_odds2: f64,
    opening_odds3: f64,
    opening_odds4: f64,
    closing_odds1: f64,
    closing_odds2: f64,
    closing_odds3: f64,
    closing_odds4: f64,
    winner: u8,
}

impl From<&ArenaOutcome> for HistoryCsvRow {
    fn from(row: &ArenaOutcome) -> Self {
        let [p1, p2, p3, p4] = row.pirates;
        let [a1, a2, a3, a4] = row.adjustments;
        let [o1, o2, o3, o4] = row.opening_odds;
        let [c1, c2, c3, c4] = row.closing_odds;
        Self {
            round: row.round,
            arena: row.arena,
            pirate1: p1,
            pirate2: p2,
            pirate3: p3,
            pirate4: p4,
            fa1: a1.fa,
            fa2: a2.fa,
            fa3: a3.fa,
            fa4: a4.fa,
            pfa1: a1.pfa,
            pfa2: a2.pfa,
            pfa3: a3.pfa,
            pfa4: a4.pfa,
            nfa1: a1.nfa,
            nfa2: a2.nfa,
            nfa3: a3.nfa,
            nfa4: a4.nfa,
            opening_odds1: o1,
            opening_odds2: o2,
            opening_odds3: o3,
            opening_odds4: o4,
            closing_odds1: c1,
            closing_odds2: c2,
            closing_odds3: c3,
            closing_odds4: c4,
            winner: row.winner,
        }
    }
}

impl HistoryCsvRow {
    fn into_outcome(self) -> Result<ArenaOutcome> {
        let row = self;
        let pirates = [row.pirate1, row.pirate2, row.pirate3, row.pirate4];
        for pirate in pirates {
            pirate_index(pirate)?;
        }
        if !(1..=POSITIONS as u8).contains(&row.winner) {
            return Err(anyhow!(
                "round {} arena {}: winner {} is not a position",
                row.round,
                row.arena,
                row.winner
            ));
        }
        let adjustment = |pfa, nfa, fa| FoodAdjustment { pfa, nfa, fa };
        Ok(ArenaOutcome {
            round: row.round,
            arena: row.arena,
            pirates,
            adjustments: [
                adjustment(row.pfa1, row.nfa1, row.fa1),
                adjustment(row.pfa2, row.nfa2, row.fa2),
                adjustment(row.pfa3, row.nfa3, row.fa3),
                adjustment(row.pfa4, row.nfa4, row.fa4),
            ],
            opening_odds: [
                row.opening_odds1,
                row.opening_odds2,
                row.opening_odds3,
                row.opening_odds4,
            ],
            closing_odds: [
                row.closing_odds1,
                row.closing_odds2,
                row.closing_odds3,
                row.closing_odds4,
            ],
            winner: row.winner,
        })
    }
}

pub fn write_history<W: Write>(writer: W, rows: &[ArenaOutcome]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        csv.write_record(HISTORY_COLUMNS)
            .context("write history header")?;
    }
    for row in rows {
        csv.serialize(HistoryCsvRow::from(row))
            .context("write history row")?;
    }
    csv.flush().context("flush history csv")?;
    Ok(())
}

/// Reads a wide table back in file order. The file is trusted to be sorted already.
pub fn read_history<R: Read>(reader: R) -> Result<Vec<ArenaOutcome>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers().context("read history header")?.clone();
    if headers.iter().ne(HISTORY_COLUMNS.iter().copied()) {
        return Err(anyhow!("unexpected history columns: {:?}", headers));
    }
    csv.deserialize::<HistoryCsvRow>()
        .enumerate()
        .map(|(idx, row)| {
            let row = row.with_context(|| format!("parse history row {}", idx + 1))?;
            row.into_outcome().with_context(|| format!("history row {}", idx + 1))
        })
        .collect()
}

pub fn history_to_csv_bytes(rows: &[ArenaOutcome]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_history(&mut buf, rows)?;
    Ok(buf)
}

pub fn history_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Writes the wide table atomically and returns the SHA-256 of the bytes written.
pub fn save_history(path: &Path, rows: &[ArenaOutcome]) -> Result<String> {
    let bytes = history_to_csv_bytes(rows)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, &bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(history_digest(&bytes))
}

pub fn load_history(path: &Path) -> Result<Vec<ArenaOutcome>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_history(file).with_context(|| format!("read {}", path.display()))
}
