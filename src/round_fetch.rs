use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::{info, warn};

use crate::round_record::RawRound;

const REQUEST_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub current_round: u32,
    pub fetched: Vec<u32>,
    pub not_found: Vec<u32>,
}

pub fn round_path(raw_dir: &Path, round: u32) -> PathBuf {
    raw_dir.join(format!("{round}.json"))
}

/// Rounds to request, newest first: walks back from the last finished round until one
/// is already on disk, never more than `limit` rounds.
pub fn rounds_to_fetch(current_round: u32, limit: u32, exists: impl Fn(u32) -> bool) -> Vec<u32> {
    let newest = current_round.saturating_sub(1);
    let oldest = current_round.saturating_sub(limit).max(1);
    let mut out = Vec::new();
    let mut round = newest;
    while round >= oldest && !exists(round) {
        out.push(round);
        round -= 1;
    }
    out
}

pub fn fetch_current_round(client: &Client, base_url: &str) -> Result<u32> {
    let url = format!("{base_url}/current_round.txt");
    let resp = client
        .get(&url)
        .header(USER_AGENT, "foodclub_logit")
        .send()
        .with_context(|| format!("request {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {} for {}", status, url));
    }
    body.trim()
        .parse::<u32>()
        .with_context(|| format!("current round is not a number: {:?}", body.trim()))
}

/// `Ok(None)` when the CDN has no file for the round.
pub fn fetch_round_json(client: &Client, base_url: &str, round: u32) -> Result<Option<String>> {
    let url = format!("{base_url}/rounds/{round}.json");
    let resp = client
        .get(&url)
        .header(USER_AGENT, "foodclub_logit")
        .send()
        .with_context(|| format!("request {url}"))?;
    if !resp.status().is_success() {
        return Ok(None);
    }
    let body = resp.text().context("failed reading body")?;
    Ok(Some(body))
}

/// Downloads finished rounds missing from `raw_dir`. Bodies are checked against the round
/// schema before they are written so a format change stops the run here.
pub fn grab_missing_rounds(base_url: &str, raw_dir: &Path, limit: u32) -> Result<FetchSummary> {
    let client = http_client()?;
    let current_round = fetch_current_round(client, base_url)?;
    fs::create_dir_all(raw_dir).with_context(|| format!("create {}", raw_dir.display()))?;

    let plan = rounds_to_fetch(current_round, limit, |r| round_path(raw_dir, r).exists());
    info!(current_round, planned = plan.len(), "grabbing rounds");

    let mut summary = FetchSummary {
        current_round,
        ..FetchSummary::default()
    };
    for round in plan {
        let Some(body) = fetch_round_json(client, base_url, round)? else {
            warn!(round, "round not found");
            summary.not_found.push(round);
            continue;
        };
        serde_json::from_str::<RawRound>(&body)
            .with_context(|| format!("round {round} does not match the expected schema"))?;
        let path = round_path(raw_dir, round);
        fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
        info!(round, "saved round");
        summary.fetched.push(round);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_back_until_existing_round() {
        let plan = rounds_to_fetch(100, 90, |r| r <= 96);
        assert_eq!(plan, vec![99, 98, 97]);
    }

    #[test]
    fn respects_limit() {
        let plan = rounds_to_fetch(100, 5, |_| false);
        assert_eq!(plan, vec![99, 98, 97, 96, 95]);
    }

    #[test]
    fn never_goes_below_round_one() {
        let plan = rounds_to_fetch(3, 90, |_| false);
        assert_eq!(plan, vec![2, 1]);
        assert!(rounds_to_fetch(0, 90, |_| false).is_empty());
        assert!(rounds_to_fetch(1, 90, |_| false).is_empty());
    }

    #[test]
    fn round_files_are_named_by_number() {
        assert_eq!(
            round_path(Path::new("raw_json"), 8123),
            PathBuf::from("raw_json/8123.json")
        );
    }
}
