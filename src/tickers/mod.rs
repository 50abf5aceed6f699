use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use encoding_rs::EUC_KR;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::SystemTime;
use unicode_normalization::UnicodeNormalization;

use crate::config::Config;
use crate::error::DashError;

const KIND_DOWNLOAD_URL: &str = "https://kind.krx.co.kr/corpgeneral/corpList.do";
const CACHE_FILENAME: &str = "listing.csv";
const META_FILENAME: &str = "listing.meta.json";
const SUGGESTION_LIMIT: usize = 5;

static TICKER_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("ticker code pattern is valid"));

/// Korean exchange board a company is listed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Kospi,
    Kosdaq,
    Konex,
    Unknown,
}

impl Market {
    pub const LISTED: [Market; 3] = [Market::Kospi, Market::Kosdaq, Market::Konex];

    pub fn as_str(self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
            Market::Konex => "KONEX",
            Market::Unknown => "UNKNOWN",
        }
    }

    /// `marketType` parameter of the KIND download
    fn kind_param(self) -> Option<&'static str> {
        match self {
            Market::Kospi => Some("stockMkt"),
            Market::Kosdaq => Some("kosdaqMkt"),
            Market::Konex => Some("konexMkt"),
            Market::Unknown => None,
        }
    }

    /// Market-data symbol suffixes to try, in order
    pub fn symbol_suffixes(self) -> &'static [&'static str] {
        match self {
            Market::Kospi => &[".KS"],
            Market::Kosdaq => &[".KQ"],
            Market::Konex | Market::Unknown => &[".KS", ".KQ"],
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the listed company table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub code: String,
    pub name: String,
    pub market: Market,
    pub sector: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    ExactName,
    NumericCode,
}

/// Outcome of turning user input into a ticker code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTicker {
    pub code: String,
    pub name: Option<String>,
    pub market: Market,
    pub source: ResolutionSource,
}

impl ResolvedTicker {
    /// Symbols to request from the market-data source, in order of preference
    pub fn symbols(&self) -> Vec<String> {
        self.market
            .symbol_suffixes()
            .iter()
            .map(|suffix| format!("{}{}", self.code, suffix))
            .collect()
    }
}

/// Reference table indexed by exact name and by code
#[derive(Debug, Default)]
pub struct ListingTable {
    records: Vec<TickerRecord>,
    by_name: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

impl ListingTable {
    pub fn from_records(records: Vec<TickerRecord>) -> Self {
        let mut table = ListingTable::default();
        for record in records {
            if table.by_code.contains_key(&record.code) {
                tracing::warn!("Duplicate ticker code in KRX listing: {}", record.code);
                continue;
            }
            let idx = table.records.len();
            table.by_code.insert(record.code.clone(), idx);
            table
                .by_name
                .entry(normalize_exact(&record.name))
                .or_insert(idx);
            table.records.push(record);
        }
        table
    }

    pub fn get_by_name(&self, name: &str) -> Option<&TickerRecord> {
        self.by_name
            .get(&normalize_exact(name))
            .map(|&idx| &self.records[idx])
    }

    pub fn get_by_code(&self, code: &str) -> Option<&TickerRecord> {
        self.by_code.get(code).map(|&idx| &self.records[idx])
    }

    pub fn records(&self) -> &[TickerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Names compare equal after NFKC and outer trimming only
pub(crate) fn normalize_exact(input: &str) -> String {
    input.trim().nfkc().collect()
}

pub fn is_ticker_code(input: &str) -> bool {
    TICKER_CODE.is_match(input)
}

/// Resolve a company name or 6-digit code.
///
/// Exact name lookup comes first; a six digit string that matches no name is
/// accepted as a code even when the listing does not know it.
pub fn resolve(query: &str, table: &ListingTable) -> Result<ResolvedTicker> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(DashError::InvalidQuery("company name or code is empty".into()).into());
    }

    if let Some(record) = table.get_by_name(trimmed) {
        tracing::debug!("Resolved '{}' by name to {}", trimmed, record.code);
        return Ok(ResolvedTicker {
            code: record.code.clone(),
            name: Some(record.name.clone()),
            market: record.market,
            source: ResolutionSource::ExactName,
        });
    }

    if is_ticker_code(trimmed) {
        let record = table.get_by_code(trimmed);
        if record.is_none() {
            tracing::info!("Code {} is not in the listing, accepting as-is", trimmed);
        }
        return Ok(ResolvedTicker {
            code: trimmed.to_string(),
            name: record.map(|r| r.name.clone()),
            market: record.map(|r| r.market).unwrap_or(Market::Unknown),
            source: ResolutionSource::NumericCode,
        });
    }

    let suggestions = search(table, trimmed, SUGGESTION_LIMIT)
        .into_iter()
        .map(|r| r.name.clone())
        .collect();
    Err(DashError::TickerNotFound {
        query: trimmed.to_string(),
        suggestions,
    }
    .into())
}

/// Substring search over names and code prefixes.
/// Names starting with the fragment rank first, then shorter names.
pub fn search<'a>(table: &'a ListingTable, fragment: &str, limit: usize) -> Vec<&'a TickerRecord> {
    let needle = normalize_exact(fragment).to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<&TickerRecord> = table
        .records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle) || r.code.starts_with(&needle))
        .collect();
    hits.sort_by_key(|r| {
        (
            !r.name.to_lowercase().starts_with(&needle),
            r.name.chars().count(),
            r.code.clone(),
        )
    });
    hits.truncate(limit);
    hits
}

// ============ KIND download and cache ============

#[derive(Debug, Serialize, Deserialize)]
struct ListingMeta {
    fetched_at: DateTime<Utc>,
    source_url: String,
}

#[derive(Debug, Clone)]
pub struct ListingMetaInfo {
    pub fetched_at: DateTime<Utc>,
    pub source_url: String,
}

#[derive(Debug)]
struct CachedListing {
    table: Arc<ListingTable>,
    mtime: SystemTime,
}

/// In-memory tables keyed by cache directory
static LISTING_CACHE: OnceLock<Mutex<HashMap<PathBuf, CachedListing>>> = OnceLock::new();

pub fn get_listing_cache_dir() -> Result<PathBuf> {
    let cache_dir = dir_spec::cache_home()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;

    Ok(cache_dir.join("krxdash").join("listing"))
}

/// Listing cache directory, honouring the `cache_dir` setting
pub fn listing_cache_dir(config: &Config) -> Result<PathBuf> {
    match &config.cache_dir {
        Some(root) => Ok(root.join("listing")),
        None => get_listing_cache_dir(),
    }
}

/// Download the listed company table unless the cache is still fresh
pub fn refresh_listing(force: bool, config: &Config) -> Result<PathBuf> {
    let cache_dir = listing_cache_dir(config)?;
    fs::create_dir_all(&cache_dir).context("Failed to create listing cache directory")?;

    let csv_path = cache_dir.join(CACHE_FILENAME);
    if !force && csv_path.exists() && !is_cache_stale(&cache_dir, config.listing_max_age_hours)? {
        return Ok(csv_path);
    }
    if config.offline {
        return Err(DashError::Listing("offline mode is on, not downloading the listing".into()).into());
    }

    let (records, source_url) = download_listing(config.http_timeout_secs)?;
    tracing::info!("Downloaded {} listed companies from KIND", records.len());

    let tmp_path = cache_dir.join(format!("{}.tmp", CACHE_FILENAME));
    write_listing_csv(&tmp_path, &records)?;
    fs::rename(&tmp_path, &csv_path).context("Failed to finalize listing cache file")?;

    let meta = ListingMeta {
        fetched_at: Utc::now(),
        source_url,
    };
    fs::write(cache_dir.join(META_FILENAME), serde_json::to_vec_pretty(&meta)?)
        .context("Failed to write listing metadata")?;

    cache_guard().remove(&cache_dir);

    Ok(csv_path)
}

/// Memoized listing for the whole process.
///
/// Downloads on first use when the cache is missing or stale. A stale cache is
/// still used if the download fails or the program runs offline.
pub fn get_listing(config: &Config) -> Result<Arc<ListingTable>> {
    let cache_dir = listing_cache_dir(config)?;
    let csv_path = cache_dir.join(CACHE_FILENAME);

    {
        let guard = cache_guard();
        if let Some(cached) = guard.get(&cache_dir) {
            if file_mtime(&csv_path).ok() == Some(cached.mtime) {
                return Ok(cached.table.clone());
            }
        }
    }

    let needs_refresh = !csv_path.exists() || is_cache_stale(&cache_dir, config.listing_max_age_hours)?;
    if needs_refresh {
        match refresh_listing(true, config) {
            Ok(_) => {}
            Err(err) if csv_path.exists() => {
                tracing::warn!("Using stale KRX listing, refresh failed: {:#}", err);
            }
            Err(err) => {
                return Err(err.context("KRX listing is not cached and could not be downloaded"));
            }
        }
    }

    get_cached_listing(&cache_dir)
}

pub fn read_cache_meta(cache_dir: Option<&Path>) -> Result<Option<ListingMetaInfo>> {
    let cache_dir = match cache_dir {
        Some(path) => path.to_path_buf(),
        None => get_listing_cache_dir()?,
    };
    let meta_path = cache_dir.join(META_FILENAME);
    if !meta_path.exists() {
        return Ok(None);
    }
    let meta_bytes = fs::read(&meta_path).context("Failed to read listing metadata")?;
    let meta: ListingMeta =
        serde_json::from_slice(&meta_bytes).context("Failed to parse listing metadata")?;
    Ok(Some(ListingMetaInfo {
        fetched_at: meta.fetched_at,
        source_url: meta.source_url,
    }))
}

pub fn load_listing(cache_dir: Option<&Path>) -> Result<ListingTable> {
    let cache_dir = match cache_dir {
        Some(path) => path.to_path_buf(),
        None => get_listing_cache_dir()?,
    };
    let csv_path = cache_dir.join(CACHE_FILENAME);
    let mut reader = csv::Reader::from_path(&csv_path)
        .with_context(|| format!("Failed to open listing cache {}", csv_path.display()))?;

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: TickerRecord = result.context("Malformed row in listing cache")?;
        records.push(record);
    }
    Ok(ListingTable::from_records(records))
}

pub fn write_listing_csv(path: &Path, records: &[TickerRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().context("Failed to flush listing cache")?;
    Ok(())
}

/// Parse the HTML table KIND serves as its "Excel" download
pub fn parse_listing_html(html: &str, market: Market) -> Result<Vec<TickerRecord>> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;

    let mut columns: Option<(usize, usize, Option<usize>)> = None;
    let mut records = Vec::new();

    for row in document.select(&row_sel) {
        let headers: Vec<String> = row.select(&th_sel).map(cell_text).collect();
        if columns.is_none() && !headers.is_empty() {
            let position = |name: &str| headers.iter().position(|h| h == name);
            let name_idx = position("회사명")
                .ok_or_else(|| DashError::Listing("KIND table has no 회사명 column".into()))?;
            let code_idx = position("종목코드")
                .ok_or_else(|| DashError::Listing("KIND table has no 종목코드 column".into()))?;
            columns = Some((name_idx, code_idx, position("업종")));
            continue;
        }

        let Some((name_idx, code_idx, sector_idx)) = columns else {
            continue;
        };
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        let (Some(name), Some(code)) = (cells.get(name_idx), cells.get(code_idx)) else {
            continue;
        };
        if name.is_empty() || code.is_empty() {
            continue;
        }

        records.push(TickerRecord {
            code: pad_code(code),
            name: name.clone(),
            market,
            sector: sector_idx
                .and_then(|idx| cells.get(idx))
                .filter(|s| !s.is_empty())
                .cloned(),
        });
    }

    if columns.is_none() {
        return Err(DashError::Listing("KIND listing header row not found".into()).into());
    }
    Ok(records)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {}: {:?}", css, e))
}

fn cell_text(cell: scraper::ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spreadsheet round trips drop leading zeros; numeric codes are six digits
fn pad_code(code: &str) -> String {
    let code = code.trim();
    if !code.is_empty() && code.len() < 6 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>6}", code)
    } else {
        code.to_string()
    }
}

fn download_listing(timeout_secs: u64) -> Result<(Vec<TickerRecord>, String)> {
    std::thread::spawn(move || {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; krxdash/0.1)")
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let mut records = Vec::new();
        for market in Market::LISTED {
            let Some(param) = market.kind_param() else {
                continue;
            };
            let url = format!(
                "{}?method=download&searchType=13&marketType={}",
                KIND_DOWNLOAD_URL, param
            );
            let bytes = client
                .get(&url)
                .send()
                .with_context(|| format!("Failed to request {} listing from KIND", market))?
                .error_for_status()
                .context("KIND listing request returned an error status")?
                .bytes()
                .context("Failed to read KIND listing response")?;

            let (decoded, _, had_errors) = EUC_KR.decode(&bytes);
            if had_errors {
                tracing::warn!("KIND {} listing contained undecodable bytes", market);
            }
            let parsed = parse_listing_html(&decoded, market)?;
            tracing::debug!("Parsed {} {} companies", parsed.len(), market);
            records.extend(parsed);
        }

        Ok((records, KIND_DOWNLOAD_URL.to_string()))
    })
    .join()
    .map_err(|_| anyhow!("Listing download thread panicked"))?
}

/// True when the metadata is missing or older than `max_age_hours`
pub fn is_cache_stale(cache_dir: &Path, max_age_hours: i64) -> Result<bool> {
    let Some(meta) = read_cache_meta(Some(cache_dir))? else {
        return Ok(true);
    };
    Ok(Utc::now() - meta.fetched_at > Duration::hours(max_age_hours))
}

fn cache_guard() -> std::sync::MutexGuard<'static, HashMap<PathBuf, CachedListing>> {
    LISTING_CACHE
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .expect("listing cache mutex poisoned")
}

fn file_mtime(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .context("Failed to stat listing cache file")?
        .modified()
        .context("Failed to read listing cache modified time")
}

fn get_cached_listing(cache_dir: &Path) -> Result<Arc<ListingTable>> {
    let mtime = file_mtime(&cache_dir.join(CACHE_FILENAME))?;

    let mut guard = cache_guard();
    if let Some(cached) = guard.get(cache_dir) {
        if cached.mtime == mtime {
            return Ok(cached.table.clone());
        }
    }

    let table = Arc::new(load_listing(Some(cache_dir))?);
    tracing::debug!("Loaded {} listed companies into memory", table.len());
    guard.insert(
        cache_dir.to_path_buf(),
        CachedListing {
            table: table.clone(),
            mtime,
        },
    );
    Ok(table)
}
