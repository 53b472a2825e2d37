//! Load stages.
//!
//! Stages run in a fixed order because each later stage resolves surrogate
//! keys of dimension rows written by an earlier one. Every stage walks the
//! full record list and parses the fields it needs itself.
//!
//! Two failure classes:
//! - a missing or malformed field aborts the run right there; rows already
//!   written stay written
//! - a dimension lookup miss drops that one record and is counted as skipped

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::source::SourceRecord;
use crate::store::{EconomicMetric, Store};

// =============================================================================
// LOAD REPORT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Continents,
    Countries,
    CountryContinentLinks,
    Years,
    EconomicMetrics,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Continents => "continents",
            Stage::Countries => "countries",
            Stage::CountryContinentLinks => "country-continent links",
            Stage::Years => "years",
            Stage::EconomicMetrics => "economic metrics",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    /// Write statements issued (upserts, or inserts for links)
    pub written: usize,
    /// Records dropped because a referenced dimension row was missing
    pub skipped: usize,
    /// Metrics stored without a GDP category
    pub uncategorized: usize,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            written: 0,
            skipped: 0,
            uncategorized: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub records: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
}

impl LoadReport {
    pub fn new(records: usize) -> Self {
        Self {
            records,
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn total_skipped(&self) -> usize {
        self.stages.iter().map(|s| s.skipped).sum()
    }

    /// Human-readable summary, one line per stage
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.stages.len() + 1);
        lines.push(format!("Source records: {}", self.records));
        for s in &self.stages {
            let mut line = format!(
                "  {:<24} written={} skipped={}",
                s.stage.label(),
                s.written,
                s.skipped
            );
            if s.stage == Stage::EconomicMetrics {
                line.push_str(&format!(" uncategorized={}", s.uncategorized));
            }
            lines.push(line);
        }
        lines
    }
}

// =============================================================================
// STAGES
// =============================================================================

/// Run every stage in order and collect their reports
pub async fn run_pipeline<S: Store>(store: &mut S, records: &[SourceRecord]) -> Result<LoadReport> {
    let mut report = LoadReport::new(records.len());

    report.push(load_continents(store, records).await?);
    report.push(load_countries(store, records).await?);
    report.push(link_countries_to_continents(store, records).await?);
    report.push(load_years(store, records).await?);
    report.push(load_economic_metrics(store, records).await?);

    report.finish();
    Ok(report)
}

/// Upsert each distinct trimmed continent name.
/// Case is preserved, so "Europe" and "europe" are two continents.
pub async fn load_continents<S: Store>(store: &mut S, records: &[SourceRecord]) -> Result<StageReport> {
    // BTreeSet for deterministic write order
    let mut continents = BTreeSet::new();
    for record in records {
        continents.insert(record.continent()?.trim().to_string());
    }

    let mut report = StageReport::new(Stage::Continents);
    for name in &continents {
        store
            .upsert_continent(name)
            .await
            .with_context(|| format!("Failed to upsert continent '{}'", name))?;
        report.written += 1;
    }

    info!(written = report.written, "Loaded continents");
    Ok(report)
}

/// Upsert one country per record, no deduplication. A repeated name keeps
/// the ISO codes of its first record.
pub async fn load_countries<S: Store>(store: &mut S, records: &[SourceRecord]) -> Result<StageReport> {
    let mut report = StageReport::new(Stage::Countries);

    for record in records {
        let name = record.country()?;
        let iso_alpha = record.iso_alpha()?;
        let iso_num = record.iso_num()?;

        store
            .upsert_country(name, iso_alpha, iso_num)
            .await
            .with_context(|| format!("Failed to upsert country '{}'", name))?;
        report.written += 1;
    }

    info!(written = report.written, "Loaded countries");
    Ok(report)
}

/// Link each record's country to its continent. Names match exactly as
/// written in the file, without trimming.
pub async fn link_countries_to_continents<S: Store>(
    store: &mut S,
    records: &[SourceRecord],
) -> Result<StageReport> {
    let mut report = StageReport::new(Stage::CountryContinentLinks);

    for record in records {
        let country = record.country()?;
        let Some(country_id) = store
            .find_country_id(country)
            .await
            .with_context(|| format!("Failed to look up country '{}' for link", country))?
        else {
            debug!(line = record.line, country, "Country not found, skipping link");
            report.skipped += 1;
            continue;
        };

        let continent = record.continent()?;
        let Some(continent_id) = store
            .find_continent_id(continent)
            .await
            .with_context(|| format!("Failed to look up continent '{}' for link", continent))?
        else {
            debug!(line = record.line, continent, "Continent not found, skipping link");
            report.skipped += 1;
            continue;
        };

        store
            .link_country_continent(country_id, continent_id)
            .await
            .with_context(|| format!("Failed to link '{}' to '{}'", country, continent))?;
        report.written += 1;
    }

    info!(
        written = report.written,
        skipped = report.skipped,
        "Linked countries to continents"
    );
    Ok(report)
}

/// Upsert each distinct year. Every year is parsed before anything is written.
pub async fn load_years<S: Store>(store: &mut S, records: &[SourceRecord]) -> Result<StageReport> {
    let mut years = BTreeSet::new();
    for record in records {
        years.insert(record.year()?);
    }

    let mut report = StageReport::new(Stage::Years);
    for year in years {
        store
            .upsert_year(year)
            .await
            .with_context(|| format!("Failed to upsert year {}", year))?;
        report.written += 1;
    }

    info!(written = report.written, "Loaded years");
    Ok(report)
}

/// Upsert one GDP fact per (country, year), classified into a GDP category
pub async fn load_economic_metrics<S: Store>(
    store: &mut S,
    records: &[SourceRecord],
) -> Result<StageReport> {
    let mut report = StageReport::new(Stage::EconomicMetrics);

    for record in records {
        let country = record.country()?;
        let Some(country_id) = store
            .find_country_id(country)
            .await
            .with_context(|| format!("Failed to look up country '{}' for metric", country))?
        else {
            debug!(line = record.line, country, "Country not found, skipping metric");
            report.skipped += 1;
            continue;
        };

        let year = record.year()?;
        let Some(year_id) = store
            .find_year_id(year)
            .await
            .with_context(|| format!("Failed to look up year {} for metric", year))?
        else {
            debug!(line = record.line, year, "Year not found, skipping metric");
            report.skipped += 1;
            continue;
        };

        let gdp_per_capita = record.gdp_per_capita()?;
        let gdp_category_id = store
            .find_gdp_category_id(gdp_per_capita)
            .await
            .with_context(|| format!("Failed to resolve GDP category for {}", gdp_per_capita))?;
        if gdp_category_id.is_none() {
            debug!(line = record.line, gdp_per_capita, "No GDP category covers value");
            report.uncategorized += 1;
        }

        let metric = EconomicMetric {
            country_id,
            year_id,
            gdp_per_capita,
            gdp_category_id,
        };
        store
            .upsert_economic_metric(&metric)
            .await
            .with_context(|| format!("Failed to upsert metric for '{}' {}", country, year))?;
        report.written += 1;
    }

    info!(
        written = report.written,
        skipped = report.skipped,
        uncategorized = report.uncategorized,
        "Loaded economic metrics"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{parse_source, RecordError, GDP_PER_CAPITA};
    use crate::store::{GdpCategory, MemoryStore};

    const HEADER: &str = "country,continent,iso_alpha,iso_num,year,gdppercap";

    fn records(rows: &[&str]) -> Vec<SourceRecord> {
        let csv = format!("{}\n{}\n", HEADER, rows.join("\n"));
        parse_source(&csv, b',').unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::with_gdp_categories(vec![
            GdpCategory {
                gdp_category_id: 1,
                min_gdp: 0.0,
                max_gdp: 39999.99,
            },
            GdpCategory {
                gdp_category_id: 3,
                min_gdp: 40000.0,
                max_gdp: 50000.0,
            },
        ])
    }

    fn record_error(err: &anyhow::Error) -> &RecordError {
        err.downcast_ref::<RecordError>()
            .expect("expected a RecordError")
    }

    // -------------------------------------------------------------------------
    // END TO END
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_single_row_end_to_end() {
        let records = records(&["France,Europe,FRA,250,2020,42000.5"]);
        let mut store = store();

        let report = run_pipeline(&mut store, &records).await.unwrap();

        assert_eq!(store.continent_names(), vec!["Europe"]);
        assert_eq!(store.country("France"), Some(("FRA", 250)));
        assert_eq!(store.year_values(), vec![2020]);

        let country_id = store.find_country_id("France").await.unwrap().unwrap();
        let continent_id = store.find_continent_id("Europe").await.unwrap().unwrap();
        let year_id = store.find_year_id(2020).await.unwrap().unwrap();
        assert_eq!(store.links(), vec![(country_id, continent_id)]);
        assert_eq!(
            store.metrics(),
            vec![&EconomicMetric {
                country_id,
                year_id,
                gdp_per_capita: 42000.5,
                gdp_category_id: Some(3),
            }]
        );

        assert_eq!(report.records, 1);
        assert_eq!(report.total_skipped(), 0);
        assert!(report.finished_at.is_some());
        let stages: Vec<Stage> = report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Continents,
                Stage::Countries,
                Stage::CountryContinentLinks,
                Stage::Years,
                Stage::EconomicMetrics,
            ]
        );
    }

    #[tokio::test]
    async fn test_pipeline_is_idempotent() {
        let records = records(&[
            "France,Europe,FRA,250,2019,41000",
            "France,Europe,FRA,250,2020,42000.5",
            "Japan,Asia,JPN,392,2020,39000",
        ]);
        let mut store = store();

        run_pipeline(&mut store, &records).await.unwrap();
        let continents: Vec<String> = store.continent_names().iter().map(|s| s.to_string()).collect();
        let years = store.year_values();
        let links = store.links();
        let metrics: Vec<EconomicMetric> = store.metrics().into_iter().cloned().collect();

        run_pipeline(&mut store, &records).await.unwrap();
        assert_eq!(store.continent_names(), continents);
        assert_eq!(store.year_values(), years);
        assert_eq!(store.links(), links);
        assert_eq!(store.country_count(), 2);
        let rerun: Vec<EconomicMetric> = store.metrics().into_iter().cloned().collect();
        assert_eq!(rerun, metrics);
    }

    // -------------------------------------------------------------------------
    // CONTINENTS
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_continents_trimmed_not_case_folded() {
        let records = records(&[
            "France,Europe,FRA,250,2020,1",
            "Spain,europe ,ESP,724,2020,1",
            "Japan,Asia,JPN,392,2020,1",
        ]);
        let mut store = store();

        let report = load_continents(&mut store, &records).await.unwrap();

        assert_eq!(report.written, 3);
        assert_eq!(store.continent_names(), vec!["Asia", "Europe", "europe"]);
    }

    #[tokio::test]
    async fn test_continents_deduplicated() {
        let records = records(&[
            "France,Europe,FRA,250,2019,1",
            "France,Europe,FRA,250,2020,1",
            "Spain, Europe,ESP,724,2020,1",
        ]);
        let mut store = store();

        let report = load_continents(&mut store, &records).await.unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(store.continent_names(), vec!["Europe"]);
    }

    #[tokio::test]
    async fn test_missing_continent_aborts_before_writes() {
        let csv = "country,iso_alpha,iso_num,year,gdppercap\nFrance,FRA,250,2020,1\n";
        let records = parse_source(csv, b',').unwrap();
        let mut store = store();

        let err = load_continents(&mut store, &records).await.unwrap_err();
        assert!(matches!(record_error(&err), RecordError::MissingField { .. }));
        assert!(store.continent_names().is_empty());
    }

    // -------------------------------------------------------------------------
    // COUNTRIES
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_countries_repeated_rows_keep_first_iso_codes() {
        let records = records(&[
            "France,Europe,FRA,250,2019,1",
            "France,Europe,FRN,251,2020,1",
        ]);
        let mut store = store();

        let report = load_countries(&mut store, &records).await.unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(store.country_count(), 1);
        assert_eq!(store.country("France"), Some(("FRA", 250)));
    }

    #[tokio::test]
    async fn test_invalid_iso_num_aborts_midway() {
        let records = records(&[
            "France,Europe,FRA,250,2020,1",
            "Spain,Europe,ESP,n/a,2020,1",
            "Italy,Europe,ITA,380,2020,1",
        ]);
        let mut store = store();

        let err = load_countries(&mut store, &records).await.unwrap_err();
        match record_error(&err) {
            RecordError::InvalidInteger { line, value, .. } => {
                assert_eq!(*line, 3);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
        // Rows before the bad one stay written
        assert_eq!(store.country("France"), Some(("FRA", 250)));
        assert_eq!(store.country("Italy"), None);
    }

    #[tokio::test]
    async fn test_invalid_iso_num_stops_later_stages() {
        let records = records(&["France,Europe,FRA,250x,2020,1"]);
        let mut store = store();

        assert!(run_pipeline(&mut store, &records).await.is_err());
        assert_eq!(store.continent_names(), vec!["Europe"]);
        assert!(store.year_values().is_empty());
        assert!(store.links().is_empty());
    }

    // -------------------------------------------------------------------------
    // LINKS
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_link_unknown_country_is_skipped() {
        let records = records(&["Atlantis,Europe,ATL,999,2020,1"]);
        let mut store = store();
        load_continents(&mut store, &records).await.unwrap();

        let report = link_countries_to_continents(&mut store, &records).await.unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(report.skipped, 1);
        assert!(store.links().is_empty());
    }

    #[tokio::test]
    async fn test_link_untrimmed_continent_is_skipped() {
        // Continent is stored trimmed but looked up as written
        let records = records(&["France,Europe ,FRA,250,2020,1"]);
        let mut store = store();
        load_continents(&mut store, &records).await.unwrap();
        load_countries(&mut store, &records).await.unwrap();

        let report = link_countries_to_continents(&mut store, &records).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert!(store.links().is_empty());
    }

    #[tokio::test]
    async fn test_link_duplicates_ignored() {
        let records = records(&[
            "France,Europe,FRA,250,2019,1",
            "France,Europe,FRA,250,2020,1",
        ]);
        let mut store = store();
        load_continents(&mut store, &records).await.unwrap();
        load_countries(&mut store, &records).await.unwrap();

        let report = link_countries_to_continents(&mut store, &records).await.unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(store.links().len(), 1);
    }

    // -------------------------------------------------------------------------
    // YEARS
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_years_distinct_and_sorted() {
        let records = records(&[
            "A,X,AAA,1,2007,1",
            "B,X,BBB,2, 1952 ,1",
            "C,X,CCC,3,2007,1",
        ]);
        let mut store = store();

        let report = load_years(&mut store, &records).await.unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(store.year_values(), vec![1952, 2007]);
    }

    #[tokio::test]
    async fn test_bad_year_aborts_before_any_year_written() {
        let records = records(&["A,X,AAA,1,2007,1", "B,X,BBB,2,20O7,1"]);
        let mut store = store();

        let err = load_years(&mut store, &records).await.unwrap_err();
        assert!(matches!(record_error(&err), RecordError::InvalidInteger { line: 3, .. }));
        assert!(store.year_values().is_empty());
    }

    // -------------------------------------------------------------------------
    // ECONOMIC METRICS
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_empty_gdp_is_zero() {
        let records = records(&["France,Europe,FRA,250,2020,"]);
        let mut store = store();

        let report = run_pipeline(&mut store, &records).await.unwrap();
        let metrics = store.metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].gdp_per_capita, 0.0);
        assert_eq!(metrics[0].gdp_category_id, Some(1));
        assert_eq!(report.stage(Stage::EconomicMetrics).unwrap().uncategorized, 0);
    }

    #[tokio::test]
    async fn test_gdp_outside_ranges_stored_without_category() {
        let records = records(&["Monaco,Europe,MCO,492,2020,190000"]);
        let mut store = store();

        let report = run_pipeline(&mut store, &records).await.unwrap();
        assert_eq!(store.metrics()[0].gdp_category_id, None);
        let metrics = report.stage(Stage::EconomicMetrics).unwrap();
        assert_eq!(metrics.written, 1);
        assert_eq!(metrics.uncategorized, 1);
    }

    #[tokio::test]
    async fn test_metric_unknown_country_skipped_before_year_parse() {
        // The bad year is never parsed because the country lookup misses first
        let records = records(&["Atlantis,Europe,ATL,999,not-a-year,1"]);
        let mut store = store();

        let report = load_economic_metrics(&mut store, &records).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert!(store.metrics().is_empty());
    }

    #[tokio::test]
    async fn test_metric_unknown_year_skipped() {
        let records = records(&["France,Europe,FRA,250,2020,1"]);
        let mut store = store();
        load_countries(&mut store, &records).await.unwrap();

        let report = load_economic_metrics(&mut store, &records).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.written, 0);
    }

    #[tokio::test]
    async fn test_metric_bad_gdp_aborts() {
        let records = records(&[
            "France,Europe,FRA,250,2020,42000",
            "Spain,Europe,ESP,724,2020,lots",
        ]);
        let mut store = store();

        let err = run_pipeline(&mut store, &records).await.unwrap_err();
        assert!(matches!(record_error(&err), RecordError::InvalidFloat { line: 3, .. }));
        // The first row's metric was committed before the failure
        assert_eq!(store.metrics().len(), 1);
    }

    #[tokio::test]
    async fn test_metric_same_country_year_overwritten() {
        let records = records(&[
            "France,Europe,FRA,250,2020,1000",
            "France,Europe,FRA,250,2020,45000",
        ]);
        let mut store = store();

        let report = run_pipeline(&mut store, &records).await.unwrap();
        assert_eq!(report.stage(Stage::EconomicMetrics).unwrap().written, 2);
        let metrics = store.metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].gdp_per_capita, 45000.0);
        assert_eq!(metrics[0].gdp_category_id, Some(3));
    }

    #[tokio::test]
    async fn test_metric_without_gdp_column_aborts() {
        let csv = "country,continent,iso_alpha,iso_num,year,GDP Per Cap\nFrance,Europe,FRA,250,2020,42000.5\n";
        let records = parse_source(csv, b',').unwrap();
        let mut store = store();

        let err = run_pipeline(&mut store, &records).await.unwrap_err();
        assert!(matches!(
            record_error(&err),
            RecordError::MissingField { field: GDP_PER_CAPITA, line: 2 }
        ));
        // Dimension stages ran; no metric was written
        assert_eq!(store.year_values(), vec![2020]);
        assert!(store.metrics().is_empty());
    }

    // -------------------------------------------------------------------------
    // LOOKUP FAILURES
    // -------------------------------------------------------------------------

    /// Delegates to a `MemoryStore` but fails every year lookup
    struct BrokenYearLookup(MemoryStore);

    #[async_trait::async_trait]
    impl Store for BrokenYearLookup {
        async fn upsert_continent(&mut self, name: &str) -> Result<()> {
            self.0.upsert_continent(name).await
        }

        async fn find_continent_id(&mut self, name: &str) -> Result<Option<i32>> {
            self.0.find_continent_id(name).await
        }

        async fn upsert_country(&mut self, name: &str, iso_alpha: &str, iso_num: i32) -> Result<()> {
            self.0.upsert_country(name, iso_alpha, iso_num).await
        }

        async fn find_country_id(&mut self, name: &str) -> Result<Option<i32>> {
            self.0.find_country_id(name).await
        }

        async fn link_country_continent(&mut self, country_id: i32, continent_id: i32) -> Result<()> {
            self.0.link_country_continent(country_id, continent_id).await
        }

        async fn upsert_year(&mut self, year: i32) -> Result<()> {
            self.0.upsert_year(year).await
        }

        async fn find_year_id(&mut self, _year: i32) -> Result<Option<i32>> {
            anyhow::bail!("connection reset")
        }

        async fn find_gdp_category_id(&mut self, gdp_per_capita: f64) -> Result<Option<i32>> {
            self.0.find_gdp_category_id(gdp_per_capita).await
        }

        async fn upsert_economic_metric(&mut self, metric: &EconomicMetric) -> Result<()> {
            self.0.upsert_economic_metric(metric).await
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_names_the_key() {
        let records = records(&["France,Europe,FRA,250,2020,42000.5"]);
        let mut store = BrokenYearLookup(store());

        let err = run_pipeline(&mut store, &records).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to look up year 2020 for metric"));
        assert!(message.contains("connection reset"));
        assert!(store.0.metrics().is_empty());
    }

    // -------------------------------------------------------------------------
    // LOAD REPORT
    // -------------------------------------------------------------------------

    fn report() -> LoadReport {
        let mut report = LoadReport::new(3);
        let mut links = StageReport::new(Stage::CountryContinentLinks);
        links.written = 2;
        links.skipped = 1;
        let mut metrics = StageReport::new(Stage::EconomicMetrics);
        metrics.written = 1;
        metrics.skipped = 2;
        metrics.uncategorized = 1;
        report.push(links);
        report.push(metrics);
        report
    }

    #[test]
    fn test_stage_lookup_and_totals() {
        let report = report();
        assert_eq!(report.stage(Stage::CountryContinentLinks).unwrap().written, 2);
        assert!(report.stage(Stage::Years).is_none());
        assert_eq!(report.total_skipped(), 3);
    }

    #[test]
    fn test_finish_sets_timestamp() {
        let mut report = report();
        assert!(report.finished_at.is_none());
        report.finish();
        assert!(report.finished_at.unwrap() >= report.started_at);
    }

    #[test]
    fn test_summary_lines() {
        let lines = report().summary_lines();
        assert_eq!(lines[0], "Source records: 3");
        assert!(lines[1].contains("country-continent links"));
        assert!(lines[1].contains("skipped=1"));
        assert!(!lines[1].contains("uncategorized"));
        assert!(lines[2].contains("uncategorized=1"));
    }

    #[test]
    fn test_serializes_stage_names() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["records"], 3);
        assert_eq!(json["stages"][0]["stage"], "country_continent_links");
        assert_eq!(json["stages"][1]["uncategorized"], 1);
    }
}
