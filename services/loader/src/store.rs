//! Database seam.
//!
//! Stages talk to the database only through [`Store`]. `PgStore` is the real
//! PostgreSQL backend; `MemoryStore` backs dry runs and tests.
//!
//! Every write is its own statement and commits on its own; there is no
//! transaction wider than one row.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::{BTreeMap, BTreeSet};

/// A fact row for the economic_metrics table
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicMetric {
    pub country_id: i32,
    pub year_id: i32,
    pub gdp_per_capita: f64,
    pub gdp_category_id: Option<i32>,
}

/// Pre-seeded GDP range, inclusive on both ends
#[derive(Debug, Clone, PartialEq)]
pub struct GdpCategory {
    pub gdp_category_id: i32,
    pub min_gdp: f64,
    pub max_gdp: f64,
}

impl GdpCategory {
    pub fn contains(&self, gdp_per_capita: f64) -> bool {
        self.min_gdp <= gdp_per_capita && gdp_per_capita <= self.max_gdp
    }
}

#[async_trait]
pub trait Store: Send {
    /// Insert the continent, or leave the existing row in place
    async fn upsert_continent(&mut self, name: &str) -> Result<()>;

    async fn find_continent_id(&mut self, name: &str) -> Result<Option<i32>>;

    /// Insert the country. An existing row keeps the ISO codes it was first stored with.
    async fn upsert_country(&mut self, name: &str, iso_alpha: &str, iso_num: i32) -> Result<()>;

    async fn find_country_id(&mut self, name: &str) -> Result<Option<i32>>;

    /// Insert the association; an existing pair is left untouched
    async fn link_country_continent(&mut self, country_id: i32, continent_id: i32) -> Result<()>;

    async fn upsert_year(&mut self, year: i32) -> Result<()>;

    async fn find_year_id(&mut self, year: i32) -> Result<Option<i32>>;

    /// Id of the category whose range contains the value. Overlaps resolve to the lowest id.
    async fn find_gdp_category_id(&mut self, gdp_per_capita: f64) -> Result<Option<i32>>;

    /// Insert the fact, or overwrite GDP value and category for the same (country, year)
    async fn upsert_economic_metric(&mut self, metric: &EconomicMetric) -> Result<()>;
}

// =============================================================================
// POSTGRES
// =============================================================================

/// PostgreSQL backend. Holds a single connection for the whole run.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(db_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }

    /// Read the full range table, ordered by id
    pub async fn gdp_categories(&self) -> Result<Vec<GdpCategory>> {
        let rows: Vec<(i32, f64, f64)> = sqlx::query_as(
            "SELECT gdp_category_id, min_gdp, max_gdp FROM gdp_category ORDER BY gdp_category_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to read gdp_category")?;

        Ok(rows
            .into_iter()
            .map(|(gdp_category_id, min_gdp, max_gdp)| GdpCategory {
                gdp_category_id,
                min_gdp,
                max_gdp,
            })
            .collect())
    }

    /// Release the connection. Dropping the store also releases it.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PgStore {
    async fn upsert_continent(&mut self, name: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO continent (continent_name)
            VALUES ($1)
            ON CONFLICT (continent_name) DO UPDATE SET continent_name = EXCLUDED.continent_name
            "#,
        )
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_continent_id(&mut self, name: &str) -> Result<Option<i32>> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT continent_id FROM continent WHERE continent_name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    async fn upsert_country(&mut self, name: &str, iso_alpha: &str, iso_num: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO country (country_name, iso_alpha, iso_num)
            VALUES ($1, $2, $3)
            ON CONFLICT (country_name) DO UPDATE SET country_name = EXCLUDED.country_name
            "#,
        )
        .bind(name)
        .bind(iso_alpha)
        .bind(iso_num)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_country_id(&mut self, name: &str) -> Result<Option<i32>> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT country_id FROM country WHERE country_name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    async fn link_country_continent(&mut self, country_id: i32, continent_id: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO country_continent (country_id, continent_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(country_id)
        .bind(continent_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_year(&mut self, year: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO years (year_value)
            VALUES ($1)
            ON CONFLICT (year_value) DO UPDATE SET year_value = EXCLUDED.year_value
            "#,
        )
        .bind(year)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_year_id(&mut self, year: i32) -> Result<Option<i32>> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT year_id FROM years WHERE year_value = $1")
            .bind(year)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn find_gdp_category_id(&mut self, gdp_per_capita: f64) -> Result<Option<i32>> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT gdp_category_id FROM gdp_category
            WHERE $1 BETWEEN min_gdp AND max_gdp
            ORDER BY gdp_category_id
            LIMIT 1
            "#,
        )
        .bind(gdp_per_capita)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    async fn upsert_economic_metric(&mut self, metric: &EconomicMetric) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO economic_metrics (country_id, year_id, gdp_per_capita, gdp_category_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (country_id, year_id) DO UPDATE
                SET gdp_per_capita = EXCLUDED.gdp_per_capita,
                    gdp_category_id = EXCLUDED.gdp_category_id
            "#,
        )
        .bind(metric.country_id)
        .bind(metric.year_id)
        .bind(metric.gdp_per_capita)
        .bind(metric.gdp_category_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct CountryRow {
    country_id: i32,
    iso_alpha: String,
    iso_num: i32,
}

/// In-memory store with the same upsert/ignore semantics as the database schema.
/// Surrogate keys are assigned from 1 in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    continents: BTreeMap<String, i32>,
    countries: BTreeMap<String, CountryRow>,
    links: BTreeSet<(i32, i32)>,
    years: BTreeMap<i32, i32>,
    gdp_categories: Vec<GdpCategory>,
    metrics: BTreeMap<(i32, i32), EconomicMetric>,
    next_id: i32,
}

impl MemoryStore {
    pub fn with_gdp_categories(gdp_categories: Vec<GdpCategory>) -> Self {
        Self {
            gdp_categories,
            ..Default::default()
        }
    }

    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_continent(&mut self, name: &str) -> Result<()> {
        if !self.continents.contains_key(name) {
            let id = self.allocate_id();
            self.continents.insert(name.to_string(), id);
        }
        Ok(())
    }

    async fn find_continent_id(&mut self, name: &str) -> Result<Option<i32>> {
        Ok(self.continents.get(name).copied())
    }

    async fn upsert_country(&mut self, name: &str, iso_alpha: &str, iso_num: i32) -> Result<()> {
        if !self.countries.contains_key(name) {
            let country_id = self.allocate_id();
            self.countries.insert(
                name.to_string(),
                CountryRow {
                    country_id,
                    iso_alpha: iso_alpha.to_string(),
                    iso_num,
                },
            );
        }
        Ok(())
    }

    async fn find_country_id(&mut self, name: &str) -> Result<Option<i32>> {
        Ok(self.countries.get(name).map(|row| row.country_id))
    }

    async fn link_country_continent(&mut self, country_id: i32, continent_id: i32) -> Result<()> {
        self.links.insert((country_id, continent_id));
        Ok(())
    }

    async fn upsert_year(&mut self, year: i32) -> Result<()> {
        if !self.years.contains_key(&year) {
            let id = self.allocate_id();
            self.years.insert(year, id);
        }
        Ok(())
    }

    async fn find_year_id(&mut self, year: i32) -> Result<Option<i32>> {
        Ok(self.years.get(&year).copied())
    }

    async fn find_gdp_category_id(&mut self, gdp_per_capita: f64) -> Result<Option<i32>> {
        Ok(self
            .gdp_categories
            .iter()
            .filter(|c| c.contains(gdp_per_capita))
            .map(|c| c.gdp_category_id)
            .min())
    }

    async fn upsert_economic_metric(&mut self, metric: &EconomicMetric) -> Result<()> {
        self.metrics
            .insert((metric.country_id, metric.year_id), metric.clone());
        Ok(())
    }
}

#[cfg(test)]
impl MemoryStore {
    pub fn continent_names(&self) -> Vec<&str> {
        self.continents.keys().map(String::as_str).collect()
    }

    pub fn country(&self, name: &str) -> Option<(&str, i32)> {
        self.countries
            .get(name)
            .map(|row| (row.iso_alpha.as_str(), row.iso_num))
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn links(&self) -> Vec<(i32, i32)> {
        self.links.iter().copied().collect()
    }

    pub fn year_values(&self) -> Vec<i32> {
        self.years.keys().copied().collect()
    }

    pub fn metrics(&self) -> Vec<&EconomicMetric> {
        self.metrics.values().collect()
    }
}
