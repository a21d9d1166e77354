//! Seam between the census core and the game that owns the region.
//!
//! [`Region`] and [`RegionalCity`] are what a host implements to expose its
//! cities. [`RegionSnapshot`] implements both over a JSON document so the
//! census can run outside the game.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::model::{GroupStats, RciGroup};

/// Position of a city site on the region map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityLocation {
    pub x: u32,
    pub y: u32,
    /// Host tile size code: `0` small, `1` medium, `2` large.
    pub tile_size: u32,
}

/// Read access to one city site in a region.
///
/// Every read may fail; the census treats a failure as fatal for the whole
/// region pass.
pub trait RegionalCity {
    /// `false` for an empty site nobody has founded yet.
    fn is_established(&self) -> bool;
    fn city_name(&self) -> Result<String>;
    fn mayor_name(&self) -> Result<String>;
    fn difficulty_level(&self) -> Result<u32>;
    fn mayor_rating(&self) -> Result<i8>;
    fn population(&self) -> Result<i64>;
    fn commercial_jobs(&self) -> Result<i64>;
    fn industrial_jobs(&self) -> Result<i64>;
    /// Employed share of the workforce as a fraction in `0.0..=1.0`.
    fn workforce_fraction(&self) -> Result<f64>;
    fn budget(&self) -> Result<f64>;
    fn income(&self) -> Result<f64>;
    fn group_population(&self, group: RciGroup) -> Result<Option<i64>>;
    fn group_extrapolated_population(&self, group: RciGroup) -> Result<Option<i64>>;
    fn group_tax_rate(&self, group: RciGroup) -> Result<Option<f64>>;
}

/// A loaded region: its name and the city sites on its map.
pub trait Region {
    fn name(&self) -> &str;

    /// Site locations in host enumeration order.
    fn city_locations(&self) -> Result<Vec<CityLocation>>;

    /// The city at `location`, or `None` when the host has no city object there.
    fn city(&self, location: &CityLocation) -> Option<&dyn RegionalCity>;
}

/// Validation failures raised while reading snapshot data.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{field} is negative ({value}) for city '{city}'")]
    NegativeValue {
        city: String,
        field: &'static str,
        value: i64,
    },
    #[error("{group:?} tax rate {rate} is outside 0..=1 for city '{city}'")]
    TaxRateOutOfRange {
        city: String,
        group: RciGroup,
        rate: f64,
    },
    #[error("more than one site at ({x}, {y})")]
    DuplicateLocation { x: u32, y: u32 },
}

pub type SnapshotGroups = BTreeMap<RciGroup, GroupStats>;

/// A city as stored in a region snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCity {
    #[serde(default = "default_established")]
    pub established: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mayor: String,
    #[serde(default)]
    pub difficulty: u32,
    #[serde(default)]
    pub mayor_rating: i8,
    #[serde(default)]
    pub population: i64,
    #[serde(default)]
    pub commercial_jobs: i64,
    #[serde(default)]
    pub industrial_jobs: i64,
    #[serde(default)]
    pub workforce_fraction: f64,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub groups: SnapshotGroups,
}

fn default_established() -> bool {
    true
}

impl SnapshotCity {
    fn non_negative(&self, field: &'static str, value: i64) -> Result<i64> {
        if value < 0 {
            return Err(HostError::NegativeValue {
                city: self.name.clone(),
                field,
                value,
            }
            .into());
        }
        Ok(value)
    }
}

impl RegionalCity for SnapshotCity {
    fn is_established(&self) -> bool {
        self.established
    }

    fn city_name(&self) -> Result<String> {
        Ok(self.name.clone())
    }

    fn mayor_name(&self) -> Result<String> {
        Ok(self.mayor.clone())
    }

    fn difficulty_level(&self) -> Result<u32> {
        Ok(self.difficulty)
    }

    fn mayor_rating(&self) -> Result<i8> {
        Ok(self.mayor_rating)
    }

    fn population(&self) -> Result<i64> {
        self.non_negative("population", self.population)
    }

    fn commercial_jobs(&self) -> Result<i64> {
        self.non_negative("commercial_jobs", self.commercial_jobs)
    }

    fn industrial_jobs(&self) -> Result<i64> {
        self.non_negative("industrial_jobs", self.industrial_jobs)
    }

    fn workforce_fraction(&self) -> Result<f64> {
        Ok(self.workforce_fraction)
    }

    fn budget(&self) -> Result<f64> {
        Ok(self.budget)
    }

    fn income(&self) -> Result<f64> {
        Ok(self.income)
    }

    fn group_population(&self, group: RciGroup) -> Result<Option<i64>> {
        self.groups
            .get(&group)
            .map(|g| self.non_negative("group population", g.population))
            .transpose()
    }

    fn group_extrapolated_population(&self, group: RciGroup) -> Result<Option<i64>> {
        self.groups
            .get(&group)
            .map(|g| self.non_negative("group extrapolated population", g.extrapolated_population))
            .transpose()
    }

    fn group_tax_rate(&self, group: RciGroup) -> Result<Option<f64>> {
        match self.groups.get(&group) {
            Some(g) if !(0.0..=1.0).contains(&g.tax_rate) => Err(HostError::TaxRateOutOfRange {
                city: self.name.clone(),
                group,
                rate: g.tax_rate,
            }
            .into()),
            Some(g) => Ok(Some(g.tax_rate)),
            None => Ok(None),
        }
    }
}

/// One site of a region snapshot. `city` is `null` when the host had no
/// city object for the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSite {
    pub x: u32,
    pub y: u32,
    #[serde(default)]
    pub tile_size: u32,
    #[serde(default)]
    pub city: Option<SnapshotCity>,
}

/// A region exported to JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub name: String,
    #[serde(default)]
    pub sites: Vec<SnapshotSite>,
}

impl RegionSnapshot {
    /// Loads a snapshot from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading region snapshot '{}'", path.display()))?;
        let snapshot: RegionSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("parsing region snapshot '{}'", path.display()))?;
        snapshot
            .validate()
            .with_context(|| format!("validating region snapshot '{}'", path.display()))?;
        Ok(snapshot)
    }

    /// Checks that no two sites share a map location.
    pub fn validate(&self) -> Result<(), HostError> {
        let mut seen = HashSet::with_capacity(self.sites.len());
        for site in &self.sites {
            if !seen.insert((site.x, site.y)) {
                return Err(HostError::DuplicateLocation {
                    x: site.x,
                    y: site.y,
                });
            }
        }
        Ok(())
    }
}

impl Region for RegionSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn city_locations(&self) -> Result<Vec<CityLocation>> {
        // Sites are looked up by location, so a duplicate would shadow a city.
        self.validate()?;

        Ok(self
            .sites
            .iter()
            .map(|site| CityLocation {
                x: site.x,
                y: site.y,
                tile_size: site.tile_size,
            })
            .collect())
    }

    fn city(&self, location: &CityLocation) -> Option<&dyn RegionalCity> {
        self.sites
            .iter()
            .find(|site| site.x == location.x && site.y == location.y)
            .and_then(|site| site.city.as_ref())
            .map(|city| city as &dyn RegionalCity)
    }
}
