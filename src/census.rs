//! Region-wide census totals and the provider that owns them for a session.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::host::Region;
use crate::model::{CityRecord, RciGroup};

/// Population sums and city counts for a whole region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionTotals {
    pub residential_population: i64,
    pub r1: i64,
    pub r2: i64,
    pub r3: i64,

    pub commercial_jobs: i64,
    pub cs1: i64,
    pub cs2: i64,
    pub cs3: i64,
    pub co2: i64,
    pub co3: i64,

    pub industrial_jobs: i64,
    pub ir: i64,
    pub id: i64,
    pub im: i64,
    pub iht: i64,

    // cities in mayor mode vs. empty sites
    pub developed_cities: i64,
    pub undeveloped_cities: i64,

    /// Sum of city budgets, each truncated toward zero.
    pub region_funds: i64,
}

/// Adds `$value` into `$self.$field`, failing instead of wrapping.
macro_rules! accumulate {
    ($self:ident . $field:ident, $value:expr) => {
        $self.$field = $self
            .$field
            .checked_add($value)
            .ok_or_else(|| anyhow!(concat!("region ", stringify!($field), " total overflowed")))?;
    };
}

impl RegionTotals {
    pub fn total_cities(&self) -> i64 {
        self.developed_cities.saturating_add(self.undeveloped_cities)
    }

    /// Folds one developed city into the totals.
    ///
    /// # Errors
    ///
    /// Fails if any counter would overflow; the totals are then unusable.
    pub fn add_city(&mut self, city: &CityRecord) -> Result<()> {
        accumulate!(self.developed_cities, 1);

        accumulate!(self.residential_population, city.residential_population());
        accumulate!(self.r1, city.group(RciGroup::R1).population);
        accumulate!(self.r2, city.group(RciGroup::R2).population);
        accumulate!(self.r3, city.group(RciGroup::R3).population);

        accumulate!(self.commercial_jobs, city.commercial_jobs());
        accumulate!(self.cs1, city.group(RciGroup::Cs1).population);
        accumulate!(self.cs2, city.group(RciGroup::Cs2).population);
        accumulate!(self.cs3, city.group(RciGroup::Cs3).population);
        accumulate!(self.co2, city.group(RciGroup::Co2).population);
        accumulate!(self.co3, city.group(RciGroup::Co3).population);

        accumulate!(self.industrial_jobs, city.industrial_jobs());
        accumulate!(self.ir, city.group(RciGroup::IR).population);
        accumulate!(self.id, city.group(RciGroup::ID).population);
        accumulate!(self.im, city.group(RciGroup::IM).population);
        accumulate!(self.iht, city.group(RciGroup::IHT).population);

        // `as` saturates out-of-range budgets; the checked add still catches the sum
        accumulate!(self.region_funds, city.budget().trunc() as i64);

        Ok(())
    }

    /// Field-wise sum of two totals, or an error if any counter overflows.
    pub fn checked_add(&self, other: &RegionTotals) -> Result<RegionTotals> {
        let mut sum = *self;
        accumulate!(sum.residential_population, other.residential_population);
        accumulate!(sum.r1, other.r1);
        accumulate!(sum.r2, other.r2);
        accumulate!(sum.r3, other.r3);
        accumulate!(sum.commercial_jobs, other.commercial_jobs);
        accumulate!(sum.cs1, other.cs1);
        accumulate!(sum.cs2, other.cs2);
        accumulate!(sum.cs3, other.cs3);
        accumulate!(sum.co2, other.co2);
        accumulate!(sum.co3, other.co3);
        accumulate!(sum.industrial_jobs, other.industrial_jobs);
        accumulate!(sum.ir, other.ir);
        accumulate!(sum.id, other.id);
        accumulate!(sum.im, other.im);
        accumulate!(sum.iht, other.iht);
        accumulate!(sum.developed_cities, other.developed_cities);
        accumulate!(sum.undeveloped_cities, other.undeveloped_cities);
        accumulate!(sum.region_funds, other.region_funds);
        Ok(sum)
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct Census {
    pub totals: RegionTotals,
    pub records: Vec<CityRecord>,
}

/// Walks every city site in `region` and builds the region census.
///
/// Sites without a city object are skipped. Empty sites only count towards
/// [`RegionTotals::undeveloped_cities`].
///
/// # Errors
///
/// Fails on the first city whose data cannot be read. No partial census is
/// returned.
#[tracing::instrument(skip(region), fields(region = %region.name()))]
pub fn aggregate(region: &dyn Region) -> Result<Census> {
    let mut census = Census::default();

    let locations = region.city_locations().context("listing city locations")?;

    for location in &locations {
        let Some(city) = region.city(location) else {
            debug!(x = location.x, y = location.y, "No city at location, skipping");
            continue;
        };

        if !city.is_established() {
            let totals = &mut census.totals;
            accumulate!(totals.undeveloped_cities, 1);
            continue;
        }

        let record = CityRecord::from_city(city, location.tile_size)
            .with_context(|| format!("reading city at ({}, {})", location.x, location.y))?;

        census
            .totals
            .add_city(&record)
            .with_context(|| format!("adding city '{}' to region totals", record.city_name()))?;
        census.records.push(record);
    }

    Ok(census)
}

/// Read side of the census, as used by the overlay panel and CSV export.
pub trait CensusDataProvider {
    fn totals(&self) -> &RegionTotals;
    fn city_records(&self) -> &[CityRecord];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SessionState {
    #[default]
    Uninitialized,
    Initialized,
}

/// Holds the census for the currently loaded region.
///
/// The census is built once per region session: [`post_region_init`] fills it
/// and [`pre_region_shutdown`] empties it again.
///
/// [`post_region_init`]: RegionCensus::post_region_init
/// [`pre_region_shutdown`]: RegionCensus::pre_region_shutdown
#[derive(Debug, Default)]
pub struct RegionCensus {
    state: SessionState,
    census: Census,
}

impl RegionCensus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state == SessionState::Initialized
    }

    /// Builds the census for a freshly loaded region.
    ///
    /// Does nothing if the session is already initialized. Failures are
    /// logged and leave the census empty.
    pub fn post_region_init(&mut self, region: Option<&dyn Region>) {
        if self.is_initialized() {
            debug!("Region census already initialized, ignoring region init");
            return;
        }

        self.state = SessionState::Initialized;

        let Some(region) = region else {
            error!("Error loading the region census data, the region was not available");
            return;
        };

        match aggregate(region) {
            Ok(census) => {
                info!(
                    region = %region.name(),
                    developed = census.totals.developed_cities,
                    undeveloped = census.totals.undeveloped_cities,
                    "Region census loaded"
                );
                self.census = census;
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(region = %region.name(), error = %message, "Error loading the region census data");
                self.clear();
            }
        }
    }

    /// Ends the region session and drops its census.
    pub fn pre_region_shutdown(&mut self) {
        if self.is_initialized() {
            self.state = SessionState::Uninitialized;
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.census = Census::default();
    }
}

impl CensusDataProvider for RegionCensus {
    fn totals(&self) -> &RegionTotals {
        &self.census.totals
    }

    fn city_records(&self) -> &[CityRecord] {
        &self.census.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{RegionSnapshot, SnapshotCity, SnapshotSite};
    use crate::model::GroupStats;

    fn city(name: &str, population: i64, budget: f64) -> SnapshotCity {
        let mut city: SnapshotCity = serde_json::from_str("{}").unwrap();
        city.name = name.to_string();
        city.population = population;
        city.commercial_jobs = population / 5;
        city.industrial_jobs = population / 10;
        city.budget = budget;
        city.groups.insert(
            RciGroup::R1,
            GroupStats {
                population,
                extrapolated_population: population + 50,
                tax_rate: 0.09,
            },
        );
        city.groups.insert(
            RciGroup::IHT,
            GroupStats {
                population: population / 10,
                ..Default::default()
            },
        );
        city
    }

    fn empty_site() -> SnapshotCity {
        let mut city: SnapshotCity = serde_json::from_str("{}").unwrap();
        city.established = false;
        city.population = 99_999;
        city.budget = 1.0e6;
        city
    }

    fn region(cities: Vec<Option<SnapshotCity>>) -> RegionSnapshot {
        RegionSnapshot {
            name: "Test Region".to_string(),
            sites: cities
                .into_iter()
                .enumerate()
                .map(|(i, city)| SnapshotSite {
                    x: i as u32 * 4,
                    y: 0,
                    tile_size: 0,
                    city,
                })
                .collect(),
        }
    }

    fn broken_city() -> SnapshotCity {
        let mut city = city("Broken", 10, 10.0);
        city.commercial_jobs = -1;
        city
    }

    #[test]
    fn test_empty_region_is_zero() {
        let census = aggregate(&region(vec![])).unwrap();

        assert_eq!(census.totals, RegionTotals::default());
        assert!(census.records.is_empty());
    }

    #[test]
    fn test_aggregate_sums_developed_cities() {
        let census = aggregate(&region(vec![
            Some(city("A", 1000, 5000.75)),
            Some(city("B", 500, 1200.5)),
        ]))
        .unwrap();

        let t = census.totals;
        assert_eq!(t.developed_cities, 2);
        assert_eq!(t.undeveloped_cities, 0);
        assert_eq!(t.residential_population, 1500);
        assert_eq!(t.r1, 1500);
        assert_eq!(t.commercial_jobs, 300);
        assert_eq!(t.industrial_jobs, 150);
        assert_eq!(t.iht, 150);
        assert_eq!(t.region_funds, 6200);
        assert_eq!(census.records.len(), 2);
        assert_eq!(census.records[0].city_name(), "A");
        assert_eq!(census.records[1].city_name(), "B");
    }

    #[test]
    fn test_region_funds_truncate_toward_zero() {
        let census = aggregate(&region(vec![
            Some(city("Debt", 0, -250.9)),
            Some(city("Rich", 0, 100.9)),
        ]))
        .unwrap();

        assert_eq!(census.totals.region_funds, -150);
    }

    #[test]
    fn test_undeveloped_sites_only_count() {
        let census = aggregate(&region(vec![Some(empty_site()), Some(empty_site())])).unwrap();

        let expected = RegionTotals {
            undeveloped_cities: 2,
            ..Default::default()
        };
        assert_eq!(census.totals, expected);
        assert!(census.records.is_empty());
    }

    #[test]
    fn test_missing_city_objects_are_skipped() {
        let census = aggregate(&region(vec![None, Some(city("A", 10, 1.0)), None])).unwrap();

        assert_eq!(census.totals.developed_cities, 1);
        assert_eq!(census.totals.total_cities(), 1);
    }

    #[test]
    fn test_aggregation_is_additive() {
        let a = vec![Some(city("A", 1000, 10.5)), Some(empty_site())];
        let b = vec![None, Some(city("B", 300, 99.9)), Some(empty_site())];
        let combined: Vec<_> = a.iter().chain(b.iter()).cloned().collect();

        let total_a = aggregate(&region(a)).unwrap().totals;
        let total_b = aggregate(&region(b)).unwrap().totals;
        let total_ab = aggregate(&region(combined)).unwrap().totals;

        assert_eq!(total_ab, total_a.checked_add(&total_b).unwrap());
    }

    #[test]
    fn test_read_failure_fails_whole_pass() {
        let result = aggregate(&region(vec![Some(city("A", 10, 1.0)), Some(broken_city())]));

        assert!(result.is_err());
    }

    #[test]
    fn test_population_overflow_fails_pass() {
        let result = aggregate(&region(vec![Some(city("A", i64::MAX, 0.0)), Some(city("B", 1, 0.0))]));

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("overflowed"));
    }

    #[test]
    fn test_provider_clears_on_overflow() {
        let mut provider = RegionCensus::new();
        provider.post_region_init(Some(&region(vec![
            Some(city("A", i64::MAX, 0.0)),
            Some(city("B", 1, 0.0)),
        ])));

        assert_eq!(*provider.totals(), RegionTotals::default());
        assert!(provider.city_records().is_empty());
    }

    #[test]
    fn test_shared_location_fails_pass() {
        let mut twins = region(vec![Some(city("A", 10, 0.0)), Some(city("B", 7, 0.0))]);
        twins.sites[1].x = 0;

        assert!(aggregate(&twins).is_err());

        let mut provider = RegionCensus::new();
        provider.post_region_init(Some(&twins));
        assert_eq!(*provider.totals(), RegionTotals::default());
        assert!(provider.city_records().is_empty());
    }

    #[test]
    fn test_checked_add_rejects_overflow() {
        let big = RegionTotals {
            region_funds: i64::MAX,
            ..Default::default()
        };
        let one = RegionTotals {
            region_funds: 1,
            ..Default::default()
        };

        assert!(big.checked_add(&one).is_err());
        assert_eq!(one.checked_add(&one).unwrap().region_funds, 2);
    }

    #[test]
    fn test_provider_starts_empty() {
        let provider = RegionCensus::new();

        assert!(!provider.is_initialized());
        assert_eq!(*provider.totals(), RegionTotals::default());
        assert!(provider.city_records().is_empty());
    }

    #[test]
    fn test_provider_clears_on_failure_regardless_of_position() {
        for position in 0..3 {
            let mut cities = vec![Some(city("A", 10, 1.0)), Some(city("B", 20, 2.0)), Some(empty_site())];
            cities.insert(position, Some(broken_city()));

            let mut provider = RegionCensus::new();
            provider.post_region_init(Some(&region(cities)));

            assert!(provider.is_initialized());
            assert_eq!(*provider.totals(), RegionTotals::default());
            assert!(provider.city_records().is_empty());
        }
    }

    #[test]
    fn test_provider_without_region_stays_zero() {
        let mut provider = RegionCensus::new();
        provider.post_region_init(None);

        assert!(provider.is_initialized());
        assert_eq!(*provider.totals(), RegionTotals::default());
    }

    #[test]
    fn test_second_init_does_not_double_count() {
        let region = region(vec![Some(city("A", 10, 1.0))]);
        let mut provider = RegionCensus::new();

        provider.post_region_init(Some(&region));
        let first = *provider.totals();
        provider.post_region_init(Some(&region));

        assert_eq!(*provider.totals(), first);
        assert_eq!(provider.city_records().len(), 1);
    }

    #[test]
    fn test_shutdown_resets_session() {
        let region = region(vec![Some(city("A", 10, 1.0))]);
        let mut provider = RegionCensus::new();

        provider.post_region_init(Some(&region));
        provider.pre_region_shutdown();

        assert!(!provider.is_initialized());
        assert_eq!(*provider.totals(), RegionTotals::default());

        provider.post_region_init(Some(&region));
        assert_eq!(provider.totals().developed_cities, 1);
    }
}
