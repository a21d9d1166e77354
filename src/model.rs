//! Per-city census records and the RCI group taxonomy.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::host::RegionalCity;

/// Residential, commercial and industrial demand groups tracked per city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RciGroup {
    R1,
    R2,
    R3,
    Cs1,
    Cs2,
    Cs3,
    Co2,
    Co3,
    IR,
    ID,
    IM,
    IHT,
}

impl RciGroup {
    /// Every group, in report column order.
    pub const ALL: [RciGroup; 12] = [
        RciGroup::R1,
        RciGroup::R2,
        RciGroup::R3,
        RciGroup::Cs1,
        RciGroup::Cs2,
        RciGroup::Cs3,
        RciGroup::Co2,
        RciGroup::Co3,
        RciGroup::IR,
        RciGroup::ID,
        RciGroup::IM,
        RciGroup::IHT,
    ];

    /// Short label used in report headers. Wealth tiers are written with the
    /// in-game `§` glyph, one per tier.
    pub fn display_token(self) -> &'static str {
        match self {
            RciGroup::R1 => "R§",
            RciGroup::R2 => "R§§",
            RciGroup::R3 => "R§§§",
            RciGroup::Cs1 => "Cs§",
            RciGroup::Cs2 => "Cs§§",
            RciGroup::Cs3 => "Cs§§§",
            RciGroup::Co2 => "Co§§",
            RciGroup::Co3 => "Co§§§",
            RciGroup::IR => "IR",
            RciGroup::ID => "ID",
            RciGroup::IM => "IM",
            RciGroup::IHT => "IHT",
        }
    }
}

/// Population and tax figures for one [`RciGroup`] in one city.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupStats {
    pub population: i64,
    pub extrapolated_population: i64,
    /// Fraction in `0.0..=1.0`; reports show it multiplied by 100.
    pub tax_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Difficulty::Easy),
            1 => Some(Difficulty::Medium),
            2 => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSize {
    Small,
    Medium,
    Large,
}

impl TileSize {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(TileSize::Small),
            1 => Some(TileSize::Medium),
            2 => Some(TileSize::Large),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TileSize::Small => "Small",
            TileSize::Medium => "Medium",
            TileSize::Large => "Large",
        }
    }
}

/// Snapshot of one established city, taken when the region loads.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    city_name: String,
    mayor_name: String,
    difficulty: String,
    tile_size: String,
    mayor_rating: i8,
    residential_population: i64,
    commercial_jobs: i64,
    industrial_jobs: i64,
    workforce_percentage: f64,
    groups: BTreeMap<RciGroup, GroupStats>,
    budget: f64,
    income: f64,
}

impl CityRecord {
    /// Reads every census field from `city`.
    ///
    /// Group figures the city does not report are recorded as zero. Unknown
    /// difficulty or tile size codes become empty strings.
    ///
    /// # Errors
    ///
    /// Returns the first read error reported by the host city.
    pub fn from_city(city: &dyn RegionalCity, tile_size_code: u32) -> Result<Self> {
        let city_name = city.city_name().context("reading city name")?;
        let mayor_name = city.mayor_name().context("reading mayor name")?;

        let tile_size = match TileSize::from_code(tile_size_code) {
            Some(size) => size.as_str().to_string(),
            None => {
                warn!(city = %city_name, code = tile_size_code, "Unknown city tile size code");
                String::new()
            }
        };

        let difficulty_code = city.difficulty_level()?;
        let difficulty = match Difficulty::from_code(difficulty_code) {
            Some(level) => level.as_str().to_string(),
            None => {
                warn!(city = %city_name, code = difficulty_code, "Unknown difficulty code");
                String::new()
            }
        };

        let mut groups = BTreeMap::new();
        for group in RciGroup::ALL {
            let stats = GroupStats {
                population: city.group_population(group)?.unwrap_or(0),
                extrapolated_population: city.group_extrapolated_population(group)?.unwrap_or(0),
                tax_rate: city.group_tax_rate(group)?.unwrap_or(0.0),
            };
            groups.insert(group, stats);
        }

        Ok(CityRecord {
            mayor_rating: city.mayor_rating()?,
            residential_population: city.population()?,
            commercial_jobs: city.commercial_jobs()?,
            industrial_jobs: city.industrial_jobs()?,
            workforce_percentage: city.workforce_fraction()? * 100.0,
            budget: city.budget()?,
            income: city.income()?,
            city_name,
            mayor_name,
            difficulty,
            tile_size,
            groups,
        })
    }

    pub fn city_name(&self) -> &str {
        &self.city_name
    }

    pub fn mayor_name(&self) -> &str {
        &self.mayor_name
    }

    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    pub fn tile_size(&self) -> &str {
        &self.tile_size
    }

    pub fn mayor_rating(&self) -> i8 {
        self.mayor_rating
    }

    pub fn residential_population(&self) -> i64 {
        self.residential_population
    }

    pub fn commercial_jobs(&self) -> i64 {
        self.commercial_jobs
    }

    pub fn industrial_jobs(&self) -> i64 {
        self.industrial_jobs
    }

    /// Share of the workforce that is employed, already scaled to `0..=100`.
    pub fn workforce_percentage(&self) -> f64 {
        self.workforce_percentage
    }

    pub fn group(&self, group: RciGroup) -> GroupStats {
        self.groups.get(&group).copied().unwrap_or_default()
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn income(&self) -> f64 {
        self.income
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{SnapshotCity, SnapshotGroups};

    fn sample_city() -> SnapshotCity {
        let mut groups = SnapshotGroups::new();
        groups.insert(
            RciGroup::R1,
            GroupStats {
                population: 1000,
                extrapolated_population: 1050,
                tax_rate: 0.09,
            },
        );

        SnapshotCity {
            established: true,
            name: "Lakeside".to_string(),
            mayor: "Ada".to_string(),
            difficulty: 1,
            mayor_rating: 5,
            population: 1000,
            commercial_jobs: 200,
            industrial_jobs: 150,
            workforce_fraction: 0.75,
            budget: 5000.0,
            income: 200.0,
            groups,
        }
    }

    #[test]
    fn test_group_order_matches_report_columns() {
        let tokens: Vec<_> = RciGroup::ALL.iter().map(|g| g.display_token()).collect();
        assert_eq!(
            tokens,
            vec!["R§", "R§§", "R§§§", "Cs§", "Cs§§", "Cs§§§", "Co§§", "Co§§§", "IR", "ID", "IM", "IHT"]
        );
    }

    #[test]
    fn test_from_city_reads_every_field() {
        let record = CityRecord::from_city(&sample_city(), 1).unwrap();

        assert_eq!(record.city_name(), "Lakeside");
        assert_eq!(record.mayor_name(), "Ada");
        assert_eq!(record.difficulty(), "Medium");
        assert_eq!(record.tile_size(), "Medium");
        assert_eq!(record.mayor_rating(), 5);
        assert_eq!(record.residential_population(), 1000);
        assert_eq!(record.commercial_jobs(), 200);
        assert_eq!(record.industrial_jobs(), 150);
        assert_eq!(record.workforce_percentage(), 75.0);
        assert_eq!(record.budget(), 5000.0);
        assert_eq!(record.income(), 200.0);
        assert_eq!(record.group(RciGroup::R1).extrapolated_population, 1050);
    }

    #[test]
    fn test_missing_groups_are_zero() {
        let record = CityRecord::from_city(&sample_city(), 0).unwrap();

        for group in RciGroup::ALL.into_iter().skip(1) {
            assert_eq!(record.group(group), GroupStats::default());
        }
    }

    #[test]
    fn test_unknown_codes_give_empty_strings() {
        let mut city = sample_city();
        city.difficulty = 7;

        let record = CityRecord::from_city(&city, 9).unwrap();

        assert_eq!(record.difficulty(), "");
        assert_eq!(record.tile_size(), "");
    }

    #[test]
    fn test_code_mappings() {
        assert_eq!(Difficulty::from_code(0), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_code(2), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_code(3), None);
        assert_eq!(TileSize::from_code(0), Some(TileSize::Small));
        assert_eq!(TileSize::from_code(2), Some(TileSize::Large));
        assert_eq!(TileSize::from_code(3), None);
    }
}
