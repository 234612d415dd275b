//! Cost attribute units and conversion to "units per day".
//!
//! Time units convert directly.  Distance units assume a constant travel
//! speed in metres per second, so "metres per day" at 25 m/s is the distance
//! a vehicle covers in a day at that speed.

use std::fmt;
use std::str::FromStr;

use crate::EvcError;

const SECS_PER_DAY: f64 = 86_400.0;

/// Unit of the network's cost attribute.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CostUnit {
    Seconds,
    #[default]
    Minutes,
    Hours,
    Inches,
    Feet,
    Yards,
    Miles,
    Millimeters,
    Centimeters,
    Meters,
    Kilometers,
    Decimeters,
}

impl CostUnit {
    /// How many of this unit fit into one day, travelling at `speed_mps`
    /// metres per second for distance units.
    ///
    /// Every unit has its own branch; there is no fallthrough between them.
    pub fn units_per_day(self, speed_mps: f64) -> f64 {
        match self {
            CostUnit::Seconds     => SECS_PER_DAY,
            CostUnit::Minutes     => 1_440.0,
            CostUnit::Hours       => 24.0,
            CostUnit::Inches      => 39.370_079 * speed_mps * SECS_PER_DAY,
            CostUnit::Feet        => 3.280_84 * speed_mps * SECS_PER_DAY,
            CostUnit::Yards       => 1.093_613 * speed_mps * SECS_PER_DAY,
            CostUnit::Miles       => 0.000_621 * speed_mps * SECS_PER_DAY,
            CostUnit::Millimeters => 1_000.0 * speed_mps * SECS_PER_DAY,
            CostUnit::Centimeters => 100.0 * speed_mps * SECS_PER_DAY,
            CostUnit::Meters      => speed_mps * SECS_PER_DAY,
            CostUnit::Kilometers  => 0.001 * speed_mps * SECS_PER_DAY,
            CostUnit::Decimeters  => 0.1 * speed_mps * SECS_PER_DAY,
        }
    }

    pub fn is_time(self) -> bool {
        matches!(self, CostUnit::Seconds | CostUnit::Minutes | CostUnit::Hours)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CostUnit::Seconds     => "seconds",
            CostUnit::Minutes     => "minutes",
            CostUnit::Hours       => "hours",
            CostUnit::Inches      => "inches",
            CostUnit::Feet        => "feet",
            CostUnit::Yards       => "yards",
            CostUnit::Miles       => "miles",
            CostUnit::Millimeters => "millimeters",
            CostUnit::Centimeters => "centimeters",
            CostUnit::Meters      => "meters",
            CostUnit::Kilometers  => "kilometers",
            CostUnit::Decimeters  => "decimeters",
        }
    }
}

impl fmt::Display for CostUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostUnit {
    type Err = EvcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "seconds" | "s"       => Ok(CostUnit::Seconds),
            "minutes" | "min"     => Ok(CostUnit::Minutes),
            "hours" | "h"         => Ok(CostUnit::Hours),
            "inches" | "in"       => Ok(CostUnit::Inches),
            "feet" | "ft"         => Ok(CostUnit::Feet),
            "yards" | "yd"        => Ok(CostUnit::Yards),
            "miles" | "mi"        => Ok(CostUnit::Miles),
            "millimeters" | "mm"  => Ok(CostUnit::Millimeters),
            "centimeters" | "cm"  => Ok(CostUnit::Centimeters),
            "meters" | "m"        => Ok(CostUnit::Meters),
            "kilometers" | "km"   => Ok(CostUnit::Kilometers),
            "decimeters" | "dm"   => Ok(CostUnit::Decimeters),
            other => Err(EvcError::Parse(format!("unknown cost unit `{other}`"))),
        }
    }
}
