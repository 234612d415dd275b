//! Unit tests for evc-core primitives.

#[cfg(test)]
mod ids {
    use crate::{Direction, EdgeId, EdgeKey, EvacueeId, VertexId};

    #[test]
    fn index_roundtrip() {
        let id = VertexId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(VertexId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(VertexId::INVALID.0, u32::MAX);
        assert_eq!(EdgeId::INVALID.0, u32::MAX);
        assert_eq!(EvacueeId::default(), EvacueeId::INVALID);
        assert!(!EdgeId::INVALID.is_valid());
    }

    #[test]
    fn display() {
        assert_eq!(EdgeId(7).to_string(), "EdgeId(7)");
        assert_eq!(EdgeKey::against(EdgeId(3)).to_string(), "EdgeId(3)/Against");
    }

    #[test]
    fn reverse_is_involution() {
        let k = EdgeKey::along(EdgeId(5));
        assert_eq!(k.reverse().dir, Direction::Against);
        assert_eq!(k.reverse().reverse(), k);
        assert_ne!(Direction::Along.bit(), Direction::Against.bit());
    }
}

#[cfg(test)]
mod units {
    use crate::CostUnit;

    #[test]
    fn time_units_ignore_speed() {
        assert_eq!(CostUnit::Seconds.units_per_day(25.0), 86_400.0);
        assert_eq!(CostUnit::Minutes.units_per_day(0.0), 1_440.0);
        assert_eq!(CostUnit::Hours.units_per_day(99.0), 24.0);
    }

    #[test]
    fn distance_units_scale_with_speed() {
        let m = CostUnit::Meters.units_per_day(25.0);
        assert_eq!(m, 25.0 * 86_400.0);
        assert!((CostUnit::Kilometers.units_per_day(25.0) - m / 1000.0).abs() < 1e-6);
        assert!((CostUnit::Centimeters.units_per_day(25.0) - m * 100.0).abs() < 1e-3);
        assert!((CostUnit::Decimeters.units_per_day(25.0) - m * 10.0).abs() < 1e-3);
        assert!((CostUnit::Millimeters.units_per_day(25.0) - m * 1000.0).abs() < 1e-3);
    }

    #[test]
    fn imperial_units_have_their_own_factor() {
        let m = CostUnit::Meters.units_per_day(1.0);
        assert!((CostUnit::Feet.units_per_day(1.0) / m - 3.28084).abs() < 1e-9);
        assert!((CostUnit::Yards.units_per_day(1.0) / m - 1.093613).abs() < 1e-9);
        assert!((CostUnit::Inches.units_per_day(1.0) / m - 39.370079).abs() < 1e-9);
        assert!((CostUnit::Miles.units_per_day(1.0) / m - 0.000621).abs() < 1e-12);
    }

    #[test]
    fn parse() {
        assert_eq!("Minutes".parse::<CostUnit>().unwrap(), CostUnit::Minutes);
        assert_eq!("km".parse::<CostUnit>().unwrap(), CostUnit::Kilometers);
        assert!("parsecs".parse::<CostUnit>().is_err());
        assert!(CostUnit::Hours.is_time());
        assert!(!CostUnit::Feet.is_time());
    }
}

#[cfg(test)]
mod config {
    use crate::{CarmaSort, CostUnit, SolverConfig, SolverMethod, TrafficModelKind};

    #[test]
    fn defaults() {
        let c = SolverConfig::default();
        assert_eq!(c.solver_method, SolverMethod::Casper);
        assert_eq!(c.traffic_model, TrafficModelKind::Exponential);
        assert_eq!(c.critical_density_per_capacity, 20.0);
        assert_eq!(c.saturation_density_per_capacity, 500.0);
        assert!(c.two_way_share_capacity);
        assert!(!c.separable_evacuee);
        assert_eq!(c.initial_delay_cost_per_population, 0.01);
        assert_eq!(c.carma_performance_ratio, 0.1);
        assert_eq!(c.carma_sort, CarmaSort::BwCont);
        assert_eq!(c.max_refinement_passes, 3);
        assert_eq!(c.cost_unit, CostUnit::Minutes);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let neg = SolverConfig { critical_density_per_capacity: -1.0, ..Default::default() };
        assert!(neg.validate().is_err());

        let nan = SolverConfig { saturation_density_per_capacity: f64::NAN, ..Default::default() };
        assert!(nan.validate().is_err());

        let ratio = SolverConfig { carma_performance_ratio: 1.5, ..Default::default() };
        assert!(ratio.validate().is_err());

        let delay = SolverConfig { initial_delay_cost_per_population: -0.1, ..Default::default() };
        assert!(delay.validate().is_err());
    }

    #[test]
    fn saturation_below_critical_is_accepted() {
        let c = SolverConfig {
            critical_density_per_capacity:   10.0,
            saturation_density_per_capacity: 5.0,
            ..Default::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn continuous_sorts() {
        assert!(CarmaSort::BwCont.is_continuous());
        assert!(CarmaSort::FwCont.is_continuous());
        assert!(!CarmaSort::BwSingle.is_continuous());
        assert!(!CarmaSort::None.is_continuous());
    }

    #[test]
    fn parse_enums() {
        assert_eq!("ccrp".parse::<SolverMethod>().unwrap(), SolverMethod::Ccrp);
        assert_eq!("SP".parse::<SolverMethod>().unwrap(), SolverMethod::ShortestPath);
        assert_eq!("power".parse::<TrafficModelKind>().unwrap(), TrafficModelKind::Power);
        assert_eq!("BwSingle".parse::<CarmaSort>().unwrap(), CarmaSort::BwSingle);
    }
}

#[cfg(test)]
mod cancel {
    use crate::CancelToken;

    #[test]
    fn clones_share_the_flag() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
        b.reset();
        assert!(!a.is_cancelled());
    }
}
