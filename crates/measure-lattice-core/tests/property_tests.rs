use measure_lattice_core::lattice::paths::{enumerate_paths, total_probability};
use measure_lattice_core::lattice::pricer::{backward_induction, risk_neutral_expectation, OptionContract};
use measure_lattice_core::lattice::risk_neutral::derive_risk_neutral_probability;
use measure_lattice_core::lattice::tree::build_lattice;
use measure_lattice_core::partition::axis::Axis;
use measure_lattice_core::partition::session::PartitionSession;
use measure_lattice_core::EngineConfig;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn session_with(vertical: &[i64], horizontal: &[i64]) -> PartitionSession {
    let mut s = PartitionSession::new(dec!(560), dec!(360), EngineConfig::default()).unwrap();
    for v in vertical {
        s.add_cut(Axis::Vertical, Decimal::from(*v));
    }
    for h in horizontal {
        s.add_cut(Axis::Horizontal, Decimal::from(*h));
    }
    s
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn atom_count_is_product_of_accepted_cuts(
        vertical in prop::collection::vec(0i64..560, 0..8),
        horizontal in prop::collection::vec(0i64..360, 0..8),
    ) {
        let s = session_with(&vertical, &horizontal);
        let nv = s.axis(Axis::Vertical).cuts().len();
        let nh = s.axis(Axis::Horizontal).cuts().len();
        prop_assert_eq!(s.atom_count(), (nv + 1) * (nh + 1));
        prop_assert_eq!(s.atoms().len(), s.atom_count());
    }

    #[test]
    fn accepted_cuts_stay_sorted_and_separated(
        raw in prop::collection::vec(0i64..560, 0..12),
    ) {
        let s = session_with(&raw, &[]);
        let cuts = s.axis(Axis::Vertical).cuts();
        for w in cuts.windows(2) {
            prop_assert!(w[1] - w[0] >= dec!(30));
        }
        for c in cuts {
            prop_assert!(*c > dec!(10) && *c < dec!(550));
            prop_assert_eq!(*c % dec!(10), Decimal::ZERO);
        }
    }

    #[test]
    fn sigma_algebra_is_full_power_set(
        vertical in prop::collection::vec(0i64..560, 0..3),
        horizontal in prop::collection::vec(0i64..360, 0..2),
    ) {
        let s = session_with(&vertical, &horizontal);
        let n = s.atom_count();
        let sigma = s.sigma_algebra().unwrap();
        prop_assert_eq!(sigma.cardinality, 1u64 << n);
        prop_assert_eq!(sigma.elements.len() as u64, sigma.cardinality);
        prop_assert_eq!(sigma.labels().iter().filter(|l| **l == "∅").count(), 1);
        prop_assert_eq!(sigma.labels().iter().filter(|l| **l == "Ω").count(), 1);
    }

    #[test]
    fn move_cut_round_trip_restores_atoms(
        target in 0i64..560,
    ) {
        let mut s = session_with(&[280], &[180]);
        let before = s.atoms();
        let moved = s.move_cut(Axis::Vertical, 0, Decimal::from(target)).unwrap();
        if moved.outcome.is_accepted() {
            let back = s.move_cut(Axis::Vertical, 0, dec!(280)).unwrap();
            prop_assert!(back.outcome.is_accepted());
        }
        prop_assert_eq!(s.atoms(), before);
    }

    #[test]
    fn path_probabilities_sum_to_one(
        steps in 0u32..9,
        p_real_bp in 0i64..=10_000,
        up_bp in 10_100i64..15_000,
        down_bp in 5_000i64..9_900,
        rate_bp in 0i64..90,
    ) {
        let u = Decimal::new(up_bp, 4);
        let d = Decimal::new(down_bp, 4);
        let r = Decimal::new(rate_bp, 4);
        let lattice = build_lattice(dec!(100), u, d, steps).unwrap();
        let measure = derive_risk_neutral_probability(u, d, r, Decimal::ONE).ok();
        let paths = enumerate_paths(&lattice, Decimal::new(p_real_bp, 4), measure.as_ref(), 16).unwrap();

        prop_assert_eq!(paths.len(), 1usize << steps);
        let tol = dec!(0.000000001);
        let real = total_probability(&paths, false).unwrap();
        prop_assert!((real - Decimal::ONE).abs() < tol);
        if measure.is_some() {
            let star = total_probability(&paths, true).unwrap();
            prop_assert!((star - Decimal::ONE).abs() < tol);
        }
    }

    #[test]
    fn node_price_is_closed_form(
        steps in 0u32..10,
        up_bp in 10_100i64..13_000,
        down_bp in 7_000i64..9_900,
    ) {
        let u = Decimal::new(up_bp, 4);
        let d = Decimal::new(down_bp, 4);
        let lattice = build_lattice(dec!(100), u, d, steps).unwrap();
        for t in 0..=steps {
            for i in 0..=t {
                let mut expected = dec!(100);
                for _ in 0..i { expected *= u; }
                for _ in 0..(t - i) { expected *= d; }
                let price = lattice.price(t, i).unwrap();
                prop_assert!((price - expected).abs() < dec!(0.0000001));
            }
        }
    }

    #[test]
    fn induction_matches_path_expectation(
        steps in 1u32..8,
        up_bp in 10_600i64..14_000,
        down_bp in 6_000i64..9_400,
        rate_bp in 0i64..500,
        strike in 60i64..140,
    ) {
        let u = Decimal::new(up_bp, 4);
        let d = Decimal::new(down_bp, 4);
        let r = Decimal::new(rate_bp, 4);
        let lattice = build_lattice(dec!(100), u, d, steps).unwrap();
        let measure = derive_risk_neutral_probability(u, d, r, Decimal::ONE).unwrap();
        let contract = OptionContract::call(Decimal::from(strike));

        let table = backward_induction(&lattice, &contract, &measure).unwrap();
        let paths = enumerate_paths(&lattice, dec!(0.5), Some(&measure), 16).unwrap();
        let direct = risk_neutral_expectation(&paths, &contract, &measure, steps).unwrap();
        prop_assert!((table.option_price - direct).abs() < dec!(0.000001));
    }
}
