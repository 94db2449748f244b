use proptest::prelude::*;
use reversa_domain::services::backtest::{simulate, BacktestParams, Simulator};
use reversa_domain::services::features::{interpolate_linear, pct_change, rolling_mean};
use reversa_domain::services::signals::SignalConfig;
use reversa_domain::value_objects::observation::Observation;
use reversa_domain::value_objects::signal::SignalValue;
use reversa_domain::value_objects::trade_event::TradeEvent;

fn signal_strategy() -> impl Strategy<Value = SignalValue> {
    prop_oneof![
        (0i64..4).prop_map(SignalValue::Code),
        prop::sample::select(vec!["BUY", "SELL", "HOLD", "??"]).prop_map(|s| SignalValue::label(s)),
    ]
}

fn observations_strategy() -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::vec((0.01f64..10_000.0, signal_strategy()), 0..120).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(idx, (close, signal))| Observation {
                index: format!("row{idx}"),
                close,
                signal,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn cash_never_goes_negative(
        observations in observations_strategy(),
        init_value in 0.0f64..100_000.0,
        three_state in any::<bool>(),
    ) {
        let config = if three_state {
            SignalConfig::buy_hold_sell()
        } else {
            SignalConfig::buy_sell()
        };
        let params = BacktestParams::new(init_value, 1.0, config);
        let mut sim = Simulator::new(&params).expect("valid params");
        for obs in &observations {
            sim.step(obs).expect("valid observation");
            prop_assert!(sim.state().cash_balance().is_finite());
            prop_assert!(sim.state().cash_balance() >= 0.0);
        }
        let outcome = sim.finish();
        prop_assert!(outcome.final_cash >= 0.0);
    }

    #[test]
    fn liquidation_closes_exactly_the_open_position(observations in observations_strategy()) {
        let params = BacktestParams::new(50_000.0, 1.0, SignalConfig::buy_sell());
        let outcome = simulate(&observations, &params).expect("run");

        if observations.is_empty() {
            prop_assert!(outcome.events.is_empty());
            prop_assert_eq!(outcome.roi, 0.0);
        } else {
            let mut held: u64 = 0;
            for event in &outcome.events[..outcome.events.len() - 1] {
                match event {
                    TradeEvent::Buy { shares, .. } => held += shares,
                    TradeEvent::Sell { shares, .. } => {
                        prop_assert_eq!(*shares, held);
                        held = 0;
                    }
                    TradeEvent::Liquidation { .. } => prop_assert!(false, "liquidation before end"),
                }
            }
            match outcome.events.last() {
                Some(TradeEvent::Liquidation { shares, price, cash_balance, .. }) => {
                    prop_assert_eq!(*shares, held);
                    prop_assert_eq!(*price, observations[observations.len() - 1].close);
                    prop_assert_eq!(*cash_balance, outcome.final_cash);
                }
                other => prop_assert!(false, "expected liquidation, got {:?}", other),
            }
        }
    }

    #[test]
    fn simulation_is_deterministic(observations in observations_strategy()) {
        let params = BacktestParams::new(10_000.0, 5.0, SignalConfig::buy_hold_sell());
        let first = simulate(&observations, &params).expect("first");
        let second = simulate(&observations, &params).expect("second");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn derived_features_are_finite_for_positive_prices(prices in prop::collection::vec(0.01f64..10_000.0, 2..80)) {
        let values: Vec<Option<f64>> = prices.iter().copied().map(Some).collect();
        for v in pct_change(&values).into_iter().flatten() {
            prop_assert!(v.is_finite());
        }
        for v in rolling_mean(&values, 5).into_iter().flatten() {
            prop_assert!(v.is_finite());
            prop_assert!(v > 0.0);
        }
    }

    #[test]
    fn interpolation_stays_within_neighbour_bounds(
        raw in prop::collection::vec(prop::option::of(0.0f64..100.0), 1..60)
    ) {
        let mut values = raw.clone();
        interpolate_linear(&mut values);
        let lo = raw.iter().flatten().copied().fold(f64::INFINITY, f64::min);
        let hi = raw.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
        for v in values.iter().flatten() {
            prop_assert!(*v >= lo - 1e-9 && *v <= hi + 1e-9);
        }
        let first_valid = raw.iter().position(|v| v.is_some());
        if let Some(first) = first_valid {
            prop_assert!(values[first..].iter().all(|v| v.is_some()));
            prop_assert!(values[..first].iter().all(|v| v.is_none()));
        }
    }
}
