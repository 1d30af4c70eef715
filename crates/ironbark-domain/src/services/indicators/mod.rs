//! Stateless whole-series indicator transforms. Every function returns a
//! series the same length as its input, with `None` for entries where the
//! lookback window is not yet filled; a period of zero or one exceeding the
//! data length therefore yields an all-`None` series, never an error.

pub mod rolling;

use crate::value_objects::bar::Bar;
use rolling::{
    RollingEma, RollingMinMax, RollingMomentum, RollingRoc, RollingSma, RollingStd, WilderAdx,
    WilderAtr, WilderRsi,
};

pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut acc = RollingSma::new(period);
    values.iter().map(|v| acc.update(*v)).collect()
}

pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut acc = RollingEma::new(period);
    values.iter().map(|v| acc.update(*v)).collect()
}

pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut acc = WilderRsi::new(period);
    values.iter().map(|v| acc.update(*v)).collect()
}

#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let mut macd_line = Vec::with_capacity(values.len());
    let mut signal_line = Vec::with_capacity(values.len());
    let mut histogram = Vec::with_capacity(values.len());
    let mut signal_acc = RollingEma::new(signal_period);

    for i in 0..values.len() {
        let line = match (fast_ema[i], slow_ema[i]) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        };
        let sig = line.and_then(|l| signal_acc.update(l));
        histogram.push(match (line, sig) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        });
        macd_line.push(line);
        signal_line.push(sig);
    }

    MacdSeries {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

#[derive(Debug, Clone)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger(values: &[f64], period: usize, num_std: f64) -> BollingerSeries {
    let mut mean_acc = RollingSma::new(period);
    let mut std_acc = RollingStd::new(period);

    let mut upper = Vec::with_capacity(values.len());
    let mut middle = Vec::with_capacity(values.len());
    let mut lower = Vec::with_capacity(values.len());

    for v in values {
        let mean = mean_acc.update(*v);
        let std = std_acc.update(*v);
        match (mean, std) {
            (Some(m), Some(s)) => {
                upper.push(Some(m + num_std * s));
                middle.push(Some(m));
                lower.push(Some(m - num_std * s));
            }
            _ => {
                upper.push(None);
                middle.push(None);
                lower.push(None);
            }
        }
    }

    BollingerSeries {
        upper,
        middle,
        lower,
    }
}

pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut acc = WilderAtr::new(period);
    bars.iter()
        .map(|b| acc.update(b.high, b.low, b.close))
        .collect()
}

#[derive(Debug, Clone)]
pub struct StochasticSeries {
    pub percent_k: Vec<Option<f64>>,
    pub percent_d: Vec<Option<f64>>,
}

pub fn stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> StochasticSeries {
    let mut lows = RollingMinMax::new(k_period);
    let mut highs = RollingMinMax::new(k_period);
    let mut d_acc = RollingSma::new(d_period);

    let mut percent_k = Vec::with_capacity(bars.len());
    let mut percent_d = Vec::with_capacity(bars.len());

    for bar in bars {
        let lowest = lows.update(bar.low).map(|(min, _)| min);
        let highest = highs.update(bar.high).map(|(_, max)| max);
        let k = match (lowest, highest) {
            (Some(ll), Some(hh)) => {
                let range = hh - ll;
                // A flat window has no directional information.
                if range > 0.0 {
                    Some(100.0 * (bar.close - ll) / range)
                } else {
                    Some(50.0)
                }
            }
            _ => None,
        };
        percent_d.push(k.and_then(|k| d_acc.update(k)));
        percent_k.push(k);
    }

    StochasticSeries {
        percent_k,
        percent_d,
    }
}

pub fn adx(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut acc = WilderAdx::new(period);
    bars.iter()
        .map(|b| acc.update(b.high, b.low, b.close))
        .collect()
}

pub fn roc(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut acc = RollingRoc::new(period);
    values.iter().map(|v| acc.update(*v)).collect()
}

pub fn momentum(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut acc = RollingMomentum::new(period);
    values.iter().map(|v| acc.update(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "BHP".to_string(),
            timestamp: 0,
            open: close,
            high,
            low,
            close,
            volume: 1,
        }
    }

    #[test]
    fn sma_of_constant_series_equals_the_price() {
        let out = sma(&[42.0; 6], 3);
        assert_eq!(out[..2], [None, None]);
        assert!(out[2..].iter().all(|v| *v == Some(42.0)));
    }

    #[test]
    fn sma_with_period_beyond_data_is_all_none() {
        assert!(sma(&[1.0, 2.0, 3.0], 5).iter().all(Option::is_none));
        assert!(sma(&[1.0, 2.0, 3.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn ema_matches_hand_computation() {
        let out = ema(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn rsi_approaches_100_on_rising_series() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&prices, 14);
        assert_eq!(out[13], None);
        assert_eq!(out[14], Some(100.0));
        assert_eq!(out[19], Some(100.0));
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let prices: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let out = macd(&prices, 3, 6, 4);
        for i in 0..prices.len() {
            match (out.macd[i], out.signal[i], out.histogram[i]) {
                (Some(l), Some(s), Some(h)) => assert!((h - (l - s)).abs() < 1e-12),
                (_, None, None) => {}
                other => panic!("inconsistent warmup at {}: {:?}", i, other),
            }
        }
        // Signal warms up `signal_period` entries after the MACD line.
        assert!(out.macd[5].is_some());
        assert!(out.signal[7].is_none());
        assert!(out.signal[8].is_some());
    }

    #[test]
    fn bollinger_bands_use_population_std() {
        let out = bollinger(&[1.0, 3.0], 2, 2.0);
        assert_eq!(out.middle[1], Some(2.0));
        assert_eq!(out.upper[1], Some(4.0));
        assert_eq!(out.lower[1], Some(0.0));
    }

    #[test]
    fn atr_includes_gap_from_previous_close() {
        let bars = vec![bar(12.0, 10.0, 11.0), bar(16.0, 15.0, 15.5)];
        // Second TR is max(1, |16-11|, |15-11|) = 5.
        let out = atr(&bars, 2);
        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn stochastic_k_is_position_in_range() {
        let bars = vec![
            bar(10.0, 8.0, 9.0),
            bar(11.0, 9.0, 10.0),
            bar(12.0, 10.0, 12.0),
        ];
        let out = stochastic(&bars, 3, 1);
        // Range over the window is [8, 12]; close 12 sits at the top.
        assert_eq!(out.percent_k[2], Some(100.0));
        assert_eq!(out.percent_d[2], Some(100.0));
    }

    #[test]
    fn adx_rises_in_a_persistent_trend() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 100.0 + 2.0 * i as f64;
                bar(base + 1.0, base - 1.0, base)
            })
            .collect();
        let out = adx(&bars, 5);
        assert!(out[..9].iter().all(Option::is_none));
        let first = out[9].unwrap();
        let last = out[29].unwrap();
        assert!(first > 0.0);
        assert!(last >= first);
        assert!(last <= 100.0);
    }

    #[test]
    fn roc_and_momentum_series() {
        assert_eq!(roc(&[1.0, 2.0, 4.0], 1), vec![None, Some(100.0), Some(100.0)]);
        assert_eq!(
            momentum(&[1.0, 2.0, 4.0], 2),
            vec![None, None, Some(3.0)]
        );
    }
}
