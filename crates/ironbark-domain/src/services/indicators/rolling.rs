//! Ring-buffer indicator accumulators. Each `update` consumes one
//! observation in O(1) and returns `None` until its lookback window fills,
//! so callers never index into a half-warm series.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        self.sum += value;
        if self.buf.len() > self.window {
            if let Some(front) = self.buf.pop_front() {
                self.sum -= front;
            }
        }

        if self.buf.len() == self.window {
            Some(self.sum / self.window as f64)
        } else {
            None
        }
    }
}

/// EMA with alpha = 2 / (period + 1), seeded by the SMA of the first
/// `period` observations.
#[derive(Debug, Clone)]
pub struct RollingEma {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl RollingEma {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }

        match self.value {
            Some(prev) => {
                let next = self.alpha * value + (1.0 - self.alpha) * prev;
                self.value = Some(next);
                Some(next)
            }
            None => {
                self.seed_sum += value;
                self.seen += 1;
                if self.seen == self.period {
                    let seed = self.seed_sum / self.period as f64;
                    self.value = Some(seed);
                    Some(seed)
                } else {
                    None
                }
            }
        }
    }
}

/// Population standard deviation over a fixed window.
#[derive(Debug, Clone)]
pub struct RollingStd {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl RollingStd {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
        if self.buf.len() > self.window {
            if let Some(front) = self.buf.pop_front() {
                self.sum -= front;
                self.sum_sq -= front * front;
            }
        }

        if self.buf.len() == self.window {
            let n = self.window as f64;
            let mean = self.sum / n;
            let var = (self.sum_sq / n) - mean * mean;
            Some(var.max(0.0).sqrt())
        } else {
            None
        }
    }
}

/// Wilder's RSI: the first value averages the first `period` price changes,
/// subsequent values use Wilder smoothing. 100 when the average loss is zero.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    prev_close: Option<f64>,
    changes_seen: usize,
    seed_gain: f64,
    seed_loss: f64,
    avg_gain: f64,
    avg_loss: f64,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            changes_seen: 0,
            seed_gain: 0.0,
            seed_loss: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 {
            self.prev_close = Some(close);
            return None;
        }

        let Some(prev) = self.prev_close else {
            self.prev_close = Some(close);
            return None;
        };
        self.prev_close = Some(close);

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.changes_seen += 1;

        let period = self.period as f64;
        if self.changes_seen < self.period {
            self.seed_gain += gain;
            self.seed_loss += loss;
            return None;
        }
        if self.changes_seen == self.period {
            self.avg_gain = (self.seed_gain + gain) / period;
            self.avg_loss = (self.seed_loss + loss) / period;
        } else {
            self.avg_gain = (self.avg_gain * (period - 1.0) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - 1.0) + loss) / period;
        }

        if self.avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = self.avg_gain / self.avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

/// Wilder-smoothed average true range.
#[derive(Debug, Clone)]
pub struct WilderAtr {
    period: usize,
    prev_close: Option<f64>,
    trs_seen: usize,
    seed: f64,
    value: f64,
}

impl WilderAtr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            trs_seen: 0,
            seed: 0.0,
            value: 0.0,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        if self.period == 0 {
            self.prev_close = Some(close);
            return None;
        }

        let tr = match self.prev_close {
            None => high - low,
            Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
        };
        self.prev_close = Some(close);
        self.trs_seen += 1;

        let period = self.period as f64;
        if self.trs_seen < self.period {
            self.seed += tr;
            return None;
        }
        if self.trs_seen == self.period {
            self.value = (self.seed + tr) / period;
        } else {
            self.value = (self.value * (period - 1.0) + tr) / period;
        }
        Some(self.value)
    }
}

/// Rolling (min, max) of a single series over a fixed window.
#[derive(Debug, Clone)]
pub struct RollingMinMax {
    window: usize,
    buf: VecDeque<f64>,
}

impl RollingMinMax {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<(f64, f64)> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        if self.buf.len() > self.window {
            self.buf.pop_front();
        }
        if self.buf.len() < self.window {
            return None;
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in &self.buf {
            min = min.min(*v);
            max = max.max(*v);
        }
        Some((min, max))
    }
}

/// Average directional index from Wilder-smoothed +DM/-DM and true range.
#[derive(Debug, Clone)]
pub struct WilderAdx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    dms_seen: usize,
    smooth_plus: f64,
    smooth_minus: f64,
    smooth_tr: f64,
    dxs_seen: usize,
    dx_seed: f64,
    adx: f64,
}

impl WilderAdx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            dms_seen: 0,
            smooth_plus: 0.0,
            smooth_minus: 0.0,
            smooth_tr: 0.0,
            dxs_seen: 0,
            dx_seed: 0.0,
            adx: 0.0,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }

        let Some((prev_high, prev_low, prev_close)) = self.prev else {
            self.prev = Some((high, low, close));
            return None;
        };
        self.prev = Some((high, low, close));

        let up = high - prev_high;
        let down = prev_low - low;
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());

        self.dms_seen += 1;
        let period = self.period as f64;
        if self.dms_seen <= self.period {
            self.smooth_plus += plus_dm;
            self.smooth_minus += minus_dm;
            self.smooth_tr += tr;
            if self.dms_seen < self.period {
                return None;
            }
        } else {
            // Wilder smoothed sums.
            self.smooth_plus += plus_dm - self.smooth_plus / period;
            self.smooth_minus += minus_dm - self.smooth_minus / period;
            self.smooth_tr += tr - self.smooth_tr / period;
        }

        let (plus_di, minus_di) = if self.smooth_tr > 0.0 {
            (
                100.0 * self.smooth_plus / self.smooth_tr,
                100.0 * self.smooth_minus / self.smooth_tr,
            )
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        self.dxs_seen += 1;
        if self.dxs_seen < self.period {
            self.dx_seed += dx;
            return None;
        }
        if self.dxs_seen == self.period {
            self.adx = (self.dx_seed + dx) / period;
        } else {
            self.adx = (self.adx * (period - 1.0) + dx) / period;
        }
        Some(self.adx)
    }
}

/// Rate of change over `period` observations, as a percentage.
#[derive(Debug, Clone)]
pub struct RollingRoc {
    period: usize,
    buf: VecDeque<f64>,
}

impl RollingRoc {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            buf: VecDeque::new(),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }

        self.buf.push_back(value);
        if self.buf.len() > self.period + 1 {
            self.buf.pop_front();
        }
        if self.buf.len() < self.period + 1 {
            return None;
        }
        let base = *self.buf.front()?;
        if base == 0.0 {
            return None;
        }
        Some((value - base) / base * 100.0)
    }
}

/// Price difference over `period` observations.
#[derive(Debug, Clone)]
pub struct RollingMomentum {
    period: usize,
    buf: VecDeque<f64>,
}

impl RollingMomentum {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            buf: VecDeque::new(),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }

        self.buf.push_back(value);
        if self.buf.len() > self.period + 1 {
            self.buf.pop_front();
        }
        if self.buf.len() < self.period + 1 {
            return None;
        }
        Some(value - *self.buf.front()?)
    }
}
