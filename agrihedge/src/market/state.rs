use chrono::{Duration, NaiveDate};
use rand::Rng;

use crate::config::MarketConfig;
use crate::error::{Error, Result};
use crate::PricePoint;

/// Round half up, so 0.5 goes to 1 and -0.5 goes to 0
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

fn offset_day(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

/// Price state of the simulated market
///
/// The history is always the historical segment (oldest first, at most
/// `max_history` points) followed by exactly `forecast_days` forecast points.
/// `current_price` is the price of the last historical point.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketState {
    config: MarketConfig,
    current_price: i64,
    history: Vec<PricePoint>,
}

impl MarketState {
    /// Synthetic start-up history ending today, plus a forecast tail
    pub fn initialize<R: Rng + ?Sized>(config: MarketConfig, today: NaiveDate, rng: &mut R) -> Self {
        let days = config.history_days as i64;
        let mut history = Vec::with_capacity(config.history_days + config.forecast_days);
        for back in (0..days).rev() {
            let noise = (rng.gen::<f64>() - 0.5) * 2.0 * config.initial_spread;
            let price = round_half_up(config.base_price as f64 + noise);
            history.push(PricePoint::historical(offset_day(today, -back), price));
        }
        // history_days > 0 is enforced by MarketConfig::validate
        let current_price = history.last().map_or(config.base_price, |p| p.price);

        let mut state = MarketState {
            config,
            current_price,
            history,
        };
        state.regenerate_forecast(today, rng);
        state
    }

    /// Rebuild a state from an existing historical segment
    ///
    /// Forecast points in the input are ignored, the oldest points beyond the
    /// cap are dropped, and a fresh forecast follows the last historical day.
    pub fn resume<R: Rng + ?Sized>(
        config: MarketConfig,
        points: Vec<PricePoint>,
        rng: &mut R,
    ) -> Result<Self> {
        let mut history: Vec<PricePoint> = points.into_iter().filter(|p| !p.is_forecast).collect();
        if history.windows(2).any(|w| w[1].date < w[0].date) {
            return Err(Error::History("historical points are not in date order".into()));
        }
        let Some(last) = history.last().copied() else {
            return Err(Error::History("no historical points".into()));
        };
        if history.len() > config.max_history {
            let excess = history.len() - config.max_history;
            history.drain(..excess);
        }

        let mut state = MarketState {
            config,
            current_price: last.price,
            history,
        };
        state.regenerate_forecast(last.date, rng);
        Ok(state)
    }

    /// One market tick: move the price, record it for `today`, roll the window
    /// and regenerate the forecast. Returns the new current price.
    ///
    /// A `today` earlier than the last historical day (a clock behind a
    /// resumed history) records the tick on that last day instead.
    pub fn advance<R: Rng + ?Sized>(&mut self, today: NaiveDate, rng: &mut R) -> i64 {
        let date = self.historical().last().map_or(today, |last| last.date.max(today));
        let delta = (rng.gen::<f64>() - 0.5) * 2.0 * self.config.tick_amplitude;
        self.current_price = round_half_up(self.current_price as f64 + delta);

        self.history.retain(|p| !p.is_forecast);
        // same-day ticks each get their own point
        self.history
            .push(PricePoint::historical(date, self.current_price));
        if self.history.len() > self.config.max_history {
            self.history.remove(0);
        }

        self.regenerate_forecast(date, rng);
        self.current_price
    }

    fn regenerate_forecast<R: Rng + ?Sized>(&mut self, from: NaiveDate, rng: &mut R) {
        let mut price = self.current_price;
        for ahead in 1..=self.config.forecast_days as i64 {
            let step = (rng.gen::<f64>() - self.config.forecast_bias) * self.config.forecast_scale;
            price = round_half_up(price as f64 + step);
            self.history
                .push(PricePoint::forecast(offset_day(from, ahead), price));
        }
    }

    pub fn current_price(&self) -> i64 {
        self.current_price
    }

    /// Historical then forecast points
    pub fn history(&self) -> &[PricePoint] {
        &self.history
    }

    pub fn historical(&self) -> &[PricePoint] {
        crate::split_segments(&self.history).0
    }

    pub fn forecast(&self) -> &[PricePoint] {
        crate::split_segments(&self.history).1
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }
}
