use crate::models::{ForecastPoint, Kpis, MonthlyPoint, TrendFit};

// ── KpiCalculator ─────────────────────────────────────────────────────────────

/// Stateless summary statistics over the cleaned values.
pub struct KpiCalculator;

impl KpiCalculator {
    /// Compute total, average, maximum, minimum and count.
    ///
    /// An empty slice yields `total = 0` and `NaN` for the other figures.
    pub fn calculate(values: &[f64]) -> Kpis {
        let total: f64 = values.iter().sum();
        let count = values.len();

        if count == 0 {
            return Kpis {
                total,
                average: f64::NAN,
                maximum: f64::NAN,
                minimum: f64::NAN,
                count,
            };
        }

        let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);

        Kpis {
            total,
            average: total / count as f64,
            maximum,
            minimum,
            count,
        }
    }
}

// ── TrendCalculator ───────────────────────────────────────────────────────────

/// Ordinary least-squares trend over a monthly series.
pub struct TrendCalculator;

impl TrendCalculator {
    /// Fit `y = slope * x + intercept` to `(x, y)` pairs in closed form.
    ///
    /// When `x` has no spread (one point, or all points share an x) the fit is
    /// the horizontal line through the mean of `y`. Returns `None` for an empty
    /// slice.
    pub fn fit(points: &[(f64, f64)]) -> Option<TrendFit> {
        if points.is_empty() {
            return None;
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for &(x, y) in points {
            let dx = x - mean_x;
            sxx += dx * dx;
            sxy += dx * (y - mean_y);
        }

        let (slope, intercept) = if sxx == 0.0 {
            (0.0, mean_y)
        } else {
            let slope = sxy / sxx;
            (slope, mean_y - slope * mean_x)
        };

        let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = points
            .iter()
            .map(|&(x, y)| (y - (slope * x + intercept)).powi(2))
            .sum();
        let r_squared = if ss_tot == 0.0 {
            1.0
        } else {
            1.0 - ss_res / ss_tot
        };

        Some(TrendFit {
            slope,
            intercept,
            r_squared,
            n_points: points.len(),
        })
    }

    /// Fit the monthly series against whole days elapsed since its first month
    /// and attach the in-sample prediction to every month.
    pub fn forecast(monthly: &[MonthlyPoint]) -> (Option<TrendFit>, Vec<ForecastPoint>) {
        let Some(first) = monthly.first() else {
            return (None, Vec::new());
        };

        let days: Vec<i64> = monthly
            .iter()
            .map(|p| (p.month_start - first.month_start).num_days())
            .collect();
        let points: Vec<(f64, f64)> = days
            .iter()
            .zip(monthly)
            .map(|(&d, p)| (d as f64, p.total))
            .collect();

        let Some(fit) = Self::fit(&points) else {
            return (None, Vec::new());
        };

        let forecast = monthly
            .iter()
            .zip(days)
            .map(|(p, d)| ForecastPoint {
                month_start: p.month_start,
                days_elapsed: d,
                total: p.total,
                predicted: fit.predict(d as f64),
            })
            .collect();

        (Some(fit), forecast)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn month(y: i32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn point(y: i32, m: u32, total: f64) -> MonthlyPoint {
        MonthlyPoint {
            month_start: month(y, m),
            total,
            count: 1,
        }
    }

    // ── KpiCalculator ────────────────────────────────────────────────────────

    #[test]
    fn test_kpis_basic() {
        let kpis = KpiCalculator::calculate(&[10.0, 5.0, 7.0]);
        assert_eq!(kpis.total, 22.0);
        assert!((kpis.average - 22.0 / 3.0).abs() < 1e-12);
        assert_eq!(kpis.maximum, 10.0);
        assert_eq!(kpis.minimum, 5.0);
        assert_eq!(kpis.count, 3);
    }

    #[test]
    fn test_kpis_empty_uses_nan_sentinel() {
        let kpis = KpiCalculator::calculate(&[]);
        assert_eq!(kpis.total, 0.0);
        assert!(kpis.average.is_nan());
        assert!(kpis.maximum.is_nan());
        assert!(kpis.minimum.is_nan());
        assert_eq!(kpis.count, 0);
    }

    #[test]
    fn test_kpis_negative_values() {
        let kpis = KpiCalculator::calculate(&[-3.0, -1.5]);
        assert_eq!(kpis.maximum, -1.5);
        assert_eq!(kpis.minimum, -3.0);
        assert_eq!(kpis.total, -4.5);
    }

    // ── TrendCalculator::fit ─────────────────────────────────────────────────

    #[test]
    fn test_fit_empty_is_none() {
        assert!(TrendCalculator::fit(&[]).is_none());
    }

    #[test]
    fn test_fit_single_point_is_horizontal() {
        let fit = TrendCalculator::fit(&[(0.0, 42.5)]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 42.5);
        assert_eq!(fit.predict(0.0), 42.5);
        assert_eq!(fit.n_points, 1);
    }

    #[test]
    fn test_fit_identical_x_uses_mean() {
        let fit = TrendCalculator::fit(&[(5.0, 2.0), (5.0, 4.0)]).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 3.0);
    }

    #[test]
    fn test_fit_recovers_exact_line() {
        let m = 1.75;
        let c = -20.0;
        let points: Vec<(f64, f64)> = [0.0, 31.0, 60.0, 91.0, 121.0]
            .iter()
            .map(|&x| (x, m * x + c))
            .collect();

        let fit = TrendCalculator::fit(&points).unwrap();
        assert!((fit.slope - m).abs() < 1e-9, "slope = {}", fit.slope);
        assert!((fit.intercept - c).abs() < 1e-9, "intercept = {}", fit.intercept);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        for (x, y) in points {
            assert!((fit.predict(x) - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_noisy_data() {
        // Step-shaped data: sxy = 8, sxx = 5.
        let points = [(0.0, 2.0), (1.0, 2.0), (2.0, 6.0), (3.0, 6.0)];
        let fit = TrendCalculator::fit(&points).unwrap();
        assert!((fit.slope - 1.6).abs() < 1e-12);
        assert!((fit.intercept - 1.6).abs() < 1e-12);
        assert!(fit.r_squared > 0.0 && fit.r_squared < 1.0);
    }

    // ── TrendCalculator::forecast ────────────────────────────────────────────

    #[test]
    fn test_forecast_empty() {
        let (fit, forecast) = TrendCalculator::forecast(&[]);
        assert!(fit.is_none());
        assert!(forecast.is_empty());
    }

    #[test]
    fn test_forecast_single_month_round_trips() {
        let (fit, forecast) = TrendCalculator::forecast(&[point(2024, 3, 99.5)]);
        assert!(fit.is_some());
        assert_eq!(forecast.len(), 1);
        assert_eq!(forecast[0].days_elapsed, 0);
        assert_eq!(forecast[0].predicted, 99.5);
    }

    #[test]
    fn test_forecast_uses_elapsed_days() {
        let monthly = vec![point(2024, 1, 15.0), point(2024, 2, 7.0), point(2024, 3, 9.0)];
        let (fit, forecast) = TrendCalculator::forecast(&monthly);
        let fit = fit.unwrap();

        let days: Vec<i64> = forecast.iter().map(|f| f.days_elapsed).collect();
        assert_eq!(days, vec![0, 31, 60]);
        assert_eq!(forecast.len(), monthly.len());
        for f in &forecast {
            assert!((f.predicted - fit.predict(f.days_elapsed as f64)).abs() < 1e-12);
        }
        assert_eq!(forecast[1].total, 7.0);
    }

    #[test]
    fn test_forecast_two_points_pass_through_both() {
        let monthly = vec![point(2024, 1, 15.0), point(2024, 2, 7.0)];
        let (_, forecast) = TrendCalculator::forecast(&monthly);
        assert!((forecast[0].predicted - 15.0).abs() < 1e-9);
        assert!((forecast[1].predicted - 7.0).abs() < 1e-9);
    }
}
