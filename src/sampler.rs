use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker, Timer};

use crate::color::{ColorCategory, Thresholds};
use crate::comm::SharedClassification;
use crate::sensor::{ColorSensor, SensorError, SensorSide};

const SAMPLE_PERIOD: u64 = 30; // ms, each side gets 60 ms
const READ_TIMEOUT: u64 = 20; // ms

pub struct Config {
    pub period_ms: u64,
    pub read_timeout_ms: u64,
    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period_ms: SAMPLE_PERIOD,
            read_timeout_ms: READ_TIMEOUT,
            thresholds: Thresholds::default(),
        }
    }
}

/// Reads one side per tick, alternating, and publishes the classification.
pub struct Sampler<S> {
    sensor: S,
    next_side: SensorSide,
    config: Config,
}

impl<S: ColorSensor> Sampler<S> {
    pub fn new(sensor: S, config: Config) -> Self {
        Self {
            sensor,
            next_side: SensorSide::Left,
            config,
        }
    }

    /// One sampler tick. A failed read leaves the published value for that
    /// side untouched and does not raise the "new data" flag.
    pub async fn sample(
        &mut self,
        shared: &SharedClassification,
    ) -> Result<ColorCategory, SensorError> {
        let side = self.next_side;
        self.next_side = side.other();

        let res = match select(
            self.sensor.read_color(side),
            Timer::after(Duration::from_millis(self.config.read_timeout_ms)),
        )
        .await
        {
            Either::First(res) => res,
            Either::Second(_) => Err(SensorError::Timeout),
        };

        match res {
            Ok(sample) => {
                let category = ColorCategory::from_sample(sample, &self.config.thresholds);
                log::trace!("{:?}: {:?} -> {:?}", side, sample, category);
                shared.publish(side, category);
                shared.notify();
                Ok(category)
            }
            Err(e) => {
                log::debug!("{:?} sensor: {}", side, e);
                Err(e)
            }
        }
    }

    pub async fn run(&mut self, shared: &SharedClassification) -> ! {
        log::info!("Starting sampler, period {} ms", self.config.period_ms);
        let mut ticker = Ticker::every(Duration::from_millis(self.config.period_ms));
        loop {
            // Errors are absorbed; the next tick reads the other side.
            let _ = self.sample(shared).await;
            ticker.next().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorSample;
    use embassy_futures::block_on;

    const BLUE: ColorSample = ColorSample::new(50, 60, 90, 300);
    const RED: ColorSample = ColorSample::new(200, 80, 60, 400);

    /// Replays scripted results; `None` never completes.
    struct Scripted<'a> {
        reads: &'a [(SensorSide, Option<Result<ColorSample, SensorError>>)],
        pos: usize,
    }

    impl ColorSensor for Scripted<'_> {
        async fn read_color(&mut self, side: SensorSide) -> Result<ColorSample, SensorError> {
            let (expected, res) = self.reads[self.pos];
            self.pos += 1;
            assert_eq!(side, expected);
            match res {
                Some(res) => res,
                None => core::future::pending().await,
            }
        }
    }

    fn sampler<'a>(
        reads: &'a [(SensorSide, Option<Result<ColorSample, SensorError>>)],
    ) -> Sampler<Scripted<'a>> {
        let config = Config {
            read_timeout_ms: 5,
            ..Config::default()
        };
        Sampler::new(Scripted { reads, pos: 0 }, config)
    }

    #[test]
    fn alternates_and_publishes() {
        let reads = [
            (SensorSide::Left, Some(Ok(BLUE))),
            (SensorSide::Right, Some(Ok(RED))),
            (SensorSide::Left, Some(Ok(RED))),
        ];
        let shared = SharedClassification::new();
        let mut s = sampler(&reads);

        block_on(async {
            assert_eq!(s.sample(&shared).await, Ok(ColorCategory::Blue));
            assert!(shared.take_fresh());
            assert_eq!(s.sample(&shared).await, Ok(ColorCategory::Red));
            assert_eq!(shared.latest(), (ColorCategory::Blue, ColorCategory::Red));
            assert_eq!(s.sample(&shared).await, Ok(ColorCategory::Red));
            assert_eq!(shared.latest(), (ColorCategory::Red, ColorCategory::Red));
        });
    }

    #[test]
    fn failed_read_keeps_previous_value() {
        let reads = [
            (SensorSide::Left, Some(Ok(BLUE))),
            (SensorSide::Right, Some(Err(SensorError::Bus))),
            (SensorSide::Left, Some(Err(SensorError::Bus))),
            (SensorSide::Right, Some(Ok(RED))),
        ];
        let shared = SharedClassification::new();
        let mut s = sampler(&reads);

        block_on(async {
            s.sample(&shared).await.unwrap();
            assert!(shared.take_fresh());

            assert_eq!(s.sample(&shared).await, Err(SensorError::Bus));
            assert_eq!(s.sample(&shared).await, Err(SensorError::Bus));
            assert!(!shared.take_fresh());
            assert_eq!(shared.latest(), (ColorCategory::Blue, ColorCategory::None));

            // Cadence continues after failures.
            s.sample(&shared).await.unwrap();
            assert!(shared.take_fresh());
            assert_eq!(shared.latest(), (ColorCategory::Blue, ColorCategory::Red));
        });
    }

    #[test]
    fn hung_read_times_out() {
        let reads = [
            (SensorSide::Left, None),
            (SensorSide::Right, Some(Ok(BLUE))),
        ];
        let shared = SharedClassification::new();
        let mut s = sampler(&reads);

        block_on(async {
            assert_eq!(s.sample(&shared).await, Err(SensorError::Timeout));
            assert!(!shared.take_fresh());
            assert_eq!(s.sample(&shared).await, Ok(ColorCategory::Blue));
        });
    }

    /// Left bus is dead, right sees red; counts reads per side.
    #[derive(Default)]
    struct HalfBroken {
        left: core::cell::Cell<u32>,
        right: core::cell::Cell<u32>,
    }

    impl ColorSensor for &HalfBroken {
        async fn read_color(&mut self, side: SensorSide) -> Result<ColorSample, SensorError> {
            match side {
                SensorSide::Left => {
                    self.left.set(self.left.get() + 1);
                    Err(SensorError::Bus)
                }
                SensorSide::Right => {
                    self.right.set(self.right.get() + 1);
                    Ok(RED)
                }
            }
        }
    }

    #[test]
    fn run_keeps_cadence_through_failures() {
        let sensor = HalfBroken::default();
        let shared = SharedClassification::new();
        let mut s = Sampler::new(&sensor, Config::default());

        // Ticks at 0, 30, 60 and 90 ms fit in the window.
        let res = block_on(select(s.run(&shared), Timer::after_millis(100)));
        assert!(matches!(res, Either::Second(())));

        let (left, right) = (sensor.left.get(), sensor.right.get());
        assert!((3..=5).contains(&(left + right)), "{} reads", left + right);
        assert!(left >= 1 && right >= 1);
        assert!(left.abs_diff(right) <= 1);
        assert_eq!(shared.latest(), (ColorCategory::None, ColorCategory::Red));
        assert!(shared.take_fresh());
    }
}
