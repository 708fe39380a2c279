use core::fmt;

use embassy_time::Timer;
use embedded_hal_async::i2c::I2c;
use tcs3472::{RgbCGain, Tcs3472};

use crate::color::ColorSample;

// 10 cycles of 2.4 ms, about 24 ms per conversion
const INTEGRATION_CYCLES: u16 = 10;
const POWER_ON_DELAY: u64 = 3; // ms

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSide {
    Left,
    Right,
}

impl SensorSide {
    pub fn other(self) -> Self {
        match self {
            SensorSide::Left => SensorSide::Right,
            SensorSide::Right => SensorSide::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    Bus,
    Timeout,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus => write!(f, "sensor bus error"),
            SensorError::Timeout => write!(f, "sensor read timed out"),
        }
    }
}

/// Pair of color sensors addressed by side.
#[allow(async_fn_in_trait)]
pub trait ColorSensor {
    async fn read_color(&mut self, side: SensorSide) -> Result<ColorSample, SensorError>;
}

/// Two TCS3472 chips. They share a fixed address, so each needs its own bus.
pub struct DualTcs3472<L, R> {
    left: Tcs3472<L>,
    right: Tcs3472<R>,
}

impl<L: I2c, R: I2c> DualTcs3472<L, R> {
    pub fn new(left: L, right: R) -> Self {
        Self {
            left: Tcs3472::new(left),
            right: Tcs3472::new(right),
        }
    }

    /// Powers both chips up and starts continuous RGBC conversion.
    pub async fn init(&mut self) -> Result<(), SensorError> {
        let left = setup(&mut self.left).await;
        if left.is_err() {
            log::error!("Left color sensor setup failed");
        }
        let right = setup(&mut self.right).await;
        if right.is_err() {
            log::error!("Right color sensor setup failed");
        }
        left.and(right)
    }
}

async fn setup<I: I2c>(sensor: &mut Tcs3472<I>) -> Result<(), SensorError> {
    sensor
        .set_integration_cycles(INTEGRATION_CYCLES)
        .await
        .map_err(|_| SensorError::Bus)?;
    sensor
        .set_rgbc_gain(RgbCGain::_4x)
        .await
        .map_err(|_| SensorError::Bus)?;
    sensor.enable().await.map_err(|_| SensorError::Bus)?;
    Timer::after_millis(POWER_ON_DELAY).await;
    sensor.enable_rgbc().await.map_err(|_| SensorError::Bus)
}

impl<L: I2c, R: I2c> ColorSensor for DualTcs3472<L, R> {
    async fn read_color(&mut self, side: SensorSide) -> Result<ColorSample, SensorError> {
        let m = match side {
            SensorSide::Left => self
                .left
                .read_all_channels()
                .await
                .map_err(|_| SensorError::Bus)?,
            SensorSide::Right => self
                .right
                .read_all_channels()
                .await
                .map_err(|_| SensorError::Bus)?,
        };

        Ok(ColorSample::new(m.red, m.green, m.blue, m.clear))
    }
}
