use smart_leds::RGB;

/// Raw reading of one color sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSample {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub clear: u16,
}

impl ColorSample {
    pub const fn new(red: u16, green: u16, blue: u16, clear: u16) -> Self {
        Self {
            red,
            green,
            blue,
            clear,
        }
    }
}

/// Floor marker color. Declaration order is the priority order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ColorCategory {
    #[default]
    None = 0,
    Blue = 1,
    Red = 2,
    Yellow = 3,
}

const CLEAR_THRESHOLD: u16 = 50;
const YELLOW_RATIO: f32 = 1.5;
const RED_RATIO: f32 = 1.5;
const BLUE_RATIO: f32 = 1.4;

/// Classifier tuning. Ratios are empirical for the markers in use.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Below this clear level there is no marker under the sensor.
    pub min_clear: u16,
    /// Red and green both above `yellow_ratio * blue`.
    pub yellow_ratio: f32,
    /// Red above `red_ratio` times both green and blue.
    pub red_ratio: f32,
    /// Blue above `blue_ratio * red`.
    pub blue_ratio: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_clear: CLEAR_THRESHOLD,
            yellow_ratio: YELLOW_RATIO,
            red_ratio: RED_RATIO,
            blue_ratio: BLUE_RATIO,
        }
    }
}

impl ColorCategory {
    pub fn from_sample(s: ColorSample, t: &Thresholds) -> Self {
        if s.clear < t.min_clear {
            return ColorCategory::None;
        }

        let red = s.red as f32;
        let green = s.green as f32;
        let blue = s.blue as f32;

        if red > blue * t.yellow_ratio && green > blue * t.yellow_ratio {
            ColorCategory::Yellow
        } else if red > green * t.red_ratio && red > blue * t.red_ratio {
            ColorCategory::Red
        } else if blue > red * t.blue_ratio {
            ColorCategory::Blue
        } else {
            ColorCategory::None
        }
    }

    /// Inverse of `as u8`; anything unknown reads as `None`.
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ColorCategory::Blue,
            2 => ColorCategory::Red,
            3 => ColorCategory::Yellow,
            _ => ColorCategory::None,
        }
    }

    pub fn to_rgb(self) -> RGB<u8> {
        match self {
            ColorCategory::None => RGB::new(0, 0, 0),
            ColorCategory::Blue => RGB::new(0, 0, 128),
            ColorCategory::Red => RGB::new(128, 0, 0),
            ColorCategory::Yellow => RGB::new(128, 128, 0),
        }
    }
}
