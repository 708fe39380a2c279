#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{
    i2c,
    interrupt::{software::SoftwareInterruptControl, Priority},
    ledc::{self, channel::ChannelIFace, timer::TimerIFace},
    spi,
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_hal_embassy::InterruptExecutor;
use smart_leds::{SmartLedsWrite, RGB};
use static_cell::StaticCell;
use ws2812_spi::Ws2812;

use colorbot::clock::EmbassyClock;
use colorbot::color::ColorCategory;
use colorbot::comm::CLASSIFICATION;
use colorbot::control::{self, DecisionLoop};
use colorbot::motors::{self, Motors};
use colorbot::sampler::{self, Sampler};
use colorbot::sensor::DualTcs3472;

// Blocking drivers are `Send` and can move into the interrupt executor;
// the task switches them to async mode itself.
type I2cBus = i2c::master::I2c<'static, esp_hal::Blocking>;

const STARTUP_BLINKS: usize = 3;
const BLINK_DELAY: u64 = 100; // ms
const STARTUP_DELAY: u64 = 1000; // ms

static SAMPLER_EXECUTOR: StaticCell<InterruptExecutor<2>> = StaticCell::new();

#[embassy_executor::task]
async fn sampler_task(left: I2cBus, right: I2cBus) {
    let mut sensors = DualTcs3472::new(left.into_async(), right.into_async());
    if sensors.init().await.is_err() {
        // Keep going: failed reads are absorbed and retried every tick.
        log::error!("Color sensors not fully initialized");
    }

    let mut sampler = Sampler::new(sensors, sampler::Config::default());
    sampler.run(&CLASSIFICATION).await
}

fn show<L: SmartLedsWrite<Color = RGB<u8>>>(led: &mut L, color: RGB<u8>) {
    if led.write([color]).is_err() {
        log::error!("Failed to update status LED");
    }
}

#[esp_hal_embassy::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timg0.timer0);

    let spi = spi::master::Spi::new(
        peripherals.SPI2,
        spi::master::Config::default()
            .with_frequency(Rate::from_khz(3800))
            .with_mode(spi::Mode::_0),
    )
    .unwrap()
    .with_mosi(peripherals.GPIO48)
    .into_async();

    let mut led = Ws2812::new(spi);

    // Right sensor on the first controller, left on the second
    let right_i2c = i2c::master::I2c::new(
        peripherals.I2C0,
        i2c::master::Config::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO8)
    .with_scl(peripherals.GPIO9);

    let left_i2c = i2c::master::I2c::new(
        peripherals.I2C1,
        i2c::master::Config::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO4)
    .with_scl(peripherals.GPIO5);

    let mut ledc = ledc::Ledc::new(peripherals.LEDC);
    ledc.set_global_slow_clock(ledc::LSGlobalClkSource::APBClk);
    let mut lstimer0 = ledc.timer::<ledc::LowSpeed>(ledc::timer::Number::Timer0);
    lstimer0
        .configure(ledc::timer::config::Config {
            duty: ledc::timer::config::Duty::Duty7Bit,
            clock_source: ledc::timer::LSClockSource::APBClk,
            frequency: Rate::from_khz(24),
        })
        .unwrap();

    let mut lstimer1 = ledc.timer::<ledc::LowSpeed>(ledc::timer::Number::Timer1);
    lstimer1
        .configure(ledc::timer::config::Config {
            duty: ledc::timer::config::Duty::Duty7Bit,
            clock_source: ledc::timer::LSClockSource::APBClk,
            frequency: Rate::from_khz(24),
        })
        .unwrap();

    let mut mot1_1 = ledc.channel(ledc::channel::Number::Channel0, peripherals.GPIO10);
    mot1_1
        .configure(ledc::channel::config::Config {
            timer: &lstimer0,
            duty_pct: 0,
            pin_config: ledc::channel::config::PinConfig::PushPull,
        })
        .unwrap();
    let mut mot1_2 = ledc.channel(ledc::channel::Number::Channel1, peripherals.GPIO11);
    mot1_2
        .configure(ledc::channel::config::Config {
            timer: &lstimer0,
            duty_pct: 0,
            pin_config: ledc::channel::config::PinConfig::PushPull,
        })
        .unwrap();
    let mut mot2_1 = ledc.channel(ledc::channel::Number::Channel2, peripherals.GPIO12);
    mot2_1
        .configure(ledc::channel::config::Config {
            timer: &lstimer1,
            duty_pct: 0,
            pin_config: ledc::channel::config::PinConfig::PushPull,
        })
        .unwrap();
    let mut mot2_2 = ledc.channel(ledc::channel::Number::Channel3, peripherals.GPIO13);
    mot2_2
        .configure(ledc::channel::config::Config {
            timer: &lstimer1,
            duty_pct: 0,
            pin_config: ledc::channel::config::PinConfig::PushPull,
        })
        .unwrap();

    let motors = Motors::init(mot1_1, mot1_2, mot2_1, mot2_2, motors::Config::default());

    for _ in 0..STARTUP_BLINKS {
        show(&mut led, RGB::new(0, 64, 0));
        Timer::after(Duration::from_millis(BLINK_DELAY)).await;
        show(&mut led, RGB::new(0, 0, 0));
        Timer::after(Duration::from_millis(BLINK_DELAY)).await;
    }
    Timer::after(Duration::from_millis(STARTUP_DELAY)).await;

    // Sampling must not be delayed by the decision loop
    let sw_ints = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    let executor =
        SAMPLER_EXECUTOR.init(InterruptExecutor::new(sw_ints.software_interrupt2));
    let spawner = executor.start(Priority::Priority3);
    spawner.spawn(sampler_task(left_i2c, right_i2c)).unwrap();

    let mut decision = DecisionLoop::new(
        &CLASSIFICATION,
        EmbassyClock,
        motors,
        control::Config::default(),
    );

    log::info!("Starting main loop");
    let mut shown = ColorCategory::None;
    loop {
        decision.step().await;

        let active = decision.control().lock().active();
        if active != shown {
            show(&mut led, active.to_rgb());
            shown = active;
        }
    }
}
