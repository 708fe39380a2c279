use crate::clock::{is_after, Clock};
use crate::color::ColorCategory;
use crate::comm::SharedClassification;
use crate::motors::{MotionActuator, MotionCommand};

const HOLD_WINDOW: u32 = 1500; // ms

pub struct Config {
    /// How long a locked priority suppresses lower ones after escalation.
    pub hold_window_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hold_window_ms: HOLD_WINDOW,
        }
    }
}

/// Highest color seen recently. It only rises, until the hold window
/// passes without a further rise and it decays back to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityLock {
    active: ColorCategory,
    unlock_deadline: u32,
}

impl PriorityLock {
    pub const fn new() -> Self {
        Self {
            active: ColorCategory::None,
            unlock_deadline: 0,
        }
    }

    pub fn active(&self) -> ColorCategory {
        self.active
    }

    pub fn unlock_deadline(&self) -> u32 {
        self.unlock_deadline
    }

    /// Escalates on a strictly higher `observed`, then decays if expired.
    /// Decay runs after escalation so a fresh lock is never dropped at once.
    pub fn update(&mut self, observed: ColorCategory, now: u32, hold_window_ms: u32) {
        if observed > self.active {
            self.active = observed;
            self.unlock_deadline = now.wrapping_add(hold_window_ms);
            log::info!("Priority locked at {:?}", self.active);
        }

        if self.active != ColorCategory::None && is_after(now, self.unlock_deadline) {
            log::debug!("Priority {:?} released", self.active);
            self.active = ColorCategory::None;
        }
    }

    /// Readings below the locked priority count as no color.
    pub fn suppress(&self, raw: ColorCategory) -> ColorCategory {
        if raw >= self.active {
            raw
        } else {
            ColorCategory::None
        }
    }
}

/// Debounced steering decision from a pair of side readings.
pub struct ControlSm {
    lock: PriorityLock,
    config: Config,
}

impl ControlSm {
    pub fn init(config: Config) -> Self {
        Self {
            lock: PriorityLock::new(),
            config,
        }
    }

    pub fn lock(&self) -> &PriorityLock {
        &self.lock
    }

    pub fn process(
        &mut self,
        left: ColorCategory,
        right: ColorCategory,
        now: u32,
    ) -> MotionCommand {
        self.lock.update(left.max(right), now, self.config.hold_window_ms);

        let left = self.lock.suppress(left);
        let right = self.lock.suppress(right);

        if right > left {
            MotionCommand::SpinRight
        } else if left > right {
            MotionCommand::SpinLeft
        } else {
            MotionCommand::Forward
        }
    }
}

/// Consumer side of the pipeline: one decision per fresh classification.
pub struct DecisionLoop<'a, C, A> {
    shared: &'a SharedClassification,
    clock: C,
    actuator: A,
    control: ControlSm,
}

impl<'a, C: Clock, A: MotionActuator> DecisionLoop<'a, C, A> {
    pub fn new(
        shared: &'a SharedClassification,
        clock: C,
        actuator: A,
        config: Config,
    ) -> Self {
        Self {
            shared,
            clock,
            actuator,
            control: ControlSm::init(config),
        }
    }

    pub fn control(&self) -> &ControlSm {
        &self.control
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    fn decide(&mut self) -> MotionCommand {
        let (left, right) = self.shared.latest();
        let now = self.clock.now_ms();
        let cmd = self.control.process(left, right, now);
        log::debug!("{:?}/{:?} -> {:?}", left, right, cmd);
        self.actuator.apply(cmd);
        cmd
    }

    /// Waits for new data, then runs exactly one decision cycle.
    pub async fn step(&mut self) -> MotionCommand {
        self.shared.wait_fresh().await;
        self.decide()
    }

    /// Non-blocking variant of [`Self::step`]; `None` if nothing new arrived.
    pub fn try_step(&mut self) -> Option<MotionCommand> {
        if self.shared.take_fresh() {
            Some(self.decide())
        } else {
            None
        }
    }

    pub async fn run(&mut self) -> ! {
        log::info!("Starting decision loop");
        loop {
            self.step().await;
        }
    }
}
