use embedded_hal::pwm::SetDutyCycle;

const LEFT_DUTY: u8 = 87; // %
const RIGHT_DUTY: u8 = 81;
const SPIN_DUTY: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Forward,
    SpinLeft,
    SpinRight,
}

/// Applies motion commands to the drivetrain. Re-applying the command that
/// is already in effect must not change anything.
pub trait MotionActuator {
    fn apply(&mut self, cmd: MotionCommand);
}

pub struct Config {
    left_duty: u8,
    right_duty: u8,
    spin_duty: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            left_duty: LEFT_DUTY,
            right_duty: RIGHT_DUTY,
            spin_duty: SPIN_DUTY,
        }
    }
}

impl Config {
    pub fn new(left_duty: u8, right_duty: u8, spin_duty: u8) -> Self {
        Self {
            left_duty: left_duty.min(100),
            right_duty: right_duty.min(100),
            spin_duty: spin_duty.min(100),
        }
    }
}

/// Dual H-bridge, two PWM inputs per wheel (`_1` forward, `_2` backward).
pub struct Motors<P> {
    left_1: P,
    left_2: P,
    right_1: P,
    right_2: P,
    config: Config,
    current: Option<MotionCommand>,
}

impl<P: SetDutyCycle> Motors<P> {
    pub fn init(
        mut left_1: P,
        mut left_2: P,
        mut right_1: P,
        mut right_2: P,
        config: Config,
    ) -> Self {
        for p in [&mut left_1, &mut left_2, &mut right_1, &mut right_2] {
            if p.set_duty_cycle_fully_off().is_err() {
                log::error!("Failed to stop motor channel");
            }
        }
        Self {
            left_1,
            left_2,
            right_1,
            right_2,
            config,
            current: None,
        }
    }

    pub fn current(&self) -> Option<MotionCommand> {
        self.current
    }

    fn set(&mut self, l1: u8, l2: u8, r1: u8, r2: u8) -> Result<(), P::Error> {
        // Release the opposing input first so a wheel never sees both driven.
        if l1 == 0 {
            self.left_1.set_duty_cycle_percent(0)?;
        }
        if l2 == 0 {
            self.left_2.set_duty_cycle_percent(0)?;
        }
        if r1 == 0 {
            self.right_1.set_duty_cycle_percent(0)?;
        }
        if r2 == 0 {
            self.right_2.set_duty_cycle_percent(0)?;
        }
        if l1 > 0 {
            self.left_1.set_duty_cycle_percent(l1)?;
        }
        if l2 > 0 {
            self.left_2.set_duty_cycle_percent(l2)?;
        }
        if r1 > 0 {
            self.right_1.set_duty_cycle_percent(r1)?;
        }
        if r2 > 0 {
            self.right_2.set_duty_cycle_percent(r2)?;
        }
        Ok(())
    }
}

impl<P: SetDutyCycle> MotionActuator for Motors<P> {
    fn apply(&mut self, cmd: MotionCommand) {
        if self.current == Some(cmd) {
            return;
        }

        // Spins keep the left wheel at its forward duty and slow the right one.
        let left = self.config.left_duty;
        let right = self.config.right_duty;
        let spin = self.config.spin_duty;
        let res = match cmd {
            MotionCommand::Forward => self.set(left, 0, right, 0),
            MotionCommand::SpinLeft => self.set(0, left, spin, 0),
            MotionCommand::SpinRight => self.set(left, 0, 0, spin),
        };

        match res {
            Ok(()) => {
                log::debug!("Motors: {:?}", cmd);
                self.current = Some(cmd);
            }
            Err(e) => {
                log::error!("Failed to apply {:?}: {:?}", cmd, e);
                // Unknown output state; the next cycle retries.
                self.current = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embedded_hal::pwm::{ErrorKind, ErrorType};

    #[derive(Default)]
    struct Channel<'a> {
        duty: u16,
        fail: Option<&'a Cell<bool>>,
        writes: Option<&'a Cell<u32>>,
    }

    impl ErrorType for Channel<'_> {
        type Error = ErrorKind;
    }

    impl SetDutyCycle for Channel<'_> {
        fn max_duty_cycle(&self) -> u16 {
            100
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            if self.fail.is_some_and(|f| f.get()) {
                return Err(ErrorKind::Other);
            }
            if let Some(w) = self.writes {
                w.set(w.get() + 1);
            }
            self.duty = duty;
            Ok(())
        }
    }

    fn duties(m: &Motors<Channel<'_>>) -> [u16; 4] {
        [m.left_1.duty, m.left_2.duty, m.right_1.duty, m.right_2.duty]
    }

    fn motors<'a>(writes: &'a Cell<u32>, fail: &'a Cell<bool>) -> Motors<Channel<'a>> {
        let ch = || Channel {
            duty: 0,
            fail: Some(fail),
            writes: Some(writes),
        };
        Motors::init(ch(), ch(), ch(), ch(), Config::new(80, 70, 50))
    }

    #[test]
    fn starts_stopped() {
        let m = Motors::init(
            Channel::default(),
            Channel::default(),
            Channel::default(),
            Channel::default(),
            Config::default(),
        );
        assert_eq!(duties(&m), [0, 0, 0, 0]);
        assert_eq!(m.current(), None);
    }

    #[test]
    fn commands_drive_wheels() {
        let writes = Cell::new(0);
        let fail = Cell::new(false);
        let mut m = motors(&writes, &fail);

        m.apply(MotionCommand::Forward);
        assert_eq!(duties(&m), [80, 0, 70, 0]);
        m.apply(MotionCommand::SpinLeft);
        assert_eq!(duties(&m), [0, 80, 50, 0]);
        m.apply(MotionCommand::SpinRight);
        assert_eq!(duties(&m), [80, 0, 0, 50]);
        assert_eq!(m.current(), Some(MotionCommand::SpinRight));
    }

    #[test]
    fn repeated_command_is_noop() {
        let writes = Cell::new(0);
        let fail = Cell::new(false);
        let mut m = motors(&writes, &fail);

        m.apply(MotionCommand::SpinLeft);
        let state = duties(&m);
        let count = writes.get();
        m.apply(MotionCommand::SpinLeft);
        assert_eq!(duties(&m), state);
        assert_eq!(writes.get(), count);
    }

    #[test]
    fn failure_is_retried() {
        let writes = Cell::new(0);
        let fail = Cell::new(false);
        let mut m = motors(&writes, &fail);

        fail.set(true);
        m.apply(MotionCommand::Forward);
        assert_eq!(m.current(), None);

        fail.set(false);
        m.apply(MotionCommand::Forward);
        assert_eq!(m.current(), Some(MotionCommand::Forward));
        assert_eq!(duties(&m), [80, 0, 70, 0]);
    }
}
