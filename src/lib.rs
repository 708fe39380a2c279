//! Color marker follower.
//!
//! Two color sensors look at the floor, one per side. A periodic sampler
//! reads them alternately and publishes the classified color per side; the
//! decision loop turns those readings into a debounced steering command:
//! turn toward the side with the higher priority color, otherwise drive
//! forward. Priority is Yellow > Red > Blue > none.
//!
//! Hardware is reached only through [`sensor::ColorSensor`],
//! [`clock::Clock`] and [`motors::MotionActuator`], so the whole pipeline
//! runs on the host in tests.

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod color;
pub mod comm;
pub mod control;
pub mod motors;
pub mod sampler;
pub mod sensor;
