//! A single axis of the ESP-301.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use labdriver::{
    InstrumentError, InstrumentInterface,
    units::{Unitful, fmt_decimal},
    wait::poll_until,
};
use measurements::{Current, Voltage};

use crate::{
    Core, HomeSearchMode, MICROSTEP_FACTOR, TORQUE_REDUCTION_PERCENT, TORQUE_REDUCTION_TIME,
    build_command,
    units::{AxisQuantity, AxisReading, AxisUnit},
};

/// Parse the response of `SN?` into a unit.
pub(crate) fn parse_unit(resp: &str) -> Result<AxisUnit, InstrumentError> {
    let code = resp
        .trim()
        .parse::<u8>()
        .map_err(|_| InstrumentError::ResponseParseError(resp.to_string()))?;
    AxisUnit::from_code(code).map_err(|_| InstrumentError::ResponseParseError(resp.to_string()))
}

/// Settings to configure an axis for a DC servo motor with [`Axis::setup_servo`].
///
/// Only the settings that are `Some` are sent. Positions, velocities, and accelerations are
/// interpreted in the unit of the axis, which is `units` if given and the current unit
/// otherwise.
///
/// ```
/// use newport_esp301::{AxisUnit, ServoConfig};
///
/// let config = ServoConfig {
///     units: Some(AxisUnit::Millimeter),
///     max_velocity: Some(2.0.into()),
///     proportional_gain: Some(0.5),
///     ..Default::default()
/// };
/// # let _ = config;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServoConfig {
    /// Feedback configuration (`ZB`).
    pub feedback_configuration: Option<u32>,
    /// Full step resolution (`FR`).
    pub full_step_resolution: Option<AxisQuantity>,
    /// Position display resolution (`FP`).
    pub position_display_resolution: Option<u32>,
    /// Maximum motor current (`QI`).
    pub current: Option<Unitful<Current>>,
    /// Motor voltage (`QV`).
    pub voltage: Option<Unitful<Voltage>>,
    /// Unit of the axis (`SN`).
    pub units: Option<AxisUnit>,
    /// Value of one encoder count (`SU`).
    pub encoder_resolution: Option<AxisQuantity>,
    /// Maximum velocity (`VU`).
    pub max_velocity: Option<AxisQuantity>,
    /// Working velocity (`VA`).
    pub max_working_velocity: Option<AxisQuantity>,
    /// Homing velocity (`OH`).
    pub homing_velocity: Option<AxisQuantity>,
    /// Jog high speed (`JH`).
    pub jog_high_velocity: Option<AxisQuantity>,
    /// Jog low speed (`JW`).
    pub jog_low_velocity: Option<AxisQuantity>,
    /// Maximum base velocity for stepper motors (`VB`).
    pub max_base_velocity: Option<AxisQuantity>,
    /// Maximum acceleration and deceleration (`AU`).
    pub max_acceleration: Option<AxisQuantity>,
    /// Acceleration (`AC`).
    pub acceleration: Option<AxisQuantity>,
    /// Deceleration (`AG`).
    pub deceleration: Option<AxisQuantity>,
    /// Emergency stop deceleration (`AE`).
    pub estop_deceleration: Option<AxisQuantity>,
    /// Jerk (`JK`).
    pub jerk: Option<AxisQuantity>,
    /// Following error threshold (`FE`).
    pub error_threshold: Option<AxisQuantity>,
    /// Proportional gain of the PID loop (`KP`).
    pub proportional_gain: Option<f64>,
    /// Derivative gain of the PID loop (`KD`).
    pub derivative_gain: Option<f64>,
    /// Integral gain of the PID loop (`KI`).
    pub integral_gain: Option<f64>,
    /// Integral saturation gain of the PID loop (`KS`).
    pub integral_saturation_gain: Option<f64>,
    /// Home position (`DH`).
    pub home: Option<AxisQuantity>,
    /// Microstep factor, 1 to 250 (`QS`).
    pub microstep_factor: Option<u8>,
    /// Acceleration feed forward gain, its absolute value is sent (`AF`).
    pub acceleration_feed_forward: Option<f64>,
    /// Trajectory mode (`TJ`).
    pub trajectory: Option<u8>,
    /// Hardware limit configuration (`ZH`).
    pub hardware_limit_configuration: Option<u32>,
    /// Reduce the motor torque after the given time (up to 60 s) to the given percentage (`QR`).
    pub reduce_motor_torque: Option<(Duration, u8)>,
}

/// A handle to one axis of the ESP-301, created with [`crate::Esp301::get_axis`].
///
/// Handles of the same axis share the unit the axis is configured in.
pub struct Axis<T: InstrumentInterface> {
    idx: usize,
    core: Arc<Mutex<Core<T>>>,
    unit: Arc<Mutex<AxisUnit>>,
}

impl<T: InstrumentInterface> Axis<T> {
    pub(crate) fn new(idx: usize, core: Arc<Mutex<Core<T>>>, unit: Arc<Mutex<AxisUnit>>) -> Self {
        Axis { idx, core, unit }
    }

    /// The id of the axis on the controller (1-based).
    pub fn get_axis_id(&self) -> usize {
        self.idx + 1
    }

    /// The unit the axis is configured in, as cached by the driver.
    pub fn unit(&self) -> AxisUnit {
        *self.unit.lock().expect("Mutex should not be poisoned")
    }

    /// Query whether the motion of the axis is done (`MD?`).
    pub fn is_motion_done(&mut self) -> Result<bool, InstrumentError> {
        let resp = self.query("MD?")?;
        match resp.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(InstrumentError::ResponseParseError(resp)),
        }
    }

    /// Get the acceleration in units/s^2 (`AC?`).
    pub fn get_acceleration(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("AC?")
    }

    /// Set the acceleration (`AC`).
    pub fn set_acceleration(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("AC", value.into(), 2)
    }

    /// Get the deceleration in units/s^2 (`AG?`).
    pub fn get_deceleration(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("AG?")
    }

    /// Set the deceleration (`AG`).
    pub fn set_deceleration(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("AG", value.into(), 2)
    }

    /// Get the deceleration that is used for an emergency stop, in units/s^2 (`AE?`).
    pub fn get_estop_deceleration(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("AE?")
    }

    /// Set the deceleration that is used for an emergency stop (`AE`).
    pub fn set_estop_deceleration(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("AE", value.into(), 2)
    }

    /// Get the jerk in units/s^3 (`JK?`).
    pub fn get_jerk(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("JK?")
    }

    /// Set the jerk in units/s^3 (`JK`).
    pub fn set_jerk(&mut self, value: impl Into<AxisQuantity>) -> Result<(), InstrumentError> {
        self.set_quantity("JK", value.into(), 3)
    }

    /// Get the velocity in units/s (`VA?`).
    pub fn get_velocity(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("VA?")
    }

    /// Set the velocity (`VA`).
    pub fn set_velocity(&mut self, value: impl Into<AxisQuantity>) -> Result<(), InstrumentError> {
        self.set_quantity("VA", value.into(), 1)
    }

    /// Get the maximum velocity in units/s (`VU?`).
    pub fn get_max_velocity(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("VU?")
    }

    /// Set the maximum velocity (`VU`).
    pub fn set_max_velocity(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("VU", value.into(), 1)
    }

    /// Get the maximum base velocity of a stepper motor in units/s (`VB?`).
    pub fn get_max_base_velocity(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("VB?")
    }

    /// Set the maximum base velocity of a stepper motor (`VB`).
    pub fn set_max_base_velocity(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("VB", value.into(), 1)
    }

    /// Get the maximum acceleration in units/s^2 (`AU?`).
    pub fn get_max_acceleration(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("AU?")
    }

    /// Set the maximum acceleration (`AU`). This also sets the maximum deceleration.
    pub fn set_max_acceleration(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("AU", value.into(), 2)
    }

    /// Get the maximum deceleration. The controller uses the maximum acceleration (`AU?`).
    pub fn get_max_deceleration(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_max_acceleration()
    }

    /// Set the maximum deceleration. This also sets the maximum acceleration (`AU`).
    pub fn set_max_deceleration(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_max_acceleration(value)
    }

    /// Get the actual position (`TP?`).
    pub fn get_position(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("TP?")
    }

    /// Get the position the axis is commanded to be at right now (`DP?`).
    pub fn get_desired_position(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("DP?")
    }

    /// Get the velocity the axis is commanded to move with right now, in units/s (`DV?`).
    pub fn get_desired_velocity(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("DV?")
    }

    /// Get the home position (`DH?`).
    pub fn get_home(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("DH?")
    }

    /// Define the current position as the given home position (`DH`).
    pub fn set_home(&mut self, value: impl Into<AxisQuantity>) -> Result<(), InstrumentError> {
        self.set_quantity("DH", value.into(), 0)
    }

    /// Query the unit of the axis (`SN?`) and update the cached unit.
    pub fn get_units(&mut self) -> Result<AxisUnit, InstrumentError> {
        let unit = parse_unit(&self.query("SN?")?)?;
        *self.unit.lock().expect("Mutex should not be poisoned") = unit;
        Ok(unit)
    }

    /// Set the unit of the axis (`SN`).
    pub fn set_units(&mut self, unit: AxisUnit) -> Result<(), InstrumentError> {
        self.cmd("SN", &[unit.code().to_string()])?;
        *self.unit.lock().expect("Mutex should not be poisoned") = unit;
        Ok(())
    }

    /// Get the value of one encoder count (`SU?`).
    pub fn get_encoder_resolution(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("SU?")
    }

    /// Set the value of one encoder count (`SU`).
    pub fn set_encoder_resolution(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("SU", value.into(), 0)
    }

    /// Get the left software travel limit (`SL?`).
    pub fn get_left_limit(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("SL?")
    }

    /// Set the left software travel limit (`SL`).
    pub fn set_left_limit(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("SL", value.into(), 0)
    }

    /// Get the right software travel limit (`SR?`).
    pub fn get_right_limit(&mut self) -> Result<AxisReading, InstrumentError> {
        self.get_reading("SR?")
    }

    /// Set the right software travel limit (`SR`).
    pub fn set_right_limit(
        &mut self,
        value: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("SR", value.into(), 0)
    }

    /// Switch the motor power on (`MO`) or off (`MF`).
    pub fn set_motor_power(&mut self, on: bool) -> Result<(), InstrumentError> {
        self.cmd(if on { "MO" } else { "MF" }, &[])
    }

    /// Search for the home position of this axis (`OR`).
    pub fn search_for_home(&mut self, mode: HomeSearchMode) -> Result<(), InstrumentError> {
        self.cmd("OR", &[mode.code().to_string()])
    }

    /// Move to a position.
    ///
    /// If `absolute` is set, the axis moves to `position` (`PA`). Otherwise, it moves by
    /// `position` relative to where it is now (`PR`).
    pub fn move_to(
        &mut self,
        position: impl Into<AxisQuantity>,
        absolute: bool,
    ) -> Result<(), InstrumentError> {
        let cmd = if absolute { "PA" } else { "PR" };
        self.set_quantity(cmd, position.into(), 0)
    }

    /// Let the controller wait for the axis to stop before it executes the next command (`WS`).
    pub fn wait_for_stop(&mut self) -> Result<(), InstrumentError> {
        self.cmd("WS", &[])
    }

    /// Stop the motion of the axis (`ST`).
    pub fn stop_motion(&mut self) -> Result<(), InstrumentError> {
        self.cmd("ST", &[])
    }

    /// Let the controller wait for the axis to reach a position before it executes the next
    /// command (`WP`).
    pub fn wait_for_position(
        &mut self,
        position: impl Into<AxisQuantity>,
    ) -> Result<(), InstrumentError> {
        self.set_quantity("WP", position.into(), 0)
    }

    /// Block until the motion of the axis is done.
    ///
    /// The controller is polled with `MD?` every `poll_interval`. With `max_wait` set, an
    /// [`InstrumentError::Timeout`] is returned if the motion is not done in time.
    pub fn wait_for_motion(
        &mut self,
        poll_interval: Duration,
        max_wait: Option<Duration>,
    ) -> Result<(), InstrumentError> {
        poll_until(poll_interval, max_wait, || self.is_motion_done())
    }

    /// Configure the axis for a DC servo motor.
    ///
    /// All settings are validated first and then sent as one bulk command, together with the
    /// motor type (`QM1`), an update of the filter (`UF`) and the motor driver (`QD`), and a save
    /// of the settings to memory (`SM`). If any setting is invalid, nothing is sent.
    pub fn setup_servo(&mut self, config: &ServoConfig) -> Result<(), InstrumentError> {
        let unit = config.units.unwrap_or_else(|| self.unit());
        let target = Some(self.get_axis_id());
        let mut cmds: Vec<String> = Vec::new();
        let mut push = |cmd: &str, params: Vec<String>| {
            cmds.push(build_command(target, cmd, &params));
        };
        let native = |value: &AxisQuantity, per_second: u8| -> Result<Vec<String>, InstrumentError> {
            Ok(vec![fmt_decimal(value.to_native(unit, per_second)?)])
        };

        push("QM", vec!["1".to_string()]);
        if let Some(feedback) = config.feedback_configuration {
            push("ZB", vec![feedback.to_string()]);
        }
        if let Some(res) = &config.full_step_resolution {
            push("FR", native(res, 0)?);
        }
        if let Some(res) = config.position_display_resolution {
            push("FP", vec![res.to_string()]);
        }
        if let Some(current) = &config.current {
            push("QI", vec![fmt_decimal(current.finite()?)]);
        }
        if let Some(voltage) = &config.voltage {
            push("QV", vec![fmt_decimal(voltage.finite()?)]);
        }
        if let Some(units) = config.units {
            push("SN", vec![units.code().to_string()]);
        }
        let quantities: [(&str, &Option<AxisQuantity>, u8); 13] = [
            ("SU", &config.encoder_resolution, 0),
            ("VU", &config.max_velocity, 1),
            ("VA", &config.max_working_velocity, 1),
            ("OH", &config.homing_velocity, 1),
            ("JH", &config.jog_high_velocity, 1),
            ("JW", &config.jog_low_velocity, 1),
            ("VB", &config.max_base_velocity, 1),
            ("AU", &config.max_acceleration, 2),
            ("AC", &config.acceleration, 2),
            ("AG", &config.deceleration, 2),
            ("AE", &config.estop_deceleration, 2),
            ("JK", &config.jerk, 3),
            ("FE", &config.error_threshold, 0),
        ];
        for &(cmd, value, per_second) in &quantities {
            if let Some(value) = value {
                push(cmd, native(value, per_second)?);
            }
        }
        let gains = [
            ("KP", config.proportional_gain),
            ("KD", config.derivative_gain),
            ("KI", config.integral_gain),
            ("KS", config.integral_saturation_gain),
        ];
        for (cmd, gain) in gains {
            if let Some(gain) = gain {
                push(cmd, vec![fmt_decimal(finite(gain)?)]);
            }
        }
        if let Some(home) = &config.home {
            push("DH", native(home, 0)?);
        }
        if let Some(factor) = config.microstep_factor {
            MICROSTEP_FACTOR.validate_int(factor as i64)?;
            push("QS", vec![factor.to_string()]);
        }
        if let Some(feed) = config.acceleration_feed_forward {
            push("AF", vec![fmt_decimal(finite(feed)?.abs())]);
        }
        if let Some(trajectory) = config.trajectory {
            push("TJ", vec![trajectory.to_string()]);
        }
        if let Some(conf) = config.hardware_limit_configuration {
            push("ZH", vec![conf.to_string()]);
        }
        if let Some((time, percentage)) = config.reduce_motor_torque {
            let ms = i64::try_from(time.as_millis()).unwrap_or(i64::MAX);
            TORQUE_REDUCTION_TIME.validate_int(ms)?;
            TORQUE_REDUCTION_PERCENT.validate_int(percentage as i64)?;
            push("QR", vec![ms.to_string(), percentage.to_string()]);
        }
        push("UF", Vec::new());
        push("QD", Vec::new());
        cmds.push(build_command(None, "SM", &[]));

        self.core
            .lock()
            .expect("Mutex should not be poisoned")
            .bulk(cmds, true)?;
        if let Some(units) = config.units {
            *self.unit.lock().expect("Mutex should not be poisoned") = units;
        }
        Ok(())
    }

    fn cmd(&mut self, cmd: &str, params: &[String]) -> Result<(), InstrumentError> {
        self.core
            .lock()
            .expect("Mutex should not be poisoned")
            .command(Some(self.get_axis_id()), cmd, params, true)?;
        Ok(())
    }

    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        self.core
            .lock()
            .expect("Mutex should not be poisoned")
            .query(Some(self.get_axis_id()), cmd)
    }

    fn get_reading(&mut self, cmd: &str) -> Result<AxisReading, InstrumentError> {
        let resp = self.query(cmd)?;
        let value = resp
            .trim()
            .parse::<f64>()
            .map_err(|_| InstrumentError::ResponseParseError(resp.clone()))?;
        Ok(AxisReading {
            value,
            unit: self.unit(),
        })
    }

    fn set_quantity(
        &mut self,
        cmd: &str,
        value: AxisQuantity,
        per_second: u8,
    ) -> Result<(), InstrumentError> {
        let value = value.to_native(self.unit(), per_second)?;
        self.cmd(cmd, &[fmt_decimal(value)])
    }
}

fn finite(value: f64) -> Result<f64, InstrumentError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InstrumentError::InvalidArgument(format!(
            "Value must be finite, got {value}"
        )))
    }
}
