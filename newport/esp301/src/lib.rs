//! A rust driver for the Newport ESP-301 motion controller.
//!
//! The ESP-301 drives up to three axes. Commands have the form `<target><MNEMONIC><params>`,
//! e.g., `1PR-0.001` moves axis 1 by -0.001 units relative to its current position. After every
//! command, the driver reads the error buffer with `TB?` and turns a non-zero error code into an
//! [`InstrumentError::DeviceError`].
//!
//! Axes are accessed with [`Esp301::get_axis`], using 0-based indices. The axis handle takes
//! care of the target prefix and of the unit the axis is configured in, see [`units`].
//!
//! # Example
//!
//! ```no_run
//! use measurements::Length;
//! use newport_esp301::{Esp301, SerialInterfaceEsp301};
//!
//! let port = "/dev/ttyUSB0";
//! let serial_inst = SerialInterfaceEsp301::simple(port).expect("Failed to open serial port");
//! let mut esp = Esp301::try_new(serial_inst).unwrap();
//!
//! let mut axis = esp.get_axis(0).unwrap();
//! axis.move_to(Length::from_millimeters(1.5), true).unwrap();
//! axis.wait_for_motion(std::time::Duration::from_millis(10), None).unwrap();
//! println!("Position: {:?}", axis.get_position().unwrap());
//! ```
//!
//! # Bulk commands
//!
//! Several commands can be sent in one line, which the controller executes back to back.
//! Queries cannot be part of a bulk command.
//!
//! ```no_run
//! # use newport_esp301::{Esp301, SerialInterfaceEsp301};
//! # let serial_inst = SerialInterfaceEsp301::simple("/dev/ttyUSB0").unwrap();
//! # let mut esp = Esp301::try_new(serial_inst).unwrap();
//! let mut x = esp.get_axis(0).unwrap();
//! let mut y = esp.get_axis(1).unwrap();
//! esp.execute_bulk_command(true, |_| {
//!     x.move_to(1.0, false)?;
//!     y.move_to(-1.0, false)
//! })
//! .unwrap();
//! ```

#![deny(warnings, missing_docs)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use labdriver::{
    Instrument, InstrumentError, InstrumentInterface, SerialInterface,
    params::{Access, Domain, ParameterSpec},
};
use log::{info, warn};
use serialport::SerialPort;

mod axis;
pub mod error;
pub mod units;

pub use axis::{Axis, ServoConfig};
pub use error::{ErrorBufferEntry, NewportErrorCode};
pub use units::{AxisQuantity, AxisReading, AxisUnit, Dimension};

const NUM_AXES: ParameterSpec = ParameterSpec {
    name: "number of axes",
    mnemonic: "",
    domain: Domain::IntRange { min: 1, max: 3 },
    access: Access::ReadWrite,
};

const PROGRAM_ID: ParameterSpec = ParameterSpec {
    name: "program id",
    mnemonic: "EP",
    domain: Domain::IntRange { min: 1, max: 100 },
    access: Access::WriteOnly,
};

/// Axis parameters of the ESP-301.
pub const PARAMETERS: &[ParameterSpec] = &[
    ParameterSpec {
        name: "motion done",
        mnemonic: "MD",
        domain: Domain::Bool { on: "1", off: "0" },
        access: Access::ReadOnly,
    },
    ParameterSpec {
        name: "acceleration",
        mnemonic: "AC",
        domain: Domain::Unit("units/s^2"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "deceleration",
        mnemonic: "AG",
        domain: Domain::Unit("units/s^2"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "emergency stop deceleration",
        mnemonic: "AE",
        domain: Domain::Unit("units/s^2"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "jerk",
        mnemonic: "JK",
        domain: Domain::Unit("units/s^3"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "velocity",
        mnemonic: "VA",
        domain: Domain::Unit("units/s"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "maximum velocity",
        mnemonic: "VU",
        domain: Domain::Unit("units/s"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "maximum base velocity",
        mnemonic: "VB",
        domain: Domain::Unit("units/s"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "maximum acceleration and deceleration",
        mnemonic: "AU",
        domain: Domain::Unit("units/s^2"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "position",
        mnemonic: "TP",
        domain: Domain::Unit("units"),
        access: Access::ReadOnly,
    },
    ParameterSpec {
        name: "desired position",
        mnemonic: "DP",
        domain: Domain::Unit("units"),
        access: Access::ReadOnly,
    },
    ParameterSpec {
        name: "desired velocity",
        mnemonic: "DV",
        domain: Domain::Unit("units/s"),
        access: Access::ReadOnly,
    },
    ParameterSpec {
        name: "home",
        mnemonic: "DH",
        domain: Domain::Unit("units"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "units",
        mnemonic: "SN",
        domain: Domain::IntRange { min: 0, max: 11 },
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "encoder resolution",
        mnemonic: "SU",
        domain: Domain::Unit("units"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "left travel limit",
        mnemonic: "SL",
        domain: Domain::Unit("units"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "right travel limit",
        mnemonic: "SR",
        domain: Domain::Unit("units"),
        access: Access::ReadWrite,
    },
    ParameterSpec {
        name: "motor power",
        mnemonic: "MO",
        domain: Domain::Bool { on: "MO", off: "MF" },
        access: Access::WriteOnly,
    },
    MICROSTEP_FACTOR,
    TORQUE_REDUCTION_TIME,
    TORQUE_REDUCTION_PERCENT,
];

const MICROSTEP_FACTOR: ParameterSpec = ParameterSpec {
    name: "microstep factor",
    mnemonic: "QS",
    domain: Domain::IntRange { min: 1, max: 250 },
    access: Access::WriteOnly,
};

const TORQUE_REDUCTION_TIME: ParameterSpec = ParameterSpec {
    name: "torque reduction time in ms",
    mnemonic: "QR",
    domain: Domain::IntRange { min: 0, max: 60000 },
    access: Access::WriteOnly,
};

const TORQUE_REDUCTION_PERCENT: ParameterSpec = ParameterSpec {
    name: "torque reduction percentage",
    mnemonic: "QR",
    domain: Domain::IntRange { min: 0, max: 100 },
    access: Access::WriteOnly,
};

/// How an axis searches for its home position (`OR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomeSearchMode {
    /// Search for the zero position count.
    #[default]
    ZeroPositionCount,
    /// Search for the home switch and the index signal.
    HomeSwitchAndIndex,
    /// Search for the home switch only.
    HomeSwitch,
    /// Search for the positive limit switch.
    PositiveLimitSwitch,
    /// Search for the negative limit switch.
    NegativeLimitSwitch,
    /// Search for the positive limit switch and the index signal.
    PositiveLimitAndIndex,
    /// Search for the negative limit switch and the index signal.
    NegativeLimitAndIndex,
}

impl HomeSearchMode {
    /// Code of the mode as sent with `OR`.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// A SerialInterface for the ESP-301.
///
/// Builds a labdriver SerialInterface with the settings of the RS-232 port of the ESP-301.
#[derive(Debug)]
pub struct SerialInterfaceEsp301 {}

impl SerialInterfaceEsp301 {
    /// Try to create an Instrument interface with a simple serial port configuration.
    ///
    /// This is analog to the `simple` method of the `SerialInterface` struct in `labdriver`,
    /// however, it sets 19200 baud, 8 data bits, no parity, one stop bit, and hardware flow
    /// control. The default timeout is set to 3 seconds.
    ///
    /// Arguments:
    /// * `port` - The name of the serial port, e.g., `"/dev/ttyUSB0"` or `"COM3"`.
    pub fn simple(port: &str) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let timeout = Duration::from_secs(3);
        let port = serialport::new(port, 19200)
            .timeout(timeout)
            .parity(serialport::Parity::None)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::Hardware);
        SerialInterface::full(port)
    }
}

/// Build a raw command of the form `<target><CMD><p1,p2,...>`.
pub(crate) fn build_command(target: Option<usize>, cmd: &str, params: &[String]) -> String {
    format!(
        "{}{}{}",
        target.map(|t| t.to_string()).unwrap_or_default(),
        cmd.to_ascii_uppercase(),
        params.join(",")
    )
}

/// State shared by the controller and all of its axis handles.
pub(crate) struct Core<T: InstrumentInterface> {
    interface: T,
    batch: Option<Vec<String>>,
    programming: bool,
}

impl<T: InstrumentInterface> Core<T> {
    /// Send a command right away, or queue it if a bulk command is being assembled.
    ///
    /// Returns the response for queries.
    pub(crate) fn command(
        &mut self,
        target: Option<usize>,
        cmd: &str,
        params: &[String],
        errcheck: bool,
    ) -> Result<Option<String>, InstrumentError> {
        let raw = build_command(target, cmd, params);
        self.push(raw, errcheck)
    }

    /// Send a query and return its response.
    pub(crate) fn query(
        &mut self,
        target: Option<usize>,
        cmd: &str,
    ) -> Result<String, InstrumentError> {
        self.command(target, cmd, &[], true)?
            .ok_or_else(|| InstrumentError::ResponseParseError(String::new()))
    }

    /// Send several raw commands as one line, or append them to the current bulk command.
    pub(crate) fn bulk(&mut self, raw: Vec<String>, errcheck: bool) -> Result<(), InstrumentError> {
        if let Some(batch) = self.batch.as_mut() {
            batch.extend(raw);
            return Ok(());
        }
        if raw.is_empty() {
            return Ok(());
        }
        self.execute(&raw.join(";"), errcheck && !self.programming)?;
        Ok(())
    }

    fn push(&mut self, raw: String, errcheck: bool) -> Result<Option<String>, InstrumentError> {
        let is_query = raw.contains('?');
        if let Some(batch) = self.batch.as_mut() {
            if is_query {
                return Err(InstrumentError::InvalidArgument(format!(
                    "Query {raw} cannot be part of a bulk command."
                )));
            }
            batch.push(raw);
            return Ok(None);
        }
        if self.programming && is_query {
            return Err(InstrumentError::InvalidArgument(format!(
                "Query {raw} cannot be part of a stored program."
            )));
        }
        self.execute(&raw, errcheck && !self.programming)
    }

    fn execute(&mut self, raw: &str, errcheck: bool) -> Result<Option<String>, InstrumentError> {
        let resp = if raw.contains('?') {
            Some(self.interface.query(raw)?)
        } else {
            self.interface.sendcmd(raw)?;
            None
        };
        if errcheck {
            self.read_error()?.into_result()?;
        }
        Ok(resp)
    }

    fn read_error(&mut self) -> Result<ErrorBufferEntry, InstrumentError> {
        let entry = ErrorBufferEntry::parse(&self.interface.query("TB?")?)?;
        if entry.code.is_error() {
            warn!(
                "ESP-301 reported error {} at {:?}",
                entry.code, entry.timestamp
            );
        }
        Ok(entry)
    }
}

/// A rust driver for the Newport ESP-301.
///
/// See the top-level documentation for an example on how to use this driver.
pub struct Esp301<T: InstrumentInterface> {
    core: Arc<Mutex<Core<T>>>,
    axes: BTreeMap<usize, Arc<Mutex<AxisUnit>>>,
    num_axes: usize,
}

impl<T: InstrumentInterface> Esp301<T> {
    /// Create a new ESP-301 instance with the given instrument interface.
    ///
    /// The controller is assumed to drive three axes, see [`Esp301::set_num_axes`].
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the [`InstrumentInterface`] trait.
    pub fn try_new(interface: T) -> Result<Self, InstrumentError> {
        let mut interface = interface;
        interface.set_terminator("\r");
        Ok(Esp301 {
            core: Arc::new(Mutex::new(Core {
                interface,
                batch: None,
                programming: false,
            })),
            axes: BTreeMap::new(),
            num_axes: 3,
        })
    }

    /// Set the number of axes that are connected to the controller (1 to 3).
    ///
    /// Cached axes beyond the new number are dropped.
    pub fn set_num_axes(&mut self, num: usize) -> Result<(), InstrumentError> {
        NUM_AXES.validate_int(num as i64)?;
        self.num_axes = num;
        self.axes.retain(|&idx, _| idx < num);
        Ok(())
    }

    /// Get the number of axes that are connected to the controller.
    pub fn get_num_axes(&self) -> usize {
        self.num_axes
    }

    /// Get the axis with the given index (0-based).
    ///
    /// The first access of an axis queries its unit from the controller (`SN?`). Later accesses
    /// return handles that share the cached unit.
    pub fn get_axis(&mut self, idx: usize) -> Result<Axis<T>, InstrumentError> {
        self.check_axis_index(idx)?;
        let unit = match self.axes.get(&idx) {
            Some(unit) => Arc::clone(unit),
            None => {
                let resp = self
                    .core
                    .lock()
                    .expect("Mutex should not be poisoned")
                    .query(Some(idx + 1), "SN?")?;
                let unit = Arc::new(Mutex::new(axis::parse_unit(&resp)?));
                self.axes.insert(idx, Arc::clone(&unit));
                unit
            }
        };
        Ok(Axis::new(idx, Arc::clone(&self.core), unit))
    }

    /// Send a command to the controller.
    ///
    /// The command is sent as `<target><cmd><params>`, with the parameters separated by commas.
    /// Commands that contain a `?` are treated as queries and their response is returned. If
    /// `errcheck` is set, the error buffer is read afterwards and a reported error is returned
    /// as [`InstrumentError::DeviceError`].
    pub fn send_command(
        &mut self,
        cmd: &str,
        target: Option<usize>,
        params: &[String],
        errcheck: bool,
    ) -> Result<Option<String>, InstrumentError> {
        self.core
            .lock()
            .expect("Mutex should not be poisoned")
            .command(target, cmd, params, errcheck)
    }

    /// Read the oldest entry of the error buffer (`TB?`).
    pub fn read_error(&mut self) -> Result<ErrorBufferEntry, InstrumentError> {
        self.core
            .lock()
            .expect("Mutex should not be poisoned")
            .read_error()
    }

    /// Perform a hardware reset of the controller (`RS`).
    ///
    /// This only has an effect if the watchdog timer is enabled with the jumpers on the
    /// controller.
    pub fn reset(&mut self, errcheck: bool) -> Result<(), InstrumentError> {
        self.send_command("RS", None, &[], errcheck)?;
        info!("ESP-301 reset");
        Ok(())
    }

    /// Search for the home position of the axis with the given index (0-based).
    pub fn search_for_home(
        &mut self,
        idx: usize,
        mode: HomeSearchMode,
        errcheck: bool,
    ) -> Result<(), InstrumentError> {
        self.check_axis_index(idx)?;
        self.send_command("OR", Some(idx + 1), &[mode.code().to_string()], errcheck)?;
        Ok(())
    }

    /// Start assembling a bulk command.
    ///
    /// All following commands are queued until [`Esp301::end_batch`] is called. Prefer
    /// [`Esp301::execute_bulk_command`], which ends the batch for you.
    pub fn begin_batch(&mut self) -> Result<(), InstrumentError> {
        let mut core = self.core.lock().expect("Mutex should not be poisoned");
        if core.batch.is_some() {
            return Err(InstrumentError::InvalidArgument(
                "A bulk command is already being assembled.".to_string(),
            ));
        }
        core.batch = Some(Vec::new());
        Ok(())
    }

    /// Send all queued commands as one line, separated by `;`.
    ///
    /// Nothing is sent if no command was queued.
    pub fn end_batch(&mut self, errcheck: bool) -> Result<(), InstrumentError> {
        let mut core = self.core.lock().expect("Mutex should not be poisoned");
        let batch = core.batch.take().ok_or_else(|| {
            InstrumentError::InvalidArgument("No bulk command is being assembled.".to_string())
        })?;
        core.bulk(batch, errcheck)
    }

    /// Run `f` with all commands queued and send them as one bulk command afterwards.
    ///
    /// The queued commands are sent even if `f` fails. An error of `f` takes precedence over an
    /// error of sending the bulk command.
    pub fn execute_bulk_command<F, R>(&mut self, errcheck: bool, f: F) -> Result<R, InstrumentError>
    where
        F: FnOnce(&mut Self) -> Result<R, InstrumentError>,
    {
        self.begin_batch()?;
        let res = f(self);
        let flush = self.end_batch(errcheck);
        let value = res?;
        flush?;
        Ok(value)
    }

    /// Store the commands sent within `f` as a program with the given id (1 to 100).
    ///
    /// An existing program with this id is erased first (`XX`). Program mode is entered with `EP`
    /// and always left with `QP`, even if `f` fails. The error buffer is not read while in program
    /// mode and queries are rejected, so fetch all axes that `f` uses beforehand.
    ///
    /// Programs cannot be defined while a bulk command is being assembled.
    pub fn define_program<F>(&mut self, id: u8, f: F) -> Result<(), InstrumentError>
    where
        F: FnOnce(&mut Self) -> Result<(), InstrumentError>,
    {
        PROGRAM_ID.validate_int(id as i64)?;
        if self
            .core
            .lock()
            .expect("Mutex should not be poisoned")
            .batch
            .is_some()
        {
            return Err(InstrumentError::InvalidArgument(
                "A program cannot be defined while a bulk command is being assembled.".to_string(),
            ));
        }
        let target = Some(id as usize);
        self.send_command("XX", target, &[], true)?;
        self.send_command("EP", target, &[], false)?;
        self.core
            .lock()
            .expect("Mutex should not be poisoned")
            .programming = true;

        let res = f(self);

        self.core
            .lock()
            .expect("Mutex should not be poisoned")
            .programming = false;
        let quit = self.send_command("QP", None, &[], true);
        res?;
        quit?;
        Ok(())
    }

    /// Run the stored program with the given id (1 to 100).
    pub fn run_program(&mut self, id: u8) -> Result<(), InstrumentError> {
        PROGRAM_ID.validate_int(id as i64)?;
        self.send_command("EX", Some(id as usize), &[], true)?;
        Ok(())
    }

    fn check_axis_index(&self, idx: usize) -> Result<(), InstrumentError> {
        if idx >= self.num_axes {
            return Err(InstrumentError::ChannelIndexOutOfRange {
                idx,
                nof_channels: self.num_axes,
            });
        }
        Ok(())
    }
}
