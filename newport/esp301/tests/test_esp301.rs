//! Tests for the Newport ESP-301 driver.

use std::time::Duration;

use measurements::{Angle, Length, test_utils::assert_almost_eq};
use rstest::*;

use labdriver::{InstrumentError, LoopbackInterface};

use newport_esp301::{AxisReading, AxisUnit, Esp301, HomeSearchMode, ServoConfig};

type Esp301Lbk = Esp301<LoopbackInterface>;

const NO_ERROR: &str = "0, 451322, NO ERROR DETECTED";

/// Create an ESP-301 on a loopback interface with the given transcript.
fn crt_inst(host2inst: Vec<&str>, inst2host: Vec<&str>) -> Esp301Lbk {
    let inp = host2inst.iter().map(|s| s.to_string()).collect();
    let out = inst2host.iter().map(|s| s.to_string()).collect();
    let interface = LoopbackInterface::new(inp, out, "\r");
    Esp301::try_new(interface).unwrap()
}

/// Create an ESP-301 whose first axis is fetched right away and configured in millimeters.
///
/// The given transcript follows the unit query of the axis.
fn crt_inst_axis(host2inst: Vec<&str>, inst2host: Vec<&str>) -> Esp301Lbk {
    let mut inp = vec!["1SN?", "TB?"];
    inp.extend(host2inst);
    let mut out = vec!["2", NO_ERROR];
    out.extend(inst2host);
    crt_inst(inp, out)
}

#[fixture]
fn emp_inst() -> Esp301Lbk {
    crt_inst(vec![], vec![])
}

#[rstest]
fn test_get_axis_cached() {
    let mut inst = crt_inst_axis(vec![], vec![]);
    let first = inst.get_axis(0).unwrap();
    let second = inst.get_axis(0).unwrap();
    assert_eq!(1, first.get_axis_id());
    assert_eq!(first.get_axis_id(), second.get_axis_id());
    assert_eq!(AxisUnit::Millimeter, first.unit());
    assert_eq!(first.unit(), second.unit());
}

#[rstest]
fn test_get_axis_out_of_range(mut emp_inst: Esp301Lbk) {
    match emp_inst.get_axis(3) {
        Err(InstrumentError::ChannelIndexOutOfRange { idx, nof_channels }) => {
            assert_eq!(3, idx);
            assert_eq!(3, nof_channels);
        }
        _ => panic!("Expected ChannelIndexOutOfRange"),
    }

    emp_inst.set_num_axes(1).unwrap();
    assert_eq!(1, emp_inst.get_num_axes());
    assert!(emp_inst.get_axis(1).is_err());
}

#[rstest]
#[case(0)]
#[case(4)]
fn test_set_num_axes_invalid(mut emp_inst: Esp301Lbk, #[case] num: usize) {
    assert!(matches!(
        emp_inst.set_num_axes(num),
        Err(InstrumentError::IntValueOutOfRange { .. })
    ));
}

#[rstest]
fn test_get_axis_bad_unit() {
    let mut inst = crt_inst(vec!["2SN?", "TB?"], vec!["12", NO_ERROR]);
    assert!(matches!(
        inst.get_axis(1),
        Err(InstrumentError::ResponseParseError(_))
    ));
}

#[rstest]
fn test_move_relative() {
    let mut inst = crt_inst_axis(vec!["1PR-0.001", "TB?"], vec![NO_ERROR]);
    let mut axis = inst.get_axis(0).unwrap();
    axis.move_to(-0.001, false).unwrap();
}

#[rstest]
fn test_move_tiny_step() {
    let mut inst = crt_inst_axis(vec!["1PR0.00001", "TB?"], vec![NO_ERROR]);
    let mut axis = inst.get_axis(0).unwrap();
    axis.move_to(1e-5, false).unwrap();
}

#[rstest]
fn test_move_absolute_quantity() {
    let mut inst = crt_inst_axis(vec!["1PA2000.0", "TB?"], vec![NO_ERROR]);
    let mut axis = inst.get_axis(0).unwrap();
    axis.move_to(Length::from_meters(2.0), true).unwrap();
}

#[rstest]
fn test_incompatible_unit() {
    let mut inst = crt_inst_axis(vec![], vec![]);
    let mut axis = inst.get_axis(0).unwrap();
    assert!(matches!(
        axis.move_to(Angle::from_degrees(10.0), true),
        Err(InstrumentError::IncompatibleUnit { .. })
    ));
    assert!(matches!(
        axis.set_velocity(Length::from_meters(1.0)),
        Err(InstrumentError::IncompatibleUnit { .. })
    ));
}

#[rstest]
fn test_device_error() {
    let mut inst = crt_inst_axis(vec!["1PA5.0", "TB?"], vec!["105, 2500, X"]);
    let mut axis = inst.get_axis(0).unwrap();
    match axis.move_to(5.0, true) {
        Err(InstrumentError::DeviceError {
            code,
            axis,
            message,
            timestamp,
        }) => {
            assert_eq!(5, code);
            assert_eq!(Some(1), axis);
            assert_eq!("NEGATIVE HARDWARE LIMIT DETECTED", message);
            assert_eq!(Some(Duration::from_secs(1)), timestamp);
        }
        _ => panic!("Expected DeviceError"),
    }
}

#[rstest]
fn test_global_device_error() {
    let mut inst = crt_inst(vec!["RS", "TB?"], vec!["7, 0, PARAMETER OUT OF RANGE"]);
    assert!(matches!(
        inst.reset(true),
        Err(InstrumentError::DeviceError {
            code: 7,
            axis: None,
            ..
        })
    ));
}

#[rstest]
fn test_read_error() {
    let mut inst = crt_inst(vec!["TB?"], vec!["308, 10, MOTOR / STAGE NOT CONNECTED"]);
    let entry = inst.read_error().unwrap();
    assert_eq!(Some(3), entry.code.axis());
    assert_eq!(8, entry.code.sub_code());
    assert_eq!(Duration::from_millis(4), entry.timestamp);
}

#[rstest]
fn test_send_command() {
    let mut inst = crt_inst(
        vec!["1VA1.5,2", "2TP?"],
        vec!["0.25"],
    );
    let resp = inst
        .send_command("va", Some(1), &["1.5".to_string(), "2".to_string()], false)
        .unwrap();
    assert_eq!(None, resp);
    let resp = inst.send_command("TP?", Some(2), &[], false).unwrap();
    assert_eq!(Some("0.25".to_string()), resp);
}

#[rstest]
fn test_reset_and_home() {
    let mut inst = crt_inst(vec!["RS", "2OR2", "TB?"], vec![NO_ERROR]);
    inst.reset(false).unwrap();
    inst.search_for_home(1, HomeSearchMode::HomeSwitch, true)
        .unwrap();
    assert!(inst
        .search_for_home(3, HomeSearchMode::default(), true)
        .is_err());
}

#[rstest]
fn test_axis_readings() {
    let mut inst = crt_inst_axis(
        vec!["1TP?", "TB?", "1VA?", "TB?", "1AU?", "TB?"],
        vec!["12.5", NO_ERROR, "2.0", NO_ERROR, "40", NO_ERROR],
    );
    let mut axis = inst.get_axis(0).unwrap();
    let position = axis.get_position().unwrap();
    assert_eq!(
        AxisReading {
            value: 12.5,
            unit: AxisUnit::Millimeter
        },
        position
    );
    assert_almost_eq(0.0125, position.as_length().unwrap().as_meters());
    assert_eq!(2.0, axis.get_velocity().unwrap().value);
    assert_eq!(40.0, axis.get_max_deceleration().unwrap().value);
}

#[rstest]
fn test_axis_setters() {
    let mut inst = crt_inst_axis(
        vec![
            "1AC10.0", "TB?", "1AG12.5", "TB?", "1AE100.0", "TB?", "1JK1000.0", "TB?",
            "1VA2.5", "TB?", "1VU5.0", "TB?", "1VB0.5", "TB?", "1AU50.0", "TB?", "1DH0.0",
            "TB?", "1SU0.0001", "TB?", "1SL-25.0", "TB?", "1SR25.0", "TB?",
        ],
        vec![NO_ERROR; 12],
    );
    let mut axis = inst.get_axis(0).unwrap();
    axis.set_acceleration(10.0).unwrap();
    axis.set_deceleration(12.5).unwrap();
    axis.set_estop_deceleration(100.0).unwrap();
    axis.set_jerk(1000.0).unwrap();
    axis.set_velocity(2.5).unwrap();
    axis.set_max_velocity(5.0).unwrap();
    axis.set_max_base_velocity(0.5).unwrap();
    axis.set_max_deceleration(50.0).unwrap();
    axis.set_home(0.0).unwrap();
    axis.set_encoder_resolution(0.0001).unwrap();
    axis.set_left_limit(-25.0).unwrap();
    axis.set_right_limit(25.0).unwrap();
}

#[rstest]
fn test_axis_motion_commands() {
    let mut inst = crt_inst_axis(
        vec![
            "1MO", "TB?", "1OR1", "TB?", "1WS", "TB?", "1WP3.0", "TB?", "1ST", "TB?", "1MF",
            "TB?",
        ],
        vec![NO_ERROR; 6],
    );
    let mut axis = inst.get_axis(0).unwrap();
    axis.set_motor_power(true).unwrap();
    axis.search_for_home(HomeSearchMode::HomeSwitchAndIndex)
        .unwrap();
    axis.wait_for_stop().unwrap();
    axis.wait_for_position(3.0).unwrap();
    axis.stop_motion().unwrap();
    axis.set_motor_power(false).unwrap();
}

#[rstest]
fn test_units_shared_between_handles() {
    let mut inst = crt_inst_axis(
        vec!["1SN7", "TB?", "1SN?", "TB?"],
        vec![NO_ERROR, "3", NO_ERROR],
    );
    let mut first = inst.get_axis(0).unwrap();
    let second = inst.get_axis(0).unwrap();

    first.set_units(AxisUnit::Degree).unwrap();
    assert_eq!(AxisUnit::Degree, second.unit());

    assert_eq!(AxisUnit::Micrometer, first.get_units().unwrap());
    assert_eq!(AxisUnit::Micrometer, second.unit());
}

#[rstest]
fn test_wait_for_motion() {
    let mut inst = crt_inst_axis(
        vec!["1MD?", "TB?", "1MD?", "TB?"],
        vec!["0", NO_ERROR, "1", NO_ERROR],
    );
    let mut axis = inst.get_axis(0).unwrap();
    axis.wait_for_motion(Duration::ZERO, Some(Duration::from_secs(1)))
        .unwrap();
}

#[rstest]
fn test_motion_done_invalid() {
    let mut inst = crt_inst_axis(vec!["1MD?", "TB?"], vec!["yes", NO_ERROR]);
    let mut axis = inst.get_axis(0).unwrap();
    assert!(axis.is_motion_done().is_err());
}

#[rstest]
fn test_bulk_command() {
    let mut inst = crt_inst(
        vec!["1SN?", "TB?", "2SN?", "TB?", "1PR1.0;2PR-1.0", "TB?"],
        vec!["2", NO_ERROR, "2", NO_ERROR, NO_ERROR],
    );
    let mut x = inst.get_axis(0).unwrap();
    let mut y = inst.get_axis(1).unwrap();
    inst.execute_bulk_command(true, |_| {
        x.move_to(1.0, false)?;
        y.move_to(-1.0, false)
    })
    .unwrap();
}

#[rstest]
fn test_bulk_command_flushes_on_error() {
    let mut inst = crt_inst_axis(vec!["1PA1.0", "TB?"], vec![NO_ERROR]);
    let mut axis = inst.get_axis(0).unwrap();
    let res = inst.execute_bulk_command(true, |_| {
        axis.move_to(1.0, true)?;
        axis.get_position()
    });
    assert!(matches!(res, Err(InstrumentError::InvalidArgument(_))));
}

#[rstest]
fn test_begin_end_batch() {
    let mut inst = crt_inst(vec!["RS;1OR0"], vec![]);
    assert!(inst.end_batch(true).is_err());

    inst.begin_batch().unwrap();
    assert!(inst.begin_batch().is_err());
    inst.reset(true).unwrap();
    inst.search_for_home(0, HomeSearchMode::ZeroPositionCount, true)
        .unwrap();
    inst.end_batch(false).unwrap();

    // an empty batch sends nothing
    inst.begin_batch().unwrap();
    inst.end_batch(true).unwrap();
}

#[rstest]
fn test_define_and_run_program() {
    let mut inst = crt_inst_axis(
        vec!["15XX", "TB?", "15EP", "1PR0.5", "1WS", "QP", "TB?", "15EX", "TB?"],
        vec![NO_ERROR, NO_ERROR, NO_ERROR],
    );
    let mut axis = inst.get_axis(0).unwrap();
    inst.define_program(15, |_| {
        axis.move_to(0.5, false)?;
        axis.wait_for_stop()
    })
    .unwrap();
    inst.run_program(15).unwrap();
}

#[rstest]
fn test_define_program_rejects_queries() {
    let mut inst = crt_inst_axis(vec!["1XX", "TB?", "1EP", "QP", "TB?"], vec![NO_ERROR, NO_ERROR]);
    let mut axis = inst.get_axis(0).unwrap();
    let res = inst.define_program(1, |_| axis.get_position().map(|_| ()));
    assert!(matches!(res, Err(InstrumentError::InvalidArgument(_))));
}

/// A program cannot be recorded into a bulk command; nothing of it gets queued.
#[rstest]
fn test_define_program_in_batch() {
    let mut inst = crt_inst(vec!["RS"], vec![]);
    inst.begin_batch().unwrap();
    let res = inst.define_program(1, |_| Ok(()));
    assert!(matches!(res, Err(InstrumentError::InvalidArgument(_))));
    inst.reset(true).unwrap();
    inst.end_batch(false).unwrap();

    let mut inst = crt_inst(vec![], vec![]);
    let res = inst.execute_bulk_command(true, |esp| esp.define_program(2, |_| Ok(())));
    assert!(matches!(res, Err(InstrumentError::InvalidArgument(_))));
}

#[rstest]
#[case(0)]
#[case(101)]
fn test_program_id_out_of_range(mut emp_inst: Esp301Lbk, #[case] id: u8) {
    assert!(matches!(
        emp_inst.define_program(id, |_| Ok(())),
        Err(InstrumentError::IntValueOutOfRange { .. })
    ));
    assert!(matches!(
        emp_inst.run_program(id),
        Err(InstrumentError::IntValueOutOfRange { .. })
    ));
}

#[rstest]
fn test_setup_servo() {
    let mut inst = crt_inst_axis(
        vec![
            "1QM1;1SN3;1VU2.0;1JW0.5;1JK10.0;1KP0.5;1QS10;1AF3.0;1QR500,50;1UF;1QD;SM",
            "TB?",
        ],
        vec![NO_ERROR],
    );
    let mut axis = inst.get_axis(0).unwrap();
    let config = ServoConfig {
        units: Some(AxisUnit::Micrometer),
        max_velocity: Some(2.0.into()),
        jog_low_velocity: Some(0.5.into()),
        jerk: Some(10.0.into()),
        proportional_gain: Some(0.5),
        microstep_factor: Some(10),
        acceleration_feed_forward: Some(-3.0),
        reduce_motor_torque: Some((Duration::from_millis(500), 50)),
        ..Default::default()
    };
    axis.setup_servo(&config).unwrap();
    assert_eq!(AxisUnit::Micrometer, axis.unit());
}

#[rstest]
#[case(ServoConfig { microstep_factor: Some(0), ..Default::default() })]
#[case(ServoConfig { microstep_factor: Some(251), ..Default::default() })]
#[case(ServoConfig { reduce_motor_torque: Some((Duration::from_secs(61), 50)), ..Default::default() })]
#[case(ServoConfig { reduce_motor_torque: Some((Duration::from_secs(1), 101)), ..Default::default() })]
#[case(ServoConfig { home: Some(Angle::from_degrees(1.0).into()), ..Default::default() })]
fn test_setup_servo_invalid(#[case] config: ServoConfig) {
    let mut inst = crt_inst_axis(vec![], vec![]);
    let mut axis = inst.get_axis(0).unwrap();
    assert!(axis.setup_servo(&config).is_err());
    assert_eq!(AxisUnit::Millimeter, axis.unit());
}

#[rstest]
fn test_parameter_table() {
    use labdriver::params::{Domain, find, find_all};
    use newport_esp301::PARAMETERS;

    let qs = find(PARAMETERS, "QS").unwrap();
    assert_eq!(Domain::IntRange { min: 1, max: 250 }, qs.domain);
    assert!(qs.is_writable());
    assert!(!qs.is_readable());
    assert!(!find(PARAMETERS, "TP").unwrap().is_writable());
    assert!(find(PARAMETERS, "XY").is_none());

    // `QR` takes a time and a percentage
    let qr: Vec<_> = find_all(PARAMETERS, "QR").map(|p| p.domain).collect();
    assert_eq!(
        vec![
            Domain::IntRange { min: 0, max: 60000 },
            Domain::IntRange { min: 0, max: 100 }
        ],
        qr
    );
}
