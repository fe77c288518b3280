//! Tests for the Keithley 775A driver.

use std::time::Duration;

use measurements::{Measurement, Voltage, test_utils::assert_almost_eq};
use rstest::*;

use labdriver::{BusEvent, InstrumentError, LoopbackInterface};

use keithley_775a::{
    ActionMode, Attenuator, Coupling, DataFormat, DisplayMode, Keithley775A, Mode, Rate, Reading,
    Slope, SrqCondition, StatusWordKind, Terminator, Totalize,
};

type Keithley775ALbk = Keithley775A<LoopbackInterface>;

const RESET: &str = "F0AC0AA0AF0AS0BC0BA0BF0BS0I0D0P0N9K0M00S1Y0G0W0AL0BL0TO0X";

/// Build an operating mode status word with the given fields and defaults for all others.
#[derive(Clone, Copy)]
struct Om {
    mode: u8,
    a: [u8; 4],
    b: [u8; 4],
    delay: u8,
    display: u8,
    format: u8,
    digits: u8,
    eoi: u8,
    srq: u8,
    rate: u8,
    term: u8,
    totalize: u8,
}

impl Default for Om {
    fn default() -> Self {
        Om {
            mode: 0,
            a: [0; 4],
            b: [0; 4],
            delay: 0,
            display: 0,
            format: 3,
            digits: 9,
            eoi: 0,
            srq: 0,
            rate: 1,
            term: 3,
            totalize: 0,
        }
    }
}

impl Om {
    fn word(&self) -> String {
        let ch = |c: [u8; 4]| c.iter().map(|d| d.to_string()).collect::<String>();
        format!(
            "775{}{}{}{}{}{}{}{}{:02}{}{}{}",
            self.mode,
            ch(self.a),
            ch(self.b),
            self.delay,
            self.display,
            self.format,
            self.digits,
            self.eoi,
            self.srq,
            self.rate,
            self.term,
            self.totalize
        )
    }
}

/// Create a Keithley 775A on a loopback interface.
///
/// The commands sent on initialization are prepended to `host2inst` automatically.
fn crt_inst_bus(
    host2inst: Vec<&str>,
    inst2host: Vec<&str>,
    events: Vec<BusEvent>,
) -> Keithley775ALbk {
    let mut inp = vec![RESET.to_string(), "Y3X".to_string(), "P3X".to_string()];
    inp.extend(host2inst.iter().map(|s| s.to_string()));
    let out = inst2host.iter().map(|s| s.to_string()).collect();
    let interface = LoopbackInterface::new(inp, out, "\n").with_bus_events(events);
    Keithley775A::try_new(interface).unwrap()
}

fn crt_inst(host2inst: Vec<&str>, inst2host: Vec<&str>) -> Keithley775ALbk {
    crt_inst_bus(host2inst, inst2host, vec![])
}

#[fixture]
fn emp_inst() -> Keithley775ALbk {
    crt_inst(vec![], vec![])
}

#[rstest]
fn test_initialization(_emp_inst: Keithley775ALbk) {}

#[rstest]
fn test_get_channel(mut emp_inst: Keithley775ALbk) {
    assert!(emp_inst.get_channel(0).is_ok());
    assert!(emp_inst.get_channel(1).is_ok());
    match emp_inst.get_channel(2) {
        Err(InstrumentError::ChannelIndexOutOfRange { idx, nof_channels }) => {
            assert_eq!((2, 2), (idx, nof_channels));
        }
        _ => panic!("Expected channel index error"),
    }
}

/// Every mode is encoded by its ordinal and decoded from the status word.
#[rstest]
fn test_mode_round_trip() {
    for mode in Mode::ALL {
        let set = format!("F{}X", mode.ordinal());
        let word = Om {
            mode: mode.ordinal(),
            ..Default::default()
        }
        .word();
        let mut inst = crt_inst(vec![&set, "U0X"], vec![&word]);
        inst.set_mode(*mode).unwrap();
        assert_eq!(*mode, inst.get_mode().unwrap());
    }
}

#[rstest]
fn test_rate_round_trip() {
    for rate in Rate::ALL {
        let set = format!("S{}X", rate.ordinal());
        let word = Om {
            rate: rate.ordinal(),
            ..Default::default()
        }
        .word();
        let mut inst = crt_inst(vec![&set, "U0X"], vec![&word]);
        inst.set_rate(*rate).unwrap();
        assert_eq!(*rate, inst.get_rate().unwrap());
    }
}

#[rstest]
fn test_terminator_round_trip() {
    for term in Terminator::ALL {
        let set = format!("Y{}X", term.ordinal());
        let word = Om {
            term: term.ordinal(),
            ..Default::default()
        }
        .word();
        let mut inst = crt_inst(vec![&set, "U0X"], vec![&word]);
        inst.set_terminator(*term).unwrap();
        assert_eq!(*term, inst.get_terminator().unwrap());
    }
}

#[rstest]
fn test_display_mode_round_trip() {
    for dm in DisplayMode::ALL {
        let set = format!("D{}X", dm.ordinal());
        let word = Om {
            display: dm.ordinal(),
            ..Default::default()
        }
        .word();
        let mut inst = crt_inst(vec![&set, "U0X"], vec![&word]);
        inst.set_display_mode(*dm).unwrap();
        assert_eq!(*dm, inst.get_display_mode().unwrap());
    }
}

#[rstest]
fn test_data_format_round_trip() {
    for df in DataFormat::ALL {
        let set = format!("P{}X", df.ordinal());
        let word = Om {
            format: df.ordinal(),
            ..Default::default()
        }
        .word();
        let mut inst = crt_inst(vec![&set, "U0X"], vec![&word]);
        inst.set_data_format(*df).unwrap();
        assert_eq!(*df, inst.get_data_format().unwrap());
    }
}

#[rstest]
fn test_totalize_round_trip() {
    for tot in Totalize::ALL {
        let set = format!("TO{}X", tot.ordinal());
        let word = Om {
            totalize: tot.ordinal(),
            ..Default::default()
        }
        .word();
        let mut inst = crt_inst(vec![&set, "U0X"], vec![&word]);
        inst.set_totalize(*tot).unwrap();
        assert_eq!(*tot, inst.get_totalize().unwrap());
    }
}

#[rstest]
#[case(0, "A")]
#[case(1, "B")]
fn test_channel_settings(#[case] idx: usize, #[case] letter: &str) {
    let settings = [1, 1, 1, 1];
    let word = if idx == 0 {
        Om {
            a: settings,
            ..Default::default()
        }
    } else {
        Om {
            b: settings,
            ..Default::default()
        }
    }
    .word();
    let cmds = [
        format!("{letter}C1X"),
        format!("{letter}A1X"),
        format!("{letter}F1X"),
        format!("{letter}S1X"),
    ];
    let mut host2inst: Vec<&str> = cmds.iter().map(|s| s.as_str()).collect();
    host2inst.extend(["U0X", "U0X", "U0X", "U0X"]);
    let mut inst = crt_inst(host2inst, vec![&word, &word, &word, &word]);
    let mut ch = inst.get_channel(idx).unwrap();

    ch.set_coupling(Coupling::Ac).unwrap();
    ch.set_attenuator(Attenuator::X10).unwrap();
    ch.set_filter(true).unwrap();
    ch.set_slope(Slope::Negative).unwrap();

    assert_eq!(Coupling::Ac, ch.get_coupling().unwrap());
    assert_eq!(Attenuator::X10, ch.get_attenuator().unwrap());
    assert!(ch.get_filter().unwrap());
    assert_eq!(Slope::Negative, ch.get_slope().unwrap());
}

#[rstest]
fn test_trigger_level() {
    let mut inst = crt_inst(
        vec!["AL+001.50X", "BL-012.25X", "B3X", "B4X"],
        vec!["+001.50", "-012.25"],
    );
    let mut cha = inst.get_channel(0).unwrap();
    let mut chb = inst.get_channel(1).unwrap();
    cha.set_trigger_level(1.5).unwrap();
    chb.set_trigger_level(Voltage::from_millivolts(-12250.0)).unwrap();
    assert_almost_eq(1.5, cha.get_trigger_level().unwrap().as_base_units());
    assert_almost_eq(-12.25, chb.get_trigger_level().unwrap().as_base_units());
}

#[rstest]
fn test_trigger_level_out_of_range(mut emp_inst: Keithley775ALbk) {
    let mut cha = emp_inst.get_channel(0).unwrap();
    assert!(cha.set_trigger_level(1000.0).is_err());
    assert!(cha.set_trigger_level(f64::NAN).is_err());
}

#[rstest]
fn test_gate_time() {
    let mut inst = crt_inst(vec!["G2.500000X", "B1X"], vec!["2.500000"]);
    inst.set_gate_time(2.5).unwrap();
    assert_eq!(Duration::from_millis(2500), inst.get_gate_time().unwrap());
}

/// The data control is only switched when it changes.
#[rstest]
fn test_data_control_cache() {
    let mut inst = crt_inst(
        vec!["B1X", "B2X", "B0X"],
        vec!["1.000000", "0.500000", "0.400000", "0012345.678"],
    );
    assert_eq!(Duration::from_secs(1), inst.get_gate_time().unwrap());
    assert_eq!(Duration::from_millis(500), inst.get_delay_time().unwrap());
    assert_eq!(Duration::from_millis(400), inst.get_delay_time().unwrap());
    assert_eq!("0012345.678", inst.get_measuring_buffer().unwrap());
}

#[rstest]
fn test_gate_delay_time_set() {
    let mut inst = crt_inst(vec!["G0.010000X", "GUX", "W0.250000X", "WUX"], vec![]);
    inst.set_gate_time(Duration::from_millis(10)).unwrap();
    inst.set_gate_time_user().unwrap();
    inst.set_delay_time(0.25).unwrap();
    inst.set_delay_time_user().unwrap();
    assert!(inst.set_gate_time(-1.0).is_err());
}

#[rstest]
fn test_delay_eoi_digits_srq() {
    let word = Om {
        delay: 1,
        eoi: 1,
        digits: 5,
        srq: 40,
        ..Default::default()
    }
    .word();
    let mut inst = crt_inst(
        vec!["I1X", "K1X", "N5X", "M40X", "U0X", "U0X", "U0X", "U0X"],
        vec![&word, &word, &word, &word],
    );
    inst.set_delay(true).unwrap();
    inst.set_eoi(true).unwrap();
    inst.set_displayed_digits(5).unwrap();
    inst.set_srq_mask(SrqCondition::mask(&[SrqCondition::ReadingDone, SrqCondition::Error]))
        .unwrap();
    assert!(inst.get_delay().unwrap());
    assert!(inst.get_eoi().unwrap());
    assert_eq!(5, inst.get_displayed_digits().unwrap());
    assert_eq!(40, inst.get_srq_mask().unwrap());
}

/// Out of range values raise before anything is sent: the loopback would panic otherwise.
#[rstest]
#[case(2)]
#[case(10)]
fn test_displayed_digits_out_of_range(mut emp_inst: Keithley775ALbk, #[case] digits: u8) {
    match emp_inst.set_displayed_digits(digits) {
        Err(InstrumentError::IntValueOutOfRange { value, min, max }) => {
            assert_eq!((i64::from(digits), 3, 9), (value, min, max));
        }
        _ => panic!("Expected out of range error"),
    }
}

#[rstest]
fn test_srq_mask_out_of_range(mut emp_inst: Keithley775ALbk) {
    assert!(matches!(
        emp_inst.set_srq_mask(60),
        Err(InstrumentError::IntValueOutOfRange { .. })
    ));
}

#[rstest]
fn test_show_message() {
    let mut inst = crt_inst(vec!["D5HELLOX"], vec![]);
    inst.show_message("HELLO").unwrap();
    assert!(inst.show_message("EXIT").is_err());
}

#[rstest]
#[case("774000000000000390001300")]
#[case("")]
#[case("U0X")]
fn test_wrong_status_word_prefix(#[case] word: &str) {
    let mut inst = crt_inst(vec!["U0X"], vec![word]);
    assert!(matches!(
        inst.get_operating_mode(),
        Err(InstrumentError::ResponseParseError(_))
    ));
}

#[rstest]
fn test_error_status() {
    let mut inst = crt_inst(vec!["JX", "U1X", "U1X"], vec!["775000100000", "776000100000"]);
    inst.self_test().unwrap();
    let status = inst.get_error_status().unwrap();
    assert!(status.self_test_error);
    assert!(!status.gate_error);
    assert!(inst.get_error_status().is_err());
}

#[rstest]
fn test_status_word_raw() {
    let mut inst = crt_inst(vec!["U1X"], vec!["775000000000"]);
    assert_eq!(
        "775000000000",
        inst.get_status_word(StatusWordKind::ErrorStatus).unwrap()
    );
}

#[rstest]
fn test_measure_by_mode() {
    let mut inst = crt_inst(vec!["F2X", "TX", "F7X"], vec!["0000.001250", "00001234"]);
    inst.set_mode(Mode::PeriodA).unwrap();
    assert_eq!(
        Reading::Time(Duration::from_micros(1250)),
        inst.measure(true).unwrap()
    );
    inst.set_mode(Mode::TotalizeA).unwrap();
    assert_eq!(Reading::Count(1234), inst.measure(false).unwrap());
}

#[rstest]
fn test_measure_frequency_after_reset() {
    let mut inst = crt_inst(vec!["B1X", RESET], vec!["1.000000", "0010000.000"]);
    inst.get_gate_time().unwrap();
    inst.reset().unwrap();
    match inst.measure(false).unwrap() {
        Reading::Frequency(f) => assert_almost_eq(10000.0, f.as_hertz()),
        other => panic!("Expected a frequency, got {other:?}"),
    }
}

#[rstest]
fn test_measure_parse_error() {
    let mut inst = crt_inst(vec![], vec!["OVERFLOW"]);
    assert!(matches!(
        inst.measure_float(false),
        Err(InstrumentError::ResponseParseError(_))
    ));
}

#[rstest]
fn test_gpib_reset_trigger_wait() {
    let mut inst = crt_inst_bus(
        vec![],
        vec!["0010000.000"],
        vec![
            BusEvent::Clear,
            BusEvent::Trigger,
            BusEvent::StatusByte(16),
            BusEvent::StatusByte(24),
            BusEvent::StatusByte(0b0010_0000),
        ],
    );
    inst.set_reset_mode(ActionMode::Gpib);
    inst.set_trigger_mode(ActionMode::Gpib);
    inst.reset().unwrap();
    inst.trigger_and_wait(Some(Duration::from_secs(1))).unwrap();
    assert!(inst.get_status_byte().unwrap().error);
    assert_almost_eq(10000.0, inst.measure_float(false).unwrap());
}

#[rstest]
fn test_trigger_wait_timeout() {
    let mut inst = crt_inst_bus(vec!["TX"], vec![], vec![BusEvent::StatusByte(16)]);
    match inst.trigger_and_wait(Some(Duration::ZERO)) {
        Err(InstrumentError::Timeout(dt)) => assert_eq!(Duration::ZERO, dt),
        other => panic!("Expected timeout, got {other:?}"),
    }
}

/// Trigger and reset over GPIB are not supported by plain interfaces.
#[rstest]
fn test_gpib_not_supported() {
    use std::collections::VecDeque;

    use labdriver::Instrument;

    let intf = Instrument::new(VecDeque::<u8>::new(), Duration::from_secs(1));
    let mut inst = Keithley775A::try_new(intf).unwrap();
    inst.set_trigger_mode(ActionMode::Gpib);
    assert!(matches!(
        inst.trigger(),
        Err(InstrumentError::InterfaceCommandNotSupported)
    ));
}

#[rstest]
fn test_parameter_table() {
    use keithley_775a::PARAMETERS;
    use labdriver::params::find;

    let digits = find(PARAMETERS, "N").unwrap();
    assert_eq!(9, digits.validate_int(9).unwrap());
    assert!(digits.validate_int(10).is_err());
    let srq = find(PARAMETERS, "M").unwrap();
    assert!(srq.validate_int(60).is_err());
    assert!(find(PARAMETERS, "W").unwrap().is_writable());
}

/// `F` and `S` mean different things for the instrument and for a channel.
#[rstest]
#[case("F", "mode", "filter")]
#[case("S", "rate", "slope")]
fn test_channel_parameter_table(#[case] mnemonic: &str, #[case] inst: &str, #[case] ch: &str) {
    use keithley_775a::{CHANNEL_PARAMETERS, PARAMETERS};
    use labdriver::params::{find, find_all};

    assert_eq!(inst, find(PARAMETERS, mnemonic).unwrap().name);
    assert_eq!(ch, find(CHANNEL_PARAMETERS, mnemonic).unwrap().name);
    assert_eq!(1, find_all(PARAMETERS, mnemonic).count());
    assert_eq!(1, find_all(CHANNEL_PARAMETERS, mnemonic).count());
}
