//! Tests for the [`Instrument`] interface itself.
//!
//! Most of the provided functionality of the [`InstrumentInterface`] trait is tested through the
//! [`labdriver::LoopbackInterface`] tests.

use std::{
    collections::VecDeque,
    io::{BufRead, BufReader, Write},
    net::TcpListener,
    thread,
    time::Duration,
};

use rstest::*;

use labdriver::{Instrument, InstrumentError, InstrumentInterface, TcpIpInterface};

/// An empty instrument with a three second timeout.
#[fixture]
fn empt_inst() -> Instrument<VecDeque<u8>> {
    Instrument::new(VecDeque::new(), Duration::from_secs(3))
}

/// An instrument that holds a response without terminator and has a zero timeout.
#[fixture]
fn no_term_inst() -> Instrument<VecDeque<u8>> {
    Instrument::new(VecDeque::from(b"resp".to_vec()), Duration::ZERO)
}

#[rstest]
fn test_instrument_terminator(mut empt_inst: Instrument<VecDeque<u8>>) {
    assert_eq!("\n", empt_inst.get_terminator());

    empt_inst.set_terminator("\r");
    assert_eq!("\r", empt_inst.get_terminator());
}

#[rstest]
fn test_instrument_timeout(mut empt_inst: Instrument<VecDeque<u8>>) {
    assert_eq!(Duration::from_secs(3), empt_inst.get_timeout());

    empt_inst.set_timeout(Duration::from_millis(250));
    assert_eq!(Duration::from_millis(250), empt_inst.get_timeout());
}

/// A `VecDeque` reads back what was written, so a sent command comes back as a line.
#[rstest]
fn test_instrument_sendcmd_read_line(mut empt_inst: Instrument<VecDeque<u8>>) {
    empt_inst.set_terminator("\r");
    empt_inst.sendcmd("1TP?").unwrap();
    assert_eq!("1TP?", empt_inst.read_until_terminator().unwrap());
}

#[rstest]
fn test_instrument_query_echo(mut empt_inst: Instrument<VecDeque<u8>>) {
    assert_eq!("U0X", empt_inst.query("U0X").unwrap());
}

#[rstest]
fn test_instrument_read_until_terminator_timeout(mut no_term_inst: Instrument<VecDeque<u8>>) {
    match no_term_inst.read_until_terminator() {
        Err(InstrumentError::Timeout(timeout)) => assert_eq!(Duration::ZERO, timeout),
        other => panic!("Expected timeout error, got {other:?}"),
    }
}

#[rstest]
fn test_instrument_query_timeout(mut no_term_inst: Instrument<VecDeque<u8>>) {
    match no_term_inst.query("TB?") {
        Err(InstrumentError::TimeoutQuery { query, timeout }) => {
            assert_eq!("TB?", query);
            assert_eq!(Duration::ZERO, timeout);
        }
        other => panic!("Expected timeout error, got {other:?}"),
    }
}

/// Running out of bytes before the terminator is an I/O error.
#[rstest]
fn test_instrument_read_eof() {
    let mut inst = Instrument::new(VecDeque::from(b"775".to_vec()), Duration::from_secs(3));
    assert!(matches!(
        inst.read_until_terminator(),
        Err(InstrumentError::Io(_))
    ));
}

/// Query a device server on a local socket that answers with a fixed identification.
#[rstest]
fn test_tcp_ip_query() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(stream.try_clone().unwrap())
            .read_line(&mut line)
            .unwrap();
        assert_eq!("*IDN?\n", line);
        stream.write_all(b"Prologix GPIB-ETHERNET\n").unwrap();
    });

    let mut inst = TcpIpInterface::simple(addr).unwrap();
    assert_eq!(Duration::from_secs(3), inst.get_timeout());
    assert_eq!("Prologix GPIB-ETHERNET", inst.query("*IDN?").unwrap());
    server.join().unwrap();
}

#[rstest]
fn test_tcp_ip_connection_refused() {
    // bind and drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    assert!(matches!(
        TcpIpInterface::simple(addr),
        Err(InstrumentError::Io(_))
    ));
}
