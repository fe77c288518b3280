use std::time::Duration;

use keithley_775a::{Keithley775A, Mode, Rate, SerialInterfaceKeithley775A};

fn main() {
    env_logger::init();

    let port = "/dev/ttyUSB0";
    let address = 12;

    // Get the GPIB interface through the GPIB-USB adapter
    let gpib = SerialInterfaceKeithley775A::gpibusb(port, address).expect("Failed to open adapter");

    // Open the counter, this resets it to its default settings.
    let mut inst = Keithley775A::try_new(gpib).unwrap();
    println!("Operating mode: {:?}", inst.get_operating_mode().unwrap());

    // Measure the frequency on channel A with a 100 ms gate time
    inst.set_mode(Mode::FrequencyA).unwrap();
    inst.set_gate_time(Duration::from_millis(100)).unwrap();
    println!("Gate time: {:?}", inst.get_gate_time().unwrap());
    println!("Reading: {:?}", inst.measure(false).unwrap());

    // One-shot reading, wait for it to be done
    inst.set_rate(Rate::OneShot).unwrap();
    inst.trigger_and_wait(Some(Duration::from_secs(2))).unwrap();
    println!("Reading: {:?}", inst.measure(false).unwrap());
    println!("Error status: {}", inst.get_error_status().unwrap());
}
