use measurements::Frequency;
use wavetek_39a::{AmplitudeUnit, Function, SerialInterfaceWavetek39A, Wavetek39A};

fn main() {
    env_logger::init();

    let port = "/dev/ttyUSB0";

    // Get our serial instrument interface
    let serial_inst = SerialInterfaceWavetek39A::simple(port).expect("Failed to open serial port");

    // Now we can open the Wavetek 39A with the serial interface.
    let mut fg = Wavetek39A::try_new(serial_inst).unwrap();
    println!("Instrument ID: {}", fg.get_name().unwrap());

    // 1 MHz sine, 2 Vpp, 0.5 V offset
    fg.set_function(Function::Sine).unwrap();
    fg.set_frequency(Frequency::from_megahertz(1.0)).unwrap();
    fg.set_amplitude(2.0, AmplitudeUnit::PeakToPeak).unwrap();
    fg.set_offset(0.5).unwrap();
    fg.set_output(true).unwrap();
}
