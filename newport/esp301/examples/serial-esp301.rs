use std::time::Duration;

use measurements::Length;
use newport_esp301::{Esp301, HomeSearchMode, SerialInterfaceEsp301};

fn main() {
    env_logger::init();

    let port = "/dev/ttyUSB0";

    // Get our serial instrument interface
    let serial_inst = SerialInterfaceEsp301::simple(port).expect("Failed to open serial port");

    // Now we can open the ESP-301 with the serial interface. Only one stage is connected.
    let mut esp = Esp301::try_new(serial_inst).unwrap();
    esp.set_num_axes(1).unwrap();

    let mut axis = esp.get_axis(0).unwrap();
    println!("Axis {} is configured in {}", axis.get_axis_id(), axis.unit());

    axis.set_motor_power(true).unwrap();
    axis.search_for_home(HomeSearchMode::HomeSwitch).unwrap();
    axis.wait_for_motion(Duration::from_millis(10), Some(Duration::from_secs(60)))
        .unwrap();

    // Move by 1.5 mm, then back by 0.5 units
    axis.move_to(Length::from_millimeters(1.5), false).unwrap();
    axis.wait_for_motion(Duration::from_millis(10), None).unwrap();
    axis.move_to(-0.5, false).unwrap();
    axis.wait_for_motion(Duration::from_millis(10), None).unwrap();

    println!("Position: {:?}", axis.get_position().unwrap());
}
