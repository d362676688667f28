//! Device registries for serial human interface devices.
//!
//! Each device pairs a [`Decoder`](serialhid_frame::Decoder) with the framing
//! its wire format needs:
//! - [`JoystickDevice`]: `"[x = 10, y = 20, b = 1]\n\r"` text frames
//! - [`AnalogDevice`]: an ADC sample of 8 to 64 bits, one byte per clock
//! - [`GpioDevice`]: eight digital pins in one byte
//! - [`MouseDevice`]: a 4-byte standard mouse report

pub mod analog;
pub mod device;
pub mod error;
pub mod gpio;
pub mod joystick;
pub mod mouse;

pub use analog::{AnalogDevice, AnalogReport, DEFAULT_RESOLUTION};
pub use device::HidDevice;
pub use error::{DeviceError, Result};
pub use gpio::{GpioDevice, GpioReport, GPIO_PINS};
pub use joystick::{JoystickDevice, JoystickReport, JOYSTICK_TERMINATOR};
pub use mouse::{MouseButtons, MouseDevice, MouseReport, Pointer};
