//! USB CDC ACM device that mirrors the protocol port.
//!
//! The host sees one virtual serial port. Lines typed there are framed the
//! same way as UART input, and every reply sent on the UART is copied here
//! while a terminal holds DTR.

use embassy_usb::class::cdc_acm::{CdcAcmClass, ControlChanged, Receiver, Sender, State};
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Config, UsbDevice};

pub const MAX_PACKET_SIZE: u16 = 64;
/// [`MAX_PACKET_SIZE`] as a buffer length.
pub const PACKET_LEN: usize = 64;

const CONTROL_BUFFER_LEN: usize = 64;
const CONFIG_DESCRIPTOR_LEN: usize = 256;
const BOS_DESCRIPTOR_LEN: usize = 256;
const MSOS_DESCRIPTOR_LEN: usize = 256;

/// Size of the OTG FS endpoint OUT buffer.
pub const EP_OUT_BUFFER_LEN: usize = 256;

/// User-visible strings advertised in the USB descriptors.
#[derive(Clone, Copy, Debug)]
pub struct UsbDeviceStrings {
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: Option<&'static str>,
}

impl Default for UsbDeviceStrings {
    fn default() -> Self {
        Self {
            manufacturer: "Weld Brain",
            product: "Spot Weld Controller",
            serial_number: None,
        }
    }
}

/// Backing storage for the Embassy USB builder and the CDC ACM class.
pub struct UsbDeviceStorage {
    control_buf: [u8; CONTROL_BUFFER_LEN],
    config_descriptor: [u8; CONFIG_DESCRIPTOR_LEN],
    bos_descriptor: [u8; BOS_DESCRIPTOR_LEN],
    msos_descriptor: [u8; MSOS_DESCRIPTOR_LEN],
    state: State<'static>,
}

impl UsbDeviceStorage {
    pub fn new() -> Self {
        Self {
            control_buf: [0; CONTROL_BUFFER_LEN],
            config_descriptor: [0; CONFIG_DESCRIPTOR_LEN],
            bos_descriptor: [0; BOS_DESCRIPTOR_LEN],
            msos_descriptor: [0; MSOS_DESCRIPTOR_LEN],
            state: State::new(),
        }
    }
}

/// Split handles for the CDC ACM interface.
pub struct CdcAcmHandle<D: Driver<'static>> {
    pub sender: Sender<'static, D>,
    pub receiver: Receiver<'static, D>,
    pub control: ControlChanged<'static>,
}

/// Builds the device and its single CDC ACM interface.
pub fn build<D: Driver<'static>>(
    driver: D,
    storage: &'static mut UsbDeviceStorage,
    strings: UsbDeviceStrings,
) -> (UsbDevice<'static, D>, CdcAcmHandle<D>) {
    let mut config = Config::new(0x1209, 0x0001);
    config.manufacturer = Some(strings.manufacturer);
    config.product = Some(strings.product);
    config.serial_number = strings.serial_number;
    config.max_packet_size_0 = 64;
    config.max_power = 100;

    let mut builder = Builder::new(
        driver,
        config,
        &mut storage.config_descriptor,
        &mut storage.bos_descriptor,
        &mut storage.msos_descriptor,
        &mut storage.control_buf,
    );

    let class = CdcAcmClass::new(&mut builder, &mut storage.state, MAX_PACKET_SIZE);
    let (sender, receiver, control) = class.split_with_control();

    (
        builder.build(),
        CdcAcmHandle {
            sender,
            receiver,
            control,
        },
    )
}
