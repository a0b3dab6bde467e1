use embassy_futures::join::join3;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::driver::{Driver, EndpointError};
use static_cell::StaticCell;

use super::{USB_RX, USB_TX, UsbPacket};
use crate::status;
use crate::usb::{self, UsbDeviceStorage, UsbDeviceStrings};

static USB_STORAGE: StaticCell<UsbDeviceStorage> = StaticCell::new();
static EP_OUT_BUFFER: StaticCell<[u8; usb::EP_OUT_BUFFER_LEN]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    OTG_FS => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB_OTG_FS>;
});

#[embassy_executor::task]
pub async fn run(
    otg: Peri<'static, hal::peripherals::USB_OTG_FS>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let mut config = embassy_stm32::usb::Config::default();
    // Bus-powered board without a VBUS sense divider.
    config.vbus_detection = false;

    let driver = embassy_stm32::usb::Driver::new_fs(
        otg,
        UsbIrqs,
        dp,
        dm,
        EP_OUT_BUFFER.init([0; usb::EP_OUT_BUFFER_LEN]),
        config,
    );

    let storage = USB_STORAGE.init(UsbDeviceStorage::new());
    let (mut device, handle) = usb::build(driver, storage, UsbDeviceStrings::default());
    let usb::CdcAcmHandle {
        sender,
        receiver,
        control,
    } = handle;

    join3(device.run(), pump_out(sender, &control), pump_in(receiver)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

/// Copies queued replies to the host while DTR is asserted.
async fn pump_out<D>(mut sender: Sender<'static, D>, control: &ControlChanged<'static>) -> !
where
    D: Driver<'static>,
{
    loop {
        sender.wait_connection().await;
        wait_for_dtr(control, &mut sender).await;
        status::set_usb_attached(true);
        defmt::info!("usb: host attached");

        loop {
            let line = USB_TX.receive().await;
            if !sender.dtr() {
                break;
            }

            match write_line(&mut sender, line.as_bytes()).await {
                Ok(()) => {}
                Err(EndpointError::Disabled) => break,
                Err(_) => defmt::warn!("usb: write error"),
            }
        }

        status::set_usb_attached(false);
        defmt::warn!("usb: host detached");
    }
}

/// Forwards host input to the link task for framing.
async fn pump_in<D>(mut receiver: Receiver<'static, D>) -> !
where
    D: Driver<'static>,
{
    let mut ingress = [0u8; usb::PACKET_LEN];
    loop {
        receiver.wait_connection().await;

        loop {
            match receiver.read_packet(&mut ingress).await {
                Ok(0) => {}
                Ok(count) => {
                    let mut packet = UsbPacket::new();
                    if packet.extend_from_slice(&ingress[..count]).is_err() {
                        defmt::warn!("usb: dropping packet len={} (overflow)", count);
                        continue;
                    }
                    USB_RX.send(packet).await;
                }
                Err(EndpointError::Disabled) => {
                    defmt::warn!("usb: interface disabled");
                    break;
                }
                Err(_) => defmt::warn!("usb: read error"),
            }
        }
    }
}

/// Writes `line` plus CRLF in packet-sized pieces.
async fn write_line<D>(sender: &mut Sender<'static, D>, line: &[u8]) -> Result<(), EndpointError>
where
    D: Driver<'static>,
{
    let mut packet = [0u8; usb::PACKET_LEN];
    let mut len = 0;
    for &byte in line.iter().chain(b"\r\n") {
        packet[len] = byte;
        len += 1;
        if len == packet.len() {
            sender.write_packet(&packet).await?;
            len = 0;
        }
    }
    // A short (possibly empty) packet ends the transfer.
    sender.write_packet(&packet[..len]).await
}

async fn wait_for_dtr<D>(control: &ControlChanged<'static>, sender: &mut Sender<'static, D>)
where
    D: Driver<'static>,
{
    while !sender.dtr() {
        control.control_changed().await;
    }
}
