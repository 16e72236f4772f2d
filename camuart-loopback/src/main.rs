//! # Loopback Demo for the Camera Serial Bridge
//!
//! Drives a full serial session against the in-memory loopback device:
//! configure the line mapping and frame format, write a message, read it
//! back from the looped RX side, and report the line status.

use std::error::Error;
use std::time::Duration;

use camuart_bridge::bridge::Builder;
use camuart_bridge::config::FrameConfig;
use camuart_device::Transport;
use camuart_loopback::LoopbackDevice;
use clap::Parser;
use env_logger::Env;

#[derive(Parser)]
#[command(about = "Loopback demo for the camera GPIO software UART", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    #[arg(long, default_value = "8")]
    data_bits: u8,

    #[arg(short, long, default_value = "none")]
    parity: String,

    #[arg(long, default_value = "1")]
    stop_bits: u8,

    #[arg(long, default_value = "Line2", help = "Input line the RX signal is sampled from")]
    rx: String,

    #[arg(long, default_value = "Line3", help = "Output line the TX signal is driven onto")]
    tx: String,

    #[arg(long, help = "Emulate a GigE transport (4-byte aligned register access)")]
    gige: bool,

    #[arg(short, long, default_value = "hello from the camera uart")]
    message: String,

    #[arg(long, default_value = "1000", help = "Timeout in milliseconds")]
    timeout_ms: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let transport = if args.gige {
        Transport::GigE
    } else {
        Transport::Usb3
    };
    log::info!("Starting loopback session over {:?}", transport);

    let frame = FrameConfig::new(args.baud, args.data_bits, args.parity.parse()?, args.stop_bits);
    let mut port = Builder::new()
        .rx_source(args.rx.as_str())
        .tx_sink(args.tx.as_str())
        .frame(frame)
        .timeout(Duration::from_millis(args.timeout_ms))
        .build(LoopbackDevice::new(transport))?;
    log::info!(
        "Port configured: {} on RX {}, TX {}",
        port.frame(),
        port.line().rx_source,
        port.line().tx_sink
    );

    let sent = port.write(args.message.as_bytes(), true)?;
    log::info!("Sent {sent} bytes");

    let echoed = port.read(sent)?;
    println!("{}", String::from_utf8_lossy(&echoed));

    let flags = port.check_status(false)?;
    if flags.is_empty() {
        log::info!("Line status clean");
    } else {
        log::warn!("Line status: {flags:?}");
    }

    port.reset()?;
    port.close(false)?;
    Ok(())
}
