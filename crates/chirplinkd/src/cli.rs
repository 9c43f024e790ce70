//! Command-line surface for `chirplinkd`.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "chirplinkd", about = "Acoustic link transport session daemon")]
pub struct Args {
    /// Input audio device index. Defaults to the system default input device.
    #[arg(short = 'i', long = "input-device")]
    pub input_device: Option<u32>,

    /// Output audio device index. Defaults to the system default output device.
    #[arg(short = 'o', long = "output-device")]
    pub output_device: Option<u32>,

    /// Output volume, 0-100.
    #[arg(short = 'v', long = "volume", default_value_t = 50)]
    pub volume: u8,

    /// Modem protocol identifier.
    #[arg(short = 'p', long = "protocol", default_value_t = 1)]
    pub protocol: u32,

    /// List available audio devices and exit.
    #[arg(short = 'l', long = "list")]
    pub list: bool,
}
