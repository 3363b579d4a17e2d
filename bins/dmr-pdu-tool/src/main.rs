use clap::Parser;

use dmr_core::defines::DMR_FRAME_LENGTH_BYTES;

mod entities;
use entities::burst::{Burst, BurstParser};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "DMR Raw PDU Decoder",
    long_about = "Decodes captured DMR bursts, homebrew DMRD packets or MMDVM frames given as hex"
)]
struct Args {
    /// What the hex input holds
    #[arg(
        help = "Input kind: [ burst | voice | dmrd | mmdvm ]"
    )]
    kind: String,

    /// Hex input, one argument per burst for `voice`
    #[arg(
        required = true,
        help = "Hex bytes, spaces and colons are ignored"
    )]
    hex: Vec<String>,
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = s.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {:?}", s));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).map_err(|_| format!("invalid hex byte {:?}", byte))
        })
        .collect()
}

fn parse_burst_arg(s: &str) -> Burst {
    let bytes = parse_hex(s).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let Ok(burst) = Burst::try_from(bytes.as_slice()) else {
        eprintln!("Error: a burst is {} bytes, got {}", DMR_FRAME_LENGTH_BYTES, bytes.len());
        std::process::exit(1);
    };
    burst
}

fn main() {
    eprintln!("[+] DMR PDU Decoding tool");
    eprintln!(" *  For testing only  *");

    let args = Args::parse();

    match args.kind.to_lowercase().as_str() {
        "burst" => {
            for hex in &args.hex {
                BurstParser::parse_burst(&parse_burst_arg(hex));
            }
        }
        "voice" => {
            let bursts: Vec<Burst> = args.hex.iter().map(|h| parse_burst_arg(h)).collect();
            BurstParser::parse_voice(&bursts);
        }
        kind @ ("dmrd" | "mmdvm") => {
            let joined = args.hex.join("");
            let bytes = match parse_hex(&joined) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if kind == "dmrd" {
                BurstParser::parse_dmrd(&bytes);
            } else {
                BurstParser::parse_mmdvm(&bytes);
            }
        }
        _ => {
            eprintln!("Error: Unsupported input kind '{}'", args.kind);
            eprintln!("Supported: burst voice dmrd mmdvm");
            std::process::exit(1);
        }
    };
}
