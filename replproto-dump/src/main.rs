use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use clap::Parser as ClapParser;
use replproto::Parser;

#[derive(ClapParser)]
#[command(author, version, about = "replproto-dump: decode a capture file of raw packets")]
struct Args {
    /// capture file: a sequence of (u32 little-endian length, length bytes) records
    #[arg(short, long)]
    input: String,

    /// re-encode every decoded value and assert the bits match before continuing
    #[arg(long, default_value_t = false)]
    debug_roundtrip: bool,

    /// print only part/payload summaries, not individual properties
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let file = File::open(&args.input).unwrap_or_else(|e| {
        eprintln!("couldn't open {}: {e}", args.input);
        std::process::exit(1);
    });
    let mut reader = BufReader::new(file);
    let mut parser = Parser::with_debug_roundtrip(args.debug_roundtrip);

    let mut record = 0usize;
    loop {
        let len = match reader.read_u32::<LittleEndian>() {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => {
                eprintln!("record {record}: couldn't read length prefix: {e}");
                break;
            }
        };

        let mut buf = vec![0u8; len as usize];
        if let Err(e) = reader.read_exact(&mut buf) {
            eprintln!("record {record}: couldn't read {len} bytes: {e}");
            break;
        }

        match parser.decode(&buf) {
            Ok(packet) => {
                println!("--- record {record} ---");
                println!("{}", packet.describe(!args.quiet));
            }
            Err(err) => {
                eprintln!("record {record}: packet-fatal error: {err}");
                if !args.quiet {
                    hexdump::hexdump(&buf);
                }
            }
        }

        record += 1;
    }
}
