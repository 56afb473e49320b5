//! Command-line driver for the CRED ramp reducer.
//!
//! The real shared-memory image substrate (spec §1/§6) is out of scope for
//! this crate, so both subcommands here drive the engine against the
//! in-memory streams from `cred-ramp-reduce-sim`, synthesizing a short ramp
//! sequence to exercise and demonstrate the reduction — the same role
//! `ci2-simple-demo` plays for camera backends it has no real hardware for.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use cred_ramp_reduce::bayer::{split_bayer, BayerModeTable};
use cred_ramp_reduce::{CloseOutcome, RampEngine};
use cred_ramp_reduce_sim::{RawBuffer, VecInputStream, VecOutputStream};

/// CRED ramp reduction and Bayer channel utilities
#[derive(Debug, Parser)]
#[command(name = "cred-ramp-reduce", author, version)]
enum Command {
    /// reduce a synthesized NDR ramp and print the resulting frame
    CredQlAndUtr(CredQlAndUtr),
    /// split a synthesized Bayer frame into its four channels
    ExtractRggbChan(ExtractRggbChan),
}

#[derive(Debug, Parser)]
struct CredQlAndUtr {
    /// frame width in pixels
    #[arg(long, default_value = "64")]
    width: u32,

    /// frame height in pixels
    #[arg(long, default_value = "64")]
    height: u32,

    /// number of non-destructive reads per ramp
    #[arg(long, default_value = "8")]
    ndr: i64,

    /// saturation threshold
    #[arg(long, default_value = "16000")]
    sat_value: f32,
}

#[derive(Debug, Parser)]
struct ExtractRggbChan {
    /// frame width in pixels, must be even
    #[arg(long, default_value = "8")]
    width: u32,

    /// frame height in pixels, must be even
    #[arg(long, default_value = "4")]
    height: u32,

    /// YAML file overriding the built-in size -> Bayer mode table
    #[arg(long)]
    bayer_modes_file: Option<PathBuf>,
}

fn run_cred_ql_and_utr(args: CredQlAndUtr) -> anyhow::Result<()> {
    let n_pixels = (args.width * args.height) as usize;
    let mut input = VecInputStream::new(args.width, args.height, cred_ramp_reduce::RawKind::U16);

    for t in 0..args.ndr {
        let mut buf = vec![0u16; n_pixels];
        buf[2] = (args.ndr - 1 - t) as u16; // tag[2]: NDR index, decreasing
        buf[3] = 0x0000; // tag[3]: sync word, U16 convention
        for px in buf.iter_mut().skip(8) {
            *px = (1000 + t * 10) as u16;
        }
        buf[0] = t as u16; // tag[0]: frame counter
        input.push_frame(RawBuffer::U16(buf), args.ndr);
    }

    let mut output = VecOutputStream::new();
    let mut engine = RampEngine::new(args.width, args.height)?;

    while !input.is_exhausted() {
        input.wait_next_frame()?;
        let outcome = engine.process_frame(&input, &mut output, args.sat_value)?;
        if outcome == CloseOutcome::Published {
            info!(mode = ?engine.mode(), "published reduced frame");
        }
    }

    if let Some(frame) = output.published.last() {
        println!("reduced pixel[8] = {}", frame.pixels[8]);
        println!("telemetry (ndr_effective, cred_init_idx, frame_init_idx, miss_count) = {:?}",
            &frame.pixels[4..8]);
    } else {
        println!("no frame published (ramp never closed)");
    }

    Ok(())
}

fn run_extract_rggbchan(args: ExtractRggbChan) -> anyhow::Result<()> {
    let table = match args.bayer_modes_file {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&text)?
        }
        None => BayerModeTable::default(),
    };
    let mode = table.resolve(args.width, args.height);

    let n_pixels = (args.width * args.height) as usize;
    let src: Vec<f32> = (0..n_pixels).map(|i| i as f32).collect();
    let channels = split_bayer(&src, args.width, args.height, mode);

    println!(
        "split {}x{} -> 4x {}x{} channels",
        args.width, args.height, channels.width, channels.height
    );
    println!("R  = {:?}", channels.r);
    println!("G1 = {:?}", channels.g1);
    println!("G2 = {:?}", channels.g2);
    println!("B  = {:?}", channels.b);

    Ok(())
}

fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "cred_ramp_reduce=info,warn");
    }
    let _tracing_guard = env_tracing_logger::init();

    match Command::parse() {
        Command::CredQlAndUtr(args) => run_cred_ql_and_utr(args),
        Command::ExtractRggbChan(args) => run_extract_rggbchan(args),
    }
}
