//! This example prints the block layout of a GIF file.
//!
//! Basic usage: `cargo run --example dump -- GIF_FILE`
//!
//! More usage and arguments can be listed by running `cargo run --example dump -- --help`

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgEnum, Parser};
use giflayout::{DecodeOptions, GifLayout, ScanMode};

#[derive(Clone, Copy, ArgEnum)]
enum Scan {
    /// Look for every image separator byte
    Bytes,
    /// Follow the block structure
    Blocks,
}

#[derive(Parser)]
struct Args {
    /// How image blocks are located
    #[clap(long, arg_enum, default_value = "bytes")]
    scan: Scan,

    /// Print every palette entry
    #[clap(long)]
    palette: bool,

    /// Stop after this many images
    #[clap(long)]
    max_images: Option<usize>,

    /// GIF file
    gif_file: PathBuf,
}

fn print_layout(layout: &GifLayout, show_palette: bool) {
    let header = layout.header();
    let screen = layout.screen_descriptor();
    println!("{}{}", header.signature, header.version);
    println!(
        "screen {}x{}, color resolution {}, background {}, aspect {}",
        screen.width,
        screen.height,
        screen.color_resolution_value(),
        screen.background_color_index,
        screen.pixel_aspect_ratio
    );

    if let Some(table) = layout.global_color_table() {
        println!("global color table: {} entries", table.len());
        if show_palette {
            for (idx, color) in table.iter().enumerate() {
                let lab = color.lab();
                println!(
                    "  {:3} {} L {:6.2} a {:7.2} b {:7.2}",
                    idx,
                    color.hex(),
                    lab.l,
                    lab.a,
                    lab.b
                );
            }
        }
    }

    let control = layout.graphics_control();
    println!(
        "graphics control: disposal {:?}, delay {} ms, transparent {:?}",
        control.disposal(),
        control.delay_ms(),
        control.transparent_index()
    );

    for (idx, image) in layout.images().iter().enumerate() {
        let d = &image.descriptor;
        println!(
            "image {:3} @{:#x}: {}x{}+{}+{} ({} px) interlaced {} local table {} encoded {} bytes",
            idx,
            image.offset,
            d.width,
            d.height,
            d.left,
            d.top,
            d.num_pixels(),
            d.interlace_flag,
            image.local_color_table.as_ref().map_or(0, |t| t.len()),
            image.encoded_data.len()
        );
        if let Some(control) = image.graphics_control {
            println!("          delay {} ms, {:?}", control.delay_ms(), control.disposal());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mode = match args.scan {
        Scan::Bytes => ScanMode::ByteScan,
        Scan::Blocks => ScanMode::BlockWalk,
    };
    let layout = DecodeOptions::new()
        .scan_mode(mode)
        .max_images(args.max_images)
        .decode_file(&args.gif_file)
        .with_context(|| format!("decoding {}", args.gif_file.display()))?;

    print_layout(&layout, args.palette);
    Ok(())
}
