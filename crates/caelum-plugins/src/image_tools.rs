//! PNG inspection and generation.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind as IoKind};

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::{CaelumError, Result};

pub struct ImageTools;

impl Plugin for ImageTools {
    fn name(&self) -> &str {
        "image_tools"
    }

    fn description(&self) -> &str {
        "Read and write PNG images"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("get image size {path}", "Dimensions of a PNG file", image_size)?;
        reg.command(
            "create blank image {width}x{height} at {path}",
            "Write a white PNG of the given size to a new file",
            blank_image,
        )?;
        Ok(())
    }
}

/// Largest edge accepted by `create blank image`.
const MAX_EDGE: u32 = 8192;

fn image_size(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let path = inv.args.require("path")?;
    let decoder = png::Decoder::new(File::open(path)?);
    let reader = decoder
        .read_info()
        .map_err(|e| CaelumError::Handler(format!("{path}: not a readable PNG ({e})")))?;
    let info = reader.info();
    Ok(CommandOutput::text(format!(
        "{}x{} pixels ({:?}, {}-bit)",
        info.width, info.height, info.color_type, info.bit_depth as u8
    )))
}

fn blank_image(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let width: u32 = inv.args.parse("width")?;
    let height: u32 = inv.args.parse("height")?;
    let path = inv.args.require("path")?;
    if !(1..=MAX_EDGE).contains(&width) || !(1..=MAX_EDGE).contains(&height) {
        return Err(CaelumError::invalid(format!(
            "image edges must be between 1 and {MAX_EDGE} pixels"
        )));
    }

    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == IoKind::AlreadyExists => {
            return Err(CaelumError::Handler(format!("{path} already exists")));
        },
        Err(e) => return Err(e.into()),
    };
    let writer = BufWriter::new(file);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let encode_err = |e: png::EncodingError| CaelumError::Handler(format!("{path}: {e}"));
    let mut png_writer = encoder.write_header().map_err(encode_err)?;
    let pixels = vec![0xFFu8; width as usize * height as usize * 4];
    png_writer.write_image_data(&pixels).map_err(encode_err)?;
    png_writer.finish().map_err(encode_err)?;

    Ok(CommandOutput::text(format!(
        "Created {width}x{height} image at {path}"
    )))
}
