use super::OutputSink;
use crate::frame::Frame;
use anyhow::{Context, Result};
use image::imageops;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Writes YUYV frames to a v4l2loopback device.
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Announce the format to readers; some loopback setups pin it up front
        match Device::with_path(path) {
            Ok(device) => {
                let format = Format::new(width, height, FourCC::new(b"YUYV"));
                if let Err(e) = Output::set_format(&device, &format) {
                    tracing::warn!("Could not set loopback format: {}", e);
                }
            }
            Err(e) => tracing::warn!("Could not query loopback device: {}", e),
        }

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width,
            height,
            buffer: Vec::with_capacity((width * height * 2) as usize),
        })
    }
}

/// Pack an RGBA frame as YUV 4:2:2 (YUYV). Alpha is ignored.
fn rgba_to_yuyv(frame: &Frame, yuyv: &mut Vec<u8>) {
    let (width, height) = frame.dimensions();
    yuyv.clear();

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let pixel1 = frame.get_pixel(x, y);
            let pixel2 = if x + 1 < width {
                frame.get_pixel(x + 1, y)
            } else {
                pixel1
            };

            let (y1, u1, v1) = rgb_to_yuv(pixel1[0], pixel1[1], pixel1[2]);
            let (y2, u2, v2) = rgb_to_yuv(pixel2[0], pixel2[1], pixel2[2]);

            // Chroma is shared by the pixel pair
            let u = ((u1 as u16 + u2 as u16) / 2) as u8;
            let v = ((v1 as u16 + v2 as u16) / 2) as u8;

            yuyv.extend_from_slice(&[y1, u, y2, v]);
        }
    }
}

fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = r as f32;
    let g = g as f32;
    let b = b as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            let resized = imageops::resize(
                frame,
                self.width,
                self.height,
                imageops::FilterType::Triangle,
            );
            rgba_to_yuyv(&resized, &mut self.buffer);
        } else {
            rgba_to_yuyv(frame, &mut self.buffer);
        }

        self.file
            .write_all(&self.buffer)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
