//! Copies the presented colour target back to the CPU.

use std::sync::mpsc;

use crate::gpu::GpuContext;
use crate::screenshot::{Framebuffer, RGB_CHANNELS, RowOrigin, ScreenshotError};

/// Bytes per texel of the readable surface formats.
const BYTES_PER_TEXEL: u32 = 4;

/// Channel order of a readable 8-bit surface format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelOrder {
    Rgba,
    Bgra,
}

impl ChannelOrder {
    fn of(format: wgpu::TextureFormat) -> Option<Self> {
        match format {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
                Some(Self::Rgba)
            }
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
                Some(Self::Bgra)
            }
            _ => None,
        }
    }

    fn rgb(self, texel: &[u8]) -> [u8; 3] {
        match self {
            Self::Rgba => [texel[0], texel[1], texel[2]],
            Self::Bgra => [texel[2], texel[1], texel[0]],
        }
    }
}

/// Row pitch of a copy, padded to wgpu's required alignment.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_TEXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strips row padding and alpha from mapped texels.
fn pack_rgb(mapped: &[u8], width: u32, height: u32, padded: u32, order: ChannelOrder) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * RGB_CHANNELS);
    let row_bytes = (width * BYTES_PER_TEXEL) as usize;
    for row in mapped.chunks(padded as usize).take(height as usize) {
        for texel in row[..row_bytes].chunks_exact(BYTES_PER_TEXEL as usize) {
            pixels.extend_from_slice(&order.rgb(texel));
        }
    }
    pixels
}

/// Reads `texture` (the current surface texture) into an RGB framebuffer.
///
/// Must be called after the frame was submitted and before it is presented.
/// Texture copies deliver the visual top row first.
pub fn read_surface(
    gpu: &GpuContext,
    texture: &wgpu::Texture,
) -> Result<Framebuffer, ScreenshotError> {
    if !gpu.supports_readback() {
        return Err(ScreenshotError::ReadbackUnsupported);
    }
    let format = texture.format();
    let order = ChannelOrder::of(format).ok_or(ScreenshotError::UnsupportedFormat(format))?;

    let width = texture.width();
    let height = texture.height();
    let padded = padded_bytes_per_row(width);

    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Screenshot Readback Buffer"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Screenshot Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| ScreenshotError::Map(e.to_string()))?;
    rx.recv()
        .map_err(|e| ScreenshotError::Map(e.to_string()))?
        .map_err(|e| ScreenshotError::Map(e.to_string()))?;

    let pixels = {
        let mapped = slice.get_mapped_range();
        pack_rgb(&mapped, width, height, padded, order)
    };
    staging.unmap();

    Framebuffer::new(width, height, RowOrigin::TopLeft, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(800), 3328);
    }

    #[test]
    fn bgra_is_swizzled_and_padding_dropped() {
        // 1x2 image, each row padded to 8 bytes.
        let mapped = [3, 2, 1, 255, 9, 9, 9, 9, 6, 5, 4, 255, 9, 9, 9, 9];
        let pixels = pack_rgb(&mapped, 1, 2, 8, ChannelOrder::Bgra);
        assert_eq!(pixels, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn rgba_keeps_channel_order() {
        let mapped = [1, 2, 3, 255, 4, 5, 6, 255];
        let pixels = pack_rgb(&mapped, 2, 1, 8, ChannelOrder::Rgba);
        assert_eq!(pixels, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn only_eight_bit_colour_formats_are_readable() {
        assert_eq!(
            ChannelOrder::of(wgpu::TextureFormat::Bgra8UnormSrgb),
            Some(ChannelOrder::Bgra)
        );
        assert_eq!(ChannelOrder::of(wgpu::TextureFormat::Rgba16Float), None);
    }
}
