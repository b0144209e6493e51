use api::EyeRegion;
use thiserror::Error;

/// Side length of the per-eye crop the model was trained on.
pub const EYE_PATCH: usize = 95;

const CHANNELS: usize = 4;

/// Batch, height, concatenated width, RGBA channels.
pub const TENSOR_SHAPE: [usize; 4] = [1, EYE_PATCH, EYE_PATCH * 2, CHANNELS];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    /// Expected at low camera resolutions; the caller skips the frame.
    #[error("eye region {width}x{height} is below the {min}x{min} minimum")]
    RegionTooSmall { width: u32, height: u32, min: u32 },
    /// The detector broke its own contract; the frame is still just skipped.
    #[error("eye region claims {width}x{height} but carries {actual} bytes")]
    MalformedBuffer {
        width: u32,
        height: u32,
        actual: usize,
    },
}

/// Model input, produced fresh per inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct GazeTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl GazeTensor {
    pub fn from_parts(shape: [usize; 4], data: Vec<f32>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Crop both regions to their top-left 95x95x4 block, concatenate them along
/// the horizontal axis and prepend a batch dimension. Larger buffers are
/// truncated, never scaled: the model expects hard crops, and identical
/// inputs must produce a bit-identical tensor.
pub fn preprocess(first: &EyeRegion, second: &EyeRegion) -> Result<GazeTensor, PreprocessError> {
    check_region(first)?;
    check_region(second)?;

    let mut data = Vec::with_capacity(TENSOR_SHAPE.iter().product());
    for row in 0..EYE_PATCH {
        copy_row(&mut data, first, row);
        copy_row(&mut data, second, row);
    }

    Ok(GazeTensor::from_parts(TENSOR_SHAPE, data))
}

fn check_region(region: &EyeRegion) -> Result<(), PreprocessError> {
    if (region.width as usize) < EYE_PATCH || (region.height as usize) < EYE_PATCH {
        return Err(PreprocessError::RegionTooSmall {
            width: region.width,
            height: region.height,
            min: EYE_PATCH as u32,
        });
    }
    if region.pixels.len() != region.expected_len() {
        return Err(PreprocessError::MalformedBuffer {
            width: region.width,
            height: region.height,
            actual: region.pixels.len(),
        });
    }
    Ok(())
}

fn copy_row(data: &mut Vec<f32>, region: &EyeRegion, row: usize) {
    let stride = region.width as usize * CHANNELS;
    let start = row * stride;
    for &byte in &region.pixels[start..start + EYE_PATCH * CHANNELS] {
        data.push(byte as f32);
    }
}
