//! JPEG2000 compression of 8-bit sample grids through OpenJPEG.

use openjpeg_sys as opj;
use std::mem;
use std::time::Instant;
use tracing::debug;

mod error;
mod ffi;

pub use error::J2kError;
use ffi::{Codec, Image, Stream};

const J2K_MAGIC: [u8; 4] = [0xFF, 0x4F, 0xFF, 0x51];
const JP2_MAGIC: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];
const MAX_RESOLUTIONS: u32 = 33;
const DEFAULT_LOSSY_RATIO: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jpeg2000Mode {
    /// Reversible 5/3 wavelet, exact reconstruction.
    Lossless,
    /// Irreversible 9/7 wavelet targeting `ratio`:1.
    Lossy { ratio: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jpeg2000Format {
    /// Bare codestream, the payload TIFF readers expect in a strip or tile.
    J2k,
    Jp2,
}

impl Jpeg2000Format {
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&J2K_MAGIC) {
            Some(Self::J2k)
        } else if bytes.starts_with(&JP2_MAGIC) {
            Some(Self::Jp2)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jpeg2000Options {
    pub mode: Jpeg2000Mode,
    pub format: Jpeg2000Format,
    /// Resolution levels, i.e. decomposition levels + 1.
    pub resolutions: u32,
    /// Code-block edge in samples.
    pub code_block: u32,
}

impl Default for Jpeg2000Options {
    fn default() -> Self {
        Self::lossless()
    }
}

impl Jpeg2000Options {
    pub fn lossless() -> Self {
        Self {
            mode: Jpeg2000Mode::Lossless,
            format: Jpeg2000Format::J2k,
            resolutions: 6,
            code_block: 64,
        }
    }

    pub fn lossy(ratio: f32) -> Self {
        Self {
            mode: Jpeg2000Mode::Lossy { ratio },
            ..Self::lossless()
        }
    }

    pub fn with_format(mut self, format: Jpeg2000Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_resolutions(mut self, resolutions: u32) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn with_code_block(mut self, code_block: u32) -> Self {
        self.code_block = code_block;
        self
    }

    pub fn is_lossless(&self) -> bool {
        self.mode == Jpeg2000Mode::Lossless
    }

    /// Lossy counterpart used when a lossy compression code is requested with lossless options.
    pub fn lossy_or_default(&self) -> Self {
        match self.mode {
            Jpeg2000Mode::Lossless => Self {
                mode: Jpeg2000Mode::Lossy {
                    ratio: DEFAULT_LOSSY_RATIO,
                },
                ..*self
            },
            Jpeg2000Mode::Lossy { .. } => *self,
        }
    }

    pub fn validate(&self) -> Result<(), J2kError> {
        if !(1..=MAX_RESOLUTIONS).contains(&self.resolutions) {
            return Err(J2kError::InvalidOptions(format!(
                "resolutions must be in 1..={MAX_RESOLUTIONS}, got {}",
                self.resolutions
            )));
        }
        // OpenJPEG caps code-blocks at 4096 samples
        if !self.code_block.is_power_of_two() || !(4..=64).contains(&self.code_block) {
            return Err(J2kError::InvalidOptions(format!(
                "code block must be a power of two in 4..=64, got {}",
                self.code_block
            )));
        }
        if let Jpeg2000Mode::Lossy { ratio } = self.mode {
            if !ratio.is_finite() || ratio < 1.0 {
                return Err(J2kError::InvalidOptions(format!(
                    "lossy ratio must be >= 1, got {ratio}"
                )));
            }
        }
        Ok(())
    }

    /// Drops resolution levels that the image is too small to hold.
    fn resolutions_for(&self, width: u32, height: u32) -> u32 {
        let smallest = width.min(height);
        let mut resolutions = self.resolutions;
        while resolutions > 1 && (1_u64 << (resolutions - 1)) > smallest as u64 {
            resolutions -= 1;
        }
        resolutions
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub precision: u32,
    /// Interleaved 8-bit samples.
    pub samples: Vec<u8>,
}

/// Compresses interleaved 8-bit samples.
pub fn encode(
    samples: &[u8],
    width: u32,
    height: u32,
    components: u32,
    options: &Jpeg2000Options,
) -> Result<Vec<u8>, J2kError> {
    options.validate()?;
    if !(1..=4).contains(&components) {
        return Err(J2kError::UnsupportedComponents(components));
    }
    if width == 0 || height == 0 {
        return Err(J2kError::EmptyImage);
    }
    let pixels = width as usize * height as usize;
    let expected = pixels * components as usize;
    if samples.len() != expected {
        return Err(J2kError::BufferSize {
            expected,
            actual: samples.len(),
        });
    }

    let t0 = Instant::now();
    let mut params: Vec<opj::opj_image_cmptparm_t> = (0..components)
        .map(|_| {
            let mut p: opj::opj_image_cmptparm_t = unsafe { mem::zeroed() };
            p.dx = 1;
            p.dy = 1;
            p.w = width;
            p.h = height;
            p.prec = 8;
            p.sgnd = 0;
            p
        })
        .collect();
    let color_space = if components >= 3 {
        opj::COLOR_SPACE::OPJ_CLRSPC_SRGB
    } else {
        opj::COLOR_SPACE::OPJ_CLRSPC_GRAY
    };
    let mut image = Image::create(&mut params, color_space)?;
    image.set_bounds(width, height);
    for c in 0..components as usize {
        let plane = image.plane_mut(c).ok_or(J2kError::CodecUnavailable)?;
        for (dst, src) in plane
            .iter_mut()
            .zip(samples.iter().skip(c).step_by(components as usize))
        {
            *dst = *src as i32;
        }
    }

    let mut parameters: opj::opj_cparameters_t = unsafe { mem::zeroed() };
    unsafe { opj::opj_set_default_encoder_parameters(&mut parameters) };
    parameters.tcp_numlayers = 1;
    parameters.cp_disto_alloc = 1;
    match options.mode {
        Jpeg2000Mode::Lossless => {
            parameters.irreversible = 0;
            parameters.tcp_rates[0] = 0.0;
        }
        Jpeg2000Mode::Lossy { ratio } => {
            parameters.irreversible = 1;
            parameters.tcp_rates[0] = ratio;
        }
    }
    parameters.numresolution = options.resolutions_for(width, height) as _;
    parameters.cblockw_init = options.code_block as _;
    parameters.cblockh_init = options.code_block as _;
    parameters.tcp_mct = if components >= 3 { 1 } else { 0 };

    let codec = Codec::compressor(options.format)?;
    let ok = unsafe { opj::opj_setup_encoder(codec.ptr, &mut parameters, image.ptr) };
    if ok == 0 {
        return Err(J2kError::Setup(codec.messages()));
    }

    let stream = Stream::writer()?;
    let ok = unsafe {
        opj::opj_start_compress(codec.ptr, image.ptr, stream.ptr) != 0
            && opj::opj_encode(codec.ptr, stream.ptr) != 0
            && opj::opj_end_compress(codec.ptr, stream.ptr) != 0
    };
    if !ok {
        return Err(J2kError::Encode(codec.messages()));
    }
    let bytes = stream.into_inner();

    debug!(
        "JPEG2000 encoded {width}x{height}x{components} ({:?}, {} resolutions) into {} bytes in {:.3}ms",
        options.mode,
        parameters.numresolution,
        bytes.len(),
        t0.elapsed().as_secs_f64() * 1e3
    );
    Ok(bytes)
}

/// Decompresses a J2K codestream or JP2 file into interleaved 8-bit samples.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, J2kError> {
    let format = Jpeg2000Format::detect(bytes).ok_or(J2kError::UnknownFormat)?;
    let t0 = Instant::now();

    let codec = Codec::decompressor(format)?;
    let mut parameters: opj::opj_dparameters_t = unsafe { mem::zeroed() };
    unsafe { opj::opj_set_default_decoder_parameters(&mut parameters) };
    if unsafe { opj::opj_setup_decoder(codec.ptr, &mut parameters) } == 0 {
        return Err(J2kError::Setup(codec.messages()));
    }

    let stream = Stream::reader(bytes.to_vec())?;
    let mut image_ptr: *mut opj::opj_image_t = std::ptr::null_mut();
    let header_ok = unsafe { opj::opj_read_header(stream.ptr, codec.ptr, &mut image_ptr) } != 0;
    let image = Image { ptr: image_ptr };
    if !header_ok || image.ptr.is_null() {
        return Err(J2kError::Decode(codec.messages()));
    }
    let ok = unsafe {
        opj::opj_decode(codec.ptr, stream.ptr, image.ptr) != 0
            && opj::opj_end_decompress(codec.ptr, stream.ptr) != 0
    };
    if !ok {
        return Err(J2kError::Decode(codec.messages()));
    }

    let decoded = interleave(&image)?;
    debug!(
        "JPEG2000 decoded {}x{}x{} from {} bytes in {:.3}ms",
        decoded.width,
        decoded.height,
        decoded.components,
        bytes.len(),
        t0.elapsed().as_secs_f64() * 1e3
    );
    Ok(decoded)
}

fn interleave(image: &Image) -> Result<DecodedImage, J2kError> {
    let comps = image.components();
    let first = comps.first().ok_or(J2kError::UnsupportedComponents(0))?;
    let (width, height) = (first.w, first.h);
    let components = comps.len() as u32;
    for comp in comps {
        if comp.w != width || comp.h != height || comp.dx != 1 || comp.dy != 1 {
            return Err(J2kError::UnsupportedComponents(components));
        }
        if comp.prec > 8 || comp.sgnd != 0 {
            return Err(J2kError::UnsupportedPrecision(comp.prec));
        }
    }

    let pixels = width as usize * height as usize;
    let mut samples = vec![0_u8; pixels * comps.len()];
    for c in 0..comps.len() {
        let plane = image.plane(c).ok_or(J2kError::Decode(vec![]))?;
        for (i, v) in plane.iter().enumerate() {
            samples[i * comps.len() + c] = (*v).clamp(0, 255) as u8;
        }
    }

    Ok(DecodedImage {
        width,
        height,
        components,
        precision: first.prec,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> Vec<u8> {
        (0..height)
            .flat_map(|_| (0..width).map(|x| (x % 256) as u8))
            .collect()
    }

    #[test]
    fn lossless_codestream_is_exact() {
        let samples = ramp(64, 32);
        let bytes = encode(&samples, 64, 32, 1, &Jpeg2000Options::lossless()).unwrap();
        assert_eq!(Jpeg2000Format::detect(&bytes), Some(Jpeg2000Format::J2k));

        let decoded = decode(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (64, 32));
        assert_eq!(decoded.components, 1);
        assert_eq!(decoded.precision, 8);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn jp2_container_is_detected_and_decoded() {
        let samples = ramp(40, 40);
        let options = Jpeg2000Options::lossless().with_format(Jpeg2000Format::Jp2);
        let bytes = encode(&samples, 40, 40, 1, &options).unwrap();
        assert_eq!(Jpeg2000Format::detect(&bytes), Some(Jpeg2000Format::Jp2));
        assert_eq!(decode(&bytes).unwrap().samples, samples);
    }

    #[test]
    fn rgb_is_interleaved() {
        let samples: Vec<u8> = (0..16 * 16)
            .flat_map(|i| [(i % 256) as u8, 255 - (i % 256) as u8, 7])
            .collect();
        let bytes = encode(&samples, 16, 16, 3, &Jpeg2000Options::lossless()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.components, 3);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn tiny_images_drop_resolutions() {
        let options = Jpeg2000Options::lossless();
        assert_eq!(options.resolutions_for(256, 256), 6);
        assert_eq!(options.resolutions_for(256, 3), 2);
        assert_eq!(options.resolutions_for(1, 1), 1);

        let samples = ramp(5, 1);
        let bytes = encode(&samples, 5, 1, 1, &options).unwrap();
        assert_eq!(decode(&bytes).unwrap().samples, samples);
    }

    #[test]
    fn bad_options_are_rejected() {
        let samples = ramp(8, 8);
        for options in [
            Jpeg2000Options::lossless().with_code_block(48),
            Jpeg2000Options::lossless().with_code_block(128),
            Jpeg2000Options::lossless().with_resolutions(0),
            Jpeg2000Options::lossy(0.5),
        ] {
            assert!(matches!(
                encode(&samples, 8, 8, 1, &options),
                Err(J2kError::InvalidOptions(_))
            ));
        }
    }

    #[test]
    fn buffer_must_match_dimensions() {
        let result = encode(&[0; 10], 4, 4, 1, &Jpeg2000Options::lossless());
        assert_eq!(
            result,
            Err(J2kError::BufferSize {
                expected: 16,
                actual: 10
            })
        );
        assert_eq!(
            encode(&[], 0, 4, 1, &Jpeg2000Options::lossless()),
            Err(J2kError::EmptyImage)
        );
        assert_eq!(
            encode(&[0; 80], 4, 4, 5, &Jpeg2000Options::lossless()),
            Err(J2kError::UnsupportedComponents(5))
        );
    }

    #[test]
    fn garbage_is_not_jpeg2000() {
        assert_eq!(decode(b"not a codestream"), Err(J2kError::UnknownFormat));
        let truncated = [0xFF, 0x4F, 0xFF, 0x51, 0x00];
        assert!(matches!(decode(&truncated), Err(J2kError::Decode(_))));
    }

    #[test]
    fn lossy_upgrade_keeps_other_settings() {
        let options = Jpeg2000Options::lossless().with_resolutions(4);
        let lossy = options.lossy_or_default();
        assert_eq!(lossy.mode, Jpeg2000Mode::Lossy { ratio: 10.0 });
        assert_eq!(lossy.resolutions, 4);
        assert_eq!(Jpeg2000Options::lossy(20.0).lossy_or_default().mode, Jpeg2000Mode::Lossy { ratio: 20.0 });
    }
}
