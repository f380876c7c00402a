use gradtiff::{
    gradient, max_abs_error, verify, write_gradient, Compression, CompressionError, Decoder,
    EncodeError, Encoder, GradTiffError, Jpeg2000Options, Raster, SampleFormat, TagId,
};
use std::io::Cursor;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("gradtiff-{}-{name}", std::process::id()))
}

#[test]
fn gradient_matches_column_index() {
    let raster = gradient();
    assert_eq!(raster.dimensions, (256, 256));
    assert_eq!(raster.bits_per_sample, vec![8]);
    assert_eq!(raster.sample_format, vec![SampleFormat::Unsigned]);
    for y in 0..256 {
        for x in 0..256 {
            assert_eq!(raster.get_pixel(x, y), Some(&[(x % 256) as u8][..]));
        }
    }
}

#[test]
fn fixture_file_round_trips_losslessly() {
    let path = temp_path("lossless.tiff");
    write_gradient(&path, Jpeg2000Options::lossless()).unwrap();

    let mut decoder = Decoder::open(&path).unwrap();
    assert_eq!(decoder.compression().unwrap(), Compression::Jpeg2000Olympus);
    let ifd = decoder.tiff().first_ifd().unwrap();
    assert_eq!(ifd.get_tag_value::<u16>(TagId::BitsPerSample).unwrap(), 8);
    assert_eq!(ifd.get_tag_value::<u16>(TagId::SamplesPerPixel).unwrap(), 1);

    let decoded = decoder.read_raster().unwrap();
    assert_eq!(decoded.dimensions, (256, 256));
    let ramp: Vec<u8> = (0..=255).collect();
    assert_eq!(decoded.row(0).unwrap(), ramp.as_slice());
    assert_eq!(decoded.row(255).unwrap(), ramp.as_slice());
    assert_eq!(decoded.buffer, gradient().buffer);

    assert_eq!(verify(&path, &gradient(), 0).unwrap(), 0);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn lossy_fixture_stays_within_tolerance() {
    let path = temp_path("lossy.tiff");
    write_gradient(&path, Jpeg2000Options::lossy(10.0)).unwrap();
    let decoded = Decoder::open(&path).unwrap().read_raster().unwrap();
    assert_eq!(decoded.dimensions, (256, 256));
    assert!(max_abs_error(&decoded, &gradient()).unwrap() <= 16);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn lossless_output_is_smaller_than_raw() {
    let mut bytes = vec![];
    Encoder::from_raster(gradient()).encode(&mut bytes).unwrap();
    assert!(bytes.len() < 256 * 256);
}

#[test]
fn unsupported_compression_is_an_error_not_a_fallback() {
    for code in [7_u16, 34926, 50000] {
        let mut bytes = vec![];
        let result = Encoder::from_raster(gradient())
            .with_compression(Compression::from(code))
            .encode(&mut bytes);
        assert!(
            matches!(
                result,
                Err(EncodeError::CompressionError(CompressionError::CompressionNotSupported(_)))
            ),
            "code {code}"
        );
        assert!(bytes.is_empty());
    }
}

#[test]
fn failed_save_leaves_no_file() {
    let path = temp_path("unsupported.tiff");
    let _ = std::fs::remove_file(&path);
    let result = Encoder::from_raster(gradient())
        .with_compression(Compression::from(7_u16))
        .save(&path);
    assert!(result.is_err());
    assert!(!path.exists());
}

#[test]
fn unwritable_path_fails() {
    let path = temp_path("no-such-dir").join("gradient.tiff");
    assert!(matches!(
        write_gradient(&path, Jpeg2000Options::lossless()),
        Err(GradTiffError::Encode(EncodeError::WriteError(_)))
    ));
}

#[test]
fn verify_reports_mismatch() {
    let path = temp_path("mismatch.tiff");
    write_gradient(&path, Jpeg2000Options::lossless()).unwrap();

    let mut other = gradient();
    other.buffer[0] = 9;
    assert!(matches!(
        verify(&path, &other, 3),
        Err(GradTiffError::ValueMismatch {
            max_error: 9,
            tolerance: 3
        })
    ));
    assert!(matches!(
        verify(&path, &Raster::gradient(8, 8), 0),
        Err(GradTiffError::ShapeMismatch(_))
    ));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn display_lists_written_tags() {
    let mut bytes = vec![];
    Encoder::from_raster(gradient()).encode(&mut bytes).unwrap();
    let decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    let listing = decoder.tiff().to_string();
    assert!(listing.contains("IFD 0:"));
    assert!(listing.contains("Compression Short[1]: 34712"));
    assert!(listing.contains("ImageWidth Long[1]: 256"));
}
