use clap::Parser;
use gradtiff::{
    Compression, Decoder, Encoder, Jpeg2000Options, Raster, GRADIENT_HEIGHT,
    GRADIENT_WIDTH, OUTPUT_FILE,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};

/// Writes a horizontal 8-bit gradient as a JPEG2000-compressed TIFF test fixture.
#[derive(Parser, Debug)]
#[command(name = "gradtiff", version, about, long_about = None)]
struct Cli {
    /// Output TIFF path
    #[arg(short, long, default_value = OUTPUT_FILE)]
    output: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value_t = GRADIENT_WIDTH)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = GRADIENT_HEIGHT)]
    height: u32,

    /// TIFF compression code (34712, 33003, 33004 and 33005 are JPEG2000)
    #[arg(short, long, default_value_t = 34712)]
    compression: u16,

    /// Use irreversible JPEG2000 at RATIO:1 instead of lossless
    #[arg(long, value_name = "RATIO")]
    lossy: Option<f32>,

    /// JPEG2000 resolution levels (decomposition levels + 1)
    #[arg(long, default_value_t = 6)]
    resolutions: u32,

    /// JPEG2000 code-block edge
    #[arg(long, default_value_t = 64)]
    code_block: u32,

    /// Rows per strip (defaults to a single strip)
    #[arg(long, conflicts_with = "tile_size")]
    rows_per_strip: Option<u32>,

    /// Square tile edge, a multiple of 16
    #[arg(long)]
    tile_size: Option<u16>,

    /// Write a BigTIFF
    #[arg(long)]
    big_tiff: bool,

    /// Write big endian (MM) byte order
    #[arg(long)]
    big_endian: bool,

    /// Decode the written file and compare it with the source
    #[arg(long)]
    verify: bool,

    /// Print the IFD of the written file
    #[arg(long)]
    inspect: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn jpeg2000(&self) -> Jpeg2000Options {
        match self.lossy {
            Some(ratio) => Jpeg2000Options::lossy(ratio),
            None => Jpeg2000Options::lossless(),
        }
        .with_resolutions(self.resolutions)
        .with_code_block(self.code_block)
    }

    fn compression(&self) -> Result<Compression, String> {
        match Compression::from(self.compression) {
            Compression::Unknown => Err(format!("unknown compression code {}", self.compression)),
            compression => Ok(compression),
        }
    }

    /// Largest per-sample error `--verify` accepts.
    fn tolerance(&self) -> u8 {
        let lossy = self.lossy.is_some() || self.compression == u16::from(Compression::Jpeg2000Lossy);
        if lossy {
            16
        } else {
            0
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let t0 = Instant::now();
    let compression = cli.compression()?;
    let source = Raster::gradient(cli.width, cli.height);

    let mut encoder = Encoder::from_raster(source.clone())
        .with_compression(compression)
        .with_jpeg2000(cli.jpeg2000())
        .with_big_tiff(cli.big_tiff)
        .with_big_endian(cli.big_endian);
    if let Some(rows) = cli.rows_per_strip {
        encoder = encoder.with_rows_per_strip(rows);
    }
    if let Some(pixels) = cli.tile_size {
        encoder = encoder.with_tile_size(pixels);
    }
    encoder.save(&cli.output)?;

    if cli.inspect {
        let decoder = Decoder::open(&cli.output)?;
        print!("{}", decoder.tiff());
    }
    if cli.verify {
        let max_error = gradtiff::verify(&cli.output, &source, cli.tolerance())?;
        println!("Verified {}: max error {max_error}", cli.output.display());
    }

    info!(
        "Wrote {} in {:.3}ms",
        cli.output.display(),
        t0.elapsed().as_secs_f64() * 1e3
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_fixture() {
        let cli = Cli::parse_from(["gradtiff"]);
        assert_eq!(cli.output, PathBuf::from("gradient_jpeg2000.tiff"));
        assert_eq!((cli.width, cli.height), (256, 256));
        assert_eq!(cli.compression().unwrap(), Compression::Jpeg2000Olympus);
        assert_eq!(cli.jpeg2000(), Jpeg2000Options::lossless());
        assert_eq!(cli.tolerance(), 0);
    }

    #[test]
    fn unknown_compression_code_is_rejected() {
        let cli = Cli::parse_from(["gradtiff", "--compression", "4242"]);
        assert!(cli.compression().is_err());
    }

    #[test]
    fn lossy_flag_switches_mode() {
        let cli = Cli::parse_from(["gradtiff", "--lossy", "20", "--resolutions", "4"]);
        let options = cli.jpeg2000();
        assert!(!options.is_lossless());
        assert_eq!(options.resolutions, 4);
        assert_eq!(cli.tolerance(), 16);
    }

    #[test]
    fn strips_and_tiles_conflict() {
        let result = Cli::try_parse_from(["gradtiff", "--rows-per-strip", "8", "--tile-size", "16"]);
        assert!(result.is_err());
    }
}
