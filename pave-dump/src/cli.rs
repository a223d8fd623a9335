use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pave::{DecodeError, DecoderConfig, Error, FramePipeline, FrameReader, PipelineConfig};

use crate::output::{self, OutputKind};

#[derive(Parser, Debug)]
#[command(name = "pave-dump")]
#[command(about = "Decode a recorded AR.Drone 2.0 video stream into image files")]
pub struct Args {
    /// Recorded PaVE stream
    pub input: PathBuf,

    /// Directory to write frames into
    #[arg(short, long, default_value = "frames")]
    pub output: PathBuf,

    /// Write headerless RGB24 files instead of PNG
    #[arg(long)]
    pub raw: bool,

    /// Stop after writing this many frames
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Log undecodable frames and keep going. Broken framing still stops
    /// the dump, since the rest of the capture cannot be split.
    #[arg(long)]
    pub skip_errors: bool,

    /// Decoder threads
    #[arg(long, default_value = "1")]
    pub threads: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Default)]
struct Summary {
    read: u64,
    written: usize,
    pending: usize,
    failed: usize,
}

impl Args {
    fn output_kind(&self) -> OutputKind {
        if self.raw {
            OutputKind::Raw
        } else {
            OutputKind::Png
        }
    }

    pub fn run(self) -> Result<()> {
        let file = File::open(&self.input)
            .with_context(|| format!("Failed to open {}", self.input.display()))?;
        std::fs::create_dir_all(&self.output)
            .with_context(|| format!("Failed to create {}", self.output.display()))?;

        let config = PipelineConfig::default()
            .with_decoder(DecoderConfig::default().with_threads(self.threads));
        let mut pipeline = FramePipeline::new(config);
        if let Some(e) = pipeline.setup_error() {
            bail!("Decoder unavailable: {e}");
        }

        let kind = self.output_kind();
        let mut summary = Summary::default();
        let mut reader = FrameReader::new(BufReader::new(file));

        while !self.limit.is_some_and(|limit| summary.written >= limit) {
            let Some(frame) = reader
                .next_frame()
                .with_context(|| format!("Failed to read frame {}", summary.read))?
            else {
                break;
            };
            summary.read += 1;

            let frame = pave::parse(&frame)
                .with_context(|| format!("Failed to parse frame {}", summary.read))?;
            let frame_number = frame.header.frame_number;

            match pipeline.decode_frame(&frame) {
                Ok(image) => {
                    let path = output::write_frame(&self.output, frame_number, image, kind)?;
                    tracing::debug!(frame_number, path = %path.display(), "wrote frame");
                    summary.written += 1;
                }
                Err(Error::Decode(DecodeError::NoPictureYet)) => {
                    tracing::debug!(frame_number, "decoder still priming");
                    summary.pending += 1;
                }
                Err(e) if self.skip_errors => {
                    tracing::warn!(frame_number, error = %e, "skipping frame");
                    summary.failed += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to decode frame {frame_number}"));
                }
            }
        }

        tracing::info!(
            read = summary.read,
            written = summary.written,
            pending = summary.pending,
            failed = summary.failed,
            output = %self.output.display(),
            "done"
        );

        Ok(())
    }
}
