use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, ReadBytesExt};
use clap::Parser;

use lpcvoc::{
    Condition, ConfigError, ControlSnapshot, Engine, EngineError, constants::BLOCK_SIZE, controls,
    telemetry::Telemetry,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Render an audio file through the LPC vocoder.
#[derive(Parser)]
#[command(name = "lpcvoc", version)]
struct Args {
    /// Input: WAV, or raw little-endian f32 mono for any other extension
    input: PathBuf,
    /// Output WAV (32-bit float, mono)
    output: PathBuf,
    /// Sampling frequency of raw input
    #[arg(long, default_value_t = 48000)]
    sample_rate: usize,
    /// Requested analysis frame length in seconds
    #[arg(long, default_value_t = 0.02)]
    frame_duration: f64,
    /// Seed of the noise excitation
    #[arg(long)]
    seed: Option<u64>,
    /// JSON file with initial control values
    #[arg(long)]
    preset: Option<PathBuf>,
    /// Quantize reflection coefficients to this many bits
    #[arg(long)]
    quantize: Option<u32>,
    /// Reverse the order of the reflection coefficients
    #[arg(long)]
    reverse: bool,
    /// Vocal tract resampling factor
    #[arg(long)]
    resample: Option<f32>,
    /// Voicing confidence threshold
    #[arg(long)]
    threshold: Option<f32>,
    /// Pitch period scale factor
    #[arg(long)]
    pitch_scale: Option<f32>,
    /// Write frame snapshots and heartbeats as JSON lines
    #[arg(long)]
    telemetry: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    env_logger::init();
    let args = Args::parse();

    let mut initial = match &args.preset {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => ControlSnapshot::default(),
    };
    if let Some(bits) = args.quantize {
        initial.quantization_enabled = true;
        initial.quantization_bits = bits;
    }
    initial.reflection_reversal_enabled |= args.reverse;
    if let Some(factor) = args.resample {
        initial.resampling_factor = factor;
    }
    if let Some(threshold) = args.threshold {
        initial.voiced_confidence_threshold = threshold;
    }
    if let Some(scale) = args.pitch_scale {
        initial.pitch_period_scale_factor = scale;
    }

    let (samples, sample_rate) = read_input(&args.input, args.sample_rate)?;
    log::info!(
        "Read {} samples at {} Hz from {}",
        samples.len(),
        sample_rate,
        args.input.display()
    );

    let mut condition = Condition::default();
    condition.set_sampling_frequency(sample_rate);
    condition.set_frame_duration(args.frame_duration);
    if let Some(seed) = args.seed {
        condition.set_noise_seed(seed);
    }

    let (_writer, reader) = controls(initial);
    let mut engine = Engine::new(&condition, reader)?;
    let mut telemetry = match &args.telemetry {
        Some(path) => Some((
            engine.enable_telemetry(),
            BufWriter::new(File::create(path)?),
        )),
        None => None,
    };

    // one extra frame flushes the reconstruction delay
    let frame_size = engine.layout().frame_size();
    let len = (samples.len() + frame_size).div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    let mut input = samples;
    input.resize(len, 0.0);
    let mut output = vec![0.0f32; len];

    for (input, output) in input
        .chunks_exact(frame_size)
        .zip(output.chunks_exact_mut(frame_size))
    {
        engine.process(input, output)?;
        if let Some((receiver, writer)) = telemetry.as_mut() {
            let mut result = Ok(());
            receiver.drain(|message| {
                if result.is_ok() {
                    result = write_json_line(writer, message);
                }
            });
            result?;
        }
    }
    let rest = len - len % frame_size;
    engine.process(&input[rest..], &mut output[rest..])?;

    if let Some((_, writer)) = telemetry.as_mut() {
        writer.flush()?;
        if let Some(sender) = engine.telemetry() {
            log::info!("Telemetry dropped {} messages", sender.dropped());
        }
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)?;
    for &sample in &output[frame_size..] {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    log::info!(
        "Wrote {} samples to {}",
        output.len() - frame_size,
        args.output.display()
    );

    Ok(())
}

fn write_json_line(writer: &mut impl Write, message: &Telemetry) -> Result<(), CliError> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Mono samples in [-1, 1] and the sampling frequency.
fn read_input(path: &Path, raw_rate: usize) -> Result<(Vec<f32>, usize), CliError> {
    let is_wav = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if !is_wav {
        let mut reader = BufReader::new(File::open(path)?);
        return Ok((read_raw_f32(&mut reader)?, raw_rate));
    }

    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };
    let channels = spec.channels.max(1) as usize;
    if channels > 1 {
        log::warn!("Mixing {channels} channels down to mono");
    }
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok((mono, spec.sample_rate as usize))
}

fn read_raw_f32(reader: &mut impl Read) -> Result<Vec<f32>, CliError> {
    let mut samples = Vec::new();
    loop {
        match reader.read_f32::<LittleEndian>() {
            Ok(sample) => samples.push(sample),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(samples)
}
