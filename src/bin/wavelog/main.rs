//! Command line front end for WaterSense wave logs.

use clap::Parser;
use watersense::{
    args::{
        AnalyzeCommand, CommandTask, ReplayCommand, SimulateCommand, SpectrumCommand,
        TideCommand, WaveArgs,
    },
    batch::run_batch,
    config::PipelineConfig,
    pipeline::{Pipeline, PipelineOutput},
    spectrum::{FrequencyGrid, Periodogram},
    summary::Summary,
    synthetic::SyntheticLog,
    telemetry_sink::{GaugeBoard, LineFramer},
    tide::{parse_noaa_json, TideSeries},
};

use log::{error, info, warn};
use serde::Serialize;
use std::{
    error::Error,
    fs::{self, File},
    io::{BufWriter, Write},
    process::ExitCode,
};

// Example:
// cargo run --bin wavelog --
//                          analyze   mbari_11_15.txt
//                          --start   0
//                          --end     172800
//                          --quality -102
//                          --window  21
//                          --iqr     3
//                          --out     points.tsv

type CmdResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    env_logger::init();
    let args = WaveArgs::parse();

    let result = match args.command {
        CommandTask::Analyze(cmd) => analyze(cmd),
        CommandTask::Tide(cmd) => tide(cmd),
        CommandTask::Spectrum(cmd) => spectrum(cmd),
        CommandTask::Simulate(cmd) => simulate(cmd),
        CommandTask::Replay(cmd) => replay(cmd),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("wavelog: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    config: PipelineConfig,
    elevation_m: Option<f64>,
    summary: Summary,
}

fn print_summary(name: &str, output: &PipelineOutput) {
    let stats = &output.stats;
    println!("{}:", name);
    println!(
        "\tlines {}, malformed {}, outside window {}, low quality {}, outliers {}, kept {}",
        stats.total_seen,
        stats.rejected_lines,
        stats.excluded_by_time_window,
        stats.excluded_by_quality,
        stats.excluded_by_outlier_detection,
        stats.retained
    );

    let summary = &output.summary;
    match summary.heights {
        Some(h) => println!(
            "\theight mean {:.3} m, min {:.3} m, max {:.3} m",
            h.mean, h.min, h.max
        ),
        None => println!("\tno data retained"),
    }
    if let (Some(span), Some(rate)) = (summary.time_span_seconds, summary.sampling_rate_hz) {
        println!("\tspan {:.1} s at {:.2} Hz", span, rate);
    }
    if let Some(q) = summary.mean_quality {
        println!("\tmean quality {:.1}", q);
    }
}

fn analyze(cmd: AnalyzeCommand) -> CmdResult {
    let config = cmd.filter.to_config()?;
    let pipeline = Pipeline::new(config)?;

    let mut points_out = match &cmd.out {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writeln!(writer, "file\tseconds\tvalue")?;
            Some(writer)
        }
        None => None,
    };

    let mut reports = Vec::new();
    let mut failures = 0;

    for outcome in run_batch(&pipeline, &cmd.files) {
        let name = outcome.path.display().to_string();
        let output = match outcome.result {
            Ok(output) => output,
            Err(e) => {
                error!("{} : {}", name, e);
                failures += 1;
                continue;
            }
        };
        print_summary(&name, &output);

        let elevation_m = cmd.elevation.or(output.header.elevation_m());
        if let Some(writer) = points_out.as_mut() {
            let points = match elevation_m {
                Some(elevation) => output.series.water_levels(elevation),
                None => output.series.points(),
            };
            for (t, v) in points {
                writeln!(writer, "{}\t{:.3}\t{:.3}", name, t, v)?;
            }
        }

        reports.push(FileReport {
            file: name,
            config,
            elevation_m,
            summary: output.summary,
        });
    }

    if let Some(mut writer) = points_out {
        writer.flush()?;
    }
    if let Some(path) = &cmd.report {
        let text = ron::ser::to_string_pretty(&reports, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        info!("Wrote report to {}", path.display());
    }

    if failures > 0 {
        warn!("{} of {} files could not be read.", failures, cmd.files.len());
    }
    if failures == cmd.files.len() {
        return Err("no file could be read".into());
    }
    Ok(())
}

fn tide(cmd: TideCommand) -> CmdResult {
    let pipeline = Pipeline::new(cmd.filter.to_config()?)?;
    let output = pipeline.run_path(&cmd.wave)?;

    let tide = if cmd.json {
        parse_noaa_json(&fs::read(&cmd.tide)?)?
    } else {
        TideSeries::from_path(&cmd.tide)?
    };
    if tide.is_empty() {
        return Err(format!("no tide points in {}", cmd.tide.display()).into());
    }
    info!("Read {} tide points.", tide.points().len());

    let elevation_m = cmd.elevation.or(output.header.elevation_m());
    if elevation_m.is_none() {
        warn!("No elevation given, comparing raw radar distances against the tide.");
    }
    let comparison = tide.compare(&output.series, elevation_m)?;

    println!("{}:", cmd.wave.display());
    println!(
        "\t{} of {} records inside the tide data",
        comparison.residuals.len(),
        output.series.len()
    );
    match (comparison.mean_residual, comparison.rms_residual) {
        (Some(mean), Some(rms)) => {
            println!("\tmean residual {:.3} m, rms residual {:.3} m", mean, rms)
        }
        _ => println!("\tno overlap with the tide data"),
    }
    Ok(())
}

fn spectrum(cmd: SpectrumCommand) -> CmdResult {
    let pipeline = Pipeline::new(cmd.filter.to_config()?)?;
    let output = pipeline.run_path(&cmd.file)?;

    let grid = if cmd.log {
        FrequencyGrid::Logarithmic {
            min: cmd.min_freq,
            max: cmd.max_freq,
            n: cmd.freqs,
        }
    } else {
        FrequencyGrid::Linear {
            min: cmd.min_freq,
            max: cmd.max_freq,
            n: cmd.freqs,
        }
    };

    let times = output.series.elapsed_seconds_all();
    let heights = output.series.heights();
    let Some(pgram) = Periodogram::compute(&times, &heights, grid) else {
        return Err("not enough data for a spectrum".into());
    };

    let min_distance = (pgram.frequencies().len() / 50).max(1);
    println!("{}:", cmd.file.display());
    println!("\tperiod (s)\tfrequency (Hz)\tamplitude (m)");
    for peak in pgram.dominant_peaks(0.1, min_distance, cmd.peaks) {
        println!(
            "\t{:.2}\t\t{:.4}\t\t{:.4}",
            peak.period, peak.frequency, peak.amplitude
        );
    }
    Ok(())
}

fn simulate(cmd: SimulateCommand) -> CmdResult {
    SyntheticLog::builder()
        .samples(cmd.samples)
        .rate_hz(cmd.rate)
        .wave(cmd.amplitude, cmd.period)
        .low_quality_fraction(cmd.low_quality)
        .spike_fraction(cmd.spikes)
        .corrupt_fraction(cmd.corrupt)
        .header(cmd.header)
        .seed(cmd.seed)
        .build()
        .to_path(&cmd.out)?;
    info!("Wrote {} readings to {}", cmd.samples, cmd.out.display());
    Ok(())
}

fn replay(cmd: ReplayCommand) -> CmdResult {
    let raw = fs::read(&cmd.transcript)?;
    let mut framer = LineFramer::new();
    let mut board = GaugeBoard::new();

    // Same chunking as a serial read loop
    let delivered: usize = raw
        .chunks(256)
        .map(|chunk| framer.feed(chunk, &mut board))
        .sum();
    if framer.pending() > 0 {
        warn!("{} bytes after the last newline were ignored.", framer.pending());
    }

    println!("{} lines, {} undecodable", delivered, board.undecodable());
    let show = |v: Option<i32>| v.map_or_else(|| "-".to_owned(), |v| v.to_string());
    println!(
        "\tintra {} ({}%)",
        show(board.intra()),
        board.intra_percent()
    );
    println!(
        "\tinter {} ({}%)",
        show(board.inter()),
        board.inter_percent()
    );
    println!(
        "\tdistance {} mm ({}%)",
        show(board.distance_mm()),
        board.distance_percent()
    );
    let motion = match board.motion() {
        Some(true) => "Motion",
        Some(false) => "No Motion",
        None => "-",
    };
    println!("\t{}", motion);
    Ok(())
}
