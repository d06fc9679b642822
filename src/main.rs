use anyhow::Context;
use clap::Parser;
use frame_bus::{Pipeline, PipelineConfig};
use tokio::io::BufReader;

mod config;
mod input;

/// `rust_log` directives are parsed last and win over these defaults.
fn log_builder(level: log::LevelFilter, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .filter_module("jpegstream", level)
        .filter_module("frame_bus", level);
    if let Some(filters) = rust_log {
        builder.parse_filters(filters);
    }
    builder
}

fn init_logging(level: log::LevelFilter) {
    let rust_log = std::env::var("RUST_LOG").ok();
    log_builder(level, rust_log.as_deref()).init();
}

fn main() -> anyhow::Result<()> {
    let args = config::Args::parse();
    init_logging(args.log_level());

    let config = args.pipeline_config();
    log::info!("using {} threads", config.threads());

    if let Some(dir) = args.chdir() {
        std::env::set_current_dir(dir).with_context(|| format!("cd {}", dir.display()))?;
        log::debug!("working directory: {}", dir.display());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads())
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: PipelineConfig) -> anyhow::Result<()> {
    let paths = input::read_paths(BufReader::new(tokio::io::stdin()))
        .await
        .context("read path list from stdin")?;
    log::debug!("read {} paths from stdin", paths.len());

    let pipeline = Pipeline::new(config);
    let out = tokio::io::BufWriter::new(tokio::io::stdout());
    let run = pipeline.run(paths, out, tokio::io::stderr());
    tokio::pin!(run);

    let report = loop {
        tokio::select! {
            result = &mut run => break result?,
            _ = tokio::signal::ctrl_c(), if !pipeline.is_cancelled() => {
                log::warn!("interrupted, stopping pipeline");
                pipeline.cancel();
            }
        }
    };

    log::info!(
        "Total time to read {} frames: {:.1} secs",
        report.files,
        report.elapsed.as_secs_f64()
    );
    log::info!("Total size of JPEG data: {:.2} MB", report.input_mib());
    Ok(())
}
