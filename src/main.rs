use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use intensifier_rs::{Config, HttpFetcher, Intensifier, Model};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = Config::new();
    // reject bad options before the model is loaded
    config.validate()?;

    let model = match (config.remove_bg, &config.model_path) {
        (true, Some(model_path)) => Some(
            Model::new(model_path, config.device_id)
                .with_context(|| format!("Failed to load model: {}", model_path.display()))?,
        ),
        _ => None,
    };
    let fetcher = HttpFetcher::new()?;

    let progress_bar = if config.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} frames",
            )?
            .progress_chars("#>-"),
        );
        bar
    };

    let intensifier = Intensifier::new(fetcher, model, config).with_progress(progress_bar);
    intensifier.run(&mut rand::rng())?;

    Ok(())
}
