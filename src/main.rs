use anyhow::Context;
use optjournal::output;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let rendered = output::run_from_env()
        .await
        .context("failed to build trade journal")?;
    println!("{}", rendered);
    Ok(())
}
