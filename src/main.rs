// src/main.rs
// Thin demo entry point: wire the engine up against the real service and
// run one generation from the command line.
use mirage::{AppController, Config, FfmpegToolkit, HttpGenerationService};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG can live there too
    dotenv::dotenv().ok();
    env_logger::init();

    let prompt: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.is_empty() {
        eprintln!("Usage: mirage <prompt>");
        std::process::exit(2);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let service = Arc::new(HttpGenerationService::new(
        config.api_base.clone(),
        config.api_key.clone(),
    ));
    let controller = AppController::new(service, FfmpegToolkit::new(), config);

    println!("🎬 Generating clip for prompt: '{}'", prompt);
    match controller.generate(&prompt, None, None).await {
        Ok(clip) => {
            let timeline = controller.timeline();
            println!("✅ Clip {} ready ({:.2}s)", clip.id, clip.duration);
            println!(
                "🎥 Timeline now: {} clips, {:.2}s total",
                timeline.clips.len(),
                timeline.duration
            );
        }
        Err(e) => {
            eprintln!("❌ Generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
