use std::env;
use std::path::Path;
use std::sync::Arc;

use shrinkray_core::{
    BatchItem, CompressionEngine, CompressionSettings, EngineConfig, ImageFormat,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("🔍 Compression Debug Tool");
    println!("========================");

    let mut format = ImageFormat::Webp;
    let mut json_stats = false;
    let mut paths: Vec<String> = Vec::new();
    for arg in env::args().skip(1) {
        if let Some(alias) = arg.strip_prefix("--format=") {
            format = ImageFormat::from_alias(alias)
                .ok_or_else(|| format!("unsupported format: {}", alias))?;
        } else if arg == "--json" {
            json_stats = true;
        } else {
            paths.push(arg);
        }
    }
    if paths.is_empty() {
        eprintln!("Usage: debug_compression [--format=<jpeg|png|webp|avif>] [--json] <image>...");
        std::process::exit(1);
    }

    let engine = CompressionEngine::new(EngineConfig::default());
    let settings = CompressionSettings::new(format, 80);

    let mut items = Vec::new();
    for path in &paths {
        let bytes = std::fs::read(path)?;
        println!("📄 {} ({} bytes)", path, bytes.len());
        items.push(BatchItem {
            id: Uuid::new_v4(),
            bytes,
        });
    }

    let (outcomes, stats) = engine
        .compress_batch(items, settings, None, None)
        .await;

    println!();
    for (outcome, path) in outcomes.iter().zip(&paths) {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());
        match &outcome.result {
            Ok(result) => {
                println!(
                    "✅ {}: {} -> {} bytes ({:.1}% saved, {}x{}, {} via {})",
                    name,
                    result.original_size,
                    result.compressed_size,
                    result.space_saved_percentage(),
                    result.width,
                    result.height,
                    result.output_format,
                    result.method.as_str(),
                );
            }
            Err(e) => println!("❌ {}: {}", name, e),
        }
    }

    println!();
    if json_stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "📊 {}/{} succeeded, {} -> {} bytes total ({:.1}% saved)",
            stats.succeeded,
            stats.total_jobs,
            stats.total_original_size,
            stats.total_compressed_size,
            stats.space_saved_percentage(),
        );
    }

    engine.destroy().await;

    println!("\n✅ DEBUG SESSION COMPLETED");
    println!("==========================");

    Ok(())
}
