//! Status command handler

use anyhow::Result;

use courtline_core::Store;

use crate::output::{Output, OutputFormat};

/// Bytes as a short human-readable size
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let config = store.config();
    let counts = store.collection_counts()?;
    let size = store.size_on_disk();

    match output.format {
        OutputFormat::Json => {
            let counts: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(c, n)| (c.key().to_string(), (*n).into()))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backend": config.backend,
                    "user_name": config.user_name,
                    "storage": {
                        "size": size,
                    },
                    "counts": counts
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Courtline Status");
            println!("================");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Backend:  {}", config.backend);
            println!("  Size:     {}", human_size(size));
            println!();
            println!("Acting as: {} ({})", config.user_name, config.user_id);
            println!();
            println!("Contents:");
            for (collection, count) in &counts {
                println!("  {:<28} {}", collection.key(), count);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }
}
