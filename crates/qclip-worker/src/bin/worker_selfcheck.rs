use std::path::Path;

use qclip_media::{check_ffmpeg, check_ffprobe};
use qclip_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "qclip-selfcheck: starting with storage_root={}",
        config.storage_root.display()
    );
    ensure_storage_root(&config.storage_root).await?;

    let ffmpeg = check_ffmpeg(&config.ffmpeg_bin)?;
    println!("qclip-selfcheck: ffmpeg at {}", ffmpeg.display());
    match check_ffprobe(&config.ffprobe_bin) {
        Ok(ffprobe) => println!("qclip-selfcheck: ffprobe at {}", ffprobe.display()),
        Err(e) => println!("qclip-selfcheck: warning: {} (duration checks disabled)", e),
    }

    println!("qclip-selfcheck: ok");
    Ok(())
}

async fn ensure_storage_root<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| anyhow::anyhow!("storage root {} not creatable: {}", path.display(), e))?;
    Ok(())
}
