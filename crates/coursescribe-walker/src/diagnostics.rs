use crate::driver::Driver;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Save a screenshot to `template`, with `{timestamp}` replaced by unix seconds.
///
/// Best effort: a browser that cannot take the screenshot or a path that cannot
/// be written is logged and yields `None`.
pub async fn capture<D: Driver + ?Sized>(driver: &D, template: &str) -> Option<PathBuf> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = PathBuf::from(template.replace("{timestamp}", &timestamp.to_string()));

    let data = match driver.screenshot().await {
        Ok(data) => data,
        Err(e) => {
            warn!("Could not take screenshot: {}", e);
            return None;
        }
    };
    if let Err(e) = std::fs::write(&path, data) {
        warn!("Failed to save screenshot: {}", e);
        return None;
    }
    info!("Screenshot saved to {}", path.display());
    Some(path)
}
