use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::gemini::GenerativeBackend;
use crate::plan::{ImageArrival, ImageRequest};

pub fn image_prompt(destination: &str) -> String {
    format!(
        "Travel editorial photography of {destination}. Professional cinematic lighting, \
         ultra-high definition 8k, National Geographic style, breathtaking landscape."
    )
}

/// Best effort: any failure yields `None`.
pub async fn generate_destination_image(
    backend: &dyn GenerativeBackend,
    destination: &str,
) -> Option<String> {
    match backend.generate_image(&image_prompt(destination)).await {
        Ok(Some(image)) => Some(image.data_url()),
        Ok(None) => {
            debug!("no image returned for {destination}");
            None
        }
        Err(err) => {
            debug!("image generation failed for {destination}: {err:#}");
            None
        }
    }
}

/// Starts one task per request. Arrivals come back in completion order; the
/// channel closes once every task has finished.
pub fn spawn_image_requests(
    backend: Arc<dyn GenerativeBackend>,
    requests: Vec<ImageRequest>,
) -> mpsc::UnboundedReceiver<ImageArrival> {
    let (tx, rx) = mpsc::unbounded_channel();
    if !requests.is_empty() {
        info!("requesting {} destination image(s)", requests.len());
    }
    for request in requests {
        let backend = Arc::clone(&backend);
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(image_url) = generate_destination_image(backend.as_ref(), &request.name).await {
                let _ = tx.send(ImageArrival {
                    epoch: request.epoch,
                    trip_id: request.trip_id,
                    image_url,
                });
            }
        });
    }
    rx
}

/// Drains arrivals until the channel closes or `budget` elapses.
pub async fn collect_arrivals(
    mut rx: mpsc::UnboundedReceiver<ImageArrival>,
    budget: Duration,
) -> Vec<ImageArrival> {
    let deadline = Instant::now() + budget;
    let mut arrivals = Vec::new();
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(arrival)) => arrivals.push(arrival),
            Ok(None) => break,
            Err(_) => {
                debug!("image collection budget elapsed with {} arrival(s)", arrivals.len());
                break;
            }
        }
    }
    arrivals
}
