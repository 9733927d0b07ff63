use std::sync::Arc;

use crate::detect::Detector;
use crate::storage::DetectionLog;

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<Detector>,
    pub detections: DetectionLog,
    /// Identity recorded when a request has no `x-user-id` header.
    pub default_user: Arc<str>,
}
