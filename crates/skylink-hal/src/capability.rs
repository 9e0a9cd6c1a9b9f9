//! Remote feature-support queries.

use skylink_types::{FeatureId, FeatureSupport};

/// Single-shot completion invoked with the service's answer.
pub type FeatureCallback = Box<dyn FnOnce(FeatureSupport) + Send + 'static>;

/// Answers whether the current link session supports an optional feature.
///
/// Implementations may answer synchronously or from another task; the
/// callback must be invoked at most once.
pub trait CapabilityService: Send + Sync {
    fn check_feature_support(&self, feature: FeatureId, on_result: FeatureCallback);
}
