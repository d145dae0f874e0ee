pub mod builder;

pub use builder::{build_features, features_at, FeatureRow, LAGS, MIN_HISTORY, ROLLING_WINDOWS};
