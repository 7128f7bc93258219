//! Category labels for annotations.

/// Label assigned to new annotations until the user picks another one.
pub const DEFAULT_CATEGORY: &str = "Road Asset";

/// Built-in road survey categories.
pub fn default_categories() -> Vec<String> {
    [
        "Street Light",
        "Traffic Sign",
        "Pothole",
        "Aligator Crack",
        "Construction Zone",
        "Vehicle",
        "Pedestrian",
        "Other",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}
