/// Streaming services offered when adding an item.
///
/// The `service` field itself is free text; this list only seeds input choices.
pub const DEFAULT_STREAMING_SERVICES: [&str; 7] = [
    "Netflix",
    "Hulu",
    "Disney+",
    "AppleTV+",
    "Paramount+",
    "Max",
    "Amazon Prime",
];
