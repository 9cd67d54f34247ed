mod timer;
pub use timer::Timer;

#[derive(thiserror::Error, Debug)]
#[error("Filesystem path is not valid UTF-8")]
pub struct PathEncodingError;

pub type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;
pub type HashMap<K, V> = std::collections::HashMap<K, V, Hasher>;

/// Create an empty `HashMap` with room for `cap` entries.
pub fn map_with_capacity<K, V>(cap: usize) -> HashMap<K, V> {
    HashMap::with_capacity_and_hasher(cap, Hasher::default())
}
