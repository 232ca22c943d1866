#[cfg(all(feature = "rustc-hash", not(feature = "std-hash")))]
pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(all(feature = "rustc-hash", not(feature = "std-hash")))]
pub type FastSet<T> = rustc_hash::FxHashSet<T>;

#[cfg(all(feature = "ahash", not(feature = "rustc-hash"), not(feature = "std-hash")))]
pub type FastMap<K, V> = ahash::AHashMap<K, V>;
#[cfg(all(feature = "ahash", not(feature = "rustc-hash"), not(feature = "std-hash")))]
pub type FastSet<T> = ahash::AHashSet<T>;

#[cfg(any(
    feature = "std-hash",
    not(any(feature = "rustc-hash", feature = "ahash"))
))]
pub type FastMap<K, V> = std::collections::HashMap<K, V>;
#[cfg(any(
    feature = "std-hash",
    not(any(feature = "rustc-hash", feature = "ahash"))
))]
pub type FastSet<T> = std::collections::HashSet<T>;
