//! Ordering persistence contracts, seed-file helpers, and lightweight test adapters.

mod ordering;
mod seed;

pub use ordering::{
    MemoryOrderingStore, NoopOrderingStore, OrderingRecord, OrderingStore, OrderingStoreFuture,
};
pub use seed::{
    load_seed_file, parse_seed_xml, save_seed_file, try_parse_seed_xml, write_seed_xml, SeedEntry,
};
