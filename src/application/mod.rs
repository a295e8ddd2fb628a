// Ingestion and indicator backfill
pub mod collector;

// Training dataset assembly and caching
pub mod ml;
