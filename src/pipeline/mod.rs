pub mod diagnostic; // Per-document diagnostic dumps (LABSENSE_DUMP_DIR)
pub mod extraction;
pub mod format;
pub mod normalize;
pub mod parameters;
pub mod processor;
pub mod status;
