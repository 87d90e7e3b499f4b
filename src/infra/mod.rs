// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything the pipeline writes to or reads from disk:
//
//   atomic.rs      — temp file + fsync + rename, shared by every
//                    writer below so readers never see a
//                    half-written file
//
//   checkpoint.rs  — the single committed checkpoint: weights,
//                    the record of which epoch was kept, the
//                    training config and the vocabulary, all
//                    renamed into place as one commit
//
//   vocab_store.rs — the sorted token list, so generation maps
//                    ids back to exactly the training tokens
//
//   metrics.rs     — one CSV row per epoch (loss, distance to
//                    the target, whether it was selected)
//
//   midi_writer.rs — generated tokens → Standard MIDI File
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling)
//            Burn Book §5 (Checkpointing)

/// Atomic file replacement
pub mod atomic;

/// Checkpoint commit and load
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;

/// Token sequence to MIDI rendering
pub mod midi_writer;
