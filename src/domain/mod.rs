// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the music pipeline:
//
//   token.rs  — Token (one musical event as text) and the
//               MusicalEvent it parses into
//   window.rs — encoded training windows and the sliding
//               state used during generation
//   error.rs  — the PipelineError taxonomy shared by every
//               stage of the pipeline
//   traits.rs — CorpusSource and the SequenceModel capability
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

/// Token strings and their parsed musical meaning
pub mod token;

/// Encoded windows and generation state
pub mod window;

/// Error taxonomy for the pipeline
pub mod error;

/// Core abstractions (traits) that other layers implement
pub mod traits;
