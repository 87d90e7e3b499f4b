// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the parsed token corpus and the tensors
// the model trains on:
//
//   notes.json
//       │
//       ▼
//   CorpusLoader      → reads the ordered token list
//       │
//       ▼
//   Vocabulary        → sorted distinct tokens ↔ ids 0..V
//       │
//       ▼
//   WindowedDataset   → W ids in, the next id out (N − W windows)
//       │
//       ▼
//   WindowBatcher     → [batch, W, 1] inputs, [batch, V] one-hot targets
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets)

/// Reads the JSON token corpus
pub mod loader;

/// Deterministic token ↔ id mapping
pub mod vocabulary;

/// Fixed-length input/target windows
pub mod dataset;

/// Stacks windows into tensors
pub mod batcher;
