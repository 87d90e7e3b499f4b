// ============================================================
// Layer 5 — ML Layer
// ============================================================
// Everything that trains or samples from a network lives here.
// Only model.rs knows about Burn; the controller and the
// generation engine work against the SequenceModel trait, so
// both run in tests without a GPU.
//
//   model.rs     — two-layer LSTM over scaled token ids, its
//                  Burn config, and the SequenceModel impl
//                  (fit / predict / weight snapshots / records)
//
//   trainer.rs   — the training controller: fixed epoch count,
//                  keeps the epoch whose loss is closest to the
//                  target loss, restores it and commits it
//
//   generator.rs — the generation engine: seeds a window from
//                  the dataset, samples the next token from the
//                  predicted distribution, slides the window
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// LSTM network and its SequenceModel implementation
pub mod model;

/// Closest-to-target epoch selection and checkpoint commit
pub mod trainer;

/// Weighted sampling over a sliding window
pub mod generator;

#[cfg(test)]
pub(crate) mod stub;
