//! Cross-stage tests exercising the whole compilation pipeline.
