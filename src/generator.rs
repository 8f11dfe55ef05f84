//! Synthetic sample generation
//!
//! Produces one sample per day over a trailing window ending at an anchor
//! instant. Quantity types get a uniformly drawn value recorded as an instant;
//! category types get a uniformly drawn category code spanning a fixed
//! duration. Days whose timestamps fall outside the representable range are
//! skipped, so a batch may hold fewer samples than the window length.

use crate::catalog::{TypeCatalog, TypeKind};
use crate::config::GeneratorConfig;
use crate::error::SynthError;
use crate::types::{SampleBatch, SampleValue, SyntheticSample};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Generator of synthetic sample batches for allow-listed types
pub struct SampleGenerator<R = StdRng> {
    catalog: TypeCatalog,
    config: GeneratorConfig,
    rng: R,
}

impl SampleGenerator<StdRng> {
    /// Create a generator backed by an entropy-seeded random source
    pub fn new(catalog: TypeCatalog, config: GeneratorConfig) -> Result<Self, SynthError> {
        Self::with_rng(catalog, config, StdRng::from_entropy())
    }

    /// Create a generator whose output is reproducible for a given seed
    pub fn with_seed(
        catalog: TypeCatalog,
        config: GeneratorConfig,
        seed: u64,
    ) -> Result<Self, SynthError> {
        Self::with_rng(catalog, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SampleGenerator<R> {
    pub fn with_rng(
        catalog: TypeCatalog,
        config: GeneratorConfig,
        rng: R,
    ) -> Result<Self, SynthError> {
        config.validate()?;
        Ok(Self {
            catalog,
            config,
            rng,
        })
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a batch over the configured default window
    pub fn generate_default(
        &mut self,
        record_type: &str,
        anchor: DateTime<Utc>,
    ) -> Result<SampleBatch, SynthError> {
        let window_days = self.config.window_days;
        self.generate(record_type, window_days, anchor)
    }

    /// Generate one sample per day for `window_days` days ending at `anchor`.
    ///
    /// Samples are ordered most recent first. Fails with `UnsupportedType`
    /// before drawing anything when `record_type` is not in the catalog.
    pub fn generate(
        &mut self,
        record_type: &str,
        window_days: u32,
        anchor: DateTime<Utc>,
    ) -> Result<SampleBatch, SynthError> {
        let Self {
            catalog,
            config,
            rng,
        } = self;

        let importable = catalog
            .get(record_type)
            .ok_or_else(|| SynthError::UnsupportedType(record_type.to_string()))?;

        if window_days == 0 {
            return Err(SynthError::InvalidWindow(window_days));
        }

        let mut batch = SampleBatch::new(importable.identifier.clone(), anchor, window_days);
        let range = config.quantity_range;

        for offset in 0..window_days {
            let Some(date) = anchor.checked_sub_signed(Duration::days(offset as i64)) else {
                warn!(offset, %anchor, "day outside representable range, skipping");
                continue;
            };

            let sample = match &importable.kind {
                TypeKind::Quantity { unit } => SyntheticSample {
                    record_type: importable.identifier.clone(),
                    value: SampleValue::Quantity {
                        value: rng.gen_range(range.low..=range.high),
                        unit: *unit,
                    },
                    start: date,
                    end: date,
                },
                TypeKind::Category { codes, .. } => {
                    let code = codes.choose(&mut *rng).cloned().ok_or_else(|| {
                        SynthError::InvalidConfig(format!(
                            "category type {} has no category codes",
                            importable.identifier
                        ))
                    })?;
                    let Some(end) = importable
                        .kind
                        .span()
                        .and_then(|span| date.checked_add_signed(span))
                    else {
                        warn!(offset, %date, "sample end outside representable range, skipping");
                        continue;
                    };
                    SyntheticSample {
                        record_type: importable.identifier.clone(),
                        value: SampleValue::Category { code },
                        start: date,
                        end,
                    }
                }
            };

            batch.samples.push(sample);
        }

        debug!(
            record_type = %batch.record_type,
            batch_id = %batch.batch_id,
            samples = batch.len(),
            window_days,
            "generated sample batch"
        );

        Ok(batch)
    }
}
