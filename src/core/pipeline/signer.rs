//! The signing pipeline: source, pair hash, sextet hash, merge.

use super::{
    IterSource, MergeStage, PairHashStage, Pipeline, PipelineConfig, SextetHashStage,
};
use crate::core::hasher::{HashProvider, XxHashProvider};
use crate::core::item::Item;
use crate::core::relay::CancellationToken;
use crate::error::{PipelineError, Result};
use crate::events::{null_sender, EventSender};
use std::sync::Arc;

/// Builder for a [`Signer`]
pub struct SignerBuilder {
    config: PipelineConfig,
    provider: Arc<dyn HashProvider>,
}

impl SignerBuilder {
    /// Create a builder with the default config and the xxh3 provider
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            provider: Arc::new(XxHashProvider::new()),
        }
    }

    /// Set the hash provider
    pub fn provider(mut self, provider: Arc<dyn HashProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the relay capacity
    pub fn relay_capacity(mut self, capacity: usize) -> Self {
        self.config.relay_capacity = capacity;
        self
    }

    /// Set the sextet fan-out width
    pub fn sextet_width(mut self, width: usize) -> Self {
        self.config.sextet_width = width;
        self
    }

    /// Set the throttle timeout in milliseconds (`None` waits forever)
    pub fn throttle_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.config.throttle_timeout_ms = timeout_ms;
        self
    }

    /// Validate the configuration and build the signer
    pub fn build(self) -> Result<Signer> {
        self.config.validate()?;
        Ok(Signer {
            config: self.config,
            provider: self.provider,
        })
    }
}

impl Default for SignerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Signs a finite set of items into one deterministic value.
///
/// Every call to `sign` is an independent run with its own relays and
/// throttle. For a given provider and config, the result depends only on
/// the multiset of input items, not on their order or on scheduling.
pub struct Signer {
    config: PipelineConfig,
    provider: Arc<dyn HashProvider>,
}

impl Signer {
    /// Create a new signer builder
    pub fn builder() -> SignerBuilder {
        SignerBuilder::new()
    }

    /// The configuration runs use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the four-stage pipeline over `items`
    pub fn pipeline<I>(&self, items: I) -> Result<Pipeline>
    where
        I: IntoIterator,
        I::Item: Into<Item> + 'static,
        I::IntoIter: Send + 'static,
    {
        Pipeline::builder()
            .config(self.config.clone())
            .stage(IterSource::new(items))
            .stage(PairHashStage::new(Arc::clone(&self.provider)))
            .stage(SextetHashStage::new(Arc::clone(&self.provider)))
            .stage(MergeStage::new())
            .build()
    }

    /// Sign `items`
    pub fn sign<I>(&self, items: I) -> Result<String>
    where
        I: IntoIterator,
        I::Item: Into<Item> + 'static,
        I::IntoIter: Send + 'static,
    {
        self.sign_with_events(items, &null_sender())
    }

    /// Sign `items`, reporting progress on `events`
    pub fn sign_with_events<I>(&self, items: I, events: &EventSender) -> Result<String>
    where
        I: IntoIterator,
        I::Item: Into<Item> + 'static,
        I::IntoIter: Send + 'static,
    {
        self.sign_with_cancel(items, events, &CancellationToken::new())
    }

    /// Sign `items`, stopping early if `cancel` fires
    pub fn sign_with_cancel<I>(
        &self,
        items: I,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<String>
    where
        I: IntoIterator,
        I::Item: Into<Item> + 'static,
        I::IntoIter: Send + 'static,
    {
        let output = self.pipeline(items)?.run_with_cancel(events, cancel)?;
        let mut items = output.items.into_iter();
        match (items.next(), items.next()) {
            (Some(merged), None) => Ok(merged.into_text()?),
            _ => Err(PipelineError::MissingOutput.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::LabelHashProvider;
    use crate::error::SignerError;

    fn label_signer() -> Signer {
        Signer::builder()
            .provider(Arc::new(LabelHashProvider))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_invalid_config() {
        assert!(matches!(
            Signer::builder().sextet_width(0).build(),
            Err(SignerError::Config(_))
        ));
    }

    #[test]
    fn pipeline_has_four_stages() {
        let pipeline = label_signer().pipeline(vec![0_i64]).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["source", "pair-hash", "sextet-hash", "merge"]
        );
    }

    #[test]
    fn single_item_signature() {
        let signed = label_signer().sign(vec![3_i64]).unwrap();
        let pair = "A:3~A:B:3";
        let expected: String = (0..6).map(|i| format!("A:{i}{pair}")).collect();
        assert_eq!(signed, expected);
    }

    #[test]
    fn empty_input_signs_to_empty_string() {
        let signed = label_signer().sign(Vec::<i64>::new()).unwrap();
        assert_eq!(signed, "");
    }
}
