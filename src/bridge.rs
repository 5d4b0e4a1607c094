//! Host-facing bridge
//!
//! `BackgroundRemover` is what a React Native (or any other) host module
//! holds on to. Each call is dispatched to tokio's blocking pool and settles
//! exactly once, either with the output URI or with a [`BridgeError`].

use crate::{
    backends::ColorKeySegmenter,
    config::RemoverConfig,
    error::{BgRemovalError, BridgeError, Result},
    platform::PlatformInfo,
    processor::BackgroundRemovalProcessor,
    segmenter::SegmenterRegistry,
    types::RemovalOutcome,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, Instrument};

/// What a settled promise carries
pub type BridgeResult = std::result::Result<String, BridgeError>;

type ResolveFn = Box<dyn FnOnce(String) + Send>;
type RejectFn = Box<dyn FnOnce(BridgeError) + Send>;

enum Settler {
    Callbacks { resolve: ResolveFn, reject: RejectFn },
    Channel(oneshot::Sender<BridgeResult>),
}

/// Single-shot completion handle
///
/// Settling consumes the promise, so it can resolve or reject only once.
pub struct Promise {
    settler: Settler,
}

impl Promise {
    /// Promise backed by a resolve/reject callback pair
    pub fn new<R, J>(resolve: R, reject: J) -> Self
    where
        R: FnOnce(String) + Send + 'static,
        J: FnOnce(BridgeError) + Send + 'static,
    {
        Self {
            settler: Settler::Callbacks {
                resolve: Box::new(resolve),
                reject: Box::new(reject),
            },
        }
    }

    /// Promise whose outcome arrives on a oneshot channel
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<BridgeResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                settler: Settler::Channel(tx),
            },
            rx,
        )
    }

    /// Resolve with the output URI or reject with the failure record
    pub fn settle(self, result: Result<String>) {
        let outcome = result.map_err(|e| BridgeError::from(&e));
        match self.settler {
            Settler::Callbacks { resolve, reject } => match outcome {
                Ok(uri) => resolve(uri),
                Err(e) => reject(e),
            },
            Settler::Channel(tx) => {
                // The receiver may have been dropped; nobody is waiting then
                let _ = tx.send(outcome);
            },
        }
    }
}

/// Background removal entry point for host applications
#[derive(Clone)]
pub struct BackgroundRemover {
    processor: Arc<BackgroundRemovalProcessor>,
}

impl BackgroundRemover {
    /// Create a remover with host-registered segmentation adapters
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration does not validate
    pub fn new(
        config: RemoverConfig,
        platform: PlatformInfo,
        registry: SegmenterRegistry,
    ) -> Result<Self> {
        let processor = BackgroundRemovalProcessor::new(config, platform, registry)?;
        Ok(Self {
            processor: Arc::new(processor),
        })
    }

    /// Create a remover backed by the built-in color-key segmenter on both tiers
    ///
    /// # Errors
    /// - `InvalidConfig` when the configuration does not validate
    pub fn with_color_key(config: RemoverConfig, platform: PlatformInfo) -> Result<Self> {
        let options = config.color_key;
        let registry = SegmenterRegistry::new()
            .with(Arc::new(ColorKeySegmenter::general(options)))
            .with(Arc::new(ColorKeySegmenter::person_only(options)));
        Self::new(config, platform, registry)
    }

    #[must_use]
    pub fn processor(&self) -> &BackgroundRemovalProcessor {
        &self.processor
    }

    /// Remove the background and return the output file URI
    ///
    /// # Errors
    /// Every failure code of [`crate::error::ErrorCode`].
    pub async fn remove_background(&self, image_uri: &str) -> Result<String> {
        self.remove_background_detailed(image_uri)
            .await
            .map(|outcome| outcome.output_uri)
    }

    /// Remove the background and return the full outcome
    ///
    /// The work runs on the blocking pool; the calling task only awaits it.
    ///
    /// # Errors
    /// Every failure code of [`crate::error::ErrorCode`]; a panicked worker
    /// is reported as `RenderFailed`.
    pub async fn remove_background_detailed(&self, image_uri: &str) -> Result<RemovalOutcome> {
        let processor = Arc::clone(&self.processor);
        let uri = image_uri.to_owned();

        match tokio::task::spawn_blocking(move || processor.process(&uri)).await {
            Ok(result) => result,
            Err(join_error) => {
                error!(error = %join_error, "background removal worker failed");
                Err(BgRemovalError::render(format!(
                    "background removal worker failed: {join_error}"
                )))
            },
        }
    }

    /// Fire-and-forget variant for callback-style hosts
    ///
    /// Returns the task handle, or `None` when called outside a tokio
    /// runtime, in which case the promise has already been rejected.
    pub fn remove_background_with<S: Into<String>>(
        &self,
        image_uri: S,
        promise: Promise,
    ) -> Option<JoinHandle<()>> {
        let image_uri = image_uri.into();
        let Ok(handle) = Handle::try_current() else {
            promise.settle(Err(BgRemovalError::render(
                "no async runtime available to run background removal",
            )));
            return None;
        };

        let remover = self.clone();
        let span = tracing::info_span!("remove_background", uri = %image_uri);
        Some(handle.spawn(
            async move {
                let result = remover.remove_background(&image_uri).await;
                promise.settle(result);
            }
            .instrument(span),
        ))
    }
}
