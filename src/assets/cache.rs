use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex, PoisonError},
};

use crate::assets::archive::ArchiveStore;
use crate::assets::decode::{DecodedImage, ImageDecoder};
use crate::foundation::error::{CgError, CgResult};

type SharedResult = CgResult<Arc<DecodedImage>>;

struct DecodeInFlight {
    result: Mutex<Option<SharedResult>>,
    cv: Condvar,
}

impl DecodeInFlight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            cv: Condvar::new(),
        }
    }

    fn set(&self, result: SharedResult) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(result);
        self.cv.notify_all();
    }

    fn wait(&self) -> SharedResult {
        let mut guard = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = guard.as_ref() {
                return result.clone();
            }
            guard = self.cv.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Owner side of an in-flight decode.
///
/// Dropping it without calling `finish` (the decoder or store panicked) releases the waiters
/// with a [`CgError::DecodeFailure`] and clears the in-flight slot.
struct InFlightOwner<'a> {
    cache: &'a LayerCache,
    asset: &'a str,
    flight: Option<Arc<DecodeInFlight>>,
}

impl InFlightOwner<'_> {
    fn finish(mut self, result: SharedResult) {
        if let Some(flight) = self.flight.take() {
            self.cache.finish_inflight(self.asset, &flight, result);
        }
    }
}

impl Drop for InFlightOwner<'_> {
    fn drop(&mut self) {
        if let Some(flight) = self.flight.take() {
            tracing::warn!(asset = self.asset, "layer decode aborted by a panic");
            let failure = Err(CgError::DecodeFailure {
                name: self.asset.to_string(),
                cause: "decoder panicked".to_string(),
            });
            self.cache.finish_inflight(self.asset, &flight, failure);
        }
    }
}

/// Decoded layer images of one archive session, keyed by asset name.
///
/// Each asset is decoded at most once: concurrent requests for an asset that is still being
/// decoded wait for that decode instead of starting another one. Failed decodes are reported to
/// every waiter and are not stored, so a later request tries again.
#[derive(Default)]
pub struct LayerCache {
    images: Mutex<HashMap<String, Arc<DecodedImage>>>,
    in_flight: Mutex<HashMap<String, Arc<DecodeInFlight>>>,
    decode_counts: Mutex<HashMap<String, u64>>,
}

impl std::fmt::Debug for LayerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerCache")
            .field("cached", &self.len())
            .finish()
    }
}

impl LayerCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the decoded image for `asset`, fetching and decoding it on first use.
    pub fn get(
        &self,
        store: &dyn ArchiveStore,
        decoder: &dyn ImageDecoder,
        asset: &str,
    ) -> CgResult<Arc<DecodedImage>> {
        if let Some(img) = self.get_cached(asset) {
            tracing::trace!(asset, "layer cache hit");
            return Ok(img);
        }

        let (flight, is_owner) = self.join_inflight(asset);
        if !is_owner {
            tracing::debug!(asset, "waiting for in-flight decode");
            return flight.wait();
        }
        let owner = InFlightOwner {
            cache: self,
            asset,
            flight: Some(flight),
        };

        // A decode may have completed between the lookup above and joining.
        if let Some(img) = self.get_cached(asset) {
            owner.finish(Ok(Arc::clone(&img)));
            return Ok(img);
        }

        let result = self.fetch_and_decode(store, decoder, asset);
        if let Ok(img) = &result {
            self.images
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(asset.to_string(), Arc::clone(img));
        }
        owner.finish(result.clone());
        result
    }

    /// Return the decoded image for `asset` if it is already cached.
    pub fn get_cached(&self, asset: &str) -> Option<Arc<DecodedImage>> {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(asset)
            .cloned()
    }

    /// Number of times the decoder has been invoked for `asset`.
    pub fn decode_count(&self, asset: &str) -> u64 {
        self.decode_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(asset)
            .copied()
            .unwrap_or(0)
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fetch_and_decode(
        &self,
        store: &dyn ArchiveStore,
        decoder: &dyn ImageDecoder,
        asset: &str,
    ) -> SharedResult {
        let bytes = store.bytes(asset).map_err(|e| match e {
            CgError::EntryNotFound(_) => CgError::AssetNotFound(asset.to_string()),
            other => other,
        })?;

        {
            let mut counts = self
                .decode_counts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *counts.entry(asset.to_string()).or_default() += 1;
        }

        tracing::debug!(asset, bytes = bytes.len(), "decoding layer image");
        let img = decoder
            .decode(&bytes)
            .map_err(|e| CgError::DecodeFailure {
                name: asset.to_string(),
                cause: format!("{e:#}"),
            })?;
        img.check_len().map_err(|e| CgError::DecodeFailure {
            name: asset.to_string(),
            cause: e.to_string(),
        })?;
        Ok(Arc::new(img))
    }

    fn join_inflight(&self, asset: &str) -> (Arc<DecodeInFlight>, bool) {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(asset) {
            return (Arc::clone(existing), false);
        }

        let flight = Arc::new(DecodeInFlight::new());
        map.insert(asset.to_string(), Arc::clone(&flight));
        (flight, true)
    }

    fn finish_inflight(&self, asset: &str, flight: &Arc<DecodeInFlight>, result: SharedResult) {
        flight.set(result);
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(asset);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
