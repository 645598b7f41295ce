//! The write-once slot holding the asynchronously loaded model.

use anyhow::bail;

/// Where the model is in its single transition from "not yet" to "done".
///
/// A slot starts [`Pending`](AssetSlot::Pending) and is written exactly once,
/// either with the loaded asset or with the reason the load failed. Every later
/// write is rejected and leaves the slot untouched.
#[derive(Debug)]
pub enum AssetSlot<T> {
    Pending,
    Loaded(T),
    Failed {
        reason: String,
        /// Stand-in shown instead of the asset, if any.
        fallback: Option<T>,
    },
}

impl<T> Default for AssetSlot<T> {
    fn default() -> Self {
        Self::Pending
    }
}

impl<T> AssetSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&mut self, asset: T) -> anyhow::Result<()> {
        if !self.is_pending() {
            bail!("asset slot was already written ({})", self.state_name());
        }
        *self = Self::Loaded(asset);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>, fallback: Option<T>) -> anyhow::Result<()> {
        if !self.is_pending() {
            bail!("asset slot was already written ({})", self.state_name());
        }
        *self = Self::Failed {
            reason: reason.into(),
            fallback,
        };
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// The loaded asset. `None` while pending and after a failure.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Loaded(asset) => Some(asset),
            _ => None,
        }
    }

    /// Whatever currently stands in the asset's place: the asset itself or
    /// the fallback after a failed load.
    pub fn active(&self) -> Option<&T> {
        match self {
            Self::Loaded(asset) => Some(asset),
            Self::Failed { fallback, .. } => fallback.as_ref(),
            Self::Pending => None,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Loaded(asset) => Some(asset),
            Self::Failed { fallback, .. } => fallback.as_mut(),
            Self::Pending => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    fn state_name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Loaded(_) => "loaded",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending_and_empty() {
        let slot: AssetSlot<u8> = AssetSlot::new();
        assert!(slot.is_pending());
        assert!(slot.get().is_none());
        assert!(slot.active().is_none());
    }

    #[test]
    fn second_fill_is_rejected() {
        let mut slot = AssetSlot::new();
        slot.fill(1).unwrap();
        let err = slot.fill(2).unwrap_err();
        assert!(err.to_string().contains("loaded"), "{}", err);
        assert_eq!(slot.get(), Some(&1));
    }

    #[test]
    fn failure_cannot_be_overwritten_by_a_late_load() {
        let mut slot = AssetSlot::new();
        slot.fail("404", Some(0)).unwrap();
        assert!(slot.fill(7).is_err());
        assert_eq!(slot.failure(), Some("404"));
        assert!(slot.get().is_none());
        assert_eq!(slot.active(), Some(&0));
    }

    #[test]
    fn failure_without_fallback_leaves_nothing_active() {
        let mut slot: AssetSlot<u8> = AssetSlot::new();
        slot.fail("decode error", None).unwrap();
        assert!(slot.active_mut().is_none());
        assert!(!slot.is_loaded());
    }
}
