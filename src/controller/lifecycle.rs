//! Ad lifecycle phases

use crate::Error;

/// Where the ad is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdPhase {
    /// Constructed, or `initAd` found nothing playable
    Created,
    /// `initAd` succeeded
    Loaded,
    /// Playing after `startAd` or `resumeAd`
    Started,
    /// Paused by the wrapper
    Paused,
    /// `stopAd` was called or the media ended; terminal
    Stopped,
}

impl AdPhase {
    /// Whether the ad is running (playing or paused)
    pub fn is_active(&self) -> bool {
        matches!(self, AdPhase::Started | AdPhase::Paused)
    }

    /// Fail with `InvalidTransition` unless the phase is one of `allowed`
    pub fn require(&self, allowed: &[AdPhase], operation: &'static str) -> Result<(), Error> {
        if allowed.contains(self) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                phase: *self,
                operation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert!(AdPhase::Loaded.require(&[AdPhase::Loaded], "start").is_ok());

        let err = AdPhase::Created
            .require(&[AdPhase::Loaded], "start")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid lifecycle transition: cannot start while Created"
        );
    }

    #[test]
    fn test_active_phases() {
        assert!(AdPhase::Started.is_active());
        assert!(AdPhase::Paused.is_active());
        assert!(!AdPhase::Loaded.is_active());
        assert!(!AdPhase::Stopped.is_active());
    }
}
