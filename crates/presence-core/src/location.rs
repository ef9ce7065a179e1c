//! Cached location fix with a single outstanding subscription
//!
//! The first fix is kept until overwritten; there is no staleness expiry.
//! As soon as a fix arrives the pending subscription is cancelled, so the
//! tracker never holds more than one subscription at a time.

use tracing::{debug, info};

use crate::device::{LocationProvider, SubscriptionHandle};
use crate::geofence::LocationFix;

#[derive(Debug, Clone, Default)]
pub struct LocationTracker {
    fix: Option<LocationFix>,
    subscription: Option<SubscriptionHandle>,
}

impl LocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached fix, if any arrived yet
    pub fn fix(&self) -> Option<&LocationFix> {
        self.fix.as_ref()
    }

    /// Outstanding subscription handle
    pub fn subscription(&self) -> Option<SubscriptionHandle> {
        self.subscription
    }

    pub fn is_waiting(&self) -> bool {
        self.subscription.is_some()
    }

    /// Make sure a fix is on its way
    ///
    /// Adopts the provider's last known location when there is one, otherwise
    /// subscribes for updates unless a subscription is already outstanding.
    pub fn ensure_fix<P: LocationProvider + ?Sized>(&mut self, provider: &mut P) {
        if self.fix.is_some() {
            return;
        }

        if let Some(fix) = provider.last_known_location() {
            self.store(provider, fix);
            return;
        }

        if self.subscription.is_none() {
            let handle = provider.subscribe_updates();
            debug!(handle = handle.0, "subscribed to location updates");
            self.subscription = Some(handle);
        }
    }

    /// Cache a fix delivered by the provider and stop listening
    pub fn on_location_update<P: LocationProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        fix: LocationFix,
    ) {
        self.store(provider, fix);
    }

    /// Drop the outstanding subscription, keeping any cached fix
    pub fn cancel<P: LocationProvider + ?Sized>(&mut self, provider: &mut P) {
        if let Some(handle) = self.subscription.take() {
            provider.unsubscribe(handle);
            debug!(handle = handle.0, "location subscription cancelled");
        }
    }

    fn store<P: LocationProvider + ?Sized>(&mut self, provider: &mut P, fix: LocationFix) {
        info!(
            latitude = fix.point.latitude,
            longitude = fix.point.longitude,
            "location fix cached"
        );
        self.fix = Some(fix);
        self.cancel(provider);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDevice;
    use crate::TEL_AVIV;

    #[test]
    fn test_last_known_location_is_adopted() {
        let mut device = FakeDevice::default();
        device.last_known = Some(LocationFix::from(TEL_AVIV));

        let mut tracker = LocationTracker::new();
        tracker.ensure_fix(&mut device);

        assert_eq!(tracker.fix(), Some(&LocationFix::from(TEL_AVIV)));
        assert!(device.subscriptions.is_empty());
        assert!(!tracker.is_waiting());
    }

    #[test]
    fn test_single_subscription() {
        let mut device = FakeDevice::default();
        let mut tracker = LocationTracker::new();

        tracker.ensure_fix(&mut device);
        tracker.ensure_fix(&mut device);
        tracker.ensure_fix(&mut device);

        assert_eq!(device.subscriptions.len(), 1);
        assert!(tracker.is_waiting());
        assert!(tracker.fix().is_none());
    }

    #[test]
    fn test_first_fix_cancels_subscription() {
        let mut device = FakeDevice::default();
        let mut tracker = LocationTracker::new();

        tracker.ensure_fix(&mut device);
        let handle = tracker.subscription().unwrap();

        tracker.on_location_update(&mut device, LocationFix::from(TEL_AVIV));
        assert!(tracker.fix().is_some());
        assert!(!tracker.is_waiting());
        assert_eq!(device.unsubscribed, vec![handle]);
        assert!(device.active_subscriptions().is_empty());

        // Already have a fix
        tracker.ensure_fix(&mut device);
        assert_eq!(device.subscriptions.len(), 1);
    }

    #[test]
    fn test_update_overwrites_fix() {
        let mut device = FakeDevice::default();
        let mut tracker = LocationTracker::new();

        tracker.on_location_update(&mut device, LocationFix::new(1.0, 1.0));
        tracker.on_location_update(&mut device, LocationFix::new(2.0, 2.0));
        assert_eq!(tracker.fix(), Some(&LocationFix::new(2.0, 2.0)));
        assert!(device.unsubscribed.is_empty());
    }

    #[test]
    fn test_cancel_without_subscription() {
        let mut device = FakeDevice::default();
        let mut tracker = LocationTracker::new();
        tracker.cancel(&mut device);
        assert!(device.unsubscribed.is_empty());
    }
}
