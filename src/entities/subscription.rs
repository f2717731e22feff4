//! Subscription entity - Abbonamento premium

use super::enums::SubscriptionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: SubscriptionStatus,
    pub tier: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Attivo e non scaduto all'istante `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.expires_at.is_none_or(|exp| exp > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(status: SubscriptionStatus, expires_at: Option<DateTime<Utc>>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status,
            tier: "premium".to_string(),
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_subscription_without_expiry() {
        assert!(subscription(SubscriptionStatus::Active, None).is_active_at(Utc::now()));
    }

    #[test]
    fn test_expired_subscription_is_not_active() {
        let now = Utc::now();
        let sub = subscription(SubscriptionStatus::Active, Some(now - Duration::days(1)));
        assert!(!sub.is_active_at(now));
    }

    #[test]
    fn test_cancelled_subscription_is_not_active() {
        let now = Utc::now();
        let sub = subscription(SubscriptionStatus::Cancelled, Some(now + Duration::days(10)));
        assert!(!sub.is_active_at(now));
    }
}
