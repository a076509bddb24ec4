use std::fmt;

use chrono::NaiveDate;

use super::domain::TenantId;
use crate::access::UserId;
use crate::occupancy::OccupancyTarget;

/// Welcome message handed to the delivery collaborator after provisioning.
#[derive(Clone)]
pub struct WelcomeNotice {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub target: OccupancyTarget,
    pub move_in_date: NaiveDate,
    /// Present only when the occupant account was created during provisioning.
    pub temporary_password: Option<String>,
}

impl fmt::Debug for WelcomeNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WelcomeNotice")
            .field("tenant_id", &self.tenant_id)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("target", &self.target)
            .field("move_in_date", &self.move_in_date)
            .field(
                "temporary_password",
                &self.temporary_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound seam for tenant notifications. Delivery itself lives outside this crate.
pub trait TenantNotifier: Send + Sync {
    fn welcome(&self, notice: &WelcomeNotice) -> Result<(), NotificationError>;
}

/// Drops every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl TenantNotifier for SilentNotifier {
    fn welcome(&self, _notice: &WelcomeNotice) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::PropertyId;

    #[test]
    fn debug_output_redacts_temporary_password() {
        let notice = WelcomeNotice {
            tenant_id: TenantId("ten-000004".to_string()),
            user_id: UserId("usr-000003".to_string()),
            name: "Robin".to_string(),
            email: "robin@example.com".to_string(),
            target: OccupancyTarget::property(PropertyId("prop-000001".to_string())),
            move_in_date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
            temporary_password: Some("s3cret-value".to_string()),
        };

        let rendered = format!("{notice:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("s3cret-value"));
    }
}
