//! Business logic services

pub mod eligibility;
pub mod loans;
pub mod notifications;
pub mod penalties;
pub mod reservations;
pub mod scheduler;
pub mod settings;

use std::sync::Arc;

use crate::{models::settings::LendingSettings, repository::Repository};
use notifications::NotificationSink;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub eligibility: eligibility::EligibilityService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub penalties: penalties::PenaltiesService,
    pub settings: settings::SettingsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        default_settings: LendingSettings,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            eligibility: eligibility::EligibilityService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), notifier.clone()),
            reservations: reservations::ReservationsService::new(repository.clone(), notifier),
            penalties: penalties::PenaltiesService::new(repository.clone()),
            settings: settings::SettingsService::new(repository, default_settings),
        }
    }
}
