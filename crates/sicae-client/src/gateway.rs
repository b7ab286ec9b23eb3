//! [`ValidationGateway`]: hands scanned codes to the server for judgment.

use std::sync::Arc;

use sicae_core::{ApiError, api::AccessApi, domain::AccessEvent};
use tracing::{info, warn};
use uuid::Uuid;

use crate::sync::DataSync;

/// Submits codes to the server and folds the verdicts into [`DataSync`].
///
/// The client never decides access on its own: every code is sent, even one
/// that looks malformed.
pub struct ValidationGateway<A> {
  api:  Arc<A>,
  sync: Arc<DataSync<A>>,
}

impl<A: AccessApi> ValidationGateway<A> {
  pub fn new(api: Arc<A>, sync: Arc<DataSync<A>>) -> Self { Self { api, sync } }

  /// Validate `code` at an optional access point and reader address.
  ///
  /// On success the returned event is also at index 0 of the synchronised
  /// event list. On failure nothing local changes.
  pub async fn validate(
    &self,
    code: &str,
    access_point_id: Option<Uuid>,
    source_ip: Option<&str>,
  ) -> Result<AccessEvent, ApiError> {
    match self.api.validate_code(code, access_point_id, source_ip).await {
      Ok(event) => {
        info!(result = %event.result, person = %event.person_id, "code validated");
        self.sync.prepend_event(event.clone());
        Ok(event)
      }
      Err(e) => {
        warn!("validation failed: {e}");
        Err(e)
      }
    }
  }

  pub fn sync(&self) -> &Arc<DataSync<A>> { &self.sync }
}
