//! 路由共享状态

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::api::http::cookie::RefreshCookie;
use crate::application::{AuthService, RegistrationService, SessionService};
use crate::infrastructure::health::ReadinessProbe;

#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<RegistrationService>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionService>,
    pub cookie: RefreshCookie,
    pub readiness: Arc<dyn ReadinessProbe>,
    pub metrics: Option<PrometheusHandle>,
    pub request_timeout: Duration,
}
