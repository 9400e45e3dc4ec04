use std::sync::Arc;

use spark_db::Database;
use spark_gateway::Registry;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub registry: Registry,
    pub jwt_secret: String,
    /// Campus email domain registrations are restricted to, e.g. "campus.edu".
    pub email_domain: String,
}
