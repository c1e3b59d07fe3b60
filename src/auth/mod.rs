// Edge Authentication
// Route guarding, login proxying and session cookie relay for the admin front end

pub mod classifier;
pub mod cookie;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod state;
pub mod token;

pub use classifier::{Decision, Route, RouteClass, RouteTable};
pub use cookie::SetCookie;
pub use error::GatewayError;
pub use middleware::{Identity, route_guard};
pub use proxy::{CredentialProxy, Credentials, LoginSuccess};
pub use routes::create_auth_router;
pub use state::GatewayState;
pub use token::Claims;
