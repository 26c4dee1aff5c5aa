pub mod credentials;
pub mod gates;
pub mod middleware;
pub mod session;

pub use gates::{AuthorizationChain, HandlerRequirements};
pub use middleware::{GateState, authorize};
pub use session::SessionStore;
