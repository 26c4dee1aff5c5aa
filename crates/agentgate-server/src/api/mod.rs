pub mod csrf;
pub mod error;
pub mod exec;
pub mod handler;
pub mod rfc;
pub mod runtime_info;
pub mod state;

pub use error::ApiError;
pub use handler::ApiHandler;

use std::sync::Arc;

/// Every handler the server exposes, in registration order.
pub fn handlers() -> Vec<Arc<dyn ApiHandler>> {
    vec![
        Arc::new(exec::ExecHandler),
        Arc::new(exec::ApiExecHandler),
        Arc::new(csrf::CsrfTokenHandler),
        Arc::new(runtime_info::RuntimeInfoHandler),
        Arc::new(rfc::RfcHandler),
    ]
}
