pub mod dispatch_worker;
pub mod dispatcher;

pub use dispatch_worker::*;
pub use dispatcher::*;
