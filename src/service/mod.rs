//! Tower Service implementations

pub mod assembler;
pub mod core;
pub mod mapper;
pub mod request;
pub mod response;

pub use assembler::TaskAssembler;
pub use self::core::CalendarAgentService;
pub use mapper::ErrorMapper;
pub use request::{A2ARequest, RequestContext};
pub use response::A2AResponse;
