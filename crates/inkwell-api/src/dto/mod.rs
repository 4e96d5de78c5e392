//! Request and response bodies of the hand-written endpoints and of the
//! CRUD services.

pub mod request;
pub mod response;
