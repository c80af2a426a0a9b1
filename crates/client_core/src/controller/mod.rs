//! Stateful controllers over the domain services.
//!
//! Each controller owns a [`StateCell`]: observers subscribe to it and receive
//! every published state. After teardown a controller publishes nothing more,
//! even for calls still in flight.

mod details;
mod estimate;
mod payment;
mod search;
mod state;

pub use details::{DetailsController, DetailsMode, DetailsState, WorkerDetails};
pub use estimate::{
    EstimatePollState, EstimatePoller, PollHandle, PollPolicy, DEFAULT_POLL_INTERVAL,
    DEFAULT_POLL_TIMEOUT, MIN_POLL_INTERVAL,
};
pub use payment::{Navigator, PaymentController, PaymentState};
pub use search::{SearchController, SearchState};
pub use state::{Phase, RequestState, StateCell};
